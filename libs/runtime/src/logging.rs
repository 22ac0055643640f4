use crate::config::{LoggingConfig, Section};
use std::{
    io::Write,
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};
use tracing::level_filters::LevelFilter;
use tracing::Level;
use tracing_subscriber::{
    filter::{FilterFn, Targets},
    fmt::{self, time::UtcTime},
    prelude::*,
    Layer, Registry,
};

use file_rotate::{
    compression::Compression,
    suffix::AppendCount,
    ContentLimit, FileRotate,
};

const DEFAULT_MAX_SIZE_MB: u64 = 100;
const DEFAULT_MAX_BACKUPS: usize = 3;

// -------- level helpers --------
fn parse_tracing_level(s: &str) -> Option<Level> {
    match s.to_ascii_lowercase().as_str() {
        "trace" => Some(Level::TRACE),
        "debug" => Some(Level::DEBUG),
        "info" => Some(Level::INFO),
        "warn" => Some(Level::WARN),
        "error" => Some(Level::ERROR),
        "off" | "none" => None,
        _ => Some(Level::INFO),
    }
}

fn level_filter(s: &str) -> LevelFilter {
    parse_tracing_level(s)
        .map(LevelFilter::from_level)
        .unwrap_or(LevelFilter::OFF)
}

/// Returns true if target == prefix or target starts with "prefix::"
fn matches_target_prefix(target: &str, prefix: &str) -> bool {
    target == prefix
        || (target.starts_with(prefix) && target[prefix.len()..].starts_with("::"))
}

// -------- rotating file sink --------

/// Shared handle to a size-rotated log file.
#[derive(Clone)]
struct SharedRotate(Arc<Mutex<FileRotate<AppendCount>>>);

impl Write for SharedRotate {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        match self.0.lock() {
            Ok(mut f) => f.write(buf),
            // poisoned: a writer panicked mid-record, keep logging anyway
            Err(poisoned) => poisoned.into_inner().write(buf),
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        match self.0.lock() {
            Ok(mut f) => f.flush(),
            Err(poisoned) => poisoned.into_inner().flush(),
        }
    }
}

impl<'a> fmt::MakeWriter<'a> for SharedRotate {
    type Writer = SharedRotate;
    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

/// Resolve a log file path against `base_dir`.
/// Absolute paths are kept as-is; relative paths are joined with `base_dir`.
fn resolve_log_path(file: &str, base_dir: &Path) -> PathBuf {
    let p = Path::new(file);
    if p.is_absolute() {
        p.to_path_buf()
    } else {
        base_dir.join(p)
    }
}

/// Open a size-rotated log file, creating its parent directory.
fn open_rotating_file(
    log_path: &Path,
    section: &Section,
) -> Result<SharedRotate, Box<dyn std::error::Error + Send + Sync>> {
    if let Some(parent) = log_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let max_bytes = section.max_size_mb.unwrap_or(DEFAULT_MAX_SIZE_MB) * 1024 * 1024;
    let max_files = section.max_backups.unwrap_or(DEFAULT_MAX_BACKUPS);

    let rot = FileRotate::new(
        log_path,
        AppendCount::new(max_files),
        ContentLimit::BytesSurpassed(max_bytes as usize),
        Compression::None,
        #[cfg(unix)]
        None,
    );

    Ok(SharedRotate(Arc::new(Mutex::new(rot))))
}

// -------- plan --------

/// What the subscriber will be built from.
struct LoggingPlan {
    console: Targets,
    /// One rotating sink per explicit target that names its own file.
    target_files: Vec<(String, LevelFilter, SharedRotate)>,
    /// Sink of the "default" section, for records no explicit target claims.
    default_file: Option<(LevelFilter, SharedRotate)>,
    /// Explicit target prefixes; the "default" section covers everything else.
    explicit: Vec<String>,
    default_console: LevelFilter,
}

fn open_section_file(section: &Section, base_dir: &Path) -> Option<SharedRotate> {
    if section.file.trim().is_empty() {
        return None;
    }
    let path = resolve_log_path(&section.file, base_dir);
    match open_rotating_file(&path, section) {
        Ok(w) => Some(w),
        Err(e) => {
            eprintln!("Failed to open log file '{}': {}", path.display(), e);
            None
        }
    }
}

fn build_plan(cfg: &LoggingConfig, base_dir: &Path) -> LoggingPlan {
    let mut console = Targets::new().with_default(LevelFilter::OFF);
    let mut target_files = Vec::new();
    let mut explicit = Vec::new();

    for (target, section) in cfg.iter().filter(|(k, _)| k.as_str() != "default") {
        explicit.push(target.clone());
        console = console.with_target(target.clone(), level_filter(&section.console_level));
        if let Some(sink) = open_section_file(section, base_dir) {
            target_files.push((target.clone(), level_filter(&section.file_level), sink));
        }
    }

    let default_section = cfg.get("default");

    LoggingPlan {
        console,
        target_files,
        default_file: default_section.and_then(|s| {
            open_section_file(s, base_dir).map(|sink| (level_filter(&s.file_level), sink))
        }),
        explicit,
        default_console: default_section
            .map(|s| level_filter(&s.console_level))
            .unwrap_or(LevelFilter::OFF),
    }
}

type DefaultFilter = FilterFn<Box<dyn Fn(&tracing::Metadata<'_>) -> bool + Send + Sync + 'static>>;

/// Accept records that match no explicit prefix, up to `max_level`.
fn default_filter(explicit: &[String], max_level: LevelFilter) -> DefaultFilter {
    let explicit = explicit.to_vec();
    FilterFn::new(Box::new(move |meta: &tracing::Metadata<'_>| {
        let t = meta.target();
        !explicit.iter().any(|p| matches_target_prefix(t, p)) && max_level >= *meta.level()
    }))
}

// -------- public init --------

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync + 'static>;

fn json_file_layer(sink: SharedRotate) -> impl Layer<Registry> + Send + Sync + 'static {
    fmt::layer()
        .json()
        .with_ansi(false)
        .with_target(true)
        .with_timer(UtcTime::rfc_3339())
        .with_writer(sink)
}

/// Initialize logging from a configuration.
/// - `cfg`: logging sections keyed by target prefix, "default" for the rest
/// - `base_dir`: directory used to resolve relative log file paths (usually home_dir)
///
/// Safe to call more than once; only the first subscriber is installed.
pub fn init_logging_from_config(cfg: &LoggingConfig, base_dir: &Path) {
    // Bridge `log` → `tracing` before installing the subscriber
    let _ = tracing_log::LogTracer::init();

    if cfg.is_empty() {
        init_default_logging();
        return;
    }

    let plan = build_plan(cfg, base_dir);
    let ansi = atty::is(atty::Stream::Stdout);
    let mut layers: Vec<BoxedLayer> = Vec::new();

    layers.push(
        fmt::layer()
            .with_ansi(ansi)
            .with_target(true)
            .with_timer(UtcTime::rfc_3339())
            .with_filter(plan.console)
            .boxed(),
    );
    layers.push(
        fmt::layer()
            .with_ansi(ansi)
            .with_target(true)
            .with_timer(UtcTime::rfc_3339())
            .with_filter(default_filter(&plan.explicit, plan.default_console))
            .boxed(),
    );

    for (target, level, sink) in plan.target_files {
        let only_target = Targets::new()
            .with_default(LevelFilter::OFF)
            .with_target(target, level);
        layers.push(json_file_layer(sink).with_filter(only_target).boxed());
    }

    if let Some((level, sink)) = plan.default_file {
        layers.push(
            json_file_layer(sink)
                .with_filter(default_filter(&plan.explicit, level))
                .boxed(),
        );
    }

    let _ = Registry::default().with(layers).try_init();
}

fn init_default_logging() {
    let _ = fmt::fmt()
        .with_target(true)
        .with_timer(UtcTime::rfc_3339())
        .try_init();
}

// =================== tests ===================
