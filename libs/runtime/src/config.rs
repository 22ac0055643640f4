use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Environment prefix for layered overrides, e.g. `REFERRALS__HOME_DIR=/srv/referrals`.
pub const ENV_PREFIX: &str = "REFERRALS__";

/// Application configuration: a home directory for relative paths, logging
/// sections and a flexible per-module configuration bag.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    /// Base directory for relative log paths. Empty or `~`-prefixed values are
    /// normalized to an absolute path on load.
    #[serde(default)]
    pub home_dir: String,
    /// Logging configuration (optional, uses defaults if None).
    pub logging: Option<LoggingConfig>,
    /// Directory containing per-module YAML files (optional).
    #[serde(default)]
    pub modules_dir: Option<String>,
    /// Per-module configuration bag: module_name → arbitrary JSON/YAML value.
    #[serde(default)]
    pub modules: HashMap<String, serde_json::Value>,
}

/// Logging configuration - maps target prefixes to their logging settings.
/// Key "default" is the catch-all for records that match no explicit target.
pub type LoggingConfig = HashMap<String, Section>;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Section {
    pub console_level: String, // "info", "debug", "error", "off"
    #[serde(default)]
    pub file: String, // "logs/referrals.log", empty disables the file sink
    #[serde(default)]
    pub file_level: String,
    /// How many rotated files to keep.
    #[serde(default)]
    pub max_backups: Option<usize>,
    /// Rotate once the file grows past this many megabytes.
    #[serde(default)]
    pub max_size_mb: Option<u64>,
}

/// Read access to the per-module configuration bag.
pub trait ConfigProvider: Send + Sync {
    fn get_module_config(&self, module_name: &str) -> Option<&serde_json::Value>;
}

/// `ConfigProvider` backed by a loaded `AppConfig`.
#[derive(Debug, Clone)]
pub struct AppConfigProvider(AppConfig);

impl AppConfigProvider {
    pub fn new(config: AppConfig) -> Self {
        Self(config)
    }

    pub fn config(&self) -> &AppConfig {
        &self.0
    }
}

impl ConfigProvider for AppConfigProvider {
    fn get_module_config(&self, module_name: &str) -> Option<&serde_json::Value> {
        self.0.modules.get(module_name)
    }
}

/// Create a default logging configuration.
pub fn default_logging_config() -> LoggingConfig {
    let mut logging = HashMap::new();
    logging.insert(
        "default".to_string(),
        Section {
            console_level: "info".to_string(),
            file: "logs/referrals.log".to_string(),
            file_level: "debug".to_string(),
            max_backups: Some(3),
            max_size_mb: Some(100),
        },
    );
    logging
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            home_dir: String::new(),
            logging: Some(default_logging_config()),
            modules_dir: None,
            modules: HashMap::new(),
        }
    }
}

impl AppConfig {
    /// Load configuration with layered loading: defaults → YAML file → environment variables.
    /// Also normalizes `home_dir` into an absolute path.
    pub fn load_layered<P: AsRef<Path>>(config_path: P) -> Result<Self> {
        use figment::{
            providers::{Env, Format, Serialized, Yaml},
            Figment,
        };

        // Optional sections stay None unless YAML/ENV provide them.
        let base = AppConfig {
            home_dir: String::new(),
            logging: None,
            modules_dir: None,
            modules: HashMap::new(),
        };

        let figment = Figment::new()
            .merge(Serialized::defaults(base))
            .merge(Yaml::file(config_path.as_ref()))
            .merge(Env::prefixed(ENV_PREFIX).split("__"));

        let mut config: AppConfig = figment
            .extract()
            .with_context(|| "Failed to extract config from figment".to_string())?;

        config.home_dir = resolve_home_dir(&config.home_dir)
            .context("Failed to resolve home_dir")?
            .to_string_lossy()
            .to_string();

        if let Some(dir) = config.modules_dir.clone() {
            merge_module_files(&mut config.modules, dir)?;
        }

        Ok(config)
    }

    /// Load configuration from file or fall back to defaults.
    pub fn load_or_default<P: AsRef<Path>>(config_path: Option<P>) -> Result<Self> {
        match config_path {
            Some(path) => Self::load_layered(path),
            None => {
                let mut c = Self::default();
                c.home_dir = resolve_home_dir(&c.home_dir)
                    .context("Failed to resolve home_dir (defaults)")?
                    .to_string_lossy()
                    .to_string();
                Ok(c)
            }
        }
    }

    /// Serialize configuration to YAML.
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).context("Failed to serialize config to YAML")
    }

    /// Logging sections to install, falling back to the defaults.
    pub fn logging_or_default(&self) -> LoggingConfig {
        self.logging.clone().unwrap_or_else(default_logging_config)
    }
}

/// Resolve `raw` into an absolute directory.
/// - empty → current working directory
/// - `~` / `~/...` → user home (`HOME`, or `APPDATA` on Windows)
/// - relative → joined onto the current working directory
fn resolve_home_dir(raw: &str) -> Result<PathBuf> {
    let raw = raw.trim();
    let cwd = || std::env::current_dir().context("current directory is not accessible");

    if raw.is_empty() {
        return cwd();
    }

    if let Some(rest) = raw.strip_prefix('~') {
        let home_var = if cfg!(target_os = "windows") {
            "APPDATA"
        } else {
            "HOME"
        };
        let home = std::env::var_os(home_var)
            .map(PathBuf::from)
            .with_context(|| format!("{home_var} is not set; cannot expand '~'"))?;
        let rest = rest.trim_start_matches(['/', '\\']);
        return Ok(if rest.is_empty() { home } else { home.join(rest) });
    }

    let p = PathBuf::from(raw);
    if p.is_absolute() {
        Ok(p)
    } else {
        Ok(cwd()?.join(p))
    }
}

fn merge_module_files(
    bag: &mut HashMap<String, serde_json::Value>,
    dir: impl AsRef<Path>,
) -> Result<()> {
    use std::fs;
    let dir = dir.as_ref();
    if !dir.exists() {
        return Ok(());
    }
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }
        let ext = path
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or("")
            .to_ascii_lowercase();
        if ext != "yml" && ext != "yaml" {
            continue;
        }
        let name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("")
            .to_string();
        let raw = fs::read_to_string(&path)
            .with_context(|| format!("failed to read module config {}", path.display()))?;
        let val: serde_yaml::Value = serde_yaml::from_str(&raw)
            .with_context(|| format!("invalid YAML in {}", path.display()))?;
        bag.insert(name, serde_json::to_value(val)?);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_default_config_structure() {
        let config = AppConfig::default();

        assert_eq!(config.home_dir, "");
        assert!(config.modules.is_empty());

        let logging = config.logging.as_ref().unwrap();
        let default_section = &logging["default"];
        assert_eq!(default_section.console_level, "info");
        assert_eq!(default_section.file, "logs/referrals.log");
        assert_eq!(default_section.max_backups, Some(3));
    }

    #[test]
    fn test_minimal_yaml_config() {
        let tmp = tempdir().unwrap();
        let cfg_path = tmp.path().join("cfg.yaml");
        let home = tmp.path().join("home");
        fs::write(
            &cfg_path,
            format!("home_dir: \"{}\"\n", home.to_string_lossy().replace('\\', "/")),
        )
        .unwrap();

        let config = AppConfig::load_layered(&cfg_path).unwrap();

        assert!(Path::new(&config.home_dir).is_absolute());
        assert!(config.home_dir.ends_with("home"));
        assert!(config.logging.is_none());
        assert!(config.modules.is_empty());
    }

    #[test]
    fn test_layered_config_with_logging_and_modules() {
        let tmp = tempdir().unwrap();
        let cfg_path = tmp.path().join("cfg.yaml");
        let yaml = r#"
logging:
  default:
    console_level: debug
    file: "logs/default.log"
  referrals:
    console_level: trace
    file: ""

modules:
  referrals:
    max_chain_depth: 16
"#;
        fs::write(&cfg_path, yaml).unwrap();

        let config = AppConfig::load_layered(&cfg_path).unwrap();

        let logging = config.logging.as_ref().unwrap();
        assert_eq!(logging["default"].console_level, "debug");
        assert_eq!(logging["default"].file, "logs/default.log");
        assert_eq!(logging["referrals"].console_level, "trace");
        assert_eq!(logging["referrals"].file_level, "");

        let provider = AppConfigProvider::new(config);
        let referrals = provider.get_module_config("referrals").unwrap();
        assert_eq!(referrals["max_chain_depth"], 16);
        assert!(provider.get_module_config("missing").is_none());
    }

    #[test]
    fn test_layered_config_loading_with_modules_dir() {
        let tmp = tempdir().unwrap();
        let cfg_path = tmp.path().join("modules_dir.yaml");
        let modules_dir = tmp.path().join("modules");

        fs::create_dir_all(&modules_dir).unwrap();
        fs::write(
            modules_dir.join("referrals.yaml"),
            "top_earners_limit: 5\nid_strategy: sequential\n",
        )
        .unwrap();
        fs::write(modules_dir.join("notes.txt"), "ignored").unwrap();

        let modules_dir_str = modules_dir.to_string_lossy().replace('\\', "/");
        let yaml = format!(
            r#"
modules_dir: "{}"

modules:
  existing_module:
    key: "value"
"#,
            modules_dir_str
        );
        fs::write(&cfg_path, yaml).unwrap();

        let config = AppConfig::load_layered(&cfg_path).unwrap();

        assert!(config.modules.contains_key("existing_module"));
        assert!(config.modules.contains_key("referrals"));
        assert!(!config.modules.contains_key("notes"));
        assert_eq!(config.modules["referrals"]["top_earners_limit"], 5);
        assert_eq!(config.modules["referrals"]["id_strategy"], "sequential");
    }

    #[test]
    fn test_resolve_home_dir_variants() {
        let tmp = tempdir().unwrap();
        let abs = tmp.path().to_string_lossy().to_string();
        assert_eq!(resolve_home_dir(&abs).unwrap(), tmp.path());

        let cwd = std::env::current_dir().unwrap();
        assert_eq!(resolve_home_dir("").unwrap(), cwd);
        assert_eq!(resolve_home_dir("data").unwrap(), cwd.join("data"));
    }

    #[test]
    fn test_to_yaml_roundtrip_basic() {
        let config = AppConfig::default();
        let yaml = config.to_yaml().unwrap();
        assert!(yaml.contains("logging:"));

        let roundtrip: AppConfig = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(roundtrip.logging, config.logging);
    }

    #[test]
    fn test_unknown_top_level_field_is_rejected() {
        let yaml = r#"
home_dir: "/tmp"
http:
  bind: "127.0.0.1"
"#;
        let result: Result<AppConfig, _> = serde_yaml::from_str(yaml);
        assert!(result.is_err());
    }

    #[test]
    fn test_logging_or_default_falls_back() {
        let config = AppConfig {
            logging: None,
            ..AppConfig::default()
        };
        assert!(config.logging_or_default().contains_key("default"));
    }

    #[test]
    fn test_load_or_default_without_path_resolves_home_dir() {
        let config = AppConfig::load_or_default(None::<&Path>).unwrap();
        assert_eq!(
            Path::new(&config.home_dir),
            std::env::current_dir().unwrap()
        );
        assert!(config.logging.is_some());
    }

    #[test]
    fn test_load_or_default_with_path_reads_file() {
        let tmp = tempdir().unwrap();
        let cfg_path = tmp.path().join("cfg.yaml");
        fs::write(&cfg_path, "modules:\n  referrals:\n    event_buffer: 8\n").unwrap();

        let config = AppConfig::load_or_default(Some(&cfg_path)).unwrap();
        assert_eq!(config.modules["referrals"]["event_buffer"], 8);
    }
}
