use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use arc_swap::ArcSwapOption;
use runtime::{init_logging_from_config, AppConfig, AppConfigProvider, ConfigProvider};
use tokio::sync::broadcast;
use tracing::{debug, info};

use crate::config::{IdStrategy, ReferralsConfig};
use crate::contract::client::ReferralsApi;
use crate::domain::events::ReferralDomainEvent;
use crate::domain::ports::IdGenerator;
use crate::domain::repo::RecordStore;
use crate::domain::service::Service;
use crate::gateways::local::ReferralsLocalClient;
use crate::infra::clock::SystemClock;
use crate::infra::events::BroadcastEventPublisher;
use crate::infra::ids::{RandomCodeGenerator, SequentialIdGenerator, UuidV4Generator};
use crate::infra::storage::InMemoryRecordStore;

/// Key of this module's section in the configuration bag.
pub const MODULE_NAME: &str = "referrals";

/// Module entry point: wires configuration, store and ports into the
/// domain service and hands out the in-process client.
#[derive(Default)]
pub struct Referrals {
    // Read-mostly after init.
    service: ArcSwapOption<Service>,
    events: ArcSwapOption<BroadcastEventPublisher>,
}

impl Referrals {
    pub fn new() -> Self {
        Self::default()
    }

    /// Host entry point: load the layered config (defaults when `config_path`
    /// is `None`), install logging relative to `home_dir`, then initialize
    /// from the `referrals` section.
    pub fn bootstrap(config_path: Option<&Path>) -> anyhow::Result<Self> {
        let config = AppConfig::load_or_default(config_path)?;
        init_logging_from_config(&config.logging_or_default(), Path::new(&config.home_dir));
        info!(home_dir = %config.home_dir, "Referrals starting");

        let module = Self::new();
        module.init(&AppConfigProvider::new(config))?;
        Ok(module)
    }

    /// Initialize from the application configuration with an in-memory store.
    pub fn init(&self, provider: &dyn ConfigProvider) -> anyhow::Result<()> {
        let cfg = module_config(provider)?;
        self.init_with_store(cfg, Arc::new(InMemoryRecordStore::new()))
    }

    /// Initialize against a caller-supplied record store. With the sequential
    /// id strategy, no other instance may write to the same store.
    pub fn init_with_store(
        &self,
        cfg: ReferralsConfig,
        store: Arc<dyn RecordStore>,
    ) -> anyhow::Result<()> {
        info!("Initializing referrals module");
        debug!(
            "Loaded referrals config: max_chain_depth={}, top_earners_limit={}, id_strategy={:?}",
            cfg.max_chain_depth, cfg.top_earners_limit, cfg.id_strategy
        );

        if cfg.max_chain_depth == 0 {
            anyhow::bail!("referrals.max_chain_depth must be at least 1");
        }

        let ids: Arc<dyn IdGenerator> = match cfg.id_strategy {
            IdStrategy::Uuid => Arc::new(UuidV4Generator),
            IdStrategy::Sequential => Arc::new(SequentialIdGenerator::new()),
        };
        let events = Arc::new(BroadcastEventPublisher::new(cfg.event_buffer));

        let service = Service::new(
            store,
            ids,
            Arc::new(RandomCodeGenerator::new(cfg.referral_code_length)),
            Arc::new(SystemClock),
            events.clone(),
            cfg.service_config(),
        );

        self.service.store(Some(Arc::new(service)));
        self.events.store(Some(events));
        info!("Referrals module initialized");
        Ok(())
    }

    pub fn service(&self) -> anyhow::Result<Arc<Service>> {
        self.service
            .load_full()
            .ok_or_else(|| anyhow::anyhow!("Service not initialized"))
    }

    /// In-process client for other modules.
    pub fn client(&self) -> anyhow::Result<Arc<dyn ReferralsApi>> {
        Ok(Arc::new(ReferralsLocalClient::new(self.service()?)))
    }

    /// Stream of registration and award events.
    pub fn subscribe(&self) -> anyhow::Result<broadcast::Receiver<ReferralDomainEvent>> {
        self.events
            .load()
            .as_ref()
            .map(|e| e.subscribe())
            .ok_or_else(|| anyhow::anyhow!("Service not initialized"))
    }
}

/// Read this module's section: absent means defaults, malformed is an error.
pub fn module_config(provider: &dyn ConfigProvider) -> anyhow::Result<ReferralsConfig> {
    match provider.get_module_config(MODULE_NAME) {
        None => Ok(ReferralsConfig::default()),
        Some(value) => serde_json::from_value(value.clone())
            .with_context(|| format!("invalid {MODULE_NAME} config")),
    }
}
