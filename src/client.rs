use std::path::Path;
use std::sync::Arc;

use tracing::{info, warn};

use crate::config::Config;
use crate::error::Result;
use crate::interfaces::content_store::ContentStore;
use crate::interfaces::live_channel::LiveChannel;
use crate::providers::ipfs::IpfsContentStore;
use crate::services::dispatcher::{DispatchSettings, Dispatcher};
use crate::services::gateway::GatewayResolver;
use crate::services::health::{HealthMonitor, HealthView};
use crate::services::live_channel::ConnectionRegistry;

/// Every delivery component wired from a single `Config`.
pub struct DualcastNode {
    config: Config,
    registry: Arc<ConnectionRegistry>,
    content_store: Option<Arc<dyn ContentStore>>,
    monitor: Arc<HealthMonitor>,
    dispatcher: Arc<Dispatcher>,
}

impl DualcastNode {
    pub fn from_config(config: Config) -> Self {
        let content_store = match &config.content_store {
            Some(store_config) => match IpfsContentStore::new(store_config) {
                Ok(store) => {
                    info!(api_url = store.api_url(), "content store configured");
                    Some(Arc::new(store) as Arc<dyn ContentStore>)
                }
                Err(err) => {
                    warn!(error = %err, "content store unusable; running without fallback");
                    None
                }
            },
            None => {
                info!("no content store configured; fallback transport disabled");
                None
            }
        };
        Self::with_content_store(config, content_store)
    }

    pub fn from_config_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config = Config::from_file(path)?;
        Ok(Self::from_config(config))
    }

    pub fn with_content_store(config: Config, content_store: Option<Arc<dyn ContentStore>>) -> Self {
        let registry = Arc::new(ConnectionRegistry::new(
            config.send_timeout(),
            config.queue_depth(),
        ));
        let live_channel: Arc<dyn LiveChannel> = registry.clone();
        let monitor = Arc::new(HealthMonitor::new(
            live_channel.clone(),
            content_store.clone(),
            config.poll_interval(),
        ));
        let dispatcher = Arc::new(Dispatcher::new(
            live_channel,
            content_store.clone(),
            monitor.view(),
            GatewayResolver::new(config.gateways()),
            DispatchSettings {
                request_timeout: config.request_timeout(),
                pin: config.pin(),
            },
        ));
        Self {
            config,
            registry,
            content_store,
            monitor,
            dispatcher,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn registry(&self) -> Arc<ConnectionRegistry> {
        self.registry.clone()
    }

    pub fn content_store(&self) -> Option<Arc<dyn ContentStore>> {
        self.content_store.clone()
    }

    pub fn monitor(&self) -> Arc<HealthMonitor> {
        self.monitor.clone()
    }

    pub fn dispatcher(&self) -> Arc<Dispatcher> {
        self.dispatcher.clone()
    }

    pub fn health(&self) -> HealthView {
        self.monitor.view()
    }
}
