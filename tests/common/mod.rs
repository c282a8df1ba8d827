#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;

use dualcast::config::{Config, ContentStoreConfig};
use dualcast::domains::envelope::ContentId;
use dualcast::domains::events::ChannelEvent;
use dualcast::error::{DualcastError, Result};
use dualcast::interfaces::content_store::{ContentStore, NodeInfo};
use dualcast::interfaces::live_channel::LiveChannel;
use dualcast::providers::memory::MemoryContentStore;
use dualcast::services::dispatcher::{DispatchSettings, Dispatcher};
use dualcast::services::gateway::GatewayResolver;
use dualcast::services::health::HealthMonitor;

pub const GATEWAY: &str = "https://gateway.test";

#[derive(Clone, Copy)]
pub enum LiveBehaviour {
    Deliver,
    NotConnected,
    Fail,
    Delay(Duration),
}

pub struct FakeLiveChannel {
    behaviour: Mutex<LiveBehaviour>,
    pub sent: Mutex<Vec<(String, ChannelEvent)>>,
}

impl FakeLiveChannel {
    pub fn new(behaviour: LiveBehaviour) -> Self {
        Self {
            behaviour: Mutex::new(behaviour),
            sent: Mutex::new(Vec::new()),
        }
    }

    pub async fn set_behaviour(&self, behaviour: LiveBehaviour) {
        *self.behaviour.lock().await = behaviour;
    }
}

#[async_trait]
impl LiveChannel for FakeLiveChannel {
    async fn send_to(&self, recipient_id: &str, event: ChannelEvent) -> Result<()> {
        let behaviour = *self.behaviour.lock().await;
        match behaviour {
            LiveBehaviour::Deliver => {}
            LiveBehaviour::NotConnected => {
                return Err(DualcastError::ChannelUnavailable(recipient_id.to_string()));
            }
            LiveBehaviour::Fail => {
                return Err(DualcastError::ChannelFailed("socket reset".to_string()));
            }
            LiveBehaviour::Delay(delay) => tokio::time::sleep(delay).await,
        }
        self.sent
            .lock()
            .await
            .push((recipient_id.to_string(), event));
        Ok(())
    }

    async fn connection_count(&self) -> Result<usize> {
        match *self.behaviour.lock().await {
            LiveBehaviour::Fail => Err(DualcastError::ChannelFailed("closed".to_string())),
            _ => Ok(self.sent.lock().await.len()),
        }
    }
}

/// Stores content but every publish fails.
pub struct BrokenPubsubStore {
    pub inner: MemoryContentStore,
}

#[async_trait]
impl ContentStore for BrokenPubsubStore {
    async fn add(&self, bytes: Vec<u8>, filename: &str, pin: bool) -> Result<ContentId> {
        self.inner.add(bytes, filename, pin).await
    }

    async fn fetch(&self, cid: &ContentId) -> Result<Vec<u8>> {
        self.inner.fetch(cid).await
    }

    async fn publish(&self, _topic: &str, _bytes: Vec<u8>) -> Result<()> {
        Err(DualcastError::StoreRejected("500: pubsub backend error".to_string()))
    }

    async fn node_info(&self) -> Result<NodeInfo> {
        self.inner.node_info().await
    }

    async fn peers(&self) -> Result<Vec<String>> {
        self.inner.peers().await
    }
}

/// Stores content but every publish hangs for `publish_delay`.
pub struct StalledPubsubStore {
    pub inner: MemoryContentStore,
    pub publish_delay: Duration,
}

#[async_trait]
impl ContentStore for StalledPubsubStore {
    async fn add(&self, bytes: Vec<u8>, filename: &str, pin: bool) -> Result<ContentId> {
        self.inner.add(bytes, filename, pin).await
    }

    async fn fetch(&self, cid: &ContentId) -> Result<Vec<u8>> {
        self.inner.fetch(cid).await
    }

    async fn publish(&self, topic: &str, bytes: Vec<u8>) -> Result<()> {
        tokio::time::sleep(self.publish_delay).await;
        self.inner.publish(topic, bytes).await
    }

    async fn node_info(&self) -> Result<NodeInfo> {
        self.inner.node_info().await
    }

    async fn peers(&self) -> Result<Vec<String>> {
        self.inner.peers().await
    }
}

pub struct Harness {
    pub live: Arc<FakeLiveChannel>,
    pub store: Option<Arc<MemoryContentStore>>,
    pub monitor: Arc<HealthMonitor>,
    pub dispatcher: Dispatcher,
}

pub fn harness(
    live: LiveBehaviour,
    with_store: bool,
    request_timeout: Duration,
) -> Harness {
    let live = Arc::new(FakeLiveChannel::new(live));
    let store = with_store.then(|| Arc::new(MemoryContentStore::new()));
    let dyn_store = store
        .clone()
        .map(|store| store as Arc<dyn ContentStore>);
    harness_with(live, store, dyn_store, request_timeout)
}

pub fn harness_with(
    live: Arc<FakeLiveChannel>,
    store: Option<Arc<MemoryContentStore>>,
    dyn_store: Option<Arc<dyn ContentStore>>,
    request_timeout: Duration,
) -> Harness {
    let monitor = Arc::new(HealthMonitor::new(
        live.clone(),
        dyn_store.clone(),
        Duration::from_secs(30),
    ));
    let dispatcher = Dispatcher::new(
        live.clone(),
        dyn_store,
        monitor.view(),
        GatewayResolver::new(vec![GATEWAY.to_string()]),
        DispatchSettings {
            request_timeout,
            pin: true,
        },
    );
    Harness {
        live,
        store,
        monitor,
        dispatcher,
    }
}

pub fn config_with_gateway() -> Config {
    let mut store = ContentStoreConfig::new("http://127.0.0.1:5001");
    store.gateways = Some(vec![GATEWAY.to_string()]);
    Config {
        content_store: Some(store),
        ..Config::default()
    }
}
