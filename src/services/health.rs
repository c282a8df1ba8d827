use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::domains::health::{HealthSnapshot, HealthState, TransportHealth};
use crate::error::Result;
use crate::interfaces::content_store::ContentStore;
use crate::interfaces::live_channel::LiveChannel;
use crate::interfaces::scheduler::ScheduledJob;

pub const STORE_DISABLED: &str = "content store disabled";

/// Read side of the health snapshot. Cloning is cheap and reads never wait on
/// the monitor.
#[derive(Clone)]
pub struct HealthView {
    rx: watch::Receiver<HealthSnapshot>,
}

impl HealthView {
    pub fn current(&self) -> HealthSnapshot {
        self.rx.borrow().clone()
    }

    pub async fn changed(&mut self) -> bool {
        self.rx.changed().await.is_ok()
    }
}

pub struct HealthMonitor {
    live_channel: Arc<dyn LiveChannel>,
    content_store: Option<Arc<dyn ContentStore>>,
    interval: Duration,
    tx: watch::Sender<HealthSnapshot>,
}

impl HealthMonitor {
    pub fn new(
        live_channel: Arc<dyn LiveChannel>,
        content_store: Option<Arc<dyn ContentStore>>,
        interval: Duration,
    ) -> Self {
        let (tx, _) = watch::channel(HealthSnapshot::unknown());
        Self {
            live_channel,
            content_store,
            interval,
            tx,
        }
    }

    pub fn view(&self) -> HealthView {
        HealthView {
            rx: self.tx.subscribe(),
        }
    }

    pub fn snapshot(&self) -> HealthSnapshot {
        self.tx.borrow().clone()
    }

    pub async fn poll_once(&self) -> HealthSnapshot {
        let (live_channel, content_store) = tokio::join!(self.probe_live(), self.probe_store());
        let next = HealthSnapshot {
            live_channel,
            content_store,
        };
        let previous = self.tx.send_replace(next.clone());
        log_transition("live_channel", &previous.live_channel, &next.live_channel);
        log_transition("content_store", &previous.content_store, &next.content_store);
        next
    }

    async fn probe_live(&self) -> TransportHealth {
        match self.live_channel.connection_count().await {
            Ok(count) => {
                let mut detail = BTreeMap::new();
                detail.insert("connection_count".to_string(), json!(count));
                TransportHealth::healthy(detail)
            }
            Err(err) => TransportHealth::unhealthy(err.to_string()),
        }
    }

    async fn probe_store(&self) -> TransportHealth {
        let Some(store) = &self.content_store else {
            return TransportHealth::unhealthy(STORE_DISABLED);
        };
        let info = match store.node_info().await {
            Ok(info) => info,
            Err(err) => return TransportHealth::unhealthy(err.to_string()),
        };
        let mut detail = BTreeMap::new();
        detail.insert("node_id".to_string(), json!(info.id));
        if let Some(version) = info.agent_version {
            detail.insert("agent_version".to_string(), json!(version));
        }
        match store.peers().await {
            Ok(peers) => {
                detail.insert("peer_count".to_string(), json!(peers.len()));
            }
            Err(err) => {
                debug!(error = %err, "peer listing failed; omitting peer_count");
            }
        }
        TransportHealth::healthy(detail)
    }
}

fn log_transition(transport: &str, previous: &TransportHealth, next: &TransportHealth) {
    if previous.state() == next.state() {
        return;
    }
    match next.state() {
        HealthState::Healthy => info!(transport, "transport healthy"),
        HealthState::Unhealthy => warn!(
            transport,
            error = next.error.as_deref().unwrap_or_default(),
            "transport unhealthy"
        ),
        HealthState::Unknown => {}
    }
}

#[async_trait]
impl ScheduledJob for HealthMonitor {
    fn name(&self) -> &str {
        "transport_health"
    }

    fn interval(&self) -> Duration {
        self.interval
    }

    async fn run(&self) -> Result<()> {
        self.poll_once().await;
        Ok(())
    }
}
