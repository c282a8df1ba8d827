use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use time::format_description::well_known::Rfc3339;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::domains::delivery::{DeliveryResult, TransportKind, TransportOutcome};
use crate::domains::events::ChannelEvent;
use crate::domains::health::HealthState;
use crate::domains::message::{Message, TransportMode};
use crate::error::{DualcastError, Result};
use crate::interfaces::content_store::ContentStore;
use crate::interfaces::live_channel::LiveChannel;
use crate::services::envelope::EnvelopeBuilder;
use crate::services::gateway::GatewayResolver;
use crate::services::health::{HealthView, STORE_DISABLED};

pub const TOPIC_PREFIX: &str = "chat-user-";

#[derive(Debug, Clone)]
pub struct DispatchSettings {
    pub request_timeout: Duration,
    pub pin: bool,
}

impl Default for DispatchSettings {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(crate::config::DEFAULT_REQUEST_TIMEOUT_SECONDS),
            pin: true,
        }
    }
}

pub struct Dispatcher {
    live_channel: Arc<dyn LiveChannel>,
    content_store: Option<Arc<dyn ContentStore>>,
    health: HealthView,
    gateways: GatewayResolver,
    settings: DispatchSettings,
}

pub fn topic_for(recipient_id: &str) -> String {
    format!("{TOPIC_PREFIX}{recipient_id}")
}

impl Dispatcher {
    pub fn new(
        live_channel: Arc<dyn LiveChannel>,
        content_store: Option<Arc<dyn ContentStore>>,
        health: HealthView,
        gateways: GatewayResolver,
        settings: DispatchSettings,
    ) -> Self {
        Self {
            live_channel,
            content_store,
            health,
            gateways,
            settings,
        }
    }

    pub fn has_content_store(&self) -> bool {
        self.content_store.is_some()
    }

    pub fn gateways(&self) -> &GatewayResolver {
        &self.gateways
    }

    /// Rejects a mandatory fallback delivery when the store is absent or was
    /// unhealthy at its last check. Unknown health is admitted.
    pub fn admit(&self, mode: TransportMode) -> Result<()> {
        if mode != TransportMode::Fallback {
            return Ok(());
        }
        if self.content_store.is_none() {
            return Err(DualcastError::StoreUnavailable(STORE_DISABLED.to_string()));
        }
        let snapshot = self.health.current();
        if snapshot.content_store.state() == HealthState::Unhealthy {
            let reason = snapshot
                .content_store
                .error
                .unwrap_or_else(|| "content store unhealthy".to_string());
            return Err(DualcastError::StoreUnavailable(reason));
        }
        Ok(())
    }

    pub async fn deliver(&self, message: &Message) -> Result<DeliveryResult> {
        self.admit(message.transport_mode())?;
        Ok(self.dispatch(message).await)
    }

    pub async fn dispatch(&self, message: &Message) -> DeliveryResult {
        let mut result = DeliveryResult::new(message.id());
        let deadline = Instant::now() + self.settings.request_timeout;
        debug!(
            message_id = %message.id(),
            recipient_id = message.recipient_id(),
            mode = %message.transport_mode(),
            "dispatching message"
        );
        match message.transport_mode() {
            TransportMode::Primary => {
                let outcome = self
                    .bounded(deadline, TransportKind::Primary, self.send_primary(message))
                    .await;
                result.record(TransportKind::Primary, outcome);
            }
            TransportMode::Fallback => {
                let outcome = self.send_fallback(message, deadline).await;
                result.record(TransportKind::Fallback, outcome);
            }
            TransportMode::Dual => {
                let (primary, fallback) = tokio::join!(
                    self.bounded(deadline, TransportKind::Primary, self.send_primary(message)),
                    self.send_fallback(message, deadline),
                );
                result.record(TransportKind::Primary, primary);
                result.record(TransportKind::Fallback, fallback);
            }
        }
        result
    }

    fn timed_out(&self, kind: TransportKind, step: &str) -> DualcastError {
        warn!(transport = kind.as_str(), step, "delivery branch timed out");
        DualcastError::Timeout(format!(
            "{} {step} exceeded {:?}",
            kind.as_str(),
            self.settings.request_timeout
        ))
    }

    async fn bounded<F>(&self, deadline: Instant, kind: TransportKind, branch: F) -> TransportOutcome
    where
        F: Future<Output = TransportOutcome>,
    {
        match tokio::time::timeout_at(deadline, branch).await {
            Ok(outcome) => outcome,
            Err(_) => TransportOutcome::failed(&self.timed_out(kind, "delivery")),
        }
    }

    async fn send_primary(&self, message: &Message) -> TransportOutcome {
        let timestamp = match message.created_at().format(&Rfc3339) {
            Ok(timestamp) => timestamp,
            Err(e) => {
                return TransportOutcome::failed(&DualcastError::Serialization(e.to_string()));
            }
        };
        let event = ChannelEvent::NewMessage {
            message_id: message.id(),
            sender_id: message.sender_id().to_string(),
            payload: BASE64.encode(message.payload()),
            timestamp,
        };
        match self
            .live_channel
            .send_to(message.recipient_id(), event)
            .await
        {
            Ok(()) => TransportOutcome::delivered(),
            Err(err @ DualcastError::ChannelUnavailable(_)) => {
                debug!(recipient_id = message.recipient_id(), "recipient not connected");
                TransportOutcome::failed(&err)
            }
            Err(err) => {
                warn!(recipient_id = message.recipient_id(), error = %err, "live channel send failed");
                TransportOutcome::failed(&err)
            }
        }
    }

    /// Only `add` decides the outcome. Publishing shares the branch deadline
    /// and a slow or failed publish just leaves `published` false.
    async fn send_fallback(&self, message: &Message, deadline: Instant) -> TransportOutcome {
        let Some(store) = &self.content_store else {
            return TransportOutcome::failed(&DualcastError::StoreUnavailable(
                STORE_DISABLED.to_string(),
            ));
        };
        let bytes = match EnvelopeBuilder::build(message).and_then(|env| env.to_bytes()) {
            Ok(bytes) => bytes,
            Err(err) => return TransportOutcome::failed(&err),
        };
        let filename = format!("message-{}.json", message.id());
        let added =
            tokio::time::timeout_at(deadline, store.add(bytes.clone(), &filename, self.settings.pin))
                .await;
        let cid = match added {
            Ok(Ok(cid)) => cid,
            Ok(Err(err)) => {
                warn!(message_id = %message.id(), error = %err, "content store add failed");
                return TransportOutcome::failed(&err);
            }
            Err(_) => {
                return TransportOutcome::failed(&self.timed_out(TransportKind::Fallback, "add"));
            }
        };
        let urls = self.gateways.urls(&cid);
        let topic = topic_for(message.recipient_id());
        let published = match tokio::time::timeout_at(deadline, store.publish(&topic, bytes)).await {
            Ok(Ok(())) => true,
            Ok(Err(err)) => {
                warn!(%topic, error = %err, "pubsub publish failed");
                false
            }
            Err(_) => {
                warn!(%topic, %cid, "pubsub publish timed out; content already stored");
                false
            }
        };
        TransportOutcome::stored(cid, urls, published)
    }
}
