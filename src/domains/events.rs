use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domains::delivery::DeliveryResult;
use crate::domains::message::TransportMode;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ClientEvent {
    SendEncryptedMessage {
        payload: Option<String>,
        recipient_id: String,
        transport_preference: Option<TransportMode>,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ChannelEvent {
    NewMessage {
        message_id: Uuid,
        sender_id: String,
        payload: String,
        timestamp: String,
    },
    MessageSent {
        message_id: Uuid,
        result: DeliveryResult,
    },
    Error {
        error_kind: String,
        message: String,
    },
}
