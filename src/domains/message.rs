use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::error::DualcastError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportMode {
    #[serde(alias = "websocket")]
    Primary,
    #[serde(alias = "ipfs")]
    Fallback,
    #[serde(alias = "both")]
    Dual,
}

impl TransportMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Primary => "primary",
            Self::Fallback => "fallback",
            Self::Dual => "dual",
        }
    }

    pub fn uses_primary(&self) -> bool {
        matches!(self, Self::Primary | Self::Dual)
    }

    pub fn uses_fallback(&self) -> bool {
        matches!(self, Self::Fallback | Self::Dual)
    }
}

impl Default for TransportMode {
    fn default() -> Self {
        Self::Dual
    }
}

impl fmt::Display for TransportMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransportMode {
    type Err = DualcastError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "primary" | "websocket" => Ok(Self::Primary),
            "fallback" | "ipfs" => Ok(Self::Fallback),
            "dual" | "both" => Ok(Self::Dual),
            other => Err(DualcastError::Validation(format!(
                "unknown transport mode '{other}'"
            ))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Message {
    id: Uuid,
    sender_id: String,
    recipient_id: String,
    payload: Vec<u8>,
    transport_mode: TransportMode,
    created_at: OffsetDateTime,
}

impl Message {
    pub fn new(
        sender_id: impl Into<String>,
        recipient_id: impl Into<String>,
        payload: Vec<u8>,
        transport_mode: TransportMode,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            sender_id: sender_id.into(),
            recipient_id: recipient_id.into(),
            payload,
            transport_mode,
            created_at: OffsetDateTime::now_utc(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn sender_id(&self) -> &str {
        &self.sender_id
    }

    pub fn recipient_id(&self) -> &str {
        &self.recipient_id
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    pub fn transport_mode(&self) -> TransportMode {
        self.transport_mode
    }

    pub fn created_at(&self) -> OffsetDateTime {
        self.created_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_modes_and_aliases() {
        assert_eq!("primary".parse::<TransportMode>().unwrap(), TransportMode::Primary);
        assert_eq!("WebSocket".parse::<TransportMode>().unwrap(), TransportMode::Primary);
        assert_eq!("ipfs".parse::<TransportMode>().unwrap(), TransportMode::Fallback);
        assert_eq!(" both ".parse::<TransportMode>().unwrap(), TransportMode::Dual);
        let err = "carrier-pigeon".parse::<TransportMode>().unwrap_err();
        assert_eq!(err.kind(), "validation_error");
    }

    #[test]
    fn serde_accepts_aliases() {
        let mode: TransportMode = serde_json::from_str("\"both\"").unwrap();
        assert_eq!(mode, TransportMode::Dual);
        assert_eq!(serde_json::to_string(&mode).unwrap(), "\"dual\"");
    }

    #[test]
    fn messages_get_distinct_ids() {
        let a = Message::new("s", "r", b"x".to_vec(), TransportMode::Primary);
        let b = Message::new("s", "r", b"x".to_vec(), TransportMode::Primary);
        assert_ne!(a.id(), b.id());
        assert_eq!(a.payload(), b"x");
        assert!(a.transport_mode().uses_primary());
        assert!(!a.transport_mode().uses_fallback());
    }
}
