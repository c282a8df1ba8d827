use serde::{Deserialize, Serialize};

use crate::error::{DualcastError, Result};

pub const ENVELOPE_TYPE: &str = "chat_message";
pub const ENVELOPE_VERSION: &str = "1.0";

/// Wire form of a message handed to the content store and pub/sub.
///
/// Field order is fixed so that serializing the same envelope twice yields
/// identical bytes, and therefore the same content id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(rename = "type")]
    pub kind: String,
    pub version: String,
    pub timestamp: String,
    pub message_id: String,
    pub sender_id: String,
    pub recipient_id: String,
    pub payload: String,
    pub nonce: String,
}

impl Envelope {
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(self).map_err(|e| DualcastError::Serialization(e.to_string()))
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let envelope: Envelope = serde_json::from_slice(bytes)
            .map_err(|e| DualcastError::Serialization(e.to_string()))?;
        if envelope.version != ENVELOPE_VERSION {
            return Err(DualcastError::Serialization(format!(
                "unsupported envelope version {}",
                envelope.version
            )));
        }
        Ok(envelope)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentId(String);

impl ContentId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ContentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
