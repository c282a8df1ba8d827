use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use rand_core::{OsRng, RngCore};
use time::format_description::well_known::Rfc3339;

use crate::domains::envelope::{Envelope, ENVELOPE_TYPE, ENVELOPE_VERSION};
use crate::domains::message::Message;
use crate::error::{DualcastError, Result};

pub const NONCE_LEN: usize = 16;

pub struct EnvelopeBuilder;

impl EnvelopeBuilder {
    pub fn build(message: &Message) -> Result<Envelope> {
        let timestamp = message
            .created_at()
            .format(&Rfc3339)
            .map_err(|e| DualcastError::Serialization(e.to_string()))?;
        Ok(Envelope {
            kind: ENVELOPE_TYPE.to_string(),
            version: ENVELOPE_VERSION.to_string(),
            timestamp,
            message_id: message.id().to_string(),
            sender_id: message.sender_id().to_string(),
            recipient_id: message.recipient_id().to_string(),
            payload: BASE64.encode(message.payload()),
            nonce: Self::generate_nonce(),
        })
    }

    // Content addresses depend on this nonce; it must come from the OS CSPRNG.
    pub fn generate_nonce() -> String {
        let mut nonce = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut nonce);
        hex::encode(nonce)
    }
}
