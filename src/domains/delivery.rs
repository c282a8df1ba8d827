use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domains::envelope::ContentId;
use crate::error::DualcastError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportKind {
    Primary,
    Fallback,
}

impl TransportKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Primary => "primary",
            Self::Fallback => "fallback",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OutcomeDetail {
    Delivered,
    Stored {
        cid: ContentId,
        gateway_urls: Vec<String>,
        published: bool,
    },
    Failed {
        error_kind: String,
        message: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransportOutcome {
    pub attempted: bool,
    pub succeeded: bool,
    pub detail: OutcomeDetail,
}

impl TransportOutcome {
    pub fn delivered() -> Self {
        Self {
            attempted: true,
            succeeded: true,
            detail: OutcomeDetail::Delivered,
        }
    }

    pub fn stored(cid: ContentId, gateway_urls: Vec<String>, published: bool) -> Self {
        Self {
            attempted: true,
            succeeded: true,
            detail: OutcomeDetail::Stored {
                cid,
                gateway_urls,
                published,
            },
        }
    }

    pub fn failed(error: &DualcastError) -> Self {
        Self {
            attempted: true,
            succeeded: false,
            detail: OutcomeDetail::Failed {
                error_kind: error.kind().to_string(),
                message: error.to_string(),
            },
        }
    }

    pub fn cid(&self) -> Option<&ContentId> {
        match &self.detail {
            OutcomeDetail::Stored { cid, .. } => Some(cid),
            _ => None,
        }
    }

    pub fn error_kind(&self) -> Option<&str> {
        match &self.detail {
            OutcomeDetail::Failed { error_kind, .. } => Some(error_kind.as_str()),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeliveryResult {
    pub message_id: Uuid,
    pub succeeded: bool,
    pub per_transport: BTreeMap<TransportKind, TransportOutcome>,
}

impl DeliveryResult {
    pub fn new(message_id: Uuid) -> Self {
        Self {
            message_id,
            succeeded: false,
            per_transport: BTreeMap::new(),
        }
    }

    pub fn record(&mut self, kind: TransportKind, outcome: TransportOutcome) {
        self.per_transport.insert(kind, outcome);
        self.succeeded = self.per_transport.values().any(|o| o.succeeded);
    }

    pub fn outcome(&self, kind: TransportKind) -> Option<&TransportOutcome> {
        self.per_transport.get(&kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overall_success_needs_one_transport() {
        let mut result = DeliveryResult::new(Uuid::new_v4());
        result.record(
            TransportKind::Primary,
            TransportOutcome::failed(&DualcastError::ChannelUnavailable("u1".into())),
        );
        assert!(!result.succeeded);
        result.record(
            TransportKind::Fallback,
            TransportOutcome::stored(ContentId::new("bafy1"), Vec::new(), false),
        );
        assert!(result.succeeded);
        assert_eq!(
            result.outcome(TransportKind::Primary).and_then(|o| o.error_kind()),
            Some("channel_unavailable")
        );
    }

    #[test]
    fn serializes_with_transport_names() {
        let mut result = DeliveryResult::new(Uuid::new_v4());
        result.record(TransportKind::Primary, TransportOutcome::delivered());
        let value = serde_json::to_value(&result).unwrap();
        let primary = &value["per_transport"]["primary"];
        assert_eq!(primary["succeeded"], serde_json::json!(true));
        assert_eq!(primary["detail"]["kind"], serde_json::json!("delivered"));
    }
}
