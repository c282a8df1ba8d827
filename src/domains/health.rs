use std::collections::BTreeMap;

use serde::{Serialize, Serializer};
use serde_json::Value;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthState {
    Unknown,
    Healthy,
    Unhealthy,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransportHealth {
    pub available: bool,
    pub detail: BTreeMap<String, Value>,
    #[serde(serialize_with = "serialize_checked_at")]
    pub last_checked: Option<OffsetDateTime>,
    pub error: Option<String>,
}

impl TransportHealth {
    pub fn unknown() -> Self {
        Self {
            available: false,
            detail: BTreeMap::new(),
            last_checked: None,
            error: None,
        }
    }

    pub fn healthy(detail: BTreeMap<String, Value>) -> Self {
        Self {
            available: true,
            detail,
            last_checked: Some(OffsetDateTime::now_utc()),
            error: None,
        }
    }

    // An unavailable transport never carries detail from an earlier probe.
    pub fn unhealthy(error: impl Into<String>) -> Self {
        Self {
            available: false,
            detail: BTreeMap::new(),
            last_checked: Some(OffsetDateTime::now_utc()),
            error: Some(error.into()),
        }
    }

    pub fn state(&self) -> HealthState {
        match (self.last_checked, self.available) {
            (None, _) => HealthState::Unknown,
            (Some(_), true) => HealthState::Healthy,
            (Some(_), false) => HealthState::Unhealthy,
        }
    }
}

fn serialize_checked_at<S>(
    value: &Option<OffsetDateTime>,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match value {
        Some(ts) => {
            let formatted = ts.format(&Rfc3339).map_err(serde::ser::Error::custom)?;
            serializer.serialize_some(&formatted)
        }
        None => serializer.serialize_none(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Recommendation {
    Primary,
    Degraded,
    Fallback,
    Disconnected,
}

impl Recommendation {
    pub fn from_health(live_channel_available: bool, content_store_available: bool) -> Self {
        match (live_channel_available, content_store_available) {
            (true, true) => Self::Primary,
            (true, false) => Self::Degraded,
            (false, true) => Self::Fallback,
            (false, false) => Self::Disconnected,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HealthSnapshot {
    pub live_channel: TransportHealth,
    pub content_store: TransportHealth,
}

impl HealthSnapshot {
    pub fn unknown() -> Self {
        Self {
            live_channel: TransportHealth::unknown(),
            content_store: TransportHealth::unknown(),
        }
    }

    pub fn recommendation(&self) -> Recommendation {
        Recommendation::from_health(self.live_channel.available, self.content_store.available)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn recommendation_table() {
        assert_eq!(Recommendation::from_health(true, true), Recommendation::Primary);
        assert_eq!(Recommendation::from_health(true, false), Recommendation::Degraded);
        assert_eq!(Recommendation::from_health(false, true), Recommendation::Fallback);
        assert_eq!(
            Recommendation::from_health(false, false),
            Recommendation::Disconnected
        );
    }

    #[test]
    fn states_follow_constructors() {
        assert_eq!(TransportHealth::unknown().state(), HealthState::Unknown);
        let mut detail = BTreeMap::new();
        detail.insert("peer_count".to_string(), json!(3));
        let healthy = TransportHealth::healthy(detail);
        assert_eq!(healthy.state(), HealthState::Healthy);
        assert!(healthy.error.is_none());

        let unhealthy = TransportHealth::unhealthy("connection refused");
        assert_eq!(unhealthy.state(), HealthState::Unhealthy);
        assert!(unhealthy.detail.is_empty());
    }

    #[test]
    fn serializes_timestamp_as_rfc3339() {
        let value = serde_json::to_value(TransportHealth::unhealthy("down")).unwrap();
        let checked = value.get("last_checked").and_then(|v| v.as_str()).unwrap();
        assert!(checked.contains('T'));
        assert_eq!(value.get("available"), Some(&json!(false)));

        let value = serde_json::to_value(TransportHealth::unknown()).unwrap();
        assert!(value.get("last_checked").unwrap().is_null());
    }

    #[test]
    fn snapshot_recommendation() {
        let mut snapshot = HealthSnapshot::unknown();
        assert_eq!(snapshot.recommendation(), Recommendation::Disconnected);
        snapshot.content_store = TransportHealth::healthy(BTreeMap::new());
        assert_eq!(snapshot.recommendation(), Recommendation::Fallback);
    }
}
