use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A cached value together with the point in time after which it is considered stale.
///
/// A stale envelope is still a perfectly valid value to return. Staleness only signals
/// that a refresh should be started; removing the entry is the backend's job.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// When this value becomes stale. `None` means it never does.
    #[serde(rename = "b", default, with = "fresh_until_millis")]
    pub fresh_until: Option<DateTime<Utc>>,
    /// The cached payload.
    #[serde(rename = "d", default)]
    pub value: Value,
}

impl Envelope {
    /// Wraps `value` so that it stays fresh for `fresh_for`, starting now.
    pub fn wrap(value: Value, fresh_for: Duration) -> Self {
        Self::wrap_at(value, fresh_for, Utc::now())
    }

    /// Wraps `value` so that it stays fresh for `fresh_for`, starting at `now`.
    ///
    /// A zero `fresh_for`, or one too large to be represented, never goes stale.
    pub fn wrap_at(value: Value, fresh_for: Duration, now: DateTime<Utc>) -> Self {
        let fresh_until = if fresh_for.is_zero() {
            None
        } else {
            TimeDelta::from_std(fresh_for)
                .ok()
                .and_then(|delta| now.checked_add_signed(delta))
        };
        Self { fresh_until, value }
    }

    /// Whether the freshness window had already passed at `now`.
    pub fn is_stale(&self, now: DateTime<Utc>) -> bool {
        self.fresh_until.is_some_and(|fresh_until| fresh_until < now)
    }

    pub fn into_value(self) -> Value {
        self.value
    }
}

/// Extracts the payload of a possibly absent envelope.
///
/// A missing envelope yields `null`, so a cache miss and a cached `null` look the same.
pub fn extract_value(envelope: Option<Envelope>) -> Value {
    envelope.map_or(Value::Null, Envelope::into_value)
}

/// Stores the staleness boundary as epoch milliseconds, with `0` for "never stale".
mod fresh_until_millis {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_i64(value.map_or(0, |dt| dt.timestamp_millis()))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = Option::<i64>::deserialize(deserializer)?.unwrap_or(0);
        if millis == 0 {
            return Ok(None);
        }
        DateTime::from_timestamp_millis(millis)
            .map(Some)
            .ok_or_else(|| serde::de::Error::custom("timestamp out of range"))
    }
}
