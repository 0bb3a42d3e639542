use chrono::{DateTime, NaiveDateTime, Timelike, Utc};
use serde::{Deserialize, Serialize};

/// One run's extracted figures.
///
/// Field names on the wire follow the historical dataset format, so existing
/// `LATEST` values and history entries stay comparable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub source_url: String,
    #[serde(rename = "lastUpdatedAtApify", with = "iso_utc")]
    pub captured_at: DateTime<Utc>,
    pub read_me: String,
    pub infected: u64,
    pub deceased: u64,
    #[serde(rename = "lastUpdatedAtSource", with = "iso_local")]
    pub source_updated_at: NaiveDateTime,
}

impl Snapshot {
    /// Material equality: every field except `captured_at`.
    pub fn equals_ignoring_capture_time(&self, other: &Snapshot) -> bool {
        self.source_url == other.source_url
            && self.read_me == other.read_me
            && self.infected == other.infected
            && self.deceased == other.deceased
            && self.source_updated_at == other.source_updated_at
    }

    pub fn to_json(&self) -> serde_json::Value {
        // Plain struct of strings and integers; serialization cannot fail.
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

/// Drop seconds and sub-second precision.
pub fn truncate_to_minute(ts: DateTime<Utc>) -> DateTime<Utc> {
    ts.with_second(0)
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(ts)
}

const ISO_MILLIS: &str = "%Y-%m-%dT%H:%M:%S%.3fZ";

mod iso_utc {
    use chrono::{DateTime, NaiveDateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(ts: &DateTime<Utc>, s: S) -> Result<S::Ok, S::Error> {
        s.collect_str(&ts.format(super::ISO_MILLIS))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(d)?;
        DateTime::parse_from_rfc3339(&raw)
            .map(|t| t.with_timezone(&Utc))
            .or_else(|_| NaiveDateTime::parse_from_str(&raw, super::ISO_MILLIS).map(|n| n.and_utc()))
            .map_err(serde::de::Error::custom)
    }
}

/// Wall-clock time of the source, written with a `Z` suffix and no zone
/// conversion, as the dataset has always stored it.
mod iso_local {
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(ts: &NaiveDateTime, s: S) -> Result<S::Ok, S::Error> {
        s.collect_str(&ts.format(super::ISO_MILLIS))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<NaiveDateTime, D::Error> {
        let raw = String::deserialize(d)?;
        NaiveDateTime::parse_from_str(&raw, super::ISO_MILLIS)
            .or_else(|_| NaiveDateTime::parse_from_str(raw.trim_end_matches('Z'), "%Y-%m-%dT%H:%M:%S%.f"))
            .map_err(serde::de::Error::custom)
    }
}
