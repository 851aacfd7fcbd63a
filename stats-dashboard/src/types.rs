/// Core data types returned by the stats and anomaly endpoints
///
/// Field names match the JSON bodies served by the processing service
/// (`/stats`) and the anomaly detector (`/anomaly_detector/anomalies`).
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::cmp::Ordering;

/// Aggregate statistics snapshot
///
/// Always replaced wholesale, never merged field by field.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct StatsSnapshot {
    /// Number of buy events processed so far
    pub num_buy_events: u64,
    /// Number of sell events processed so far
    pub num_sell_events: u64,
    /// Highest buy price seen
    pub max_buy_price: f64,
    /// Highest sell price seen
    pub max_sell_price: f64,
    /// Time the processing service last refreshed its statistics
    pub last_updated: String,
}

/// Trading side an anomaly was raised for
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(from = "String", into = "String")]
pub enum EventType {
    Buy,
    Sell,
    Other(String),
}

impl EventType {
    /// Convert to wire string
    pub fn as_str(&self) -> &str {
        match self {
            EventType::Buy => "buy",
            EventType::Sell => "sell",
            EventType::Other(other) => other,
        }
    }
}

impl From<String> for EventType {
    fn from(value: String) -> Self {
        match value.as_str() {
            "buy" => EventType::Buy,
            "sell" => EventType::Sell,
            _ => EventType::Other(value),
        }
    }
}

impl From<EventType> for String {
    fn from(value: EventType) -> Self {
        value.as_str().to_string()
    }
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Anomaly classification
///
/// The query parameter uses `TooLow`/`TooHigh` while the detector persists
/// `Too Low`/`Too High`; both spellings deserialize to the same variant.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(from = "String", into = "String")]
pub enum AnomalyType {
    TooLow,
    TooHigh,
    Other(String),
}

impl AnomalyType {
    /// Value sent as the `anomaly_type` query parameter
    pub fn as_query(&self) -> &str {
        match self {
            AnomalyType::TooLow => "TooLow",
            AnomalyType::TooHigh => "TooHigh",
            AnomalyType::Other(other) => other,
        }
    }

    /// Human readable label, eg/ "Too Low"
    pub fn label(&self) -> &str {
        match self {
            AnomalyType::TooLow => "Too Low",
            AnomalyType::TooHigh => "Too High",
            AnomalyType::Other(other) => other,
        }
    }
}

impl From<String> for AnomalyType {
    fn from(value: String) -> Self {
        match value.as_str() {
            "TooLow" | "Too Low" => AnomalyType::TooLow,
            "TooHigh" | "Too High" => AnomalyType::TooHigh,
            _ => AnomalyType::Other(value),
        }
    }
}

impl From<AnomalyType> for String {
    fn from(value: AnomalyType) -> Self {
        value.as_query().to_string()
    }
}

/// Single anomaly reported by the anomaly detector
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct AnomalyRecord {
    /// Opaque identifier of the offending event (string or number on the wire)
    #[serde(deserialize_with = "de_opaque_id")]
    pub event_id: String,
    /// Side of the offending event
    pub event_type: EventType,
    /// Why the event was flagged
    pub anomaly_type: AnomalyType,
    /// Free text produced by the detector
    pub description: String,
    /// Detection time as sent by the detector
    pub timestamp: String,
}

impl AnomalyRecord {
    /// Parsed detection time, if the timestamp is a recognised ISO-8601 form.
    pub fn detected_at(&self) -> Option<DateTime<Utc>> {
        parse_timestamp(&self.timestamp)
    }

    /// Chronological comparison of detection times.
    ///
    /// Parseable timestamps always order after unparseable ones. Two
    /// unparseable timestamps fall back to comparing the raw strings.
    pub fn cmp_detected(&self, other: &AnomalyRecord) -> Ordering {
        match (self.detected_at(), other.detected_at()) {
            (Some(this), Some(that)) => this.cmp(&that),
            (Some(_), None) => Ordering::Greater,
            (None, Some(_)) => Ordering::Less,
            (None, None) => self.timestamp.cmp(&other.timestamp),
        }
    }

    /// Check if this record was detected strictly after `other`
    pub fn is_newer_than(&self, other: &AnomalyRecord) -> bool {
        self.cmp_detected(other) == Ordering::Greater
    }
}

/// The (event_type, anomaly_type) pair a dashboard slot monitors
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AnomalyKind {
    pub event_type: EventType,
    pub anomaly_type: AnomalyType,
}

impl AnomalyKind {
    pub fn new(event_type: EventType, anomaly_type: AnomalyType) -> Self {
        Self {
            event_type,
            anomaly_type,
        }
    }

    /// Buy events priced below the detector's low threshold
    pub fn buy_too_low() -> Self {
        Self::new(EventType::Buy, AnomalyType::TooLow)
    }

    /// Sell events priced above the detector's high threshold
    pub fn sell_too_high() -> Self {
        Self::new(EventType::Sell, AnomalyType::TooHigh)
    }

    /// Kinds shown by default: one per trading side.
    pub fn monitored() -> Vec<Self> {
        vec![Self::buy_too_low(), Self::sell_too_high()]
    }

    /// Check if `record` carries both this kind's trading side and anomaly type
    pub fn matches(&self, record: &AnomalyRecord) -> bool {
        record.event_type == self.event_type && record.anomaly_type == self.anomaly_type
    }
}

impl std::fmt::Display for AnomalyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.event_type, self.anomaly_type.as_query())
    }
}

/// Parse an RFC 3339 timestamp, or a naive ISO-8601 date-time taken as UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|time| time.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
                .ok()
                .map(|naive| naive.and_utc())
        })
}

fn de_opaque_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OpaqueId {
        Text(String),
        Number(serde_json::Number),
    }

    Ok(match OpaqueId::deserialize(deserializer)? {
        OpaqueId::Text(text) => text,
        OpaqueId::Number(number) => number.to_string(),
    })
}
