/// Pure projection of [`ViewState`] into what the dashboard displays
///
/// No business logic lives here; front ends only lay out the result.
use crate::{
    types::{AnomalyKind, AnomalyRecord, AnomalyType, EventType, StatsSnapshot},
    view::{MonitoredSlot, ViewState},
};

pub const ERROR_MESSAGE: &str = "Error found when fetching from API";
pub const LOADING_MESSAGE: &str = "Loading...";

#[derive(Debug, Clone, PartialEq)]
pub enum DashboardView {
    /// Any fetch failed: one generic message supersedes everything else
    Error { message: &'static str },
    /// First stats fetch has not completed yet
    Loading { message: &'static str },
    Ready(ReadyView),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReadyView {
    pub stats: StatsTable,
    pub anomalies: Vec<AnomalyPanel>,
}

/// Formatted cells of the stats table
#[derive(Debug, Clone, PartialEq)]
pub struct StatsTable {
    pub num_buy: String,
    pub num_sell: String,
    pub max_buy_price: String,
    pub max_sell_price: String,
    pub last_updated: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnomalyPanel {
    /// eg/ "Buy Event (Too Low)"
    pub title: String,
    pub body: AnomalyBody,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AnomalyBody {
    Latest {
        uuid: String,
        description: String,
        detected: String,
    },
    Empty(String),
}

/// Project the current view state into display content.
pub fn project(state: &ViewState) -> DashboardView {
    if state.has_error() {
        return DashboardView::Error {
            message: ERROR_MESSAGE,
        };
    }

    if !state.loaded() {
        return DashboardView::Loading {
            message: LOADING_MESSAGE,
        };
    }

    DashboardView::Ready(ReadyView {
        stats: StatsTable::from(state.stats()),
        anomalies: state.slots().iter().map(AnomalyPanel::from).collect(),
    })
}

impl DashboardView {
    /// Plain-text rendition, one display line per entry.
    pub fn lines(&self) -> Vec<String> {
        match self {
            DashboardView::Error { message } | DashboardView::Loading { message } => {
                vec![message.to_string()]
            }
            DashboardView::Ready(ready) => {
                let mut lines = vec![
                    "Latest Stats".to_string(),
                    ready.stats.num_buy.clone(),
                    ready.stats.num_sell.clone(),
                    ready.stats.max_buy_price.clone(),
                    ready.stats.max_sell_price.clone(),
                    ready.stats.last_updated.clone(),
                    "Latest Anomalies".to_string(),
                ];

                for panel in &ready.anomalies {
                    lines.push(panel.title.clone());
                    match &panel.body {
                        AnomalyBody::Latest {
                            uuid,
                            description,
                            detected,
                        } => {
                            lines.push(uuid.clone());
                            lines.push(description.clone());
                            lines.push(detected.clone());
                        }
                        AnomalyBody::Empty(message) => lines.push(message.clone()),
                    }
                }

                lines
            }
        }
    }
}

impl From<Option<&StatsSnapshot>> for StatsTable {
    fn from(stats: Option<&StatsSnapshot>) -> Self {
        let (num_buy, num_sell, max_buy, max_sell, updated) = match stats {
            Some(stats) => (
                stats.num_buy_events.to_string(),
                stats.num_sell_events.to_string(),
                format_price(stats.max_buy_price),
                format_price(stats.max_sell_price),
                stats.last_updated.clone(),
            ),
            None => Default::default(),
        };

        Self {
            num_buy: format!("# Buy: {num_buy}"),
            num_sell: format!("# Sell: {num_sell}"),
            max_buy_price: format!("Max Buy Price: {max_buy}"),
            max_sell_price: format!("Max Sell Price: {max_sell}"),
            last_updated: format!("Last Updated: {updated}"),
        }
    }
}

impl From<&MonitoredSlot> for AnomalyPanel {
    fn from(slot: &MonitoredSlot) -> Self {
        let kind = slot.kind();
        Self {
            title: panel_title(kind),
            body: match slot.latest() {
                Some(record) => AnomalyBody::from(record),
                None => AnomalyBody::Empty(empty_message(kind)),
            },
        }
    }
}

impl From<&AnomalyRecord> for AnomalyBody {
    fn from(record: &AnomalyRecord) -> Self {
        AnomalyBody::Latest {
            uuid: format!("UUID: {}", record.event_id),
            description: record.description.clone(),
            detected: format!("Detected on {}", record.timestamp),
        }
    }
}

fn panel_title(kind: &AnomalyKind) -> String {
    format!("{} Event ({})", side_label(&kind.event_type), kind.anomaly_type.label())
}

fn empty_message(kind: &AnomalyKind) -> String {
    let level = match &kind.anomaly_type {
        AnomalyType::TooLow => "low",
        AnomalyType::TooHigh => "high",
        AnomalyType::Other(other) => other.as_str(),
    };
    format!("No recent {level} {} anomalies detected.", kind.event_type)
}

fn side_label(event_type: &EventType) -> &str {
    match event_type {
        EventType::Buy => "Buy",
        EventType::Sell => "Sell",
        EventType::Other(other) => other,
    }
}

/// Prices keep at least one decimal place: `9.0`, `10.5`.
pub fn format_price(price: f64) -> String {
    if price.is_finite() && price.fract() == 0.0 {
        format!("{price:.1}")
    } else {
        price.to_string()
    }
}
