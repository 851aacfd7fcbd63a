/// Dashboard configuration
///
/// Defaults point at the processing service (:8100) and the anomaly detector
/// (:8120) on localhost and poll every 5 seconds.
use crate::{scheduler::FirstTick, types::AnomalyKind};
use std::time::Duration;
use tracing::warn;

/// Period between two polling ticks.
pub const DEFAULT_POLL_PERIOD: Duration = Duration::from_millis(5000);

/// Per-request timeout applied by the HTTP client.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

pub const DEFAULT_STATS_URL: &str = "http://localhost:8100/stats";
pub const DEFAULT_ANOMALIES_URL: &str = "http://localhost:8120/anomaly_detector/anomalies";

#[derive(Debug, Clone, PartialEq)]
pub struct DashboardConfig {
    /// Stats endpoint URL
    pub stats_url: String,
    /// Anomaly endpoint URL, without the `anomaly_type` query
    pub anomalies_url: String,
    /// Polling period
    pub poll_period: Duration,
    /// Timeout for a single HTTP request
    pub request_timeout: Duration,
    /// Whether the first fetch fires on start or after one period
    pub first_tick: FirstTick,
    /// Anomaly kinds with a slot on the dashboard
    pub monitored: Vec<AnomalyKind>,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            stats_url: DEFAULT_STATS_URL.to_string(),
            anomalies_url: DEFAULT_ANOMALIES_URL.to_string(),
            poll_period: DEFAULT_POLL_PERIOD,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            first_tick: FirstTick::Immediate,
            monitored: AnomalyKind::monitored(),
        }
    }
}

impl DashboardConfig {
    /// Read configuration from the process environment.
    ///
    /// - `STATS_URL`, `ANOMALIES_URL`
    /// - `POLL_INTERVAL_MS`, `REQUEST_TIMEOUT_MS`
    /// - `POLL_FIRST_TICK` (`immediate` | `after_period`)
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`Self::from_env`] with an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        Self {
            stats_url: lookup("STATS_URL").unwrap_or(defaults.stats_url),
            anomalies_url: lookup("ANOMALIES_URL").unwrap_or(defaults.anomalies_url),
            poll_period: millis_var(&lookup, "POLL_INTERVAL_MS").unwrap_or(defaults.poll_period),
            request_timeout: millis_var(&lookup, "REQUEST_TIMEOUT_MS")
                .unwrap_or(defaults.request_timeout),
            first_tick: lookup("POLL_FIRST_TICK")
                .and_then(|value| match value.trim().to_lowercase().as_str() {
                    "immediate" => Some(FirstTick::Immediate),
                    "after_period" | "delayed" => Some(FirstTick::AfterPeriod),
                    other => {
                        warn!(value = other, "ignoring invalid POLL_FIRST_TICK");
                        None
                    }
                })
                .unwrap_or(defaults.first_tick),
            monitored: defaults.monitored,
        }
    }

    pub fn with_stats_url(mut self, url: impl Into<String>) -> Self {
        self.stats_url = url.into();
        self
    }

    pub fn with_anomalies_url(mut self, url: impl Into<String>) -> Self {
        self.anomalies_url = url.into();
        self
    }

    pub fn with_poll_period(mut self, period: Duration) -> Self {
        self.poll_period = period;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_first_tick(mut self, first_tick: FirstTick) -> Self {
        self.first_tick = first_tick;
        self
    }

    pub fn with_monitored(mut self, monitored: Vec<AnomalyKind>) -> Self {
        self.monitored = monitored;
        self
    }
}

/// Parse a positive millisecond duration, warning on garbage.
fn millis_var<F>(lookup: &F, key: &str) -> Option<Duration>
where
    F: Fn(&str) -> Option<String>,
{
    let raw = lookup(key)?;
    match raw.trim().parse::<u64>() {
        Ok(ms) if ms > 0 => Some(Duration::from_millis(ms)),
        _ => {
            warn!(key, value = %raw, "ignoring invalid duration, using default");
            None
        }
    }
}
