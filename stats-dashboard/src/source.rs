//! Remote endpoints the dashboard polls.
//!
//! [`DashboardSource`] is the seam between the fetch pipelines and the network;
//! [`HttpSource`] is the production implementation on top of `reqwest`.

use crate::{
    config::DashboardConfig,
    error::{FetchError, SetupError},
    types::{AnomalyRecord, AnomalyType, StatsSnapshot},
};
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use url::Url;

#[async_trait]
pub trait DashboardSource: Send + Sync {
    /// Fetch the current aggregate statistics.
    async fn fetch_stats(&self) -> Result<StatsSnapshot, FetchError>;

    /// Fetch anomalies, filtered server side by `anomaly_type`.
    async fn fetch_anomalies(
        &self,
        anomaly_type: &AnomalyType,
    ) -> Result<Vec<AnomalyRecord>, FetchError>;
}

/// Plain HTTP GET against the processing service and the anomaly detector.
#[derive(Debug, Clone)]
pub struct HttpSource {
    client: Client,
    stats_url: Url,
    anomalies_url: Url,
}

impl HttpSource {
    pub fn new(config: &DashboardConfig) -> Result<Self, SetupError> {
        let client = Client::builder().timeout(config.request_timeout).build()?;

        Ok(Self {
            client,
            stats_url: parse_url("stats", &config.stats_url)?,
            anomalies_url: parse_url("anomalies", &config.anomalies_url)?,
        })
    }

    pub fn stats_url(&self) -> &Url {
        &self.stats_url
    }

    /// Anomaly endpoint URL with the `anomaly_type` filter applied.
    pub fn anomalies_url(&self, anomaly_type: &AnomalyType) -> Url {
        let mut url = self.anomalies_url.clone();
        url.query_pairs_mut()
            .append_pair("anomaly_type", anomaly_type.as_query());
        url
    }

    async fn get_json<T>(&self, url: Url) -> Result<T, FetchError>
    where
        T: DeserializeOwned,
    {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|error| FetchError::Transport {
                url: url.to_string(),
                message: error.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|error| FetchError::Transport {
                url: url.to_string(),
                message: error.to_string(),
            })?;

        serde_json::from_slice(&body).map_err(|error| FetchError::Decode {
            url: url.to_string(),
            message: error.to_string(),
        })
    }
}

#[async_trait]
impl DashboardSource for HttpSource {
    async fn fetch_stats(&self) -> Result<StatsSnapshot, FetchError> {
        self.get_json(self.stats_url.clone()).await
    }

    async fn fetch_anomalies(
        &self,
        anomaly_type: &AnomalyType,
    ) -> Result<Vec<AnomalyRecord>, FetchError> {
        self.get_json(self.anomalies_url(anomaly_type)).await
    }
}

fn parse_url(name: &'static str, value: &str) -> Result<Url, SetupError> {
    Url::parse(value).map_err(|source| SetupError::InvalidUrl {
        name,
        value: value.to_string(),
        source,
    })
}
