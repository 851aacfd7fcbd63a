use thiserror::Error;

/// Failure of a single fetch against one of the remote endpoints.
///
/// Every variant carries the URL that was requested so a log line is enough to
/// tell which pipeline failed.
#[derive(Debug, Clone, Eq, PartialEq, Error)]
pub enum FetchError {
    #[error("request to {url} failed: {message}")]
    Transport { url: String, message: String },

    #[error("request to {url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("response from {url} could not be decoded: {message}")]
    Decode { url: String, message: String },
}

impl FetchError {
    /// URL of the request that failed.
    pub fn url(&self) -> &str {
        match self {
            FetchError::Transport { url, .. }
            | FetchError::Status { url, .. }
            | FetchError::Decode { url, .. } => url,
        }
    }

    /// Short label used as a structured log field.
    pub fn kind(&self) -> &'static str {
        match self {
            FetchError::Transport { .. } => "transport",
            FetchError::Status { .. } => "status",
            FetchError::Decode { .. } => "decode",
        }
    }
}

/// Errors raised while wiring the dashboard together, before polling starts.
#[derive(Debug, Error)]
pub enum SetupError {
    #[error("invalid {name} URL '{value}': {source}")]
    InvalidUrl {
        name: &'static str,
        value: String,
        source: url::ParseError,
    },

    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}
