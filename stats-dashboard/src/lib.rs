//! Stats Dashboard - polling & reconciliation core
//!
//! Periodically polls the processing service for trading statistics and the
//! anomaly detector for anomaly events, keeping one coherent [`ViewState`]:
//! - stats snapshots are replaced wholesale
//! - each monitored anomaly kind keeps only its latest record, never regressing
//! - any fetch failure raises a shared error flag without touching good data
//!
//! Front ends subscribe to the [`ViewModel`] and draw [`render::project`].
pub mod config;
pub mod error;
pub mod pipeline;
pub mod render;
pub mod scheduler;
pub mod selector;
pub mod source;
pub mod types;
pub mod view;

pub use config::DashboardConfig;
pub use error::{FetchError, SetupError};
pub use render::{project, DashboardView};
pub use scheduler::{
    FirstTick, IntervalTicker, ManualTicker, ManualTrigger, PollScheduler, SchedulerHandle, Ticker,
};
pub use selector::{select_latest, select_latest_for};
pub use source::{DashboardSource, HttpSource};
pub use types::{AnomalyKind, AnomalyRecord, AnomalyType, EventType, StatsSnapshot};
pub use view::{Applied, MonitoredSlot, Tick, ViewModel, ViewState};
