//! Fetch pipelines: one request, one completion offered to the view.

use crate::{
    source::DashboardSource,
    types::AnomalyKind,
    view::{Applied, Tick, ViewModel},
};
use tracing::{debug, info, warn};

/// Fetch the stats snapshot and apply the outcome to the view.
pub async fn run_stats_pipeline<S>(source: &S, view: &ViewModel, tick: Tick) -> Applied
where
    S: DashboardSource + ?Sized,
{
    let outcome = source.fetch_stats().await;

    match &outcome {
        Ok(stats) => info!(
            %tick,
            num_buy_events = stats.num_buy_events,
            num_sell_events = stats.num_sell_events,
            "received stats"
        ),
        Err(error) => warn!(
            %tick,
            error_kind = error.kind(),
            url = error.url(),
            %error,
            "stats fetch failed"
        ),
    }

    let applied = view.apply_stats(tick, outcome);
    debug!(%tick, ?applied, "stats completion applied");
    applied
}

/// Fetch anomalies of `kind.anomaly_type`, reduce to the latest one on
/// `kind.event_type` and apply it to the matching slot.
pub async fn run_anomaly_pipeline<S>(
    source: &S,
    view: &ViewModel,
    kind: &AnomalyKind,
    tick: Tick,
) -> Applied
where
    S: DashboardSource + ?Sized,
{
    let outcome = source.fetch_anomalies(&kind.anomaly_type).await;

    match &outcome {
        Ok(records) => info!(%tick, %kind, records = records.len(), "received anomalies"),
        Err(error) => {
            warn!(
                %tick,
                %kind,
                error_kind = error.kind(),
                url = error.url(),
                %error,
                "anomaly fetch failed"
            )
        }
    }

    let applied = view.apply_anomalies(tick, kind, outcome);
    debug!(%tick, %kind, ?applied, "anomaly completion applied");
    applied
}
