//! Poll scheduler
//!
//! Owns a repeating timer and, on every tick, spawns the stats pipeline and one
//! anomaly pipeline per monitored kind. Ticks never wait for earlier fetches to
//! complete; stale completions are rejected by the view instead.

use crate::{
    pipeline::{run_anomaly_pipeline, run_stats_pipeline},
    source::DashboardSource,
    types::AnomalyKind,
    view::{Tick, ViewModel},
};
use async_trait::async_trait;
use std::{sync::Arc, time::Duration};
use tokio::{
    sync::{mpsc, oneshot},
    task::JoinHandle,
    time::{Instant, Interval, MissedTickBehavior},
};
use tracing::{debug, info, warn};

/// When the first tick fires after [`PollScheduler::start`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FirstTick {
    /// Fetch straight away, then every period
    Immediate,
    /// Wait one full period before the first fetch
    AfterPeriod,
}

/// Source of scheduler ticks.
#[async_trait]
pub trait Ticker: Send {
    /// Resolve when the next tick is due.
    async fn tick(&mut self);
}

/// Wall-clock ticker backed by [`tokio::time::Interval`].
#[derive(Debug)]
pub struct IntervalTicker {
    interval: Interval,
}

impl IntervalTicker {
    /// Must be called from within a tokio runtime. Panics if `period` is zero.
    pub fn new(period: Duration, first_tick: FirstTick) -> Self {
        let start = match first_tick {
            FirstTick::Immediate => Instant::now(),
            FirstTick::AfterPeriod => Instant::now() + period,
        };

        let mut interval = tokio::time::interval_at(start, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        Self { interval }
    }
}

#[async_trait]
impl Ticker for IntervalTicker {
    async fn tick(&mut self) {
        self.interval.tick().await;
    }
}

/// Ticker fired by hand through a [`ManualTrigger`].
#[derive(Debug)]
pub struct ManualTicker {
    rx: mpsc::UnboundedReceiver<()>,
}

#[derive(Debug, Clone)]
pub struct ManualTrigger {
    tx: mpsc::UnboundedSender<()>,
}

impl ManualTicker {
    pub fn new() -> (Self, ManualTrigger) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { rx }, ManualTrigger { tx })
    }
}

impl ManualTrigger {
    /// Queue one tick. Returns false once the ticker has been dropped.
    pub fn fire(&self) -> bool {
        self.tx.send(()).is_ok()
    }
}

#[async_trait]
impl Ticker for ManualTicker {
    async fn tick(&mut self) {
        if self.rx.recv().await.is_none() {
            // Every trigger is gone, no tick will ever come
            std::future::pending::<()>().await;
        }
    }
}

pub struct PollScheduler<S, T> {
    source: Arc<S>,
    view: ViewModel,
    ticker: T,
}

impl<S, T> PollScheduler<S, T>
where
    S: DashboardSource + 'static,
    T: Ticker + 'static,
{
    pub fn new(source: Arc<S>, view: ViewModel, ticker: T) -> Self {
        Self {
            source,
            view,
            ticker,
        }
    }

    /// Arm the timer. The returned handle must be stopped on teardown.
    pub fn start(self) -> SchedulerHandle {
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let view = self.view.clone();

        let task = tokio::spawn(run_poll_loop(
            self.source,
            self.view,
            self.ticker,
            shutdown_rx,
        ));

        SchedulerHandle {
            shutdown_tx: Some(shutdown_tx),
            task: Some(task),
            view,
        }
    }
}

/// Handle to a running [`PollScheduler`].
///
/// [`SchedulerHandle::stop`] consumes the handle, so it can only be called once.
/// Dropping a handle that was never stopped aborts the timer task.
#[derive(Debug)]
pub struct SchedulerHandle {
    shutdown_tx: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
    view: ViewModel,
}

impl SchedulerHandle {
    pub fn view(&self) -> &ViewModel {
        &self.view
    }

    /// Disarm the timer and unmount the view.
    ///
    /// In-flight fetches are not cancelled, their completions are discarded.
    pub async fn stop(mut self) {
        if let Some(shutdown_tx) = self.shutdown_tx.take() {
            let _ = shutdown_tx.send(());
        }

        if let Some(task) = self.task.take() {
            if let Err(error) = task.await {
                warn!(%error, "poll scheduler task did not exit cleanly");
            }
        }

        self.view.unmount();
    }
}

impl Drop for SchedulerHandle {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            warn!("scheduler handle dropped without stop, aborting poll loop");
            task.abort();
            self.view.unmount();
        }
    }
}

async fn run_poll_loop<S, T>(
    source: Arc<S>,
    view: ViewModel,
    mut ticker: T,
    mut shutdown_rx: oneshot::Receiver<()>,
) where
    S: DashboardSource + 'static,
    T: Ticker,
{
    let kinds = view.kinds();
    info!(monitored = kinds.len(), "poll scheduler started");

    let mut issued = 0u64;
    loop {
        tokio::select! {
            biased;
            _ = &mut shutdown_rx => break,
            _ = ticker.tick() => {
                issued += 1;
                let tick = Tick(issued);
                debug!(%tick, "poll tick");
                spawn_pipelines(&source, &view, &kinds, tick);
            }
        }
    }

    info!(ticks = issued, "poll scheduler stopped");
}

/// Fire-and-forget: the stats pipeline plus one anomaly pipeline per kind.
fn spawn_pipelines<S>(source: &Arc<S>, view: &ViewModel, kinds: &[AnomalyKind], tick: Tick)
where
    S: DashboardSource + 'static,
{
    {
        let source = Arc::clone(source);
        let view = view.clone();
        tokio::spawn(async move {
            run_stats_pipeline(source.as_ref(), &view, tick).await;
        });
    }

    for kind in kinds {
        let source = Arc::clone(source);
        let view = view.clone();
        let kind = kind.clone();
        tokio::spawn(async move {
            run_anomaly_pipeline(source.as_ref(), &view, &kind, tick).await;
        });
    }
}
