use async_trait::async_trait;
use stats_dashboard::{
    project, AnomalyKind, AnomalyRecord, AnomalyType, DashboardView, EventType, FetchError,
    FirstTick, IntervalTicker, ManualTicker, ManualTrigger, PollScheduler, SchedulerHandle,
    StatsSnapshot, ViewModel, render::ERROR_MESSAGE, DashboardSource,
};
use std::{
    collections::{HashMap, VecDeque},
    sync::{Arc, Mutex},
    time::Duration,
};

/// One scripted response: optional latency, then the outcome.
struct Scripted<T> {
    delay: Duration,
    outcome: Result<T, FetchError>,
}

impl<T> Scripted<T> {
    fn now(outcome: Result<T, FetchError>) -> Self {
        Self {
            delay: Duration::ZERO,
            outcome,
        }
    }

    fn after(delay: Duration, outcome: Result<T, FetchError>) -> Self {
        Self { delay, outcome }
    }
}

/// Source answering from per-endpoint queues, one entry per request.
///
/// An exhausted stats queue never answers; an exhausted anomaly queue answers
/// with an empty list.
#[derive(Default)]
struct ScriptedSource {
    stats: Mutex<VecDeque<Scripted<StatsSnapshot>>>,
    anomalies: Mutex<HashMap<String, VecDeque<Scripted<Vec<AnomalyRecord>>>>>,
}

impl ScriptedSource {
    fn push_stats(&self, scripted: Scripted<StatsSnapshot>) {
        self.stats.lock().unwrap().push_back(scripted);
    }

    fn push_anomalies(&self, anomaly_type: AnomalyType, scripted: Scripted<Vec<AnomalyRecord>>) {
        self.anomalies
            .lock()
            .unwrap()
            .entry(anomaly_type.as_query().to_string())
            .or_default()
            .push_back(scripted);
    }
}

#[async_trait]
impl DashboardSource for ScriptedSource {
    async fn fetch_stats(&self) -> Result<StatsSnapshot, FetchError> {
        let next = self.stats.lock().unwrap().pop_front();
        match next {
            Some(scripted) => {
                tokio::time::sleep(scripted.delay).await;
                scripted.outcome
            }
            None => std::future::pending().await,
        }
    }

    async fn fetch_anomalies(
        &self,
        anomaly_type: &AnomalyType,
    ) -> Result<Vec<AnomalyRecord>, FetchError> {
        let next = self
            .anomalies
            .lock()
            .unwrap()
            .get_mut(anomaly_type.as_query())
            .and_then(VecDeque::pop_front);
        match next {
            Some(scripted) => {
                tokio::time::sleep(scripted.delay).await;
                scripted.outcome
            }
            None => Ok(vec![]),
        }
    }
}

struct Harness {
    source: Arc<ScriptedSource>,
    view: ViewModel,
    trigger: ManualTrigger,
    handle: SchedulerHandle,
}

impl Harness {
    fn start() -> Self {
        let source = Arc::new(ScriptedSource::default());
        let view = ViewModel::new(AnomalyKind::monitored());
        let (ticker, trigger) = ManualTicker::new();
        let handle = PollScheduler::new(Arc::clone(&source), view.clone(), ticker).start();

        Self {
            source,
            view,
            trigger,
            handle,
        }
    }

    /// Fire one tick and let every zero-latency fetch complete.
    async fn tick(&self) {
        assert!(self.trigger.fire());
        settle(Duration::from_millis(1)).await;
    }
}

/// With the clock paused, sleeping only returns once every runnable task has run.
async fn settle(duration: Duration) {
    tokio::time::sleep(duration).await;
}

fn stats(num_buy_events: u64) -> StatsSnapshot {
    StatsSnapshot {
        num_buy_events,
        num_sell_events: 3,
        max_buy_price: 10.5,
        max_sell_price: 9.0,
        last_updated: "2024-01-01T00:00:00Z".to_string(),
    }
}

fn anomaly(event_type: EventType, event_id: &str, timestamp: &str) -> AnomalyRecord {
    AnomalyRecord {
        event_id: event_id.to_string(),
        anomaly_type: match event_type {
            EventType::Sell => AnomalyType::TooHigh,
            _ => AnomalyType::TooLow,
        },
        event_type,
        description: format!("anomaly {event_id}"),
        timestamp: timestamp.to_string(),
    }
}

fn network_error() -> FetchError {
    FetchError::Transport {
        url: "http://localhost:8100/stats".to_string(),
        message: "error sending request: connection refused".to_string(),
    }
}

fn buy_slot_id(view: &ViewModel) -> Option<String> {
    view.snapshot()
        .slot(&AnomalyKind::buy_too_low())
        .and_then(|slot| slot.latest())
        .map(|record| record.event_id.clone())
}

#[tokio::test(start_paused = true)]
async fn test_stats_snapshot_rendered_as_table() {
    let harness = Harness::start();
    harness.source.push_stats(Scripted::now(Ok(stats(5))));

    harness.tick().await;

    let lines = project(&harness.view.snapshot()).lines();
    for expected in ["# Buy: 5", "# Sell: 3", "Max Buy Price: 10.5", "Max Sell Price: 9.0"] {
        assert!(lines.iter().any(|line| line == expected), "missing {expected}");
    }

    harness.handle.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_slot_keeps_latest_across_empty_response() {
    let harness = Harness::start();
    harness.source.push_anomalies(
        AnomalyType::TooLow,
        Scripted::now(Ok(vec![
            anomaly(EventType::Buy, "t1", "2024-01-01T00:00:01Z"),
            anomaly(EventType::Buy, "t2", "2024-01-01T00:00:02Z"),
        ])),
    );
    harness
        .source
        .push_anomalies(AnomalyType::TooLow, Scripted::now(Ok(vec![])));

    harness.tick().await;
    assert_eq!(buy_slot_id(&harness.view).as_deref(), Some("t2"));

    harness.tick().await;
    assert_eq!(buy_slot_id(&harness.view).as_deref(), Some("t2"));

    harness.handle.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_stats_failure_overrides_whole_view() {
    let harness = Harness::start();
    harness.source.push_stats(Scripted::now(Ok(stats(5))));
    harness.source.push_anomalies(
        AnomalyType::TooLow,
        Scripted::now(Ok(vec![anomaly(EventType::Buy, "valid", "2024-01-01T00:00:01Z")])),
    );
    harness.source.push_stats(Scripted::now(Err(network_error())));

    harness.tick().await;
    assert!(matches!(project(&harness.view.snapshot()), DashboardView::Ready(_)));

    harness.tick().await;
    let state = harness.view.snapshot();
    assert!(state.has_error());
    assert_eq!(buy_slot_id(&harness.view).as_deref(), Some("valid"));
    assert_eq!(
        project(&state),
        DashboardView::Error {
            message: ERROR_MESSAGE
        }
    );

    // Backend recovers, error stays raised
    harness.source.push_stats(Scripted::now(Ok(stats(6))));
    harness.tick().await;
    let state = harness.view.snapshot();
    assert_eq!(state.stats().unwrap().num_buy_events, 6);
    assert!(state.has_error());

    harness.handle.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_loaded_transitions_once() {
    let harness = Harness::start();
    let mut rx = harness.view.subscribe();
    assert!(!rx.borrow().loaded());

    harness.source.push_stats(Scripted::now(Err(network_error())));
    harness.source.push_stats(Scripted::now(Ok(stats(1))));
    harness.source.push_stats(Scripted::now(Err(network_error())));

    let mut history = Vec::new();
    for _ in 0..3 {
        harness.tick().await;
        history.push(rx.borrow_and_update().loaded());
    }

    assert_eq!(history, vec![true, true, true]);
    harness.handle.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_slow_response_from_older_tick_is_discarded() {
    let harness = Harness::start();
    harness
        .source
        .push_stats(Scripted::after(Duration::from_secs(10), Ok(stats(1))));
    harness.source.push_stats(Scripted::now(Ok(stats(2))));

    harness.tick().await;
    assert!(!harness.view.snapshot().loaded());

    harness.tick().await;
    assert_eq!(harness.view.snapshot().stats().unwrap().num_buy_events, 2);

    // Tick 1 finally answers and is rejected as stale
    settle(Duration::from_secs(20)).await;
    assert_eq!(harness.view.snapshot().stats().unwrap().num_buy_events, 2);

    harness.handle.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_completion_after_stop_is_discarded() {
    let harness = Harness::start();
    harness
        .source
        .push_stats(Scripted::after(Duration::from_secs(10), Ok(stats(1))));

    harness.tick().await;

    let Harness {
        view,
        trigger,
        handle,
        ..
    } = harness;
    handle.stop().await;

    settle(Duration::from_secs(20)).await;
    assert!(!view.snapshot().loaded());
    assert!(!trigger.fire());
}

#[tokio::test(start_paused = true)]
async fn test_first_tick_policy() {
    struct TestCase {
        first_tick: FirstTick,
        loaded_after_start: bool,
    }

    let tests = vec![
        TestCase {
            // TC0: fetch on mount
            first_tick: FirstTick::Immediate,
            loaded_after_start: true,
        },
        TestCase {
            // TC1: first fetch one full period after mount
            first_tick: FirstTick::AfterPeriod,
            loaded_after_start: false,
        },
    ];

    let period = Duration::from_millis(5000);

    for (index, test) in tests.into_iter().enumerate() {
        let source = Arc::new(ScriptedSource::default());
        source.push_stats(Scripted::now(Ok(stats(5))));
        let view = ViewModel::new(AnomalyKind::monitored());

        let handle = PollScheduler::new(
            Arc::clone(&source),
            view.clone(),
            IntervalTicker::new(period, test.first_tick),
        )
        .start();

        settle(Duration::from_millis(1)).await;
        assert_eq!(
            view.snapshot().loaded(),
            test.loaded_after_start,
            "TC{} failed",
            index
        );

        settle(period).await;
        assert!(view.snapshot().loaded(), "TC{} failed", index);

        handle.stop().await;
    }
}
