//! View state shared between the fetch pipelines and the renderer.
//!
//! [`ViewState`] holds the reconciliation rules (wholesale stats replacement,
//! monotonic anomaly slots, sticky error, stale-tick rejection). [`ViewModel`]
//! wraps it in a `watch` channel so every accepted write notifies the renderer.

use crate::{
    error::FetchError,
    selector::select_latest_for,
    types::{AnomalyKind, AnomalyRecord, StatsSnapshot},
};
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use tokio::sync::watch;
use tracing::debug;

/// Sequence number of a scheduler tick. Every fetch carries the tick that issued it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Tick(pub u64);

impl std::fmt::Display for Tick {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Outcome of offering a fetch completion to the view state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    /// Visible state changed
    Updated,
    /// Accepted, but nothing to show (empty list, older record, same snapshot)
    Unchanged,
    /// Issued by an older tick than a completion already applied for the same pipeline
    Stale,
    /// View was torn down before the fetch completed
    Unmounted,
}

impl Applied {
    pub fn is_updated(&self) -> bool {
        matches!(self, Applied::Updated)
    }
}

/// Latest anomaly retained for one [`AnomalyKind`].
#[derive(Debug, Clone, PartialEq)]
pub struct MonitoredSlot {
    kind: AnomalyKind,
    latest: Option<AnomalyRecord>,
    last_tick: Option<Tick>,
}

impl MonitoredSlot {
    fn new(kind: AnomalyKind) -> Self {
        Self {
            kind,
            latest: None,
            last_tick: None,
        }
    }

    pub fn kind(&self) -> &AnomalyKind {
        &self.kind
    }

    pub fn latest(&self) -> Option<&AnomalyRecord> {
        self.latest.as_ref()
    }
}

/// Everything the renderer needs to draw the dashboard.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewState {
    loaded: bool,
    error: Option<FetchError>,
    stats: Option<StatsSnapshot>,
    stats_tick: Option<Tick>,
    slots: Vec<MonitoredSlot>,
}

impl ViewState {
    /// Fresh state at mount: nothing loaded, no error, every slot empty.
    pub fn new(kinds: impl IntoIterator<Item = AnomalyKind>) -> Self {
        Self {
            loaded: false,
            error: None,
            stats: None,
            stats_tick: None,
            slots: kinds.into_iter().map(MonitoredSlot::new).collect(),
        }
    }

    /// True once the first stats fetch has completed, successfully or not.
    pub fn loaded(&self) -> bool {
        self.loaded
    }

    pub fn has_error(&self) -> bool {
        self.error.is_some()
    }

    /// Most recent failure from any pipeline.
    pub fn error(&self) -> Option<&FetchError> {
        self.error.as_ref()
    }

    pub fn stats(&self) -> Option<&StatsSnapshot> {
        self.stats.as_ref()
    }

    pub fn slots(&self) -> &[MonitoredSlot] {
        &self.slots
    }

    pub fn slot(&self, kind: &AnomalyKind) -> Option<&MonitoredSlot> {
        self.slots.iter().find(|slot| &slot.kind == kind)
    }

    pub fn kinds(&self) -> Vec<AnomalyKind> {
        self.slots.iter().map(|slot| slot.kind.clone()).collect()
    }

    /// Apply a stats fetch completion.
    ///
    /// Success replaces the snapshot wholesale, failure raises the error. Both
    /// mark the view as loaded.
    pub fn apply_stats(&mut self, tick: Tick, outcome: Result<StatsSnapshot, FetchError>) -> Applied {
        if is_stale(self.stats_tick, tick) {
            return Applied::Stale;
        }
        self.stats_tick = Some(tick);

        let was_loaded = std::mem::replace(&mut self.loaded, true);

        match outcome {
            Ok(stats) => {
                if was_loaded && self.stats.as_ref() == Some(&stats) {
                    return Applied::Unchanged;
                }
                self.stats = Some(stats);
            }
            Err(error) => self.error = Some(error),
        }

        Applied::Updated
    }

    /// Apply an anomaly fetch completion for `kind`.
    ///
    /// The slot is only ever replaced by a strictly newer record of the same
    /// trading side and anomaly type. Empty or non-matching lists leave it untouched.
    pub fn apply_anomalies(
        &mut self,
        tick: Tick,
        kind: &AnomalyKind,
        outcome: Result<Vec<AnomalyRecord>, FetchError>,
    ) -> Applied {
        let Some(index) = self.slots.iter().position(|slot| &slot.kind == kind) else {
            return Applied::Unchanged;
        };

        if is_stale(self.slots[index].last_tick, tick) {
            return Applied::Stale;
        }
        self.slots[index].last_tick = Some(tick);

        let records = match outcome {
            Ok(records) => records,
            Err(error) => {
                self.error = Some(error);
                return Applied::Updated;
            }
        };

        let slot = &mut self.slots[index];
        match select_latest_for(&records, kind) {
            Some(candidate)
                if slot
                    .latest
                    .as_ref()
                    .is_none_or(|current| candidate.is_newer_than(current)) =>
            {
                slot.latest = Some(candidate.clone());
                Applied::Updated
            }
            _ => Applied::Unchanged,
        }
    }
}

fn is_stale(last_applied: Option<Tick>, tick: Tick) -> bool {
    last_applied.is_some_and(|last| tick < last)
}

/// Cheaply cloneable handle to the mounted [`ViewState`].
#[derive(Debug, Clone)]
pub struct ViewModel {
    inner: Arc<ViewModelInner>,
}

#[derive(Debug)]
struct ViewModelInner {
    state: watch::Sender<ViewState>,
    mounted: AtomicBool,
}

impl ViewModel {
    /// Mount a new view monitoring the given anomaly kinds.
    pub fn new(kinds: impl IntoIterator<Item = AnomalyKind>) -> Self {
        let (state, _) = watch::channel(ViewState::new(kinds));
        Self {
            inner: Arc::new(ViewModelInner {
                state,
                mounted: AtomicBool::new(true),
            }),
        }
    }

    /// Receiver notified after every write that changed the view.
    pub fn subscribe(&self) -> watch::Receiver<ViewState> {
        self.inner.state.subscribe()
    }

    pub fn snapshot(&self) -> ViewState {
        self.inner.state.borrow().clone()
    }

    pub fn kinds(&self) -> Vec<AnomalyKind> {
        self.inner.state.borrow().kinds()
    }

    pub fn is_mounted(&self) -> bool {
        self.inner.mounted.load(Ordering::Acquire)
    }

    /// Tear the view down. Completions arriving afterwards are discarded.
    pub fn unmount(&self) {
        // Flip the flag under the channel's write lock so no write can interleave
        self.inner.state.send_if_modified(|_| {
            self.inner.mounted.store(false, Ordering::Release);
            false
        });
    }

    pub fn apply_stats(&self, tick: Tick, outcome: Result<StatsSnapshot, FetchError>) -> Applied {
        self.update(|state| state.apply_stats(tick, outcome))
    }

    pub fn apply_anomalies(
        &self,
        tick: Tick,
        kind: &AnomalyKind,
        outcome: Result<Vec<AnomalyRecord>, FetchError>,
    ) -> Applied {
        self.update(|state| state.apply_anomalies(tick, kind, outcome))
    }

    fn update(&self, apply: impl FnOnce(&mut ViewState) -> Applied) -> Applied {
        let mut applied = Applied::Unmounted;

        self.inner.state.send_if_modified(|state| {
            if !self.inner.mounted.load(Ordering::Acquire) {
                return false;
            }
            applied = apply(state);
            applied.is_updated()
        });

        if applied == Applied::Unmounted {
            debug!("discarding fetch completion for unmounted view");
        }

        applied
    }
}
