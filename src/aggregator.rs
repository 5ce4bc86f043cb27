// Live status aggregator: owns the current snapshot, the error side channel and the
// single in-flight refresh cycle. All state changes go through `apply`.

use chrono::{DateTime, Utc};
use futures_util::FutureExt;
use futures_util::future::{BoxFuture, Shared};
use serde::Serialize;
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::{broadcast, watch};

use crate::error::{FetchError, RefreshError};
use crate::fallback::FallbackProvider;
use crate::merger::{self, Merged};
use crate::models::{OperationReport, StatusPatch, StatusSnapshot};
use crate::source::StatusSource;

const SESSION_EVENT_CAPACITY: usize = 16;

type CycleFuture = Shared<BoxFuture<'static, Arc<StatusSnapshot>>>;

/// Published when a fetch or operation hits a 401. The transport has
/// already cleared the session; global handling (re-login) listens here.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    Unauthorized { at: DateTime<Utc> },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshStats {
    pub cycles_started: u64,
    pub refreshes_applied: u64,
    pub failures_total: u64,
    pub consecutive_failures: u32,
    pub triggers_dropped: u64,
    pub stale_results_discarded: u64,
}

struct State {
    snapshot: Arc<StatusSnapshot>,
    last_error: Option<RefreshError>,
    stats: RefreshStats,
}

struct InFlight {
    id: u64,
    /// Epoch the cycle started under; older than the current one means stale.
    epoch: u64,
    cycle: CycleFuture,
    /// A trigger landed on the stale cycle; start a fresh one when it settles.
    rerun: bool,
}

enum Join {
    Started(CycleFuture),
    Joined(CycleFuture),
    /// A cycle from before the last `halt` is still fetching.
    Stale(CycleFuture),
    Halted,
}

pub struct Aggregator {
    source: Arc<dyn StatusSource>,
    fallback: Option<FallbackProvider>,
    state: Mutex<State>,
    in_flight: Mutex<Option<InFlight>>,
    next_cycle_id: AtomicU64,
    /// Bumped by `halt`; a cycle that finishes under an older epoch is discarded.
    epoch: AtomicU64,
    /// Written only while holding `in_flight`.
    accepting: AtomicBool,
    snapshot_tx: watch::Sender<Arc<StatusSnapshot>>,
    session_tx: broadcast::Sender<SessionEvent>,
}

impl std::fmt::Debug for Aggregator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Aggregator")
            .field("source", &self.source.name())
            .field("fallback", &self.fallback.is_some())
            .field("epoch", &self.epoch.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|e| e.into_inner())
}

impl Aggregator {
    pub fn new(source: Arc<dyn StatusSource>, fallback: Option<FallbackProvider>) -> Arc<Self> {
        let initial = Arc::new(StatusSnapshot::empty());
        let (snapshot_tx, _) = watch::channel(initial.clone());
        let (session_tx, _) = broadcast::channel(SESSION_EVENT_CAPACITY);
        Arc::new(Self {
            source,
            fallback,
            state: Mutex::new(State {
                snapshot: initial,
                last_error: None,
                stats: RefreshStats::default(),
            }),
            in_flight: Mutex::new(None),
            next_cycle_id: AtomicU64::new(0),
            epoch: AtomicU64::new(0),
            accepting: AtomicBool::new(true),
            snapshot_tx,
            session_tx,
        })
    }

    pub fn current_snapshot(&self) -> Arc<StatusSnapshot> {
        lock(&self.state).snapshot.clone()
    }

    pub fn last_error(&self) -> Option<RefreshError> {
        lock(&self.state).last_error.clone()
    }

    /// True while a cycle whose result will be applied is fetching.
    pub fn is_refreshing(&self) -> bool {
        let epoch = self.epoch.load(Ordering::SeqCst);
        lock(&self.in_flight)
            .as_ref()
            .is_some_and(|f| f.epoch == epoch)
    }

    pub fn stats(&self) -> RefreshStats {
        lock(&self.state).stats.clone()
    }

    /// Receives every snapshot the aggregator publishes.
    pub fn subscribe(&self) -> watch::Receiver<Arc<StatusSnapshot>> {
        self.snapshot_tx.subscribe()
    }

    pub fn session_events(&self) -> broadcast::Receiver<SessionEvent> {
        self.session_tx.subscribe()
    }

    pub fn source_name(&self) -> &str {
        self.source.name()
    }

    /// Scheduler entry point. Starts a cycle unless one is already in flight
    /// or the aggregator is halted; a dropped trigger is not queued.
    pub fn trigger(self: &Arc<Self>) -> bool {
        match self.join_or_start_cycle() {
            Join::Started(_) => true,
            Join::Halted => false,
            Join::Joined(_) => {
                lock(&self.state).stats.triggers_dropped += 1;
                tracing::debug!("refresh already in flight; trigger dropped");
                false
            }
            Join::Stale(_) => {
                tracing::debug!("stopped refresh still settling; fetching again once it does");
                false
            }
        }
    }

    /// Out-of-cycle refresh. Coalesces with an in-flight cycle and resolves
    /// to the snapshot that cycle produced. While halted, returns the current
    /// snapshot without fetching.
    pub async fn refresh_now(self: &Arc<Self>) -> Arc<StatusSnapshot> {
        loop {
            match self.join_or_start_cycle() {
                Join::Started(cycle) | Join::Joined(cycle) => return cycle.await,
                Join::Halted => return self.current_snapshot(),
                // Waits out the stale fetch, then joins the cycle it hands over to.
                Join::Stale(cycle) => {
                    cycle.await;
                }
            }
        }
    }

    /// Run a one-shot operation and fold its status fields (or its failure)
    /// through the merger. The operation result is returned unchanged.
    pub async fn apply_operation<F>(&self, operation: F) -> Result<OperationReport, FetchError>
    where
        F: Future<Output = Result<OperationReport, FetchError>>,
    {
        let epoch = self.epoch.load(Ordering::SeqCst);
        let result = operation.await;
        match &result {
            Ok(report) if !report.patch.is_empty() => {
                self.apply(epoch, Ok(report.patch.clone()));
            }
            Ok(_) => {}
            Err(e) => {
                tracing::warn!(error = %e, "operation failed");
                self.apply(epoch, Err(e.clone()));
            }
        }
        result
    }

    /// Stop accepting triggers and invalidate any in-flight cycle. After this
    /// returns no cycle can start or mutate state. A cycle still fetching
    /// keeps its slot until it settles, so the source is never fetched twice
    /// at once.
    pub(crate) fn halt(&self) {
        let mut slot = lock(&self.in_flight);
        self.accepting.store(false, Ordering::SeqCst);
        {
            // Taking the state lock orders the bump after any apply already running.
            let _state = lock(&self.state);
            self.epoch.fetch_add(1, Ordering::SeqCst);
        }
        if let Some(in_flight) = slot.as_mut() {
            in_flight.rerun = false;
        }
    }

    pub(crate) fn resume(&self) {
        let _slot = lock(&self.in_flight);
        self.accepting.store(true, Ordering::SeqCst);
    }

    // Lock order: `in_flight` before `state`.
    fn join_or_start_cycle(self: &Arc<Self>) -> Join {
        let mut slot = lock(&self.in_flight);
        if !self.accepting.load(Ordering::SeqCst) {
            return Join::Halted;
        }
        let epoch = self.epoch.load(Ordering::SeqCst);
        if let Some(in_flight) = slot.as_mut() {
            if in_flight.epoch == epoch {
                return Join::Joined(in_flight.cycle.clone());
            }
            in_flight.rerun = true;
            return Join::Stale(in_flight.cycle.clone());
        }

        let id = self.next_cycle_id.fetch_add(1, Ordering::SeqCst);
        lock(&self.state).stats.cycles_started += 1;

        let this = Arc::clone(self);
        let task = tokio::spawn(async move {
            let outcome = this.source.fetch_status().await;
            let snapshot = this.apply(epoch, outcome);
            this.finish_cycle(id);
            snapshot
        });

        let this = Arc::clone(self);
        let cycle = async move {
            match task.await {
                Ok(snapshot) => snapshot,
                Err(e) => {
                    tracing::warn!(error = %e, "refresh task did not complete");
                    this.finish_cycle(id);
                    this.current_snapshot()
                }
            }
        }
        .boxed()
        .shared();

        *slot = Some(InFlight {
            id,
            epoch,
            cycle: cycle.clone(),
            rerun: false,
        });
        Join::Started(cycle)
    }

    /// Frees the slot held by cycle `id`. A stale cycle that was asked to
    /// rerun hands over to a fresh one.
    fn finish_cycle(self: &Arc<Self>, id: u64) {
        let rerun = {
            let mut slot = lock(&self.in_flight);
            if slot.as_ref().is_some_and(|f| f.id == id) {
                slot.take().is_some_and(|f| f.rerun)
            } else {
                false
            }
        };
        if rerun {
            self.trigger();
        }
    }

    /// The single mutation point for fetch and operation results.
    fn apply(&self, epoch: u64, outcome: Result<StatusPatch, FetchError>) -> Arc<StatusSnapshot> {
        let mut state = lock(&self.state);
        if self.epoch.load(Ordering::SeqCst) != epoch {
            state.stats.stale_results_discarded += 1;
            tracing::debug!("discarding refresh result that finished after stop");
            return state.snapshot.clone();
        }

        let now = Utc::now();
        let outcome = outcome.map(|patch| match patch.timestamp {
            Some(_) => patch,
            None => patch.with_timestamp(now),
        });
        let merged = merger::merge(&state.snapshot, &outcome, self.fallback.as_ref(), now);

        match &outcome {
            Ok(patch) => {
                state.stats.refreshes_applied += 1;
                state.stats.consecutive_failures = 0;
                state.last_error = if patch.failed_sources.is_empty() {
                    None
                } else {
                    Some(RefreshError::partial(&patch.failed_sources, now))
                };
            }
            Err(e) => {
                state.stats.failures_total += 1;
                state.stats.consecutive_failures += 1;
                state.last_error = Some(RefreshError::from_fetch(
                    e,
                    now,
                    state.stats.consecutive_failures,
                ));
                tracing::warn!(
                    error = %e,
                    consecutive_failures = state.stats.consecutive_failures,
                    "status refresh failed; keeping last snapshot"
                );
                if *e == FetchError::Unauthorized {
                    let _ = self.session_tx.send(SessionEvent::Unauthorized { at: now });
                }
            }
        }

        if let Merged::Synthetic(_) = &merged {
            tracing::info!("no live status yet; showing synthetic fallback data");
        }
        if let Some(next) = merged.into_snapshot() {
            state.snapshot = Arc::new(next);
            self.snapshot_tx.send_replace(state.snapshot.clone());
        }
        state.snapshot.clone()
    }
}
