// Refresh scheduler: periodic trigger task driving the aggregator.
// One tick = one trigger; the aggregator drops ticks that land on an in-flight cycle.

use std::sync::Arc;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{Duration, Instant, MissedTickBehavior, interval_at};
use tracing::Instrument;

use crate::aggregator::Aggregator;
use crate::models::StatusSnapshot;

const DEFAULT_STATS_LOG_INTERVAL: Duration = Duration::from_secs(300);

/// Cancellable polling handle. Dropping it stops polling.
pub struct RefreshScheduler {
    aggregator: Arc<Aggregator>,
    /// How often to log refresh counters at INFO (real time, independent of the poll interval).
    stats_log_interval: Duration,
    shutdown_tx: Option<oneshot::Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl RefreshScheduler {
    pub fn new(aggregator: Arc<Aggregator>) -> Self {
        Self {
            aggregator,
            stats_log_interval: DEFAULT_STATS_LOG_INTERVAL,
            shutdown_tx: None,
            handle: None,
        }
    }

    pub fn with_stats_log_interval(mut self, every: Duration) -> Self {
        if !every.is_zero() {
            self.stats_log_interval = every;
        }
        self
    }

    pub fn aggregator(&self) -> &Arc<Aggregator> {
        &self.aggregator
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Fetch immediately, then every `period`. Restarts polling if already running.
    pub fn start(&mut self, period: Duration) -> anyhow::Result<()> {
        anyhow::ensure!(!period.is_zero(), "polling interval must be > 0");
        if self.shutdown_tx.is_some() {
            self.stop();
        }

        self.aggregator.resume();
        self.aggregator.trigger();

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let aggregator = self.aggregator.clone();
        let stats_log_interval = self.stats_log_interval;

        let span = tracing::span!(
            tracing::Level::DEBUG,
            "scheduler",
            interval_ms = period.as_millis() as u64
        );
        let handle = tokio::spawn(
            run(aggregator, period, stats_log_interval, shutdown_rx).instrument(span),
        );

        self.shutdown_tx = Some(shutdown_tx);
        self.handle = Some(handle);
        tracing::info!(interval_ms = period.as_millis() as u64, "polling started");
        Ok(())
    }

    /// Stop polling. No fetch starts after this returns and a fetch still in
    /// flight has its result discarded.
    pub fn stop(&mut self) {
        self.aggregator.halt();
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
            tracing::info!("polling stopped");
        }
    }

    /// Stop and wait for the polling task to exit.
    pub async fn shutdown(mut self) {
        self.stop();
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
    }

    pub async fn refresh_now(&self) -> Arc<StatusSnapshot> {
        self.aggregator.refresh_now().await
    }
}

async fn run(
    aggregator: Arc<Aggregator>,
    period: Duration,
    stats_log_interval: Duration,
    mut shutdown_rx: oneshot::Receiver<()>,
) {
    // The immediate fetch is triggered by `start`; the first tick is one period out.
    let mut tick = interval_at(Instant::now() + period, period);
    tick.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut stats_log_tick = interval_at(Instant::now() + stats_log_interval, stats_log_interval);
    stats_log_tick.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = tick.tick() => {
                if !aggregator.trigger() {
                    tracing::debug!(operation = "trigger", "tick skipped; refresh still in flight");
                }
            }
            _ = stats_log_tick.tick() => {
                let stats = aggregator.stats();
                tracing::info!(
                    source = %aggregator.source_name(),
                    cycles_started = stats.cycles_started,
                    refreshes_applied = stats.refreshes_applied,
                    failures_total = stats.failures_total,
                    consecutive_failures = stats.consecutive_failures,
                    triggers_dropped = stats.triggers_dropped,
                    "refresh stats"
                );
            }
            _ = &mut shutdown_rx => {
                tracing::debug!("Scheduler shutting down");
                break;
            }
        }
    }
}

impl Drop for RefreshScheduler {
    fn drop(&mut self) {
        if self.shutdown_tx.is_some() {
            self.stop();
        }
    }
}
