//! Periodic snapshotting of an editor's in-memory state.
//!
//! Each editing session gets its own [`AutosaveHandle`]; there is no shared
//! timer. Starting takes a baseline snapshot before returning, then a tokio
//! task snapshots once per interval until the handle is cancelled or dropped.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde_json::Value;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::config::AutosaveConfig;
use crate::error::AutosaveResult;
use crate::storage::{DraftKey, SnapshotStore};

const MIN_INTERVAL: Duration = Duration::from_millis(1);

/// Read-only accessor for the state to snapshot.
pub trait SnapshotSource: Send + Sync + 'static {
    fn capture(&self) -> AutosaveResult<Value>;
}

impl<F> SnapshotSource for F
where
    F: Fn() -> AutosaveResult<Value> + Send + Sync + 'static,
{
    fn capture(&self) -> AutosaveResult<Value> {
        self()
    }
}

#[derive(Clone)]
pub struct AutosaveScheduler {
    store: SnapshotStore,
    interval: Duration,
}

impl AutosaveScheduler {
    pub fn new(store: SnapshotStore, interval: Duration) -> Self {
        Self { store, interval }
    }

    pub fn from_config(store: SnapshotStore, config: &AutosaveConfig) -> Self {
        Self::new(store, config.interval())
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Start autosaving `key` at the configured interval.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(&self, key: DraftKey, source: impl SnapshotSource) -> AutosaveHandle {
        self.start_every(key, source, self.interval)
    }

    pub fn start_every(
        &self,
        key: DraftKey,
        source: impl SnapshotSource,
        interval: Duration,
    ) -> AutosaveHandle {
        let interval = if interval.is_zero() {
            tracing::warn!(key = %key, "autosave interval is zero, using {MIN_INTERVAL:?}");
            MIN_INTERVAL
        } else {
            interval
        };
        let gate = SaveGate {
            store: self.store.clone(),
            key: key.clone(),
            source: Arc::new(source),
            token: CancellationToken::new(),
            lock: Arc::new(Mutex::new(())),
        };

        gate.capture_and_save();

        let task = tokio::spawn(run_ticker(gate.clone(), interval));
        tracing::debug!(key = %key, interval_ms = interval.as_millis() as u64, "autosave started");

        AutosaveHandle {
            gate,
            task: Some(task),
        }
    }
}

/// Everything one session needs to write a snapshot.
///
/// Saves and cancellation take the same lock, so once `cancel` returns no
/// save is in flight and none will start.
#[derive(Clone)]
struct SaveGate {
    store: SnapshotStore,
    key: DraftKey,
    source: Arc<dyn SnapshotSource>,
    token: CancellationToken,
    lock: Arc<Mutex<()>>,
}

impl SaveGate {
    fn capture_and_save(&self) {
        let _guard = self.lock.lock();
        if self.token.is_cancelled() {
            return;
        }
        match self.source.capture() {
            Ok(data) => self.store.save(&self.key, &data),
            Err(error) => tracing::warn!(key = %self.key, "autosave capture failed: {error}"),
        }
    }

    fn cancel(&self) {
        let _guard = self.lock.lock();
        if !self.token.is_cancelled() {
            self.token.cancel();
            tracing::debug!(key = %self.key, "autosave cancelled");
        }
    }
}

async fn run_ticker(gate: SaveGate, interval: Duration) {
    let mut ticker = interval_at(Instant::now() + interval, interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        tokio::select! {
            biased;
            _ = gate.token.cancelled() => break,
            _ = ticker.tick() => gate.capture_and_save(),
        }
    }
    tracing::debug!(key = %gate.key, "autosave stopped");
}

/// Running autosave for one key. Dropping it cancels the schedule.
pub struct AutosaveHandle {
    gate: SaveGate,
    task: Option<JoinHandle<()>>,
}

impl AutosaveHandle {
    pub fn key(&self) -> &DraftKey {
        &self.gate.key
    }

    pub fn is_cancelled(&self) -> bool {
        self.gate.token.is_cancelled()
    }

    /// Snapshot right now instead of waiting for the next tick.
    pub fn flush(&self) {
        self.gate.capture_and_save();
    }

    /// Stop future snapshots. Waits for a save already in progress, so the
    /// key can be cleared safely once this returns. The stored snapshot is
    /// left in place.
    pub fn cancel(&self) {
        self.gate.cancel();
    }

    /// Cancel and wait for the ticker task to finish.
    pub async fn shutdown(mut self) {
        self.cancel();
        if let Some(task) = self.task.take() {
            if let Err(error) = task.await {
                tracing::warn!(key = %self.gate.key, "autosave task ended abnormally: {error}");
            }
        }
    }
}

impl Drop for AutosaveHandle {
    fn drop(&mut self) {
        self.cancel();
    }
}
