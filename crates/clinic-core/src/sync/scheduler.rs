//! Background trigger loop for sync cycles.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{watch, Notify};
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::MissedTickBehavior;

use super::engine::SyncEngine;
use super::remote::RemoteStore;

/// Shortest period between scheduled cycles
pub const MIN_SYNC_INTERVAL: Duration = Duration::from_secs(1);

/// Handle to the task that triggers [`SyncEngine::try_sync`] on a timer
/// and on foreground events.
///
/// Each trigger runs in its own task, so a trigger that fires while a
/// cycle is in flight is dropped by the engine instead of being queued.
pub struct SyncScheduler {
    foreground: Arc<Notify>,
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl SyncScheduler {
    /// Start triggering cycles every `interval`, the first one immediately.
    ///
    /// Intervals shorter than [`MIN_SYNC_INTERVAL`] are raised to it.
    pub fn spawn<R>(engine: Arc<SyncEngine<R>>, interval: Duration) -> Self
    where
        R: RemoteStore + 'static,
    {
        let interval = interval.max(MIN_SYNC_INTERVAL);
        let foreground = Arc::new(Notify::new());
        let (shutdown, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(run(engine, interval, Arc::clone(&foreground), shutdown_rx));
        Self {
            foreground,
            shutdown,
            task,
        }
    }

    /// Request a cycle now, e.g. when the app returns to the foreground
    pub fn notify_foreground(&self) {
        self.foreground.notify_one();
    }

    /// Stop triggering and wait for any in-flight cycle to finish
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        if let Err(error) = self.task.await {
            tracing::warn!("Sync scheduler task ended abnormally: {error}");
        }
    }
}

async fn run<R>(
    engine: Arc<SyncEngine<R>>,
    interval: Duration,
    foreground: Arc<Notify>,
    mut shutdown: watch::Receiver<bool>,
) where
    R: RemoteStore + 'static,
{
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut cycles = JoinSet::new();

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            () = foreground.notified() => {
                tracing::debug!("Foreground sync requested");
            }
            Some(_) = cycles.join_next(), if !cycles.is_empty() => continue,
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
                continue;
            }
        }

        let engine = Arc::clone(&engine);
        cycles.spawn(async move {
            engine.try_sync().await;
        });
    }

    while cycles.join_next().await.is_some() {}
    tracing::debug!("Sync scheduler stopped");
}
