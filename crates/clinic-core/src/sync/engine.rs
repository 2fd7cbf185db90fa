//! Single-flight sync cycles.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::Serialize;

use super::pull::{pull_changes, restore_snapshot, PullReport};
use super::push::{push_changes, PushReport};
use super::remote::{with_timeout, RemoteStore};
use crate::error::{Error, Result};
use crate::models::WalletBalance;
use crate::services::LocalStore;
use crate::state::SyncState;
use crate::util::now_millis;
use crate::wallet::WalletLedger;

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// What one completed cycle did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub push: PushReport,
    pub pull: PullReport,
    pub finished_at: i64,
}

#[derive(Debug)]
pub enum SyncOutcome {
    Completed(SyncReport),
    /// Another cycle was in flight; this trigger was dropped
    AlreadyRunning,
    /// The cycle aborted; durable sync state is as it was before the failed step
    Failed(Error),
}

impl SyncOutcome {
    pub const fn is_completed(&self) -> bool {
        matches!(self, Self::Completed(_))
    }
}

/// Snapshot of the engine for front ends
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncStatus {
    pub state: SyncState,
    pub last_report: Option<SyncReport>,
    pub last_error: Option<String>,
}

/// Clears the in-flight flag when the cycle ends, including on cancellation
struct FlightGuard<'a>(&'a AtomicBool);

impl<'a> FlightGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

#[derive(Clone, Copy)]
enum Mode {
    Incremental,
    Restore,
}

/// Reconciles one [`LocalStore`] with a [`RemoteStore`].
///
/// At most one cycle runs at a time. A cycle pushes before it pulls.
pub struct SyncEngine<R> {
    store: LocalStore,
    remote: Arc<R>,
    timeout: Duration,
    running: AtomicBool,
    status: Mutex<SyncStatus>,
}

impl<R: RemoteStore> SyncEngine<R> {
    pub fn new(store: LocalStore, remote: R) -> Self {
        Self::with_shared_remote(store, Arc::new(remote))
    }

    pub fn with_shared_remote(store: LocalStore, remote: Arc<R>) -> Self {
        Self {
            store,
            remote,
            timeout: DEFAULT_REQUEST_TIMEOUT,
            running: AtomicBool::new(false),
            status: Mutex::new(SyncStatus::default()),
        }
    }

    /// Bound every network call by `timeout`
    #[must_use]
    pub const fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub const fn store(&self) -> &LocalStore {
        &self.store
    }

    pub fn remote(&self) -> &R {
        &self.remote
    }

    /// Whether a cycle is in flight right now
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    pub fn status(&self) -> SyncStatus {
        self.status
            .lock()
            .map(|status| status.clone())
            .unwrap_or_default()
    }

    fn update_status(&self, update: impl FnOnce(&mut SyncStatus)) {
        if let Ok(mut status) = self.status.lock() {
            update(&mut status);
        }
    }

    /// Run one push-then-pull cycle unless one is already in flight.
    pub async fn try_sync(&self) -> SyncOutcome {
        self.run(Mode::Incremental).await
    }

    /// Push pending changes, then apply a full remote snapshot.
    pub async fn try_restore(&self) -> SyncOutcome {
        self.run(Mode::Restore).await
    }

    async fn run(&self, mode: Mode) -> SyncOutcome {
        let Some(_guard) = FlightGuard::acquire(&self.running) else {
            tracing::debug!("Sync already in progress, ignoring trigger");
            return SyncOutcome::AlreadyRunning;
        };

        self.update_status(|status| status.state = SyncState::Syncing);
        match self.cycle(mode).await {
            Ok(report) => {
                tracing::info!(
                    "Sync completed: pushed {}, applied {}, skipped {}",
                    report.push.pushed,
                    report.pull.applied.applied(),
                    report.pull.applied.skipped
                );
                self.update_status(|status| {
                    status.state = SyncState::Synced;
                    status.last_report = Some(report);
                    status.last_error = None;
                });
                SyncOutcome::Completed(report)
            }
            Err(error) => {
                tracing::warn!("Sync failed: {error}");
                let state = if error.is_transient() {
                    SyncState::Offline
                } else {
                    SyncState::Error
                };
                let message = error.to_string();
                self.update_status(|status| {
                    status.state = state;
                    status.last_error = Some(message);
                });
                SyncOutcome::Failed(error)
            }
        }
    }

    async fn cycle(&self, mode: Mode) -> Result<SyncReport> {
        let push = push_changes(&self.store, self.remote.as_ref(), self.timeout).await?;
        let pull = match mode {
            Mode::Incremental => {
                pull_changes(&self.store, self.remote.as_ref(), self.timeout).await?
            }
            Mode::Restore => {
                restore_snapshot(&self.store, self.remote.as_ref(), self.timeout).await?
            }
        };
        Ok(SyncReport {
            push,
            pull,
            finished_at: now_millis(),
        })
    }

    /// Replace the cached wallet balance with the remote ledger's
    pub async fn refresh_wallet(&self) -> Result<WalletBalance> {
        let response = with_timeout(self.timeout, self.remote.wallet_balance()).await?;
        WalletLedger::new(self.store.clone()).sync(response.balance)
    }
}
