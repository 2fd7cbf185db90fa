//! Remote store contract consumed by the sync engine.

use std::future::Future;
use std::time::Duration;

use thiserror::Error;

use super::wire::{PullRequest, PushBatch, PushResponse, RemoteChanges, WalletBalanceResponse};

#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("Remote request timed out after {0:?}")]
    Timeout(Duration),
    #[error("Remote HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Remote rejected credentials: {0}")]
    Unauthorized(String),
    #[error("Remote API error: {0}")]
    Api(String),
    #[error("Invalid remote payload: {0}")]
    InvalidPayload(String),
    #[error("Invalid remote configuration: {0}")]
    InvalidConfiguration(String),
}

impl RemoteError {
    /// Network-level failures that the next scheduled cycle retries.
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Timeout(_) | Self::Http(_) | Self::Api(_))
    }
}

pub type RemoteResult<T> = Result<T, RemoteError>;

/// Already-authenticated client for the shared remote store.
///
/// The remote treats pushed rows as upserts keyed by id, so delivering the
/// same batch twice is harmless.
pub trait RemoteStore: Send + Sync {
    /// Send every dirty row in one batch
    fn push(&self, batch: &PushBatch) -> impl Future<Output = RemoteResult<PushResponse>> + Send;

    /// Every row changed after `request.since`
    fn pull(
        &self,
        request: &PullRequest,
    ) -> impl Future<Output = RemoteResult<RemoteChanges>> + Send;

    /// Every row of every entity type, for first run or disaster recovery
    fn restore(&self) -> impl Future<Output = RemoteResult<RemoteChanges>> + Send;

    /// Authoritative wallet balance
    fn wallet_balance(&self) -> impl Future<Output = RemoteResult<WalletBalanceResponse>> + Send;
}

/// Bound a remote call; expiry is reported like any other network failure.
pub(crate) async fn with_timeout<T>(
    limit: Duration,
    call: impl Future<Output = RemoteResult<T>>,
) -> RemoteResult<T> {
    tokio::time::timeout(limit, call)
        .await
        .map_err(|_| RemoteError::Timeout(limit))?
}
