//! Pull pipeline and apply resolver.

use std::time::Duration;

use rusqlite::Connection;
use serde::Serialize;
use serde_json::Value;

use super::remote::{with_timeout, RemoteError, RemoteStore};
use super::wire::{PullRequest, RemoteChanges, WireRecord};
use crate::db::{
    LocalOverwrite, RecordRepository, SqliteCursorRepository, SqlitePrescriptionRepository,
};
use crate::error::{Error, Result};
use crate::models::{
    CursorField, CustomLabTest, CustomMedicine, EntityKind, Patient, Prescription,
    PrescriptionLabTest, PrescriptionMedicine,
};
use crate::services::LocalStore;
use crate::util::now_millis;

/// Per-row results of applying one remote batch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ApplyReport {
    pub upserted: usize,
    pub deleted: usize,
    /// Rows that could not be decoded and were left out
    pub skipped: usize,
    /// Dirty local rows replaced by the remote version
    pub overwritten: usize,
}

impl ApplyReport {
    pub const fn applied(&self) -> usize {
        self.upserted + self.deleted
    }
}

/// Outcome of one pull or restore step
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PullReport {
    pub applied: ApplyReport,
    /// `last_pulled_at` after the step
    pub cursor: i64,
}

fn decode<T: WireRecord>(value: &Value) -> Result<T> {
    let row = serde_json::from_value::<T::Row>(value.clone())?;
    T::from_wire(row)
}

fn note_overwrite(
    repo: &RecordRepository<'_>,
    overwrite: &LocalOverwrite,
    report: &mut ApplyReport,
) -> Result<()> {
    tracing::warn!(
        "Remote {} {} replaced unsynced local changes (local {}, incoming {})",
        overwrite.kind,
        overwrite.id,
        overwrite.local_updated_at,
        overwrite.incoming_updated_at
    );
    repo.record_conflict(overwrite)?;
    report.overwritten += 1;
    Ok(())
}

fn apply_kind<T: WireRecord>(
    conn: &Connection,
    rows: &[Value],
    report: &mut ApplyReport,
) -> Result<()> {
    let repo = RecordRepository::new(conn);

    for value in rows {
        let record = match decode::<T>(value) {
            Ok(record) => record,
            Err(error) => {
                tracing::warn!("Skipping malformed {} row: {error}", T::KIND);
                report.skipped += 1;
                continue;
            }
        };

        if record.is_deleted() {
            if let Some(local_updated_at) = repo.dirty_updated_at(T::KIND, record.id())? {
                let overwrite = LocalOverwrite {
                    kind: T::KIND,
                    id: record.id().clone(),
                    local_updated_at,
                    incoming_updated_at: record.updated_at(),
                };
                note_overwrite(&repo, &overwrite, report)?;
            }
            match T::KIND {
                EntityKind::Prescriptions => {
                    SqlitePrescriptionRepository::new(conn).delete_cascade(record.id())?;
                }
                kind => {
                    repo.remove(kind, record.id())?;
                }
            }
            report.deleted += 1;
        } else {
            if let Some(overwrite) = repo.apply_remote(&record)? {
                note_overwrite(&repo, &overwrite, report)?;
            }
            report.upserted += 1;
        }
    }

    Ok(())
}

/// Apply a remote batch to the local store.
///
/// Parents are applied before children. Storage failures abort the batch;
/// the caller's transaction then rolls everything back.
pub fn apply_changes(conn: &Connection, changes: &RemoteChanges) -> Result<ApplyReport> {
    let mut report = ApplyReport::default();
    for kind in EntityKind::ALL {
        let rows = changes.rows(kind);
        match kind {
            EntityKind::Patients => apply_kind::<Patient>(conn, rows, &mut report)?,
            EntityKind::Prescriptions => apply_kind::<Prescription>(conn, rows, &mut report)?,
            EntityKind::PrescriptionMedicines => {
                apply_kind::<PrescriptionMedicine>(conn, rows, &mut report)?;
            }
            EntityKind::PrescriptionLabTests => {
                apply_kind::<PrescriptionLabTest>(conn, rows, &mut report)?;
            }
            EntityKind::CustomMedicines => apply_kind::<CustomMedicine>(conn, rows, &mut report)?,
            EntityKind::CustomLabTests => apply_kind::<CustomLabTest>(conn, rows, &mut report)?,
        }
    }
    Ok(report)
}

/// Apply a batch and move the pull cursor to its server time, atomically
fn commit(store: &LocalStore, changes: &RemoteChanges) -> Result<PullReport> {
    if !changes.success {
        return Err(Error::Remote(RemoteError::Api(
            "remote reported an unsuccessful change set".to_string(),
        )));
    }

    store.with_transaction(|conn| {
        let applied = apply_changes(conn, changes)?;
        let cursor = SqliteCursorRepository::new(conn)
            .advance(CursorField::LastPulledAt, changes.server_time)?;
        Ok(PullReport { applied, cursor })
    })
}

/// Pull every change after `last_pulled_at` and apply it.
pub async fn pull_changes<R: RemoteStore>(
    store: &LocalStore,
    remote: &R,
    timeout: Duration,
) -> Result<PullReport> {
    let cursor = store.with_connection(|conn| SqliteCursorRepository::new(conn).get_or_create())?;
    let request = PullRequest {
        since: cursor.last_pulled_at,
        device_id: cursor.device_id,
    };

    let changes = with_timeout(timeout, remote.pull(&request)).await?;
    let received = changes.total_rows();
    if received == 0 {
        tracing::debug!("Pull returned no changes since {}", request.since);
    } else {
        tracing::debug!("Pulled {received} rows changed since {}", request.since);
    }
    commit(store, &changes)
}

/// Replace local state with a full remote snapshot.
///
/// Used on first run or for disaster recovery in place of an incremental
/// pull.
pub async fn restore_snapshot<R: RemoteStore>(
    store: &LocalStore,
    remote: &R,
    timeout: Duration,
) -> Result<PullReport> {
    let started = now_millis();
    let changes = with_timeout(timeout, remote.restore()).await?;
    let report = commit(store, &changes)?;
    tracing::info!(
        "Restored {} rows from remote snapshot in {} ms",
        report.applied.applied(),
        now_millis().saturating_sub(started)
    );
    Ok(report)
}
