//! Push pipeline: send every dirty row, then acknowledge exactly what was sent.

use std::time::Duration;

use rusqlite::Connection;
use serde::Serialize;

use super::remote::{with_timeout, RemoteStore};
use super::wire::{PushBatch, WireRecord};
use crate::db::{RecordRepository, SqliteCursorRepository, SyncAck};
use crate::error::Result;
use crate::models::{
    CursorField, CustomLabTest, CustomMedicine, EntityKind, Patient, Prescription,
    PrescriptionLabTest, PrescriptionMedicine,
};
use crate::services::LocalStore;
use crate::util::now_millis;

/// Outcome of one push step
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PushReport {
    /// Rows sent in the batch
    pub pushed: usize,
    /// Rows whose dirty flag was cleared
    pub acknowledged: usize,
    /// Acknowledged tombstones removed from the local store
    pub purged: usize,
}

/// A consistent snapshot of the dirty set
struct Gathered {
    batch: PushBatch,
    acks: Vec<(EntityKind, Vec<SyncAck>)>,
}

fn gather_kind<T: WireRecord>(
    repo: &RecordRepository<'_>,
    rows: &mut Vec<T::Row>,
    acks: &mut Vec<(EntityKind, Vec<SyncAck>)>,
) -> Result<()> {
    let dirty = repo.query_dirty::<T>()?;
    let mut kind_acks = Vec::with_capacity(dirty.len());
    for entry in dirty {
        rows.push(entry.record.to_wire());
        kind_acks.push(SyncAck {
            id: entry.record.id().clone(),
            local_version: entry.local_version,
        });
    }
    if !kind_acks.is_empty() {
        acks.push((T::KIND, kind_acks));
    }
    Ok(())
}

fn gather(conn: &Connection) -> Result<Gathered> {
    let repo = RecordRepository::new(conn);
    let mut batch = PushBatch {
        device_id: SqliteCursorRepository::new(conn).get_or_create()?.device_id,
        ..PushBatch::default()
    };
    let mut acks = Vec::new();

    gather_kind::<Patient>(&repo, &mut batch.patients, &mut acks)?;
    gather_kind::<Prescription>(&repo, &mut batch.prescriptions, &mut acks)?;
    gather_kind::<PrescriptionMedicine>(&repo, &mut batch.prescription_medicines, &mut acks)?;
    gather_kind::<PrescriptionLabTest>(&repo, &mut batch.prescription_lab_tests, &mut acks)?;
    gather_kind::<CustomMedicine>(&repo, &mut batch.custom_medicines, &mut acks)?;
    gather_kind::<CustomLabTest>(&repo, &mut batch.custom_lab_tests, &mut acks)?;

    Ok(Gathered { batch, acks })
}

fn acknowledge(conn: &Connection, acks: &[(EntityKind, Vec<SyncAck>)]) -> Result<(usize, usize)> {
    let repo = RecordRepository::new(conn);
    let mut acknowledged = 0;
    let mut purged = 0;
    for (kind, kind_acks) in acks {
        acknowledged += repo.mark_synced(*kind, kind_acks)?;
        purged += repo.purge_synced_tombstones(*kind, kind_acks)?;
    }
    SqliteCursorRepository::new(conn).advance(CursorField::LastPushedAt, now_millis())?;
    Ok((acknowledged, purged))
}

/// Push the current dirty set.
///
/// The dirty set is read in one transaction. Nothing local changes unless
/// the remote accepts the batch; on success the sent rows are acknowledged
/// and `last_pushed_at` advances in a second transaction.
pub async fn push_changes<R: RemoteStore>(
    store: &LocalStore,
    remote: &R,
    timeout: Duration,
) -> Result<PushReport> {
    let Gathered { batch, acks } = store.with_transaction(gather)?;
    if batch.is_empty() {
        tracing::debug!("No dirty rows, skipping push");
        return Ok(PushReport::default());
    }

    let pushed = batch.len();
    let response = with_timeout(timeout, remote.push(&batch)).await?;
    if response.pushed_count != pushed {
        tracing::debug!(
            "Remote reported {} pushed rows for a batch of {pushed}",
            response.pushed_count
        );
    }

    let (acknowledged, purged) = store.with_transaction(|conn| acknowledge(conn, &acks))?;
    tracing::debug!("Pushed {pushed} rows ({acknowledged} acknowledged, {purged} purged)");

    Ok(PushReport {
        pushed,
        acknowledged,
        purged,
    })
}
