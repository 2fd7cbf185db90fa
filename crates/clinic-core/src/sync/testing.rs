//! In-memory remote store for sync tests

use std::collections::BTreeMap;
use std::sync::Mutex;
use std::time::Duration;

use serde_json::{json, Value};

use super::remote::{RemoteError, RemoteResult, RemoteStore};
use super::wire::{PullRequest, PushBatch, PushResponse, RemoteChanges, WalletBalanceResponse};
use crate::models::{EntityKind, RecordId};

pub fn patient_row(id: &RecordId, name: &str, updated_at: i64) -> Value {
    json!({
        "id": id.to_string(),
        "name": name,
        "deleted": 0,
        "synced": 1,
        "createdAt": updated_at,
        "updatedAt": updated_at
    })
}

struct StoredRow {
    value: Value,
    changed_at: i64,
    origin: Option<String>,
}

type PushHook = Box<dyn FnOnce() + Send>;

struct FakeState {
    rows: BTreeMap<(EntityKind, String), StoredRow>,
    clock: i64,
    push_calls: usize,
    pull_calls: usize,
    fail_push: bool,
    fail_pull: bool,
    delay: Option<Duration>,
    balance: i64,
    on_push: Option<PushHook>,
}

/// Upserts by id like the real remote and stamps every change with its own
/// clock. Pulls leave out rows last written by the requesting device.
pub struct FakeRemote {
    state: Mutex<FakeState>,
}

impl Default for FakeRemote {
    fn default() -> Self {
        Self {
            state: Mutex::new(FakeState {
                rows: BTreeMap::new(),
                clock: 1_000,
                push_calls: 0,
                pull_calls: 0,
                fail_push: false,
                fail_pull: false,
                delay: None,
                balance: 0,
                on_push: None,
            }),
        }
    }
}

fn insert_rows<T: serde::Serialize>(
    state: &mut FakeState,
    kind: EntityKind,
    rows: &[T],
    origin: Option<&str>,
) {
    for row in rows {
        let value = serde_json::to_value(row).unwrap();
        store_value(state, kind, value, origin);
    }
}

fn store_value(state: &mut FakeState, kind: EntityKind, value: Value, origin: Option<&str>) {
    state.clock += 1;
    let id = value["id"].as_str().unwrap_or_default().to_string();
    state.rows.insert(
        (kind, id),
        StoredRow {
            value,
            changed_at: state.clock,
            origin: origin.map(str::to_string),
        },
    );
}

impl FakeRemote {
    fn state(&self) -> std::sync::MutexGuard<'_, FakeState> {
        self.state.lock().unwrap()
    }

    /// Add a row as if another device had pushed it
    pub fn seed(&self, kind: EntityKind, value: Value) {
        store_value(&mut self.state(), kind, value, None);
    }

    pub fn stored_count(&self, kind: EntityKind) -> usize {
        self.state()
            .rows
            .keys()
            .filter(|(stored, _)| *stored == kind)
            .count()
    }

    pub fn push_calls(&self) -> usize {
        self.state().push_calls
    }

    pub fn pull_calls(&self) -> usize {
        self.state().pull_calls
    }

    /// Run `hook` while the next push is "on the wire"
    pub fn on_next_push(&self, hook: impl FnOnce() + Send + 'static) {
        self.state().on_push = Some(Box::new(hook));
    }

    /// The next push reaches the remote but its response is lost
    pub fn fail_next_push(&self) {
        self.state().fail_push = true;
    }

    pub fn fail_next_pull(&self) {
        self.state().fail_pull = true;
    }

    /// The next call never answers
    pub fn hang_next_call(&self) {
        self.delay_next_call(Duration::from_secs(3_600));
    }

    pub fn delay_next_call(&self, delay: Duration) {
        self.state().delay = Some(delay);
    }

    /// Report an older server time from now on
    pub fn rewind_clock(&self, clock: i64) {
        self.state().clock = clock;
    }

    pub fn set_balance(&self, balance: i64) {
        self.state().balance = balance;
    }

    /// A change set holding exactly `rows`
    pub fn changes_with(&self, rows: Vec<(EntityKind, Value)>) -> RemoteChanges {
        let mut changes = RemoteChanges {
            success: true,
            server_time: self.state().clock,
            ..RemoteChanges::default()
        };
        for (kind, value) in rows {
            changes.rows_mut(kind).push(value);
        }
        changes
    }

    fn take_delay(&self) -> Option<Duration> {
        self.state().delay.take()
    }

    async fn pause(&self) {
        if let Some(delay) = self.take_delay() {
            tokio::time::sleep(delay).await;
        }
    }

    fn handle_push(&self, batch: &PushBatch) -> RemoteResult<PushResponse> {
        let hook = {
            let mut state = self.state();
            state.push_calls += 1;
            let origin = Some(batch.device_id.as_str());
            insert_rows(&mut state, EntityKind::Patients, &batch.patients, origin);
            insert_rows(&mut state, EntityKind::Prescriptions, &batch.prescriptions, origin);
            insert_rows(
                &mut state,
                EntityKind::PrescriptionMedicines,
                &batch.prescription_medicines,
                origin,
            );
            insert_rows(
                &mut state,
                EntityKind::PrescriptionLabTests,
                &batch.prescription_lab_tests,
                origin,
            );
            insert_rows(&mut state, EntityKind::CustomMedicines, &batch.custom_medicines, origin);
            insert_rows(&mut state, EntityKind::CustomLabTests, &batch.custom_lab_tests, origin);
            state.on_push.take()
        };
        if let Some(hook) = hook {
            hook();
        }

        if std::mem::take(&mut self.state().fail_push) {
            return Err(RemoteError::Api("connection reset (502)".to_string()));
        }
        Ok(PushResponse {
            pushed_count: batch.len(),
        })
    }

    fn collect(&self, since: i64, exclude_origin: Option<&str>) -> RemoteChanges {
        let state = self.state();
        let mut changes = RemoteChanges {
            success: true,
            server_time: state.clock,
            ..RemoteChanges::default()
        };
        for ((kind, _), row) in &state.rows {
            let own = exclude_origin.is_some() && row.origin.as_deref() == exclude_origin;
            if row.changed_at > since && !own {
                changes.rows_mut(*kind).push(row.value.clone());
            }
        }
        changes
    }
}

impl RemoteStore for FakeRemote {
    async fn push(&self, batch: &PushBatch) -> RemoteResult<PushResponse> {
        self.pause().await;
        self.handle_push(batch)
    }

    async fn pull(&self, request: &PullRequest) -> RemoteResult<RemoteChanges> {
        self.pause().await;
        {
            let mut state = self.state();
            state.pull_calls += 1;
            if std::mem::take(&mut state.fail_pull) {
                return Err(RemoteError::Api("service unavailable (503)".to_string()));
            }
        }
        Ok(self.collect(request.since, Some(&request.device_id)))
    }

    async fn restore(&self) -> RemoteResult<RemoteChanges> {
        self.pause().await;
        Ok(self.collect(0, None))
    }

    async fn wallet_balance(&self) -> RemoteResult<WalletBalanceResponse> {
        self.pause().await;
        Ok(WalletBalanceResponse {
            balance: self.state().balance,
        })
    }
}
