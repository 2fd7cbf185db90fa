use chrono::NaiveDate;
use clinic_core::config::ClinicConfig;
use clinic_core::models::{EntityKind, QueueStatus, SyncConflict, TransactionKind};
use clinic_core::wallet::{IssuanceOutcome, WalletLedger};
use clinic_core::{Error, Patient, Prescription, RecordId};
use tempfile::TempDir;

use crate::cli::CompletionShell;
use crate::commands::common::{
    format_relative_time, format_sync_conflict_lines, format_sync_timestamp, parse_day,
    short_id, Context,
};
use crate::commands::completions::run_completions;
use crate::commands::patient::{
    build_patient, run_patient_add, run_patient_delete, PatientDetails,
};
use crate::commands::prescription::{
    run_prescription_add, run_prescription_delete, run_prescription_finalize, PrescriptionInput,
};
use crate::commands::queue::{run_queue_add, run_queue_transition, QueueAction};
use crate::commands::sync::{run_sync, sync_status};
use crate::commands::wallet::run_wallet_recharge;
use crate::error::CliError;

fn temp_context() -> (TempDir, Context) {
    let dir = tempfile::tempdir().unwrap();
    let ctx = Context::new(
        Some(dir.path().join("clinic.db")),
        Some(dir.path().join("config.json")),
    );
    (dir, ctx)
}

fn add_patient(ctx: &Context, name: &str) -> Patient {
    run_patient_add(&[name.to_string()], PatientDetails::default(), ctx).unwrap()
}

fn add_prescription(ctx: &Context, patient: &Patient) -> Prescription {
    let input = PrescriptionInput {
        diagnosis: Some("Viral fever".to_string()),
        medicines: vec!["Paracetamol 500mg".to_string(), "  ".to_string()],
        lab_tests: vec!["CBC".to_string()],
        ..PrescriptionInput::default()
    };
    run_prescription_add(patient.id.as_str(), input, ctx).unwrap()
}

#[test]
fn build_patient_joins_name_and_trims_details() {
    let details = PatientDetails {
        phone: Some("  ".to_string()),
        blood_group: Some(" O+ ".to_string()),
        ..PatientDetails::default()
    };
    let patient = build_patient(&["Asha".to_string(), "Rao".to_string()], details).unwrap();

    assert_eq!(patient.name, "Asha Rao");
    assert_eq!(patient.phone, None);
    assert_eq!(patient.blood_group.as_deref(), Some("O+"));
}

#[test]
fn build_patient_rejects_blank_name() {
    let result = build_patient(&[" ".to_string()], PatientDetails::default());
    assert!(matches!(result, Err(CliError::EmptyName)));
}

#[test]
fn patient_delete_marks_change_for_sync() {
    let (_dir, ctx) = temp_context();
    let patient = add_patient(&ctx, "Asha Rao");

    run_patient_delete(patient.id.as_str(), &ctx).unwrap();

    let store = ctx.open_store().unwrap();
    assert!(store.get::<Patient>(&patient.id).unwrap().is_none());
    assert_eq!(store.is_dirty(EntityKind::Patients, &patient.id).unwrap(), Some(true));
}

#[test]
fn prescription_add_requires_existing_patient() {
    let (_dir, ctx) = temp_context();
    let missing = RecordId::new();

    let result = run_prescription_add(missing.as_str(), PrescriptionInput::default(), &ctx);
    assert!(matches!(result, Err(CliError::Core(Error::NotFound(_)))));
}

#[test]
fn prescription_add_rejects_bad_follow_up_date() {
    let (_dir, ctx) = temp_context();
    let patient = add_patient(&ctx, "Asha Rao");
    let input = PrescriptionInput {
        follow_up: Some("next tuesday".to_string()),
        ..PrescriptionInput::default()
    };

    let result = run_prescription_add(patient.id.as_str(), input, &ctx);
    assert!(matches!(result, Err(CliError::InvalidDate(raw)) if raw == "next tuesday"));
}

#[test]
fn prescription_add_skips_blank_items() {
    let (_dir, ctx) = temp_context();
    let patient = add_patient(&ctx, "Asha Rao");
    let prescription = add_prescription(&ctx, &patient);

    let items = ctx
        .open_store()
        .unwrap()
        .prescription_items(&prescription.id)
        .unwrap();
    assert_eq!(items.medicines.len(), 1);
    assert_eq!(items.medicines[0].name, "Paracetamol 500mg");
    assert_eq!(items.lab_tests.len(), 1);
}

#[test]
fn finalize_charges_wallet_once() {
    let (_dir, ctx) = temp_context();
    let patient = add_patient(&ctx, "Asha Rao");
    let prescription = add_prescription(&ctx, &patient);
    let id = prescription.id.to_string();

    let error = run_prescription_finalize(&id, None, &ctx).unwrap_err();
    assert!(matches!(
        error,
        CliError::Core(Error::InsufficientBalance { balance: 0, cost: 1 })
    ));
    assert!(error.hint().is_some());

    assert_eq!(run_wallet_recharge(5, &ctx).unwrap(), 5);
    assert_eq!(
        run_prescription_finalize(&id, None, &ctx).unwrap(),
        IssuanceOutcome::Issued { balance: 4 }
    );
    assert_eq!(
        run_prescription_finalize(&id, None, &ctx).unwrap(),
        IssuanceOutcome::AlreadyDeducted { balance: 4 }
    );

    let history = WalletLedger::new(ctx.open_store().unwrap())
        .transactions(10)
        .unwrap();
    let debits = history
        .iter()
        .filter(|entry| entry.kind == TransactionKind::Debit)
        .count();
    assert_eq!(debits, 1);
}

#[test]
fn finalize_uses_configured_cost() {
    let (dir, ctx) = temp_context();
    ClinicConfig {
        prescription_cost: Some(3),
        ..ClinicConfig::default()
    }
    .save_to_path(&dir.path().join("config.json"))
    .unwrap();
    let patient = add_patient(&ctx, "Asha Rao");
    let prescription = add_prescription(&ctx, &patient);
    run_wallet_recharge(10, &ctx).unwrap();

    let outcome = run_prescription_finalize(prescription.id.as_str(), None, &ctx).unwrap();
    assert_eq!(outcome.balance(), 7);
}

#[test]
fn finalize_rejects_negative_cost() {
    let (_dir, ctx) = temp_context();
    let patient = add_patient(&ctx, "Asha Rao");
    let prescription = add_prescription(&ctx, &patient);

    let result = run_prescription_finalize(prescription.id.as_str(), Some(-1), &ctx);
    assert!(matches!(result, Err(CliError::Core(Error::InvalidInput(_)))));
}

#[test]
fn prescription_delete_removes_line_items() {
    let (_dir, ctx) = temp_context();
    let patient = add_patient(&ctx, "Asha Rao");
    let prescription = add_prescription(&ctx, &patient);

    run_prescription_delete(prescription.id.as_str(), &ctx).unwrap();

    let store = ctx.open_store().unwrap();
    assert!(store.get::<Prescription>(&prescription.id).unwrap().is_none());
    assert!(store.prescription_items(&prescription.id).unwrap().is_empty());
}

#[test]
fn queue_flow_assigns_tokens_and_enforces_transitions() {
    let (_dir, ctx) = temp_context();
    let first = add_patient(&ctx, "Asha Rao");
    let second = add_patient(&ctx, "Ravi Kumar");

    let token_one = run_queue_add(first.id.as_str(), &ctx).unwrap();
    let token_two = run_queue_add(second.id.as_str(), &ctx).unwrap();
    assert_eq!(token_one.token_number, 1);
    assert_eq!(token_two.token_number, 2);

    let started = run_queue_transition(token_one.id.as_str(), QueueAction::Start, &ctx).unwrap();
    assert_eq!(started.status, QueueStatus::InProgress);
    let done = run_queue_transition(token_one.id.as_str(), QueueAction::Complete, &ctx).unwrap();
    assert_eq!(done.status, QueueStatus::Completed);

    let result = run_queue_transition(token_one.id.as_str(), QueueAction::Cancel, &ctx);
    assert!(matches!(
        result,
        Err(CliError::Core(Error::InvalidTransition {
            from: QueueStatus::Completed,
            to: QueueStatus::Cancelled,
        }))
    ));

    let token_three = run_queue_add(first.id.as_str(), &ctx).unwrap();
    assert_eq!(token_three.token_number, 3);
}

#[test]
fn parse_day_accepts_iso_dates_only() {
    assert_eq!(
        parse_day(" 2026-03-14 ").unwrap(),
        NaiveDate::from_ymd_opt(2026, 3, 14).unwrap()
    );
    assert!(matches!(parse_day("14/03/2026"), Err(CliError::InvalidDate(_))));
}

#[test]
fn sync_status_reports_pending_changes() {
    let (_dir, ctx) = temp_context();
    add_patient(&ctx, "Asha Rao");
    add_patient(&ctx, "Ravi Kumar");

    let status = sync_status(&ctx).unwrap();
    assert!(!status.device_id.is_empty());
    assert_eq!(status.last_pulled_at, 0);
    assert_eq!(status.pending.len(), 1);
    assert_eq!(status.pending[0].entity, EntityKind::Patients.to_string());
    assert_eq!(status.pending[0].dirty, 2);
}

#[tokio::test]
async fn sync_requires_remote_configuration() {
    if std::env::var_os("CLINIC_API_URL").is_some()
        || std::env::var_os("CLINIC_API_TOKEN").is_some()
    {
        return;
    }
    let (_dir, ctx) = temp_context();

    let result = run_sync(&ctx).await;
    assert!(matches!(result, Err(CliError::SyncNotConfigured)));
}

#[test]
fn completions_write_to_output_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("completions").join("_clinic");

    run_completions(CompletionShell::Zsh, Some(&path)).unwrap();

    let script = std::fs::read_to_string(&path).unwrap();
    assert!(script.contains("_clinic"));
}

#[test]
fn format_relative_time_units() {
    let now = 10_000_000;
    assert_eq!(format_relative_time(now - 30_000, now), "just now");
    assert_eq!(format_relative_time(now - 120_000, now), "2m ago");
    assert_eq!(format_relative_time(now - 2 * 60 * 60_000, now), "2h ago");
}

#[test]
fn format_sync_timestamp_is_utc() {
    assert_eq!(format_sync_timestamp(0), "1970-01-01 00:00:00 UTC");
}

#[test]
fn format_sync_conflict_lines_include_record() {
    let conflict = SyncConflict {
        id: 1,
        entity: "patients".to_string(),
        record_id: "p-1".to_string(),
        local_updated_at: 10,
        incoming_updated_at: 20,
        resolved_at: 0,
        strategy: "remote_wins".to_string(),
    };

    let lines = format_sync_conflict_lines(&[conflict]);
    assert_eq!(
        lines,
        vec!["1970-01-01 00:00:00 UTC  remote_wins  patients=p-1  local=10 incoming=20"]
    );
}

#[test]
fn short_id_keeps_prefix() {
    let id = RecordId::new();
    assert_eq!(short_id(&id).len(), 13);
    assert!(id.as_str().starts_with(&short_id(&id)));
}
