use std::sync::Arc;

use clinic_core::models::{EntityKind, SyncCursor};
use clinic_core::sync::{SyncCursorManager, SyncOutcome, SyncReport, SyncScheduler};
use clinic_core::util::now_millis;
use serde::Serialize;

use crate::commands::common::{
    format_relative_time, format_sync_conflict_lines, format_sync_timestamp, print_json,
    sync_conflict_to_item, Context, SyncConflictItem,
};
use crate::error::CliError;

#[derive(Debug, Serialize)]
pub struct SyncStatusItem {
    pub configured: bool,
    pub device_id: String,
    pub last_pushed_at: i64,
    pub last_pulled_at: i64,
    pub pending: Vec<PendingItem>,
}

#[derive(Debug, Serialize)]
pub struct PendingItem {
    pub entity: String,
    pub dirty: usize,
}

fn print_report(report: &SyncReport) {
    println!(
        "Sync completed: pushed {}, applied {}, deleted {}, skipped {}",
        report.push.pushed,
        report.pull.applied.upserted,
        report.pull.applied.deleted,
        report.pull.applied.skipped
    );
    if report.pull.applied.overwritten > 0 {
        println!(
            "{} local edit(s) were replaced by newer remote rows; see `clinic sync conflicts`",
            report.pull.applied.overwritten
        );
    }
}

fn finish(outcome: SyncOutcome) -> Result<(), CliError> {
    match outcome {
        SyncOutcome::Completed(report) => {
            print_report(&report);
            Ok(())
        }
        SyncOutcome::AlreadyRunning => {
            println!("Sync already in progress");
            Ok(())
        }
        SyncOutcome::Failed(error) if error.is_transient() => {
            eprintln!("Warning: sync skipped ({error}); local changes stay queued");
            Ok(())
        }
        SyncOutcome::Failed(error) => Err(error.into()),
    }
}

pub async fn run_sync(ctx: &Context) -> Result<(), CliError> {
    let engine = ctx.open_engine()?;
    finish(engine.try_sync().await)
}

pub async fn run_sync_restore(ctx: &Context) -> Result<(), CliError> {
    let engine = ctx.open_engine()?;
    finish(engine.try_restore().await)
}

/// Run the background scheduler until Ctrl-C
pub async fn run_sync_watch(ctx: &Context) -> Result<(), CliError> {
    let config = ctx.sync_config()?;
    let engine = Arc::new(ctx.open_engine()?);
    let Some(interval) = config.sync_interval else {
        return finish(engine.try_sync().await);
    };

    println!("Syncing every {}s; press Ctrl-C to stop", interval.as_secs());
    let scheduler = SyncScheduler::spawn(Arc::clone(&engine), interval);
    tokio::signal::ctrl_c().await?;
    scheduler.shutdown().await;

    let status = engine.status();
    if let Some(report) = status.last_report {
        print_report(&report);
    }
    if let Some(error) = status.last_error {
        eprintln!("Last sync error: {error}");
    }
    Ok(())
}

pub fn sync_status(ctx: &Context) -> Result<SyncStatusItem, CliError> {
    let store = ctx.open_store()?;
    let SyncCursor {
        device_id,
        last_pushed_at,
        last_pulled_at,
    } = SyncCursorManager::new(store.clone()).get()?;
    let pending = store
        .dirty_counts()?
        .into_iter()
        .filter(|(_, dirty)| *dirty > 0)
        .map(|(kind, dirty): (EntityKind, usize)| PendingItem {
            entity: kind.to_string(),
            dirty,
        })
        .collect();

    Ok(SyncStatusItem {
        configured: ctx.sync_config()?.is_configured(),
        device_id,
        last_pushed_at,
        last_pulled_at,
        pending,
    })
}

pub fn run_sync_status(as_json: bool, ctx: &Context) -> Result<(), CliError> {
    let status = sync_status(ctx)?;
    if as_json {
        return print_json(&status);
    }

    let stamp = |at: i64| {
        if at == 0 {
            "never".to_string()
        } else {
            format!(
                "{} ({})",
                format_sync_timestamp(at),
                format_relative_time(at, now_millis())
            )
        }
    };
    println!("Device:      {}", status.device_id);
    println!(
        "Remote:      {}",
        if status.configured {
            "configured"
        } else {
            "not configured"
        }
    );
    println!("Last push:   {}", stamp(status.last_pushed_at));
    println!("Last pull:   {}", stamp(status.last_pulled_at));
    if status.pending.is_empty() {
        println!("Pending:     nothing");
    } else {
        for item in &status.pending {
            println!("Pending:     {} {}", item.dirty, item.entity);
        }
    }
    Ok(())
}

pub fn run_sync_conflicts(limit: usize, as_json: bool, ctx: &Context) -> Result<(), CliError> {
    let conflicts = ctx.open_store()?.list_conflicts(limit)?;

    if as_json {
        let json_items = conflicts
            .iter()
            .map(sync_conflict_to_item)
            .collect::<Vec<SyncConflictItem>>();
        return print_json(&json_items);
    }

    if conflicts.is_empty() {
        println!("No sync conflicts recorded.");
        return Ok(());
    }

    for line in format_sync_conflict_lines(&conflicts) {
        println!("{line}");
    }
    Ok(())
}
