//! Clinic CLI - operate an offline-first clinic device from the terminal
//!
//! Patients, prescriptions, the daily queue and the credit wallet all work
//! against the local store; `clinic sync` reconciles it with the remote.

mod cli;
mod commands;
mod error;
#[cfg(test)]
mod tests;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::{
    Cli, Commands, PatientCommands, PrescriptionCommands, QueueCommands, SyncCommands,
    WalletCommands,
};
use crate::commands::common::Context;
use crate::commands::completions::run_completions;
use crate::commands::patient::{
    run_patient_add, run_patient_delete, run_patient_list, PatientDetails,
};
use crate::commands::prescription::{
    run_prescription_add, run_prescription_delete, run_prescription_finalize,
    run_prescription_show, PrescriptionInput,
};
use crate::commands::queue::{run_queue_add, run_queue_list, run_queue_transition, QueueAction};
use crate::commands::sync::{
    run_sync, run_sync_conflicts, run_sync_restore, run_sync_status, run_sync_watch,
};
use crate::commands::wallet::{
    run_wallet_history, run_wallet_recharge, run_wallet_refresh, run_wallet_show,
};
use crate::error::CliError;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("Error: {error}");
        if let Some(hint) = error.hint() {
            eprintln!("{hint}");
        }
        std::process::exit(1);
    }
}

fn init_tracing() {
    let filter = EnvFilter::from_default_env();
    let filter = match "clinic=info".parse() {
        Ok(directive) => filter.add_directive(directive),
        Err(_) => filter,
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run() -> Result<(), CliError> {
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();
    let ctx = Context::new(cli.db_path, cli.config);

    match cli.command {
        Commands::Patient { command } => match command {
            PatientCommands::Add {
                name,
                age,
                gender,
                weight,
                phone,
                address,
                blood_group,
                allergies,
            } => {
                let details = PatientDetails {
                    age,
                    gender,
                    weight,
                    phone,
                    address,
                    blood_group,
                    allergies,
                };
                run_patient_add(&name, details, &ctx)?;
            }
            PatientCommands::List { limit, json } => run_patient_list(limit, json, &ctx)?,
            PatientCommands::Delete { id } => run_patient_delete(&id, &ctx)?,
        },
        Commands::Prescription { command } => match command {
            PrescriptionCommands::Add {
                patient_id,
                diagnosis,
                advice,
                follow_up,
                medicines,
                lab_tests,
            } => {
                let input = PrescriptionInput {
                    diagnosis,
                    advice,
                    follow_up,
                    medicines,
                    lab_tests,
                };
                run_prescription_add(&patient_id, input, &ctx)?;
            }
            PrescriptionCommands::Show { id, json } => run_prescription_show(&id, json, &ctx)?,
            PrescriptionCommands::Finalize { id, cost } => {
                run_prescription_finalize(&id, cost, &ctx)?;
            }
            PrescriptionCommands::Delete { id } => run_prescription_delete(&id, &ctx)?,
        },
        Commands::Queue { command } => match command {
            QueueCommands::Add { patient_id } => {
                run_queue_add(&patient_id, &ctx)?;
            }
            QueueCommands::List { date, json } => run_queue_list(date.as_deref(), json, &ctx)?,
            QueueCommands::Start { id } => {
                run_queue_transition(&id, QueueAction::Start, &ctx)?;
            }
            QueueCommands::Complete { id } => {
                run_queue_transition(&id, QueueAction::Complete, &ctx)?;
            }
            QueueCommands::Cancel { id } => {
                run_queue_transition(&id, QueueAction::Cancel, &ctx)?;
            }
        },
        Commands::Wallet { command } => match command {
            WalletCommands::Show { json } => run_wallet_show(json, &ctx)?,
            WalletCommands::Recharge { amount } => {
                run_wallet_recharge(amount, &ctx)?;
            }
            WalletCommands::History { limit, json } => run_wallet_history(limit, json, &ctx)?,
            WalletCommands::Refresh => run_wallet_refresh(&ctx).await?,
        },
        Commands::Sync { command } => match command.unwrap_or(SyncCommands::Run) {
            SyncCommands::Run => run_sync(&ctx).await?,
            SyncCommands::Status { json } => run_sync_status(json, &ctx)?,
            SyncCommands::Conflicts { limit, json } => run_sync_conflicts(limit, json, &ctx)?,
            SyncCommands::Restore => run_sync_restore(&ctx).await?,
            SyncCommands::Watch => run_sync_watch(&ctx).await?,
        },
        Commands::Completions { shell, output } => {
            run_completions(shell, output.as_deref())?;
        }
    }

    Ok(())
}
