use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(name = "clinic")]
#[command(about = "Operate an offline-first clinic device store from the command line")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Optional path to local database file
    #[arg(long, global = true, value_name = "PATH")]
    pub db_path: Option<PathBuf>,

    /// Optional path to the device config file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Manage patients
    Patient {
        #[command(subcommand)]
        command: PatientCommands,
    },
    /// Write, inspect and issue prescriptions
    #[command(alias = "rx")]
    Prescription {
        #[command(subcommand)]
        command: PrescriptionCommands,
    },
    /// Today's patient queue
    Queue {
        #[command(subcommand)]
        command: QueueCommands,
    },
    /// Prescription credits
    Wallet {
        #[command(subcommand)]
        command: WalletCommands,
    },
    /// Reconcile the local store with the remote store (runs one cycle by default)
    Sync {
        #[command(subcommand)]
        command: Option<SyncCommands>,
    },
    /// Generate shell completion scripts
    Completions {
        /// Target shell
        #[arg(value_enum)]
        shell: CompletionShell,
        /// Optional output path (stdout when omitted)
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum CompletionShell {
    Bash,
    Zsh,
    Fish,
}

#[derive(Subcommand)]
pub enum PatientCommands {
    /// Register a patient
    Add {
        /// Full name
        name: Vec<String>,
        #[arg(long)]
        age: Option<i64>,
        #[arg(long)]
        gender: Option<String>,
        /// Weight in kg
        #[arg(long)]
        weight: Option<f64>,
        #[arg(long)]
        phone: Option<String>,
        #[arg(long)]
        address: Option<String>,
        #[arg(long)]
        blood_group: Option<String>,
        #[arg(long)]
        allergies: Option<String>,
    },
    /// List patients, most recently updated first
    List {
        /// Number of patients to show
        #[arg(short, long, default_value = "20")]
        limit: usize,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete a patient
    Delete {
        /// Patient ID
        id: String,
    },
}

#[derive(Subcommand)]
pub enum PrescriptionCommands {
    /// Write a prescription for a patient
    Add {
        /// Patient ID
        patient_id: String,
        #[arg(long)]
        diagnosis: Option<String>,
        #[arg(long)]
        advice: Option<String>,
        /// Follow-up date (YYYY-MM-DD)
        #[arg(long, value_name = "DATE")]
        follow_up: Option<String>,
        /// Medicine name (repeatable)
        #[arg(long = "medicine", value_name = "NAME")]
        medicines: Vec<String>,
        /// Lab test name (repeatable)
        #[arg(long = "lab-test", value_name = "NAME")]
        lab_tests: Vec<String>,
    },
    /// Show a prescription with its line items
    Show {
        /// Prescription ID
        id: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Issue a prescription, paying for it from the wallet
    Finalize {
        /// Prescription ID
        id: String,
        /// Credits to charge (defaults to the configured prescription cost)
        #[arg(long)]
        cost: Option<i64>,
    },
    /// Delete a prescription and its line items
    Delete {
        /// Prescription ID
        id: String,
    },
}

#[derive(Subcommand)]
pub enum QueueCommands {
    /// Add a patient to today's queue
    Add {
        /// Patient ID
        patient_id: String,
    },
    /// Show the queue for a day
    List {
        /// Day to show (YYYY-MM-DD, defaults to today)
        #[arg(long, value_name = "DATE")]
        date: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Call a waiting patient in
    Start {
        /// Queue item ID
        id: String,
    },
    /// Finish the consultation
    Complete {
        /// Queue item ID
        id: String,
    },
    /// Remove a patient from the queue
    Cancel {
        /// Queue item ID
        id: String,
    },
}

#[derive(Subcommand)]
pub enum WalletCommands {
    /// Show the cached balance
    Show {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Add credits
    Recharge {
        /// Credits to add
        amount: i64,
    },
    /// Show recent wallet transactions
    History {
        /// Number of entries to show
        #[arg(short, long, default_value = "20")]
        limit: usize,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Replace the cached balance with the remote ledger's
    Refresh,
}

#[derive(Subcommand)]
pub enum SyncCommands {
    /// Run one push-then-pull cycle
    Run,
    /// Show device cursor and pending changes
    Status {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List local edits replaced by incoming remote rows
    Conflicts {
        /// Number of conflicts to show
        #[arg(short, long, default_value = "10")]
        limit: usize,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Push pending changes, then apply a full remote snapshot
    Restore,
    /// Keep syncing on the configured interval until interrupted
    Watch,
}
