//! Database migrations

use rusqlite::{Connection, OptionalExtension};

use crate::error::Result;

/// Current schema version
const CURRENT_VERSION: i32 = 3;

/// Run all pending migrations
pub fn run(conn: &mut Connection) -> Result<()> {
    let version = get_version(conn)?;

    if version < 1 {
        apply(conn, 1, V1_STATEMENTS)?;
    }
    if version < 2 {
        apply(conn, 2, V2_STATEMENTS)?;
    }
    if version < 3 {
        apply(conn, 3, V3_STATEMENTS)?;
    }

    Ok(())
}

/// Get the current schema version
fn get_version(conn: &Connection) -> Result<i32> {
    let exists: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version')",
        [],
        |row| row.get(0),
    )?;

    if !exists {
        return Ok(0);
    }

    let version = conn
        .query_row("SELECT MAX(version) FROM schema_version", [], |row| {
            row.get::<_, Option<i32>>(0)
        })
        .optional()?
        .flatten()
        .unwrap_or(0);

    Ok(version)
}

/// Run one migration's statements in a single transaction
fn apply(conn: &mut Connection, version: i32, statements: &[&str]) -> Result<()> {
    let tx = conn.transaction()?;
    for stmt in statements {
        tx.execute_batch(stmt)?;
    }
    tx.execute("INSERT INTO schema_version (version) VALUES (?)", [version])?;
    tx.commit()?;

    tracing::info!("Migrated database to version {version} (target {CURRENT_VERSION})");
    Ok(())
}

/// Version 1: synchronized clinical tables
///
/// Every synchronized table carries `updated_at`, `is_deleted`, `is_dirty`
/// and `local_version`. Children reference their prescription without a
/// foreign key so pulls may deliver them before the parent.
const V1_STATEMENTS: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS schema_version (
        version INTEGER PRIMARY KEY
    )",
    "CREATE TABLE IF NOT EXISTS patients (
        id TEXT PRIMARY KEY,
        name TEXT NOT NULL,
        age INTEGER,
        gender TEXT,
        weight REAL,
        phone TEXT,
        address TEXT,
        blood_group TEXT,
        allergies TEXT,
        created_at INTEGER NOT NULL,
        updated_at INTEGER NOT NULL,
        is_deleted INTEGER NOT NULL DEFAULT 0,
        is_dirty INTEGER NOT NULL DEFAULT 1,
        local_version INTEGER NOT NULL DEFAULT 1
    )",
    "CREATE INDEX IF NOT EXISTS idx_patients_dirty ON patients(is_dirty)",
    "CREATE INDEX IF NOT EXISTS idx_patients_updated ON patients(updated_at DESC)",
    "CREATE TABLE IF NOT EXISTS prescriptions (
        id TEXT PRIMARY KEY,
        patient_id TEXT NOT NULL,
        diagnosis TEXT,
        advice TEXT,
        follow_up_date TEXT,
        finalized_at INTEGER,
        created_at INTEGER NOT NULL,
        updated_at INTEGER NOT NULL,
        is_deleted INTEGER NOT NULL DEFAULT 0,
        is_dirty INTEGER NOT NULL DEFAULT 1,
        local_version INTEGER NOT NULL DEFAULT 1
    )",
    "CREATE INDEX IF NOT EXISTS idx_prescriptions_dirty ON prescriptions(is_dirty)",
    "CREATE INDEX IF NOT EXISTS idx_prescriptions_patient ON prescriptions(patient_id)",
    "CREATE TABLE IF NOT EXISTS prescription_medicines (
        id TEXT PRIMARY KEY,
        prescription_id TEXT NOT NULL,
        name TEXT NOT NULL,
        dosage TEXT,
        frequency TEXT,
        duration TEXT,
        instructions TEXT,
        created_at INTEGER NOT NULL,
        updated_at INTEGER NOT NULL,
        is_deleted INTEGER NOT NULL DEFAULT 0,
        is_dirty INTEGER NOT NULL DEFAULT 1,
        local_version INTEGER NOT NULL DEFAULT 1
    )",
    "CREATE INDEX IF NOT EXISTS idx_prescription_medicines_parent
        ON prescription_medicines(prescription_id)",
    "CREATE INDEX IF NOT EXISTS idx_prescription_medicines_dirty
        ON prescription_medicines(is_dirty)",
    "CREATE TABLE IF NOT EXISTS prescription_lab_tests (
        id TEXT PRIMARY KEY,
        prescription_id TEXT NOT NULL,
        name TEXT NOT NULL,
        instructions TEXT,
        created_at INTEGER NOT NULL,
        updated_at INTEGER NOT NULL,
        is_deleted INTEGER NOT NULL DEFAULT 0,
        is_dirty INTEGER NOT NULL DEFAULT 1,
        local_version INTEGER NOT NULL DEFAULT 1
    )",
    "CREATE INDEX IF NOT EXISTS idx_prescription_lab_tests_parent
        ON prescription_lab_tests(prescription_id)",
    "CREATE INDEX IF NOT EXISTS idx_prescription_lab_tests_dirty
        ON prescription_lab_tests(is_dirty)",
    "CREATE TABLE IF NOT EXISTS custom_medicines (
        id TEXT PRIMARY KEY,
        name TEXT NOT NULL,
        generic_name TEXT,
        form TEXT,
        strength TEXT,
        created_at INTEGER NOT NULL,
        updated_at INTEGER NOT NULL,
        is_deleted INTEGER NOT NULL DEFAULT 0,
        is_dirty INTEGER NOT NULL DEFAULT 1,
        local_version INTEGER NOT NULL DEFAULT 1
    )",
    "CREATE INDEX IF NOT EXISTS idx_custom_medicines_dirty ON custom_medicines(is_dirty)",
    "CREATE TABLE IF NOT EXISTS custom_lab_tests (
        id TEXT PRIMARY KEY,
        name TEXT NOT NULL,
        category TEXT,
        created_at INTEGER NOT NULL,
        updated_at INTEGER NOT NULL,
        is_deleted INTEGER NOT NULL DEFAULT 0,
        is_dirty INTEGER NOT NULL DEFAULT 1,
        local_version INTEGER NOT NULL DEFAULT 1
    )",
    "CREATE INDEX IF NOT EXISTS idx_custom_lab_tests_dirty ON custom_lab_tests(is_dirty)",
];

/// Version 2: device-local queue, wallet and the sync cursor
const V2_STATEMENTS: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS queue (
        id TEXT PRIMARY KEY,
        patient_id TEXT NOT NULL,
        token_number INTEGER NOT NULL,
        queue_date TEXT NOT NULL,
        status TEXT NOT NULL DEFAULT 'waiting',
        created_at INTEGER NOT NULL,
        started_at INTEGER,
        completed_at INTEGER,
        updated_at INTEGER NOT NULL
    )",
    "CREATE UNIQUE INDEX IF NOT EXISTS idx_queue_day_token ON queue(queue_date, token_number)",
    "CREATE TABLE IF NOT EXISTS wallet_cache (
        id INTEGER PRIMARY KEY CHECK (id = 1),
        balance INTEGER NOT NULL DEFAULT 0 CHECK (balance >= 0),
        last_synced_at INTEGER
    )",
    "CREATE TABLE IF NOT EXISTS transactions (
        id TEXT PRIMARY KEY,
        type TEXT NOT NULL CHECK (type IN ('credit', 'debit')),
        amount INTEGER NOT NULL,
        description TEXT NOT NULL,
        reference_id TEXT,
        created_at INTEGER NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS idx_transactions_created ON transactions(created_at DESC)",
    "CREATE INDEX IF NOT EXISTS idx_transactions_reference ON transactions(reference_id)",
    "ALTER TABLE prescriptions ADD COLUMN wallet_deducted INTEGER NOT NULL DEFAULT 0",
    "CREATE TABLE IF NOT EXISTS sync_cursor (
        id INTEGER PRIMARY KEY CHECK (id = 1),
        device_id TEXT NOT NULL,
        last_pushed_at INTEGER NOT NULL DEFAULT 0,
        last_pulled_at INTEGER NOT NULL DEFAULT 0
    )",
];

/// Version 3: record pulls that overwrote unsynced local edits
const V3_STATEMENTS: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS sync_conflicts (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        entity TEXT NOT NULL,
        record_id TEXT NOT NULL,
        local_updated_at INTEGER NOT NULL,
        incoming_updated_at INTEGER NOT NULL,
        resolved_at INTEGER NOT NULL,
        strategy TEXT NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS idx_sync_conflicts_record ON sync_conflicts(record_id)",
    "CREATE INDEX IF NOT EXISTS idx_sync_conflicts_resolved_at
        ON sync_conflicts(resolved_at DESC)",
];

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> Connection {
        Connection::open_in_memory().unwrap()
    }

    fn table_exists(conn: &Connection, name: &str) -> bool {
        conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?)",
            [name],
            |row| row.get(0),
        )
        .unwrap()
    }

    #[test]
    fn test_migrations() {
        let mut conn = setup();
        run(&mut conn).unwrap();

        let version = get_version(&conn).unwrap();
        assert_eq!(version, CURRENT_VERSION);
    }

    #[test]
    fn test_migrations_idempotent() {
        let mut conn = setup();
        run(&mut conn).unwrap();
        run(&mut conn).unwrap(); // Should not fail

        let version = get_version(&conn).unwrap();
        assert_eq!(version, CURRENT_VERSION);
    }

    #[test]
    fn test_migrations_create_all_tables() {
        let mut conn = setup();
        run(&mut conn).unwrap();

        for table in [
            "patients",
            "prescriptions",
            "prescription_medicines",
            "prescription_lab_tests",
            "custom_medicines",
            "custom_lab_tests",
            "queue",
            "wallet_cache",
            "transactions",
            "sync_cursor",
            "sync_conflicts",
        ] {
            assert!(table_exists(&conn, table), "missing table {table}");
        }
    }

    #[test]
    fn test_wallet_balance_cannot_go_negative() {
        let mut conn = setup();
        run(&mut conn).unwrap();

        let result = conn.execute(
            "INSERT INTO wallet_cache (id, balance) VALUES (1, -1)",
            [],
        );
        assert!(result.is_err());
    }
}
