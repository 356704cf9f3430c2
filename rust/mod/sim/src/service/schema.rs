use salesops_core::ServiceError;
use salesops_sql::{Executor, SQLStore};

/// SQL DDL for the SIM inventory and the client directory.
///
/// Binding columns are plain columns, not a JSON document, so the guarded
/// UPDATEs of the engine can compare them directly. The UNIQUE constraints
/// on `owner_client_id` and `held_sim_serial` make "one SIM per client"
/// hold at the storage level as well.
const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS clients (
        id TEXT PRIMARY KEY,
        display_name TEXT NOT NULL,
        product_class TEXT NOT NULL,
        held_sim_serial TEXT UNIQUE,
        scope TEXT NOT NULL,
        created_at TEXT NOT NULL,
        deleted_at TEXT
    )",
    "CREATE TABLE IF NOT EXISTS sim_cards (
        id TEXT PRIMARY KEY,
        serial TEXT NOT NULL UNIQUE,
        status TEXT NOT NULL,
        owner_client_id TEXT UNIQUE REFERENCES clients(id),
        scope TEXT NOT NULL,
        assigned_at TEXT,
        activated_at TEXT,
        created_at TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS client_activity (
        seq INTEGER PRIMARY KEY AUTOINCREMENT,
        id TEXT NOT NULL UNIQUE,
        client_id TEXT NOT NULL REFERENCES clients(id),
        actor TEXT NOT NULL,
        message TEXT NOT NULL,
        created_at TEXT NOT NULL
    )",
    // Indexes
    "CREATE INDEX IF NOT EXISTS idx_sim_pool ON sim_cards(scope, status, serial)",
    "CREATE INDEX IF NOT EXISTS idx_client_scope ON clients(scope)",
    "CREATE INDEX IF NOT EXISTS idx_activity_client ON client_activity(client_id, seq)",
];

pub fn init_schema(sql: &dyn SQLStore) -> Result<(), ServiceError> {
    for stmt in SCHEMA {
        sql.exec(stmt, &[])
            .map_err(|e| ServiceError::Storage(format!("schema init failed: {}", e)))?;
    }
    Ok(())
}
