pub mod database;
pub mod mutation;
pub mod reports;
pub mod search;

use std::str::FromStr;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;

pub use database::Database;

const SCHEMA: [&str; 4] = [
    r#"
    CREATE TABLE IF NOT EXISTS equipment (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        "type" TEXT,
        description TEXT,
        cost_center TEXT,
        patrimony TEXT NOT NULL UNIQUE,
        serial_number TEXT UNIQUE,
        location TEXT,
        sector TEXT,
        "user" TEXT,
        role TEXT,
        project TEXT,
        note TEXT,
        host TEXT,
        remote_access_id TEXT,
        received_date TEXT,
        returned_date TEXT,
        lease_value REAL,
        status TEXT DEFAULT 'Em uso',
        created_at TEXT,
        updated_at TEXT
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_equipment_cost_center ON equipment(cost_center)",
    "CREATE INDEX IF NOT EXISTS idx_equipment_status ON equipment(status)",
    "CREATE INDEX IF NOT EXISTS idx_equipment_type ON equipment(\"type\")",
];

/// Opens the store at `url`, checks it answers, and creates the schema if
/// missing.
pub async fn connect(url: &str, max_connections: u32) -> Result<Database, sqlx::Error> {
    tracing::info!(url, "connecting to database");

    let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections.max(1))
        .connect_with(options)
        .await?;

    sqlx::query("SELECT 1").execute(&pool).await?;
    tracing::info!("database connection established");

    init_schema(&pool).await?;
    Ok(Database::new(pool))
}

/// A private in-memory store with the full schema. The pool keeps its single
/// connection open for its whole lifetime, since closing it drops the data.
pub async fn connect_in_memory() -> Result<Database, sqlx::Error> {
    let pool = SqlitePoolOptions::new()
        .min_connections(1)
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await?;
    init_schema(&pool).await?;
    Ok(Database::new(pool))
}

async fn init_schema(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    for statement in SCHEMA {
        sqlx::query(statement).execute(pool).await?;
    }
    tracing::debug!("table 'equipment' created/verified");
    Ok(())
}
