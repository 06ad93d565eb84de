use sqlx::SqlitePool;

use crate::models::report::Health;

/// Cloneable handle to the equipment store. Every engine operation is a
/// method on it and round-trips to the pool; nothing is cached in-process.
#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn get_pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Row count and latest modification time, for the health check.
    pub async fn health(&self) -> Result<Health, sqlx::Error> {
        let (total, last_update): (i64, Option<String>) =
            sqlx::query_as("SELECT COUNT(*), MAX(updated_at) FROM equipment")
                .fetch_one(self.get_pool())
                .await?;
        Ok(Health {
            status: "ok",
            total_equipamentos: total,
            ultima_atualizacao: last_update,
        })
    }
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("pool", &"Pool<Sqlite>")
            .finish()
    }
}
