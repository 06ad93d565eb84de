use chrono::Utc;
use tracing::instrument;

use super::Database;
use crate::error::{AppError, AppResult};
use crate::models::{Field, FieldSet, DEFAULT_STATUS};
use crate::query::compiler;

fn now() -> String {
    Utc::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

impl Database {
    /// Inserts one record and returns its surrogate id. `patrimony` is
    /// required; `status` defaults to "Em uso".
    #[instrument(skip_all, fields(patrimony = record.text(Field::Patrimony).unwrap_or("")))]
    pub async fn create(&self, mut record: FieldSet) -> AppResult<i64> {
        if record.text(Field::Patrimony).map_or(true, str::is_empty) {
            return Err(AppError::BadRequest("Campo 'patrimonio' é obrigatório".into()));
        }
        record.set_default(Field::Status, DEFAULT_STATUS);

        let insert = compiler::insert(&record, &now());
        let result = sqlx::query_with(&insert.sql, insert.arguments())
            .execute(self.get_pool())
            .await?;

        let id = result.last_insert_rowid();
        tracing::info!(id, "equipment created");
        Ok(id)
    }

    /// Applies a partial update. An empty field set is `NoValidFields`, an
    /// unknown patrimony is `NotFound`.
    #[instrument(skip(self, fields))]
    pub async fn update(&self, patrimony: &str, fields: &FieldSet) -> AppResult<u64> {
        if fields.is_empty() {
            return Err(AppError::NoValidFields);
        }
        let update = compiler::update(patrimony, fields, &now());
        let result = sqlx::query_with(&update.sql, update.arguments())
            .execute(self.get_pool())
            .await?;

        match result.rows_affected() {
            0 => Err(AppError::NotFound(format!("Equipamento '{}' não encontrado", patrimony))),
            n => {
                tracing::info!(changed = fields.len(), "equipment updated");
                Ok(n)
            }
        }
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, patrimony: &str) -> AppResult<()> {
        let delete = compiler::delete(patrimony);
        let result = sqlx::query_with(&delete.sql, delete.arguments())
            .execute(self.get_pool())
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Equipamento '{}' não encontrado", patrimony)));
        }
        tracing::info!("equipment deleted");
        Ok(())
    }
}
