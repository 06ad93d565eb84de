//! Bulk create/update/delete from an uploaded CSV.
//!
//! Rows are applied one at a time through the same engine methods as the
//! single-record endpoints. A failing row is recorded in the report and the
//! next row is processed; only a malformed upload (no patrimony column,
//! unreadable header) fails the whole request.

use std::fmt;
use std::str::FromStr;

use csv::{ReaderBuilder, StringRecord, Trim};
use serde::Serialize;
use tracing::instrument;

use crate::database::Database;
use crate::error::{AppError, AppResult};
use crate::models::{Field, FieldSet, Scope};

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BatchAction {
    Create,
    Update,
    Delete,
}

impl FromStr for BatchAction {
    type Err = AppError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_lowercase().as_str() {
            "create" | "criar" => Ok(BatchAction::Create),
            "update" | "atualizar" => Ok(BatchAction::Update),
            "delete" | "excluir" => Ok(BatchAction::Delete),
            other => Err(AppError::BadRequest(format!(
                "Ação inválida '{}': use create, update ou delete",
                other
            ))),
        }
    }
}

/// Failure of a single CSV row.
#[derive(Debug, Clone, PartialEq)]
pub struct RowError {
    pub row: usize,
    pub patrimony: String,
    pub message: String,
}

impl fmt::Display for RowError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Linha {} (patrimônio '{}'): {}",
            self.row, self.patrimony, self.message
        )
    }
}

#[derive(Serialize, Debug, Default)]
pub struct BatchReport {
    pub total: usize,
    pub sucesso: usize,
    pub erros: Vec<String>,
    pub detalhes: Vec<String>,
}

fn sniff_delimiter(data: &[u8]) -> u8 {
    let header = data.split(|b| *b == b'\n').next().unwrap_or(data);
    if header.contains(&b';') && !header.contains(&b',') {
        b';'
    } else {
        b','
    }
}

/// Applies `action` to every data row of `data`. Row numbers start at 1 with
/// the first row after the header.
#[instrument(skip(db, data), fields(bytes = data.len()))]
pub async fn process_batch(db: &Database, data: &[u8], action: BatchAction) -> AppResult<BatchReport> {
    let data = data.strip_prefix(UTF8_BOM).unwrap_or(data);
    let mut reader = ReaderBuilder::new()
        .delimiter(sniff_delimiter(data))
        .flexible(true)
        .trim(Trim::All)
        .from_reader(data);

    let columns: Vec<Option<Field>> = reader
        .headers()
        .map_err(|e| AppError::BadRequest(format!("Cabeçalho CSV inválido: {}", e)))?
        .iter()
        .map(Field::from_key)
        .collect();
    let patrimony_idx = columns
        .iter()
        .position(|c| *c == Some(Field::Patrimony))
        .ok_or_else(|| AppError::BadRequest("O CSV deve conter a coluna 'patrimonio'".into()))?;

    let mut report = BatchReport::default();
    for (idx, record) in reader.records().enumerate() {
        let row = idx + 1;
        report.total += 1;

        let outcome = match record {
            Ok(record) => {
                let patrimony = record.get(patrimony_idx).unwrap_or("").trim().to_string();
                apply_row(db, action, &columns, &record, &patrimony)
                    .await
                    .map(|done| format!("Linha {}: patrimônio '{}' {}", row, patrimony, done))
                    .map_err(|e| RowError {
                        row,
                        patrimony,
                        message: e.to_string(),
                    })
            }
            Err(e) => Err(RowError {
                row,
                patrimony: String::new(),
                message: format!("linha CSV inválida: {}", e),
            }),
        };

        match outcome {
            Ok(detail) => {
                report.sucesso += 1;
                report.detalhes.push(detail);
            }
            Err(row_error) => {
                tracing::warn!(row, error = %row_error, "batch row failed");
                report.erros.push(row_error.to_string());
            }
        }
    }

    tracing::info!(
        ?action,
        total = report.total,
        ok = report.sucesso,
        failed = report.erros.len(),
        "batch finished"
    );
    Ok(report)
}

async fn apply_row(
    db: &Database,
    action: BatchAction,
    columns: &[Option<Field>],
    record: &StringRecord,
    patrimony: &str,
) -> AppResult<String> {
    if patrimony.is_empty() {
        return Err(AppError::BadRequest("patrimônio ausente".into()));
    }
    let pairs = || {
        columns
            .iter()
            .zip(record.iter())
            .filter_map(|(field, value)| field.map(|f| (f, value)))
    };

    match action {
        BatchAction::Create => {
            let fields = FieldSet::from_pairs(pairs(), Scope::Create)?;
            if fields.text(Field::Type).is_none() {
                return Err(AppError::BadRequest("campo 'tipo' é obrigatório".into()));
            }
            let id = db.create(fields).await?;
            Ok(format!("criado (id {})", id))
        }
        BatchAction::Update => {
            let fields = FieldSet::from_pairs(pairs(), Scope::Update)?;
            db.update(patrimony, &fields).await?;
            Ok("atualizado".to_string())
        }
        BatchAction::Delete => {
            db.delete(patrimony).await?;
            Ok("removido".to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::connect_in_memory;

    #[test]
    fn parses_actions_in_both_languages() {
        assert_eq!("create".parse::<BatchAction>().unwrap(), BatchAction::Create);
        assert_eq!(" Atualizar ".parse::<BatchAction>().unwrap(), BatchAction::Update);
        assert_eq!("excluir".parse::<BatchAction>().unwrap(), BatchAction::Delete);
        assert!("upsert".parse::<BatchAction>().is_err());
    }

    #[test]
    fn sniffs_semicolon_headers() {
        assert_eq!(sniff_delimiter(b"patrimonio;tipo\nA;B"), b';');
        assert_eq!(sniff_delimiter(b"patrimonio,tipo\nA;B"), b',');
    }

    #[actix_web::test]
    async fn create_rows_are_isolated() {
        let db = connect_in_memory().await.unwrap();
        let csv = "\u{feff}patrimonio,tipo,usuario,valor_locacao\n\
                   P1,Notebook,Ana,100\n\
                   P2,Notebook,Bia,\n\
                   ,Monitor,Caio,50\n\
                   P3,Monitor,,\n\
                   P4,Desktop,Davi,75.5\n\
                   P5,Tablet,Eva,10\n";
        let report = process_batch(&db, csv.as_bytes(), BatchAction::Create)
            .await
            .unwrap();

        assert_eq!(report.total, 6);
        assert_eq!(report.sucesso, 5);
        assert_eq!(report.erros.len(), 1);
        assert!(report.erros[0].starts_with("Linha 3 "));
        assert_eq!(report.detalhes.len(), 5);

        let p2 = db.get("P2").await.unwrap().unwrap();
        assert_eq!(p2.lease_value, None);
        assert_eq!(p2.status.as_deref(), Some("Em uso"));
    }

    #[actix_web::test]
    async fn create_requires_type_and_reports_conflicts() {
        let db = connect_in_memory().await.unwrap();
        let csv = "patrimonio;tipo\nP1;Notebook\nP2;\nP1;Monitor\n";
        let report = process_batch(&db, csv.as_bytes(), BatchAction::Create)
            .await
            .unwrap();
        assert_eq!(report.sucesso, 1);
        assert_eq!(report.erros.len(), 2);
        assert!(report.erros[0].contains("'P2'") && report.erros[0].contains("tipo"));
        assert!(report.erros[1].starts_with("Linha 3 ") && report.erros[1].contains("já cadastrado"));
    }

    #[actix_web::test]
    async fn update_and_delete_rows() {
        let db = connect_in_memory().await.unwrap();
        process_batch(&db, b"patrimony,type\nP1,Notebook\nP2,Monitor\n", BatchAction::Create)
            .await
            .unwrap();

        let report = process_batch(
            &db,
            b"patrimonio,status,usuario\nP1,Manutencao,\nP9,Baixado,\nP2,,\n",
            BatchAction::Update,
        )
        .await
        .unwrap();
        assert_eq!(report.sucesso, 1);
        assert_eq!(report.erros.len(), 2);
        assert!(report.erros[0].contains("não encontrado"));
        assert!(report.erros[1].contains("Nenhum campo válido"));
        assert_eq!(
            db.get("P1").await.unwrap().unwrap().status.as_deref(),
            Some("Manutencao")
        );

        let report = process_batch(&db, b"patrimonio\nP1\nP1\n", BatchAction::Delete)
            .await
            .unwrap();
        assert_eq!(report.sucesso, 1);
        assert!(report.erros[0].starts_with("Linha 2 "));
    }

    #[actix_web::test]
    async fn missing_patrimony_column_fails_the_request() {
        let db = connect_in_memory().await.unwrap();
        let err = process_batch(&db, b"tipo,usuario\nNotebook,Ana\n", BatchAction::Create)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }
}
