use chrono::{DateTime, Utc};
use csv::WriterBuilder;

use crate::error::{AppError, AppResult};
use crate::models::{Equipment, Field};

/// Renders records as comma-separated UTF-8 with a BOM. The header uses the
/// English field keys, so the output can be fed back to the batch import.
pub fn to_csv(rows: &[Equipment]) -> AppResult<Vec<u8>> {
    let mut writer = WriterBuilder::new().from_writer(b"\xEF\xBB\xBF".to_vec());
    let write_err = |e: csv::Error| AppError::Internal(format!("Erro ao gerar CSV: {}", e));

    writer
        .write_record(Field::ALL.iter().map(|f| f.key()))
        .map_err(write_err)?;
    for row in rows {
        writer
            .write_record(Field::ALL.iter().map(|f| row.text_of(*f)))
            .map_err(write_err)?;
    }
    writer
        .into_inner()
        .map_err(|e| AppError::Internal(format!("Erro ao gerar CSV: {}", e.error())))
}

/// `equipamentos[_<scope>]_<YYYYmmdd_HHMMSS>.csv`, with the scope reduced to
/// filename-safe characters.
pub fn filename(scope: Option<&str>, at: DateTime<Utc>) -> String {
    let stamp = at.format("%Y%m%d_%H%M%S");
    match scope {
        Some(scope) => {
            let safe: String = scope
                .chars()
                .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
                .collect();
            format!("equipamentos_{}_{}.csv", safe, stamp)
        }
        None => format!("equipamentos_{}.csv", stamp),
    }
}
