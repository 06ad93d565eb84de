pub mod report;

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

/// Status stored on creation when none is given.
pub const DEFAULT_STATUS: &str = "Em uso";

/// Columns selected for every full-record query, in `Field` declaration order.
pub const EQUIPMENT_COLUMNS: &str = "id, \"type\", description, cost_center, patrimony, serial_number, \
     location, sector, \"user\", role, project, note, host, remote_access_id, \
     received_date, returned_date, lease_value, status, created_at, updated_at";

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, sqlx::FromRow)]
pub struct Equipment {
    pub id: i64,
    #[serde(rename = "type")]
    #[sqlx(rename = "type")]
    pub kind: Option<String>,
    pub description: Option<String>,
    pub cost_center: Option<String>,
    pub patrimony: String,
    pub serial_number: Option<String>,
    pub location: Option<String>,
    pub sector: Option<String>,
    pub user: Option<String>,
    pub role: Option<String>,
    pub project: Option<String>,
    pub note: Option<String>,
    pub host: Option<String>,
    pub remote_access_id: Option<String>,
    pub received_date: Option<String>,
    pub returned_date: Option<String>,
    pub lease_value: Option<f64>,
    pub status: Option<String>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

impl Equipment {
    /// Text rendering of one field, as written to CSV exports.
    pub fn text_of(&self, field: Field) -> String {
        let value = match field {
            Field::Type => &self.kind,
            Field::Description => &self.description,
            Field::CostCenter => &self.cost_center,
            Field::Patrimony => return self.patrimony.clone(),
            Field::SerialNumber => &self.serial_number,
            Field::Location => &self.location,
            Field::Sector => &self.sector,
            Field::User => &self.user,
            Field::Role => &self.role,
            Field::Project => &self.project,
            Field::Note => &self.note,
            Field::Host => &self.host,
            Field::RemoteAccessId => &self.remote_access_id,
            Field::ReceivedDate => &self.received_date,
            Field::ReturnedDate => &self.returned_date,
            Field::LeaseValue => return self.lease_value.map(|v| v.to_string()).unwrap_or_default(),
            Field::Status => &self.status,
        };
        value.clone().unwrap_or_default()
    }
}

/// An equipment attribute. Column names never come from user input, only
/// from this enum.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Field {
    Type,
    Description,
    CostCenter,
    Patrimony,
    SerialNumber,
    Location,
    Sector,
    User,
    Role,
    Project,
    Note,
    Host,
    RemoteAccessId,
    ReceivedDate,
    ReturnedDate,
    LeaseValue,
    Status,
}

impl Field {
    pub const ALL: [Field; 17] = [
        Field::Type,
        Field::Description,
        Field::CostCenter,
        Field::Patrimony,
        Field::SerialNumber,
        Field::Location,
        Field::Sector,
        Field::User,
        Field::Role,
        Field::Project,
        Field::Note,
        Field::Host,
        Field::RemoteAccessId,
        Field::ReceivedDate,
        Field::ReturnedDate,
        Field::LeaseValue,
        Field::Status,
    ];

    /// Columns searched by the free-text `q` parameter.
    pub const FREE_TEXT: [Field; 7] = [
        Field::Patrimony,
        Field::Description,
        Field::SerialNumber,
        Field::User,
        Field::Host,
        Field::Location,
        Field::Type,
    ];

    /// Fields whose distinct values feed the UI filter dropdowns.
    pub const DROPDOWN: [Field; 8] = [
        Field::Type,
        Field::Status,
        Field::CostCenter,
        Field::Sector,
        Field::Location,
        Field::User,
        Field::Project,
        Field::Role,
    ];

    /// Fields a partial update may change. Everything else, `patrimony`
    /// included, is fixed once the record exists.
    pub const UPDATABLE: [Field; 6] = [
        Field::Status,
        Field::ReceivedDate,
        Field::ReturnedDate,
        Field::LeaseValue,
        Field::Location,
        Field::User,
    ];

    /// English key, used in JSON bodies and CSV export headers.
    pub fn key(self) -> &'static str {
        match self {
            Field::Type => "type",
            Field::Description => "description",
            Field::CostCenter => "cost_center",
            Field::Patrimony => "patrimony",
            Field::SerialNumber => "serial_number",
            Field::Location => "location",
            Field::Sector => "sector",
            Field::User => "user",
            Field::Role => "role",
            Field::Project => "project",
            Field::Note => "note",
            Field::Host => "host",
            Field::RemoteAccessId => "remote_access_id",
            Field::ReceivedDate => "received_date",
            Field::ReturnedDate => "returned_date",
            Field::LeaseValue => "lease_value",
            Field::Status => "status",
        }
    }

    /// Quoted column identifier, safe to splice into SQL text.
    pub fn column(self) -> &'static str {
        match self {
            Field::Type => "\"type\"",
            Field::User => "\"user\"",
            other => other.key(),
        }
    }

    /// Resolves a request key (English or legacy Portuguese, any case).
    pub fn from_key(key: &str) -> Option<Field> {
        let key = key.trim().to_lowercase();
        let field = match key.as_str() {
            "type" | "tipo" => Field::Type,
            "description" | "descritivo" | "descricao" => Field::Description,
            "cost_center" | "centro_custo" => Field::CostCenter,
            "patrimony" | "patrimonio" => Field::Patrimony,
            "serial_number" | "numero_serie" | "serie" => Field::SerialNumber,
            "location" | "local_atual" | "local" => Field::Location,
            "sector" | "setor" => Field::Sector,
            "user" | "usuario" => Field::User,
            "role" | "funcao" => Field::Role,
            "project" | "obra_projeto" => Field::Project,
            "note" | "observacao" => Field::Note,
            "host" => Field::Host,
            "remote_access_id" => Field::RemoteAccessId,
            "received_date" | "data_recebimento" => Field::ReceivedDate,
            "returned_date" | "data_devolucao" => Field::ReturnedDate,
            "lease_value" | "valor_locacao" => Field::LeaseValue,
            "status" => Field::Status,
            _ => return None,
        };
        Some(field)
    }

    pub fn is_date(self) -> bool {
        matches!(self, Field::ReceivedDate | Field::ReturnedDate)
    }

    pub fn is_text(self) -> bool {
        !self.is_date() && self != Field::LeaseValue
    }
}

/// Which mutation a `FieldSet` is being built for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Scope {
    Create,
    Update,
}

impl Scope {
    pub fn allows(self, field: Field) -> bool {
        match self {
            Scope::Create => true,
            Scope::Update => Field::UPDATABLE.contains(&field),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum FieldValue {
    Text(String),
    Number(f64),
    Null,
}

/// Validated field values for one create or update.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FieldSet {
    values: BTreeMap<Field, FieldValue>,
}

impl FieldSet {
    /// Builds from a JSON object. Keys outside the scope are dropped; blank
    /// strings are dropped on create and clear the column on update.
    pub fn from_json(body: &serde_json::Map<String, serde_json::Value>, scope: Scope) -> AppResult<Self> {
        let mut set = FieldSet::default();
        for (key, value) in body {
            let Some(field) = Field::from_key(key).filter(|f| scope.allows(*f)) else {
                continue;
            };
            let raw = match value {
                serde_json::Value::Null => None,
                serde_json::Value::String(s) => Some(s.trim().to_string()),
                serde_json::Value::Number(n) => Some(n.to_string()),
                serde_json::Value::Bool(b) => Some(b.to_string()),
                _ => {
                    return Err(AppError::BadRequest(format!(
                        "Valor inválido para o campo '{}'",
                        field.key()
                    )))
                }
            };
            match raw {
                Some(s) if !s.is_empty() => set.insert_raw(field, &s)?,
                _ if scope == Scope::Update => {
                    set.values.insert(field, FieldValue::Null);
                }
                _ => {}
            }
        }
        Ok(set)
    }

    /// Builds from `(header, cell)` pairs of a CSV row. Blank cells are
    /// dropped in both scopes.
    pub fn from_pairs<'a, I>(pairs: I, scope: Scope) -> AppResult<Self>
    where
        I: IntoIterator<Item = (Field, &'a str)>,
    {
        let mut set = FieldSet::default();
        for (field, raw) in pairs {
            let raw = raw.trim();
            if raw.is_empty() || !scope.allows(field) {
                continue;
            }
            set.insert_raw(field, raw)?;
        }
        Ok(set)
    }

    fn insert_raw(&mut self, field: Field, raw: &str) -> AppResult<()> {
        let value = if field == Field::LeaseValue {
            let number = parse_decimal(raw).ok_or_else(|| {
                AppError::BadRequest(format!("Valor de locação inválido: '{}'", raw))
            })?;
            FieldValue::Number(number)
        } else if field.is_date() {
            let date = parse_date(raw).ok_or_else(|| {
                AppError::BadRequest(format!("Data inválida para '{}': '{}'", field.key(), raw))
            })?;
            FieldValue::Text(date.format("%Y-%m-%d").to_string())
        } else {
            FieldValue::Text(raw.to_string())
        };
        self.values.insert(field, value);
        Ok(())
    }

    pub fn get(&self, field: Field) -> Option<&FieldValue> {
        self.values.get(&field)
    }

    pub fn text(&self, field: Field) -> Option<&str> {
        match self.values.get(&field) {
            Some(FieldValue::Text(s)) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn set_default(&mut self, field: Field, value: &str) {
        self.values
            .entry(field)
            .or_insert_with(|| FieldValue::Text(value.to_string()));
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Field, &FieldValue)> {
        self.values.iter().map(|(f, v)| (*f, v))
    }
}

/// Parses a decimal in either `1.234,56` or `1,234.56` notation. The last
/// separator present is the decimal point; the other one groups thousands.
pub fn parse_decimal(raw: &str) -> Option<f64> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    let normalized = match (raw.rfind(','), raw.rfind('.')) {
        (Some(comma), Some(dot)) if comma < dot => raw.replace(',', ""),
        (Some(_), _) => raw.replace('.', "").replace(',', "."),
        (None, _) => raw.to_string(),
    };
    normalized.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Parses a calendar date, ignoring any time of day.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    let date_part = raw.split(|c| c == ' ' || c == 'T').next().unwrap_or(raw);
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(date_part, "%d/%m/%Y"))
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn object(value: serde_json::Value) -> serde_json::Map<String, serde_json::Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn resolves_english_and_legacy_keys() {
        assert_eq!(Field::from_key("patrimonio"), Some(Field::Patrimony));
        assert_eq!(Field::from_key("PATRIMONY"), Some(Field::Patrimony));
        assert_eq!(Field::from_key(" serie "), Some(Field::SerialNumber));
        assert_eq!(Field::from_key("valor_locacao"), Some(Field::LeaseValue));
        assert_eq!(Field::from_key("colour"), None);
    }

    #[test]
    fn update_scope_drops_patrimony_and_unknown_keys() {
        let set = FieldSet::from_json(
            &object(json!({"patrimony": "X", "cor": "azul", "status": "Baixado"})),
            Scope::Update,
        )
        .unwrap();
        assert_eq!(set.len(), 1);
        assert_eq!(set.text(Field::Status), Some("Baixado"));
    }

    #[test]
    fn unknown_only_body_is_empty() {
        let set = FieldSet::from_json(&object(json!({"unknown_field": 1})), Scope::Update).unwrap();
        assert!(set.is_empty());
    }

    #[test]
    fn blank_strings_clear_on_update_but_drop_on_create() {
        let body = object(json!({"location": "  ", "patrimony": "P1"}));
        let update = FieldSet::from_json(&body, Scope::Update).unwrap();
        assert_eq!(update.get(Field::Location), Some(&FieldValue::Null));

        let create = FieldSet::from_json(&body, Scope::Create).unwrap();
        assert_eq!(create.get(Field::Location), None);
        assert_eq!(create.text(Field::Patrimony), Some("P1"));
    }

    #[test]
    fn lease_value_accepts_numbers_and_comma_decimals() {
        let set = FieldSet::from_json(&object(json!({"lease_value": 120.5})), Scope::Create).unwrap();
        assert_eq!(set.get(Field::LeaseValue), Some(&FieldValue::Number(120.5)));

        let set = FieldSet::from_pairs([(Field::LeaseValue, "99,90")], Scope::Create).unwrap();
        assert_eq!(set.get(Field::LeaseValue), Some(&FieldValue::Number(99.9)));

        let err = FieldSet::from_pairs([(Field::LeaseValue, "caro")], Scope::Create).unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[test]
    fn update_scope_is_limited_to_lifecycle_fields() {
        let set = FieldSet::from_json(
            &object(json!({
                "tipo": "Monitor",
                "centro_custo": "CC99",
                "numero_serie": "SN9",
                "local_atual": "Almoxarifado",
                "data_devolucao": "01/02/2024",
            })),
            Scope::Update,
        )
        .unwrap();
        assert_eq!(set.len(), 2);
        assert_eq!(set.text(Field::Location), Some("Almoxarifado"));
        assert_eq!(set.text(Field::ReturnedDate), Some("2024-02-01"));
    }

    #[test]
    fn decimals_in_brazilian_and_us_notation() {
        assert_eq!(parse_decimal("1.234,56"), Some(1234.56));
        assert_eq!(parse_decimal("1.234.567,8"), Some(1234567.8));
        assert_eq!(parse_decimal("1,234.56"), Some(1234.56));
        assert_eq!(parse_decimal("99,90"), Some(99.9));
        assert_eq!(parse_decimal("150"), Some(150.0));
        assert_eq!(parse_decimal("12.5"), Some(12.5));
        assert_eq!(parse_decimal(""), None);
        assert_eq!(parse_decimal("abc"), None);
    }

    #[test]
    fn dates_are_normalized_to_iso() {
        let set = FieldSet::from_pairs(
            [(Field::ReceivedDate, "15/03/2024"), (Field::ReturnedDate, "2024-05-01 10:30:00")],
            Scope::Create,
        )
        .unwrap();
        assert_eq!(set.text(Field::ReceivedDate), Some("2024-03-15"));
        assert_eq!(set.text(Field::ReturnedDate), Some("2024-05-01"));
    }
}
