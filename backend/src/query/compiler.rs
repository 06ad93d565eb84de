use sqlx::sqlite::SqliteArguments;
use sqlx::Arguments;

use super::{Filter, Pagination, Predicate, Sort};
use crate::models::{Field, FieldSet, FieldValue, EQUIPMENT_COLUMNS};

pub const TABLE: &str = "equipment";

#[derive(Clone, Debug, PartialEq)]
pub enum SqlValue {
    Text(String),
    Real(f64),
    Int(i64),
    Null,
}

/// SQL text plus its positional parameters.
#[derive(Clone, Debug, PartialEq)]
pub struct CompiledQuery {
    pub sql: String,
    pub params: Vec<SqlValue>,
}

impl CompiledQuery {
    pub fn arguments(&self) -> SqliteArguments<'_> {
        let mut args = SqliteArguments::default();
        for param in &self.params {
            match param {
                SqlValue::Text(s) => args.add(s.clone()),
                SqlValue::Real(v) => args.add(*v),
                SqlValue::Int(v) => args.add(*v),
                SqlValue::Null => args.add(Option::<String>::None),
            }
        }
        args
    }
}

fn escape_like(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len() + 2);
    out.push('%');
    for c in raw.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('%');
    out
}

fn compile_predicate(predicate: &Predicate, params: &mut Vec<SqlValue>) -> String {
    match predicate {
        Predicate::Eq(field, value) => {
            params.push(SqlValue::Text(value.clone()));
            format!("{} = ?", field.column())
        }
        Predicate::In(field, values) => {
            params.extend(values.iter().cloned().map(SqlValue::Text));
            let marks = vec!["?"; values.len()].join(", ");
            format!("{} IN ({})", field.column(), marks)
        }
        Predicate::Contains(field, value) => {
            params.push(SqlValue::Text(escape_like(value)));
            format!("{} LIKE ? ESCAPE '\\'", field.column())
        }
        Predicate::AnyContains(fields, value) => {
            let pattern = escape_like(value);
            let parts: Vec<String> = fields
                .iter()
                .map(|field| {
                    params.push(SqlValue::Text(pattern.clone()));
                    format!("{} LIKE ? ESCAPE '\\'", field.column())
                })
                .collect();
            format!("({})", parts.join(" OR "))
        }
        Predicate::DateFrom(field, date) => {
            params.push(SqlValue::Text(date.format("%Y-%m-%d").to_string()));
            format!("date({}) >= date(?)", field.column())
        }
        Predicate::DateTo(field, date) => {
            params.push(SqlValue::Text(date.format("%Y-%m-%d").to_string()));
            format!("date({}) <= date(?)", field.column())
        }
        Predicate::NumberMin(field, v) => {
            params.push(SqlValue::Real(*v));
            format!("{} >= ?", field.column())
        }
        Predicate::NumberMax(field, v) => {
            params.push(SqlValue::Real(*v));
            format!("{} <= ?", field.column())
        }
        Predicate::Present(field) if *field == Field::LeaseValue => {
            format!("{} IS NOT NULL", field.column())
        }
        Predicate::Present(field) => {
            format!("({col} IS NOT NULL AND {col} <> '')", col = field.column())
        }
        Predicate::Blank(field) => {
            format!("({col} IS NULL OR {col} = '')", col = field.column())
        }
    }
}

/// Appends ` WHERE ...` for a non-empty filter.
pub fn push_where(filter: &Filter, sql: &mut String, params: &mut Vec<SqlValue>) {
    if filter.is_empty() {
        return;
    }
    let clauses: Vec<String> = filter
        .predicates()
        .iter()
        .map(|p| compile_predicate(p, params))
        .collect();
    sql.push_str(" WHERE ");
    sql.push_str(&clauses.join(" AND "));
}

/// Appends the ORDER BY clause; `id` breaks ties.
pub fn push_order(sort: &Sort, sql: &mut String) {
    sql.push_str(&format!(" ORDER BY {} {}", sort.column.sql(), sort.dir.sql()));
    if sort.column != super::SortColumn::Id {
        sql.push_str(", id ASC");
    }
}

pub fn select(filter: &Filter, sort: &Sort, pagination: &Pagination) -> CompiledQuery {
    let mut sql = format!("SELECT {} FROM {}", EQUIPMENT_COLUMNS, TABLE);
    let mut params = Vec::new();
    push_where(filter, &mut sql, &mut params);
    push_order(sort, &mut sql);
    if !pagination.is_unbounded() {
        sql.push_str(" LIMIT ? OFFSET ?");
        params.push(SqlValue::Int(i64::from(pagination.page_size)));
        params.push(SqlValue::Int(i64::try_from(pagination.offset()).unwrap_or(i64::MAX)));
    }
    CompiledQuery { sql, params }
}

pub fn count(filter: &Filter) -> CompiledQuery {
    let mut sql = format!("SELECT COUNT(*) FROM {}", TABLE);
    let mut params = Vec::new();
    push_where(filter, &mut sql, &mut params);
    CompiledQuery { sql, params }
}

/// `SELECT <expr> AS valor, COUNT(*) AS quantidade ... GROUP BY valor`, blank
/// values grouped under a single label.
pub fn group_count(filter: &Filter, field: Field) -> CompiledQuery {
    let mut sql = format!(
        "SELECT COALESCE(NULLIF({}, ''), 'Não informado') AS valor, COUNT(*) AS quantidade FROM {}",
        field.column(),
        TABLE
    );
    let mut params = Vec::new();
    push_where(filter, &mut sql, &mut params);
    sql.push_str(" GROUP BY valor ORDER BY quantidade DESC, valor ASC");
    CompiledQuery { sql, params }
}

fn value_param(value: &FieldValue) -> SqlValue {
    match value {
        FieldValue::Text(s) => SqlValue::Text(s.clone()),
        FieldValue::Number(v) => SqlValue::Real(*v),
        FieldValue::Null => SqlValue::Null,
    }
}

pub fn insert(fields: &FieldSet, now: &str) -> CompiledQuery {
    let mut columns: Vec<&str> = Vec::with_capacity(fields.len() + 2);
    let mut params = Vec::with_capacity(fields.len() + 2);
    for (field, value) in fields.iter() {
        columns.push(field.column());
        params.push(value_param(value));
    }
    columns.extend(["created_at", "updated_at"]);
    params.push(SqlValue::Text(now.to_string()));
    params.push(SqlValue::Text(now.to_string()));

    let marks = vec!["?"; columns.len()].join(", ");
    CompiledQuery {
        sql: format!("INSERT INTO {} ({}) VALUES ({})", TABLE, columns.join(", "), marks),
        params,
    }
}

pub fn update(patrimony: &str, fields: &FieldSet, now: &str) -> CompiledQuery {
    let mut assignments: Vec<String> = Vec::with_capacity(fields.len() + 1);
    let mut params = Vec::with_capacity(fields.len() + 2);
    for (field, value) in fields.iter() {
        assignments.push(format!("{} = ?", field.column()));
        params.push(value_param(value));
    }
    assignments.push("updated_at = ?".to_string());
    params.push(SqlValue::Text(now.to_string()));
    params.push(SqlValue::Text(patrimony.to_string()));
    CompiledQuery {
        sql: format!("UPDATE {} SET {} WHERE patrimony = ?", TABLE, assignments.join(", ")),
        params,
    }
}

pub fn delete(patrimony: &str) -> CompiledQuery {
    CompiledQuery {
        sql: format!("DELETE FROM {} WHERE patrimony = ?", TABLE),
        params: vec![SqlValue::Text(patrimony.to_string())],
    }
}
