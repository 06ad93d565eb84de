//! Filter requests and their translation into parameterized SQL.
//!
//! Handlers parse raw query-string pairs into a [`SearchRequest`]; the
//! [`compiler`] turns its [`Filter`], [`Sort`] and [`Pagination`] into
//! [`compiler::CompiledQuery`] values whose user-supplied parts are always
//! bound parameters.

pub mod compiler;

use chrono::NaiveDate;

use crate::models::{parse_date, parse_decimal, Field};

pub const DEFAULT_PAGE_SIZE: u32 = 50;

/// One conjunct of a filter.
#[derive(Clone, Debug, PartialEq)]
pub enum Predicate {
    Eq(Field, String),
    In(Field, Vec<String>),
    Contains(Field, String),
    /// OR-group of substring matches over several columns.
    AnyContains(Vec<Field>, String),
    DateFrom(Field, NaiveDate),
    DateTo(Field, NaiveDate),
    NumberMin(Field, f64),
    NumberMax(Field, f64),
    /// Column holds a non-null, non-empty value.
    Present(Field),
    /// Column is null or empty.
    Blank(Field),
}

/// Conjunction of predicates; empty means "every row".
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Filter {
    predicates: Vec<Predicate>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn and(mut self, predicate: Predicate) -> Self {
        self.predicates.push(predicate);
        self
    }

    pub fn push(&mut self, predicate: Predicate) {
        self.predicates.push(predicate);
    }

    pub fn predicates(&self) -> &[Predicate] {
        &self.predicates
    }

    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SortDir {
    Asc,
    Desc,
}

impl SortDir {
    /// Anything other than `desc` sorts ascending.
    pub fn parse(raw: &str) -> SortDir {
        if raw.trim().eq_ignore_ascii_case("desc") {
            SortDir::Desc
        } else {
            SortDir::Asc
        }
    }

    pub fn sql(self) -> &'static str {
        match self {
            SortDir::Asc => "ASC",
            SortDir::Desc => "DESC",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SortColumn {
    Id,
    Field(Field),
}

impl SortColumn {
    pub fn sql(self) -> &'static str {
        match self {
            SortColumn::Id => "id",
            SortColumn::Field(field) => field.column(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Sort {
    pub column: SortColumn,
    pub dir: SortDir,
}

impl Default for Sort {
    fn default() -> Self {
        Sort {
            column: SortColumn::Field(Field::Patrimony),
            dir: SortDir::Asc,
        }
    }
}

impl Sort {
    /// Validates the requested column against the sortable allow-list. An
    /// unknown column falls back to `patrimony` ascending.
    pub fn parse(column: Option<&str>, dir: Option<&str>) -> Sort {
        let Some(column) = column.map(str::trim).filter(|c| !c.is_empty()) else {
            return Sort {
                dir: dir.map(SortDir::parse).unwrap_or(SortDir::Asc),
                ..Sort::default()
            };
        };
        let column = if column.eq_ignore_ascii_case("id") {
            Some(SortColumn::Id)
        } else {
            Field::from_key(column)
                .filter(|f| !matches!(f, Field::Note | Field::RemoteAccessId))
                .map(SortColumn::Field)
        };
        match column {
            Some(column) => Sort {
                column,
                dir: dir.map(SortDir::parse).unwrap_or(SortDir::Asc),
            },
            None => Sort::default(),
        }
    }
}

/// 1-indexed page window; `page_size == 0` returns every row.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Pagination {
    pub page: u32,
    pub page_size: u32,
}

impl Default for Pagination {
    fn default() -> Self {
        Pagination {
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl Pagination {
    pub fn new(page: u32, page_size: u32) -> Self {
        Pagination {
            page: page.max(1),
            page_size,
        }
    }

    pub fn all() -> Self {
        Pagination { page: 1, page_size: 0 }
    }

    pub fn is_unbounded(&self) -> bool {
        self.page_size == 0
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.page.max(1) - 1) * u64::from(self.page_size)
    }

    pub fn total_pages(&self, total: i64) -> i64 {
        if self.page_size == 0 {
            return 1;
        }
        let size = i64::from(self.page_size);
        (total.max(0) + size - 1) / size
    }
}

/// Query-string keys accepted by the basic listing endpoint.
const BASIC_KEYS: [&str; 7] = ["tipo", "usuario", "patrimonio", "serie", "setor", "local", "status"];

#[derive(Clone, Debug, Default, PartialEq)]
pub struct SearchRequest {
    pub filter: Filter,
    pub sort: Sort,
    pub pagination: Pagination,
}

impl SearchRequest {
    /// Parses advanced-search query pairs. Unknown keys and unparseable
    /// bounds are ignored.
    pub fn from_pairs(pairs: &[(String, String)]) -> Self {
        let mut request = SearchRequest::default();
        let mut values: Vec<(Field, Vec<String>)> = Vec::new();
        let mut sort_by = None;
        let mut sort_dir = None;

        for (key, raw) in pairs {
            let raw = raw.trim();
            if raw.is_empty() {
                continue;
            }
            match key.trim().to_lowercase().as_str() {
                "q" => request
                    .filter
                    .push(Predicate::AnyContains(Field::FREE_TEXT.to_vec(), raw.to_string())),
                "valor_min" => {
                    if let Some(v) = parse_decimal(raw) {
                        request.filter.push(Predicate::NumberMin(Field::LeaseValue, v));
                    }
                }
                "valor_max" => {
                    if let Some(v) = parse_decimal(raw) {
                        request.filter.push(Predicate::NumberMax(Field::LeaseValue, v));
                    }
                }
                "data_inicio" => {
                    if let Some(d) = parse_date(raw) {
                        request.filter.push(Predicate::DateFrom(Field::ReceivedDate, d));
                    }
                }
                "data_fim" => {
                    if let Some(d) = parse_date(raw) {
                        request.filter.push(Predicate::DateTo(Field::ReceivedDate, d));
                    }
                }
                "pagina" | "page" => {
                    if let Ok(page) = raw.parse::<u32>() {
                        request.pagination.page = page.max(1);
                    }
                }
                "por_pagina" | "page_size" => {
                    if let Ok(size) = raw.parse::<u32>() {
                        request.pagination.page_size = size;
                    }
                }
                "ordenar_por" | "sort_by" => sort_by = Some(raw.to_string()),
                "ordenar_direcao" | "sort_dir" => sort_dir = Some(raw.to_string()),
                other => {
                    let Some(field) = Field::from_key(other).filter(|f| f.is_text()) else {
                        continue;
                    };
                    let parts = raw
                        .split(',')
                        .map(str::trim)
                        .filter(|s| !s.is_empty())
                        .map(str::to_string);
                    match values.iter_mut().find(|(f, _)| *f == field) {
                        Some((_, existing)) => existing.extend(parts),
                        None => values.push((field, parts.collect())),
                    }
                }
            }
        }

        for (field, mut list) in values {
            let predicate = match list.len() {
                0 => continue,
                1 => {
                    let value = list.remove(0);
                    if field == Field::Status {
                        Predicate::Eq(field, value)
                    } else {
                        Predicate::Contains(field, value)
                    }
                }
                _ => Predicate::In(field, list),
            };
            request.filter.push(predicate);
        }

        request.sort = Sort::parse(sort_by.as_deref(), sort_dir.as_deref());
        request
    }

    /// The basic listing: same semantics restricted to the seven legacy
    /// filter keys, every matching row, sorted by patrimony.
    pub fn basic(pairs: &[(String, String)]) -> Self {
        let restricted: Vec<(String, String)> = pairs
            .iter()
            .filter(|(k, _)| BASIC_KEYS.contains(&k.trim().to_lowercase().as_str()))
            .cloned()
            .collect();
        SearchRequest {
            pagination: Pagination::all(),
            sort: Sort::default(),
            ..SearchRequest::from_pairs(&restricted)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(items: &[(&str, &str)]) -> Vec<(String, String)> {
        items
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn empty_request_uses_defaults() {
        let request = SearchRequest::from_pairs(&[]);
        assert!(request.filter.is_empty());
        assert_eq!(request.sort, Sort::default());
        assert_eq!(request.pagination, Pagination::default());
    }

    #[test]
    fn single_values_are_partial_except_status() {
        let request = SearchRequest::from_pairs(&pairs(&[("tipo", "Note"), ("status", "Em uso")]));
        assert_eq!(
            request.filter.predicates(),
            &[
                Predicate::Contains(Field::Type, "Note".into()),
                Predicate::Eq(Field::Status, "Em uso".into()),
            ]
        );
    }

    #[test]
    fn comma_separated_and_repeated_values_become_in_lists() {
        let request = SearchRequest::from_pairs(&pairs(&[
            ("status", "Em uso, Manutenção"),
            ("setor", "TI"),
            ("setor", "RH"),
        ]));
        assert_eq!(
            request.filter.predicates(),
            &[
                Predicate::In(Field::Status, vec!["Em uso".into(), "Manutenção".into()]),
                Predicate::In(Field::Sector, vec!["TI".into(), "RH".into()]),
            ]
        );
    }

    #[test]
    fn unknown_keys_and_bad_bounds_are_ignored() {
        let request = SearchRequest::from_pairs(&pairs(&[
            ("cor", "azul"),
            ("valor_min", "barato"),
            ("data_inicio", "ontem"),
            ("pagina", "x"),
        ]));
        assert!(request.filter.is_empty());
        assert_eq!(request.pagination.page, 1);
    }

    #[test]
    fn ranges_and_free_text_are_parsed() {
        let request = SearchRequest::from_pairs(&pairs(&[
            ("q", "dell"),
            ("valor_min", "100"),
            ("valor_max", "250,5"),
            ("data_inicio", "2024-01-01"),
            ("data_fim", "2024-12-31 23:59:59"),
        ]));
        let predicates = request.filter.predicates();
        assert_eq!(predicates.len(), 5);
        assert_eq!(predicates[1], Predicate::NumberMin(Field::LeaseValue, 100.0));
        assert_eq!(predicates[2], Predicate::NumberMax(Field::LeaseValue, 250.5));
        assert_eq!(
            predicates[4],
            Predicate::DateTo(Field::ReceivedDate, NaiveDate::from_ymd_opt(2024, 12, 31).unwrap())
        );
    }

    #[test]
    fn sort_falls_back_to_patrimony_ascending() {
        assert_eq!(Sort::parse(Some("drop table"), Some("desc")), Sort::default());
        assert_eq!(Sort::parse(Some("note"), Some("desc")), Sort::default());
        assert_eq!(
            Sort::parse(Some("valor_locacao"), Some("DESC")),
            Sort {
                column: SortColumn::Field(Field::LeaseValue),
                dir: SortDir::Desc
            }
        );
        assert_eq!(Sort::parse(Some("id"), Some("sideways")).dir, SortDir::Asc);
    }

    #[test]
    fn pagination_math() {
        let page = Pagination::new(3, 10);
        assert_eq!(page.offset(), 20);
        assert_eq!(page.total_pages(21), 3);
        assert_eq!(page.total_pages(0), 0);
        assert_eq!(Pagination::new(0, 10).page, 1);
        assert_eq!(Pagination::all().total_pages(42), 1);
    }

    #[test]
    fn basic_search_ignores_advanced_keys() {
        let request = SearchRequest::basic(&pairs(&[
            ("usuario", "ana"),
            ("q", "dell"),
            ("pagina", "4"),
        ]));
        assert_eq!(
            request.filter.predicates(),
            &[Predicate::Contains(Field::User, "ana".into())]
        );
        assert!(request.pagination.is_unbounded());
    }
}
