use serde::Serialize;
use tracing::instrument;

use super::Database;
use crate::models::{Equipment, Field, EQUIPMENT_COLUMNS};
use crate::query::compiler::{self, TABLE};
use crate::query::{Filter, Pagination, Predicate, SearchRequest, Sort};

/// One page of a search plus the totals needed to navigate it.
#[derive(Serialize, Debug)]
pub struct SearchPage {
    pub equipamentos: Vec<Equipment>,
    pub total: i64,
    pub pagina: u32,
    pub por_pagina: u32,
    pub total_paginas: i64,
}

impl Database {
    /// Runs the page query and its count query. With an unbounded page the
    /// row count doubles as the total.
    #[instrument(skip(self, filter))]
    pub async fn search(
        &self,
        filter: &Filter,
        pagination: Pagination,
        sort: Sort,
    ) -> Result<SearchPage, sqlx::Error> {
        let select = compiler::select(filter, &sort, &pagination);
        let rows: Vec<Equipment> = sqlx::query_as_with(&select.sql, select.arguments())
            .fetch_all(self.get_pool())
            .await?;

        let total = if pagination.is_unbounded() {
            rows.len() as i64
        } else {
            let count = compiler::count(filter);
            let (total,): (i64,) = sqlx::query_as_with(&count.sql, count.arguments())
                .fetch_one(self.get_pool())
                .await?;
            total
        };

        tracing::debug!(returned = rows.len(), total, "search finished");
        Ok(SearchPage {
            equipamentos: rows,
            total,
            pagina: pagination.page,
            por_pagina: pagination.page_size,
            total_paginas: pagination.total_pages(total),
        })
    }

    pub async fn search_request(&self, request: &SearchRequest) -> Result<SearchPage, sqlx::Error> {
        self.search(&request.filter, request.pagination, request.sort)
            .await
    }

    pub async fn get(&self, patrimony: &str) -> Result<Option<Equipment>, sqlx::Error> {
        let sql = format!("SELECT {} FROM {} WHERE patrimony = ?", EQUIPMENT_COLUMNS, TABLE);
        sqlx::query_as(&sql)
            .bind(patrimony)
            .fetch_optional(self.get_pool())
            .await
    }

    /// Distinct non-blank values of a dropdown field; any other field yields
    /// an empty list.
    pub async fn distinct_values(&self, field: Field) -> Result<Vec<String>, sqlx::Error> {
        if !Field::DROPDOWN.contains(&field) {
            return Ok(Vec::new());
        }
        let mut sql = format!("SELECT DISTINCT {col} FROM {}", TABLE, col = field.column());
        let mut params = Vec::new();
        compiler::push_where(&Filter::new().and(Predicate::Present(field)), &mut sql, &mut params);
        sql.push_str(&format!(" ORDER BY {}", field.column()));

        let rows: Vec<(String,)> = sqlx::query_as(&sql).fetch_all(self.get_pool()).await?;
        Ok(rows.into_iter().map(|(v,)| v).collect())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::database::{connect_in_memory, Database};
    use crate::models::{Field, FieldSet, Scope};
    use crate::query::{Filter, Pagination, Predicate, SearchRequest, Sort, SortColumn, SortDir};

    async fn seeded() -> Database {
        let db = connect_in_memory().await.unwrap();
        let rows = [
            json!({"patrimony": "PAT003", "type": "Notebook", "user": "Carla", "status": "Em uso", "lease_value": 300.0, "received_date": "2024-03-10", "cost_center": "CC10"}),
            json!({"patrimony": "PAT001", "type": "Notebook", "user": "Ana", "status": "Manutenção", "lease_value": 150.0, "received_date": "2024-01-05", "cost_center": "CC10"}),
            json!({"patrimony": "PAT002", "type": "Monitor", "user": "Bruno", "status": "Em uso", "lease_value": 80.0, "received_date": "2023-11-20", "cost_center": "CC20"}),
            json!({"patrimony": "PAT005", "type": "Desktop", "user": "Ana", "status": "Baixado", "host": "ws-ana"}),
            json!({"patrimony": "PAT004", "type": "Monitor", "user": "Davi", "status": "Disponível", "lease_value": 80.0, "received_date": "2024-02-01 09:15:00"}),
        ];
        for row in rows {
            let fields = FieldSet::from_json(row.as_object().unwrap(), Scope::Create).unwrap();
            db.create(fields).await.unwrap();
        }
        db
    }

    fn patrimonies(page: &super::SearchPage) -> Vec<&str> {
        page.equipamentos.iter().map(|e| e.patrimony.as_str()).collect()
    }

    #[actix_web::test]
    async fn empty_filter_returns_everything_sorted_by_patrimony() {
        let db = seeded().await;
        let page = db.search_request(&SearchRequest::default()).await.unwrap();
        assert_eq!(page.total, 5);
        assert_eq!(page.pagina, 1);
        assert_eq!(page.total_paginas, 1);
        assert_eq!(patrimonies(&page), ["PAT001", "PAT002", "PAT003", "PAT004", "PAT005"]);
    }

    #[actix_web::test]
    async fn page_past_the_end_is_empty() {
        let db = seeded().await;
        let page = db
            .search(&Filter::new(), Pagination::new(u32::MAX, u32::MAX), Sort::default())
            .await
            .unwrap();
        assert!(page.equipamentos.is_empty());
        assert_eq!(page.total, 5);
        assert_eq!(page.pagina, u32::MAX);
    }

    #[actix_web::test]
    async fn pages_reconstruct_the_full_result() {
        let db = seeded().await;
        let sort = Sort {
            column: SortColumn::Field(Field::LeaseValue),
            dir: SortDir::Desc,
        };
        let all = db.search(&Filter::new(), Pagination::all(), sort).await.unwrap();

        let mut collected = Vec::new();
        for page in 1..=3 {
            let window = db
                .search(&Filter::new(), Pagination::new(page, 2), sort)
                .await
                .unwrap();
            assert_eq!(window.total, 5);
            assert_eq!(window.total_paginas, 3);
            assert!(window.equipamentos.len() <= 2);
            collected.extend(window.equipamentos);
        }
        assert_eq!(collected, all.equipamentos);
    }

    #[actix_web::test]
    async fn ties_are_broken_by_id() {
        let db = seeded().await;
        let sort = Sort {
            column: SortColumn::Field(Field::Type),
            dir: SortDir::Asc,
        };
        let page = db.search(&Filter::new(), Pagination::all(), sort).await.unwrap();
        // PAT002 was inserted before PAT004, PAT003 before PAT001.
        assert_eq!(patrimonies(&page), ["PAT005", "PAT002", "PAT004", "PAT003", "PAT001"]);
    }

    #[actix_web::test]
    async fn combined_filters() {
        let db = seeded().await;
        let pairs: Vec<(String, String)> = [
            ("tipo", "note"),
            ("valor_min", "100"),
            ("data_inicio", "2024-01-01"),
            ("data_fim", "2024-01-31"),
        ]
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
        let page = db
            .search_request(&SearchRequest::from_pairs(&pairs))
            .await
            .unwrap();
        assert_eq!(patrimonies(&page), ["PAT001"]);
    }

    #[actix_web::test]
    async fn date_range_ignores_time_of_day() {
        let db = seeded().await;
        let filter = Filter::new()
            .and(Predicate::DateFrom(Field::ReceivedDate, chrono::NaiveDate::from_ymd_opt(2024, 2, 1).unwrap()))
            .and(Predicate::DateTo(Field::ReceivedDate, chrono::NaiveDate::from_ymd_opt(2024, 2, 1).unwrap()));
        let page = db.search(&filter, Pagination::all(), Sort::default()).await.unwrap();
        assert_eq!(patrimonies(&page), ["PAT004"]);
    }

    #[actix_web::test]
    async fn free_text_matches_any_column() {
        let db = seeded().await;
        let filter = Filter::new().and(Predicate::AnyContains(Field::FREE_TEXT.to_vec(), "ws-".into()));
        let page = db.search(&filter, Pagination::default(), Sort::default()).await.unwrap();
        assert_eq!(patrimonies(&page), ["PAT005"]);
    }

    #[actix_web::test]
    async fn in_list_filter() {
        let db = seeded().await;
        let filter = Filter::new().and(Predicate::In(
            Field::Status,
            vec!["Baixado".into(), "Disponível".into()],
        ));
        let page = db.search(&filter, Pagination::default(), Sort::default()).await.unwrap();
        assert_eq!(patrimonies(&page), ["PAT004", "PAT005"]);
    }

    #[actix_web::test]
    async fn distinct_values_for_dropdowns_only() {
        let db = seeded().await;
        assert_eq!(
            db.distinct_values(Field::Type).await.unwrap(),
            ["Desktop", "Monitor", "Notebook"]
        );
        assert_eq!(db.distinct_values(Field::CostCenter).await.unwrap(), ["CC10", "CC20"]);
        assert!(db.distinct_values(Field::Note).await.unwrap().is_empty());
    }

    #[actix_web::test]
    async fn get_by_patrimony() {
        let db = seeded().await;
        let found = db.get("PAT002").await.unwrap().unwrap();
        assert_eq!(found.kind.as_deref(), Some("Monitor"));
        assert!(db.get("NOPE").await.unwrap().is_none());
    }
}
