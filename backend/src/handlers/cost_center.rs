use actix_web::{web, HttpResponse};
use chrono::Utc;
use serde::Deserialize;

use super::equipment::{csv_download, QueryPairs};
use crate::database::Database;
use crate::error::AppError;
use crate::models::Field;
use crate::query::{Predicate, SearchRequest};

const DEFAULT_LIMIT: u32 = 10;

#[derive(Deserialize)]
pub struct LimitQuery {
    pub limite: Option<u32>,
}

impl LimitQuery {
    fn limit(&self) -> u32 {
        self.limite.unwrap_or(DEFAULT_LIMIT)
    }
}

/// Advanced-search request pinned to one cost center.
fn scoped_request(cost_center: &str, query: &[(String, String)]) -> SearchRequest {
    let mut request = SearchRequest::from_pairs(query);
    request
        .filter
        .push(Predicate::Eq(Field::CostCenter, cost_center.to_string()));
    request
}

pub async fn list_cost_centers(db: web::Data<Database>) -> Result<HttpResponse, AppError> {
    let centers = db.cost_centers().await?;
    Ok(HttpResponse::Ok().json(centers))
}

pub async fn cost_center_summary(
    db: web::Data<Database>,
    id: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let summary = db.cost_center_summary(&id).await?;
    Ok(HttpResponse::Ok().json(summary))
}

pub async fn cost_center_equipment(
    db: web::Data<Database>,
    id: web::Path<String>,
    query: QueryPairs,
) -> Result<HttpResponse, AppError> {
    let request = scoped_request(&id, &query);
    let page = db.search_request(&request).await?;
    Ok(HttpResponse::Ok().json(page))
}

pub async fn most_valuable(
    db: web::Data<Database>,
    id: web::Path<String>,
    query: web::Query<LimitQuery>,
) -> Result<HttpResponse, AppError> {
    let rows = db.most_valuable(&id, query.limit()).await?;
    Ok(HttpResponse::Ok().json(rows))
}

pub async fn most_recent(
    db: web::Data<Database>,
    id: web::Path<String>,
    query: web::Query<LimitQuery>,
) -> Result<HttpResponse, AppError> {
    let rows = db.most_recent(&id, query.limit()).await?;
    Ok(HttpResponse::Ok().json(rows))
}

pub async fn cost_center_report(
    db: web::Data<Database>,
    id: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let report = db.cost_center_report(&id, Utc::now().date_naive()).await?;
    Ok(HttpResponse::Ok().json(report))
}

pub async fn export_cost_center(
    db: web::Data<Database>,
    id: web::Path<String>,
    query: QueryPairs,
) -> Result<HttpResponse, AppError> {
    let request = scoped_request(&id, &query);
    csv_download(&db, &request.filter, request.sort, Some(&id)).await
}

pub async fn dashboard(db: web::Data<Database>) -> Result<HttpResponse, AppError> {
    let dashboard = db.dashboard().await?;
    Ok(HttpResponse::Ok().json(dashboard))
}
