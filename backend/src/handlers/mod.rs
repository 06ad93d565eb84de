pub mod cost_center;
pub mod equipment;
pub mod pages;

use actix_web::{web, HttpResponse};

use crate::config::Config;
use crate::database::Database;
use crate::error::AppError;

/// Registers the JSON API under `/api` and the HTML pages at the root.
/// Fixed `/equipment/...` paths come before `/equipment/{patrimony}`.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .route("/health", web::get().to(health_check))
            .route("/equipment", web::get().to(equipment::list_equipment))
            .route("/equipment", web::post().to(equipment::create_equipment))
            .route("/equipment/search", web::get().to(equipment::search_equipment))
            .route("/equipment/statistics", web::get().to(equipment::statistics))
            .route("/equipment/export", web::get().to(equipment::export_equipment))
            .route("/equipment/batch", web::post().to(equipment::batch_equipment))
            .route("/equipment/filters/{field}", web::get().to(equipment::filter_values))
            .route("/equipment/{patrimony}", web::get().to(equipment::get_equipment))
            .route("/equipment/{patrimony}", web::patch().to(equipment::update_equipment))
            .route("/equipment/{patrimony}", web::delete().to(equipment::delete_equipment))
            .route("/cost-centers", web::get().to(cost_center::list_cost_centers))
            .route("/cost-centers/{id}", web::get().to(cost_center::cost_center_summary))
            .route("/cost-centers/{id}/equipment", web::get().to(cost_center::cost_center_equipment))
            .route(
                "/cost-centers/{id}/equipment/export",
                web::get().to(cost_center::export_cost_center),
            )
            .route("/cost-centers/{id}/valuable", web::get().to(cost_center::most_valuable))
            .route("/cost-centers/{id}/recent", web::get().to(cost_center::most_recent))
            .route("/cost-centers/{id}/report", web::get().to(cost_center::cost_center_report))
            .route("/dashboard/cost-centers", web::get().to(cost_center::dashboard)),
    );

    for (path, file) in pages::PAGES {
        cfg.route(
            path,
            web::get().to(move |config: web::Data<Config>| pages::serve_page(config, file)),
        );
    }
}

/// Liveness check: row count and last update.
pub async fn health_check(db: web::Data<Database>) -> Result<HttpResponse, AppError> {
    let health = db.health().await?;
    Ok(HttpResponse::Ok().json(health))
}
