use actix_cors::Cors;
use actix_web::{http::header, middleware::Logger, web, App, HttpServer};
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

use equipment_inventory::{database, handlers, Config};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    let config = Config::from_env();

    let filter = EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .compact()
        .init();

    info!(
        version = env!("CARGO_PKG_VERSION"),
        database_url = %config.database_url,
        static_dir = %config.static_dir.display(),
        "equipment inventory starting"
    );

    if let Some(dir) = config.database_dir() {
        if let Err(e) = tokio::fs::create_dir_all(&dir).await {
            error!(dir = %dir.display(), error = %e, "failed to create database directory");
            return Err(e);
        }
    }

    let db = match database::connect(&config.database_url, config.db_max_connections).await {
        Ok(db) => db,
        Err(e) => {
            error!(error = %e, "failed to initialize database");
            return Err(std::io::Error::new(std::io::ErrorKind::Other, e));
        }
    };

    let bind_addr = config.bind_addr();
    info!(host = %bind_addr.0, port = bind_addr.1, "server listening");

    let db = web::Data::new(db);
    let config = web::Data::new(config);

    HttpServer::new(move || {
        let cors = Cors::default()
            .allowed_origin_fn(|origin, _req_head| {
                origin.as_bytes().starts_with(b"http://localhost")
                    || origin.as_bytes().starts_with(b"http://127.0.0.1")
            })
            .allowed_methods(vec!["GET", "POST", "PATCH", "DELETE", "OPTIONS"])
            .allowed_headers(vec![header::CONTENT_TYPE, header::ACCEPT])
            .max_age(3600);

        App::new()
            .wrap(Logger::default())
            .wrap(cors)
            .app_data(db.clone())
            .app_data(config.clone())
            .configure(handlers::configure)
    })
    .bind(bind_addr)?
    .run()
    .await
}
