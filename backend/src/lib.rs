pub mod batch;
pub mod config;
pub mod database;
pub mod error;
pub mod export;
pub mod handlers;
pub mod models;
pub mod query;

pub use config::Config;
pub use database::Database;
pub use error::{AppError, AppResult};
