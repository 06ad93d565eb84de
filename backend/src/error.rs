use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use thiserror::Error;

/// Errors surfaced by the store engines and the HTTP handlers.
#[derive(Debug, Error)]
pub enum AppError {
    /// Missing or invalid input (empty body, bad file, invalid action...).
    #[error("{0}")]
    BadRequest(String),

    /// An update whose body had no updatable field left after validation.
    #[error("Nenhum campo válido para atualizar")]
    NoValidFields,

    #[error("{0}")]
    NotFound(String),

    /// Uniqueness violation on `patrimony` or `serial_number`.
    #[error("{0}")]
    Conflict(String),

    #[error("Erro no banco de dados: {0}")]
    Infrastructure(sqlx::Error),

    /// Failure outside the store, e.g. while encoding an export.
    #[error("{0}")]
    Internal(String),
}

pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::BadRequest(_) => "BadRequest",
            AppError::NoValidFields => "NoValidFields",
            AppError::NotFound(_) => "NotFound",
            AppError::Conflict(_) => "Conflict",
            AppError::Infrastructure(_) | AppError::Internal(_) => "InfrastructureError",
        }
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            if db_err.is_unique_violation() {
                let message = db_err.message();
                let column = if message.contains("serial_number") {
                    "Número de série"
                } else {
                    "Patrimônio"
                };
                return AppError::Conflict(format!("{} já cadastrado", column));
            }
        }
        AppError::Infrastructure(err)
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) | AppError::NoValidFields => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Infrastructure(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        if self.status_code().is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        HttpResponse::build(self.status_code()).json(serde_json::json!({
            "erro": self.to_string(),
            "codigo": self.kind(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_map_to_status_codes() {
        assert_eq!(AppError::BadRequest("x".into()).status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::NoValidFields.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::NotFound("x".into()).status_code(), StatusCode::NOT_FOUND);
        assert_eq!(AppError::Conflict("x".into()).status_code(), StatusCode::CONFLICT);
        assert_eq!(
            AppError::Infrastructure(sqlx::Error::RowNotFound).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn no_valid_fields_is_distinct_from_not_found() {
        assert_eq!(AppError::NoValidFields.kind(), "NoValidFields");
        assert_eq!(AppError::NotFound("x".into()).kind(), "NotFound");
    }
}
