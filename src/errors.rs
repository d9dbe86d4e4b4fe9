use actix_web::http::StatusCode;
use actix_web::HttpResponse;
use thiserror::Error;

use crate::domain::errors::FormError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{message}")]
    Validation {
        message: String,
        field: Option<&'static str>,
    },

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Unreachable(String),

    #[error("{0}")]
    Storage(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<FormError> for AppError {
    fn from(e: FormError) -> Self {
        let message = e.to_string();
        match e {
            FormError::RequiredFieldMissing(field) => AppError::Validation {
                message,
                field: Some(field.name()),
            },
            FormError::NoProducts
            | FormError::IncompleteProduct(_)
            | FormError::InvalidValue(_)
            | FormError::NoAttachments => AppError::Validation {
                message,
                field: None,
            },
            FormError::NotFound(_) => AppError::NotFound(message),
            FormError::Encoding(_) => AppError::BadRequest(message),
            FormError::Unreachable(_) => AppError::Unreachable(message),
            FormError::Storage(_) => AppError::Storage(message),
            FormError::Internal(msg) => AppError::Internal(msg),
        }
    }
}

impl actix_web::ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Unreachable(_) => StatusCode::BAD_GATEWAY,
            AppError::Storage(_) => StatusCode::INSUFFICIENT_STORAGE,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let body = match self {
            AppError::Validation {
                field: Some(field), ..
            } => serde_json::json!({ "error": self.to_string(), "field": field }),
            AppError::Internal(msg) => {
                log::error!("internal error: {}", msg);
                serde_json::json!({ "error": "Internal server error" })
            }
            _ => serde_json::json!({ "error": self.to_string() }),
        };
        HttpResponse::build(self.status_code()).json(body)
    }
}
