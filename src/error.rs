use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tracing::{error, warn};

use crate::{cache::CacheError, response::JsonResponse};

/// Failures raised by the repository layer.
#[derive(Debug, thiserror::Error)]
pub enum RepoError {
    #[error("record not found")]
    NotFound,

    #[error(transparent)]
    Database(#[from] sqlx::Error),

    #[error(transparent)]
    Cache(#[from] CacheError),
}

/// Error type returned by HTTP handlers.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error(transparent)]
    Repo(#[from] RepoError),

    #[error("{0}")]
    Internal(String),
}

pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            // Persistence failures keep the raw message and a 400 for client compatibility.
            AppError::Repo(_) => StatusCode::BAD_REQUEST,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            AppError::Validation(msg) | AppError::Unauthorized(msg) => {
                warn!(%status, error = %msg, "request rejected");
                msg.clone()
            }
            AppError::Repo(e) => {
                error!(error = %e, "repository error");
                e.to_string()
            }
            AppError::Internal(msg) => {
                error!(error = %msg, "internal error");
                "An internal error occurred".to_string()
            }
        };
        JsonResponse::error(status, message).into_response()
    }
}
