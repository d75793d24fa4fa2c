use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Envelope shared by every JSON response of the API.
#[derive(Debug, Serialize)]
pub struct JsonResponse<T: Serialize> {
    pub code: u16,
    pub status: &'static str,
    pub message: String,
    pub data: Option<T>,
}

impl<T: Serialize> JsonResponse<T> {
    pub fn new(status: StatusCode, message: impl Into<String>, data: Option<T>) -> Self {
        Self {
            code: status.as_u16(),
            status: status.canonical_reason().unwrap_or(""),
            message: message.into(),
            data,
        }
    }

    pub fn ok(data: T) -> Self {
        Self::new(StatusCode::OK, "success", Some(data))
    }
}

impl JsonResponse<()> {
    pub fn created(message: impl Into<String>) -> Self {
        Self::new(StatusCode::CREATED, message, None)
    }

    pub fn error(status: StatusCode, message: impl Into<String>) -> Self {
        Self::new(status, message, None)
    }
}

impl<T: Serialize> IntoResponse for JsonResponse<T> {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self)).into_response()
    }
}
