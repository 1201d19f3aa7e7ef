use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::{dto::ErrorResponse, gemini::GeminiError, service::NoteServiceError};

#[derive(Debug)]
pub enum ApiError {
    Validation(String),
    NotFound(String),
    Storage(String),
    Upstream(String),
}

impl ApiError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }
}

impl From<NoteServiceError> for ApiError {
    fn from(err: NoteServiceError) -> Self {
        match err {
            NoteServiceError::NotFound(_) => Self::NotFound(err.to_string()),
            NoteServiceError::Storage(_) | NoteServiceError::Task(_) => {
                Self::Storage(err.to_string())
            }
        }
    }
}

impl From<GeminiError> for ApiError {
    fn from(err: GeminiError) -> Self {
        match err {
            GeminiError::UnsupportedImageFormat(_) => Self::Validation(err.to_string()),
            _ => Self::Upstream(err.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::Validation(message) => (StatusCode::BAD_REQUEST, message),
            Self::NotFound(message) => (StatusCode::NOT_FOUND, message),
            Self::Storage(message) => {
                tracing::error!("storage failure: {message}");
                (StatusCode::INTERNAL_SERVER_ERROR, message)
            }
            Self::Upstream(message) => {
                tracing::error!("Gemini call failed: {message}");
                (StatusCode::INTERNAL_SERVER_ERROR, message)
            }
        };

        (
            status,
            Json(ErrorResponse {
                error_message: message,
            }),
        )
            .into_response()
    }
}
