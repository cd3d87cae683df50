use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::template::{ServiceError, StatusKind};

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Render error: {0}")]
    Render(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Validation(msg) => AppError::Validation(msg),
            ServiceError::Render(e) => AppError::Render(e.to_string()),
            ServiceError::NotFound(msg) => AppError::NotFound(msg),
            ServiceError::Conflict(msg) => AppError::Conflict(msg),
            ServiceError::Internal(msg) => AppError::Internal(msg),
        }
    }
}

/// Transport status for a service status kind
pub fn status_code(kind: StatusKind) -> StatusCode {
    match kind {
        StatusKind::Created => StatusCode::CREATED,
        StatusKind::Ok => StatusCode::OK,
        StatusKind::NotFound => StatusCode::NOT_FOUND,
        StatusKind::Conflict => StatusCode::CONFLICT,
        StatusKind::ValidationError => StatusCode::BAD_REQUEST,
        StatusKind::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    success: bool,
    error: ErrorBody,
}

#[derive(Serialize)]
struct ErrorBody {
    code: String,
    message: String,
}

/// Check if running in production mode (based on RUN_MODE env var)
fn is_production() -> bool {
    std::env::var("RUN_MODE")
        .map(|m| m == "production" || m == "prod")
        .unwrap_or(false)
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, client_message, log_message) = match &self {
            AppError::Config(e) => {
                let log_msg = e.to_string();
                let client_msg = if is_production() {
                    "Configuration error".to_string()
                } else {
                    log_msg.clone()
                };
                (StatusCode::INTERNAL_SERVER_ERROR, "CONFIG_ERROR", client_msg, log_msg)
            }
            AppError::Validation(msg) => (
                status_code(StatusKind::ValidationError),
                "VALIDATION_ERROR",
                msg.clone(),
                msg.clone(),
            ),
            AppError::Render(msg) => (
                status_code(StatusKind::ValidationError),
                "RENDER_ERROR",
                msg.clone(),
                msg.clone(),
            ),
            AppError::NotFound(msg) => (
                status_code(StatusKind::NotFound),
                "NOT_FOUND",
                msg.clone(),
                msg.clone(),
            ),
            AppError::Conflict(msg) => (
                status_code(StatusKind::Conflict),
                "CONFLICT",
                msg.clone(),
                msg.clone(),
            ),
            AppError::Internal(e) => {
                let log_msg = e.clone();
                let client_msg = if is_production() {
                    "Internal server error".to_string()
                } else {
                    log_msg.clone()
                };
                (
                    status_code(StatusKind::InternalError),
                    "INTERNAL_ERROR",
                    client_msg,
                    log_msg,
                )
            }
        };

        if status.is_server_error() {
            tracing::error!(
                code = %code,
                status = %status.as_u16(),
                message = %log_message,
                "API error"
            );
        } else {
            tracing::debug!(
                code = %code,
                status = %status.as_u16(),
                message = %log_message,
                "API request rejected"
            );
        }

        let body = ErrorResponse {
            success: false,
            error: ErrorBody {
                code: code.to_string(),
                message: client_message,
            },
        };

        (status, Json(body)).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::RenderError;

    #[test]
    fn test_status_mapping() {
        assert_eq!(status_code(StatusKind::Created), StatusCode::CREATED);
        assert_eq!(status_code(StatusKind::Ok), StatusCode::OK);
        assert_eq!(status_code(StatusKind::NotFound), StatusCode::NOT_FOUND);
        assert_eq!(status_code(StatusKind::Conflict), StatusCode::CONFLICT);
        assert_eq!(status_code(StatusKind::ValidationError), StatusCode::BAD_REQUEST);
        assert_eq!(
            status_code(StatusKind::InternalError),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_service_error_responses() {
        let response = AppError::from(ServiceError::Conflict("taken".into())).into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);

        let render = ServiceError::Render(RenderError::UndefinedVariable {
            name: "name".into(),
        });
        let response = AppError::from(render).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = AppError::from(ServiceError::Internal("db down".into())).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
