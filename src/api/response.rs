//! Success envelope shared by all template endpoints.

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path,
    },
    http::StatusCode,
    Json,
};
use serde::Serialize;

use crate::error::{status_code, AppError};
use crate::template::Outcome;

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

pub type ApiResult<T> = Result<(StatusCode, Json<ApiResponse<T>>), AppError>;

/// Wrap a service outcome with the status its kind maps to
pub fn respond<T: Serialize>(outcome: Outcome<T>, message: Option<&str>) -> ApiResult<T> {
    Ok((
        status_code(outcome.status),
        Json(ApiResponse {
            success: true,
            data: outcome.payload,
            message: message.map(str::to_string),
        }),
    ))
}

/// Unwrap a JSON body, reporting malformed payloads in the error envelope
pub fn json_body<T>(body: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    body.map(|Json(value)| value)
        .map_err(|rejection| AppError::Validation(format!("Invalid JSON body: {}", rejection.body_text())))
}

/// Unwrap path parameters, reporting unparsable segments in the error envelope
pub fn path_params<T>(path: Result<Path<T>, PathRejection>) -> Result<T, AppError> {
    path.map(|Path(value)| value)
        .map_err(|rejection| AppError::Validation(format!("Invalid path: {}", rejection.body_text())))
}
