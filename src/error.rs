//! Error taxonomy for the HTTP layer and its translation into responses.

use crate::collection::StoreError;
use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use serde_json::json;
use std::collections::BTreeMap;
use tracing::error;

/// Field name → messages, serialized as a plain JSON object
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors(BTreeMap<String, Vec<String>>);

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Errors for one field
    pub fn single(field: &str, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0.entry(field.to_string()).or_default().push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    /// `Ok(value)` when nothing was recorded
    pub fn into_result<T>(self, value: T) -> Result<T, Self> {
        if self.is_empty() { Ok(value) } else { Err(self) }
    }
}

impl std::fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut first = true;
        for (field, messages) in &self.0 {
            for message in messages {
                if !first {
                    f.write_str("; ")?;
                }
                write!(f, "{}: {}", field, message)?;
                first = false;
            }
        }
        Ok(())
    }
}

/// Everything a handler can fail with
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// `id` is kept as written in the request path, parsed or not
    #[error("{kind} {id} not found")]
    NotFound { kind: &'static str, id: String },

    #[error("Validation failed: {0}")]
    Validation(ValidationErrors),

    #[error("{0}")]
    Conflict(String),

    #[error("Internal error: {0:#}")]
    Internal(eyre::Report),
}

pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::NotFound { .. } => StatusCode::NOT_FOUND,
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<ValidationErrors> for ApiError {
    fn from(errors: ValidationErrors) -> Self {
        ApiError::Validation(errors)
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { kind, id } => ApiError::NotFound {
                kind,
                id: id.to_string(),
            },
            StoreError::Invalid { field, message } => ApiError::Validation(ValidationErrors::single(&field, message)),
            conflict @ StoreError::Conflict { .. } => ApiError::Conflict(conflict.to_string()),
            StoreError::Other(report) => ApiError::Internal(report),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        match self {
            ApiError::Validation(errors) => (status, Json(errors)).into_response(),
            ApiError::Internal(report) => {
                error!(error = ?report, "Request failed");
                (status, Json(json!({ "message": "Internal server error" }))).into_response()
            }
            other => (status, Json(json!({ "message": other.to_string() }))).into_response(),
        }
    }
}
