//! Boundary request and response types.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::BridgeError;

/// Normalized error shape: tag, message and optional details.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApiError {
    /// Error code (e.g., "COMMAND_TIMEOUT").
    pub code: String,
    /// Human-readable error message.
    pub message: String,
    /// Structured details (optional).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl ApiError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
        }
    }
}

impl From<&BridgeError> for ApiError {
    fn from(err: &BridgeError) -> Self {
        Self {
            details: err.details(),
            ..Self::new(err.code(), err.to_string())
        }
    }
}

impl From<BridgeError> for ApiError {
    fn from(err: BridgeError) -> Self {
        Self::from(&err)
    }
}

/// Envelope returned by every control-plane operation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApiResponse<T> {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ApiError>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            ok: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn failure(error: impl Into<ApiError>) -> Self {
        Self {
            ok: false,
            data: None,
            error: Some(error.into()),
        }
    }

    /// Error code, if this is a failure.
    pub fn error_code(&self) -> Option<&str> {
        self.error.as_ref().map(|e| e.code.as_str())
    }
}

impl<T> From<crate::Result<T>> for ApiResponse<T> {
    fn from(result: crate::Result<T>) -> Self {
        match result {
            Ok(data) => Self::success(data),
            Err(err) => Self::failure(err),
        }
    }
}

/// Request to save log content.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SaveLogRequest {
    /// Content to save; the history when absent.
    pub content: Option<String>,
    pub file_name: Option<String>,
}

/// Where the log was written; `None` when there was nothing to write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveLogResponse {
    pub file_path: Option<PathBuf>,
}
