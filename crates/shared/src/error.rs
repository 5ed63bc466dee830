use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    Unauthorized,
    NotFound,
    Validation,
    Internal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiError {
    pub code: ErrorCode,
    pub message: String,
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

#[derive(Debug, Error)]
#[error("{code:?}: {message}")]
pub struct ApiException {
    pub code: ErrorCode,
    pub message: String,
}

impl ApiException {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl From<ApiException> for ApiError {
    fn from(value: ApiException) -> Self {
        Self {
            code: value.code,
            message: value.message,
        }
    }
}

/// Rejections raised by [`crate::domain::ItemDraft::validate`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DraftError {
    #[error("item name must not be empty")]
    EmptyName,
    #[error("quantity must be at least 1")]
    QuantityBelowOne,
    #[error("price must be a non-negative amount, got {0}")]
    InvalidPrice(f64),
}

impl From<DraftError> for ApiError {
    fn from(value: DraftError) -> Self {
        Self::new(ErrorCode::Validation, value.to_string())
    }
}
