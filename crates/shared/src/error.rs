use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    NotFound,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
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

/// Failure to turn a response body into a temperature reading.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DecodeError {
    #[error("response body is not valid JSON: {0}")]
    InvalidJson(String),
    #[error("response is missing field `{0}`")]
    MissingField(String),
    #[error("field `{0}` is not a number")]
    NotANumber(String),
}
