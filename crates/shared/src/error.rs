use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    Unauthorized,
    NotFound,
    Validation,
    Conflict,
    RateLimited,
    Internal,
}

impl ErrorCode {
    /// Maps a backend `errorType` tag onto a coarse code.
    pub fn from_error_type(error_type: Option<&str>) -> Self {
        let Some(error_type) = error_type else {
            return Self::Internal;
        };
        let lowered = error_type.to_ascii_lowercase();

        if lowered.contains("unauthorized") || lowered.contains("accessdenied") {
            Self::Unauthorized
        } else if lowered.contains("conditionalcheckfailed") || lowered.contains("conflict") {
            Self::Conflict
        } else if lowered.contains("notfound") {
            Self::NotFound
        } else if lowered.contains("validation") || lowered.contains("malformed") {
            Self::Validation
        } else if lowered.contains("throttl") || lowered.contains("ratelimit") {
            Self::RateLimited
        } else {
            Self::Internal
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

#[cfg(test)]
#[path = "tests/error_tests.rs"]
mod tests;
