//! API Error Handling
//!
//! Structured error responses with proper HTTP status codes and request
//! tracking. Engine errors carry their stable code so clients match on
//! kind, never on message text.

use crate::errors::GameError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Top-level API error response with request tracking
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub request_id: String,
    pub error: ErrorBody,
}

/// Error body with structured information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Stable error code (WRONG_PHASE, ALREADY_BET, NOT_FOUND, ...)
    pub code: String,
    /// Human-readable error message
    pub message: String,
}

/// API error with request tracking
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub code: String,
    pub message: String,
    pub request_id: String,
}

impl ApiError {
    pub fn not_found(request_id: String, message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            code: "NOT_FOUND".to_string(),
            message: message.into(),
            request_id,
        }
    }

    pub fn bad_request(request_id: String, message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            code: "BAD_REQUEST".to_string(),
            message: message.into(),
            request_id,
        }
    }

    pub fn internal_error(request_id: String, message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            code: "INTERNAL_ERROR".to_string(),
            message: message.into(),
            request_id,
        }
    }

    /// Map an engine error onto an HTTP status, keeping its stable code.
    pub fn from_game(request_id: String, error: GameError) -> Self {
        let status = match &error {
            GameError::InvalidBet
            | GameError::InvalidSeed
            | GameError::InvalidConfig(_)
            | GameError::Bank(_) => StatusCode::BAD_REQUEST,
            GameError::NoBet => StatusCode::NOT_FOUND,
            GameError::Unauthorized(_) => StatusCode::FORBIDDEN,
            GameError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
            // Phase and timing guards: the request was well-formed but the
            // round state says no. Retryable by the client.
            _ => StatusCode::CONFLICT,
        };

        Self {
            status,
            code: error.code().to_string(),
            message: error.to_string(),
            request_id,
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.request_id, self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ErrorResponse {
            request_id: self.request_id,
            error: ErrorBody {
                code: self.code,
                message: self.message,
            },
        });

        (self.status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_game_error_mapping() {
        let err = ApiError::from_game("req-1".to_string(), GameError::AlreadyBet);
        assert_eq!(err.status, StatusCode::CONFLICT);
        assert_eq!(err.code, "ALREADY_BET");

        let err = ApiError::from_game("req-2".to_string(), GameError::NoBet);
        assert_eq!(err.status, StatusCode::NOT_FOUND);

        let err = ApiError::from_game("req-3".to_string(), GameError::InvalidSeed);
        assert_eq!(err.status, StatusCode::BAD_REQUEST);

        let err =
            ApiError::from_game("req-4".to_string(), GameError::Unauthorized("x".to_string()));
        assert_eq!(err.status, StatusCode::FORBIDDEN);
    }
}
