/// Application error type
///
/// Every fallible operation in the crate returns `AppError`: a kind that
/// maps to an HTTP status, a caller-facing message, and optional internal
/// detail. Detail is redacted from HTTP responses unless the application
/// runs in development mode; it is always available to structured logs.

use actix_web::{error::ResponseError, http::StatusCode, HttpResponse};
use std::error::Error as StdError;
use std::fmt;

use crate::configuration::Environment;

/// Error classification, mapped to HTTP status codes at the transport
/// boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Hashing, signing, or storage-transport failure. 500.
    Internal,
    /// Password mismatch, refresh token not found / already used / expired. 401.
    Authorization,
    /// Resource already exists (e.g. registering an existing email). 409.
    Conflict,
    /// Input validation failure. 400.
    BadRequest,
}

impl ErrorKind {
    fn code(&self) -> &'static str {
        match self {
            ErrorKind::Internal => "INTERNAL_ERROR",
            ErrorKind::Authorization => "UNAUTHORIZED",
            ErrorKind::Conflict => "CONFLICT",
            ErrorKind::BadRequest => "BAD_REQUEST",
        }
    }
}

#[derive(Debug)]
pub struct AppError {
    kind: ErrorKind,
    message: String,
    detail: Option<String>,
    expose_detail: bool,
}

impl AppError {
    /// An internal fault. The caller-facing message is always generic;
    /// `detail` records what actually happened.
    pub fn internal(detail: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Internal,
            message: "Internal server error".to_string(),
            detail: Some(detail.into()),
            expose_detail: false,
        }
    }

    /// An authorization failure with a deliberately generic message so the
    /// response does not reveal which factor failed.
    pub fn authorization(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Authorization,
            message: message.into(),
            detail: None,
            expose_detail: false,
        }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Conflict,
            message: message.into(),
            detail: None,
            expose_detail: false,
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::BadRequest,
            message: message.into(),
            detail: None,
            expose_detail: false,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn detail(&self) -> Option<&str> {
        self.detail.as_deref()
    }

    /// Decide at the transport boundary whether responses may carry internal
    /// detail. Only development deployments expose it.
    pub fn for_environment(mut self, environment: &Environment) -> Self {
        self.expose_detail = matches!(environment, Environment::Development);
        self
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.detail {
            Some(detail) => write!(f, "{}: {}", self.message, detail),
            None => write!(f, "{}", self.message),
        }
    }
}

impl StdError for AppError {}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::internal(format!("database error: {}", err))
    }
}

/// JSON body returned for every error response.
#[derive(Debug, serde::Serialize)]
pub struct ErrorResponse {
    pub message: String,
    pub code: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl ErrorResponse {
    fn from_error(err: &AppError) -> Self {
        Self {
            message: err.message.clone(),
            code: err.kind.code(),
            detail: if err.expose_detail {
                err.detail.clone()
            } else {
                None
            },
        }
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self.kind {
            ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
            ErrorKind::Authorization => StatusCode::UNAUTHORIZED,
            ErrorKind::Conflict => StatusCode::CONFLICT,
            ErrorKind::BadRequest => StatusCode::BAD_REQUEST,
        }
    }

    fn error_response(&self) -> HttpResponse {
        match self.kind {
            ErrorKind::Internal => {
                tracing::error!(error = %self, "request failed");
            }
            _ => {
                tracing::warn!(error = %self, "request rejected");
            }
        }
        HttpResponse::build(self.status_code()).json(ErrorResponse::from_error(self))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn internal_error_has_generic_message_and_detail() {
        let err = AppError::internal("connection refused");
        assert_eq!(err.kind(), ErrorKind::Internal);
        assert_eq!(err.detail(), Some("connection refused"));
        assert_eq!(err.to_string(), "Internal server error: connection refused");
    }

    #[test]
    fn detail_is_redacted_unless_development() {
        let err = AppError::internal("pool exhausted");
        assert!(ErrorResponse::from_error(&err).detail.is_none());

        let err = err.for_environment(&Environment::Development);
        assert_eq!(
            ErrorResponse::from_error(&err).detail.as_deref(),
            Some("pool exhausted")
        );

        let err = AppError::internal("pool exhausted").for_environment(&Environment::Production);
        assert!(ErrorResponse::from_error(&err).detail.is_none());
    }

    #[test]
    fn authorization_error_maps_to_401() {
        let err = AppError::authorization("invalid refresh token");
        assert_eq!(err.status_code(), StatusCode::UNAUTHORIZED);
        assert!(err.detail().is_none());
    }
}
