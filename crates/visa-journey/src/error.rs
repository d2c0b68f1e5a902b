use crate::auth::AuthError;
use crate::config::ConfigError;
use crate::journey::JourneyServiceError;
use crate::telemetry::TelemetryError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use std::fmt;

#[derive(Debug)]
pub enum AppError {
    Config(ConfigError),
    Telemetry(TelemetryError),
    Io(std::io::Error),
    Server(axum::Error),
    Auth(AuthError),
    Journey(JourneyServiceError),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Config(err) => write!(f, "configuration error: {}", err),
            AppError::Telemetry(err) => write!(f, "telemetry error: {}", err),
            AppError::Io(err) => write!(f, "io error: {}", err),
            AppError::Server(err) => write!(f, "server error: {}", err),
            AppError::Auth(err) => write!(f, "auth error: {}", err),
            AppError::Journey(err) => write!(f, "journey error: {}", err),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Config(err) => Some(err),
            AppError::Telemetry(err) => Some(err),
            AppError::Io(err) => Some(err),
            AppError::Server(err) => Some(err),
            AppError::Auth(err) => Some(err),
            AppError::Journey(err) => Some(err),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match self {
            AppError::Journey(err) => return err.into_response(),
            AppError::Auth(_) => StatusCode::UNAUTHORIZED,
            AppError::Config(_)
            | AppError::Telemetry(_)
            | AppError::Io(_)
            | AppError::Server(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}

impl From<ConfigError> for AppError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<TelemetryError> for AppError {
    fn from(value: TelemetryError) -> Self {
        Self::Telemetry(value)
    }
}

impl From<std::io::Error> for AppError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<axum::Error> for AppError {
    fn from(value: axum::Error) -> Self {
        Self::Server(value)
    }
}

impl From<AuthError> for AppError {
    fn from(value: AuthError) -> Self {
        Self::Auth(value)
    }
}

impl From<JourneyServiceError> for AppError {
    fn from(value: JourneyServiceError) -> Self {
        Self::Journey(value)
    }
}

/// Malformed caller input, rejected before any state changes.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("casDate must match DD/MM/YYYY (got '{value}')")]
    InvalidCasDate { value: String },
    #[error("invalid personalization answers: {0}")]
    InvalidPersonalization(String),
    #[error("answer to '{field}' must be {expected}, got {found}")]
    AnswerKind {
        field: String,
        expected: &'static str,
        found: &'static str,
    },
    #[error("'{value}' is not an allowed answer to '{field}'")]
    InvalidChoice { field: String, value: String },
    #[error("note content must not be empty")]
    EmptyNote,
    #[error("note content exceeds {max} characters (found {found})")]
    NoteTooLong { max: usize, found: usize },
    #[error("email must not be empty")]
    EmptyEmail,
    #[error("'{0}' is not a valid email address")]
    InvalidEmail(String),
    #[error("{0} must not be empty")]
    MissingField(&'static str),
    #[error("invalid request body: {0}")]
    InvalidRequest(String),
}
