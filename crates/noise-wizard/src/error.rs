use crate::calculation::CalculationError;
use crate::config::ConfigError;
use crate::report::ExportError;
use crate::telemetry::TelemetryError;
use crate::wizard::SessionError;
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
    HttpClient(reqwest::Error),
    Answers(serde_json::Error),
    Session(SessionError),
    Calculation(CalculationError),
    Export(ExportError),
    NotFound(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Config(err) => write!(f, "configuration error: {}", err),
            AppError::Telemetry(err) => write!(f, "telemetry error: {}", err),
            AppError::Io(err) => write!(f, "io error: {}", err),
            AppError::Server(err) => write!(f, "server error: {}", err),
            AppError::HttpClient(err) => write!(f, "http client error: {}", err),
            AppError::Answers(err) => write!(f, "invalid answers: {}", err),
            AppError::Session(err) => write!(f, "{}", err),
            AppError::Calculation(err) => write!(f, "{}", err.user_message()),
            AppError::Export(err) => write!(f, "export error: {}", err),
            AppError::NotFound(what) => write!(f, "{} not found", what),
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
            AppError::HttpClient(err) => Some(err),
            AppError::Answers(err) => Some(err),
            AppError::Session(err) => Some(err),
            AppError::Calculation(err) => Some(err),
            AppError::Export(err) => Some(err),
            AppError::NotFound(_) => None,
        }
    }
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Session(SessionError::Assembly(_) | SessionError::StepIncomplete(_)) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            AppError::Session(_) => StatusCode::CONFLICT,
            AppError::Answers(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Calculation(err) => {
                StatusCode::from_u16(err.relay_status()).unwrap_or(StatusCode::BAD_GATEWAY)
            }
            AppError::Config(_)
            | AppError::Telemetry(_)
            | AppError::Io(_)
            | AppError::Server(_)
            | AppError::HttpClient(_)
            | AppError::Export(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
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

impl From<reqwest::Error> for AppError {
    fn from(value: reqwest::Error) -> Self {
        Self::HttpClient(value)
    }
}

impl From<serde_json::Error> for AppError {
    fn from(value: serde_json::Error) -> Self {
        Self::Answers(value)
    }
}

impl From<SessionError> for AppError {
    fn from(value: SessionError) -> Self {
        Self::Session(value)
    }
}

impl From<CalculationError> for AppError {
    fn from(value: CalculationError) -> Self {
        Self::Calculation(value)
    }
}

impl From<ExportError> for AppError {
    fn from(value: ExportError) -> Self {
        Self::Export(value)
    }
}
