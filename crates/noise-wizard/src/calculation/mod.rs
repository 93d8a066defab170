//! Boundary to the external calculation service. Every remote outcome is
//! folded into [`CalculationError`] here; nothing above this module sees a
//! transport error.

mod http;

pub use http::HttpCalculationClient;

use crate::report::EstimationResult;
use crate::request::EstimationRequest;
use async_trait::async_trait;

/// Message shown when a failure carries no diagnostic text of its own.
pub const GENERIC_CALCULATION_FAILURE: &str = "Calculation failed";
/// Message shown when the service could not be reached or answered garbage.
pub const GENERIC_TRANSPORT_FAILURE: &str = "Failed to process request";

#[async_trait]
pub trait CalculationClient: Send + Sync {
    async fn calculate(
        &self,
        request: &EstimationRequest,
    ) -> Result<EstimationResult, CalculationError>;
}

#[derive(Debug, thiserror::Error)]
pub enum CalculationError {
    #[error("calculation service returned {status}: {message}")]
    Service { status: u16, message: String },
    #[error("calculation service unreachable: {0}")]
    Transport(#[source] reqwest::Error),
    #[error("calculation service response did not match the result schema: {0}")]
    Decode(#[source] serde_json::Error),
}

impl CalculationError {
    /// The single line surfaced to the user.
    pub fn user_message(&self) -> &str {
        match self {
            Self::Service { message, .. } => message.as_str(),
            Self::Transport(_) | Self::Decode(_) => GENERIC_TRANSPORT_FAILURE,
        }
    }

    /// Status for callers that relay the failure over HTTP.
    pub fn relay_status(&self) -> u16 {
        match self {
            Self::Service { status, .. } => *status,
            Self::Transport(_) | Self::Decode(_) => 502,
        }
    }
}

/// Diagnostic text from an error body: a JSON `error` or `detail` string,
/// else the trimmed body, else the generic failure message.
pub fn service_message(body: &str) -> String {
    if let Ok(serde_json::Value::Object(fields)) = serde_json::from_str::<serde_json::Value>(body)
    {
        for key in ["error", "detail"] {
            if let Some(serde_json::Value::String(message)) = fields.get(key) {
                let message = message.trim();
                if !message.is_empty() {
                    return message.to_string();
                }
            }
        }
    }

    match body.trim() {
        "" => GENERIC_CALCULATION_FAILURE.to_string(),
        trimmed => trimmed.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn service_message_prefers_json_fields() {
        assert_eq!(service_message(r#"{"error": "bad category"}"#), "bad category");
        assert_eq!(
            service_message(r#"{"detail": "Scenario 'x' not found"}"#),
            "Scenario 'x' not found"
        );
        assert_eq!(
            service_message(r#"{"detail": [{"loc": ["body"]}]}"#),
            r#"{"detail": [{"loc": ["body"]}]}"#
        );
    }

    #[test]
    fn service_message_falls_back_to_body_then_generic() {
        assert_eq!(service_message("  internal error\n"), "internal error");
        assert_eq!(service_message("   "), GENERIC_CALCULATION_FAILURE);
    }

    #[test]
    fn service_errors_relay_their_own_status() {
        let err = CalculationError::Service {
            status: 422,
            message: "bad input".to_string(),
        };
        assert_eq!(err.user_message(), "bad input");
        assert_eq!(err.relay_status(), 422);

        let decode = serde_json::from_str::<EstimationResult>("{}")
            .map_err(CalculationError::Decode)
            .expect_err("empty object is not a result");
        assert_eq!(decode.user_message(), GENERIC_TRANSPORT_FAILURE);
        assert_eq!(decode.relay_status(), 502);
    }
}
