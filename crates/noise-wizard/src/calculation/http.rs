use super::{service_message, CalculationClient, CalculationError};
use crate::config::CalculatorConfig;
use crate::report::EstimationResult;
use crate::request::EstimationRequest;
use async_trait::async_trait;
use std::time::Instant;
use tracing::{debug, error, info};

/// Posts requests as JSON to the configured endpoint. No retries.
#[derive(Debug, Clone)]
pub struct HttpCalculationClient {
    http: reqwest::Client,
    endpoint: String,
}

impl HttpCalculationClient {
    pub fn new(config: &CalculatorConfig) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self::with_client(http, config.endpoint.clone()))
    }

    pub fn with_client(http: reqwest::Client, endpoint: impl Into<String>) -> Self {
        Self {
            http,
            endpoint: endpoint.into(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl CalculationClient for HttpCalculationClient {
    async fn calculate(
        &self,
        request: &EstimationRequest,
    ) -> Result<EstimationResult, CalculationError> {
        let started = Instant::now();
        debug!(endpoint = %self.endpoint, mode = request.calculation_mode.key(), "calculation requested");

        let response = self
            .http
            .post(&self.endpoint)
            .json(request)
            .send()
            .await
            .map_err(|err| {
                error!(endpoint = %self.endpoint, error = %err, "calculation service unreachable");
                CalculationError::Transport(err)
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|err| {
            error!(endpoint = %self.endpoint, error = %err, "failed to read calculation response");
            CalculationError::Transport(err)
        })?;

        if !status.is_success() {
            let message = service_message(&body);
            error!(status = status.as_u16(), %message, "calculation service rejected request");
            return Err(CalculationError::Service {
                status: status.as_u16(),
                message,
            });
        }

        let result: EstimationResult = serde_json::from_str(&body).map_err(|err| {
            error!(error = %err, "calculation response did not decode");
            CalculationError::Decode(err)
        })?;

        info!(
            request_id = %result.request_id,
            impact_band = result.impact_band.label(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "calculation completed"
        );
        Ok(result)
    }
}
