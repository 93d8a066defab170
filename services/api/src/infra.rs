use metrics_exporter_prometheus::PrometheusHandle;
use noise_wizard::calculation::{CalculationClient, HttpCalculationClient};
use noise_wizard::config::{AppConfig, CalculatorConfig};
use noise_wizard::error::AppError;
use noise_wizard::reference::ReferenceData;
use noise_wizard::report::{artifact, DownloadKind, EstimationResult};
use noise_wizard::wizard::{FormData, WizardSession};
use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Shared by the wizard and reference routes. The session lock is never held
/// across a calculation call.
#[derive(Clone)]
pub(crate) struct WizardState {
    pub(crate) reference: Arc<ReferenceData>,
    pub(crate) calculator: Arc<dyn CalculationClient>,
    pub(crate) session: Arc<Mutex<WizardSession>>,
}

impl WizardState {
    pub(crate) fn new(reference: ReferenceData, calculator: Arc<dyn CalculationClient>) -> Self {
        Self {
            reference: Arc::new(reference),
            calculator,
            session: Arc::new(Mutex::new(WizardSession::default())),
        }
    }
}

/// Point the calculator at `url`, keeping the configured timeout.
pub(crate) fn apply_calculator_override(
    config: &mut AppConfig,
    url: Option<String>,
) -> Result<(), AppError> {
    if let Some(url) = url {
        config.calculator = CalculatorConfig {
            timeout: config.calculator.timeout,
            ..CalculatorConfig::new(url)?
        };
    }
    Ok(())
}

/// Reference tables and the HTTP calculation client for a loaded config.
pub(crate) async fn runtime_dependencies(
    config: &AppConfig,
) -> Result<(ReferenceData, HttpCalculationClient), AppError> {
    let calculator = HttpCalculationClient::new(&config.calculator)?;
    let fetcher = reqwest::Client::builder()
        .timeout(config.calculator.timeout)
        .build()?;
    let reference = ReferenceData::load(&config.reference, &fetcher).await;
    Ok((reference, calculator))
}

pub(crate) async fn read_answers(path: &Path) -> Result<FormData, AppError> {
    let raw = tokio::fs::read(path).await?;
    Ok(serde_json::from_slice(&raw)?)
}

/// Write every artifact the result carries into `dir`, returning the paths.
pub(crate) async fn write_artifacts(
    result: &EstimationResult,
    dir: &Path,
) -> Result<Vec<PathBuf>, AppError> {
    tokio::fs::create_dir_all(dir).await?;

    let mut written = Vec::new();
    for kind in DownloadKind::ordered() {
        if let Some(artifact) = artifact(result, kind)? {
            let path = dir.join(&artifact.file_name);
            tokio::fs::write(&path, artifact.body.as_bytes()).await?;
            info!(path = %path.display(), kind = kind.key(), "artifact written");
            written.push(path);
        }
    }
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn write_artifacts_skips_absent_packs() {
        let result: EstimationResult = serde_json::from_value(serde_json::json!({
            "request_id": "r-9",
            "predicted_level_db": 50.0,
            "background_db": 45.0,
            "nml_db": 55.0,
            "exceed_background_db": 5.0,
            "exceed_nml_db": -5.0,
            "impact_band": "NOT_AFFECTED",
            "ref_noise_pack": "REF PACK"
        }))
        .expect("result parses");

        let dir = std::env::temp_dir().join(format!("noise-wizard-artifacts-{}", std::process::id()));
        let written = write_artifacts(&result, &dir).await.expect("artifacts written");

        assert_eq!(written, vec![dir.join("ref_noise_pack_r-9.txt")]);
        let body = tokio::fs::read_to_string(&written[0]).await.expect("pack readable");
        assert_eq!(body, "REF PACK");
        tokio::fs::remove_dir_all(&dir).await.expect("cleanup");
    }
}
