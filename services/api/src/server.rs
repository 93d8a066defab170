use crate::cli::ServeArgs;
use crate::infra::{apply_calculator_override, runtime_dependencies, AppState, WizardState};
use crate::routes::with_wizard_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use noise_wizard::config::AppConfig;
use noise_wizard::error::AppError;
use noise_wizard::telemetry::{self, LogTarget};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::info;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }
    apply_calculator_override(&mut config, args.calculator_url.take())?;

    telemetry::init(&config.telemetry, LogTarget::Stdout)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let (reference, calculator) = runtime_dependencies(&config).await?;
    info!(endpoint = calculator.endpoint(), "calculation service configured");
    let wizard_state = WizardState::new(reference, Arc::new(calculator));

    let app = with_wizard_routes(wizard_state)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "noise assessment wizard ready");

    axum::serve(listener, app).await?;
    Ok(())
}
