use crate::infra::{AppState, WizardState};
use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post, put};
use axum::{Extension, Json, Router};
use noise_wizard::error::AppError;
use noise_wizard::reference::{Plant, ReferenceTable, Scenario, WizardGuidance};
use noise_wizard::report::{artifact, render_text, DownloadKind, EstimationResult};
use noise_wizard::request::EstimationRequest;
use noise_wizard::wizard::{FieldUpdate, Navigation, SessionView, SubmissionOutcome};
use serde::Serialize;
use serde_json::json;
use tracing::info;

#[derive(Debug, Serialize)]
pub(crate) struct NavigationResponse {
    pub(crate) navigation: Navigation,
    pub(crate) session: SessionView,
}

#[derive(Debug, Serialize)]
pub(crate) struct SubmitResponse {
    pub(crate) outcome: SubmissionOutcome,
    pub(crate) session: SessionView,
}

#[derive(Debug, Serialize)]
pub(crate) struct CatalogResponse<T> {
    pub(crate) degraded: bool,
    pub(crate) entries: Vec<T>,
}

pub(crate) fn with_wizard_routes(state: WizardState) -> Router {
    Router::new()
        .route("/api/v1/reference/guidance", get(guidance_endpoint))
        .route("/api/v1/reference/scenarios", get(scenarios_endpoint))
        .route("/api/v1/reference/plants", get(plants_endpoint))
        .route("/api/v1/calculate", post(calculate_endpoint))
        .route("/api/v1/wizard", get(session_endpoint))
        .route("/api/v1/wizard/fields", put(update_field_endpoint))
        .route("/api/v1/wizard/advance", post(advance_endpoint))
        .route("/api/v1/wizard/retreat", post(retreat_endpoint))
        .route("/api/v1/wizard/submit", post(submit_endpoint))
        .route("/api/v1/wizard/restart", post(restart_endpoint))
        .route("/api/v1/wizard/report", get(report_endpoint))
        .route("/api/v1/wizard/downloads/:kind", get(download_endpoint))
        .with_state(state)
        .route("/health", get(healthcheck))
        .route("/ready", get(readiness_endpoint))
        .route("/metrics", get(metrics_endpoint))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

async fn guidance_endpoint(
    State(state): State<WizardState>,
) -> Result<Json<WizardGuidance>, AppError> {
    state
        .reference
        .guidance()
        .cloned()
        .map(Json)
        .ok_or_else(|| AppError::NotFound(ReferenceTable::Guidance.label().to_string()))
}

async fn scenarios_endpoint(State(state): State<WizardState>) -> Json<CatalogResponse<Scenario>> {
    Json(CatalogResponse {
        degraded: state.reference.is_degraded(ReferenceTable::Scenarios),
        entries: state.reference.scenarios().to_vec(),
    })
}

async fn plants_endpoint(State(state): State<WizardState>) -> Json<CatalogResponse<Plant>> {
    Json(CatalogResponse {
        degraded: state.reference.is_degraded(ReferenceTable::Plants),
        entries: state.reference.plants().to_vec(),
    })
}

/// Stateless relay to the calculation service.
async fn calculate_endpoint(
    State(state): State<WizardState>,
    Json(request): Json<EstimationRequest>,
) -> Result<Json<EstimationResult>, AppError> {
    let result = state.calculator.calculate(&request).await?;
    Ok(Json(result))
}

async fn session_endpoint(State(state): State<WizardState>) -> Json<SessionView> {
    let session = state.session.lock().await;
    Json(session.view(&state.reference))
}

async fn update_field_endpoint(
    State(state): State<WizardState>,
    Json(update): Json<FieldUpdate>,
) -> Result<Json<SessionView>, AppError> {
    let mut session = state.session.lock().await;
    session.apply(update)?;
    Ok(Json(session.view(&state.reference)))
}

async fn advance_endpoint(
    State(state): State<WizardState>,
) -> Result<Json<NavigationResponse>, AppError> {
    let mut session = state.session.lock().await;
    let navigation = session.advance()?;
    Ok(Json(NavigationResponse {
        navigation,
        session: session.view(&state.reference),
    }))
}

async fn retreat_endpoint(
    State(state): State<WizardState>,
) -> Result<Json<NavigationResponse>, AppError> {
    let mut session = state.session.lock().await;
    let navigation = session.retreat()?;
    Ok(Json(NavigationResponse {
        navigation,
        session: session.view(&state.reference),
    }))
}

/// A failed calculation is still a 200: the outcome and the message travel in
/// the session view, and the answers stay put for a retry.
async fn submit_endpoint(
    State(state): State<WizardState>,
) -> Result<Json<SubmitResponse>, AppError> {
    let pending = state.session.lock().await.begin_submission()?;
    let result = state.calculator.calculate(&pending.request).await;

    let mut session = state.session.lock().await;
    let outcome = session.complete_submission(pending.ticket, result);
    Ok(Json(SubmitResponse {
        outcome,
        session: session.view(&state.reference),
    }))
}

async fn restart_endpoint(State(state): State<WizardState>) -> Result<Json<SessionView>, AppError> {
    let mut session = state.session.lock().await;
    session.restart()?;
    Ok(Json(session.view(&state.reference)))
}

async fn report_endpoint(State(state): State<WizardState>) -> Result<impl IntoResponse, AppError> {
    let session = state.session.lock().await;
    let result = session
        .last_result()
        .ok_or_else(|| AppError::NotFound("result".to_string()))?;

    Ok((
        StatusCode::OK,
        [(header::CONTENT_TYPE, mime::TEXT_PLAIN_UTF_8.to_string())],
        render_text(result),
    ))
}

async fn download_endpoint(
    State(state): State<WizardState>,
    Path(kind): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let kind = DownloadKind::from_key(&kind)
        .ok_or_else(|| AppError::NotFound(format!("download '{kind}'")))?;

    let session = state.session.lock().await;
    let result = session
        .last_result()
        .ok_or_else(|| AppError::NotFound("result".to_string()))?;
    let artifact = artifact(result, kind)?
        .ok_or_else(|| AppError::NotFound(kind.label().to_string()))?;

    info!(kind = kind.key(), file = %artifact.file_name, "download served");
    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, artifact.content_type.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", artifact.file_name),
            ),
        ],
        artifact.body,
    ))
}
