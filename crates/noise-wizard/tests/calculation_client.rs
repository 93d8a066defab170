use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use noise_wizard::calculation::{
    CalculationClient, CalculationError, HttpCalculationClient, GENERIC_TRANSPORT_FAILURE,
};
use noise_wizard::report::ImpactBand;
use noise_wizard::wizard::domain::{
    AssessmentType, CalculationMode, EnvironmentApproach, PropagationType, TimePeriod,
};
use noise_wizard::wizard::{FieldUpdate, SessionPhase, SubmissionOutcome, WizardSession};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;

#[derive(Clone)]
struct StubState {
    status: StatusCode,
    body: Value,
    received: Arc<Mutex<Vec<Value>>>,
}

async fn calculate(
    State(state): State<StubState>,
    Json(request): Json<Value>,
) -> (StatusCode, Json<Value>) {
    state
        .received
        .lock()
        .expect("received mutex")
        .push(request);
    (state.status, Json(state.body.clone()))
}

async fn raw_failure() -> (StatusCode, &'static str) {
    (StatusCode::INTERNAL_SERVER_ERROR, "internal error")
}

async fn spawn(router: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind ephemeral port");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, router).await.expect("stub server");
    });
    format!("http://{addr}/calculate")
}

async fn stub(status: StatusCode, body: Value) -> (String, Arc<Mutex<Vec<Value>>>) {
    let received = Arc::new(Mutex::new(Vec::new()));
    let state = StubState {
        status,
        body,
        received: received.clone(),
    };
    let router = Router::new()
        .route("/calculate", post(calculate))
        .with_state(state);
    (spawn(router).await, received)
}

fn client(endpoint: String) -> HttpCalculationClient {
    HttpCalculationClient::with_client(reqwest::Client::new(), endpoint)
}

fn result_body() -> Value {
    json!({
        "request_id": "4f2c",
        "dataset_version": "2024.1",
        "timestamp": "2024-05-02T01:02:03Z",
        "predicted_level_db": 74.2,
        "background_db": 45.0,
        "nml_db": 55.0,
        "exceed_background_db": 29.2,
        "exceed_nml_db": 19.2,
        "impact_band": "highly_affected",
        "distances": {
            "distance_to_exceed_background": 820.0,
            "distance_to_nml": 310.0,
            "distance_to_highly_affected": 60.0,
            "affected_distance": null
        },
        "notification_requirements": [
            {"type": "letter_drop", "description": "Letter drop to affected receivers", "timing": "7 days prior", "distance_threshold": 310.0, "details": ["Include hotline"]}
        ],
        "trace": {
            "tables_used": {"nml": {}, "scenario_levels": {}},
            "intermediate_values": {"lw_total": 112.4},
            "warnings": [],
            "assumptions": ["Hemispherical spreading"]
        },
        "step2_memo_pack": "MEMO"
    })
}

fn session_on_review() -> WizardSession {
    let mut session = WizardSession::default();
    for update in [
        FieldUpdate::AssessmentType(Some(AssessmentType::DistanceBased)),
        FieldUpdate::CalculationMode(Some(CalculationMode::Scenario)),
        FieldUpdate::EnvironmentApproach(Some(EnvironmentApproach::RepresentativeNoiseEnvironment)),
        FieldUpdate::TimePeriod(Some(TimePeriod::Day)),
        FieldUpdate::PropagationType(Some(PropagationType::Rural)),
        FieldUpdate::NoiseCategoryId(Some("R1".to_string())),
        FieldUpdate::ScenarioId(Some("excavation".to_string())),
        FieldUpdate::ReceiverDistance(Some("100".to_string())),
    ] {
        session.apply(update).expect("editing accepts updates");
    }
    while !session.is_on_review() {
        session.advance().expect("editing allows advance");
    }
    session
}

#[tokio::test]
async fn successful_call_decodes_full_result() {
    let (endpoint, received) = stub(StatusCode::OK, result_body()).await;
    let mut session = session_on_review();

    let outcome = session
        .submit(&client(endpoint))
        .await
        .expect("submission accepted");

    assert_eq!(outcome, SubmissionOutcome::Completed);
    assert_eq!(session.phase(), SessionPhase::ShowingResult);
    let result = session.last_result().expect("result stored");
    assert_eq!(result.impact_band, ImpactBand::HighlyAffected);
    assert_eq!(result.distances.distance_to_nml, Some(310.0));
    assert_eq!(result.distances.affected_distance, None);
    let trace = result.trace.as_ref().expect("trace present");
    assert!(trace.tables_used.contains("scenario_levels"));

    let requests = received.lock().expect("received mutex");
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0]["scenario_id"], "excavation");
    assert!(requests[0].get("receiver_distance").is_none());
}

#[tokio::test]
async fn service_response_with_requirements_reaches_the_result_screen() {
    let mut body = result_body();
    body["impact_band"] = json!("highly_affected");
    body["notification_requirements"] = json!([
        {"type": "phone_call", "description": "Phone calls", "timing": "7 days prior",
         "distance": 820.0, "impactBand": "highly_affected"},
        {"type": "site_sign", "description": "Site signage", "timing": "24 hours prior",
         "distance": null, "impactBand": "highly_affected"}
    ]);
    body["standard_measures"] = json!([
        {"id": "S1", "title": "Hoarding", "description": "Erect hoarding", "type": "standard",
         "reduction_db": 5.0, "applicable": true, "feasibility": "feasible",
         "cost": "medium", "implementation_time": "1-2 days"}
    ]);
    body["additional_measures"] = json!([
        {"id": "A1", "title": "Respite", "description": "Offer respite", "type": "additional",
         "reduction_db": null, "applicable": false, "feasibility": "not_required",
         "cost": "high", "implementation_time": "3-5 days"}
    ]);
    body["checklist_items"] = json!([
        "Complete noise impact assessment",
        "Identify all sensitive receivers"
    ]);
    let (endpoint, _) = stub(StatusCode::OK, body).await;
    let mut session = session_on_review();

    let outcome = session
        .submit(&client(endpoint))
        .await
        .expect("submission accepted");

    assert_eq!(outcome, SubmissionOutcome::Completed);
    let result = session.last_result().expect("result stored");
    assert_eq!(result.notification_requirements.len(), 2);
    assert_eq!(result.required_checklist_items().count(), 2);
    let report = noise_wizard::report::render_text(result);
    assert!(report.contains("Site signage"));
    assert!(report.contains("Not required"));
    assert!(report.contains("Complete noise impact assessment"));
}

#[tokio::test]
async fn plain_text_500_surfaces_body_and_keeps_answers() {
    let endpoint = spawn(Router::new().route("/calculate", post(raw_failure))).await;
    let mut session = session_on_review();
    let before = session.form().clone();

    let outcome = session
        .submit(&client(endpoint))
        .await
        .expect("submission accepted");

    assert_eq!(outcome, SubmissionOutcome::Failed);
    assert_eq!(session.last_error(), Some("internal error"));
    assert_eq!(session.form(), &before);
    assert!(session.is_on_review());
    assert_eq!(session.phase(), SessionPhase::Editing);
}

#[tokio::test]
async fn json_detail_is_used_as_message() {
    let (endpoint, _) = stub(
        StatusCode::UNPROCESSABLE_ENTITY,
        json!({"detail": "Unknown scenario: excavation"}),
    )
    .await;
    let request = noise_wizard::request::assemble(session_on_review().form()).expect("assembles");

    let err = client(endpoint)
        .calculate(&request)
        .await
        .expect_err("service rejects");
    match err {
        CalculationError::Service { status, message } => {
            assert_eq!(status, 422);
            assert_eq!(message, "Unknown scenario: excavation");
        }
        other => panic!("unexpected error {other:?}"),
    }
}

#[tokio::test]
async fn mismatched_success_body_is_a_decode_error() {
    let (endpoint, _) = stub(StatusCode::OK, json!({"status": "queued"})).await;
    let request = noise_wizard::request::assemble(session_on_review().form()).expect("assembles");

    let err = client(endpoint)
        .calculate(&request)
        .await
        .expect_err("body does not match");
    assert!(matches!(err, CalculationError::Decode(_)));
    assert_eq!(err.user_message(), GENERIC_TRANSPORT_FAILURE);
}

#[tokio::test]
async fn unreachable_service_is_a_transport_error() {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind ephemeral port");
    let addr = listener.local_addr().expect("local addr");
    drop(listener);

    let mut session = session_on_review();
    let outcome = session
        .submit(&client(format!("http://{addr}/calculate")))
        .await
        .expect("submission accepted");

    assert_eq!(outcome, SubmissionOutcome::Failed);
    assert_eq!(session.last_error(), Some(GENERIC_TRANSPORT_FAILURE));
}
