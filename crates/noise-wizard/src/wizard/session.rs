use super::blueprint::{StepKind, WizardBlueprint};
use super::content::{step_content, StepContent};
use super::form::{FieldUpdate, FormData};
use crate::calculation::{CalculationClient, CalculationError};
use crate::reference::ReferenceData;
use crate::report::{EstimationResult, ResultSummary};
use crate::request::{assemble, AssemblyError, EstimationRequest};
use serde::Serialize;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    Editing,
    ShowingResult,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SessionError {
    #[error("a result is being shown; restart to begin a new assessment")]
    ShowingResult,
    #[error("calculation can only be requested from the review step")]
    NotOnReview,
    #[error("a calculation is already in progress")]
    CalculationInFlight,
    #[error("there is no result to restart from")]
    NoResult,
    #[error("step '{0}' is incomplete")]
    StepIncomplete(&'static str),
    #[error(transparent)]
    Assembly(#[from] AssemblyError),
}

/// Result of a navigation call. Refusals are not errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Navigation {
    Moved { from: usize, to: usize },
    Blocked { step: usize },
    AtBoundary { step: usize },
}

/// Identifies one submission. Outcomes carrying a stale ticket are dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubmissionTicket {
    epoch: u64,
}

#[derive(Debug, Clone)]
pub struct PendingSubmission {
    pub ticket: SubmissionTicket,
    pub request: EstimationRequest,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionOutcome {
    Completed,
    Failed,
    Discarded,
}

#[derive(Debug, Clone, Serialize)]
pub struct StepHeader {
    pub ordinal: usize,
    pub kind: StepKind,
    pub title: &'static str,
    pub valid: bool,
}

/// Everything a front end needs to draw the session.
#[derive(Debug, Clone, Serialize)]
pub struct SessionView {
    pub phase: SessionPhase,
    pub current_step: usize,
    pub step_count: usize,
    pub step: StepHeader,
    pub steps: Vec<StepHeader>,
    pub content: StepContent,
    pub can_advance: bool,
    pub can_retreat: bool,
    pub can_submit: bool,
    pub calculating: bool,
    pub form: FormData,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<ResultSummary>,
}

/// One assessment: the step pointer, the answers, and the last outcome.
#[derive(Debug, Clone)]
pub struct WizardSession {
    blueprint: WizardBlueprint,
    current_step: usize,
    form: FormData,
    phase: SessionPhase,
    last_result: Option<EstimationResult>,
    last_error: Option<String>,
    epoch: u64,
    in_flight: Option<u64>,
}

impl Default for WizardSession {
    fn default() -> Self {
        Self::new(WizardBlueprint::standard())
    }
}

impl WizardSession {
    pub fn new(blueprint: WizardBlueprint) -> Self {
        Self {
            blueprint,
            current_step: 0,
            form: FormData::default(),
            phase: SessionPhase::Editing,
            last_result: None,
            last_error: None,
            epoch: 0,
            in_flight: None,
        }
    }

    pub fn blueprint(&self) -> &WizardBlueprint {
        &self.blueprint
    }

    pub fn current_step(&self) -> usize {
        self.current_step
    }

    pub fn form(&self) -> &FormData {
        &self.form
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn last_result(&self) -> Option<&EstimationResult> {
        self.last_result.as_ref()
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn is_calculating(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn is_on_review(&self) -> bool {
        self.current_step == self.blueprint.last_index()
    }

    pub fn current_step_is_valid(&self) -> bool {
        self.blueprint
            .step(self.current_step)
            .is_some_and(|step| step.is_valid(&self.form))
    }

    pub fn apply(&mut self, update: FieldUpdate) -> Result<(), SessionError> {
        self.ensure_editing()?;
        debug!(
            field = update.field_name(),
            step = self.current_step,
            "field updated"
        );
        self.form.apply(update);
        self.invalidate_in_flight();
        Ok(())
    }

    /// Replace every answer at once, e.g. from an answers file.
    pub fn load_answers(&mut self, form: FormData) -> Result<(), SessionError> {
        self.ensure_editing()?;
        self.form = form;
        self.invalidate_in_flight();
        debug!("answers loaded");
        Ok(())
    }

    /// Advance until the review step, stopping at the first incomplete step.
    pub fn advance_to_review(&mut self) -> Result<(), SessionError> {
        loop {
            match self.advance()? {
                Navigation::Moved { .. } => continue,
                Navigation::AtBoundary { .. } => return Ok(()),
                Navigation::Blocked { step } => {
                    let title = self.blueprint.step(step).map_or("unknown", |s| s.title);
                    return Err(SessionError::StepIncomplete(title));
                }
            }
        }
    }

    pub fn advance(&mut self) -> Result<Navigation, SessionError> {
        self.ensure_editing()?;
        let from = self.current_step;
        if from >= self.blueprint.last_index() {
            return Ok(Navigation::AtBoundary { step: from });
        }
        if !self.current_step_is_valid() {
            debug!(step = from, "advance refused; step incomplete");
            return Ok(Navigation::Blocked { step: from });
        }

        self.current_step = from + 1;
        self.invalidate_in_flight();
        info!(from, to = self.current_step, "wizard advanced");
        Ok(Navigation::Moved {
            from,
            to: self.current_step,
        })
    }

    pub fn retreat(&mut self) -> Result<Navigation, SessionError> {
        self.ensure_editing()?;
        let from = self.current_step;
        if from == 0 {
            return Ok(Navigation::AtBoundary { step: 0 });
        }

        self.current_step = from - 1;
        self.invalidate_in_flight();
        info!(from, to = self.current_step, "wizard retreated");
        Ok(Navigation::Moved {
            from,
            to: self.current_step,
        })
    }

    /// Validate, assemble, and mark a call as outstanding. The caller performs
    /// the call without holding the session and reports back through
    /// [`WizardSession::complete_submission`].
    pub fn begin_submission(&mut self) -> Result<PendingSubmission, SessionError> {
        self.ensure_editing()?;
        if self.in_flight.is_some() {
            return Err(SessionError::CalculationInFlight);
        }
        if !self.is_on_review() {
            return Err(SessionError::NotOnReview);
        }

        let request = match assemble(&self.form) {
            Ok(request) => request,
            Err(err) => {
                warn!(field = err.field(), error = %err, "request assembly failed");
                self.last_error = Some(err.to_string());
                return Err(err.into());
            }
        };

        self.last_error = None;
        self.in_flight = Some(self.epoch);
        info!(
            epoch = self.epoch,
            mode = request.calculation_mode.key(),
            "calculation submitted"
        );
        Ok(PendingSubmission {
            ticket: SubmissionTicket { epoch: self.epoch },
            request,
        })
    }

    pub fn complete_submission(
        &mut self,
        ticket: SubmissionTicket,
        outcome: Result<EstimationResult, CalculationError>,
    ) -> SubmissionOutcome {
        if self.in_flight != Some(ticket.epoch) {
            warn!(
                ticket = ticket.epoch,
                current = self.epoch,
                "discarding stale calculation outcome"
            );
            return SubmissionOutcome::Discarded;
        }
        self.in_flight = None;

        match outcome {
            Ok(result) => {
                info!(request_id = %result.request_id, "showing calculation result");
                self.last_result = Some(result);
                self.last_error = None;
                self.phase = SessionPhase::ShowingResult;
                SubmissionOutcome::Completed
            }
            Err(err) => {
                error!(error = %err, "calculation failed; answers kept for retry");
                self.last_error = Some(err.user_message().to_string());
                SubmissionOutcome::Failed
            }
        }
    }

    pub async fn submit(
        &mut self,
        client: &dyn CalculationClient,
    ) -> Result<SubmissionOutcome, SessionError> {
        let pending = self.begin_submission()?;
        let outcome = client.calculate(&pending.request).await;
        Ok(self.complete_submission(pending.ticket, outcome))
    }

    /// Leave the result screen and start over with empty answers.
    pub fn restart(&mut self) -> Result<(), SessionError> {
        if self.phase != SessionPhase::ShowingResult {
            return Err(SessionError::NoResult);
        }

        self.current_step = 0;
        self.form = FormData::default();
        self.phase = SessionPhase::Editing;
        self.last_result = None;
        self.last_error = None;
        self.invalidate_in_flight();
        info!("wizard restarted");
        Ok(())
    }

    pub fn view(&self, reference: &ReferenceData) -> SessionView {
        let steps: Vec<StepHeader> = self
            .blueprint
            .visible_steps(&self.form)
            .map(|step| StepHeader {
                ordinal: step.ordinal,
                kind: step.kind,
                title: step.title,
                valid: step.is_valid(&self.form),
            })
            .collect();

        let current = self
            .blueprint
            .step(self.current_step)
            .map(|step| StepHeader {
                ordinal: step.ordinal,
                kind: step.kind,
                title: step.title,
                valid: step.is_valid(&self.form),
            })
            .unwrap_or(StepHeader {
                ordinal: self.current_step,
                kind: StepKind::Review,
                title: "",
                valid: false,
            });

        let editing = self.phase == SessionPhase::Editing;
        SessionView {
            phase: self.phase,
            current_step: self.current_step,
            step_count: self.blueprint.len(),
            content: step_content(current.kind, &self.form, reference),
            can_advance: editing && !self.is_on_review() && current.valid,
            can_retreat: editing && self.current_step > 0,
            can_submit: editing && self.is_on_review() && self.in_flight.is_none(),
            calculating: self.in_flight.is_some(),
            form: self.form.clone(),
            error: self.last_error.clone(),
            result: self.last_result.as_ref().map(ResultSummary::from_result),
            step: current,
            steps,
        }
    }

    fn ensure_editing(&self) -> Result<(), SessionError> {
        match self.phase {
            SessionPhase::Editing => Ok(()),
            SessionPhase::ShowingResult => Err(SessionError::ShowingResult),
        }
    }

    fn invalidate_in_flight(&mut self) {
        self.epoch += 1;
        if let Some(stale) = self.in_flight.take() {
            debug!(ticket = stale, "outstanding calculation invalidated");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wizard::domain::{
        AssessmentType, CalculationMode, EnvironmentApproach, PropagationType, TimePeriod,
    };

    fn filled_session() -> WizardSession {
        let mut session = WizardSession::default();
        for update in [
            FieldUpdate::AssessmentType(Some(AssessmentType::DistanceBased)),
            FieldUpdate::CalculationMode(Some(CalculationMode::Scenario)),
            FieldUpdate::EnvironmentApproach(Some(
                EnvironmentApproach::RepresentativeNoiseEnvironment,
            )),
            FieldUpdate::TimePeriod(Some(TimePeriod::Day)),
            FieldUpdate::PropagationType(Some(PropagationType::Rural)),
            FieldUpdate::NoiseCategoryId(Some("R1".to_string())),
            FieldUpdate::ScenarioId(Some("excavation".to_string())),
            FieldUpdate::ReceiverDistance(Some("100".to_string())),
        ] {
            session.apply(update).expect("editing accepts updates");
        }
        while !session.is_on_review() {
            let moved = session.advance().expect("editing allows advance");
            assert!(matches!(moved, Navigation::Moved { .. }));
        }
        session
    }

    fn sample_result() -> EstimationResult {
        serde_json::from_value(serde_json::json!({
            "request_id": "req-7",
            "predicted_level_db": 61.0,
            "background_db": 45.0,
            "nml_db": 55.0,
            "exceed_background_db": 16.0,
            "exceed_nml_db": 6.0,
            "impact_band": "AFFECTED"
        }))
        .expect("sample result parses")
    }

    fn service_failure(message: &str) -> CalculationError {
        CalculationError::Service {
            status: 500,
            message: message.to_string(),
        }
    }

    #[test]
    fn advance_is_refused_while_step_invalid() {
        let mut session = WizardSession::default();
        assert_eq!(
            session.advance().expect("editing"),
            Navigation::Blocked { step: 0 }
        );
        assert_eq!(session.current_step(), 0);
    }

    #[test]
    fn retreat_at_first_step_is_a_no_op() {
        let mut session = WizardSession::default();
        assert_eq!(
            session.retreat().expect("editing"),
            Navigation::AtBoundary { step: 0 }
        );
        assert_eq!(session.current_step(), 0);
    }

    #[test]
    fn advance_at_review_is_a_no_op() {
        let mut session = filled_session();
        let last = session.blueprint().last_index();
        assert_eq!(
            session.advance().expect("editing"),
            Navigation::AtBoundary { step: last }
        );
        assert_eq!(session.current_step(), last);
    }

    #[test]
    fn submission_requires_the_review_step() {
        let mut session = WizardSession::default();
        assert_eq!(
            session.begin_submission().expect_err("not on review"),
            SessionError::NotOnReview
        );
    }

    #[test]
    fn failed_calculation_keeps_answers_for_retry() {
        let mut session = filled_session();
        let before = session.form().clone();

        let pending = session.begin_submission().expect("submission starts");
        assert!(session.is_calculating());
        let outcome =
            session.complete_submission(pending.ticket, Err(service_failure("internal error")));

        assert_eq!(outcome, SubmissionOutcome::Failed);
        assert_eq!(session.last_error(), Some("internal error"));
        assert_eq!(session.form(), &before);
        assert_eq!(session.phase(), SessionPhase::Editing);
        assert!(session.is_on_review());
        assert!(session.begin_submission().is_ok(), "retry is allowed");
    }

    #[test]
    fn second_submission_is_rejected_while_in_flight() {
        let mut session = filled_session();
        session.begin_submission().expect("first submission");
        assert_eq!(
            session.begin_submission().expect_err("already in flight"),
            SessionError::CalculationInFlight
        );
    }

    #[test]
    fn outcome_after_retreat_is_discarded() {
        let mut session = filled_session();
        let pending = session.begin_submission().expect("submission starts");
        session.retreat().expect("editing");

        let outcome = session.complete_submission(pending.ticket, Ok(sample_result()));
        assert_eq!(outcome, SubmissionOutcome::Discarded);
        assert!(session.last_result().is_none());
        assert_eq!(session.phase(), SessionPhase::Editing);
        assert!(!session.is_calculating());
    }

    #[test]
    fn result_phase_only_accepts_restart() {
        let mut session = filled_session();
        let pending = session.begin_submission().expect("submission starts");
        let outcome = session.complete_submission(pending.ticket, Ok(sample_result()));
        assert_eq!(outcome, SubmissionOutcome::Completed);
        assert_eq!(session.phase(), SessionPhase::ShowingResult);

        assert_eq!(session.advance(), Err(SessionError::ShowingResult));
        assert_eq!(session.retreat(), Err(SessionError::ShowingResult));
        assert_eq!(
            session.apply(FieldUpdate::IncludeTrace(false)),
            Err(SessionError::ShowingResult)
        );

        session.restart().expect("restart from result");
        assert_eq!(session.current_step(), 0);
        assert_eq!(session.form(), &FormData::default());
        assert!(session.form().include_trace);
        assert!(session.last_result().is_none());
        assert_eq!(session.restart(), Err(SessionError::NoResult));
    }

    #[test]
    fn assembly_errors_are_attached_and_block_the_call() {
        let mut session = WizardSession::default();
        for update in [
            FieldUpdate::AssessmentType(Some(AssessmentType::FullEstimator)),
            FieldUpdate::CalculationMode(Some(CalculationMode::IndividualPlant)),
            FieldUpdate::EnvironmentApproach(Some(
                EnvironmentApproach::RepresentativeNoiseEnvironment,
            )),
            FieldUpdate::TimePeriod(Some(TimePeriod::Night)),
            FieldUpdate::PropagationType(Some(PropagationType::Urban)),
            FieldUpdate::NoiseCategoryId(Some("U2".to_string())),
            FieldUpdate::ReceiverDistance(Some("far".to_string())),
        ] {
            session.apply(update).expect("editing");
        }
        while !session.is_on_review() {
            session.advance().expect("editing");
        }

        let err = session.begin_submission().expect_err("distance is not numeric");
        assert!(matches!(
            err,
            SessionError::Assembly(AssemblyError::InvalidNumber { .. })
        ));
        assert!(session.last_error().is_some());
        assert!(!session.is_calculating());
    }

    #[test]
    fn advance_to_review_names_the_first_incomplete_step() {
        let mut session = WizardSession::default();
        let mut form = filled_session().form().clone();
        form.time_period = None;
        session.load_answers(form).expect("editing");

        assert_eq!(
            session.advance_to_review(),
            Err(SessionError::StepIncomplete("Time Period"))
        );
        assert_eq!(session.current_step(), 3);

        session
            .apply(FieldUpdate::TimePeriod(Some(TimePeriod::Evening)))
            .expect("editing");
        session.advance_to_review().expect("remaining steps complete");
        assert!(session.is_on_review());
    }

    #[test]
    fn view_reports_navigation_affordances() {
        let session = filled_session();
        let view = session.view(&ReferenceData::default());
        assert_eq!(view.step_count, 9);
        assert_eq!(view.step.kind, StepKind::Review);
        assert!(!view.can_advance);
        assert!(view.can_retreat);
        assert!(view.can_submit);
        assert!(matches!(view.content, StepContent::Review { .. }));
        assert!(view.result.is_none());
    }
}
