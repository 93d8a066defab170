//! Guided intake: the answer model, the step blueprint, per-step content, and
//! the session state machine that ties them together.

pub mod blueprint;
pub mod content;
pub mod domain;
pub mod form;
pub mod session;

pub use blueprint::{StepKind, WizardBlueprint, WizardStep};
pub use content::{step_content, StepContent};
pub use form::{FieldUpdate, FormData};
pub use session::{
    Navigation, PendingSubmission, SessionError, SessionPhase, SessionView, SubmissionOutcome,
    SubmissionTicket, WizardSession,
};
