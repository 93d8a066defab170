//! Normalises wizard answers into the body sent to the calculation service.

use serde::{Deserialize, Serialize};

use crate::wizard::domain::{
    AssessmentType, CalculationMode, EnvironmentApproach, OutputPack, PropagationType, TimePeriod,
};
use crate::wizard::form::FormData;

/// Wire body for one calculation. Conditional fields are omitted, never `null`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EstimationRequest {
    pub assessment_type: AssessmentType,
    pub calculation_mode: CalculationMode,
    pub environment_approach: EnvironmentApproach,
    pub time_period: TimePeriod,
    pub propagation_type: PropagationType,
    pub noise_category_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scenario_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plant_ids: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receiver_distance: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_background_level: Option<f64>,
    #[serde(default)]
    pub include_trace: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_pack: Option<OutputPack>,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AssemblyError {
    #[error("{0} is required before calculating")]
    MissingField(&'static str),
    #[error("{field} must be a number, got '{value}'")]
    InvalidNumber { field: &'static str, value: String },
    #[error("{field} must be greater than zero, got {value}")]
    NotPositive { field: &'static str, value: f64 },
}

impl AssemblyError {
    pub const fn field(&self) -> &'static str {
        match self {
            Self::MissingField(field) => field,
            Self::InvalidNumber { field, .. } | Self::NotPositive { field, .. } => field,
        }
    }
}

/// Build the request for `form`. Pure: the same answers always give the same request.
///
/// `receiver_distance` is sent only for full estimator assessments,
/// `user_background_level` only for user supplied backgrounds, and
/// `scenario_id` only in scenario mode. In noisiest plant mode the plant chosen
/// on the work-selection step travels as a single-entry `plant_ids`.
pub fn assemble(form: &FormData) -> Result<EstimationRequest, AssemblyError> {
    let assessment_type = required(form.assessment_type, "assessment_type")?;
    let calculation_mode = required(form.calculation_mode, "calculation_mode")?;
    let environment_approach = required(form.environment_approach, "environment_approach")?;
    let time_period = required(form.time_period, "time_period")?;
    let propagation_type = required(form.propagation_type, "propagation_type")?;
    let noise_category_id = required(form.noise_category_id.clone(), "noise_category_id")?;

    let (scenario_id, plant_ids) = match calculation_mode {
        CalculationMode::Scenario => (
            Some(required(form.scenario_id.clone(), "scenario_id")?),
            None,
        ),
        CalculationMode::NoisiestPlant => (
            None,
            Some(vec![required(form.scenario_id.clone(), "scenario_id")?]),
        ),
        CalculationMode::IndividualPlant => (None, None),
    };

    let receiver_distance = match assessment_type {
        AssessmentType::FullEstimator => {
            let raw = required(form.receiver_distance.as_deref(), "receiver_distance")?;
            let distance = parse_number(raw, "receiver_distance")?;
            if distance <= 0.0 {
                return Err(AssemblyError::NotPositive {
                    field: "receiver_distance",
                    value: distance,
                });
            }
            Some(distance)
        }
        AssessmentType::DistanceBased => None,
    };

    let user_background_level = match environment_approach {
        EnvironmentApproach::UserSuppliedBackgroundLevel => {
            let raw = required(
                form.user_background_level.as_deref(),
                "user_background_level",
            )?;
            Some(parse_number(raw, "user_background_level")?)
        }
        EnvironmentApproach::RepresentativeNoiseEnvironment => None,
    };

    Ok(EstimationRequest {
        assessment_type,
        calculation_mode,
        environment_approach,
        time_period,
        propagation_type,
        noise_category_id,
        scenario_id,
        plant_ids,
        receiver_distance,
        user_background_level,
        include_trace: form.include_trace,
        output_pack: form.output_pack,
    })
}

fn required<T>(value: Option<T>, field: &'static str) -> Result<T, AssemblyError> {
    value.ok_or(AssemblyError::MissingField(field))
}

/// Strict decimal parse: surrounding whitespace is allowed, anything else that
/// is not a finite number is rejected.
fn parse_number(raw: &str, field: &'static str) -> Result<f64, AssemblyError> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
        .ok_or_else(|| AssemblyError::InvalidNumber {
            field,
            value: raw.to_string(),
        })
}
