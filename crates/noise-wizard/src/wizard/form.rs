use serde::{Deserialize, Deserializer, Serialize};

use super::domain::{
    AssessmentType, CalculationMode, EnvironmentApproach, OutputPack, PropagationType, TimePeriod,
};

/// Answers accumulated over one assessment session.
///
/// Numeric inputs keep the text the user entered; they are only parsed when a
/// request is assembled so a bad value can never be coerced silently.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FormData {
    pub assessment_type: Option<AssessmentType>,
    pub calculation_mode: Option<CalculationMode>,
    pub environment_approach: Option<EnvironmentApproach>,
    pub time_period: Option<TimePeriod>,
    pub propagation_type: Option<PropagationType>,
    #[serde(deserialize_with = "deserialize_optional_text")]
    pub noise_category_id: Option<String>,
    #[serde(deserialize_with = "deserialize_optional_text")]
    pub scenario_id: Option<String>,
    #[serde(deserialize_with = "deserialize_optional_text")]
    pub receiver_distance: Option<String>,
    #[serde(deserialize_with = "deserialize_optional_text")]
    pub user_background_level: Option<String>,
    pub include_trace: bool,
    pub output_pack: Option<OutputPack>,
}

impl Default for FormData {
    fn default() -> Self {
        Self {
            assessment_type: None,
            calculation_mode: None,
            environment_approach: None,
            time_period: None,
            propagation_type: None,
            noise_category_id: None,
            scenario_id: None,
            receiver_distance: None,
            user_background_level: None,
            include_trace: true,
            output_pack: None,
        }
    }
}

impl FormData {
    pub fn apply(&mut self, update: FieldUpdate) {
        match update {
            FieldUpdate::AssessmentType(value) => self.assessment_type = value,
            FieldUpdate::CalculationMode(value) => self.calculation_mode = value,
            FieldUpdate::EnvironmentApproach(value) => self.environment_approach = value,
            FieldUpdate::TimePeriod(value) => self.time_period = value,
            FieldUpdate::PropagationType(value) => self.propagation_type = value,
            FieldUpdate::NoiseCategoryId(value) => self.noise_category_id = normalize_text(value),
            FieldUpdate::ScenarioId(value) => self.scenario_id = normalize_text(value),
            FieldUpdate::ReceiverDistance(value) => self.receiver_distance = normalize_text(value),
            FieldUpdate::UserBackgroundLevel(value) => {
                self.user_background_level = normalize_text(value)
            }
            FieldUpdate::IncludeTrace(value) => self.include_trace = value,
            FieldUpdate::OutputPack(value) => self.output_pack = value,
        }
    }

    /// The catalog id chosen on the work-selection step, if the mode stores one.
    pub fn work_selection(&self) -> Option<&str> {
        match self.calculation_mode {
            Some(mode) if mode.requires_selection() => self.scenario_id.as_deref(),
            _ => None,
        }
    }
}

/// A single-field edit. Every input event on the wizard maps to one of these.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "field", content = "value", rename_all = "snake_case")]
pub enum FieldUpdate {
    AssessmentType(Option<AssessmentType>),
    CalculationMode(Option<CalculationMode>),
    EnvironmentApproach(Option<EnvironmentApproach>),
    TimePeriod(Option<TimePeriod>),
    PropagationType(Option<PropagationType>),
    NoiseCategoryId(Option<String>),
    ScenarioId(Option<String>),
    ReceiverDistance(Option<String>),
    UserBackgroundLevel(Option<String>),
    IncludeTrace(bool),
    OutputPack(Option<OutputPack>),
}

impl FieldUpdate {
    pub const fn field_name(&self) -> &'static str {
        match self {
            Self::AssessmentType(_) => "assessment_type",
            Self::CalculationMode(_) => "calculation_mode",
            Self::EnvironmentApproach(_) => "environment_approach",
            Self::TimePeriod(_) => "time_period",
            Self::PropagationType(_) => "propagation_type",
            Self::NoiseCategoryId(_) => "noise_category_id",
            Self::ScenarioId(_) => "scenario_id",
            Self::ReceiverDistance(_) => "receiver_distance",
            Self::UserBackgroundLevel(_) => "user_background_level",
            Self::IncludeTrace(_) => "include_trace",
            Self::OutputPack(_) => "output_pack",
        }
    }
}

fn normalize_text(value: Option<String>) -> Option<String> {
    value
        .map(|raw| raw.trim().to_string())
        .filter(|trimmed| !trimmed.is_empty())
}

#[derive(Deserialize)]
#[serde(untagged)]
enum TextOrNumber {
    Text(String),
    Number(serde_json::Number),
}

/// Accepts a string or a bare JSON number so answer files may write `150.5`
/// as well as `"150.5"`. Blank strings become `None`.
fn deserialize_optional_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<TextOrNumber>::deserialize(deserializer)?;
    Ok(normalize_text(raw.map(|value| match value {
        TextOrNumber::Text(text) => text,
        TextOrNumber::Number(number) => number.to_string(),
    })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_form_is_empty_with_trace_enabled() {
        let form = FormData::default();
        assert!(form.assessment_type.is_none());
        assert!(form.receiver_distance.is_none());
        assert!(form.include_trace);
    }

    #[test]
    fn blank_text_updates_clear_the_field() {
        let mut form = FormData::default();
        form.apply(FieldUpdate::ReceiverDistance(Some(" 120 ".to_string())));
        assert_eq!(form.receiver_distance.as_deref(), Some("120"));

        form.apply(FieldUpdate::ReceiverDistance(Some("   ".to_string())));
        assert!(form.receiver_distance.is_none());
    }

    #[test]
    fn field_updates_decode_from_tagged_json() {
        let update: FieldUpdate =
            serde_json::from_str(r#"{"field":"time_period","value":"night"}"#)
                .expect("update decodes");
        assert_eq!(update, FieldUpdate::TimePeriod(Some(TimePeriod::Night)));
        assert_eq!(update.field_name(), "time_period");
    }

    #[test]
    fn answers_accept_numbers_and_default_missing_fields() {
        let form: FormData = serde_json::from_str(
            r#"{"assessment_type":"full_estimator","receiver_distance":150.5,"scenario_id":""}"#,
        )
        .expect("answers decode");
        assert_eq!(form.receiver_distance.as_deref(), Some("150.5"));
        assert!(form.scenario_id.is_none());
        assert!(form.include_trace);
    }

    #[test]
    fn work_selection_ignores_stored_id_for_individual_plant() {
        let mut form = FormData::default();
        form.apply(FieldUpdate::ScenarioId(Some("excavator".to_string())));
        form.apply(FieldUpdate::CalculationMode(Some(
            CalculationMode::IndividualPlant,
        )));
        assert_eq!(form.work_selection(), None);

        form.apply(FieldUpdate::CalculationMode(Some(CalculationMode::NoisiestPlant)));
        assert_eq!(form.work_selection(), Some("excavator"));
    }
}
