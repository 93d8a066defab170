use serde::Serialize;

use super::form::FormData;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepKind {
    AssessmentType,
    CalculationMode,
    Environment,
    TimePeriod,
    Propagation,
    LocationType,
    WorkSelection,
    Distance,
    Review,
}

/// Immutable descriptor for one wizard page.
#[derive(Debug, Clone, Copy)]
pub struct WizardStep {
    pub ordinal: usize,
    pub kind: StepKind,
    pub title: &'static str,
    visible: fn(&FormData) -> bool,
    valid: fn(&FormData) -> bool,
}

impl WizardStep {
    pub fn is_visible(&self, form: &FormData) -> bool {
        (self.visible)(form)
    }

    /// Whether the answers allow moving past this step.
    pub fn is_valid(&self, form: &FormData) -> bool {
        (self.valid)(form)
    }
}

#[derive(Debug, Clone)]
pub struct WizardBlueprint {
    steps: Vec<WizardStep>,
}

impl WizardBlueprint {
    pub fn standard() -> Self {
        Self {
            steps: standard_steps(),
        }
    }

    pub fn steps(&self) -> &[WizardStep] {
        &self.steps
    }

    pub fn step(&self, index: usize) -> Option<&WizardStep> {
        self.steps.get(index)
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn last_index(&self) -> usize {
        self.steps.len().saturating_sub(1)
    }

    pub fn visible_steps<'a>(
        &'a self,
        form: &'a FormData,
    ) -> impl Iterator<Item = &'a WizardStep> + 'a {
        self.steps.iter().filter(move |step| step.is_visible(form))
    }
}

fn always(_: &FormData) -> bool {
    true
}

fn work_selection_complete(form: &FormData) -> bool {
    match form.calculation_mode {
        Some(mode) if mode.requires_selection() => form.scenario_id.is_some(),
        _ => true,
    }
}

fn standard_steps() -> Vec<WizardStep> {
    vec![
        WizardStep {
            ordinal: 0,
            kind: StepKind::AssessmentType,
            title: "Assessment Type",
            visible: always,
            valid: |form| form.assessment_type.is_some(),
        },
        WizardStep {
            ordinal: 1,
            kind: StepKind::CalculationMode,
            title: "Calculation Mode",
            visible: always,
            valid: |form| form.calculation_mode.is_some(),
        },
        WizardStep {
            ordinal: 2,
            kind: StepKind::Environment,
            title: "Environment",
            visible: always,
            valid: |form| form.environment_approach.is_some(),
        },
        WizardStep {
            ordinal: 3,
            kind: StepKind::TimePeriod,
            title: "Time Period",
            visible: always,
            valid: |form| form.time_period.is_some(),
        },
        WizardStep {
            ordinal: 4,
            kind: StepKind::Propagation,
            title: "Propagation",
            visible: always,
            valid: |form| form.propagation_type.is_some(),
        },
        WizardStep {
            ordinal: 5,
            kind: StepKind::LocationType,
            title: "Location Type",
            visible: always,
            valid: |form| form.noise_category_id.is_some(),
        },
        WizardStep {
            ordinal: 6,
            kind: StepKind::WorkSelection,
            title: "Work Scenario",
            visible: always,
            valid: work_selection_complete,
        },
        WizardStep {
            ordinal: 7,
            kind: StepKind::Distance,
            title: "Distance",
            visible: always,
            valid: |form| form.receiver_distance.is_some(),
        },
        WizardStep {
            ordinal: 8,
            kind: StepKind::Review,
            title: "Review & Calculate",
            visible: always,
            valid: always,
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wizard::domain::CalculationMode;
    use crate::wizard::form::FieldUpdate;

    #[test]
    fn standard_blueprint_orders_nine_steps() {
        let blueprint = WizardBlueprint::standard();
        assert_eq!(blueprint.len(), 9);
        for (index, step) in blueprint.steps().iter().enumerate() {
            assert_eq!(step.ordinal, index);
        }
        assert_eq!(blueprint.step(8).map(|step| step.kind), Some(StepKind::Review));
        assert_eq!(blueprint.visible_steps(&FormData::default()).count(), 9);
    }

    #[test]
    fn work_selection_is_only_required_for_catalog_modes() {
        let blueprint = WizardBlueprint::standard();
        let step = blueprint.step(6).expect("work selection step");
        let mut form = FormData::default();
        assert!(step.is_valid(&form), "unset mode has nothing to select");

        form.apply(FieldUpdate::CalculationMode(Some(CalculationMode::Scenario)));
        assert!(!step.is_valid(&form));
        form.apply(FieldUpdate::CalculationMode(Some(CalculationMode::NoisiestPlant)));
        assert!(!step.is_valid(&form));
        form.apply(FieldUpdate::CalculationMode(Some(
            CalculationMode::IndividualPlant,
        )));
        assert!(step.is_valid(&form));

        form.apply(FieldUpdate::CalculationMode(Some(CalculationMode::NoisiestPlant)));
        form.apply(FieldUpdate::ScenarioId(Some("breaker".to_string())));
        assert!(step.is_valid(&form));
    }

    #[test]
    fn review_step_is_always_valid() {
        let blueprint = WizardBlueprint::standard();
        let review = blueprint.step(blueprint.last_index()).expect("review step");
        assert!(review.is_valid(&FormData::default()));
    }
}
