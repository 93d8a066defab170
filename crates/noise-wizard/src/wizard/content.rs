use super::blueprint::StepKind;
use super::domain::{
    noise_category, AssessmentType, CalculationMode, EnvironmentApproach, PropagationType,
    TimePeriod, NOISE_CATEGORIES,
};
use super::form::FormData;
use crate::reference::{
    group_plants, group_scenarios, GuidanceEntry, GuidanceSections, ReferenceData,
};
use serde::Serialize;
use std::collections::BTreeMap;

pub const DISTANCE_GUIDELINES: [&str; 4] = [
    "Measure to the nearest residential property",
    "Include any horizontal distance barriers",
    "Consider the closest window or outdoor living area",
    "For apartments, measure to the nearest affected unit",
];

#[derive(Debug, Clone, Serialize)]
pub struct ChoiceOption {
    pub key: &'static str,
    pub title: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub when_to_use: Option<String>,
    pub selected: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct LocationOption {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub day_nml_db: f64,
    pub evening_nml_db: f64,
    pub night_nml_db: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub typical_background: Option<String>,
    pub selected: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct CatalogEntryView {
    pub id: String,
    pub name: String,
    pub detail: String,
    pub selected: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct CatalogGroupView {
    pub label: String,
    pub entries: Vec<CatalogEntryView>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReviewLine {
    pub label: &'static str,
    pub value: String,
}

/// What a step offers, derived from the answers so far and the reference tables.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StepContent {
    Choice {
        field: &'static str,
        options: Vec<ChoiceOption>,
        degraded: bool,
    },
    Location {
        options: Vec<LocationOption>,
    },
    ScenarioCatalog {
        groups: Vec<CatalogGroupView>,
        degraded: bool,
    },
    PlantCatalog {
        groups: Vec<CatalogGroupView>,
        degraded: bool,
    },
    NoSelection {
        reason: &'static str,
    },
    Distance {
        receiver_distance: Option<String>,
        distance_used: bool,
        asks_background_level: bool,
        user_background_level: Option<String>,
        guidelines: &'static [&'static str],
    },
    Review {
        summary: Vec<ReviewLine>,
    },
}

impl StepContent {
    pub fn is_degraded(&self) -> bool {
        match self {
            Self::Choice { degraded, .. }
            | Self::ScenarioCatalog { degraded, .. }
            | Self::PlantCatalog { degraded, .. } => *degraded,
            _ => false,
        }
    }
}

pub fn step_content(kind: StepKind, form: &FormData, reference: &ReferenceData) -> StepContent {
    let sections = reference.guidance().map(|guidance| &guidance.guidance);
    let degraded = sections.is_none();

    match kind {
        StepKind::AssessmentType => choice(
            "assessment_type",
            AssessmentType::ordered(),
            AssessmentType::key,
            AssessmentType::label,
            form.assessment_type,
            sections.map(|s| &s.assessment_types),
            degraded,
        ),
        StepKind::CalculationMode => choice(
            "calculation_mode",
            CalculationMode::ordered(),
            CalculationMode::key,
            CalculationMode::label,
            form.calculation_mode,
            sections.map(|s| &s.calculation_modes),
            degraded,
        ),
        StepKind::Environment => choice(
            "environment_approach",
            EnvironmentApproach::ordered(),
            EnvironmentApproach::key,
            EnvironmentApproach::label,
            form.environment_approach,
            sections.map(|s| &s.environment_approaches),
            degraded,
        ),
        StepKind::TimePeriod => choice(
            "time_period",
            TimePeriod::ordered(),
            TimePeriod::key,
            TimePeriod::label,
            form.time_period,
            sections.map(|s| &s.time_periods),
            degraded,
        ),
        StepKind::Propagation => choice(
            "propagation_type",
            PropagationType::ordered(),
            PropagationType::key,
            PropagationType::label,
            form.propagation_type,
            sections.map(|s| &s.propagation_types),
            degraded,
        ),
        StepKind::LocationType => location(form, sections),
        StepKind::WorkSelection => work_selection(form, reference),
        StepKind::Distance => StepContent::Distance {
            receiver_distance: form.receiver_distance.clone(),
            distance_used: form.assessment_type == Some(AssessmentType::FullEstimator),
            asks_background_level: form.environment_approach
                == Some(EnvironmentApproach::UserSuppliedBackgroundLevel),
            user_background_level: form.user_background_level.clone(),
            guidelines: &DISTANCE_GUIDELINES,
        },
        StepKind::Review => StepContent::Review {
            summary: review_summary(form, reference),
        },
    }
}

fn choice<T: Copy + PartialEq, const N: usize>(
    field: &'static str,
    options: [T; N],
    key: fn(T) -> &'static str,
    label: fn(T) -> &'static str,
    selected: Option<T>,
    section: Option<&BTreeMap<String, GuidanceEntry>>,
    degraded: bool,
) -> StepContent {
    let options = options
        .into_iter()
        .map(|option| {
            let entry = section.and_then(|entries| entries.get(key(option)));
            ChoiceOption {
                key: key(option),
                title: entry
                    .map(|entry| entry.title.as_str())
                    .filter(|title| !title.is_empty())
                    .unwrap_or(label(option))
                    .to_string(),
                description: entry
                    .map(|entry| entry.description.clone())
                    .unwrap_or_default(),
                when_to_use: entry
                    .map(|entry| entry.when_to_use.clone())
                    .filter(|text| !text.is_empty()),
                selected: selected == Some(option),
            }
        })
        .collect();

    StepContent::Choice {
        field,
        options,
        degraded,
    }
}

fn location(form: &FormData, sections: Option<&GuidanceSections>) -> StepContent {
    let options = NOISE_CATEGORIES
        .iter()
        .map(|category| LocationOption {
            id: category.id,
            name: category.name,
            description: category.description,
            day_nml_db: category.day_nml_db,
            evening_nml_db: category.evening_nml_db,
            night_nml_db: category.night_nml_db,
            typical_background: sections
                .and_then(|s| s.noise_categories.get(category.id))
                .and_then(|entry| entry.typical_background.clone()),
            selected: form.noise_category_id.as_deref() == Some(category.id),
        })
        .collect();

    StepContent::Location { options }
}

fn work_selection(form: &FormData, reference: &ReferenceData) -> StepContent {
    let selected = form.scenario_id.as_deref();

    match form.calculation_mode {
        Some(CalculationMode::Scenario) => StepContent::ScenarioCatalog {
            groups: group_scenarios(reference.scenarios())
                .into_iter()
                .map(|group| CatalogGroupView {
                    label: group.label,
                    entries: group
                        .entries
                        .into_iter()
                        .map(|scenario| CatalogEntryView {
                            id: scenario.id.clone(),
                            name: scenario.name.clone(),
                            detail: if scenario.description.is_empty() {
                                scenario
                                    .loudest_equipment()
                                    .map(|(name, level)| format!("loudest: {name} {level:.0} dB"))
                                    .unwrap_or_default()
                            } else {
                                scenario.description.clone()
                            },
                            selected: selected == Some(scenario.id.as_str()),
                        })
                        .collect(),
                })
                .collect(),
            degraded: reference.scenarios().is_empty(),
        },
        Some(CalculationMode::NoisiestPlant) => StepContent::PlantCatalog {
            groups: group_plants(reference.plants())
                .into_iter()
                .map(|group| CatalogGroupView {
                    label: group.label,
                    entries: group
                        .entries
                        .into_iter()
                        .map(|plant| CatalogEntryView {
                            id: plant.id.clone(),
                            name: plant.name.clone(),
                            detail: format!(
                                "{:.0} dB(A), duty cycle {:.0}%",
                                plant.sound_power_level,
                                plant.duty_cycle * 100.0
                            ),
                            selected: selected == Some(plant.id.as_str()),
                        })
                        .collect(),
                })
                .collect(),
            degraded: reference.plants().is_empty(),
        },
        Some(CalculationMode::IndividualPlant) => StepContent::NoSelection {
            reason: "Individual plant selection needs no catalog choice here",
        },
        None => StepContent::NoSelection {
            reason: "Choose a calculation mode first",
        },
    }
}

const NOT_SET: &str = "Not set";

fn titled(
    section: Option<&BTreeMap<String, GuidanceEntry>>,
    key: Option<&'static str>,
    label: Option<&'static str>,
) -> String {
    let Some(key) = key else {
        return NOT_SET.to_string();
    };
    section
        .and_then(|entries| entries.get(key))
        .map(|entry| entry.title.clone())
        .filter(|title| !title.is_empty())
        .or_else(|| label.map(str::to_string))
        .unwrap_or_else(|| key.to_string())
}

/// Human readable recap of every answer, resolving catalog ids to names.
pub fn review_summary(form: &FormData, reference: &ReferenceData) -> Vec<ReviewLine> {
    let sections = reference.guidance().map(|guidance| &guidance.guidance);
    let mut lines = vec![
        ReviewLine {
            label: "Assessment Type",
            value: titled(
                sections.map(|s| &s.assessment_types),
                form.assessment_type.map(AssessmentType::key),
                form.assessment_type.map(AssessmentType::label),
            ),
        },
        ReviewLine {
            label: "Calculation Mode",
            value: titled(
                sections.map(|s| &s.calculation_modes),
                form.calculation_mode.map(CalculationMode::key),
                form.calculation_mode.map(CalculationMode::label),
            ),
        },
        ReviewLine {
            label: "Environment",
            value: titled(
                sections.map(|s| &s.environment_approaches),
                form.environment_approach.map(EnvironmentApproach::key),
                form.environment_approach.map(EnvironmentApproach::label),
            ),
        },
        ReviewLine {
            label: "Time Period",
            value: titled(
                sections.map(|s| &s.time_periods),
                form.time_period.map(TimePeriod::key),
                form.time_period.map(TimePeriod::label),
            ),
        },
        ReviewLine {
            label: "Propagation",
            value: titled(
                sections.map(|s| &s.propagation_types),
                form.propagation_type.map(PropagationType::key),
                form.propagation_type.map(PropagationType::label),
            ),
        },
        ReviewLine {
            label: "Location Type",
            value: match form.noise_category_id.as_deref() {
                Some(id) => match noise_category(id) {
                    Some(category) => format!("{} ({})", category.name, category.id),
                    None => id.to_string(),
                },
                None => NOT_SET.to_string(),
            },
        },
    ];

    if let Some(selection) = form.work_selection() {
        let (label, name) = match form.calculation_mode {
            Some(CalculationMode::NoisiestPlant) => (
                "Noisiest Plant",
                reference.plant(selection).map(|plant| plant.name.clone()),
            ),
            _ => (
                "Scenario",
                reference
                    .scenario(selection)
                    .map(|scenario| scenario.name.clone()),
            ),
        };
        lines.push(ReviewLine {
            label,
            value: name.unwrap_or_else(|| selection.to_string()),
        });
    }

    lines.push(ReviewLine {
        label: "Distance",
        value: form
            .receiver_distance
            .as_deref()
            .map_or_else(|| NOT_SET.to_string(), |distance| format!("{distance} meters")),
    });

    if form.environment_approach == Some(EnvironmentApproach::UserSuppliedBackgroundLevel) {
        lines.push(ReviewLine {
            label: "Background Level",
            value: form
                .user_background_level
                .as_deref()
                .map_or_else(|| NOT_SET.to_string(), |level| format!("{level} dB")),
        });
    }

    lines.push(ReviewLine {
        label: "Calculation Trace",
        value: if form.include_trace { "Included" } else { "Omitted" }.to_string(),
    });

    if let Some(pack) = form.output_pack {
        lines.push(ReviewLine {
            label: "Output Packs",
            value: pack.label().to_string(),
        });
    }

    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reference::{Plant, Scenario, WizardGuidance};
    use crate::wizard::form::FieldUpdate;

    fn reference() -> ReferenceData {
        let guidance: WizardGuidance = serde_json::from_value(serde_json::json!({
            "guidance": {
                "calculation_modes": {
                    "scenario": {"title": "Scenario Based", "description": "Predefined activities"}
                }
            }
        }))
        .expect("guidance parses");

        let scenarios = vec![Scenario {
            id: "excavation".to_string(),
            name: "Excavation".to_string(),
            description: String::new(),
            category: None,
            sound_power_levels: [("excavator".to_string(), 105.0)].into_iter().collect(),
        }];
        let plants = vec![Plant {
            id: "rock_breaker".to_string(),
            name: "Rock Breaker".to_string(),
            description: String::new(),
            category: "Demolition".to_string(),
            sound_power_level: 118.0,
            duty_cycle: 0.5,
            usage_factor: 0.8,
        }];
        ReferenceData::from_parts(Some(guidance), scenarios, plants)
    }

    #[test]
    fn choice_titles_prefer_guidance_and_fall_back_to_labels() {
        let mut form = FormData::default();
        form.apply(FieldUpdate::CalculationMode(Some(CalculationMode::Scenario)));

        let content = step_content(StepKind::CalculationMode, &form, &reference());
        let StepContent::Choice { options, degraded, .. } = content else {
            panic!("calculation mode step offers choices");
        };
        assert!(!degraded);
        assert_eq!(options[0].title, "Scenario Based");
        assert!(options[0].selected);
        assert_eq!(options[1].title, CalculationMode::NoisiestPlant.label());
    }

    #[test]
    fn work_selection_branches_on_mode() {
        let reference = reference();
        let mut form = FormData::default();

        form.apply(FieldUpdate::CalculationMode(Some(CalculationMode::Scenario)));
        let content = step_content(StepKind::WorkSelection, &form, &reference);
        let StepContent::ScenarioCatalog { groups, .. } = content else {
            panic!("scenario mode lists scenarios");
        };
        assert_eq!(groups[0].label, "Construction & Earthworks");
        assert_eq!(groups[0].entries[0].detail, "loudest: excavator 105 dB");

        form.apply(FieldUpdate::CalculationMode(Some(CalculationMode::NoisiestPlant)));
        let content = step_content(StepKind::WorkSelection, &form, &reference);
        assert!(matches!(content, StepContent::PlantCatalog { .. }));

        form.apply(FieldUpdate::CalculationMode(Some(
            CalculationMode::IndividualPlant,
        )));
        let content = step_content(StepKind::WorkSelection, &form, &reference);
        assert!(matches!(content, StepContent::NoSelection { .. }));
    }

    #[test]
    fn empty_catalog_marks_step_degraded() {
        let mut form = FormData::default();
        form.apply(FieldUpdate::CalculationMode(Some(CalculationMode::Scenario)));
        let content = step_content(StepKind::WorkSelection, &form, &ReferenceData::default());
        assert!(content.is_degraded());

        let content = step_content(StepKind::TimePeriod, &form, &ReferenceData::default());
        assert!(content.is_degraded());
    }

    #[test]
    fn review_resolves_plant_names() {
        let mut form = FormData::default();
        form.apply(FieldUpdate::CalculationMode(Some(CalculationMode::NoisiestPlant)));
        form.apply(FieldUpdate::ScenarioId(Some("rock_breaker".to_string())));
        form.apply(FieldUpdate::NoiseCategoryId(Some("U2".to_string())));
        form.apply(FieldUpdate::ReceiverDistance(Some("80".to_string())));

        let summary = review_summary(&form, &reference());
        assert!(summary.contains(&ReviewLine {
            label: "Noisiest Plant",
            value: "Rock Breaker".to_string(),
        }));
        assert!(summary.contains(&ReviewLine {
            label: "Location Type",
            value: "Urban Industrial (U2)".to_string(),
        }));
        assert!(summary.contains(&ReviewLine {
            label: "Distance",
            value: "80 meters".to_string(),
        }));
        assert!(summary.contains(&ReviewLine {
            label: "Calculation Mode",
            value: CalculationMode::NoisiestPlant.label().to_string(),
        }));
    }
}
