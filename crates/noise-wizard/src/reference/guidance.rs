use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Step guidance text shipped alongside the wizard.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WizardGuidance {
    pub definitions: BTreeMap<String, String>,
    pub guidance: GuidanceSections,
    pub tips: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GuidanceSections {
    pub assessment_types: BTreeMap<String, GuidanceEntry>,
    pub calculation_modes: BTreeMap<String, GuidanceEntry>,
    pub environment_approaches: BTreeMap<String, GuidanceEntry>,
    pub time_periods: BTreeMap<String, GuidanceEntry>,
    pub propagation_types: BTreeMap<String, GuidanceEntry>,
    pub noise_categories: BTreeMap<String, GuidanceEntry>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GuidanceEntry {
    pub title: String,
    pub description: String,
    pub when_to_use: String,
    pub steps: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub restrictions: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub typical_background: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub characteristics: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub example: Option<String>,
}

impl WizardGuidance {
    pub fn definition(&self, term: &str) -> Option<&str> {
        self.definitions.get(term).map(String::as_str)
    }
}
