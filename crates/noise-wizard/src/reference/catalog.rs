use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Predefined work-activity profile bundling several pieces of equipment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    /// Equipment name to sound power level in dB.
    #[serde(default)]
    pub sound_power_levels: BTreeMap<String, f64>,
}

impl Scenario {
    /// Category tag on the entry wins; otherwise the static id table decides.
    pub fn resolved_category(&self) -> ScenarioCategory {
        self.category
            .as_deref()
            .and_then(ScenarioCategory::from_label)
            .or_else(|| ScenarioCategory::for_scenario_id(&self.id))
            .unwrap_or(ScenarioCategory::Other)
    }

    pub fn loudest_equipment(&self) -> Option<(&str, f64)> {
        self.sound_power_levels
            .iter()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(name, level)| (name.as_str(), *level))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScenarioCategory {
    ConstructionEarthworks,
    RoadInfrastructure,
    EnvironmentalMaintenance,
    Other,
}

const SCENARIO_CATEGORY_TABLE: &[(ScenarioCategory, &[&str])] = &[
    (
        ScenarioCategory::ConstructionEarthworks,
        &[
            "excavation",
            "road_works",
            "bridge_works",
            "demolition",
            "concrete_works",
            "drilling",
        ],
    ),
    (
        ScenarioCategory::RoadInfrastructure,
        &[
            "paving",
            "paving_asphalt",
            "line_marking",
            "signage_installation",
            "stormwater_works",
            "utility_installation",
        ],
    ),
    (
        ScenarioCategory::EnvironmentalMaintenance,
        &["landscaping", "tree_removal"],
    ),
];

impl ScenarioCategory {
    pub const fn ordered() -> [Self; 4] {
        [
            Self::ConstructionEarthworks,
            Self::RoadInfrastructure,
            Self::EnvironmentalMaintenance,
            Self::Other,
        ]
    }

    pub const fn key(self) -> &'static str {
        match self {
            Self::ConstructionEarthworks => "construction_earthworks",
            Self::RoadInfrastructure => "road_infrastructure",
            Self::EnvironmentalMaintenance => "environmental_maintenance",
            Self::Other => "other",
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::ConstructionEarthworks => "Construction & Earthworks",
            Self::RoadInfrastructure => "Road & Infrastructure",
            Self::EnvironmentalMaintenance => "Environmental & Maintenance",
            Self::Other => "Other",
        }
    }

    pub fn for_scenario_id(id: &str) -> Option<Self> {
        SCENARIO_CATEGORY_TABLE
            .iter()
            .find(|(_, ids)| ids.contains(&id))
            .map(|(category, _)| *category)
    }

    fn from_label(raw: &str) -> Option<Self> {
        let normalized = raw.trim().to_ascii_lowercase();
        Self::ordered().into_iter().find(|category| {
            category.key() == normalized || category.label().to_ascii_lowercase() == normalized
        })
    }
}

/// Single piece of equipment used for conservative noisiest-plant assessments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plant {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: String,
    pub sound_power_level: f64,
    #[serde(default = "full_fraction")]
    pub duty_cycle: f64,
    #[serde(default = "full_fraction")]
    pub usage_factor: f64,
}

fn full_fraction() -> f64 {
    1.0
}

impl Plant {
    pub fn has_valid_fractions(&self) -> bool {
        (0.0..=1.0).contains(&self.duty_cycle) && (0.0..=1.0).contains(&self.usage_factor)
    }
}

/// Display order for plant groups on the work-selection step.
pub const PLANT_CATEGORY_ORDER: [&str; 13] = [
    "Demolition",
    "Drilling",
    "Earthmoving",
    "Power",
    "Paving",
    "Material Handling",
    "Transport",
    "Concrete",
    "Compaction",
    "Cutting",
    "Vegetation",
    "Lighting",
    "Marking",
];

#[derive(Debug, Clone, Serialize)]
pub struct CatalogGroup<'a, T> {
    pub label: String,
    pub entries: Vec<&'a T>,
}

/// Scenarios grouped by category in display order; empty groups are skipped.
pub fn group_scenarios(scenarios: &[Scenario]) -> Vec<CatalogGroup<'_, Scenario>> {
    ScenarioCategory::ordered()
        .into_iter()
        .filter_map(|category| {
            let entries: Vec<&Scenario> = scenarios
                .iter()
                .filter(|scenario| scenario.resolved_category() == category)
                .collect();
            (!entries.is_empty()).then(|| CatalogGroup {
                label: category.label().to_string(),
                entries,
            })
        })
        .collect()
}

/// Plants grouped by equipment category: the fixed order first, then any
/// other categories alphabetically.
pub fn group_plants(plants: &[Plant]) -> Vec<CatalogGroup<'_, Plant>> {
    let mut by_category: BTreeMap<&str, Vec<&Plant>> = BTreeMap::new();
    for plant in plants {
        let category = match plant.category.trim() {
            "" => "Other",
            trimmed => trimmed,
        };
        by_category.entry(category).or_default().push(plant);
    }

    let mut groups = Vec::with_capacity(by_category.len());
    for category in PLANT_CATEGORY_ORDER {
        if let Some(entries) = by_category.remove(category) {
            groups.push(CatalogGroup {
                label: category.to_string(),
                entries,
            });
        }
    }
    groups.extend(by_category.into_iter().map(|(label, entries)| CatalogGroup {
        label: label.to_string(),
        entries,
    }));
    groups
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scenario(id: &str, category: Option<&str>) -> Scenario {
        Scenario {
            id: id.to_string(),
            name: id.replace('_', " "),
            description: String::new(),
            category: category.map(str::to_string),
            sound_power_levels: BTreeMap::from([
                ("excavator".to_string(), 105.0),
                ("breaker".to_string(), 115.0),
            ]),
        }
    }

    fn plant(id: &str, category: &str) -> Plant {
        Plant {
            id: id.to_string(),
            name: id.to_string(),
            description: String::new(),
            category: category.to_string(),
            sound_power_level: 100.0,
            duty_cycle: 0.5,
            usage_factor: 0.8,
        }
    }

    #[test]
    fn scenario_category_prefers_entry_tag_over_table() {
        assert_eq!(
            scenario("demolition", None).resolved_category(),
            ScenarioCategory::ConstructionEarthworks
        );
        assert_eq!(
            scenario("demolition", Some("Road & Infrastructure")).resolved_category(),
            ScenarioCategory::RoadInfrastructure
        );
        assert_eq!(
            scenario("tunnel_boring", Some("environmental_maintenance")).resolved_category(),
            ScenarioCategory::EnvironmentalMaintenance
        );
        assert_eq!(
            scenario("tunnel_boring", None).resolved_category(),
            ScenarioCategory::Other
        );
    }

    #[test]
    fn scenario_groups_keep_unknown_ids_visible() {
        let scenarios = vec![
            scenario("landscaping", None),
            scenario("excavation", None),
            scenario("tunnel_boring", None),
        ];
        let groups = group_scenarios(&scenarios);
        let labels: Vec<&str> = groups.iter().map(|group| group.label.as_str()).collect();
        assert_eq!(
            labels,
            vec!["Construction & Earthworks", "Environmental & Maintenance", "Other"]
        );
    }

    #[test]
    fn plant_groups_follow_fixed_order_then_alphabetical() {
        let plants = vec![
            plant("saw", "Cutting"),
            plant("crane", "Lifting"),
            plant("breaker", "Demolition"),
            plant("jackhammer", "Demolition"),
            plant("barge", "Aquatic"),
        ];
        let groups = group_plants(&plants);
        let labels: Vec<&str> = groups.iter().map(|group| group.label.as_str()).collect();
        assert_eq!(labels, vec!["Demolition", "Cutting", "Aquatic", "Lifting"]);
        assert_eq!(groups[0].entries.len(), 2);
    }

    #[test]
    fn loudest_equipment_picks_highest_level() {
        let sc = scenario("demolition", None);
        let loudest = sc.loudest_equipment();
        assert_eq!(loudest, Some(("breaker", 115.0)));
    }

    #[test]
    fn plant_fraction_bounds_are_inclusive() {
        let mut entry = plant("pump", "Concrete");
        entry.duty_cycle = 1.0;
        entry.usage_factor = 0.0;
        assert!(entry.has_valid_fractions());
        entry.usage_factor = 1.2;
        assert!(!entry.has_valid_fractions());
    }
}
