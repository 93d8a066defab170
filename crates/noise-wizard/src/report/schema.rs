use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use super::trace::CalculationTrace;

/// Classification of the predicted level against background and NML.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ImpactBand {
    #[serde(alias = "not_affected")]
    NotAffected,
    #[serde(alias = "affected", alias = "moderately_affected")]
    Affected,
    #[serde(alias = "highly_affected")]
    HighlyAffected,
}

impl ImpactBand {
    pub const fn label(self) -> &'static str {
        match self {
            Self::NotAffected => "Not affected",
            Self::Affected => "Affected",
            Self::HighlyAffected => "Highly affected",
        }
    }
}

/// Result returned by the calculation service. Never mutated after decoding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EstimationResult {
    pub request_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dataset_version: Option<String>,
    #[serde(
        default,
        deserialize_with = "deserialize_timestamp",
        skip_serializing_if = "Option::is_none"
    )]
    pub timestamp: Option<DateTime<Utc>>,
    pub predicted_level_db: f64,
    pub background_db: f64,
    pub nml_db: f64,
    pub exceed_background_db: f64,
    pub exceed_nml_db: f64,
    pub impact_band: ImpactBand,
    #[serde(default, deserialize_with = "null_as_default")]
    pub distances: Distances,
    #[serde(default, deserialize_with = "null_as_default")]
    pub notification_requirements: Vec<NotificationRequirement>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub stakeholder_requirements: Vec<StakeholderRequirement>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub work_hour_restrictions: Vec<WorkHourRestriction>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub respite_periods: Vec<RespitePeriod>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub compliance_requirements: Vec<ComplianceRequirement>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub standard_measures: Vec<MitigationMeasure>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub additional_measures: Vec<MitigationMeasure>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub checklist_items: Vec<ChecklistItem>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trace: Option<CalculationTrace>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step2_memo_pack: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ref_noise_pack: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub results_table_markdown: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub results_table_csv: Option<String>,
}

impl EstimationResult {
    /// Standard measures followed by additional ones.
    pub fn measures(&self) -> impl Iterator<Item = &MitigationMeasure> {
        self.standard_measures
            .iter()
            .chain(self.additional_measures.iter())
    }

    pub fn required_checklist_items(&self) -> impl Iterator<Item = &ChecklistItem> {
        self.checklist_items.iter().filter(|item| item.required)
    }
}

/// Distances in metres; `None` means the threshold is never crossed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Distances {
    pub distance_to_exceed_background: Option<f64>,
    pub distance_to_nml: Option<f64>,
    pub distance_to_highly_affected: Option<f64>,
    pub affected_distance: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    PhoneCall,
    LetterDrop,
    Email,
    #[serde(alias = "site_sign")]
    SiteSignage,
    Newspaper,
    #[serde(other)]
    Other,
}

impl NotificationKind {
    pub const fn label(self) -> &'static str {
        match self {
            Self::PhoneCall => "Phone call",
            Self::LetterDrop => "Letter drop",
            Self::Email => "Email",
            Self::SiteSignage => "Site signage",
            Self::Newspaper => "Newspaper notice",
            Self::Other => "Other notice",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationRequirement {
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub timing: String,
    #[serde(default, alias = "distance", skip_serializing_if = "Option::is_none")]
    pub distance_threshold: Option<f64>,
    #[serde(default)]
    pub details: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StakeholderRequirement {
    pub category: String,
    #[serde(alias = "notificationMethods")]
    pub notification_methods: Vec<String>,
    #[serde(alias = "contactTiming")]
    pub contact_timing: String,
    #[serde(alias = "specificRequirements")]
    pub specific_requirements: Vec<String>,
}

impl StakeholderRequirement {
    /// Methods with duplicates removed, first occurrence wins.
    pub fn distinct_methods(&self) -> Vec<&str> {
        let mut seen = Vec::new();
        for method in &self.notification_methods {
            if !seen.contains(&method.as_str()) {
                seen.push(method.as_str());
            }
        }
        seen
    }
}

/// `0` in `max_consecutive_days` or `max_per_month` means unrestricted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkHourRestriction {
    pub period: String,
    #[serde(alias = "maxConsecutiveDays")]
    pub max_consecutive_days: u32,
    #[serde(alias = "separationRequired")]
    pub separation_required: u32,
    #[serde(alias = "maxPerMonth")]
    pub max_per_month: u32,
    pub restrictions: Vec<String>,
    #[serde(alias = "specialConditions")]
    pub special_conditions: Vec<String>,
}

impl WorkHourRestriction {
    pub fn consecutive_day_limit(&self) -> Option<u32> {
        (self.max_consecutive_days > 0).then_some(self.max_consecutive_days)
    }

    pub fn monthly_limit(&self) -> Option<u32> {
        (self.max_per_month > 0).then_some(self.max_per_month)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RespitePeriod {
    pub id: String,
    pub description: String,
    #[serde(alias = "nightRestrictions")]
    pub night_restrictions: String,
    #[serde(alias = "eveningRestrictions")]
    pub evening_restrictions: String,
    #[serde(alias = "separationRequirements")]
    pub separation_requirements: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComplianceRequirement {
    pub category: String,
    pub requirements: Vec<String>,
    #[serde(alias = "referenceNumbers")]
    pub reference_numbers: Vec<String>,
    #[serde(alias = "approvalNeeded")]
    pub approval_needed: bool,
    pub timeframe: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MeasureKind {
    Standard,
    Additional,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Feasibility {
    Feasible,
    NotFeasible,
    Conditional,
    NotRequired,
    #[serde(other)]
    Unspecified,
}

impl Feasibility {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Feasible => "Feasible",
            Self::NotFeasible => "Not feasible",
            Self::Conditional => "Conditional",
            Self::NotRequired => "Not required",
            Self::Unspecified => "Unspecified",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CostTier {
    Low,
    Medium,
    High,
    #[serde(other)]
    Unspecified,
}

impl CostTier {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::High => "High",
            Self::Unspecified => "Unspecified",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MitigationMeasure {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default, alias = "text")]
    pub description: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<MeasureKind>,
    #[serde(default)]
    pub reduction_db: Option<f64>,
    #[serde(default = "default_applicable")]
    pub applicable: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feasibility: Option<Feasibility>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost: Option<CostTier>,
    #[serde(default)]
    pub implementation_time: String,
}

fn default_applicable() -> bool {
    true
}

/// Decodes from an object or from a bare string, which becomes a required
/// item with that text.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "ChecklistEntry")]
pub struct ChecklistItem {
    pub id: String,
    pub text: String,
    pub category: String,
    pub required: bool,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ChecklistEntry {
    Text(String),
    Item {
        #[serde(default)]
        id: String,
        #[serde(default)]
        text: String,
        #[serde(default)]
        category: String,
        #[serde(default)]
        required: bool,
    },
}

impl From<ChecklistEntry> for ChecklistItem {
    fn from(entry: ChecklistEntry) -> Self {
        match entry {
            ChecklistEntry::Text(text) => Self {
                text,
                required: true,
                ..Self::default()
            },
            ChecklistEntry::Item {
                id,
                text,
                category,
                required,
            } => Self {
                id,
                text,
                category,
                required,
            },
        }
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// RFC 3339 timestamps, or naive ISO-8601 ones which are taken as UTC.
fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let Some(raw) = Option::<String>::deserialize(deserializer)? else {
        return Ok(None);
    };

    if let Ok(parsed) = DateTime::parse_from_rfc3339(&raw) {
        return Ok(Some(parsed.with_timezone(&Utc)));
    }

    NaiveDateTime::parse_from_str(&raw, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|naive| Some(naive.and_utc()))
        .map_err(serde::de::Error::custom)
}
