use super::schema::{EstimationResult, ImpactBand};
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct LevelEntry {
    pub label: &'static str,
    pub value_db: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct DistanceEntry {
    pub label: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metres: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SectionCounts {
    pub notification_requirements: usize,
    pub stakeholder_requirements: usize,
    pub work_hour_restrictions: usize,
    pub respite_periods: usize,
    pub compliance_requirements: usize,
    pub standard_measures: usize,
    pub additional_measures: usize,
    pub checklist_items: usize,
    pub required_checklist_items: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DownloadKind {
    Step2Memo,
    RefNoisePack,
    MeasuresCsv,
}

impl DownloadKind {
    pub const fn ordered() -> [Self; 3] {
        [Self::Step2Memo, Self::RefNoisePack, Self::MeasuresCsv]
    }

    pub const fn key(self) -> &'static str {
        match self {
            Self::Step2Memo => "step2_memo",
            Self::RefNoisePack => "ref_noise_pack",
            Self::MeasuresCsv => "measures_csv",
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Step2Memo => "Step 2 memo",
            Self::RefNoisePack => "REF noise pack",
            Self::MeasuresCsv => "Mitigation measures (CSV)",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ordered().into_iter().find(|kind| kind.key() == key)
    }
}

/// Compact projection of a result for dashboards and the session view.
#[derive(Debug, Clone, Serialize)]
pub struct ResultSummary {
    pub request_id: String,
    pub impact_band: ImpactBand,
    pub impact_band_label: &'static str,
    pub levels: Vec<LevelEntry>,
    pub distances: Vec<DistanceEntry>,
    pub counts: SectionCounts,
    pub downloads: Vec<DownloadKind>,
    pub has_trace: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub trace_warnings: Vec<String>,
}

impl ResultSummary {
    pub fn from_result(result: &EstimationResult) -> Self {
        let levels = vec![
            LevelEntry {
                label: "Predicted level",
                value_db: result.predicted_level_db,
            },
            LevelEntry {
                label: "Background level",
                value_db: result.background_db,
            },
            LevelEntry {
                label: "Noise management level",
                value_db: result.nml_db,
            },
            LevelEntry {
                label: "Exceedance over background",
                value_db: result.exceed_background_db,
            },
            LevelEntry {
                label: "Exceedance over NML",
                value_db: result.exceed_nml_db,
            },
        ];

        let distances = &result.distances;
        let distances = vec![
            DistanceEntry {
                label: "Distance to exceed background",
                metres: distances.distance_to_exceed_background,
            },
            DistanceEntry {
                label: "Distance to NML",
                metres: distances.distance_to_nml,
            },
            DistanceEntry {
                label: "Distance to highly affected",
                metres: distances.distance_to_highly_affected,
            },
            DistanceEntry {
                label: "Affected distance",
                metres: distances.affected_distance,
            },
        ];

        let counts = SectionCounts {
            notification_requirements: result.notification_requirements.len(),
            stakeholder_requirements: result.stakeholder_requirements.len(),
            work_hour_restrictions: result.work_hour_restrictions.len(),
            respite_periods: result.respite_periods.len(),
            compliance_requirements: result.compliance_requirements.len(),
            standard_measures: result.standard_measures.len(),
            additional_measures: result.additional_measures.len(),
            checklist_items: result.checklist_items.len(),
            required_checklist_items: result.required_checklist_items().count(),
        };

        let downloads = DownloadKind::ordered()
            .into_iter()
            .filter(|kind| match kind {
                DownloadKind::Step2Memo => result.step2_memo_pack.is_some(),
                DownloadKind::RefNoisePack => result.ref_noise_pack.is_some(),
                DownloadKind::MeasuresCsv => result.measures().next().is_some(),
            })
            .collect();

        Self {
            request_id: result.request_id.clone(),
            impact_band: result.impact_band,
            impact_band_label: result.impact_band.label(),
            levels,
            distances,
            counts,
            downloads,
            has_trace: result.trace.is_some(),
            trace_warnings: result
                .trace
                .as_ref()
                .map(|trace| trace.warnings.clone())
                .unwrap_or_default(),
        }
    }
}
