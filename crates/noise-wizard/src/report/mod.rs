//! Response model of the calculation service and the stateless projections
//! built from it.

mod export;
mod render;
mod schema;
mod trace;
pub mod views;

pub use export::{artifact, measures_csv, DownloadArtifact, ExportError};
pub use render::render_text;
pub use schema::{
    ChecklistItem, ComplianceRequirement, CostTier, Distances, EstimationResult, Feasibility,
    ImpactBand, MeasureKind, MitigationMeasure, NotificationKind, NotificationRequirement,
    RespitePeriod, StakeholderRequirement, WorkHourRestriction,
};
pub use trace::{CalculationTrace, TraceValue};
pub use views::{DownloadKind, ResultSummary};
