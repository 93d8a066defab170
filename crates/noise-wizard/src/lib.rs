pub mod calculation;
pub mod config;
pub mod error;
pub mod reference;
pub mod report;
pub mod request;
pub mod telemetry;
pub mod wizard;

pub use calculation::{CalculationClient, CalculationError, HttpCalculationClient};
pub use config::AppConfig;
pub use error::AppError;
pub use reference::ReferenceData;
pub use report::EstimationResult;
pub use request::{assemble, AssemblyError, EstimationRequest};
pub use wizard::{FieldUpdate, FormData, WizardSession};
