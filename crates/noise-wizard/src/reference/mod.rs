//! Read-only lookup tables loaded once at startup: step guidance, the
//! scenario catalog, and the plant catalog.
//!
//! The three loads run concurrently and settle independently. A table that
//! fails to load is logged and left empty so the wizard can still render the
//! remaining steps.

mod catalog;
mod guidance;

pub use catalog::{
    group_plants, group_scenarios, CatalogGroup, Plant, Scenario, ScenarioCategory,
    PLANT_CATEGORY_ORDER,
};
pub use guidance::{GuidanceEntry, GuidanceSections, WizardGuidance};

use crate::config::ReferenceConfig;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use tracing::{debug, info, warn};

/// Location of one reference table: a local file or an `http(s)` URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReferenceSource {
    Path(PathBuf),
    Url(String),
}

impl ReferenceSource {
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
            Self::Url(trimmed.to_string())
        } else {
            Self::Path(PathBuf::from(trimmed))
        }
    }
}

impl fmt::Display for ReferenceSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReferenceSource::Path(path) => write!(f, "{}", path.display()),
            ReferenceSource::Url(url) => f.write_str(url),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceTable {
    Guidance,
    Scenarios,
    Plants,
}

impl ReferenceTable {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Guidance => "step guidance",
            Self::Scenarios => "scenario catalog",
            Self::Plants => "plant catalog",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ReferenceLoadError {
    #[error("failed to read {location}: {error}")]
    Io {
        location: String,
        #[source]
        error: std::io::Error,
    },
    #[error("failed to fetch {location}: {error}")]
    Http {
        location: String,
        #[source]
        error: reqwest::Error,
    },
    #[error("{location} responded with status {status}")]
    Status { location: String, status: u16 },
    #[error("{location} is not valid reference data: {error}")]
    Json {
        location: String,
        #[source]
        error: serde_json::Error,
    },
}

/// Snapshot of the three lookup tables. Never mutated after [`ReferenceData::load`].
#[derive(Debug, Clone, Default)]
pub struct ReferenceData {
    guidance: Option<WizardGuidance>,
    scenarios: Vec<Scenario>,
    plants: Vec<Plant>,
}

impl ReferenceData {
    pub fn from_parts(
        guidance: Option<WizardGuidance>,
        scenarios: Vec<Scenario>,
        plants: Vec<Plant>,
    ) -> Self {
        Self {
            guidance,
            scenarios,
            plants: retain_valid_plants(plants),
        }
    }

    pub async fn load(config: &ReferenceConfig, http: &reqwest::Client) -> Self {
        let (guidance, scenarios, plants) = tokio::join!(
            fetch_table::<WizardGuidance>(&config.guidance, http),
            fetch_table::<Vec<Scenario>>(&config.scenarios, http),
            fetch_table::<Vec<Plant>>(&config.plants, http),
        );

        let guidance = settle(ReferenceTable::Guidance, guidance);
        let scenarios = settle(ReferenceTable::Scenarios, scenarios).unwrap_or_default();
        let plants = settle(ReferenceTable::Plants, plants).unwrap_or_default();

        let data = Self::from_parts(guidance, scenarios, plants);
        info!(
            guidance = data.guidance.is_some(),
            scenarios = data.scenarios.len(),
            plants = data.plants.len(),
            "reference data loaded"
        );
        data
    }

    pub fn guidance(&self) -> Option<&WizardGuidance> {
        self.guidance.as_ref()
    }

    pub fn scenarios(&self) -> &[Scenario] {
        &self.scenarios
    }

    pub fn plants(&self) -> &[Plant] {
        &self.plants
    }

    pub fn scenario(&self, id: &str) -> Option<&Scenario> {
        self.scenarios.iter().find(|scenario| scenario.id == id)
    }

    pub fn plant(&self, id: &str) -> Option<&Plant> {
        self.plants.iter().find(|plant| plant.id == id)
    }

    /// True when the table has nothing to offer, whether it failed or was empty.
    pub fn is_degraded(&self, table: ReferenceTable) -> bool {
        match table {
            ReferenceTable::Guidance => self.guidance.is_none(),
            ReferenceTable::Scenarios => self.scenarios.is_empty(),
            ReferenceTable::Plants => self.plants.is_empty(),
        }
    }
}

async fn fetch_table<T: DeserializeOwned>(
    source: &ReferenceSource,
    http: &reqwest::Client,
) -> Result<T, ReferenceLoadError> {
    let location = source.to_string();
    debug!(%location, "loading reference table");

    let bytes = match source {
        ReferenceSource::Path(path) => {
            tokio::fs::read(path)
                .await
                .map_err(|error| ReferenceLoadError::Io {
                    location: location.clone(),
                    error,
                })?
        }
        ReferenceSource::Url(url) => {
            let response = http
                .get(url)
                .send()
                .await
                .map_err(|error| ReferenceLoadError::Http {
                    location: location.clone(),
                    error,
                })?;
            let status = response.status();
            if !status.is_success() {
                return Err(ReferenceLoadError::Status {
                    location,
                    status: status.as_u16(),
                });
            }
            response
                .bytes()
                .await
                .map_err(|error| ReferenceLoadError::Http {
                    location: location.clone(),
                    error,
                })?
                .to_vec()
        }
    };

    serde_json::from_slice(&bytes).map_err(|error| ReferenceLoadError::Json { location, error })
}

fn settle<T>(table: ReferenceTable, outcome: Result<T, ReferenceLoadError>) -> Option<T> {
    match outcome {
        Ok(value) => Some(value),
        Err(err) => {
            warn!(table = table.label(), error = %err, "reference table unavailable");
            None
        }
    }
}

fn retain_valid_plants(plants: Vec<Plant>) -> Vec<Plant> {
    plants
        .into_iter()
        .filter(|plant| {
            let valid = plant.has_valid_fractions();
            if !valid {
                warn!(
                    plant = %plant.id,
                    duty_cycle = plant.duty_cycle,
                    usage_factor = plant.usage_factor,
                    "dropping plant with out-of-range fractions"
                );
            }
            valid
        })
        .collect()
}
