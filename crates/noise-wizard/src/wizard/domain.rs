use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssessmentType {
    DistanceBased,
    FullEstimator,
}

impl AssessmentType {
    pub const fn ordered() -> [Self; 2] {
        [Self::DistanceBased, Self::FullEstimator]
    }

    pub const fn key(self) -> &'static str {
        match self {
            Self::DistanceBased => "distance_based",
            Self::FullEstimator => "full_estimator",
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::DistanceBased => "Distance Based Assessment",
            Self::FullEstimator => "Full Estimator Assessment",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CalculationMode {
    Scenario,
    NoisiestPlant,
    IndividualPlant,
}

impl CalculationMode {
    pub const fn ordered() -> [Self; 3] {
        [Self::Scenario, Self::NoisiestPlant, Self::IndividualPlant]
    }

    pub const fn key(self) -> &'static str {
        match self {
            Self::Scenario => "scenario",
            Self::NoisiestPlant => "noisiest_plant",
            Self::IndividualPlant => "individual_plant",
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Scenario => "Scenario-based Calculation",
            Self::NoisiestPlant => "Noisiest Plant Calculation",
            Self::IndividualPlant => "Individual Plant Selection",
        }
    }

    /// Modes whose work-selection step must hold a catalog id.
    pub const fn requires_selection(self) -> bool {
        matches!(self, Self::Scenario | Self::NoisiestPlant)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnvironmentApproach {
    RepresentativeNoiseEnvironment,
    UserSuppliedBackgroundLevel,
}

impl EnvironmentApproach {
    pub const fn ordered() -> [Self; 2] {
        [
            Self::RepresentativeNoiseEnvironment,
            Self::UserSuppliedBackgroundLevel,
        ]
    }

    pub const fn key(self) -> &'static str {
        match self {
            Self::RepresentativeNoiseEnvironment => "representative_noise_environment",
            Self::UserSuppliedBackgroundLevel => "user_supplied_background_level",
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::RepresentativeNoiseEnvironment => "Representative Noise Environment",
            Self::UserSuppliedBackgroundLevel => "User Supplied Background Level",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimePeriod {
    Day,
    Evening,
    Night,
}

impl TimePeriod {
    pub const fn ordered() -> [Self; 3] {
        [Self::Day, Self::Evening, Self::Night]
    }

    pub const fn key(self) -> &'static str {
        match self {
            Self::Day => "day",
            Self::Evening => "evening",
            Self::Night => "night",
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Day => "Daytime (7am - 6pm)",
            Self::Evening => "Evening (6pm - 10pm)",
            Self::Night => "Nighttime (10pm - 7am)",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PropagationType {
    Rural,
    Urban,
    HardGround,
    SoftGround,
    Mixed,
}

impl PropagationType {
    pub const fn ordered() -> [Self; 5] {
        [
            Self::Rural,
            Self::Urban,
            Self::HardGround,
            Self::SoftGround,
            Self::Mixed,
        ]
    }

    pub const fn key(self) -> &'static str {
        match self {
            Self::Rural => "rural",
            Self::Urban => "urban",
            Self::HardGround => "hard_ground",
            Self::SoftGround => "soft_ground",
            Self::Mixed => "mixed",
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Rural => "Rural",
            Self::Urban => "Urban",
            Self::HardGround => "Hard Ground",
            Self::SoftGround => "Soft Ground",
            Self::Mixed => "Mixed",
        }
    }
}

/// Which narrative packs the calculation service should attach to a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputPack {
    None,
    Step2,
    Ref,
    Both,
}

impl OutputPack {
    pub const fn label(self) -> &'static str {
        match self {
            Self::None => "No narrative packs",
            Self::Step2 => "Step 2 memo pack",
            Self::Ref => "REF noise pack",
            Self::Both => "Step 2 memo and REF noise packs",
        }
    }
}

/// Location category offered on the location step, with its noise management levels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct NoiseCategoryOption {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub day_nml_db: f64,
    pub evening_nml_db: f64,
    pub night_nml_db: f64,
}

impl NoiseCategoryOption {
    pub fn nml_for(&self, period: TimePeriod) -> f64 {
        match period {
            TimePeriod::Day => self.day_nml_db,
            TimePeriod::Evening => self.evening_nml_db,
            TimePeriod::Night => self.night_nml_db,
        }
    }
}

pub const NOISE_CATEGORIES: [NoiseCategoryOption; 2] = [
    NoiseCategoryOption {
        id: "R1",
        name: "Rural Residential",
        description: "Rural residential areas with lower background noise levels",
        day_nml_db: 55.0,
        evening_nml_db: 50.0,
        night_nml_db: 45.0,
    },
    NoiseCategoryOption {
        id: "U2",
        name: "Urban Industrial",
        description: "Urban industrial areas with higher background noise levels",
        day_nml_db: 65.0,
        evening_nml_db: 60.0,
        night_nml_db: 55.0,
    },
];

pub fn noise_category(id: &str) -> Option<&'static NoiseCategoryOption> {
    NOISE_CATEGORIES.iter().find(|category| category.id == id)
}
