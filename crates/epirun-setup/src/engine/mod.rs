//! Translation of resolved parameter sets into engine configuration documents.

mod infection;
mod interaction;
mod policy;

use std::fs;
use std::path::Path;

use epirun_core::errors::{io_error, SweepError};
use epirun_core::serde::from_yaml_slice;
use epirun_params::ParamMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub use infection::{
    HealthIndexConfig, InfectionSeedConfig, InfectionSelectorConfig, InfectivityProfile,
    DEFAULT_ASYMPTOMATIC_RATIO, DEFAULT_SEEDING_END, DEFAULT_SEEDING_START,
};
pub use interaction::{parse_age_band, InteractionConfig};
pub use policy::{camel_case, make_policies, parse_date, PolicyBaseline, PolicyEntry, DATE_FORMAT};

/// Baseline files the per-run settings are layered on.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineBaseline {
    pub interaction: InteractionConfig,
    pub policies: PolicyBaseline,
}

fn read_yaml<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, SweepError> {
    let bytes = fs::read(path).map_err(|err| io_error("baseline-read", path, err))?;
    from_yaml_slice(&bytes)
}

impl EngineBaseline {
    pub fn load(interaction_path: &Path, policy_path: &Path) -> Result<Self, SweepError> {
        Ok(Self {
            interaction: read_yaml(interaction_path)?,
            policies: read_yaml(policy_path)?,
        })
    }
}

/// Everything the engine needs besides the world file, for one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    pub interaction: InteractionConfig,
    pub policies: Vec<PolicyEntry>,
    pub infection_seed: InfectionSeedConfig,
    pub infection_selector: InfectionSelectorConfig,
    pub health_index: HealthIndexConfig,
}

impl EngineConfig {
    pub fn from_parameters(parameters: &ParamMap, baseline: &EngineBaseline) -> Result<Self, SweepError> {
        let modifications = parameters.get("policies").and_then(Value::as_object);
        Ok(Self {
            interaction: baseline.interaction.with_parameters(parameters)?,
            policies: make_policies(&baseline.policies, modifications)?,
            infection_seed: InfectionSeedConfig::from_parameters(parameters)?,
            infection_selector: InfectionSelectorConfig::from_parameters(parameters)?,
            health_index: HealthIndexConfig::from_parameters(parameters)?,
        })
    }
}
