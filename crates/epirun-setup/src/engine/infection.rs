use epirun_core::errors::{ErrorInfo, SweepError};
use epirun_params::ParamMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::policy::parse_date;

pub const DEFAULT_SEEDING_START: &str = "2020-02-28";
pub const DEFAULT_SEEDING_END: &str = "2020-03-02";
pub const DEFAULT_ASYMPTOMATIC_RATIO: f64 = 0.2;

fn infection_section(parameters: &ParamMap) -> Option<&serde_json::Map<String, Value>> {
    parameters.get("infection").and_then(Value::as_object)
}

fn number_or(section: Option<&serde_json::Map<String, Value>>, key: &str, default: f64) -> Result<f64, SweepError> {
    match section.and_then(|s| s.get(key)) {
        None | Some(Value::Null) => Ok(default),
        Some(value) => value.as_f64().ok_or_else(|| {
            SweepError::Configuration(
                ErrorInfo::new("infection-not-numeric", "infection value must be a number")
                    .with_context("key", format!("infection.{key}")),
            )
        }),
    }
}

/// Initial infection seeding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InfectionSeedConfig {
    pub seed_strength: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age_profile: Option<Value>,
    pub seeding_start: String,
    pub seeding_end: String,
}

impl InfectionSeedConfig {
    pub fn from_parameters(parameters: &ParamMap) -> Result<Self, SweepError> {
        let section = infection_section(parameters);
        let seed_strength = number_or(section, "seed_strength", 1.0)?;
        let date = |key: &str, default: &str| match section.and_then(|s| s.get(key)) {
            None | Some(Value::Null) => Value::String(default.to_string()),
            Some(value) => value.clone(),
        };
        let start_value = date("seeding_start", DEFAULT_SEEDING_START);
        let end_value = date("seeding_end", DEFAULT_SEEDING_END);
        let start = parse_date(&start_value, "infection.seeding_start")?;
        let end = parse_date(&end_value, "infection.seeding_end")?;
        if start > end {
            return Err(SweepError::Configuration(
                ErrorInfo::new("infection-seeding-window", "seeding starts after it ends")
                    .with_context("seeding_start", start.to_string())
                    .with_context("seeding_end", end.to_string()),
            ));
        }
        Ok(Self {
            seed_strength,
            age_profile: section
                .and_then(|s| s.get("age_profile"))
                .filter(|v| !v.is_null())
                .cloned(),
            seeding_start: start.to_string(),
            seeding_end: end.to_string(),
        })
    }
}

/// Shape of infectiousness over time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InfectivityProfile {
    #[default]
    Xnexp,
    Nature,
    CorrectionNature,
    Constant,
}

impl InfectivityProfile {
    /// Transmission configuration file the engine loads for this profile.
    pub fn transmission_config(&self) -> &'static str {
        match self {
            InfectivityProfile::Xnexp => "XNExp.yaml",
            InfectivityProfile::Nature => "nature.yaml",
            InfectivityProfile::CorrectionNature => "correction_nature.yaml",
            InfectivityProfile::Constant => "TransmissionConstant.yaml",
        }
    }
}

/// Infection selector settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InfectionSelectorConfig {
    pub infectivity_profile: InfectivityProfile,
    pub transmission_config: String,
}

impl InfectionSelectorConfig {
    pub fn from_parameters(parameters: &ParamMap) -> Result<Self, SweepError> {
        let profile = match infection_section(parameters).and_then(|s| s.get("infectivity_profile")) {
            None | Some(Value::Null) => InfectivityProfile::default(),
            Some(value) => serde_json::from_value(value.clone()).map_err(|_| {
                SweepError::Configuration(
                    ErrorInfo::new("infection-profile", "unsupported infectivity profile")
                        .with_context("infectivity_profile", value.to_string())
                        .with_hint("use one of xnexp, nature, correction_nature, constant"),
                )
            })?,
        };
        Ok(Self {
            infectivity_profile: profile,
            transmission_config: profile.transmission_config().to_string(),
        })
    }
}

/// Health index generator settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthIndexConfig {
    pub asymptomatic_ratio: f64,
}

impl HealthIndexConfig {
    pub fn from_parameters(parameters: &ParamMap) -> Result<Self, SweepError> {
        let asymptomatic_ratio = match parameters.get("asymptomatic_ratio") {
            None | Some(Value::Null) => DEFAULT_ASYMPTOMATIC_RATIO,
            Some(value) => value.as_f64().ok_or_else(|| {
                SweepError::configuration("health-index-not-numeric", "asymptomatic_ratio must be a number")
            })?,
        };
        if !(0.0..=1.0).contains(&asymptomatic_ratio) {
            return Err(SweepError::Configuration(
                ErrorInfo::new("health-index-ratio", "asymptomatic_ratio must lie in [0, 1]")
                    .with_context("asymptomatic_ratio", asymptomatic_ratio.to_string()),
            ));
        }
        Ok(Self { asymptomatic_ratio })
    }
}
