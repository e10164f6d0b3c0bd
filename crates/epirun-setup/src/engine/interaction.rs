use epirun_core::errors::{ErrorInfo, SweepError};
use epirun_params::ParamMap;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Interaction settings handed to the engine.
///
/// Mirrors the baseline interaction YAML; sections this tool does not touch
/// are carried through in `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractionConfig {
    pub alpha_physical: f64,
    pub betas: IndexMap<String, f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub susceptibilities_by_age: Option<IndexMap<String, f64>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn interaction_error(code: &str, message: &str, key: &str) -> SweepError {
    SweepError::Configuration(ErrorInfo::new(code, message).with_context("key", key))
}

fn as_number(value: &Value, key: &str) -> Result<f64, SweepError> {
    value
        .as_f64()
        .ok_or_else(|| interaction_error("interaction-not-numeric", "interaction value must be a number", key))
}

/// Parses an age band key of the form `low-high`.
pub fn parse_age_band(band: &str) -> Option<(u32, u32)> {
    let (low, high) = band.split_once('-')?;
    let low = low.trim().parse().ok()?;
    let high = high.trim().parse().ok()?;
    (low <= high).then_some((low, high))
}

impl InteractionConfig {
    /// Applies `interaction.{betas,alpha_physical,susceptibilities_by_age}` from
    /// resolved parameters on top of this baseline.
    pub fn with_parameters(&self, parameters: &ParamMap) -> Result<Self, SweepError> {
        let mut interaction = self.clone();
        let Some(section) = parameters.get("interaction").and_then(Value::as_object) else {
            return Ok(interaction);
        };
        if let Some(alpha) = section.get("alpha_physical") {
            interaction.alpha_physical = as_number(alpha, "interaction.alpha_physical")?;
        }
        if let Some(betas) = section.get("betas").and_then(Value::as_object) {
            for (group, beta) in betas {
                let key = format!("interaction.betas.{group}");
                let slot = interaction.betas.get_mut(group).ok_or_else(|| {
                    interaction_error(
                        "interaction-unknown-group",
                        "beta given for a group the baseline does not define",
                        &key,
                    )
                })?;
                *slot = as_number(beta, &key)?;
            }
        }
        if let Some(bands) = section.get("susceptibilities_by_age").and_then(Value::as_object) {
            let mut susceptibilities = IndexMap::with_capacity(bands.len());
            for (band, value) in bands {
                let key = format!("interaction.susceptibilities_by_age.{band}");
                if parse_age_band(band).is_none() {
                    return Err(interaction_error(
                        "interaction-age-band",
                        "age bands must look like low-high",
                        &key,
                    ));
                }
                susceptibilities.insert(band.clone(), as_number(value, &key)?);
            }
            interaction.susceptibilities_by_age = Some(susceptibilities);
        }
        Ok(interaction)
    }
}
