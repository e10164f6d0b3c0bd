//! Expansion of the compact `policies.lockdown` block into staged policies.

use epirun_core::errors::{ErrorInfo, SweepError};
use serde_json::{Map, Value};

use crate::paths::ParamMap;

/// Interaction groups receiving a beta factor under social distancing.
pub const INTERACTION_GROUPS: [&str; 11] = [
    "pub",
    "grocery",
    "cinema",
    "city_transport",
    "inter_city_transport",
    "hospital",
    "care_home",
    "company",
    "school",
    "household",
    "university",
];

const HOUSEHOLD: &str = "household";

fn lockdown_error(code: &str, message: &str, field: &str) -> SweepError {
    SweepError::Configuration(
        ErrorInfo::new(code, message).with_context("field", format!("policies.lockdown.{field}")),
    )
}

fn required<'a>(block: &'a Map<String, Value>, field: &str) -> Result<&'a Value, SweepError> {
    block
        .get(field)
        .ok_or_else(|| lockdown_error("lockdown-missing-field", "lockdown block is incomplete", field))
}

fn number(value: &Value, field: &str) -> Result<f64, SweepError> {
    value
        .as_f64()
        .ok_or_else(|| lockdown_error("lockdown-not-numeric", "lockdown value must be a number", field))
}

fn date(block: &Map<String, Value>, field: &str) -> Result<Value, SweepError> {
    match required(block, field)? {
        Value::String(text) => Ok(Value::String(text.clone())),
        _ => Err(lockdown_error("lockdown-date", "lockdown dates must be strings", field)),
    }
}

/// Replaces `policies.lockdown` in `params` by two-stage policies.
///
/// Returns `Ok(false)` when the row carries no lockdown block. Stage `"1"`
/// starts at the soft date with effects scaled by `lockdown_ratio`; stage `"2"`
/// starts at the hard date with the full effect.
pub fn expand_lockdown(params: &mut ParamMap) -> Result<bool, SweepError> {
    let Some(Value::Object(policies)) = params.get_mut("policies") else {
        return Ok(false);
    };
    if !policies.contains_key("lockdown") {
        return Ok(false);
    }

    let mut remaining = Map::new();
    let mut lockdown = Value::Null;
    for (name, policy) in std::mem::take(policies) {
        if name == "lockdown" {
            lockdown = policy;
        } else {
            remaining.insert(name, policy);
        }
    }
    let Value::Object(block) = lockdown else {
        return Err(lockdown_error("lockdown-not-mapping", "lockdown must be a mapping", "lockdown"));
    };

    let soft_date = date(&block, "soft_lockdown_date")?;
    let hard_date = date(&block, "hard_lockdown_date")?;
    let ratio = number(required(&block, "lockdown_ratio")?, "lockdown_ratio")?;
    let Value::Object(hard_parameters) = required(&block, "hard_lockdown_policy_parameters")? else {
        return Err(lockdown_error(
            "lockdown-not-mapping",
            "hard lockdown parameters must be a mapping",
            "hard_lockdown_policy_parameters",
        ));
    };

    for (policy_type, settings) in hard_parameters {
        let mut soft = Map::new();
        let mut hard = Map::new();
        soft.insert("start_time".into(), soft_date.clone());
        hard.insert("start_time".into(), hard_date.clone());
        match policy_type.as_str() {
            "social_distancing" => {
                let field = "hard_lockdown_policy_parameters.social_distancing.overall_beta_factor";
                let beta = settings
                    .get("overall_beta_factor")
                    .ok_or_else(|| lockdown_error("lockdown-missing-field", "lockdown block is incomplete", field))
                    .and_then(|value| number(value, field))?;
                let mut soft_betas = Map::new();
                let mut hard_betas = Map::new();
                for group in INTERACTION_GROUPS {
                    let (soft_beta, hard_beta) = if group == HOUSEHOLD {
                        (1.0, 1.0)
                    } else {
                        (1.0 + ratio * (beta - 1.0), beta)
                    };
                    soft_betas.insert(group.into(), Value::from(soft_beta));
                    hard_betas.insert(group.into(), Value::from(hard_beta));
                }
                soft.insert("beta_factors".into(), Value::Object(soft_betas));
                hard.insert("beta_factors".into(), Value::Object(hard_betas));
            }
            "quarantine" => {
                let field = "hard_lockdown_policy_parameters.quarantine.overall_compliance";
                let compliance = settings
                    .get("overall_compliance")
                    .ok_or_else(|| lockdown_error("lockdown-missing-field", "lockdown block is incomplete", field))
                    .and_then(|value| number(value, field))?;
                for key in ["compliance", "household_compliance"] {
                    soft.insert(key.into(), Value::from(ratio * compliance));
                    hard.insert(key.into(), Value::from(compliance));
                }
            }
            _ => {}
        }
        let mut stages = Map::new();
        stages.insert("1".into(), Value::Object(soft));
        stages.insert("2".into(), Value::Object(hard));
        remaining.insert(policy_type.clone(), Value::Object(stages));
    }

    *policies = remaining;
    Ok(true)
}
