use chrono::NaiveDate;
use epirun_core::errors::{ErrorInfo, SweepError};
use epirun_params::ParamMap;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Baseline policy file: policy name to a single policy or numbered stages.
pub type PolicyBaseline = IndexMap<String, Value>;

/// One policy instance the engine constructs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyEntry {
    pub policy_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stage: Option<String>,
    pub fields: ParamMap,
}

/// `close_schools` -> `CloseSchools`.
pub fn camel_case(name: &str) -> String {
    name.split('_')
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                None => "_".to_string(),
            }
        })
        .collect()
}

/// Parses a `YYYY-MM-DD` date.
pub fn parse_date(value: &Value, field: &str) -> Result<NaiveDate, SweepError> {
    value
        .as_str()
        .and_then(|text| NaiveDate::parse_from_str(text, DATE_FORMAT).ok())
        .ok_or_else(|| {
            SweepError::Configuration(
                ErrorInfo::new("date-invalid", "dates must be YYYY-MM-DD")
                    .with_context("field", field)
                    .with_context("value", value.to_string()),
            )
        })
}

fn policy_error(code: &str, message: &str, policy: &str) -> SweepError {
    SweepError::Configuration(ErrorInfo::new(code, message).with_context("policy", policy))
}

fn check_dates(fields: &ParamMap, label: &str) -> Result<(), SweepError> {
    for key in ["start_time", "end_time"] {
        if let Some(value) = fields.get(key) {
            parse_date(value, &format!("{label}.{key}"))?;
        }
    }
    Ok(())
}

fn merge(base: &ParamMap, overrides: Option<&Value>) -> ParamMap {
    let mut fields = base.clone();
    if let Some(Value::Object(overrides)) = overrides {
        for (key, value) in overrides {
            fields.insert(key.clone(), value.clone());
        }
    }
    fields
}

/// Builds the ordered policy list from the baseline and `policies.*` modifications.
///
/// A baseline entry with `start_time` is a single policy; any other mapping is
/// read as numbered stages, each of which must carry both `start_time` and
/// `end_time`.
pub fn make_policies(
    baseline: &PolicyBaseline,
    modifications: Option<&ParamMap>,
) -> Result<Vec<PolicyEntry>, SweepError> {
    let mut policies = Vec::new();
    for (name, data) in baseline {
        let data = data
            .as_object()
            .ok_or_else(|| policy_error("policy-not-mapping", "policy entry must be a mapping", name))?;
        let modification = modifications.and_then(|m| m.get(name));
        let policy_type = camel_case(name);
        if data.contains_key("start_time") {
            let fields = merge(data, modification);
            check_dates(&fields, name)?;
            policies.push(PolicyEntry {
                policy_type,
                stage: None,
                fields,
            });
            continue;
        }
        for (stage, stage_data) in data {
            let label = format!("{name}.{stage}");
            let stage_data = stage_data
                .as_object()
                .filter(|d| d.contains_key("start_time") && d.contains_key("end_time"))
                .ok_or_else(|| {
                    policy_error(
                        "policy-stage-incomplete",
                        "numbered policy stages need start_time and end_time",
                        &label,
                    )
                })?;
            let fields = merge(stage_data, modification.and_then(|m| m.get(stage)));
            check_dates(&fields, &label)?;
            policies.push(PolicyEntry {
                policy_type: policy_type.clone(),
                stage: Some(stage.clone()),
                fields,
            });
        }
    }
    if let Some(modifications) = modifications {
        for name in modifications.keys().filter(|name| !baseline.contains_key(*name)) {
            warn!(policy = %name, "policy modification has no baseline entry and is ignored");
        }
    }
    Ok(policies)
}
