use std::collections::BTreeMap;
use std::iter::FromIterator;

use serde::{de::DeserializeOwned, Serialize};
use serde_json::{Map, Value};

use crate::errors::{ErrorInfo, SweepError};

fn serde_error(code: &str, err: impl ToString) -> SweepError {
    SweepError::Serde(ErrorInfo::new(code, err.to_string()))
}

fn canonicalize(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let ordered = map
                .into_iter()
                .map(|(key, value)| (key, canonicalize(value)))
                .collect::<BTreeMap<_, _>>();
            Value::Object(Map::from_iter(ordered))
        }
        Value::Array(values) => Value::Array(values.into_iter().map(canonicalize).collect()),
        other => other,
    }
}

/// Serializes a value into compact JSON bytes with keys sorted at every level.
pub fn to_canonical_json_bytes<T: Serialize>(value: &T) -> Result<Vec<u8>, SweepError> {
    let value = serde_json::to_value(value).map_err(|err| serde_error("json_serialize", err))?;
    let mut bytes = Vec::new();
    serde_json::to_writer(&mut bytes, &canonicalize(value))
        .map_err(|err| serde_error("json_write", err))?;
    Ok(bytes)
}

/// Serializes a value into indented, key-sorted JSON as written to run directories.
pub fn to_canonical_json_pretty<T: Serialize>(value: &T) -> Result<String, SweepError> {
    let value = serde_json::to_value(value).map_err(|err| serde_error("json_serialize", err))?;
    serde_json::to_string_pretty(&canonicalize(value)).map_err(|err| serde_error("json_write", err))
}

/// Deserializes a value from JSON bytes.
pub fn from_json_slice<T: DeserializeOwned>(data: &[u8]) -> Result<T, SweepError> {
    serde_json::from_slice(data).map_err(|err| serde_error("json_deserialize", err))
}

/// Deserializes a YAML payload into the requested type.
pub fn from_yaml_slice<T: DeserializeOwned>(data: &[u8]) -> Result<T, SweepError> {
    serde_yaml::from_slice(data).map_err(|err| serde_error("yaml_deserialize", err))
}
