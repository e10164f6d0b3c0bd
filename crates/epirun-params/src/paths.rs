//! Addressing helpers for nested parameter mappings.

use epirun_core::errors::{ErrorInfo, SweepError};
use indexmap::IndexMap;
use serde_json::{Map, Value};

/// Nested parameter mapping. Insertion order is preserved.
pub type ParamMap = Map<String, Value>;

/// Ordered list of keys from the root of a [`ParamMap`].
pub type ParamPath = Vec<String>;

/// Renders a path for diagnostics (`policies.lockdown.lockdown_ratio`).
pub fn path_label(path: &[String]) -> String {
    path.join(".")
}

/// Walks `map` depth-first and yields every `(path, value)` pair.
///
/// Mapping-valued entries are emitted twice over: each descendant first, then
/// the container itself at its own path. Callers filter on the value kind to
/// separate leaves from groups.
pub fn enumerate_paths(map: &ParamMap) -> Vec<(ParamPath, &Value)> {
    fn walk<'a>(map: &'a ParamMap, prefix: &[String], out: &mut Vec<(ParamPath, &'a Value)>) {
        for (key, value) in map {
            let mut path = prefix.to_vec();
            path.push(key.clone());
            if let Value::Object(child) = value {
                walk(child, &path, out);
            }
            out.push((path, value));
        }
    }

    let mut out = Vec::new();
    walk(map, &[], &mut out);
    out
}

/// Leaf entries of `map` (everything that is not itself a mapping).
pub fn leaf_paths(map: &ParamMap) -> Vec<(ParamPath, &Value)> {
    enumerate_paths(map)
        .into_iter()
        .filter(|(_, value)| !value.is_object())
        .collect()
}

/// Writes `value` at `path`, creating empty mappings for missing intermediates.
///
/// An intermediate that exists but is not a mapping is left untouched and
/// reported as a configuration error.
pub fn set_at_path(map: &mut ParamMap, path: &[String], value: Value) -> Result<(), SweepError> {
    let (last, parents) = path
        .split_last()
        .ok_or_else(|| SweepError::configuration("path-empty", "cannot write at an empty path"))?;
    let mut current = map;
    for (depth, segment) in parents.iter().enumerate() {
        let entry = current
            .entry(segment.clone())
            .or_insert_with(|| Value::Object(Map::new()));
        current = match entry {
            Value::Object(child) => child,
            other => {
                return Err(SweepError::Configuration(
                    ErrorInfo::new("path-not-group", "intermediate path segment is not a mapping")
                        .with_context("path", path_label(&path[..=depth]))
                        .with_context("found", value_kind(other)),
                ))
            }
        };
    }
    current.insert(last.clone(), value);
    Ok(())
}

/// Reads the value stored at `path`.
pub fn get_at_path<'a>(map: &'a ParamMap, path: &[String]) -> Result<&'a Value, SweepError> {
    let missing = |depth: usize| {
        SweepError::MissingPath(
            ErrorInfo::new("path-missing", "no value stored at path")
                .with_context("path", path_label(path))
                .with_context("missing_segment", path_label(&path[..=depth])),
        )
    };
    let (last, parents) = path.split_last().ok_or_else(|| {
        SweepError::MissingPath(ErrorInfo::new("path-empty", "cannot read an empty path"))
    })?;
    let mut current = map;
    for (depth, segment) in parents.iter().enumerate() {
        match current.get(segment) {
            Some(Value::Object(child)) => current = child,
            _ => return Err(missing(depth)),
        }
    }
    current.get(last).ok_or_else(|| missing(parents.len()))
}

/// Flattens leaves into `separator`-joined keys, preserving walk order.
pub fn flatten(map: &ParamMap, separator: &str) -> IndexMap<String, Value> {
    leaf_paths(map)
        .into_iter()
        .map(|(path, value)| (path.join(separator), value.clone()))
        .collect()
}

/// Inverse of [`flatten`].
pub fn unflatten<I>(entries: I, separator: &str) -> Result<ParamMap, SweepError>
where
    I: IntoIterator<Item = (String, Value)>,
{
    let mut map = ParamMap::new();
    for (key, value) in entries {
        let path: ParamPath = key.split(separator).map(str::to_string).collect();
        set_at_path(&mut map, &path, value)?;
    }
    Ok(map)
}

pub(crate) fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "mapping",
    }
}
