//! In-place resolution of expression-valued parameters.

use epirun_core::errors::{ErrorInfo, SweepError};
use serde_json::Value;
use tracing::debug;

use crate::expr::{is_expression, Expression};
use crate::paths::{get_at_path, leaf_paths, path_label, set_at_path, ParamMap, ParamPath};

/// Separator joining path segments inside `@` references and table headers.
pub const PATH_SEPARATOR: &str = "__";

/// Outcome of [`resolve_expressions`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ResolutionReport {
    /// Number of expressions rewritten to numbers.
    pub resolved: usize,
    /// Forward passes performed.
    pub passes: usize,
}

struct Pending {
    path: ParamPath,
    expression: Expression,
}

enum Lookup {
    Ready(Vec<(String, f64)>),
    Waiting,
}

/// Rewrites every expression-valued leaf of `params` to its numeric value.
///
/// Expressions are visited in insertion order over repeated passes. One that
/// references a still unresolved expression is deferred; a pass that resolves
/// nothing while work remains is a [`SweepError::CircularReference`].
pub fn resolve_expressions(params: &mut ParamMap, separator: &str) -> Result<ResolutionReport, SweepError> {
    let mut pending = Vec::new();
    for (path, value) in leaf_paths(params) {
        if let Value::String(text) = value {
            if is_expression(text) {
                let expression = Expression::parse(text).map_err(|err| at_path(err, &path))?;
                pending.push(Pending { path, expression });
            }
        }
    }

    let mut report = ResolutionReport::default();
    while !pending.is_empty() {
        report.passes += 1;
        let before = pending.len();
        let mut deferred = Vec::new();
        for item in pending {
            match lookup_references(params, &item, separator)? {
                Lookup::Ready(values) => {
                    let value = item
                        .expression
                        .evaluate(&|name: &str| {
                            values.iter().find(|(n, _)| n == name).map(|(_, v)| *v)
                        })
                        .map_err(|err| at_path(err, &item.path))?;
                    set_at_path(params, &item.path, Value::from(value))?;
                    report.resolved += 1;
                }
                Lookup::Waiting => deferred.push(item),
            }
        }
        debug!(
            pass = report.passes,
            resolved = before - deferred.len(),
            remaining = deferred.len(),
            "expression resolution pass"
        );
        if deferred.len() == before {
            let stuck: Vec<String> = deferred.iter().map(|item| path_label(&item.path)).collect();
            return Err(SweepError::CircularReference(
                ErrorInfo::new("expr-cycle", "expressions reference each other in a cycle")
                    .with_context("paths", stuck.join(", ")),
            ));
        }
        pending = deferred;
    }
    Ok(report)
}

fn at_path(err: SweepError, path: &[String]) -> SweepError {
    let attach = |info: ErrorInfo| info.with_context("parameter", path_label(path));
    match err {
        SweepError::Configuration(info) => SweepError::Configuration(attach(info)),
        SweepError::CircularReference(info) => SweepError::CircularReference(attach(info)),
        SweepError::MissingPath(info) => SweepError::MissingPath(attach(info)),
        SweepError::Io(info) => SweepError::Io(attach(info)),
        SweepError::Serde(info) => SweepError::Serde(attach(info)),
    }
}

/// Candidate locations for `reference`: sibling of the expression first, then absolute.
fn candidates(expression_path: &[String], reference: &str, separator: &str) -> Vec<ParamPath> {
    let relative: ParamPath = reference.split(separator).map(str::to_string).collect();
    let parent = &expression_path[..expression_path.len().saturating_sub(1)];
    if parent.is_empty() {
        return vec![relative];
    }
    let mut sibling = parent.to_vec();
    sibling.extend(relative.iter().cloned());
    vec![sibling, relative]
}

fn lookup_references(params: &ParamMap, item: &Pending, separator: &str) -> Result<Lookup, SweepError> {
    let mut values = Vec::new();
    for reference in item.expression.references() {
        let found = candidates(&item.path, reference, separator)
            .into_iter()
            .find_map(|path| get_at_path(params, &path).ok());
        match found {
            Some(Value::Number(number)) => {
                let value = number.as_f64().unwrap_or(f64::NAN);
                values.push((reference.to_string(), value));
            }
            Some(Value::String(text)) if is_expression(text) => return Ok(Lookup::Waiting),
            Some(other) => {
                return Err(SweepError::Configuration(
                    ErrorInfo::new("expr-reference-not-numeric", "referenced parameter is not a number")
                        .with_context("parameter", path_label(&item.path))
                        .with_context("reference", reference)
                        .with_context("found", other.to_string()),
                ))
            }
            None => {
                return Err(SweepError::MissingPath(
                    ErrorInfo::new("expr-unknown-reference", "referenced parameter is not defined")
                        .with_context("parameter", path_label(&item.path))
                        .with_context("reference", reference)
                        .with_context("expression", item.expression.source()),
                ))
            }
        }
    }
    Ok(Lookup::Ready(values))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn map(value: Value) -> ParamMap {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn chains_resolve_regardless_of_order() {
        let mut params = map(json!({"c": "@b * 2", "b": "@a + 1", "a": 1}));
        let report = resolve_expressions(&mut params, PATH_SEPARATOR).unwrap();
        assert_eq!(report.resolved, 2);
        assert_eq!(params["b"], json!(2.0));
        assert_eq!(params["c"], json!(4.0));
    }

    #[test]
    fn sibling_reference_wins_over_absolute() {
        let mut params = map(json!({"a": 10, "group": {"a": 1, "b": "@a + 1"}}));
        resolve_expressions(&mut params, PATH_SEPARATOR).unwrap();
        assert_eq!(params["group"]["b"], json!(2.0));
    }

    #[test]
    fn absolute_reference_through_separator() {
        let mut params = map(json!({"x": {"y": 3}, "g": {"z": "@x__y * 2"}}));
        resolve_expressions(&mut params, PATH_SEPARATOR).unwrap();
        assert_eq!(params["g"]["z"], json!(6.0));
    }

    #[test]
    fn non_numeric_reference_is_rejected() {
        let mut params = map(json!({"name": "london", "x": "@name + 1"}));
        let err = resolve_expressions(&mut params, PATH_SEPARATOR).unwrap_err();
        assert_eq!(err.info().code, "expr-reference-not-numeric");
    }
}
