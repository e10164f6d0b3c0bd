//! Typed view over a sweep specification.

use std::fmt;
use std::str::FromStr;

use epirun_core::errors::{ErrorInfo, SweepError};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::expr::is_expression;
use crate::paths::{path_label, value_kind, ParamMap, ParamPath};

/// Sampling strategy named by `sampling_type` in the sweep configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SamplingKind {
    /// Rows loaded from a parameter table.
    File,
    /// Latin hypercube over `[low, high]` bounds.
    LatinHypercube,
    /// Cartesian product over value lists.
    Grid,
    /// Cartesian product over `[low, high, count]` linspaces.
    RegularGrid,
}

impl SamplingKind {
    /// Configuration spelling of the kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            SamplingKind::File => "file",
            SamplingKind::LatinHypercube => "latin_hypercube",
            SamplingKind::Grid => "grid",
            SamplingKind::RegularGrid => "regular_grid",
        }
    }

    /// How list-valued leaves are read under this kind.
    pub fn list_reading(&self) -> ListReading {
        match self {
            SamplingKind::LatinHypercube => ListReading::Bounds,
            SamplingKind::RegularGrid => ListReading::RegularBounds,
            SamplingKind::File | SamplingKind::Grid => ListReading::Choices,
        }
    }
}

impl fmt::Display for SamplingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SamplingKind {
    type Err = SweepError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "file" => Ok(SamplingKind::File),
            "latin_hypercube" => Ok(SamplingKind::LatinHypercube),
            "grid" => Ok(SamplingKind::Grid),
            "regular_grid" => Ok(SamplingKind::RegularGrid),
            other => Err(SweepError::Configuration(
                ErrorInfo::new("sampling-unsupported", "unsupported sampling type")
                    .with_context("sampling_type", other)
                    .with_hint("use one of file, latin_hypercube, grid, regular_grid"),
            )),
        }
    }
}

/// Interpretation applied to list-valued leaves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListReading {
    /// Finite set of values.
    Choices,
    /// `[low, high]`.
    Bounds,
    /// `[low, high, count]`.
    RegularBounds,
}

/// Ordered tree of typed specification nodes.
pub type ParamTree = IndexMap<String, ParamValue>;

/// One node of a sweep specification.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    /// Held fixed for every run.
    Literal(Value),
    /// String carrying `@` references, resolved per run.
    Expression(String),
    /// Grid dimension.
    Choices(Vec<Value>),
    /// Latin hypercube dimension.
    Range {
        /// Lower bound.
        low: f64,
        /// Upper bound.
        high: f64,
    },
    /// Regular grid dimension.
    RegularRange {
        /// First value.
        low: f64,
        /// Last value.
        high: f64,
        /// Number of evenly spaced values.
        count: usize,
    },
    /// Nested group.
    Group(ParamTree),
}

impl ParamValue {
    /// Parses one raw specification value under the given list reading.
    pub fn from_json(value: &Value, reading: ListReading, path: &[String]) -> Result<Self, SweepError> {
        match value {
            Value::Object(map) => {
                let mut tree = ParamTree::with_capacity(map.len());
                for (key, child) in map {
                    let mut child_path = path.to_vec();
                    child_path.push(key.clone());
                    tree.insert(key.clone(), ParamValue::from_json(child, reading, &child_path)?);
                }
                Ok(ParamValue::Group(tree))
            }
            Value::Array(items) => parse_list(items, reading, path),
            Value::String(text) if is_expression(text) => Ok(ParamValue::Expression(text.clone())),
            scalar => Ok(ParamValue::Literal(scalar.clone())),
        }
    }

    /// True for nodes that vary across runs.
    pub fn is_dimension(&self) -> bool {
        matches!(
            self,
            ParamValue::Choices(_) | ParamValue::Range { .. } | ParamValue::RegularRange { .. }
        )
    }
}

fn list_error(code: &str, message: &str, path: &[String], items: &[Value]) -> SweepError {
    SweepError::Configuration(
        ErrorInfo::new(code, message)
            .with_context("path", path_label(path))
            .with_context("value", Value::Array(items.to_vec()).to_string()),
    )
}

fn number_at(items: &[Value], idx: usize, path: &[String]) -> Result<f64, SweepError> {
    items[idx]
        .as_f64()
        .ok_or_else(|| list_error("spec-bound-not-numeric", "bounds must be numbers", path, items))
}

fn parse_list(items: &[Value], reading: ListReading, path: &[String]) -> Result<ParamValue, SweepError> {
    match reading {
        ListReading::Choices => {
            if let Some(bad) = items.iter().find(|item| item.is_array() || item.is_object()) {
                return Err(SweepError::Configuration(
                    ErrorInfo::new("spec-choice-not-scalar", "grid values must be scalars")
                        .with_context("path", path_label(path))
                        .with_context("found", value_kind(bad)),
                ));
            }
            Ok(ParamValue::Choices(items.to_vec()))
        }
        ListReading::Bounds => {
            if items.len() != 2 {
                return Err(list_error(
                    "spec-bounds-shape",
                    "latin hypercube bounds must be [low, high]",
                    path,
                    items,
                ));
            }
            let low = number_at(items, 0, path)?;
            let high = number_at(items, 1, path)?;
            if low > high {
                return Err(list_error("spec-bounds-inverted", "low bound exceeds high bound", path, items));
            }
            Ok(ParamValue::Range { low, high })
        }
        ListReading::RegularBounds => {
            if items.len() != 3 {
                return Err(list_error(
                    "spec-regular-shape",
                    "regular grid entries must be [low, high, count]",
                    path,
                    items,
                ));
            }
            let low = number_at(items, 0, path)?;
            let high = number_at(items, 1, path)?;
            let count = match &items[2] {
                Value::Number(n) => n
                    .as_u64()
                    .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0 && *f >= 0.0).map(|f| f as u64)),
                _ => None,
            }
            .ok_or_else(|| {
                list_error("spec-regular-count", "count must be a non-negative integer", path, items)
            })?;
            if count == 0 {
                return Err(list_error("spec-regular-count", "count must be at least 1", path, items));
            }
            Ok(ParamValue::RegularRange {
                low,
                high,
                count: count as usize,
            })
        }
    }
}

/// A varying leaf of the specification.
#[derive(Debug, Clone, PartialEq)]
pub struct Dimension<'a> {
    /// Location of the leaf.
    pub path: ParamPath,
    /// Node describing how the leaf varies.
    pub value: &'a ParamValue,
}

/// Parsed sweep specification.
#[derive(Debug, Clone, PartialEq)]
pub struct SweepSpec {
    root: ParamTree,
}

impl SweepSpec {
    /// Parses a raw nested mapping, reading list leaves according to `reading`.
    pub fn parse(spec: &ParamMap, reading: ListReading) -> Result<Self, SweepError> {
        let mut root = ParamTree::with_capacity(spec.len());
        for (key, value) in spec {
            root.insert(key.clone(), ParamValue::from_json(value, reading, &[key.clone()])?);
        }
        Ok(Self { root })
    }

    /// Top-level nodes.
    pub fn root(&self) -> &ParamTree {
        &self.root
    }

    /// Varying leaves in depth-first key order.
    pub fn dimensions(&self) -> Vec<Dimension<'_>> {
        fn walk<'a>(tree: &'a ParamTree, prefix: &[String], out: &mut Vec<Dimension<'a>>) {
            for (key, node) in tree {
                let mut path = prefix.to_vec();
                path.push(key.clone());
                match node {
                    ParamValue::Group(child) => walk(child, &path, out),
                    node if node.is_dimension() => out.push(Dimension { path, value: node }),
                    _ => {}
                }
            }
        }
        let mut out = Vec::new();
        walk(&self.root, &[], &mut out);
        out
    }

    /// Builds one concrete mapping, taking dimension values in [`Self::dimensions`] order.
    pub fn instantiate(&self, values: &[Value]) -> Result<ParamMap, SweepError> {
        let expected = self.dimensions().len();
        if values.len() != expected {
            return Err(SweepError::Configuration(
                ErrorInfo::new("spec-arity", "wrong number of dimension values")
                    .with_context("expected", expected.to_string())
                    .with_context("found", values.len().to_string()),
            ));
        }
        let mut values = values.iter();
        Ok(build(&self.root, &mut values))
    }
}

fn build<'a>(tree: &ParamTree, values: &mut impl Iterator<Item = &'a Value>) -> ParamMap {
    let mut map = ParamMap::new();
    for (key, node) in tree {
        let value = match node {
            ParamValue::Literal(value) => value.clone(),
            ParamValue::Expression(text) => Value::String(text.clone()),
            ParamValue::Group(child) => Value::Object(build(child, values)),
            _ => values.next().cloned().unwrap_or(Value::Null),
        };
        map.insert(key.clone(), value);
    }
    map
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn spec(value: Value) -> ParamMap {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn list_reading_follows_sampling_kind() {
        let raw = spec(json!({"beta": [0.1, 0.5]}));
        let grid = SweepSpec::parse(&raw, SamplingKind::Grid.list_reading()).unwrap();
        assert_eq!(grid.root()["beta"], ParamValue::Choices(vec![json!(0.1), json!(0.5)]));
        let lhs = SweepSpec::parse(&raw, SamplingKind::LatinHypercube.list_reading()).unwrap();
        assert_eq!(lhs.root()["beta"], ParamValue::Range { low: 0.1, high: 0.5 });
        let err = SweepSpec::parse(&raw, ListReading::RegularBounds).unwrap_err();
        assert_eq!(err.info().code, "spec-regular-shape");
    }

    #[test]
    fn expression_strings_are_typed() {
        let raw = spec(json!({"a": "1 - @b", "name": "baseline"}));
        let parsed = SweepSpec::parse(&raw, ListReading::Choices).unwrap();
        assert_eq!(parsed.root()["a"], ParamValue::Expression("1 - @b".into()));
        assert_eq!(parsed.root()["name"], ParamValue::Literal(json!("baseline")));
    }

    #[test]
    fn regular_count_must_be_positive_integer() {
        for bad in [json!([0, 1, 0]), json!([0, 1, 2.5]), json!([0, 1, "3"])] {
            let raw = spec(json!({ "x": bad }));
            let err = SweepSpec::parse(&raw, ListReading::RegularBounds).unwrap_err();
            assert_eq!(err.info().code, "spec-regular-count");
        }
    }

    #[test]
    fn instantiate_fills_dimensions_in_walk_order() {
        let raw = spec(json!({"x": [1, 2], "g": {"fixed": true, "y": ["a", "b"]}}));
        let parsed = SweepSpec::parse(&raw, ListReading::Choices).unwrap();
        let row = parsed.instantiate(&[json!(2), json!("a")]).unwrap();
        assert_eq!(Value::Object(row), json!({"x": 2, "g": {"fixed": true, "y": "a"}}));
        assert!(parsed.instantiate(&[json!(1)]).is_err());
    }

    #[test]
    fn unknown_sampling_kind_is_rejected() {
        assert_eq!("regular_grid".parse::<SamplingKind>().unwrap(), SamplingKind::RegularGrid);
        let err = "sobol".parse::<SamplingKind>().unwrap_err();
        assert_eq!(err.info().code, "sampling-unsupported");
    }
}
