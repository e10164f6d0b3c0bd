//! Run selection filters (`"all"`, `"low-high"`, explicit indices).

use std::fmt;
use std::str::FromStr;

use epirun_core::errors::{ErrorInfo, SweepError};
use serde::{Serialize, Serializer};
use serde_json::Value;

/// Which generated runs a sweep actually executes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum RunSelection {
    /// Every generated run.
    #[default]
    All,
    /// Inclusive index range.
    Range {
        /// First index.
        low: usize,
        /// Last index, inclusive.
        high: usize,
    },
    /// Explicit indices, kept in the given order.
    Indices(Vec<usize>),
}

fn malformed(raw: &str) -> SweepError {
    SweepError::Configuration(
        ErrorInfo::new("run-selection-malformed", "run selection could not be parsed")
            .with_context("selection", raw)
            .with_hint("use \"all\", \"low-high\" or a list of run indices"),
    )
}

impl FromStr for RunSelection {
    type Err = SweepError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed == "all" {
            return Ok(RunSelection::All);
        }
        let (low, high) = trimmed.split_once('-').ok_or_else(|| malformed(s))?;
        let low = low.trim().parse::<usize>().map_err(|_| malformed(s))?;
        let high = high.trim().parse::<usize>().map_err(|_| malformed(s))?;
        if low > high {
            return Err(SweepError::Configuration(
                ErrorInfo::new("run-selection-inverted", "run range starts after it ends")
                    .with_context("selection", s),
            ));
        }
        Ok(RunSelection::Range { low, high })
    }
}

impl fmt::Display for RunSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunSelection::All => f.write_str("all"),
            RunSelection::Range { low, high } => write!(f, "{low}-{high}"),
            RunSelection::Indices(indices) => {
                let parts: Vec<String> = indices.iter().map(usize::to_string).collect();
                write!(f, "[{}]", parts.join(", "))
            }
        }
    }
}

impl RunSelection {
    /// Reads a selection from a configuration value. `null` selects everything.
    /// A bare integer names one run, the same as a one-element list. Ranges are
    /// always written out as `"low-high"`.
    pub fn from_value(value: &Value) -> Result<Self, SweepError> {
        match value {
            Value::Null => Ok(RunSelection::All),
            Value::String(text) => text.parse(),
            Value::Number(number) => number
                .as_u64()
                .map(|idx| RunSelection::Indices(vec![idx as usize]))
                .ok_or_else(|| malformed(&number.to_string())),
            Value::Array(items) => items
                .iter()
                .map(|item| item.as_u64().map(|idx| idx as usize))
                .collect::<Option<Vec<_>>>()
                .map(RunSelection::Indices)
                .ok_or_else(|| malformed(&value.to_string())),
            other => Err(malformed(&other.to_string())),
        }
    }

    /// Concrete index sequence for a sweep of `available` runs.
    pub fn resolve(&self, available: usize) -> Result<Vec<usize>, SweepError> {
        let out_of_range = |idx: usize| {
            SweepError::Configuration(
                ErrorInfo::new("run-selection-out-of-range", "selected run does not exist")
                    .with_context("index", idx.to_string())
                    .with_context("available", available.to_string()),
            )
        };
        match self {
            RunSelection::All => Ok((0..available).collect()),
            RunSelection::Range { low, high } => {
                if *high >= available {
                    return Err(out_of_range(*high));
                }
                Ok((*low..=*high).collect())
            }
            RunSelection::Indices(indices) => {
                if let Some(&bad) = indices.iter().find(|&&idx| idx >= available) {
                    return Err(out_of_range(bad));
                }
                Ok(indices.clone())
            }
        }
    }
}

impl Serialize for RunSelection {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            RunSelection::Indices(indices) => indices.serialize(serializer),
            other => serializer.collect_str(other),
        }
    }
}
