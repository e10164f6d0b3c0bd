//! Merging `parameters_to_fix` into generated rows.

use epirun_core::errors::{ErrorInfo, SweepError};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::paths::{get_at_path, leaf_paths, path_label, set_at_path, ParamMap};

/// Which side wins when a fixed parameter collides with a swept one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OnConflict {
    /// Fixed parameters only fill keys the row does not define.
    #[default]
    PreferExplicit,
    /// Fixed parameters overwrite row values.
    PreferFixed,
}

/// Merges every leaf of `fixed` into `row` and returns the number of conflicts.
///
/// A conflict is a leaf present on both sides with different values. Each one
/// is logged as a warning regardless of which side wins. List-valued fixed
/// leaves are rejected before any row is touched.
pub fn apply_fixed_parameters(
    row: &mut ParamMap,
    fixed: &ParamMap,
    on_conflict: OnConflict,
) -> Result<usize, SweepError> {
    let leaves = leaf_paths(fixed);
    if let Some((path, _)) = leaves.iter().find(|(_, value)| value.is_array()) {
        return Err(SweepError::Configuration(
            ErrorInfo::new("fixed-not-scalar", "fixed parameters must be scalars")
                .with_context("parameter", path_label(path))
                .with_hint("move varying values into the sweep parameters"),
        ));
    }
    let mut conflicts = 0;
    for (path, value) in leaves {
        let existing = match get_at_path(row, &path) {
            Ok(existing) => Some(existing.clone()),
            Err(err) if err.is_missing_path() => None,
            Err(err) => return Err(err),
        };
        match existing {
            None => set_at_path(row, &path, value.clone())?,
            Some(existing) => {
                if existing != *value {
                    conflicts += 1;
                    warn!(
                        parameter = %path_label(&path),
                        swept = %existing,
                        fixed = %value,
                        policy = ?on_conflict,
                        "fixed parameter conflicts with swept value"
                    );
                }
                if on_conflict == OnConflict::PreferFixed {
                    set_at_path(row, &path, value.clone())?;
                }
            }
        }
    }
    Ok(conflicts)
}

