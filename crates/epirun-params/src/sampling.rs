//! Sampling strategies expanding a [`SweepSpec`] into raw parameter rows.

use epirun_core::errors::{ErrorInfo, SweepError};
use epirun_core::rng::RngHandle;
use rand::seq::SliceRandom;
use serde_json::Value;

use crate::paths::{path_label, ParamMap};
use crate::value::{Dimension, ParamValue, SweepSpec};

/// Candidate designs drawn by the maximin criterion.
pub const MAXIMIN_ITERATIONS: usize = 5;

/// Cartesian product over every dimension, last dimension varying fastest.
///
/// `Choices` dimensions contribute their values, `RegularRange` dimensions their
/// linspace. Works for both grid and regular grid specifications.
pub fn grid(spec: &SweepSpec) -> Result<Vec<ParamMap>, SweepError> {
    let axes = spec
        .dimensions()
        .iter()
        .map(grid_axis)
        .collect::<Result<Vec<_>, _>>()?;
    cartesian_product(&axes)
        .iter()
        .map(|combo| spec.instantiate(combo))
        .collect()
}

fn grid_axis(dimension: &Dimension<'_>) -> Result<Vec<Value>, SweepError> {
    match dimension.value {
        ParamValue::Choices(values) => Ok(values.clone()),
        ParamValue::RegularRange { low, high, count } => {
            Ok(linspace(*low, *high, *count).into_iter().map(Value::from).collect())
        }
        _ => Err(not_sampleable(dimension, "grid")),
    }
}

fn not_sampleable(dimension: &Dimension<'_>, strategy: &str) -> SweepError {
    SweepError::Configuration(
        ErrorInfo::new("sampling-dimension-kind", "dimension cannot be sampled by this strategy")
            .with_context("path", path_label(&dimension.path))
            .with_context("strategy", strategy),
    )
}

/// Every combination of one value per axis, in `itertools.product` order.
pub fn cartesian_product(axes: &[Vec<Value>]) -> Vec<Vec<Value>> {
    let total: usize = axes.iter().map(Vec::len).product();
    let mut combos = Vec::with_capacity(total);
    for index in 0..total {
        let mut remainder = index;
        let mut combo = vec![Value::Null; axes.len()];
        for dim in (0..axes.len()).rev() {
            let axis = &axes[dim];
            combo[dim] = axis[remainder % axis.len()].clone();
            remainder /= axis.len();
        }
        combos.push(combo);
    }
    combos
}

/// `count` evenly spaced values from `low` to `high` inclusive.
pub fn linspace(low: f64, high: f64, count: usize) -> Vec<f64> {
    match count {
        0 => Vec::new(),
        1 => vec![low],
        _ => {
            let step = (high - low) / (count - 1) as f64;
            let mut values: Vec<f64> = (0..count).map(|i| low + step * i as f64).collect();
            values[count - 1] = high;
            values
        }
    }
}

/// Latin hypercube design with `n_samples` rows scaled into each dimension's bounds.
pub fn latin_hypercube(spec: &SweepSpec, n_samples: usize, seed: u64) -> Result<Vec<ParamMap>, SweepError> {
    if n_samples == 0 {
        return Err(SweepError::configuration(
            "sampling-no-samples",
            "latin hypercube sampling needs at least one sample",
        ));
    }
    let bounds = spec
        .dimensions()
        .iter()
        .map(|dimension| match dimension.value {
            ParamValue::Range { low, high } => Ok((*low, *high)),
            _ => Err(not_sampleable(dimension, "latin_hypercube")),
        })
        .collect::<Result<Vec<_>, _>>()?;

    let mut rng = RngHandle::from_seed(seed);
    let mut design = maximin_lhs(bounds.len(), n_samples, &mut rng);
    scale_samples(&mut design, &bounds);
    design
        .iter()
        .map(|row| {
            let values: Vec<Value> = row.iter().copied().map(Value::from).collect();
            spec.instantiate(&values)
        })
        .collect()
}

/// One random point inside every stratum of each column, columns shuffled independently.
pub fn classic_lhs(dimensions: usize, samples: usize, rng: &mut RngHandle) -> Vec<Vec<f64>> {
    let mut design = vec![vec![0.0; dimensions]; samples];
    for dim in 0..dimensions {
        let mut column: Vec<f64> = (0..samples)
            .map(|stratum| (stratum as f64 + rng.unit()) / samples as f64)
            .collect();
        column.shuffle(rng.inner_mut());
        for (row, value) in design.iter_mut().zip(column) {
            row[dim] = value;
        }
    }
    design
}

/// Best of [`MAXIMIN_ITERATIONS`] classic designs by minimum pairwise distance.
pub fn maximin_lhs(dimensions: usize, samples: usize, rng: &mut RngHandle) -> Vec<Vec<f64>> {
    let mut best = classic_lhs(dimensions, samples, rng);
    let mut best_distance = min_pairwise_distance(&best);
    for _ in 1..MAXIMIN_ITERATIONS {
        let candidate = classic_lhs(dimensions, samples, rng);
        let distance = min_pairwise_distance(&candidate);
        if distance > best_distance {
            best = candidate;
            best_distance = distance;
        }
    }
    best
}

fn min_pairwise_distance(design: &[Vec<f64>]) -> f64 {
    let mut min = f64::INFINITY;
    for (i, a) in design.iter().enumerate() {
        for b in &design[i + 1..] {
            let distance = a
                .iter()
                .zip(b)
                .map(|(x, y)| (x - y) * (x - y))
                .sum::<f64>()
                .sqrt();
            min = min.min(distance);
        }
    }
    min
}

/// Maps unit-cube samples onto `low + x * (high - low)` per column.
pub fn scale_samples(design: &mut [Vec<f64>], bounds: &[(f64, f64)]) {
    for row in design.iter_mut() {
        for (value, (low, high)) in row.iter_mut().zip(bounds) {
            *value = (low + *value * (high - low)).min(*high).max(*low);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn linspace_hits_both_ends() {
        assert_eq!(linspace(0.0, 1.0, 3), vec![0.0, 0.5, 1.0]);
        assert_eq!(linspace(0.3, 0.9, 2), vec![0.3, 0.9]);
        assert_eq!(linspace(2.0, 5.0, 1), vec![2.0]);
    }

    #[test]
    fn product_varies_last_axis_fastest() {
        let axes = vec![vec![json!(0), json!(1)], vec![json!("a"), json!("b"), json!("c")]];
        let combos = cartesian_product(&axes);
        assert_eq!(combos.len(), 6);
        assert_eq!(combos[1], vec![json!(0), json!("b")]);
        assert_eq!(combos[3], vec![json!(1), json!("a")]);
    }

    #[test]
    fn empty_axis_yields_no_rows() {
        let axes = vec![vec![json!(1)], vec![]];
        assert!(cartesian_product(&axes).is_empty());
        assert_eq!(cartesian_product(&[]), vec![Vec::<Value>::new()]);
    }

    #[test]
    fn classic_design_fills_every_stratum() {
        let mut rng = RngHandle::from_seed(7);
        let design = classic_lhs(3, 8, &mut rng);
        for dim in 0..3 {
            let mut strata: Vec<usize> = design.iter().map(|row| (row[dim] * 8.0) as usize).collect();
            strata.sort_unstable();
            assert_eq!(strata, (0..8).collect::<Vec<_>>());
        }
    }
}
