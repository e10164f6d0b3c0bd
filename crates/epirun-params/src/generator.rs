//! Resolution of sampled rows into numbered, selectable parameter sets.

use std::collections::BTreeSet;
use std::ops::Index;
use std::path::Path;

use epirun_core::errors::{ErrorInfo, SweepError};
use epirun_core::rng::DEFAULT_SAMPLING_SEED;
use serde_json::Value;
use tracing::{debug, info};

use crate::fixed::{apply_fixed_parameters, OnConflict};
use crate::lockdown::expand_lockdown;
use crate::paths::{leaf_paths, path_label, ParamMap, ParamPath};
use crate::resolve::{resolve_expressions, PATH_SEPARATOR};
use crate::sampling;
use crate::selection::RunSelection;
use crate::table::read_parameter_table;
use crate::value::{ListReading, SweepSpec};

/// Key injected into every resolved parameter set.
pub const RUN_NUMBER_KEY: &str = "run_number";

/// Knobs shared by every way of building a [`ParameterGenerator`].
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratorOptions {
    /// Which generated sets are materialized, and in what order.
    pub parameters_to_run: RunSelection,
    /// Scalars merged into every generated set.
    pub parameters_to_fix: Option<ParamMap>,
    /// Precedence between fixed and swept values.
    pub on_conflict: OnConflict,
    /// Joins path segments in references and flattened table headers.
    pub separator: String,
    /// Seed of the Latin hypercube design.
    pub sampling_seed: u64,
}

impl Default for GeneratorOptions {
    fn default() -> Self {
        Self {
            parameters_to_run: RunSelection::All,
            parameters_to_fix: None,
            on_conflict: OnConflict::default(),
            separator: PATH_SEPARATOR.to_string(),
            sampling_seed: DEFAULT_SAMPLING_SEED,
        }
    }
}

impl GeneratorOptions {
    pub fn with_selection(mut self, selection: RunSelection) -> Self {
        self.parameters_to_run = selection;
        self
    }

    pub fn with_fixed(mut self, fixed: ParamMap, on_conflict: OnConflict) -> Self {
        self.parameters_to_fix = Some(fixed);
        self.on_conflict = on_conflict;
        self
    }
}

/// Fully resolved parameter sets, addressed through the run selection.
///
/// `generator[i]` and iteration go through the selection: the `i`-th element
/// is the run at `parameters_to_run()[i]`, whose `run_number` is its position
/// in the full generated list.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterGenerator {
    parameter_list: Vec<ParamMap>,
    parameters_to_run: Vec<usize>,
}

impl ParameterGenerator {
    /// Builds from explicit parameter sets. Every entry must declare the same leaves.
    pub fn new(parameter_list: Vec<ParamMap>, options: &GeneratorOptions) -> Result<Self, SweepError> {
        check_consistent_keys(&parameter_list)?;
        Self::build(parameter_list, options)
    }

    /// Cartesian product over list-valued leaves.
    pub fn from_grid(spec: &ParamMap, options: &GeneratorOptions) -> Result<Self, SweepError> {
        let spec = SweepSpec::parse(spec, ListReading::Choices)?;
        Self::build(sampling::grid(&spec)?, options)
    }

    /// Cartesian product over `[low, high, count]` linspaces.
    pub fn from_regular_grid(spec: &ParamMap, options: &GeneratorOptions) -> Result<Self, SweepError> {
        let spec = SweepSpec::parse(spec, ListReading::RegularBounds)?;
        Self::build(sampling::grid(&spec)?, options)
    }

    /// Maximin Latin hypercube over `[low, high]` leaves, seeded by `options.sampling_seed`.
    pub fn from_latin_hypercube(
        spec: &ParamMap,
        n_samples: usize,
        options: &GeneratorOptions,
    ) -> Result<Self, SweepError> {
        let spec = SweepSpec::parse(spec, ListReading::Bounds)?;
        Self::build(
            sampling::latin_hypercube(&spec, n_samples, options.sampling_seed)?,
            options,
        )
    }

    /// Rows of a CSV, TSV or JSON parameter table.
    pub fn from_file(path: impl AsRef<Path>, options: &GeneratorOptions) -> Result<Self, SweepError> {
        let rows = read_parameter_table(path.as_ref(), &options.separator)?;
        Self::build(rows, options)
    }

    fn build(mut parameter_list: Vec<ParamMap>, options: &GeneratorOptions) -> Result<Self, SweepError> {
        let parameters_to_run = options.parameters_to_run.resolve(parameter_list.len())?;
        for (run_number, entry) in parameter_list.iter_mut().enumerate() {
            if let Some(fixed) = &options.parameters_to_fix {
                apply_fixed_parameters(entry, fixed, options.on_conflict)?;
            }
            let report = resolve_expressions(entry, &options.separator)?;
            if report.resolved > 0 {
                debug!(run_number, resolved = report.resolved, passes = report.passes, "expressions resolved");
            }
            expand_lockdown(entry)?;
            entry.insert(RUN_NUMBER_KEY.to_string(), Value::from(run_number as u64));
        }
        info!(
            generated = parameter_list.len(),
            selected = parameters_to_run.len(),
            selection = %options.parameters_to_run,
            "parameter sets resolved"
        );
        Ok(Self {
            parameter_list,
            parameters_to_run,
        })
    }

    /// Number of selected runs.
    pub fn len(&self) -> usize {
        self.parameters_to_run.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parameters_to_run.is_empty()
    }

    /// Selected run at position `idx` of the selection.
    pub fn get(&self, idx: usize) -> Option<&ParamMap> {
        self.parameters_to_run
            .get(idx)
            .and_then(|&raw| self.parameter_list.get(raw))
    }

    /// Every generated set, selected or not.
    pub fn parameter_list(&self) -> &[ParamMap] {
        &self.parameter_list
    }

    /// Indices into [`Self::parameter_list`] in execution order.
    pub fn parameters_to_run(&self) -> &[usize] {
        &self.parameters_to_run
    }

    pub fn iter(&self) -> Iter<'_> {
        Iter {
            generator: self,
            position: 0,
        }
    }
}

impl Index<usize> for ParameterGenerator {
    type Output = ParamMap;

    fn index(&self, idx: usize) -> &Self::Output {
        &self.parameter_list[self.parameters_to_run[idx]]
    }
}

/// Iterator over selected runs in selection order.
#[derive(Debug, Clone)]
pub struct Iter<'a> {
    generator: &'a ParameterGenerator,
    position: usize,
}

impl<'a> Iterator for Iter<'a> {
    type Item = &'a ParamMap;

    fn next(&mut self) -> Option<Self::Item> {
        let item = self.generator.get(self.position)?;
        self.position += 1;
        Some(item)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.generator.len().saturating_sub(self.position);
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for Iter<'_> {}

impl<'a> IntoIterator for &'a ParameterGenerator {
    type Item = &'a ParamMap;
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

fn leaf_set(entry: &ParamMap) -> BTreeSet<ParamPath> {
    leaf_paths(entry).into_iter().map(|(path, _)| path).collect()
}

fn check_consistent_keys(parameter_list: &[ParamMap]) -> Result<(), SweepError> {
    let Some((first, rest)) = parameter_list.split_first() else {
        return Ok(());
    };
    let expected = leaf_set(first);
    for (offset, entry) in rest.iter().enumerate() {
        let found = leaf_set(entry);
        if found != expected {
            let describe = |paths: Vec<&ParamPath>| {
                paths.into_iter().map(|p| path_label(p)).collect::<Vec<_>>().join(", ")
            };
            return Err(SweepError::Configuration(
                ErrorInfo::new("inconsistent-parameter-keys", "parameter sets declare different keys")
                    .with_context("index", (offset + 1).to_string())
                    .with_context("missing", describe(expected.difference(&found).collect()))
                    .with_context("unexpected", describe(found.difference(&expected).collect())),
            ));
        }
    }
    Ok(())
}
