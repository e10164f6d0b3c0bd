//! Sweep configuration file (`paths_configuration` + `parameter_configuration`).

use std::fs;
use std::path::{Path, PathBuf};

use epirun_core::errors::{io_error, ErrorInfo, SweepError};
use epirun_core::rng::{SeedPolicy, DEFAULT_SAMPLING_SEED};
use epirun_core::serde::from_yaml_slice;
use epirun_params::{
    GeneratorOptions, OnConflict, ParamMap, ParameterGenerator, RunSelection, SamplingKind,
    PATH_SEPARATOR,
};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Top level of a sweep configuration YAML.
///
/// Unknown sections (for example `system_configuration`, read by the batch
/// tooling) are ignored here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepConfig {
    pub paths_configuration: IndexMap<String, String>,
    pub parameter_configuration: ParameterConfiguration,
}

impl SweepConfig {
    /// Reads and parses the YAML file at `path`.
    pub fn load(path: &Path) -> Result<Self, SweepError> {
        let bytes = fs::read(path).map_err(|err| io_error("config-read", path, err))?;
        from_yaml_slice(&bytes)
    }
}

fn default_lhs_seed() -> u64 {
    DEFAULT_SAMPLING_SEED
}

/// How the parameter sets of a sweep are produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterConfiguration {
    /// One of `file`, `latin_hypercube`, `grid` or `regular_grid`.
    #[serde(alias = "config_type")]
    pub sampling_type: String,
    /// `"all"`, a `"low-high"` string or a list of indices.
    #[serde(default)]
    pub parameters_to_run: Value,
    /// Sweep specification tree.
    #[serde(default, alias = "parameters_to_vary")]
    pub parameters: ParamMap,
    /// Latin hypercube design size.
    #[serde(default, alias = "number_of_samples", skip_serializing_if = "Option::is_none")]
    pub n_samples: Option<usize>,
    /// Parameter table for `file` sampling, relative to the configuration.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameter_file: Option<PathBuf>,
    /// Scalars merged into every generated set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters_to_fix: Option<ParamMap>,
    /// Precedence between fixed and swept values.
    #[serde(default)]
    pub on_conflict: OnConflict,
    /// Seed of the Latin hypercube design.
    #[serde(default = "default_lhs_seed")]
    pub lhs_seed: u64,
    /// Master seed for per-run engine seeds.
    #[serde(default)]
    pub random_seed: SeedPolicy,
}

/// Removes `key` from `map` without disturbing the order of the other entries.
fn take_key(map: &mut ParamMap, key: &str) -> Option<Value> {
    let mut taken = None;
    *map = std::mem::take(map)
        .into_iter()
        .filter_map(|(k, v)| {
            if k == key {
                taken = Some(v);
                None
            } else {
                Some((k, v))
            }
        })
        .collect();
    taken
}

impl ParameterConfiguration {
    pub fn sampling_kind(&self) -> Result<SamplingKind, SweepError> {
        self.sampling_type.parse()
    }

    pub fn run_selection(&self) -> Result<RunSelection, SweepError> {
        RunSelection::from_value(&self.parameters_to_run)
    }

    pub fn generator_options(&self) -> Result<GeneratorOptions, SweepError> {
        Ok(GeneratorOptions {
            parameters_to_run: self.run_selection()?,
            parameters_to_fix: self.parameters_to_fix.clone(),
            on_conflict: self.on_conflict,
            separator: PATH_SEPARATOR.to_string(),
            sampling_seed: self.lhs_seed,
        })
    }

    /// Samples and resolves every parameter set of the sweep.
    ///
    /// Relative parameter files are looked up from `base_dir`.
    pub fn build_generator(&self, base_dir: &Path) -> Result<ParameterGenerator, SweepError> {
        let kind = self.sampling_kind()?;
        let options = self.generator_options()?;
        let mut parameters = self.parameters.clone();
        match kind {
            SamplingKind::File => {
                let embedded = take_key(&mut parameters, "parameter_file")
                    .or_else(|| take_key(&mut parameters, "path"));
                let file = match (&self.parameter_file, embedded) {
                    (Some(file), _) => file.clone(),
                    (None, Some(Value::String(file))) => PathBuf::from(file),
                    _ => {
                        return Err(SweepError::Configuration(
                            ErrorInfo::new("config-parameter-file", "file sampling needs a parameter file")
                                .with_hint("set parameter_configuration.parameter_file"),
                        ))
                    }
                };
                ParameterGenerator::from_file(base_dir.join(file), &options)
            }
            SamplingKind::LatinHypercube => {
                let embedded = take_key(&mut parameters, "n_samples");
                let n_samples = match (self.n_samples, embedded) {
                    (Some(n), _) => n,
                    (None, Some(value)) => value.as_u64().map(|n| n as usize).ok_or_else(|| {
                        SweepError::configuration("config-n-samples", "n_samples must be a non-negative integer")
                    })?,
                    (None, None) => {
                        return Err(SweepError::configuration(
                            "config-n-samples",
                            "latin hypercube sampling needs n_samples",
                        ))
                    }
                };
                ParameterGenerator::from_latin_hypercube(&parameters, n_samples, &options)
            }
            SamplingKind::Grid => ParameterGenerator::from_grid(&parameters, &options),
            SamplingKind::RegularGrid => ParameterGenerator::from_regular_grid(&parameters, &options),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn aliases_and_defaults() {
        let yaml = r#"
config_type: latin_hypercube
parameters_to_vary:
  beta: [0.1, 0.2]
number_of_samples: 4
"#;
        let config: ParameterConfiguration = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.sampling_type, "latin_hypercube");
        assert_eq!(config.n_samples, Some(4));
        assert_eq!(config.lhs_seed, 1);
        assert_eq!(config.on_conflict, OnConflict::PreferExplicit);
        assert_eq!(config.random_seed, SeedPolicy::Random);
        assert_eq!(config.run_selection().unwrap(), RunSelection::All);
    }

    #[test]
    fn take_key_preserves_order() {
        let mut map = json!({"a": 1, "n_samples": 3, "b": 2, "c": 3}).as_object().cloned().unwrap();
        assert_eq!(take_key(&mut map, "n_samples"), Some(json!(3)));
        assert_eq!(map.keys().collect::<Vec<_>>(), vec!["a", "b", "c"]);
    }
}
