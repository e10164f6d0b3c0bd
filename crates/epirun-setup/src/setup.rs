//! Writing one directory per selected run.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;
use epirun_core::errors::{io_error, SweepError};
use epirun_core::hash::stable_hash_string;
use epirun_core::provenance::{RunProvenance, SchemaVersion};
use epirun_core::rng::derive_run_seed;
use epirun_core::serde::to_canonical_json_pretty;
use epirun_params::{ParamMap, ParameterGenerator, SamplingKind, RUN_NUMBER_KEY};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::SweepConfig;
use crate::engine::{EngineBaseline, EngineConfig};
use crate::paths::{resolve_paths, PathDefaults, RunLayout};

pub const PARAMETERS_FILE: &str = "parameters.json";
pub const RUN_MANIFEST_FILE: &str = "run_manifest.json";
pub const SWEEP_MANIFEST_FILE: &str = "sweep_manifest.json";
pub const ENGINE_CONFIG_FILE: &str = "engine_config.json";

/// Sweep-wide record written to `save_path/sweep_manifest.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SweepManifest {
    /// Manifest schema.
    #[serde(default)]
    pub schema: SchemaVersion,
    /// `run_name` from the path configuration.
    pub run_name: String,
    /// Stable hash of the parameter configuration.
    pub sweep_hash: String,
    /// Sampling strategy that produced the sets.
    pub sampling_type: SamplingKind,
    /// Number of generated sets before selection.
    pub total_runs: usize,
    /// Run numbers written, in directory order.
    pub selected_runs: Vec<usize>,
    /// Seed every per-run engine seed is derived from.
    pub master_seed: u64,
    /// RFC 3339 creation time.
    pub created_at: String,
}

/// What [`RunSetup::generate_parameters`] wrote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetupReport {
    /// Sweep root, after any `_N` suffix.
    pub save_path: PathBuf,
    /// One `run_NNN` directory per selected run.
    pub run_dirs: Vec<PathBuf>,
}

/// A sweep whose parameter sets are resolved and whose layout exists on disk.
#[derive(Debug)]
pub struct RunSetup {
    layout: RunLayout,
    generator: ParameterGenerator,
    sampling_type: SamplingKind,
    sweep_hash: String,
    master_seed: u64,
}

impl RunSetup {
    /// Resolves paths and parameters, then creates the run layout.
    ///
    /// `config_dir` anchors relative parameter files.
    pub fn new(config: &SweepConfig, defaults: &PathDefaults, config_dir: &Path) -> Result<Self, SweepError> {
        let parameters = &config.parameter_configuration;
        let sampling_type = parameters.sampling_kind()?;
        let resolved = resolve_paths(&config.paths_configuration, defaults)?;
        let generator = parameters.build_generator(config_dir)?;
        let sweep_hash = stable_hash_string(parameters)?;
        let master_seed = parameters.random_seed.master_seed();
        let layout = RunLayout::create(resolved)?;
        info!(
            run_name = %layout.paths.run_name,
            save_path = %layout.save_path.display(),
            sampling_type = %sampling_type,
            runs = generator.len(),
            master_seed,
            "sweep set up"
        );
        Ok(Self {
            layout,
            generator,
            sampling_type,
            sweep_hash,
            master_seed,
        })
    }

    pub fn layout(&self) -> &RunLayout {
        &self.layout
    }

    pub fn generator(&self) -> &ParameterGenerator {
        &self.generator
    }

    pub fn master_seed(&self) -> u64 {
        self.master_seed
    }

    pub fn sweep_hash(&self) -> &str {
        &self.sweep_hash
    }

    /// Writes `parameters.json` and `run_manifest.json` for every selected run,
    /// `engine_config.json` too when a baseline is given, then the sweep manifest.
    pub fn generate_parameters(&self, engine: Option<&EngineBaseline>) -> Result<SetupReport, SweepError> {
        let created_at = Utc::now().to_rfc3339();
        let mut run_dirs = Vec::with_capacity(self.generator.len());
        for (idx, parameters) in self.generator.iter().enumerate() {
            let run_dir = self.layout.run_dir(idx);
            fs::create_dir_all(&run_dir).map_err(|err| io_error("run-dir-create", &run_dir, err))?;
            write_json(&run_dir.join(PARAMETERS_FILE), parameters)?;
            write_json(
                &run_dir.join(RUN_MANIFEST_FILE),
                &self.run_provenance(parameters, &created_at),
            )?;
            if let Some(baseline) = engine {
                let engine_config = EngineConfig::from_parameters(parameters, baseline)?;
                write_json(&run_dir.join(ENGINE_CONFIG_FILE), &engine_config)?;
            }
            run_dirs.push(run_dir);
        }
        let manifest = SweepManifest {
            schema: SchemaVersion::default(),
            run_name: self.layout.paths.run_name.clone(),
            sweep_hash: self.sweep_hash.clone(),
            sampling_type: self.sampling_type,
            total_runs: self.generator.parameter_list().len(),
            selected_runs: self.generator.parameters_to_run().to_vec(),
            master_seed: self.master_seed,
            created_at,
        };
        write_json(&self.layout.save_path.join(SWEEP_MANIFEST_FILE), &manifest)?;
        info!(runs = run_dirs.len(), save_path = %self.layout.save_path.display(), "run directories written");
        Ok(SetupReport {
            save_path: self.layout.save_path.clone(),
            run_dirs,
        })
    }

    fn run_provenance(&self, parameters: &ParamMap, created_at: &str) -> RunProvenance {
        let run_number = parameters
            .get(RUN_NUMBER_KEY)
            .and_then(|value| value.as_u64())
            .unwrap_or_default();
        RunProvenance {
            schema: SchemaVersion::default(),
            run_number,
            seed: derive_run_seed(self.master_seed, run_number),
            master_seed: self.master_seed,
            sweep_hash: self.sweep_hash.clone(),
            created_at: created_at.to_string(),
            tool_versions: BTreeMap::from([(
                "epirun".to_string(),
                env!("CARGO_PKG_VERSION").to_string(),
            )]),
        }
    }
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), SweepError> {
    let text = to_canonical_json_pretty(value)?;
    fs::write(path, text).map_err(|err| io_error("run-write", path, err))
}
