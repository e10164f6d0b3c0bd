//! Cluster and batch configuration.

use std::fs;
use std::path::Path;

use epirun_core::errors::{io_error, ErrorInfo, SweepError};
use epirun_core::serde::from_yaml_slice;
use serde::{Deserialize, Serialize};

/// Batch scheduler of a cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scheduler {
    Slurm,
    Pbs,
    Lsf,
}

impl Scheduler {
    /// Command submitting one script. LSF sites that read the script from
    /// stdin use `bsub <`.
    pub fn submit_command(&self, via_stdin: bool) -> &'static str {
        match self {
            Scheduler::Slurm => "sbatch",
            Scheduler::Pbs => "qsub",
            Scheduler::Lsf if via_stdin => "bsub <",
            Scheduler::Lsf => "bsub",
        }
    }
}

/// Description of one cluster, stored as `<system_dir>/<name>.yaml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemConfig {
    pub name: String,
    pub scheduler: Scheduler,
    pub queue: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account: Option<String>,
    pub max_time: String,
    pub cores_per_node: f64,
    /// Memory per node in GB.
    pub memory_per_node: f64,
    #[serde(default)]
    pub modules_to_load: Vec<String>,
    /// Line sourced before any `module` command, for sites that need it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modules_init_script: Option<String>,
    #[serde(default)]
    pub submit_via_stdin: bool,
}

impl SystemConfig {
    /// Looks `name` up in the system registry directory.
    pub fn load(system_dir: &Path, name: &str) -> Result<Self, SweepError> {
        let path = system_dir.join(format!("{name}.yaml"));
        if !path.is_file() {
            return Err(SweepError::Configuration(
                ErrorInfo::new("system-unsupported", "system not supported")
                    .with_context("system", name)
                    .with_context("registry", system_dir.display().to_string()),
            ));
        }
        let bytes = fs::read(&path).map_err(|err| io_error("system-read", &path, err))?;
        from_yaml_slice(&bytes)
    }
}

fn default_job_name() -> String {
    "epirun".to_string()
}

fn default_memory_per_job() -> f64 {
    100.0
}

fn default_cpus_per_job() -> u32 {
    32
}

fn default_number_of_jobs() -> usize {
    250
}

fn default_engine_command() -> String {
    "epirun-engine".to_string()
}

/// `system_configuration` section of a sweep configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchConfig {
    pub system: String,
    #[serde(default = "default_job_name")]
    pub job_name: String,
    /// Memory per job in GB.
    #[serde(default = "default_memory_per_job")]
    pub memory_per_job: f64,
    #[serde(default = "default_cpus_per_job")]
    pub cpus_per_job: u32,
    #[serde(default = "default_number_of_jobs")]
    pub number_of_jobs: usize,
    /// Engine executable; the run's `parameters.json` is appended.
    #[serde(default = "default_engine_command")]
    pub engine_command: String,
    #[serde(default)]
    pub extra_header_lines: Vec<String>,
    #[serde(default)]
    pub extra_module_lines: Vec<String>,
    #[serde(default)]
    pub extra_command_lines: Vec<String>,
}

#[derive(Deserialize)]
struct SweepFile {
    system_configuration: Option<BatchConfig>,
}

impl BatchConfig {
    /// Reads `system_configuration` from a sweep configuration YAML.
    pub fn from_sweep_config(path: &Path) -> Result<Self, SweepError> {
        let bytes = fs::read(path).map_err(|err| io_error("config-read", path, err))?;
        let file: SweepFile = from_yaml_slice(&bytes)?;
        file.system_configuration.ok_or_else(|| {
            SweepError::Configuration(
                ErrorInfo::new("batch-missing-section", "configuration has no system_configuration")
                    .with_context("path", path.display().to_string()),
            )
        })
    }
}
