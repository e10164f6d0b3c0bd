//! Run setup for epirun sweeps: configuration loading, path placeholders,
//! per-run directories with manifests, and engine configuration documents.

pub mod config;
pub mod engine;
pub mod paths;
pub mod setup;

pub use config::{ParameterConfiguration, SweepConfig};
pub use engine::{EngineBaseline, EngineConfig};
pub use paths::{resolve_paths, run_dir_name, PathDefaults, ResolvedPaths, RunLayout};
pub use setup::{
    RunSetup, SetupReport, SweepManifest, ENGINE_CONFIG_FILE, PARAMETERS_FILE, RUN_MANIFEST_FILE,
    SWEEP_MANIFEST_FILE,
};
