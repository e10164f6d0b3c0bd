use std::error::Error;
use std::path::PathBuf;

use clap::Args;
use epirun_setup::{EngineBaseline, PathDefaults, RunLayout, RunSetup, SweepConfig};

use super::config_dir;

#[derive(Args, Debug)]
pub struct SetupArgs {
    /// Sweep configuration YAML.
    #[arg(long)]
    pub config: PathBuf,
    /// Parent of `save_path` when the configuration says `auto`.
    #[arg(long)]
    pub runs_root: Option<PathBuf>,
    /// Directory with the baseline `policy.yaml` and `interaction.yaml`.
    #[arg(long)]
    pub baseline_dir: Option<PathBuf>,
    /// Also translate every run into `engine_config.json`.
    #[arg(long)]
    pub engine_config: bool,
}

pub fn run(args: &SetupArgs) -> Result<(), Box<dyn Error>> {
    let config = SweepConfig::load(&args.config).map_err(|err| Box::new(err) as Box<dyn Error>)?;
    let mut defaults = PathDefaults::default();
    if let Some(runs_root) = &args.runs_root {
        defaults.runs_root = runs_root.clone();
    }
    if let Some(baseline_dir) = &args.baseline_dir {
        defaults.baseline_dir = baseline_dir.clone();
    }
    let setup = RunSetup::new(&config, &defaults, config_dir(&args.config))
        .map_err(|err| Box::new(err) as Box<dyn Error>)?;
    let baseline = if args.engine_config {
        Some(load_baseline(setup.layout())?)
    } else {
        None
    };
    let report = setup
        .generate_parameters(baseline.as_ref())
        .map_err(|err| Box::new(err) as Box<dyn Error>)?;
    println!(
        "{} runs written to {}",
        report.run_dirs.len(),
        report.save_path.display()
    );
    Ok(())
}

fn load_baseline(layout: &RunLayout) -> Result<EngineBaseline, Box<dyn Error>> {
    let paths = &layout.paths;
    let (Some(interaction), Some(policy)) =
        (paths.baseline_interaction_path(), paths.baseline_policy_path())
    else {
        return Err("--engine-config needs baseline_interaction_path and baseline_policy_path".into());
    };
    EngineBaseline::load(interaction, policy).map_err(|err| Box::new(err) as Box<dyn Error>)
}
