use std::error::Error;
use std::path::PathBuf;

use clap::Args;
use epirun_core::serde::to_canonical_json_pretty;
use epirun_params::ParamMap;
use epirun_setup::{resolve_paths, PathDefaults, ResolvedPaths, SweepConfig};
use serde::Serialize;

use super::config_dir;

#[derive(Args, Debug)]
pub struct ResolveArgs {
    /// Sweep configuration YAML.
    #[arg(long)]
    pub config: PathBuf,
    /// Print only the selected run at this position.
    #[arg(long)]
    pub index: Option<usize>,
}

#[derive(Serialize)]
struct Resolution<'a> {
    paths: &'a ResolvedPaths,
    selected_runs: &'a [usize],
    runs: Vec<&'a ParamMap>,
}

/// Prints resolved paths and parameter sets without touching the filesystem.
pub fn run(args: &ResolveArgs) -> Result<(), Box<dyn Error>> {
    let config = SweepConfig::load(&args.config).map_err(|err| Box::new(err) as Box<dyn Error>)?;
    let paths = resolve_paths(&config.paths_configuration, &PathDefaults::default())
        .map_err(|err| Box::new(err) as Box<dyn Error>)?;
    let generator = config
        .parameter_configuration
        .build_generator(config_dir(&args.config))
        .map_err(|err| Box::new(err) as Box<dyn Error>)?;
    let runs = match args.index {
        Some(index) => {
            let Some(parameters) = generator.get(index) else {
                return Err(format!("index {index} is outside the {} selected runs", generator.len()).into());
            };
            vec![parameters]
        }
        None => generator.iter().collect(),
    };
    let output = Resolution {
        paths: &paths,
        selected_runs: generator.parameters_to_run(),
        runs,
    };
    let text = to_canonical_json_pretty(&output).map_err(|err| Box::new(err) as Box<dyn Error>)?;
    println!("{text}");
    Ok(())
}
