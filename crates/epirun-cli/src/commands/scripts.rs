use std::error::Error;
use std::path::PathBuf;

use clap::Args;
use epirun_batch::{BatchConfig, ScriptMaker, SystemConfig};

#[derive(Args, Debug)]
pub struct ScriptsArgs {
    /// Sweep configuration YAML with a `system_configuration` section.
    #[arg(long)]
    pub config: PathBuf,
    /// Directory holding the `run_NNN` directories.
    #[arg(long)]
    pub run_directory: PathBuf,
    /// Registry of `<system>.yaml` cluster descriptions.
    #[arg(long, default_value = "configuration/systems")]
    pub system_dir: PathBuf,
}

pub fn run(args: &ScriptsArgs) -> Result<(), Box<dyn Error>> {
    let batch = BatchConfig::from_sweep_config(&args.config).map_err(|err| Box::new(err) as Box<dyn Error>)?;
    let system =
        SystemConfig::load(&args.system_dir, &batch.system).map_err(|err| Box::new(err) as Box<dyn Error>)?;
    let maker = ScriptMaker::new(system, batch, &args.run_directory);
    let scripts = maker
        .write_scripts()
        .map_err(|err| Box::new(err) as Box<dyn Error>)?;
    println!(
        "{} submission scripts for {} ({:.1} nodes)",
        scripts.len(),
        maker.system().name,
        maker.nodes_required()
    );
    Ok(())
}
