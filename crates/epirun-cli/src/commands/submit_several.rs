use std::error::Error;
use std::path::PathBuf;

use clap::Args;
use epirun_batch::{parse_job_list, write_submit_several};

#[derive(Args, Debug)]
pub struct SubmitSeveralArgs {
    /// Directory holding the `run_NNN` directories.
    #[arg(long)]
    pub run_directory: PathBuf,
    /// Jobs to submit: `lower-upper`, `a,b,c`, or an upper bound.
    #[arg(long)]
    pub jobs: String,
    /// Command prefixed to every script.
    #[arg(long, default_value = "sbatch")]
    pub scheduler_command: String,
    /// Output script; defaults to `submit_several.sh` in the run directory.
    #[arg(long)]
    pub out: Option<PathBuf>,
}

pub fn run(args: &SubmitSeveralArgs) -> Result<(), Box<dyn Error>> {
    let jobs = parse_job_list(&args.jobs).map_err(|err| Box::new(err) as Box<dyn Error>)?;
    let out = args
        .out
        .clone()
        .unwrap_or_else(|| args.run_directory.join("submit_several.sh"));
    let report = write_submit_several(&args.run_directory, &jobs, &args.scheduler_command, &out)
        .map_err(|err| Box::new(err) as Box<dyn Error>)?;
    println!(
        "{}: {} submitted, {} missing",
        report.output.display(),
        report.submitted.len(),
        report.missing.len()
    );
    Ok(())
}
