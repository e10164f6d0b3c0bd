use std::error::Error;
use std::path::PathBuf;

use clap::Args;
use epirun_summary::summarize_sweep;

#[derive(Args, Debug)]
pub struct SummarizeArgs {
    /// Sweep save path containing `runs/`.
    #[arg(long)]
    pub save_path: PathBuf,
    /// Log file name under each run's `results/`.
    #[arg(long)]
    pub log_name: Option<String>,
}

pub fn run(args: &SummarizeArgs) -> Result<(), Box<dyn Error>> {
    let report = summarize_sweep(&args.save_path, args.log_name.as_deref())
        .map_err(|err| Box::new(err) as Box<dyn Error>)?;
    println!(
        "{} runs summarized, {} skipped: {}",
        report.processed.len(),
        report.skipped.len(),
        report.sweep_summary.display()
    );
    Ok(())
}
