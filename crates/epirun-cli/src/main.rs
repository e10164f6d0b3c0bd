use std::error::Error;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use commands::{
    resolve::{self, ResolveArgs},
    scripts::{self, ScriptsArgs},
    setup::{self, SetupArgs},
    submit_several::{self, SubmitSeveralArgs},
    summarize::{self, SummarizeArgs},
    version::{self, VersionArgs},
};

mod commands;
mod logging;

#[derive(Parser, Debug)]
#[command(name = "epirun", about = "Parameter sweeps for an external epidemic engine")]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace). `RUST_LOG` takes precedence.
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
    /// Append logs to this file instead of stderr.
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Resolve a sweep and write one directory per selected run.
    Setup(SetupArgs),
    /// Print resolved paths and parameter sets without writing anything.
    Resolve(ResolveArgs),
    /// Write scheduler submission scripts for every run directory.
    Scripts(ScriptsArgs),
    /// Write a script that submits a subset of the runs.
    SubmitSeveral(SubmitSeveralArgs),
    /// Summarize engine logs of a finished sweep.
    Summarize(SummarizeArgs),
    /// Print the tool version.
    Version(VersionArgs),
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    logging::init(cli.verbose, cli.log_file.as_deref())?;
    match cli.command {
        Command::Setup(args) => setup::run(&args),
        Command::Resolve(args) => resolve::run(&args),
        Command::Scripts(args) => scripts::run(&args),
        Command::SubmitSeveral(args) => submit_several::run(&args),
        Command::Summarize(args) => summarize::run(&args),
        Command::Version(args) => version::run(&args),
    }
}
