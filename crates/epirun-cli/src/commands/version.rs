use std::error::Error;
use std::process::Command;

use clap::Args;
use epirun_core::provenance::SchemaVersion;
use epirun_core::serde::to_canonical_json_bytes;
use serde::Serialize;

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Emit extended metadata including git and toolchain information.
    #[arg(long)]
    pub long: bool,
}

#[derive(Debug, Serialize)]
struct VersionInfo {
    version: String,
    manifest_schema: SchemaVersion,
    git_commit: String,
    rustc: String,
}

pub fn run(args: &VersionArgs) -> Result<(), Box<dyn Error>> {
    if !args.long {
        println!("{}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }
    let info = VersionInfo {
        version: env!("CARGO_PKG_VERSION").into(),
        manifest_schema: SchemaVersion::default(),
        git_commit: command_output("git", &["rev-parse", "HEAD"]).unwrap_or_else(|| "unknown".into()),
        rustc: command_output("rustc", &["--version"]).unwrap_or_else(|| "rustc unavailable".into()),
    };
    let json = to_canonical_json_bytes(&info).map_err(|err| Box::new(err) as Box<dyn Error>)?;
    println!("{}", String::from_utf8(json)?);
    Ok(())
}

fn command_output(program: &str, args: &[&str]) -> Option<String> {
    let out = Command::new(program).args(args).output().ok()?;
    out.status
        .success()
        .then(|| String::from_utf8_lossy(&out.stdout).trim().to_string())
}
