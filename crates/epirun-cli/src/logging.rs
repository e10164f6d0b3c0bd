use std::error::Error;
use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const TARGETS: [&str; 5] = [
    "epirun",
    "epirun_params",
    "epirun_setup",
    "epirun_batch",
    "epirun_summary",
];

fn level(verbose: u8) -> &'static str {
    match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

/// Installs the global subscriber. `RUST_LOG` wins over `-v`.
pub fn init(verbose: u8, log_file: Option<&Path>) -> Result<(), Box<dyn Error>> {
    let level = level(verbose);
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let directives: Vec<String> = TARGETS.iter().map(|target| format!("{target}={level}")).collect();
        EnvFilter::new(directives.join(","))
    });
    match log_file {
        Some(path) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().with_writer(Mutex::new(file)).with_ansi(false))
                .try_init()?;
        }
        None => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
                .try_init()?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::level;

    #[test]
    fn verbosity_saturates_at_trace() {
        assert_eq!(level(0), "warn");
        assert_eq!(level(2), "debug");
        assert_eq!(level(9), "trace");
    }
}
