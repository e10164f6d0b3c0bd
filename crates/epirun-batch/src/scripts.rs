//! Per-run submission scripts and the scripts that submit them.

use std::fs;
use std::path::{Path, PathBuf};

use epirun_core::errors::{io_error, ErrorInfo, SweepError};
use tracing::{info, warn};

use crate::system::{BatchConfig, Scheduler, SystemConfig};

pub const SUBMIT_SCRIPT: &str = "submit.sh";
pub const SUBMIT_ALL_SCRIPT: &str = "submit_all.sh";

fn run_name(n: usize) -> String {
    format!("run_{n:03}")
}

/// Writes scheduler scripts into the run directories of a sweep.
#[derive(Debug, Clone)]
pub struct ScriptMaker {
    system: SystemConfig,
    batch: BatchConfig,
    run_directory: PathBuf,
    stdout_directory: PathBuf,
}

impl ScriptMaker {
    /// `run_directory` holds the `run_NNN` directories written by setup.
    pub fn new(system: SystemConfig, batch: BatchConfig, run_directory: impl Into<PathBuf>) -> Self {
        let run_directory = run_directory.into();
        Self {
            stdout_directory: run_directory.join("stdout"),
            system,
            batch,
            run_directory,
        }
    }

    pub fn system(&self) -> &SystemConfig {
        &self.system
    }

    /// Nodes needed to hold every job at once, by cores or by memory.
    pub fn nodes_required(&self) -> f64 {
        let jobs = self.batch.number_of_jobs as f64;
        let cpu_nodes = f64::from(self.batch.cpus_per_job) * jobs / self.system.cores_per_node;
        let memory_nodes = self.batch.memory_per_job * jobs / self.system.memory_per_node;
        cpu_nodes.max(memory_nodes)
    }

    pub fn script_dir(&self, n: usize) -> PathBuf {
        self.run_directory.join(run_name(n))
    }

    pub fn header(&self, n: usize) -> Vec<String> {
        let job = format!("{}_{n:03}", self.batch.job_name);
        let stdout = self.stdout_directory.join(run_name(n));
        let stdout = stdout.display();
        let cpus = self.batch.cpus_per_job;
        let queue = &self.system.queue;
        let max_time = &self.system.max_time;
        let mut header = vec!["#!/bin/bash -l".to_string(), String::new()];
        match self.system.scheduler {
            Scheduler::Slurm => {
                header.extend([
                    format!("#SBATCH --ntasks {cpus}"),
                    format!("#SBATCH -J {job}"),
                    format!("#SBATCH -p {queue}"),
                    format!("#SBATCH -o {stdout}.out"),
                    format!("#SBATCH -e {stdout}.err"),
                    format!("#SBATCH -t {max_time}"),
                ]);
                if let Some(account) = &self.system.account {
                    header.push(format!("#SBATCH -A {account}"));
                }
            }
            Scheduler::Pbs => {
                header.extend([
                    format!("#PBS -N {job}"),
                    format!("#PBS -l procs={cpus}"),
                    format!("#PBS -l walltime={max_time}"),
                    format!("#PBS -q {queue}"),
                ]);
                if let Some(account) = &self.system.account {
                    header.push(format!("#PBS -A {account}"));
                }
                header.extend([format!("#PBS -o {stdout}.out"), format!("#PBS -e {stdout}.err")]);
            }
            Scheduler::Lsf => {
                header.extend([
                    format!("#BSUB -R \"span[ptile={cpus}]\""),
                    format!("#BSUB -n {cpus}"),
                    format!("#BSUB -J {job}"),
                    format!("#BSUB -q {queue}"),
                ]);
                if let Some(account) = &self.system.account {
                    header.push(format!("#BSUB -P {account}"));
                }
                header.extend([
                    format!("#BSUB -o {stdout}.out"),
                    format!("#BSUB -e {stdout}.err"),
                    "#BSUB -x".to_string(),
                    format!("#BSUB -W {max_time}"),
                ]);
            }
        }
        header.extend(self.batch.extra_header_lines.iter().cloned());
        header
    }

    pub fn module_lines(&self) -> Vec<String> {
        let mut lines = Vec::new();
        if let Some(init) = &self.system.modules_init_script {
            lines.push(format!("source {init}"));
        }
        lines.push("module purge".to_string());
        lines.extend(self.system.modules_to_load.iter().map(|m| format!("module load {m}")));
        lines.extend(self.batch.extra_module_lines.iter().cloned());
        lines
    }

    pub fn command_lines(&self, n: usize) -> Vec<String> {
        let parameters = self.script_dir(n).join("parameters.json");
        let mut lines = vec![format!(
            "mpirun -np {} {} {}",
            self.batch.cpus_per_job,
            self.batch.engine_command,
            parameters.display()
        )];
        lines.extend(self.batch.extra_command_lines.iter().cloned());
        lines
    }

    pub fn submission_script(&self, n: usize) -> String {
        let mut lines = self.header(n);
        lines.push(String::new());
        lines.extend(self.module_lines());
        lines.push(String::new());
        lines.extend(self.command_lines(n));
        lines.join("\n") + "\n"
    }

    pub fn submit_all_script(&self, scripts: &[PathBuf]) -> String {
        let command = self.system.scheduler.submit_command(self.system.submit_via_stdin);
        let mut lines = vec!["#!/bin/bash -l".to_string(), String::new()];
        lines.extend(scripts.iter().map(|path| format!("{command} {}", path.display())));
        lines.join("\n") + "\n"
    }

    /// Writes `run_NNN/submit.sh` for every job and `submit_all.sh` next to them.
    ///
    /// Every run directory must already exist.
    pub fn write_scripts(&self) -> Result<Vec<PathBuf>, SweepError> {
        fs::create_dir_all(&self.stdout_directory)
            .map_err(|err| io_error("batch-stdout-dir", &self.stdout_directory, err))?;
        let mut scripts = Vec::with_capacity(self.batch.number_of_jobs);
        for n in 0..self.batch.number_of_jobs {
            let dir = self.script_dir(n);
            if !dir.is_dir() {
                return Err(SweepError::Configuration(
                    ErrorInfo::new("batch-run-missing", "run directory does not exist")
                        .with_context("path", dir.display().to_string())
                        .with_hint("run setup first or lower number_of_jobs"),
                ));
            }
            let path = dir.join(SUBMIT_SCRIPT);
            fs::write(&path, self.submission_script(n)).map_err(|err| io_error("batch-write", &path, err))?;
            scripts.push(path);
        }
        let all = self.run_directory.join(SUBMIT_ALL_SCRIPT);
        fs::write(&all, self.submit_all_script(&scripts)).map_err(|err| io_error("batch-write", &all, err))?;
        info!(
            system = %self.system.name,
            jobs = scripts.len(),
            nodes_required = self.nodes_required(),
            submit_all = %all.display(),
            "submission scripts written"
        );
        Ok(scripts)
    }
}

/// Parses a job list: `"lower-upper"` (inclusive), `"a,b,c"`, or `"upper"` for `0..=upper`.
///
/// Unlike a run selection, a lone integer here is an upper bound: the
/// submit-several script queues every run up to it, while a selection names
/// the one run to execute. Use `"n-n"` to submit a single job.
pub fn parse_job_list(raw: &str) -> Result<Vec<usize>, SweepError> {
    let malformed = || {
        SweepError::Configuration(
            ErrorInfo::new("batch-job-list", "job list could not be parsed")
                .with_context("jobs", raw)
                .with_hint("use \"lower-upper\", \"a,b,c\" or a single upper bound"),
        )
    };
    let raw = raw.trim();
    if let Some((low, high)) = raw.split_once('-') {
        let low: usize = low.trim().parse().map_err(|_| malformed())?;
        let high: usize = high.trim().parse().map_err(|_| malformed())?;
        if low > high {
            return Err(malformed());
        }
        return Ok((low..=high).collect());
    }
    if raw.contains(',') {
        return raw
            .split(',')
            .map(|part| part.trim().parse().map_err(|_| malformed()))
            .collect();
    }
    let upper: usize = raw.parse().map_err(|_| malformed())?;
    Ok((0..=upper).collect())
}

/// Outcome of [`write_submit_several`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitSeveralReport {
    pub output: PathBuf,
    pub submitted: Vec<usize>,
    pub missing: Vec<usize>,
}

/// Writes a script submitting only `jobs`. Jobs without a `submit.sh` are
/// skipped; the first one is reported as a warning.
pub fn write_submit_several(
    run_directory: &Path,
    jobs: &[usize],
    submit_command: &str,
    output: &Path,
) -> Result<SubmitSeveralReport, SweepError> {
    let mut lines = vec!["#!/bin/bash".to_string(), String::new()];
    let mut submitted = Vec::new();
    let mut missing = Vec::new();
    for &job in jobs {
        let script = run_directory.join(run_name(job)).join(SUBMIT_SCRIPT);
        if script.is_file() {
            lines.push(format!("{submit_command} {}", script.display()));
            submitted.push(job);
        } else {
            if missing.is_empty() {
                warn!(script = %script.display(), "no submission script for selected job, skipping missing jobs");
            }
            missing.push(job);
        }
    }
    fs::write(output, lines.join("\n") + "\n").map_err(|err| io_error("batch-write", output, err))?;
    info!(output = %output.display(), submitted = submitted.len(), missing = missing.len(), "submit-several script written");
    Ok(SubmitSeveralReport {
        output: output.to_path_buf(),
        submitted,
        missing,
    })
}
