//! Slurm, PBS and LSF submission scripts for epirun sweeps.

pub mod scripts;
pub mod system;

pub use scripts::{
    parse_job_list, write_submit_several, ScriptMaker, SubmitSeveralReport, SUBMIT_ALL_SCRIPT,
    SUBMIT_SCRIPT,
};
pub use system::{BatchConfig, Scheduler, SystemConfig};
