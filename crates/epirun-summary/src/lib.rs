//! Summaries of engine output logs for a completed sweep.

pub mod extract;

pub use extract::{
    group_regions, read_run_log, regional_summary, summarize_sweep, world_summary, LogRecord,
    RunLog, SkippedRun, SummaryReport, TimeSeries, DEFAULT_LOG_NAME, RESULTS_DIR,
    SWEEP_SUMMARY_FILE,
};
