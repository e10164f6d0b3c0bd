//! Reads `runs/run_NNN/results/<log>` for every run and writes per-run world
//! and regional summaries plus one row per run into `sweep_summary.csv`.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use csv::{ReaderBuilder, Trim, WriterBuilder};
use epirun_core::errors::{io_error, ErrorInfo, SweepError};
use epirun_core::serde::from_json_slice;
use epirun_params::{flatten, ParamMap, PATH_SEPARATOR, RUN_NUMBER_KEY};
use indexmap::{IndexMap, IndexSet};
use serde_json::Value;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

pub const DEFAULT_LOG_NAME: &str = "summary.csv";
pub const RESULTS_DIR: &str = "results";
pub const SWEEP_SUMMARY_FILE: &str = "sweep_summary.csv";

const TIME_COLUMN: &str = "time_stamp";
const REGION_COLUMN: &str = "region";
const SEROPREVALENCE_COLUMN: &str = "seroprevalence";
const DAILY_INFECTIONS_COLUMN: &str = "daily_infections";
const POPULATION_COLUMNS: [&str; 4] = [
    "current_infected",
    "current_recovered",
    "current_dead",
    "current_susceptible",
];
const REGION_GROUPS: [(&str, [&str; 2]); 2] = [
    ("Midlands", ["East Midlands", "West Midlands"]),
    ("North East and Yorkshire", ["North East", "Yorkshire and The Humber"]),
];

/// One row of an engine log.
#[derive(Debug, Clone, PartialEq)]
pub struct LogRecord {
    pub time_stamp: String,
    pub region: String,
    pub counts: Vec<f64>,
}

/// Parsed engine log: count column names and the rows in file order.
#[derive(Debug, Clone, PartialEq)]
pub struct RunLog {
    pub columns: Vec<String>,
    pub records: Vec<LogRecord>,
}

fn corrupt(code: &str, path: &Path, message: impl Into<String>) -> SweepError {
    SweepError::Serde(ErrorInfo::new(code, message).with_context("path", path.display().to_string()))
}

fn csv_error(code: &str, path: &Path, err: csv::Error) -> SweepError {
    if err.is_io_error() {
        io_error(code, path, err)
    } else {
        corrupt(code, path, err.to_string())
    }
}

/// Reads an engine log. Empty count cells read as zero; anything else that
/// is not a number makes the log corrupt.
pub fn read_run_log(path: &Path) -> Result<RunLog, SweepError> {
    let mut reader = ReaderBuilder::new()
        .trim(Trim::All)
        .from_path(path)
        .map_err(|err| csv_error("summary-log-read", path, err))?;
    let headers = reader
        .headers()
        .map_err(|err| csv_error("summary-log-read", path, err))?
        .clone();
    let position = |name: &str| {
        headers.iter().position(|header| header == name).ok_or_else(|| {
            SweepError::Serde(
                ErrorInfo::new("summary-log-columns", "log is missing a required column")
                    .with_context("path", path.display().to_string())
                    .with_context("column", name),
            )
        })
    };
    let time_idx = position(TIME_COLUMN)?;
    let region_idx = position(REGION_COLUMN)?;
    let count_idx: Vec<usize> = (0..headers.len())
        .filter(|idx| *idx != time_idx && *idx != region_idx)
        .collect();
    let columns = count_idx.iter().map(|idx| headers[*idx].to_string()).collect();

    let mut records = Vec::new();
    for (row, record) in reader.records().enumerate() {
        let record = record.map_err(|err| csv_error("summary-log-read", path, err))?;
        let cell = |idx: usize| record.get(idx).unwrap_or("");
        let mut counts = Vec::with_capacity(count_idx.len());
        for &idx in &count_idx {
            let raw = cell(idx);
            let value = if raw.is_empty() {
                0.0
            } else {
                raw.parse::<f64>().map_err(|_| {
                    SweepError::Serde(
                        ErrorInfo::new("summary-log-value", "count is not numeric")
                            .with_context("path", path.display().to_string())
                            .with_context("row", row.to_string())
                            .with_context("column", &headers[idx])
                            .with_context("value", raw),
                    )
                })?
            };
            counts.push(value);
        }
        records.push(LogRecord {
            time_stamp: cell(time_idx).to_string(),
            region: cell(region_idx).to_string(),
            counts,
        });
    }
    Ok(RunLog { columns, records })
}

/// Count columns summed per time stamp, in first-seen time order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TimeSeries {
    pub columns: Vec<String>,
    pub rows: IndexMap<String, Vec<f64>>,
}

impl TimeSeries {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: IndexMap::new(),
        }
    }

    fn add(&mut self, time_stamp: &str, counts: &[f64]) {
        let width = self.columns.len();
        let row = self
            .rows
            .entry(time_stamp.to_string())
            .or_insert_with(|| vec![0.0; width]);
        for (acc, value) in row.iter_mut().zip(counts) {
            *acc += value;
        }
    }

    fn merge(&mut self, other: &TimeSeries) {
        for (time_stamp, counts) in &other.rows {
            self.add(time_stamp, counts);
        }
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|column| column == name)
    }

    pub fn peak(&self, idx: usize) -> Option<f64> {
        self.rows
            .values()
            .filter_map(|row| row.get(idx).copied())
            .reduce(f64::max)
    }

    pub fn last(&self, idx: usize) -> Option<f64> {
        self.rows.values().last().and_then(|row| row.get(idx).copied())
    }

    /// Appends cumulative infections as a percentage of the population in
    /// the first row. Does nothing when the needed columns are absent or the
    /// population is zero.
    pub fn add_seroprevalence(&mut self) {
        if self.column_index(SEROPREVALENCE_COLUMN).is_some() {
            return;
        }
        let Some(daily) = self.column_index(DAILY_INFECTIONS_COLUMN) else {
            return;
        };
        let Some(population_idx) = POPULATION_COLUMNS
            .iter()
            .map(|name| self.column_index(name))
            .collect::<Option<Vec<_>>>()
        else {
            return;
        };
        let Some(first) = self.rows.values().next() else {
            return;
        };
        let population: f64 = population_idx.iter().map(|idx| first[*idx]).sum();
        if population <= 0.0 {
            return;
        }
        let mut cumulative = 0.0;
        for row in self.rows.values_mut() {
            cumulative += row[daily];
            row.push(100.0 * cumulative / population);
        }
        self.columns.push(SEROPREVALENCE_COLUMN.to_string());
    }
}

/// Sums every region per time stamp.
pub fn world_summary(log: &RunLog) -> TimeSeries {
    let mut world = TimeSeries::new(log.columns.clone());
    for record in &log.records {
        world.add(&record.time_stamp, &record.counts);
    }
    world
}

/// Sums per (region, time stamp).
pub fn regional_summary(log: &RunLog) -> BTreeMap<String, TimeSeries> {
    let mut regions: BTreeMap<String, TimeSeries> = BTreeMap::new();
    for record in &log.records {
        regions
            .entry(record.region.clone())
            .or_insert_with(|| TimeSeries::new(log.columns.clone()))
            .add(&record.time_stamp, &record.counts);
    }
    regions
}

/// Replaces region pairs by their combined region when both are present.
pub fn group_regions(regions: &mut BTreeMap<String, TimeSeries>) {
    for (grouped, members) in REGION_GROUPS {
        if !members.iter().all(|member| regions.contains_key(*member)) {
            continue;
        }
        let mut combined: Option<TimeSeries> = None;
        for member in members {
            let Some(series) = regions.remove(member) else {
                continue;
            };
            match combined.as_mut() {
                Some(total) => total.merge(&series),
                None => combined = Some(series),
            }
        }
        if let Some(combined) = combined {
            debug!(region = grouped, "grouped regions");
            regions.insert(grouped.to_string(), combined);
        }
    }
}

fn format_value(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}

fn write_world(path: &Path, world: &TimeSeries) -> Result<(), SweepError> {
    let mut writer = WriterBuilder::new()
        .from_path(path)
        .map_err(|err| csv_error("summary-write", path, err))?;
    let header = std::iter::once(TIME_COLUMN).chain(world.columns.iter().map(String::as_str));
    writer
        .write_record(header)
        .map_err(|err| csv_error("summary-write", path, err))?;
    for (time_stamp, counts) in &world.rows {
        let row = std::iter::once(time_stamp.clone()).chain(counts.iter().map(|v| format_value(*v)));
        writer
            .write_record(row)
            .map_err(|err| csv_error("summary-write", path, err))?;
    }
    writer.flush().map_err(|err| io_error("summary-write", path, err))
}

fn write_regional(path: &Path, columns: &[String], regions: &BTreeMap<String, TimeSeries>) -> Result<(), SweepError> {
    let mut writer = WriterBuilder::new()
        .from_path(path)
        .map_err(|err| csv_error("summary-write", path, err))?;
    let header = [REGION_COLUMN, TIME_COLUMN]
        .into_iter()
        .chain(columns.iter().map(String::as_str));
    writer
        .write_record(header)
        .map_err(|err| csv_error("summary-write", path, err))?;
    for (region, series) in regions {
        for (time_stamp, counts) in &series.rows {
            let mut row = vec![region.clone(), time_stamp.clone()];
            row.extend(columns.iter().map(|column| {
                series
                    .column_index(column)
                    .and_then(|idx| counts.get(idx))
                    .map(|v| format_value(*v))
                    .unwrap_or_default()
            }));
            writer
                .write_record(&row)
                .map_err(|err| csv_error("summary-write", path, err))?;
        }
    }
    writer.flush().map_err(|err| io_error("summary-write", path, err))
}

fn cell_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn read_parameters(run_dir: &Path) -> Result<ParamMap, SweepError> {
    let path = run_dir.join("parameters.json");
    if !path.is_file() {
        debug!(path = %path.display(), "run has no parameters.json");
        return Ok(ParamMap::new());
    }
    let bytes = fs::read(&path).map_err(|err| io_error("summary-parameters-read", &path, err))?;
    from_json_slice(&bytes)
}

/// A run left out of the sweep summary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedRun {
    pub index: usize,
    pub reason: String,
}

/// Outcome of [`summarize_sweep`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryReport {
    pub processed: Vec<usize>,
    pub skipped: Vec<SkippedRun>,
    pub sweep_summary: PathBuf,
}

fn run_directories(runs_path: &Path) -> Vec<(usize, PathBuf)> {
    let mut runs: Vec<(usize, PathBuf)> = WalkDir::new(runs_path)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_dir())
        .filter_map(|entry| {
            let index: usize = entry.file_name().to_str()?.strip_prefix("run_")?.parse().ok()?;
            Some((index, entry.into_path()))
        })
        .collect();
    runs.sort_by_key(|(index, _)| *index);
    runs
}

fn summarize_run(
    index: usize,
    run_dir: &Path,
    log_name: &str,
    summary_path: &Path,
) -> Result<IndexMap<String, String>, SweepError> {
    let log = read_run_log(&run_dir.join(RESULTS_DIR).join(log_name))?;
    let parameters = read_parameters(run_dir)?;

    let mut world = world_summary(&log);
    world.add_seroprevalence();
    let mut regions = regional_summary(&log);
    group_regions(&mut regions);
    for series in regions.values_mut() {
        series.add_seroprevalence();
    }
    let prefix = format!("run_{index:03}");
    write_world(&summary_path.join(format!("{prefix}_world.csv")), &world)?;
    write_regional(
        &summary_path.join(format!("{prefix}_regional.csv")),
        &world.columns,
        &regions,
    )?;

    let mut row = IndexMap::new();
    let run_number = parameters
        .get(RUN_NUMBER_KEY)
        .map(cell_text)
        .unwrap_or_else(|| index.to_string());
    row.insert(RUN_NUMBER_KEY.to_string(), run_number);
    for (key, value) in flatten(&parameters, PATH_SEPARATOR) {
        if key != RUN_NUMBER_KEY {
            row.insert(key, cell_text(&value));
        }
    }
    for (idx, column) in world.columns.iter().enumerate() {
        if let Some(peak) = world.peak(idx) {
            row.insert(format!("peak_{column}"), format_value(peak));
        }
        if let Some(last) = world.last(idx) {
            row.insert(format!("final_{column}"), format_value(last));
        }
    }
    Ok(row)
}

/// Summarizes every `runs/run_NNN` under `save_path`. Runs whose log is
/// missing or unreadable are skipped with a warning; everything else fails.
pub fn summarize_sweep(save_path: &Path, log_name: Option<&str>) -> Result<SummaryReport, SweepError> {
    let log_name = log_name.unwrap_or(DEFAULT_LOG_NAME);
    let runs_path = save_path.join("runs");
    if !runs_path.is_dir() {
        return Err(SweepError::Configuration(
            ErrorInfo::new("summary-no-runs", "save path has no runs directory")
                .with_context("path", runs_path.display().to_string())
                .with_hint("point --save-path at a directory produced by setup"),
        ));
    }
    let summary_path = save_path.join("summaries");
    fs::create_dir_all(&summary_path).map_err(|err| io_error("summary-dir", &summary_path, err))?;

    let mut processed = Vec::new();
    let mut skipped = Vec::new();
    let mut rows = Vec::new();
    for (index, run_dir) in run_directories(&runs_path) {
        match summarize_run(index, &run_dir, log_name, &summary_path) {
            Ok(row) => {
                processed.push(index);
                rows.push(row);
            }
            Err(err) => {
                warn!(run = index, error = %err, "skipping run without a readable log");
                skipped.push(SkippedRun {
                    index,
                    reason: err.to_string(),
                });
            }
        }
    }

    let mut header: IndexSet<String> = IndexSet::new();
    header.insert(RUN_NUMBER_KEY.to_string());
    for row in &rows {
        header.extend(row.keys().cloned());
    }
    let sweep_summary = summary_path.join(SWEEP_SUMMARY_FILE);
    let mut writer = WriterBuilder::new()
        .from_path(&sweep_summary)
        .map_err(|err| csv_error("summary-write", &sweep_summary, err))?;
    writer
        .write_record(&header)
        .map_err(|err| csv_error("summary-write", &sweep_summary, err))?;
    for row in &rows {
        let record = header
            .iter()
            .map(|key| row.get(key).cloned().unwrap_or_default());
        writer
            .write_record(record)
            .map_err(|err| csv_error("summary-write", &sweep_summary, err))?;
    }
    writer
        .flush()
        .map_err(|err| io_error("summary-write", &sweep_summary, err))?;

    info!(
        processed = processed.len(),
        skipped = skipped.len(),
        output = %sweep_summary.display(),
        "sweep summary written"
    );
    Ok(SummaryReport {
        processed,
        skipped,
        sweep_summary,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn series(rows: &[(&str, [f64; 2])]) -> TimeSeries {
        let mut series = TimeSeries::new(vec!["a".into(), "b".into()]);
        for (time, counts) in rows {
            series.add(time, counts);
        }
        series
    }

    #[test]
    fn peak_and_last_follow_row_order() {
        let series = series(&[("t0", [1.0, 5.0]), ("t1", [4.0, 2.0]), ("t2", [3.0, 1.0])]);
        assert_eq!(series.peak(0), Some(4.0));
        assert_eq!(series.last(0), Some(3.0));
        assert_eq!(series.peak(1), Some(5.0));
    }

    #[test]
    fn grouping_requires_both_members() {
        let mut regions = BTreeMap::new();
        regions.insert("East Midlands".to_string(), series(&[("t0", [1.0, 1.0])]));
        regions.insert("North East".to_string(), series(&[("t0", [2.0, 2.0])]));
        group_regions(&mut regions);
        assert!(regions.contains_key("East Midlands"));
        assert!(regions.contains_key("North East"));
        assert!(!regions.contains_key("Midlands"));
    }

    #[test]
    fn integral_values_are_written_without_fraction() {
        assert_eq!(format_value(12.0), "12");
        assert_eq!(format_value(0.5), "0.5");
    }
}
