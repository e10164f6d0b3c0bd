//! Path configuration with `@name` placeholders and the on-disk run layout.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use epirun_core::errors::{io_error, ErrorInfo, SweepError};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

const AUTO: &str = "auto";
const DEFAULT: &str = "default";

/// Locations used when the path configuration says `auto` or `default`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathDefaults {
    /// Parent directory of `save_path` when it is `auto`.
    pub runs_root: PathBuf,
    /// Directory holding `policy.yaml` and `interaction.yaml`.
    pub baseline_dir: PathBuf,
}

impl Default for PathDefaults {
    fn default() -> Self {
        Self {
            runs_root: PathBuf::from("."),
            baseline_dir: PathBuf::from("configuration/default_baseline_configs"),
        }
    }
}

/// Path configuration after defaults and placeholders are applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedPaths {
    pub run_name: String,
    /// Every `*path*` key plus `runs_root`, fully substituted.
    pub entries: BTreeMap<String, PathBuf>,
}

impl ResolvedPaths {
    pub fn get(&self, name: &str) -> Option<&Path> {
        self.entries.get(name).map(PathBuf::as_path)
    }

    pub fn save_path(&self) -> &Path {
        self.get("save_path").unwrap_or_else(|| Path::new("."))
    }

    pub fn baseline_policy_path(&self) -> Option<&Path> {
        self.get("baseline_policy_path")
    }

    pub fn baseline_interaction_path(&self) -> Option<&Path> {
        self.get("baseline_interaction_path")
    }
}

fn is_placeholder_key(key: &str) -> bool {
    key.contains("path") || key == "runs_root"
}

fn unset(value: Option<&String>, sentinel: &str) -> bool {
    value.map_or(true, |v| v == sentinel)
}

/// Applies defaults and substitutes `@name` segments. Touches nothing on disk.
pub fn resolve_paths(
    config: &IndexMap<String, String>,
    defaults: &PathDefaults,
) -> Result<ResolvedPaths, SweepError> {
    let run_name = config
        .get("run_name")
        .cloned()
        .ok_or_else(|| SweepError::configuration("paths-run-name", "paths_configuration needs run_name"))?;

    let mut raw = config.clone();
    if unset(raw.get("runs_root"), AUTO) {
        raw.insert("runs_root".into(), defaults.runs_root.display().to_string());
    }
    if unset(raw.get("save_path"), AUTO) {
        raw.insert("save_path".into(), format!("@runs_root/{run_name}"));
    }
    for (key, file) in [
        ("baseline_policy_path", "policy.yaml"),
        ("baseline_interaction_path", "interaction.yaml"),
    ] {
        if unset(raw.get(key), DEFAULT) {
            raw.insert(key.into(), defaults.baseline_dir.join(file).display().to_string());
        }
    }

    let mut pending: Vec<(String, String)> = raw
        .into_iter()
        .filter(|(key, _)| is_placeholder_key(key))
        .collect();
    let known: Vec<String> = pending.iter().map(|(key, _)| key.clone()).collect();
    let mut entries = BTreeMap::new();
    while !pending.is_empty() {
        let before = pending.len();
        let mut deferred = Vec::new();
        for (key, value) in pending {
            match substitute(&value, &entries, &known)? {
                Some(path) => {
                    debug!(key = %key, path = %path.display(), "path resolved");
                    entries.insert(key, path);
                }
                None => deferred.push((key, value)),
            }
        }
        if deferred.len() == before {
            let stuck: Vec<&str> = deferred.iter().map(|(key, _)| key.as_str()).collect();
            return Err(SweepError::CircularReference(
                ErrorInfo::new("paths-cycle", "path placeholders reference each other in a cycle")
                    .with_context("keys", stuck.join(", ")),
            ));
        }
        pending = deferred;
    }
    Ok(ResolvedPaths { run_name, entries })
}

/// Substitutes `@name` segments, or returns `None` while a referenced path is unresolved.
fn substitute(
    value: &str,
    resolved: &BTreeMap<String, PathBuf>,
    known: &[String],
) -> Result<Option<PathBuf>, SweepError> {
    let mut segments = Vec::new();
    for segment in value.split('/') {
        match segment.strip_prefix('@') {
            Some(name) => match resolved.get(name) {
                Some(path) => segments.push(path.display().to_string()),
                None if known.iter().any(|k| k == name) => return Ok(None),
                None => {
                    return Err(SweepError::MissingPath(
                        ErrorInfo::new("paths-unknown-placeholder", "placeholder names no configured path")
                            .with_context("placeholder", name)
                            .with_context("value", value),
                    ))
                }
            },
            None => segments.push(segment.to_string()),
        }
    }
    Ok(Some(PathBuf::from(segments.join("/"))))
}

/// Directories of one sweep on disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunLayout {
    pub paths: ResolvedPaths,
    pub save_path: PathBuf,
    pub data_path: PathBuf,
    pub summary_path: PathBuf,
    pub runs_path: PathBuf,
}

impl RunLayout {
    /// Creates `save_path/{data,summaries,runs}`.
    ///
    /// An existing `save_path` is never reused: `_1`, `_2`, ... is appended
    /// until a free name is found.
    pub fn create(mut paths: ResolvedPaths) -> Result<Self, SweepError> {
        let requested = paths.save_path().to_path_buf();
        let mut save_path = requested.clone();
        let mut suffix = 1;
        while save_path.is_dir() {
            save_path = PathBuf::from(format!("{}_{suffix}", requested.display()));
            suffix += 1;
        }
        if save_path != requested {
            warn!(
                run_name = %paths.run_name,
                requested = %requested.display(),
                save_path = %save_path.display(),
                "save path already exists, writing to a fresh directory"
            );
            paths.entries.insert("save_path".into(), save_path.clone());
        }
        let layout = Self::at(paths, save_path);
        for dir in [&layout.data_path, &layout.summary_path, &layout.runs_path] {
            fs::create_dir_all(dir).map_err(|err| io_error("layout-create", dir, err))?;
        }
        Ok(layout)
    }

    /// Layout rooted at an existing `save_path`, without creating anything.
    pub fn open(save_path: &Path) -> Self {
        let paths = ResolvedPaths {
            run_name: save_path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default(),
            entries: BTreeMap::from([("save_path".to_string(), save_path.to_path_buf())]),
        };
        Self::at(paths, save_path.to_path_buf())
    }

    fn at(paths: ResolvedPaths, save_path: PathBuf) -> Self {
        Self {
            data_path: save_path.join("data"),
            summary_path: save_path.join("summaries"),
            runs_path: save_path.join("runs"),
            save_path,
            paths,
        }
    }

    /// Directory of the run at position `idx` of the selection.
    pub fn run_dir(&self, idx: usize) -> PathBuf {
        self.runs_path.join(run_dir_name(idx))
    }
}

/// `run_000`, `run_001`, ...
pub fn run_dir_name(idx: usize) -> String {
    format!("run_{idx:03}")
}
