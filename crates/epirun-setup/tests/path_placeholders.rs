use std::path::PathBuf;

use epirun_core::errors::SweepError;
use epirun_setup::{resolve_paths, PathDefaults};
use indexmap::IndexMap;

fn config(entries: &[(&str, &str)]) -> IndexMap<String, String> {
    entries
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

fn defaults() -> PathDefaults {
    PathDefaults {
        runs_root: PathBuf::from("/scratch/runs"),
        baseline_dir: PathBuf::from("/opt/baselines"),
    }
}

#[test]
fn defaults_fill_auto_and_missing_entries() {
    let resolved = resolve_paths(&config(&[("run_name", "test"), ("save_path", "auto")]), &defaults())
        .expect("paths");
    assert_eq!(resolved.save_path(), PathBuf::from("/scratch/runs/test"));
    assert_eq!(
        resolved.baseline_policy_path(),
        Some(PathBuf::from("/opt/baselines/policy.yaml").as_path())
    );
    assert_eq!(
        resolved.baseline_interaction_path(),
        Some(PathBuf::from("/opt/baselines/interaction.yaml").as_path())
    );
}

#[test]
fn placeholders_resolve_through_chains() {
    let resolved = resolve_paths(
        &config(&[
            ("run_name", "test"),
            ("world_path", "@data_root_path/worlds/london.hdf5"),
            ("data_root_path", "@save_path/data"),
            ("save_path", "/work/sweep"),
        ]),
        &defaults(),
    )
    .expect("paths");
    assert_eq!(
        resolved.get("world_path"),
        Some(PathBuf::from("/work/sweep/data/worlds/london.hdf5").as_path())
    );
}

#[test]
fn unknown_placeholder_is_missing_path() {
    let err = resolve_paths(
        &config(&[("run_name", "test"), ("world_path", "@nowhere/world.hdf5")]),
        &defaults(),
    )
    .unwrap_err();
    assert!(err.is_missing_path());
}

#[test]
fn placeholder_cycles_are_reported() {
    let err = resolve_paths(
        &config(&[
            ("run_name", "test"),
            ("a_path", "@b_path/x"),
            ("b_path", "@a_path/y"),
        ]),
        &defaults(),
    )
    .unwrap_err();
    assert!(matches!(err, SweepError::CircularReference(_)));
}

#[test]
fn run_name_is_required() {
    let err = resolve_paths(&config(&[("save_path", "/tmp/x")]), &defaults()).unwrap_err();
    assert_eq!(err.info().code, "paths-run-name");
}
