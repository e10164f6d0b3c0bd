use std::fs;
use std::path::Path;

use epirun_core::provenance::RunProvenance;
use epirun_core::rng::derive_run_seed;
use epirun_setup::{
    PathDefaults, RunSetup, SweepConfig, SweepManifest, PARAMETERS_FILE, RUN_MANIFEST_FILE,
    SWEEP_MANIFEST_FILE,
};
use serde_json::{json, Value};

fn config(save_path: &Path) -> SweepConfig {
    let yaml = format!(
        r#"
paths_configuration:
  run_name: lockdown_sweep
  save_path: {}
parameter_configuration:
  sampling_type: grid
  parameters_to_run: 1-3
  random_seed: 1234
  parameters:
    interaction:
      betas:
        pub: [0.1, 0.2]
    infection:
      seed_strength: [0.5, 1.0]
    policies:
      quarantine:
        compliance: "1 - 2 * (1 - @infection__seed_strength)"
system_configuration:
  system: cosma
"#,
        save_path.display()
    );
    serde_yaml::from_str(&yaml).expect("config")
}

fn read_json(path: &Path) -> Value {
    serde_json::from_slice(&fs::read(path).expect("read")).expect("json")
}

#[test]
fn writes_one_directory_per_selected_run() {
    let dir = tempfile::tempdir().expect("tempdir");
    let save_path = dir.path().join("sweep");
    let setup = RunSetup::new(&config(&save_path), &PathDefaults::default(), dir.path()).expect("setup");
    let report = setup.generate_parameters(None).expect("generate");

    assert_eq!(report.save_path, save_path);
    assert_eq!(report.run_dirs.len(), 3);
    for sub in ["data", "summaries", "runs"] {
        assert!(save_path.join(sub).is_dir(), "{sub}");
    }

    let first = read_json(&save_path.join("runs/run_000").join(PARAMETERS_FILE));
    assert_eq!(first["run_number"], json!(1));
    assert_eq!(first["interaction"]["betas"]["pub"], json!(0.1));
    assert_eq!(first["infection"]["seed_strength"], json!(1.0));
    assert_eq!(first["policies"]["quarantine"]["compliance"], json!(1.0));

    let text = fs::read_to_string(save_path.join("runs/run_000").join(PARAMETERS_FILE)).expect("read");
    let infection = text.find("\"infection\"").expect("infection key");
    let interaction = text.find("\"interaction\"").expect("interaction key");
    let policies = text.find("\"policies\"").expect("policies key");
    assert!(infection < interaction && interaction < policies);
}

#[test]
fn manifests_record_seeds_and_selection() {
    let dir = tempfile::tempdir().expect("tempdir");
    let save_path = dir.path().join("sweep");
    let setup = RunSetup::new(&config(&save_path), &PathDefaults::default(), dir.path()).expect("setup");
    setup.generate_parameters(None).expect("generate");

    let manifest: SweepManifest =
        serde_json::from_value(read_json(&save_path.join(SWEEP_MANIFEST_FILE))).expect("manifest");
    assert_eq!(manifest.total_runs, 4);
    assert_eq!(manifest.selected_runs, vec![1, 2, 3]);
    assert_eq!(manifest.master_seed, 1234);
    assert_eq!(manifest.sweep_hash, setup.sweep_hash());

    let run: RunProvenance =
        serde_json::from_value(read_json(&save_path.join("runs/run_002").join(RUN_MANIFEST_FILE)))
            .expect("run manifest");
    assert_eq!(run.run_number, 3);
    assert_eq!(run.seed, derive_run_seed(1234, 3));
    assert_eq!(run.master_seed, 1234);
}

#[test]
fn existing_save_path_gets_a_suffix() {
    let dir = tempfile::tempdir().expect("tempdir");
    let save_path = dir.path().join("sweep");
    fs::create_dir_all(&save_path).expect("mkdir");
    fs::create_dir_all(dir.path().join("sweep_1")).expect("mkdir");
    let setup = RunSetup::new(&config(&save_path), &PathDefaults::default(), dir.path()).expect("setup");
    assert_eq!(setup.layout().save_path, dir.path().join("sweep_2"));
    assert!(dir.path().join("sweep_2/runs").is_dir());
}

#[test]
fn invalid_configuration_creates_nothing() {
    let dir = tempfile::tempdir().expect("tempdir");
    let save_path = dir.path().join("sweep");
    let mut config = config(&save_path);
    config.parameter_configuration.sampling_type = "sobol".into();
    let err = RunSetup::new(&config, &PathDefaults::default(), dir.path()).unwrap_err();
    assert_eq!(err.info().code, "sampling-unsupported");
    assert!(!save_path.exists());
}

#[test]
fn file_sampling_reads_relative_tables() {
    let dir = tempfile::tempdir().expect("tempdir");
    fs::write(dir.path().join("table.csv"), "interaction__betas__pub,seed\n0.3,1\n0.4,2\n").expect("write");
    let yaml = format!(
        r#"
paths_configuration:
  run_name: from_file
  runs_root: {}
parameter_configuration:
  sampling_type: file
  parameters:
    parameter_file: table.csv
"#,
        dir.path().display()
    );
    let config: SweepConfig = serde_yaml::from_str(&yaml).expect("config");
    let setup = RunSetup::new(&config, &PathDefaults::default(), dir.path()).expect("setup");
    assert_eq!(setup.layout().save_path, dir.path().join("from_file"));
    assert_eq!(setup.generator().len(), 2);
    assert_eq!(setup.generator()[1]["interaction"]["betas"]["pub"], json!(0.4));
}
