use std::fs;
use std::path::Path;
use std::process::Command;

use serde_json::Value;

fn epirun() -> Command {
    Command::new(env!("CARGO_BIN_EXE_epirun"))
}

fn write_config(dir: &Path) -> std::path::PathBuf {
    let yaml = format!(
        r#"
paths_configuration:
  run_name: smoke
  save_path: {}
parameter_configuration:
  sampling_type: grid
  parameters_to_run: 0-1
  random_seed: 7
  parameters:
    interaction:
      betas:
        household: [0.2, 0.4]
"#,
        dir.join("sweep").display()
    );
    let path = dir.join("sweep.yaml");
    fs::write(&path, yaml).expect("write config");
    path
}

#[test]
fn resolve_prints_runs_without_writing() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = write_config(dir.path());
    let output = epirun()
        .arg("resolve")
        .arg("--config")
        .arg(&config)
        .output()
        .expect("run epirun resolve");
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let value: Value = serde_json::from_slice(&output.stdout).expect("json");
    let runs = value["runs"].as_array().cloned().unwrap_or_default();
    assert_eq!(runs.len(), 2);
    assert_eq!(runs[1]["interaction"]["betas"]["household"], Value::from(0.4));
    assert!(!dir.path().join("sweep").exists());
}

#[test]
fn setup_then_submit_several() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = write_config(dir.path());
    let status = epirun()
        .arg("setup")
        .arg("--config")
        .arg(&config)
        .status()
        .expect("run epirun setup");
    assert!(status.success());
    let runs = dir.path().join("sweep/runs");
    assert!(runs.join("run_001/parameters.json").is_file());

    fs::write(runs.join("run_000/submit.sh"), "#!/bin/bash\n").expect("script");
    let out = dir.path().join("several.sh");
    let status = epirun()
        .args(["submit-several", "--jobs", "0,1", "--scheduler-command", "qsub"])
        .arg("--run-directory")
        .arg(&runs)
        .arg("--out")
        .arg(&out)
        .status()
        .expect("run epirun submit-several");
    assert!(status.success());
    let script = fs::read_to_string(&out).expect("several script");
    assert!(script.contains("qsub"));
    assert!(script.contains("run_000"));
    assert!(!script.contains("run_001"));
}

#[test]
fn bad_selection_fails() {
    let dir = tempfile::tempdir().expect("tempdir");
    let status = epirun()
        .args(["submit-several", "--jobs", "three"])
        .arg("--run-directory")
        .arg(dir.path())
        .status()
        .expect("run epirun submit-several");
    assert!(!status.success());
}

#[test]
fn version_prints_package_version() {
    let output = epirun().arg("version").output().expect("run epirun version");
    assert!(output.status.success());
    let text = String::from_utf8(output.stdout).expect("utf8");
    assert_eq!(text.trim(), env!("CARGO_PKG_VERSION"));
}
