use std::fs;
use std::path::Path;

use epirun_batch::{
    parse_job_list, write_submit_several, BatchConfig, Scheduler, ScriptMaker, SystemConfig,
    SUBMIT_ALL_SCRIPT,
};

fn system(scheduler: Scheduler) -> SystemConfig {
    SystemConfig {
        name: "testbed".into(),
        scheduler,
        queue: "cosma".into(),
        account: Some("dp004".into()),
        max_time: "72:00:00".into(),
        cores_per_node: 16.0,
        memory_per_node: 128.0,
        modules_to_load: vec!["gnu_comp/7.3.0".into(), "openmpi/3.0.1".into()],
        modules_init_script: None,
        submit_via_stdin: false,
    }
}

fn batch(jobs: usize) -> BatchConfig {
    serde_yaml::from_str(&format!("system: testbed\nnumber_of_jobs: {jobs}\ncpus_per_job: 4\n"))
        .expect("batch config")
}

fn make_runs(root: &Path, count: usize) {
    for n in 0..count {
        fs::create_dir_all(root.join(format!("run_{n:03}"))).expect("mkdir");
    }
}

#[test]
fn batch_defaults() {
    let config: BatchConfig = serde_yaml::from_str("system: cosma7\n").expect("batch config");
    assert_eq!(config.job_name, "epirun");
    assert_eq!(config.memory_per_job, 100.0);
    assert_eq!(config.cpus_per_job, 32);
    assert_eq!(config.number_of_jobs, 250);
}

#[test]
fn nodes_follow_the_tighter_resource() {
    let maker = ScriptMaker::new(system(Scheduler::Slurm), batch(8), "/runs");
    // cpus: 4 * 8 / 16 = 2, memory: 100 * 8 / 128 = 6.25
    assert_eq!(maker.nodes_required(), 6.25);
}

#[test]
fn headers_per_scheduler() {
    let slurm = ScriptMaker::new(system(Scheduler::Slurm), batch(1), "/runs").header(7);
    assert!(slurm.contains(&"#SBATCH -J epirun_007".to_string()));
    assert!(slurm.contains(&"#SBATCH -o /runs/stdout/run_007.out".to_string()));
    assert!(slurm.contains(&"#SBATCH -A dp004".to_string()));

    let pbs = ScriptMaker::new(system(Scheduler::Pbs), batch(1), "/runs").header(0);
    assert!(pbs.contains(&"#PBS -l procs=4".to_string()));
    assert!(pbs.contains(&"#PBS -l walltime=72:00:00".to_string()));

    let lsf = ScriptMaker::new(system(Scheduler::Lsf), batch(1), "/runs").header(0);
    assert!(lsf.contains(&"#BSUB -R \"span[ptile=4]\"".to_string()));
    assert!(lsf.contains(&"#BSUB -P dp004".to_string()));
    assert!(lsf.contains(&"#BSUB -x".to_string()));
}

#[test]
fn writes_scripts_and_submit_all() {
    let dir = tempfile::tempdir().expect("tempdir");
    make_runs(dir.path(), 3);
    let mut system = system(Scheduler::Lsf);
    system.submit_via_stdin = true;
    system.modules_init_script = Some("/etc/profile.d/modules.sh".into());
    let maker = ScriptMaker::new(system, batch(3), dir.path());
    let scripts = maker.write_scripts().expect("scripts");
    assert_eq!(scripts.len(), 3);

    let script = fs::read_to_string(&scripts[1]).expect("script");
    let lines: Vec<&str> = script.lines().collect();
    let init = lines.iter().position(|l| *l == "source /etc/profile.d/modules.sh").expect("init");
    let purge = lines.iter().position(|l| *l == "module purge").expect("purge");
    assert!(init < purge);
    assert!(lines.contains(&"module load openmpi/3.0.1"));
    let expected = format!(
        "mpirun -np 4 epirun-engine {}",
        dir.path().join("run_001/parameters.json").display()
    );
    assert!(lines.contains(&expected.as_str()));

    let all = fs::read_to_string(dir.path().join(SUBMIT_ALL_SCRIPT)).expect("submit all");
    assert!(all.contains(&format!("bsub < {}", scripts[2].display())));
    assert!(dir.path().join("stdout").is_dir());
}

#[test]
fn missing_run_directory_is_rejected() {
    let dir = tempfile::tempdir().expect("tempdir");
    make_runs(dir.path(), 2);
    let maker = ScriptMaker::new(system(Scheduler::Slurm), batch(3), dir.path());
    let err = maker.write_scripts().unwrap_err();
    assert_eq!(err.info().code, "batch-run-missing");
}

#[test]
fn unknown_system_is_not_supported() {
    let dir = tempfile::tempdir().expect("tempdir");
    let err = SystemConfig::load(dir.path(), "nowhere").unwrap_err();
    assert_eq!(err.info().code, "system-unsupported");

    fs::write(
        dir.path().join("cosma7.yaml"),
        "name: cosma7\nscheduler: slurm\nqueue: cosma7\nmax_time: \"72:00:00\"\ncores_per_node: 28\nmemory_per_node: 512\n",
    )
    .expect("write");
    let loaded = SystemConfig::load(dir.path(), "cosma7").expect("system");
    assert_eq!(loaded.scheduler, Scheduler::Slurm);
    assert!(loaded.modules_to_load.is_empty());
}

#[test]
fn job_lists() {
    assert_eq!(parse_job_list("3").expect("jobs"), vec![0, 1, 2, 3]);
    assert_eq!(parse_job_list("10-12").expect("jobs"), vec![10, 11, 12]);
    assert_eq!(parse_job_list("4, 1,9").expect("jobs"), vec![4, 1, 9]);
    assert!(parse_job_list("9-2").is_err());
    assert!(parse_job_list("x").is_err());
}

#[test]
fn lone_integer_is_an_upper_bound_and_single_jobs_use_a_range() {
    assert_eq!(parse_job_list("0").expect("jobs"), vec![0]);
    assert_eq!(parse_job_list("2").expect("jobs"), vec![0, 1, 2]);
    assert_eq!(parse_job_list("2-2").expect("jobs"), vec![2]);
}

#[test]
fn submit_several_skips_missing_scripts() {
    let dir = tempfile::tempdir().expect("tempdir");
    make_runs(dir.path(), 3);
    let maker = ScriptMaker::new(system(Scheduler::Slurm), batch(3), dir.path());
    maker.write_scripts().expect("scripts");
    let output = dir.path().join("several.sh");
    let report = write_submit_several(dir.path(), &[1, 2, 5, 6], "sbatch", &output).expect("several");
    assert_eq!(report.submitted, vec![1, 2]);
    assert_eq!(report.missing, vec![5, 6]);
    let text = fs::read_to_string(&output).expect("read");
    assert!(text.starts_with("#!/bin/bash\n\n"));
    assert_eq!(text.lines().filter(|l| l.starts_with("sbatch ")).count(), 2);
}
