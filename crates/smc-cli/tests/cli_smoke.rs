use std::fs;
use std::path::Path;
use std::process::{Command, Output};

use serde_json::Value;
use tempfile::tempdir;

const CONFIG: &str = "\
num_particles: 60
schedule:
  type: uniform
  num_time_steps: 5
num_mcmc_steps: 2
measurement_std_dev: 0.5
ess_threshold: 30
checkpoint:
  output: run.ckpt
seed_policy:
  master_seed: 11
workers:
  count: 2
";

const PROBLEM: &str = r#"{
  "x": [0.0, 0.5, 1.0, 1.5, 2.0, 2.5, 3.0],
  "y": [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0],
  "degree": 1,
  "priors": {
    "c0": { "type": "uniform", "low": -5.0, "high": 5.0 },
    "c1": { "type": "normal", "mean": 0.0, "std_dev": 3.0 }
  }
}"#;

fn smc(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_smc-cli"))
        .args(["--log-level", "warn"])
        .args(args)
        .output()
        .expect("spawn smc-cli")
}

fn write_inputs(dir: &Path) -> (String, String) {
    let config = dir.join("run.yaml");
    let problem = dir.join("problem.json");
    fs::write(&config, CONFIG).unwrap();
    fs::write(&problem, PROBLEM).unwrap();
    (
        config.display().to_string(),
        problem.display().to_string(),
    )
}

fn stdout_json(output: &Output) -> Value {
    assert!(
        output.status.success(),
        "{}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).expect("json on stdout")
}

#[test]
fn run_writes_artefacts_and_inspect_reads_them_back() {
    let dir = tempdir().unwrap();
    let (config, problem) = write_inputs(dir.path());
    let out = dir.path().join("out");
    let out_arg = out.display().to_string();

    let report = stdout_json(&smc(&[
        "run", "--config", &config, "--problem", &problem, "--out", &out_arg,
    ]));
    assert_eq!(report["steps"], 5);
    assert!(report["posterior_mean"]["c0"].is_number());
    for artefact in [
        "summary.json",
        "run.ckpt",
        "diagnostics.csv",
        "manifest.json",
        "config.yaml",
        "problem.json",
    ] {
        assert!(out.join(artefact).exists(), "{artefact}");
    }

    let checkpoint = out.join("run.ckpt").display().to_string();
    let inspected = stdout_json(&smc(&["inspect", "--checkpoint", &checkpoint]));
    assert_eq!(inspected["steps"].as_array().map(Vec::len), Some(5));
    assert_eq!(inspected["ensemble_hash"], report["ensemble_hash"]);

    let last = stdout_json(&smc(&["inspect", "--checkpoint", &checkpoint, "--last"]));
    assert_eq!(last["steps"][0]["index"], 4);
}

#[test]
fn restart_flags_resume_from_a_checkpoint() {
    let dir = tempdir().unwrap();
    let (config, problem) = write_inputs(dir.path());
    let first_out = dir.path().join("first");
    let first = stdout_json(&smc(&[
        "run",
        "--config",
        &config,
        "--problem",
        &problem,
        "--out",
        &first_out.display().to_string(),
    ]));

    let source = first_out.join("run.ckpt").display().to_string();
    let resumed = stdout_json(&smc(&[
        "run",
        "--config",
        &config,
        "--problem",
        &problem,
        "--out",
        &dir.path().join("second").display().to_string(),
        "--restart-at",
        "3",
        "--restart-from",
        &source,
    ]));
    assert_eq!(resumed["ensemble_hash"], first["ensemble_hash"]);
}

#[test]
fn inputs_already_in_the_run_directory_are_left_intact() {
    let dir = tempdir().unwrap();
    let (config, problem) = write_inputs(dir.path());
    let out_arg = dir.path().display().to_string();

    stdout_json(&smc(&[
        "run", "--config", &config, "--problem", &problem, "--out", &out_arg,
    ]));
    assert_eq!(fs::read_to_string(&problem).unwrap(), PROBLEM);
    assert_eq!(
        fs::read_to_string(dir.path().join("config.yaml")).unwrap(),
        CONFIG
    );
}

#[test]
fn failing_to_keep_an_input_fails_the_run() {
    let dir = tempdir().unwrap();
    let (config, problem) = write_inputs(dir.path());
    let out = dir.path().join("out");
    fs::create_dir_all(out.join("problem.json")).unwrap();
    let output = smc(&[
        "run",
        "--config",
        &config,
        "--problem",
        &problem,
        "--out",
        &out.display().to_string(),
    ]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("problem.json"));
}

#[test]
fn mismatched_problem_is_rejected() {
    let dir = tempdir().unwrap();
    let (config, _) = write_inputs(dir.path());
    let problem = dir.path().join("bad.json");
    fs::write(
        &problem,
        r#"{ "x": [0.0, 1.0], "y": [1.0], "priors": {} }"#,
    )
    .unwrap();
    let output = smc(&[
        "run",
        "--config",
        &config,
        "--problem",
        &problem.display().to_string(),
    ]);
    assert!(!output.status.success());
}
