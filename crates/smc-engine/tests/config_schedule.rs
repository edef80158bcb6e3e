use std::path::PathBuf;

use smc_core::errors::codes;
use smc_engine::{
    ProposalConfig, RestartConfig, SamplerConfig, ScheduleConfig, TemperingSchedule,
};

const FULL_CONFIG: &str = r#"
num_particles: 500
schedule:
  type: manual
  phis: [0.0, 0.1, 0.4, 1.0]
num_mcmc_steps: 3
burn_in: 2
measurement_std_dev: 0.5
ess_threshold: 250
proposal:
  center: { a: 1.0, b: 2.0 }
  scales: { a: 0.5, b: 0.5 }
checkpoint:
  output: run.ckpt
seed_policy:
  master_seed: 42
  label: nightly
workers:
  count: 4
output:
  run_directory: out
"#;

#[test]
fn yaml_config_parses_every_section() {
    let config = SamplerConfig::from_yaml(FULL_CONFIG).unwrap();
    assert_eq!(config.num_particles, 500);
    assert_eq!(
        config.schedule,
        ScheduleConfig::Manual {
            phis: vec![0.0, 0.1, 0.4, 1.0]
        }
    );
    assert_eq!(config.num_mcmc_steps, 3);
    assert_eq!(config.burn_in, 2);
    assert_eq!(config.measurement_std_dev, Some(0.5));
    assert_eq!(config.ess_threshold, Some(250.0));
    assert_eq!(config.checkpoint.output, Some(PathBuf::from("run.ckpt")));
    assert_eq!(config.seed_policy.master_seed, 42);
    assert_eq!(config.seed_policy.label.as_deref(), Some("nightly"));
    assert_eq!(config.workers.count, 4);
    assert_eq!(config.output.metrics_file, PathBuf::from("diagnostics.csv"));

    let schedule = config.validate().unwrap();
    assert_eq!(schedule.as_slice(), &[0.0, 0.1, 0.4, 1.0]);
}

#[test]
fn omitted_fields_take_defaults() {
    let config = SamplerConfig::from_yaml("num_particles: 8\n").unwrap();
    assert_eq!(config.num_mcmc_steps, 1);
    assert_eq!(config.burn_in, 0);
    assert_eq!(config.ess_threshold, None);
    assert_eq!(config.measurement_std_dev, None);
    assert!(config.restart.is_none());
    assert_eq!(config.schedule, ScheduleConfig::Uniform { num_time_steps: 10 });
    assert_eq!(config.validate().unwrap().len(), 10);
}

#[test]
fn malformed_yaml_is_a_serde_error() {
    let err = SamplerConfig::from_yaml("num_particles: [oops").unwrap_err();
    assert!(err.has_code("config-parse"));
}

#[test]
fn zero_particles_are_rejected() {
    let config = SamplerConfig {
        num_particles: 0,
        ..SamplerConfig::default()
    };
    assert!(config
        .validate()
        .unwrap_err()
        .has_code(codes::INVALID_PARTICLE_COUNT));
}

#[test]
fn restart_position_must_lie_inside_the_schedule() {
    let restart = |time_step| SamplerConfig {
        schedule: ScheduleConfig::Uniform { num_time_steps: 5 },
        restart: Some(RestartConfig {
            time_step,
            checkpoint: Some(PathBuf::from("prior.ckpt")),
        }),
        ..SamplerConfig::default()
    };
    for bad in [0, 1, 6] {
        let err = restart(bad).validate().unwrap_err();
        assert!(err.has_code(codes::INVALID_RESTART_POSITION), "{bad}");
    }
    assert!(restart(2).validate().is_ok());
    assert!(restart(5).validate().is_ok());

    let mut sourceless = restart(3);
    if let Some(restart) = sourceless.restart.as_mut() {
        restart.checkpoint = None;
    }
    assert!(sourceless
        .validate()
        .unwrap_err()
        .has_code(codes::MISSING_CHECKPOINT_SOURCE));
}

#[test]
fn proposals_need_matching_keys_and_positive_scales() {
    let proposal = |center: &[(&str, f64)], scales: &[(&str, f64)]| ProposalConfig {
        center: center.iter().map(|(k, v)| (k.to_string(), *v)).collect(),
        scales: scales.iter().map(|(k, v)| (k.to_string(), *v)).collect(),
    };
    let mismatched = proposal(&[("a", 0.0), ("b", 0.0)], &[("a", 1.0)]);
    assert!(mismatched
        .validate()
        .unwrap_err()
        .has_code(codes::INVALID_PROPOSAL_SPEC));

    let zero_scale = proposal(&[("a", 0.0)], &[("a", 0.0)]);
    let err = zero_scale.validate().unwrap_err();
    assert!(err.has_code(codes::NON_POSITIVE_SCALE));
    assert_eq!(err.info().context.get("parameter").map(String::as_str), Some("a"));
}

#[test]
fn negative_noise_level_is_rejected() {
    let config = SamplerConfig {
        measurement_std_dev: Some(-1.0),
        ..SamplerConfig::default()
    };
    assert!(config
        .validate()
        .unwrap_err()
        .has_code(codes::NON_POSITIVE_SCALE));
}

#[test]
fn uniform_schedule_is_evenly_spaced() {
    let schedule = TemperingSchedule::uniform(5).unwrap();
    assert_eq!(schedule.as_slice(), &[0.0, 0.25, 0.5, 0.75, 1.0]);
    assert_eq!(schedule.delta_phi(0), 0.0);
    assert_eq!(schedule.delta_phi(2), 0.25);
    assert_eq!(TemperingSchedule::uniform(1).unwrap().as_slice(), &[0.0]);
}

#[test]
fn malformed_schedules_are_rejected() {
    for phis in [
        vec![],
        vec![0.5, 1.0],
        vec![0.0, 0.6, 0.4, 1.0],
        vec![0.0, 1.5],
        vec![0.0, f64::NAN],
    ] {
        let err = TemperingSchedule::new(phis.clone()).unwrap_err();
        assert!(err.has_code(codes::INVALID_SCHEDULE), "{phis:?}");
    }
    assert!(TemperingSchedule::uniform(0).is_err());
    assert!(TemperingSchedule::new(vec![0.0, 0.0, 1.0]).is_ok());
}
