use smc_core::{ParamMap, Particle, Step, StepList};
use smc_engine::checkpoint::CheckpointPayload;
use smc_engine::{CheckpointStore, Mode};
use tempfile::tempdir;

fn params(a: f64, b: f64) -> ParamMap {
    [("a".to_string(), a), ("b".to_string(), b)]
        .into_iter()
        .collect()
}

fn five_particle_step() -> Step {
    let particles = (0..5)
        .map(|_| Particle::new(params(1.0, 2.0), 0.2, -0.2))
        .collect();
    Step::new(particles).unwrap()
}

#[test]
fn written_step_reads_back_exactly() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("run.ckpt");
    let step = five_particle_step();

    let mut store = CheckpointStore::open(&path, Mode::Write).unwrap();
    store.write_step(&step, 0).unwrap();
    store.close().unwrap();

    let store = CheckpointStore::open(&path, Mode::Read).unwrap();
    let steps = store.read_step_list().unwrap();
    assert_eq!(steps.len(), 1);
    let restored = &steps[0];
    assert_eq!(restored.len(), 5);
    for particle in restored.particles() {
        assert_eq!(particle.params(), &params(1.0, 2.0));
        assert_eq!(particle.log_weight(), 0.2);
        assert_eq!(particle.log_like(), -0.2);
    }
    assert_eq!(restored, &step);
}

#[test]
fn step_list_roundtrip_keeps_infinite_weights_and_increments() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("nested").join("history.ckpt");

    let mut first = five_particle_step();
    first.normalize_log_weights().unwrap();
    let mut second = Step::new(vec![
        Particle::new(params(0.5, 1.5), f64::NEG_INFINITY, -3.0),
        Particle::new(params(0.25, 1.0), -0.1, f64::NEG_INFINITY),
    ])
    .unwrap();
    second.record_log_evidence_increment(0.75_f64.ln());
    let history: StepList = vec![first, second].into_iter().collect();

    let mut store = CheckpointStore::open(&path, Mode::Write).unwrap();
    store.record_schedule(&[0.0, 1.0]).unwrap();
    store.write_step_list(&history).unwrap();
    store.close().unwrap();

    let store = CheckpointStore::open(&path, Mode::Read).unwrap();
    assert_eq!(store.schedule(), &[0.0, 1.0]);
    let restored = store.read_step_list().unwrap();
    assert_eq!(restored, history);
    assert_eq!(restored[1].particles()[0].log_weight(), f64::NEG_INFINITY);
    assert_eq!(restored[1].log_unnormalized_weight_sum(), 0.75_f64.ln());
}

#[test]
fn rewriting_an_index_replaces_the_entry() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("run.ckpt");
    let mut store = CheckpointStore::open(&path, Mode::Write).unwrap();
    store.write_step(&five_particle_step(), 0).unwrap();
    let replacement =
        Step::new(vec![Particle::new(params(9.0, 9.0), 0.0, -1.0)]).unwrap();
    store.write_step(&replacement, 0).unwrap();
    store.close().unwrap();

    let steps = smc_engine::checkpoint::load_step_list(&path).unwrap();
    assert_eq!(steps.len(), 1);
    assert_eq!(steps[0], replacement);
}

#[test]
fn every_write_is_visible_before_close() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("run.ckpt");
    let mut store = CheckpointStore::open(&path, Mode::Write).unwrap();
    store.write_step(&five_particle_step(), 0).unwrap();

    let steps = smc_engine::checkpoint::load_step_list(&path).unwrap();
    assert_eq!(steps.len(), 1);
    assert!(!dir.path().join("run.ckpt.tmp").exists());
    store.close().unwrap();
}

#[test]
fn missing_positions_are_rejected() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("gappy.ckpt");
    let mut store = CheckpointStore::open(&path, Mode::Write).unwrap();
    store.write_step(&five_particle_step(), 0).unwrap();
    store.write_step(&five_particle_step(), 2).unwrap();
    store.close().unwrap();

    let err = smc_engine::checkpoint::load_step_list(&path).unwrap_err();
    assert!(err.has_code("checkpoint-gap"));
    assert_eq!(err.info().context.get("missing").map(String::as_str), Some("1"));
    assert!(matches!(err, smc_core::SmcError::Storage(_)));
    assert_eq!(
        err.info().context.get("path").map(String::as_str),
        path.to_str()
    );
}

#[test]
fn read_mode_rejects_writes() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("run.ckpt");
    CheckpointStore::open(&path, Mode::Write)
        .unwrap()
        .close()
        .unwrap();

    let mut store = CheckpointStore::open(&path, Mode::Read).unwrap();
    let err = store.write_step(&five_particle_step(), 0).unwrap_err();
    assert!(err.has_code("checkpoint-mode"));
}

#[test]
fn missing_and_corrupt_files_fail_as_storage_errors() {
    let dir = tempdir().unwrap();
    let missing = CheckpointStore::open(dir.path().join("absent.ckpt"), Mode::Read).unwrap_err();
    assert!(missing.has_code("checkpoint-read"));

    let corrupt = dir.path().join("corrupt.ckpt");
    std::fs::write(&corrupt, b"not a checkpoint").unwrap();
    let err = CheckpointStore::open(&corrupt, Mode::Read).unwrap_err();
    assert!(matches!(err, smc_core::SmcError::Storage(_)));
}

#[test]
fn unknown_major_schema_is_rejected() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("future.ckpt");
    let payload = CheckpointPayload {
        schema_version: smc_core::SchemaVersion::new(3, 0, 0),
        ..CheckpointPayload::default()
    };
    payload.store(&path).unwrap();

    let err = CheckpointStore::open(&path, Mode::Read).unwrap_err();
    assert!(err.has_code("checkpoint-schema"));
}
