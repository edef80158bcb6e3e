use std::sync::Arc;

use criterion::{criterion_group, criterion_main, Criterion};

use smc_engine::{
    GaussianLikelihood, LinearModel, Prior, PriorSet, SamplerConfig, ScheduleConfig, SmcSampler,
};

fn sample_likelihood() -> Arc<GaussianLikelihood<LinearModel>> {
    let x: Vec<f64> = (0..16).map(|i| i as f64 * 0.25).collect();
    let y = x.iter().map(|x| 1.5 * x - 0.5).collect();
    Arc::new(GaussianLikelihood::new(LinearModel::new(x), y))
}

fn sample_priors() -> PriorSet {
    PriorSet::new()
        .with("a", Prior::Uniform { low: -5.0, high: 5.0 })
        .with("b", Prior::Normal { mean: 0.0, std_dev: 2.0 })
}

fn bench_run(c: &mut Criterion) {
    let config = SamplerConfig {
        num_particles: 200,
        schedule: ScheduleConfig::Uniform { num_time_steps: 6 },
        num_mcmc_steps: 3,
        measurement_std_dev: Some(0.25),
        ess_threshold: Some(100.0),
        ..SamplerConfig::default()
    };

    for workers in [1, 4] {
        let sampler = SmcSampler::with_metropolis(
            sample_likelihood(),
            sample_priors(),
            LinearModel::param_names(),
            workers,
        );
        c.bench_function(&format!("smc_run_{workers}_workers"), |b| {
            b.iter(|| {
                let _ = sampler.sample(&config).unwrap();
            })
        });
    }
}

criterion_group!(benches, bench_run);
criterion_main!(benches);
