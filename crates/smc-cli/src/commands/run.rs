use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::Args;
use serde::{Deserialize, Serialize};
use smc_core::ParamMap;
use smc_engine::{
    GaussianLikelihood, PolynomialModel, PriorSet, RestartConfig, RunSummary, SamplerConfig,
    SmcSampler,
};
use tracing::info;

use super::write_json;

#[derive(Args, Debug)]
pub struct RunArgs {
    /// YAML configuration describing the sampler run.
    #[arg(long)]
    pub config: PathBuf,
    /// JSON problem file with the data grid, observations and priors.
    #[arg(long)]
    pub problem: PathBuf,
    /// Output directory for run artefacts. Overrides `output.run_directory`.
    #[arg(long)]
    pub out: Option<PathBuf>,
    /// Worker threads for the mutation phase. Overrides `workers.count`.
    #[arg(long)]
    pub workers: Option<usize>,
    /// Resume at this 1-based tempering position.
    #[arg(long, requires = "restart_from")]
    pub restart_at: Option<usize>,
    /// Checkpoint holding the history to resume from.
    #[arg(long, requires = "restart_at")]
    pub restart_from: Option<PathBuf>,
}

/// Regression problem: observations `y` of a polynomial of `degree` at `x`.
#[derive(Debug, Deserialize)]
struct Problem {
    x: Vec<f64>,
    y: Vec<f64>,
    #[serde(default = "default_degree")]
    degree: usize,
    priors: PriorSet,
}

fn default_degree() -> usize {
    1
}

#[derive(Debug, Serialize)]
struct RunReport {
    steps: usize,
    log_evidence: f64,
    ensemble_hash: String,
    posterior_mean: Option<ParamMap>,
    resampled_steps: usize,
    checkpoint: Option<PathBuf>,
    metrics: Option<PathBuf>,
    manifest: Option<PathBuf>,
}

impl RunReport {
    fn from_summary(summary: &RunSummary) -> Result<Self, Box<dyn Error>> {
        let posterior_mean = summary.step_list.last().map(|step| step.mean()).transpose()?;
        Ok(Self {
            steps: summary.step_list.len(),
            log_evidence: summary.log_evidence,
            ensemble_hash: summary.ensemble_hash.clone(),
            posterior_mean,
            resampled_steps: summary
                .diagnostics
                .iter()
                .filter(|d| d.resample_status == smc_engine::ResampleStatus::Resampled)
                .count(),
            checkpoint: summary.checkpoint_path.clone(),
            metrics: summary.metrics_path.clone(),
            manifest: summary.manifest_path.clone(),
        })
    }
}

pub fn run(args: &RunArgs) -> Result<(), Box<dyn Error>> {
    let mut config = SamplerConfig::from_yaml(&fs::read_to_string(&args.config)?)?;
    if let Some(out) = &args.out {
        config.output.run_directory = Some(out.clone());
    }
    if let Some(workers) = args.workers {
        config.workers.count = workers;
    }
    if let Some(time_step) = args.restart_at {
        config.restart = Some(RestartConfig {
            time_step,
            checkpoint: args.restart_from.clone(),
        });
    }

    let problem: Problem = serde_json::from_str(&fs::read_to_string(&args.problem)?)?;
    if problem.x.len() != problem.y.len() {
        return Err(format!(
            "problem has {} grid points but {} observations",
            problem.x.len(),
            problem.y.len()
        )
        .into());
    }
    let model = PolynomialModel::new(problem.x, problem.degree);
    let param_names = model.param_names();
    let likelihood = Arc::new(GaussianLikelihood::new(model, problem.y));
    let sampler = SmcSampler::with_metropolis(
        likelihood,
        problem.priors,
        param_names,
        config.workers.count,
    );

    let summary = sampler.sample(&config)?;
    let report = RunReport::from_summary(&summary)?;
    info!(
        steps = report.steps,
        log_evidence = report.log_evidence,
        hash = %report.ensemble_hash,
        "run complete"
    );

    if let Some(run_dir) = &config.output.run_directory {
        write_json(run_dir.join("summary.json"), &report)?;
        // Keep the inputs next to the artefacts so the run can be replayed.
        keep_input(&args.config, &run_dir.join("config.yaml"))?;
        keep_input(&args.problem, &run_dir.join("problem.json"))?;
    }
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

/// Copies an input file into the run directory unless it already lives there.
fn keep_input(source: &Path, destination: &Path) -> Result<(), Box<dyn Error>> {
    if let (Ok(from), Ok(to)) = (source.canonicalize(), destination.canonicalize()) {
        if from == to {
            return Ok(());
        }
    }
    fs::copy(source, destination).map_err(|err| {
        format!(
            "copying {} to {}: {err}",
            source.display(),
            destination.display()
        )
    })?;
    Ok(())
}
