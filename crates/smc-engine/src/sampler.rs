use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use smc_core::errors::{codes, ErrorInfo};
use smc_core::{
    Likelihood, MarkovKernel, ParamMap, RngHandle, RunProvenance, SmcError, Step, StepList,
};
use tracing::{info, warn};

use crate::checkpoint::{CheckpointStore, Mode};
use crate::comm::{Communicator, ProcessGroup};
use crate::config::{OutputConfig, RestartConfig, SamplerConfig};
use crate::context::RunContext;
use crate::determinism;
use crate::hash::canonical_step_list_hash;
use crate::initializer::ParticleInitializer;
use crate::kernel::TemperedMetropolis;
use crate::manifest::{self, RunManifest};
use crate::metrics::{DiagnosticsRecorder, StepDiagnostics};
use crate::mutator::ParticleMutator;
use crate::priors::PriorSet;
use crate::schedule::TemperingSchedule;
use crate::updater::ParticleUpdater;

/// Summary returned to callers after a run completes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Full history, one ensemble per tempering position.
    pub step_list: StepList,
    /// Diagnostics of every stepped position.
    pub diagnostics: Vec<StepDiagnostics>,
    /// Log of the marginal likelihood estimate.
    pub log_evidence: f64,
    /// Canonical hash of the history.
    pub ensemble_hash: String,
    /// Checkpoint written during the run.
    pub checkpoint_path: Option<PathBuf>,
    /// Diagnostics CSV, if emitted.
    pub metrics_path: Option<PathBuf>,
    /// Manifest path, if emitted.
    pub manifest_path: Option<PathBuf>,
}

/// SMC driver: walks the tempering schedule from prior to posterior.
///
/// The sampler itself only holds collaborators. All run state lives in a
/// [`Coordinator`] created per call to [`SmcSampler::sample`].
#[derive(Debug)]
pub struct SmcSampler<L, K, C = ProcessGroup> {
    likelihood: Arc<L>,
    priors: Arc<PriorSet>,
    param_names: Vec<String>,
    kernel: K,
    comm: C,
}

impl<L: Likelihood> SmcSampler<L, TemperedMetropolis<L>, ProcessGroup> {
    /// Sampler mutating with [`TemperedMetropolis`] over a worker group of
    /// `workers` threads (zero lets the pool decide).
    pub fn with_metropolis(
        likelihood: Arc<L>,
        priors: PriorSet,
        param_names: Vec<String>,
        workers: usize,
    ) -> Self {
        let priors = Arc::new(priors);
        let kernel = TemperedMetropolis::new(Arc::clone(&likelihood), Arc::clone(&priors));
        Self {
            likelihood,
            priors,
            param_names,
            kernel,
            comm: ProcessGroup::discover(workers),
        }
    }
}

impl<L, K, C> SmcSampler<L, K, C>
where
    L: Likelihood,
    K: MarkovKernel + Clone + Sync,
    C: Communicator,
{
    /// Sampler over the model parameters `param_names`.
    pub fn new(
        likelihood: Arc<L>,
        priors: Arc<PriorSet>,
        param_names: Vec<String>,
        kernel: K,
        comm: C,
    ) -> Self {
        Self {
            likelihood,
            priors,
            param_names,
            kernel,
            comm,
        }
    }

    /// Worker group used for mutation.
    pub fn comm(&self) -> &C {
        &self.comm
    }

    /// Runs the schedule to completion, either from a fresh ensemble or from
    /// a restored checkpoint prefix.
    pub fn sample(&self, config: &SamplerConfig) -> Result<RunSummary, SmcError> {
        let schedule = config.validate()?;
        let mut initializer = ParticleInitializer::new(
            Arc::clone(&self.likelihood),
            Arc::clone(&self.priors),
            &self.param_names,
            config.measurement_std_dev,
        )?;
        if let Some(proposal) = &config.proposal {
            initializer.set_proposal_distribution(proposal.clone())?;
        }
        let layout = OutputLayout::resolve(config)?;
        let master_seed = config.seed_policy.master_seed;

        // The restart source is read before the output is opened, since both
        // may name the same file.
        let restored = match &config.restart {
            Some(restart) => Some(load_restart_history(restart, &schedule)?),
            None => None,
        };
        let mut coordinator = Coordinator::new(schedule, layout.checkpoint.as_deref())?;
        let (mut step, start) = match restored {
            None => {
                let mut rng = RngHandle::from_seed(determinism::init_seed(master_seed));
                let mut step = initializer.initialize_particles(config.num_particles, &mut rng)?;
                step.normalize_log_weights()?;
                coordinator.record(&step, 0)?;
                (step, 1)
            }
            Some(history) => coordinator.resume_from(history, config.num_particles)?,
        };

        let updater = ParticleUpdater::new(config.ess_threshold);
        let mutator = ParticleMutator::new(
            self.kernel.clone(),
            config.num_mcmc_steps,
            config.burn_in,
            config.measurement_std_dev,
        );
        let schedule = coordinator.schedule.clone();
        let mut last_ess = step.len() as f64;
        for time_step in start..schedule.len() {
            let ctx = RunContext::new(&schedule, time_step, step.len(), master_seed);
            let reweighted = updater.update_log_weights(&step, ctx.delta_phi())?;
            let (resampled, ess, status) =
                updater.resample_if_needed(&reweighted, &mut ctx.resample_rng())?;
            let outcome = mutator.mutate_particles(&self.comm, &resampled, &ctx)?;
            step = outcome.step;
            coordinator.record(&step, time_step)?;

            info!(
                step = time_step,
                phi = ctx.phi(),
                last_ess,
                ess,
                mutated = outcome.mutation_ratio,
                status = %status,
                "tempering step complete"
            );
            coordinator.recorder.push(StepDiagnostics {
                time_step,
                phi: ctx.phi(),
                last_ess,
                ess,
                resample_status: status,
                mutation_ratio: outcome.mutation_ratio,
                acceptance_rate: outcome.acceptance_rate,
            });
            last_ess = ess;
        }

        coordinator.finish(config, &layout)
    }
}

/// Coordinator role: sole owner of the schedule, the canonical history,
/// the checkpoint writer and the diagnostics.
#[derive(Debug)]
pub struct Coordinator {
    schedule: TemperingSchedule,
    step_list: StepList,
    checkpoint: Option<CheckpointStore>,
    recorder: DiagnosticsRecorder,
}

impl Coordinator {
    /// Coordinator for `schedule`, checkpointing to `output` when given.
    pub fn new(schedule: TemperingSchedule, output: Option<&Path>) -> Result<Self, SmcError> {
        let checkpoint = match output {
            Some(path) => {
                let mut store = CheckpointStore::open(path, Mode::Write)?;
                store.record_schedule(schedule.as_slice())?;
                Some(store)
            }
            None => None,
        };
        Ok(Self {
            schedule,
            step_list: StepList::new(),
            checkpoint,
            recorder: DiagnosticsRecorder::new(),
        })
    }

    /// History recorded so far.
    pub fn step_list(&self) -> &StepList {
        &self.step_list
    }

    /// Checkpoints `step` under position `index` and appends it to the
    /// history.
    pub fn record(&mut self, step: &Step, index: usize) -> Result<(), SmcError> {
        if let Some(store) = self.checkpoint.as_mut() {
            store.write_step(step, index)?;
        }
        self.step_list.add_step(step.clone());
        Ok(())
    }

    /// Adopts a restored history prefix and re-checkpoints it under this
    /// run's output. Returns the ensemble to continue from and the first
    /// position to recompute.
    pub fn resume_from(
        &mut self,
        history: StepList,
        num_particles: usize,
    ) -> Result<(Step, usize), SmcError> {
        let Some(current) = history.last().cloned() else {
            return Err(SmcError::configuration(
                codes::INVALID_RESTART_POSITION,
                "restart kept no ensemble",
            ));
        };
        if current.len() != num_particles {
            warn!(
                configured = num_particles,
                restored = current.len(),
                "restored ensemble size differs from the configuration"
            );
        }
        if let Some(store) = self.checkpoint.as_mut() {
            store.write_step_list(&history)?;
        }
        let start = history.len();
        self.step_list = history;
        Ok((current, start))
    }

    fn finish(
        mut self,
        config: &SamplerConfig,
        layout: &OutputLayout,
    ) -> Result<RunSummary, SmcError> {
        if let Some(store) = self.checkpoint.take() {
            store.close()?;
        }
        let log_evidence = self.step_list.log_bayes_evidence();
        let ensemble_hash = canonical_step_list_hash(&self.step_list);

        let metrics_path = match &layout.metrics {
            Some(path) => {
                self.recorder.write_csv(path).map_err(|err| {
                    SmcError::Serde(
                        ErrorInfo::new("metrics-write", err.to_string())
                            .with_context("path", path.display().to_string()),
                    )
                })?;
                Some(path.clone())
            }
            None => None,
        };

        let manifest_path = match &layout.manifest {
            Some(path) => {
                let final_mean = match self.step_list.last() {
                    Some(step) => step.mean()?,
                    None => ParamMap::new(),
                };
                let manifest = RunManifest {
                    config: config.clone(),
                    provenance: RunProvenance::new(
                        config.seed_policy.master_seed,
                        config.seed_policy.label.clone(),
                        ensemble_hash.clone(),
                    )
                    .with_tool(env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION")),
                    schedule: self.schedule.as_slice().to_vec(),
                    steps: self.step_list.len(),
                    log_evidence,
                    final_mean,
                    checkpoint: layout.checkpoint.clone(),
                    metrics_file: metrics_path.clone(),
                    completed_at: manifest::timestamp(),
                };
                manifest.write(path)?;
                Some(path.clone())
            }
            None => None,
        };

        Ok(RunSummary {
            step_list: self.step_list,
            diagnostics: self.recorder.into_samples(),
            log_evidence,
            ensemble_hash,
            checkpoint_path: layout.checkpoint.clone(),
            metrics_path,
            manifest_path,
        })
    }
}

/// Loads the checkpoint named by `restart`, keeps the positions before the
/// restart position and checks they were tempered with `schedule`.
pub fn load_restart_history(
    restart: &RestartConfig,
    schedule: &TemperingSchedule,
) -> Result<StepList, SmcError> {
    let source = restart.checkpoint.as_deref().ok_or_else(|| {
        SmcError::configuration(
            codes::MISSING_CHECKPOINT_SOURCE,
            "restart requested without a checkpoint to load",
        )
    })?;
    let store = CheckpointStore::open(source, Mode::Read)?;
    let trimmed = trim_step_list(store.read_step_list()?, restart.time_step)?;
    check_restart_schedule(store.schedule(), schedule.as_slice(), trimmed.len())?;
    info!(
        source = %source.display(),
        kept = trimmed.len(),
        "restored ensemble history"
    );
    Ok(trimmed)
}

/// The kept history must have been produced under the same temperatures the
/// resumed run will use for those positions.
pub fn check_restart_schedule(
    stored: &[f64],
    configured: &[f64],
    keep: usize,
) -> Result<(), SmcError> {
    let matches = !stored.is_empty()
        && stored.len() >= keep
        && configured.len() >= keep
        && stored[..keep] == configured[..keep];
    if matches {
        return Ok(());
    }
    Err(SmcError::Configuration(
        ErrorInfo::new(
            codes::MISMATCHED_RESTART_SCHEDULE,
            "checkpoint schedule differs from the configured one",
        )
        .with_context("stored", format!("{stored:?}"))
        .with_context("configured", format!("{configured:?}"))
        .with_context("kept", keep.to_string()),
    ))
}

/// Keeps the positions strictly before the one-based `restart_time_step`.
pub fn trim_step_list(
    mut steps: StepList,
    restart_time_step: usize,
) -> Result<StepList, SmcError> {
    let keep = restart_time_step.saturating_sub(1);
    if keep == 0 || keep > steps.len() {
        return Err(SmcError::Configuration(
            ErrorInfo::new(
                codes::INVALID_RESTART_POSITION,
                "restart position beyond the loaded history",
            )
            .with_context("time_step", restart_time_step.to_string())
            .with_context("available", steps.len().to_string()),
        ));
    }
    steps.trim(keep);
    Ok(steps)
}

#[derive(Debug, Default)]
struct OutputLayout {
    checkpoint: Option<PathBuf>,
    metrics: Option<PathBuf>,
    manifest: Option<PathBuf>,
}

impl OutputLayout {
    fn resolve(config: &SamplerConfig) -> Result<Self, SmcError> {
        let OutputConfig {
            run_directory,
            metrics_file,
            manifest_file,
        } = &config.output;
        let Some(run_dir) = run_directory else {
            return Ok(Self {
                checkpoint: config.checkpoint.output.clone(),
                ..Self::default()
            });
        };
        fs::create_dir_all(run_dir).map_err(|err| {
            SmcError::storage("output-mkdir", err.to_string())
                .with_context("path", run_dir.display().to_string())
        })?;
        Ok(Self {
            checkpoint: config
                .checkpoint
                .output
                .as_ref()
                .map(|path| run_dir.join(path)),
            metrics: Some(run_dir.join(metrics_file)),
            manifest: Some(run_dir.join(manifest_file)),
        })
    }
}
