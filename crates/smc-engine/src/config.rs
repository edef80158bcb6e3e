use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use smc_core::errors::{codes, ErrorInfo};
use smc_core::{ParamMap, SmcError};

use crate::schedule::TemperingSchedule;

/// YAML-configurable parameters governing one SMC run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SamplerConfig {
    /// Number of particles in every ensemble.
    pub num_particles: usize,
    /// Tempering path from prior to posterior.
    #[serde(default)]
    pub schedule: ScheduleConfig,
    /// Markov-chain transitions per particle per tempering position.
    #[serde(default = "default_mcmc_steps")]
    pub num_mcmc_steps: usize,
    /// Transitions discarded before the counted ones.
    #[serde(default)]
    pub burn_in: usize,
    /// Fixed measurement noise level. When absent, `std_dev` is inferred
    /// and needs a prior.
    #[serde(default)]
    pub measurement_std_dev: Option<f64>,
    /// Resample whenever the ESS drops to this value or below. Absent
    /// disables resampling.
    #[serde(default)]
    pub ess_threshold: Option<f64>,
    /// Initial sampling distribution replacing the prior.
    #[serde(default)]
    pub proposal: Option<ProposalConfig>,
    /// Resume from a previous run's checkpoint.
    #[serde(default)]
    pub restart: Option<RestartConfig>,
    /// Checkpointing behaviour.
    #[serde(default)]
    pub checkpoint: CheckpointConfig,
    /// Master seed and substream policy.
    #[serde(default)]
    pub seed_policy: SeedPolicy,
    /// Mutation worker group.
    #[serde(default)]
    pub workers: WorkerConfig,
    /// Output directory configuration.
    #[serde(default)]
    pub output: OutputConfig,
}

fn default_mcmc_steps() -> usize {
    1
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            num_particles: 100,
            schedule: ScheduleConfig::default(),
            num_mcmc_steps: default_mcmc_steps(),
            burn_in: 0,
            measurement_std_dev: None,
            ess_threshold: None,
            proposal: None,
            restart: None,
            checkpoint: CheckpointConfig::default(),
            seed_policy: SeedPolicy::default(),
            workers: WorkerConfig::default(),
            output: OutputConfig::default(),
        }
    }
}

impl SamplerConfig {
    /// Parses a configuration from YAML text.
    pub fn from_yaml(text: &str) -> Result<Self, SmcError> {
        serde_yaml::from_str(text)
            .map_err(|err| SmcError::Serde(ErrorInfo::new("config-parse", err.to_string())))
    }

    /// Eager checks run before any sampling work. Prior checks need the
    /// likelihood's parameter names and live in the initializer.
    pub fn validate(&self) -> Result<TemperingSchedule, SmcError> {
        if self.num_particles == 0 {
            return Err(SmcError::configuration(
                codes::INVALID_PARTICLE_COUNT,
                "num_particles must be positive",
            ));
        }
        let schedule = TemperingSchedule::from_config(&self.schedule)?;
        if let Some(std_dev) = self.measurement_std_dev {
            if !(std_dev.is_finite() && std_dev > 0.0) {
                return Err(SmcError::Configuration(
                    ErrorInfo::new(
                        codes::NON_POSITIVE_SCALE,
                        "measurement_std_dev must be positive",
                    )
                    .with_context("measurement_std_dev", std_dev.to_string()),
                ));
            }
        }
        if let Some(proposal) = &self.proposal {
            proposal.validate()?;
        }
        if let Some(restart) = &self.restart {
            restart.validate(schedule.len())?;
        }
        Ok(schedule)
    }
}

/// Supported tempering schedule constructions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ScheduleConfig {
    /// Evenly spaced positions from 0 to 1.
    Uniform {
        /// Number of tempering positions, including the prior.
        num_time_steps: usize,
    },
    /// Explicit list of tempering values.
    Manual {
        /// Ordered tempering values.
        phis: Vec<f64>,
    },
}

fn default_time_steps() -> usize {
    10
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        ScheduleConfig::Uniform {
            num_time_steps: default_time_steps(),
        }
    }
}

/// Gaussian proposal for the initial draw: `N(center, scale²)` per parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProposalConfig {
    /// Proposal mean per parameter.
    pub center: ParamMap,
    /// Proposal standard deviation per parameter.
    pub scales: ParamMap,
}

impl ProposalConfig {
    /// Checks that center and scales cover the same parameters and that
    /// every scale is positive.
    pub fn validate(&self) -> Result<(), SmcError> {
        if !self.center.keys().eq(self.scales.keys()) {
            return Err(SmcError::Configuration(
                ErrorInfo::new(
                    codes::INVALID_PROPOSAL_SPEC,
                    "proposal center and scales name different parameters",
                )
                .with_context("center", keys(&self.center))
                .with_context("scales", keys(&self.scales)),
            ));
        }
        for (name, scale) in &self.scales {
            if !(scale.is_finite() && *scale > 0.0) {
                return Err(SmcError::Configuration(
                    ErrorInfo::new(codes::NON_POSITIVE_SCALE, "proposal scale must be positive")
                        .with_context("parameter", name.clone())
                        .with_context("scale", scale.to_string()),
                ));
            }
        }
        Ok(())
    }
}

fn keys(params: &ParamMap) -> String {
    params.keys().cloned().collect::<Vec<_>>().join(",")
}

/// Where and how far back to resume.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RestartConfig {
    /// One-based tempering position to recompute from; positions before it
    /// are taken from the checkpoint.
    pub time_step: usize,
    /// Checkpoint written by the earlier run.
    #[serde(default)]
    pub checkpoint: Option<PathBuf>,
}

impl RestartConfig {
    /// Checks `1 < time_step <= schedule_len` and that a source is named.
    pub fn validate(&self, schedule_len: usize) -> Result<(), SmcError> {
        if self.time_step <= 1 || self.time_step > schedule_len {
            return Err(SmcError::Configuration(
                ErrorInfo::new(
                    codes::INVALID_RESTART_POSITION,
                    "restart time step outside the schedule",
                )
                .with_context("time_step", self.time_step.to_string())
                .with_context("schedule_len", schedule_len.to_string())
                .with_hint("restart positions are one-based and must exceed 1"),
            ));
        }
        if self.checkpoint.is_none() {
            return Err(SmcError::configuration(
                codes::MISSING_CHECKPOINT_SOURCE,
                "restart requested without a checkpoint to load",
            ));
        }
        Ok(())
    }
}

/// Checkpointing configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CheckpointConfig {
    /// Checkpoint file written as the run progresses. Relative paths are
    /// resolved against `output.run_directory` when one is set.
    #[serde(default)]
    pub output: Option<PathBuf>,
}

/// Deterministic seeding configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeedPolicy {
    /// Master seed used for the run.
    #[serde(default = "default_master_seed")]
    pub master_seed: u64,
    /// Optional label recorded in manifests.
    #[serde(default)]
    pub label: Option<String>,
}

fn default_master_seed() -> u64 {
    0x05EE_D5EE_DD15_5EED_u64
}

impl Default for SeedPolicy {
    fn default() -> Self {
        Self {
            master_seed: default_master_seed(),
            label: None,
        }
    }
}

/// Size of the mutation worker group.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Number of workers. Zero takes the thread pool's default, one runs
    /// mutation in process.
    #[serde(default)]
    pub count: usize,
}

/// Output directory layout configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Root directory for run artefacts. Created if it does not exist.
    #[serde(default)]
    pub run_directory: Option<PathBuf>,
    /// Diagnostics filename relative to `run_directory`.
    #[serde(default = "default_metrics_filename")]
    pub metrics_file: PathBuf,
    /// Manifest filename relative to `run_directory`.
    #[serde(default = "default_manifest_filename")]
    pub manifest_file: PathBuf,
}

fn default_metrics_filename() -> PathBuf {
    PathBuf::from("diagnostics.csv")
}

fn default_manifest_filename() -> PathBuf {
    PathBuf::from("manifest.json")
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            run_directory: None,
            metrics_file: default_metrics_filename(),
            manifest_file: default_manifest_filename(),
        }
    }
}
