#![deny(missing_docs)]

//! Sequential Monte Carlo engine: walks an ensemble of weighted particles
//! from the prior to the posterior along a tempering schedule, reweighting,
//! resampling and mutating it at every position, with durable checkpoints
//! and deterministic restarts.

/// Analysis helpers over checkpoint files.
pub mod analysis;
/// Durable step history and restart source.
pub mod checkpoint;
/// Scatter/gather channel and worker groups.
pub mod comm;
/// YAML configuration schema and defaults.
pub mod config;
/// Explicit per-position run context.
pub mod context;
/// Deterministic seed derivation helpers.
pub mod determinism;
/// Canonical hashing of ensembles.
pub mod hash;
/// Initial ensemble draw.
pub mod initializer;
/// Reference tempered Metropolis kernel.
pub mod kernel;
/// Gaussian measurement likelihood.
pub mod likelihood;
/// Run manifest serialization helpers.
pub mod manifest;
/// Per-step diagnostics collection.
pub mod metrics;
/// Reference forward models.
pub mod models;
/// Markov-chain diversification of ensembles.
pub mod mutator;
/// Prior distributions.
pub mod priors;
/// Driver and coordinator role.
pub mod sampler;
/// Tempering schedules.
pub mod schedule;
/// Reweighting and resampling.
pub mod updater;

pub use analysis::{summarize_checkpoint, CheckpointSummary, StepSummary};
pub use checkpoint::{CheckpointStore, Mode};
pub use comm::{partition, Communicator, ProcessGroup, SingleRankComm, ThreadGroup};
pub use config::{
    CheckpointConfig, OutputConfig, ProposalConfig, RestartConfig, SamplerConfig, ScheduleConfig,
    SeedPolicy, WorkerConfig,
};
pub use context::RunContext;
pub use initializer::ParticleInitializer;
pub use kernel::TemperedMetropolis;
pub use likelihood::GaussianLikelihood;
pub use metrics::{DiagnosticsRecorder, StepDiagnostics};
pub use models::{LinearModel, PolynomialModel};
pub use mutator::{MutationOutcome, ParticleMutator, Worker};
pub use priors::{Prior, PriorSet};
pub use sampler::{Coordinator, RunSummary, SmcSampler};
pub use schedule::TemperingSchedule;
pub use updater::{ParticleUpdater, ResampleStatus};
