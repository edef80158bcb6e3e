use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::updater::ResampleStatus;

/// Diagnostics of one stepped tempering position.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StepDiagnostics {
    /// Tempering position (0-based).
    pub time_step: usize,
    /// Tempering value at the position.
    pub phi: f64,
    /// ESS reported at the previous position.
    pub last_ess: f64,
    /// ESS after reweighting, before any resample.
    pub ess: f64,
    /// Whether the ensemble was resampled.
    pub resample_status: ResampleStatus,
    /// Fraction of particles moved by mutation.
    pub mutation_ratio: f64,
    /// Mean kernel acceptance rate, when tracked.
    pub acceptance_rate: Option<f64>,
}

/// Collects per-position diagnostics for CSV export.
#[derive(Debug, Default)]
pub struct DiagnosticsRecorder {
    samples: Vec<StepDiagnostics>,
}

impl DiagnosticsRecorder {
    /// Creates an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one position.
    pub fn push(&mut self, sample: StepDiagnostics) {
        self.samples.push(sample);
    }

    /// Recorded samples in stepping order.
    pub fn samples(&self) -> &[StepDiagnostics] {
        &self.samples
    }

    /// Consumes the recorder.
    pub fn into_samples(self) -> Vec<StepDiagnostics> {
        self.samples
    }

    /// Fraction of stepped positions that resampled.
    pub fn resample_fraction(&self) -> f64 {
        if self.samples.is_empty() {
            return 0.0;
        }
        let resampled = self
            .samples
            .iter()
            .filter(|sample| sample.resample_status == ResampleStatus::Resampled)
            .count();
        resampled as f64 / self.samples.len() as f64
    }

    /// Writes the recorded diagnostics to a CSV file.
    pub fn write_csv<P: AsRef<Path>>(&self, path: P) -> std::io::Result<()> {
        let mut file = BufWriter::new(File::create(path)?);
        writeln!(
            file,
            "time_step,phi,last_ess,ess,resample_status,mutation_ratio,acceptance_rate"
        )?;
        for sample in &self.samples {
            let acceptance = sample
                .acceptance_rate
                .map(|rate| format!("{rate:.6}"))
                .unwrap_or_default();
            writeln!(
                file,
                "{},{:.6},{:.6},{:.6},{},{:.6},{}",
                sample.time_step,
                sample.phi,
                sample.last_ess,
                sample.ess,
                sample.resample_status,
                sample.mutation_ratio,
                acceptance
            )?;
        }
        file.flush()
    }
}
