use std::f64::consts::PI;

use smc_core::errors::{codes, ErrorInfo};
use smc_core::{Likelihood, Model, ParamMap, SmcError};

/// Independent Gaussian measurement errors with a common standard deviation:
/// `log L = -n/2 ln(2 pi sigma^2) - SSE / (2 sigma^2)`.
#[derive(Debug, Clone)]
pub struct GaussianLikelihood<M> {
    model: M,
    data: Vec<f64>,
}

impl<M: Model> GaussianLikelihood<M> {
    /// Pairs a model with the observations it is calibrated against.
    pub fn new(model: M, data: Vec<f64>) -> Self {
        Self { model, data }
    }

    /// Observations.
    pub fn data(&self) -> &[f64] {
        &self.data
    }

    /// Wrapped model.
    pub fn model(&self) -> &M {
        &self.model
    }
}

impl<M: Model> Likelihood for GaussianLikelihood<M> {
    fn log_likelihood(&self, params: &ParamMap, std_dev: f64) -> Result<f64, SmcError> {
        if !(std_dev.is_finite() && std_dev > 0.0) {
            return Ok(f64::NEG_INFINITY);
        }
        let predicted = self.model.evaluate(params)?;
        if predicted.len() != self.data.len() {
            return Err(SmcError::Kernel(
                ErrorInfo::new(
                    codes::KERNEL_FAILURE,
                    "model output length differs from data length",
                )
                .with_context("predicted", predicted.len().to_string())
                .with_context("observed", self.data.len().to_string()),
            ));
        }
        let sse: f64 = predicted
            .iter()
            .zip(&self.data)
            .map(|(p, d)| (p - d) * (p - d))
            .sum();
        let n = self.data.len() as f64;
        let variance = std_dev * std_dev;
        Ok(-0.5 * n * (2.0 * PI * variance).ln() - sse / (2.0 * variance))
    }
}
