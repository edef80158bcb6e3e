use smc_core::errors::{codes, ErrorInfo};
use smc_core::{Model, ParamMap, SmcError};

/// Polynomial `y = c0 + c1 x + ... + cd x^d` evaluated on a fixed grid.
///
/// Coefficients are read from parameters named `c0 .. cd`.
#[derive(Debug, Clone, PartialEq)]
pub struct PolynomialModel {
    x: Vec<f64>,
    degree: usize,
}

impl PolynomialModel {
    /// Polynomial of `degree` over the grid `x`.
    pub fn new(x: Vec<f64>, degree: usize) -> Self {
        Self { x, degree }
    }

    /// Parameter names the model reads, in coordinate order.
    pub fn param_names(&self) -> Vec<String> {
        (0..=self.degree).map(|k| format!("c{k}")).collect()
    }

    fn coefficient(&self, params: &ParamMap, k: usize) -> Result<f64, SmcError> {
        params.get(&format!("c{k}")).copied().ok_or_else(|| {
            SmcError::Kernel(
                ErrorInfo::new(codes::KERNEL_FAILURE, "missing polynomial coefficient")
                    .with_context("parameter", format!("c{k}")),
            )
        })
    }
}

impl Model for PolynomialModel {
    fn evaluate(&self, params: &ParamMap) -> Result<Vec<f64>, SmcError> {
        let coefficients = (0..=self.degree)
            .map(|k| self.coefficient(params, k))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(self
            .x
            .iter()
            .map(|x| coefficients.iter().rev().fold(0.0, |acc, c| acc * x + c))
            .collect())
    }
}

/// Straight line `y = a x + b`.
#[derive(Debug, Clone, PartialEq)]
pub struct LinearModel {
    x: Vec<f64>,
}

impl LinearModel {
    /// Line evaluated on the grid `x`.
    pub fn new(x: Vec<f64>) -> Self {
        Self { x }
    }

    /// Parameter names the model reads.
    pub fn param_names() -> Vec<String> {
        vec!["a".to_string(), "b".to_string()]
    }
}

impl Model for LinearModel {
    fn evaluate(&self, params: &ParamMap) -> Result<Vec<f64>, SmcError> {
        let lookup = |name: &str| {
            params.get(name).copied().ok_or_else(|| {
                SmcError::Kernel(
                    ErrorInfo::new(codes::KERNEL_FAILURE, "missing linear model parameter")
                        .with_context("parameter", name),
                )
            })
        };
        let a = lookup("a")?;
        let b = lookup("b")?;
        Ok(self.x.iter().map(|x| a * x + b).collect())
    }
}
