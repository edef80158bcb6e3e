//! Weighted parameter covariance and its square-root factorisation.

use nalgebra::{DMatrix, DVector, SymmetricEigen};
use serde::{Deserialize, Serialize};

use crate::errors::{codes, ErrorInfo, SmcError};

/// Relative tolerance below zero still accepted for eigenvalues of a
/// covariance matrix.
pub const PSD_TOLERANCE: f64 = 1e-10;

/// Covariance matrix over a named, ordered set of parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Covariance {
    names: Vec<String>,
    matrix: DMatrix<f64>,
}

impl Covariance {
    /// Wraps a square matrix whose rows follow `names`.
    pub fn new(names: Vec<String>, matrix: DMatrix<f64>) -> Result<Self, SmcError> {
        if matrix.nrows() != names.len() || matrix.ncols() != names.len() {
            return Err(SmcError::Numerical(
                ErrorInfo::new(
                    codes::COVARIANCE_SINGULAR,
                    "covariance shape does not match parameter count",
                )
                .with_context("parameters", names.len().to_string())
                .with_context("rows", matrix.nrows().to_string())
                .with_context("cols", matrix.ncols().to_string()),
            ));
        }
        Ok(Self { names, matrix })
    }

    /// Diagonal covariance with the given variances.
    pub fn diagonal(names: Vec<String>, variances: &[f64]) -> Result<Self, SmcError> {
        let matrix = DMatrix::from_diagonal(&DVector::from_column_slice(variances));
        Self::new(names, matrix)
    }

    /// Parameter names in row order.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Underlying matrix.
    pub fn matrix(&self) -> &DMatrix<f64> {
        &self.matrix
    }

    /// Dimension of the parameter space.
    pub fn dim(&self) -> usize {
        self.names.len()
    }

    /// Entry at `(row, col)`.
    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.matrix[(row, col)]
    }

    /// Factorises the matrix as `A Aᵀ` through its symmetric eigen
    /// decomposition. Singular but positive semi-definite matrices are
    /// accepted; directions with zero variance simply receive no proposal
    /// mass.
    pub fn factor(&self) -> Result<CovarianceFactor, SmcError> {
        if self.matrix.iter().any(|value| !value.is_finite()) {
            return Err(SmcError::Numerical(
                ErrorInfo::new(codes::COVARIANCE_SINGULAR, "covariance has non-finite entries")
                    .with_context("dimension", self.dim().to_string()),
            ));
        }
        let symmetric = (&self.matrix + self.matrix.transpose()) * 0.5;
        let eigen = SymmetricEigen::new(symmetric);
        let scale = eigen
            .eigenvalues
            .iter()
            .fold(1.0_f64, |acc, value| acc.max(value.abs()));
        let min = eigen.eigenvalues.iter().copied().fold(f64::INFINITY, f64::min);
        if min < -PSD_TOLERANCE * scale {
            return Err(SmcError::Numerical(
                ErrorInfo::new(
                    codes::COVARIANCE_SINGULAR,
                    "covariance is not positive semi-definite",
                )
                .with_context("min_eigenvalue", format!("{min:e}"))
                .with_hint("the ensemble may have collapsed onto a lower dimensional set"),
            ));
        }
        let roots = eigen.eigenvalues.map(|value| value.max(0.0).sqrt());
        let root = &eigen.eigenvectors * DMatrix::from_diagonal(&roots);
        Ok(CovarianceFactor { root })
    }
}

/// Square-root factor `A` of a covariance `Σ = A Aᵀ`.
#[derive(Debug, Clone, PartialEq)]
pub struct CovarianceFactor {
    root: DMatrix<f64>,
}

impl CovarianceFactor {
    /// Maps a standard normal vector onto a draw with covariance `Σ`.
    pub fn transform(&self, standard: &[f64]) -> Vec<f64> {
        let z = DVector::from_column_slice(standard);
        (&self.root * z).iter().copied().collect()
    }

    /// Dimension of the factor.
    pub fn dim(&self) -> usize {
        self.root.nrows()
    }
}
