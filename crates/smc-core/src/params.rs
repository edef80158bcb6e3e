use std::collections::BTreeMap;

use crate::errors::{codes, ErrorInfo, SmcError};

/// Name of the parameter carrying the measurement noise level when it is
/// inferred together with the model parameters.
pub const NOISE_PARAM: &str = "std_dev";

/// Mapping from parameter name to value. Ordered so that every vector view of
/// a parameter map uses the same (lexicographic) coordinate order.
pub type ParamMap = BTreeMap<String, f64>;

/// Returns the parameter names of a map in coordinate order.
pub fn param_names(params: &ParamMap) -> Vec<String> {
    params.keys().cloned().collect()
}

/// Projects a parameter map onto the given coordinate order.
pub fn to_vector(params: &ParamMap, names: &[String]) -> Result<Vec<f64>, SmcError> {
    names
        .iter()
        .map(|name| {
            params.get(name).copied().ok_or_else(|| {
                SmcError::Configuration(
                    ErrorInfo::new(
                        codes::MISMATCHED_PARAMETER_KEYS,
                        "parameter missing from particle",
                    )
                    .with_context("parameter", name.clone()),
                )
            })
        })
        .collect()
}

/// Rebuilds a parameter map from a coordinate vector.
pub fn from_vector(names: &[String], values: &[f64]) -> ParamMap {
    names
        .iter()
        .cloned()
        .zip(values.iter().copied())
        .collect()
}
