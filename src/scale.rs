use crate::error::AnalysisError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Column-wise scaling applied before PCA.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
#[allow(non_camel_case_types)]
pub enum ScalingMethod {
    /// Center and divide by the sample standard deviation (unit variance).
    auto,
    /// Center only.
    mean,
    /// Center and divide by the square root of the sample standard deviation.
    pareto,
}

impl fmt::Display for ScalingMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScalingMethod::auto => write!(f, "auto"),
            ScalingMethod::mean => write!(f, "mean"),
            ScalingMethod::pareto => write!(f, "pareto"),
        }
    }
}

impl FromStr for ScalingMethod {
    type Err = AnalysisError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "auto" => Ok(ScalingMethod::auto),
            "mean" => Ok(ScalingMethod::mean),
            "pareto" => Ok(ScalingMethod::pareto),
            other => Err(AnalysisError::InvalidParameter(format!(
                "unknown scaling method: {}",
                other
            ))),
        }
    }
}

fn column_mean(x: &[f64], sample_len: usize, feature_len: usize, j: usize) -> f64 {
    (0..sample_len).map(|i| x[i * feature_len + j]).sum::<f64>() / sample_len as f64
}

/// Sample standard deviation (denominator n-1) of column j.
fn column_std(x: &[f64], sample_len: usize, feature_len: usize, j: usize, mean: f64) -> f64 {
    if sample_len < 2 {
        return 0.0;
    }
    let ss: f64 = (0..sample_len)
        .map(|i| (x[i * feature_len + j] - mean).powi(2))
        .sum();
    (ss / (sample_len as f64 - 1.0)).sqrt()
}

/// Apply a column-wise transform to a dense row-major matrix.
///
/// A column whose standard deviation is exactly zero keeps a divisor of 1,
/// so a constant column comes out all-zero instead of NaN.
pub fn scale(
    x: &[f64],
    sample_len: usize,
    feature_len: usize,
    method: ScalingMethod,
) -> Vec<f64> {
    let mut out = x.to_vec();
    for j in 0..feature_len {
        let mean = column_mean(x, sample_len, feature_len, j);
        let divisor = match method {
            ScalingMethod::mean => 1.0,
            ScalingMethod::auto => {
                let std = column_std(x, sample_len, feature_len, j, mean);
                if std == 0.0 {
                    1.0
                } else {
                    std
                }
            }
            ScalingMethod::pareto => {
                let std = column_std(x, sample_len, feature_len, j, mean);
                if std == 0.0 {
                    1.0
                } else {
                    std.sqrt()
                }
            }
        };
        for i in 0..sample_len {
            out[i * feature_len + j] = (x[i * feature_len + j] - mean) / divisor;
        }
    }
    out
}
