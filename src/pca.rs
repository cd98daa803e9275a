use crate::data::Data;
use crate::param::Param;
use crate::scale::{self, ScalingMethod};
use log::info;
use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;

/// Hard ceiling on retained components, regardless of the request.
pub const MAX_COMPONENTS: usize = 10;

/// One sample's coordinates along the retained components. Serialized as a
/// flat object: sample, group, pc1..pcN.
#[derive(Debug, Clone, PartialEq)]
pub struct PcaScore {
    pub sample: String,
    pub group: i32,
    pub coordinates: Vec<f64>,
}

impl Serialize for PcaScore {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(2 + self.coordinates.len()))?;
        map.serialize_entry("sample", &self.sample)?;
        map.serialize_entry("group", &self.group)?;
        for (c, value) in self.coordinates.iter().enumerate() {
            map.serialize_entry(&format!("pc{}", c + 1), value)?;
        }
        map.end()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PcaSummary {
    pub n_components: usize,
    pub scaling_method: String,
    pub total_variance_explained: f64,
    pub design_label: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PcaResult {
    pub scores: Vec<PcaScore>,
    #[serde(rename = "explainedVariance")]
    pub explained_variance: Vec<f64>,
    #[serde(rename = "cumulativeVariance")]
    pub cumulative_variance: Vec<f64>,
    /// One loading vector per component, each of length feature_len.
    pub loadings: Vec<Vec<f64>>,
    pub summary: PcaSummary,
}

/// Sample covariance matrix (p x p, row-major) of a row-major data matrix.
fn covariance_matrix(x: &[f64], n: usize, p: usize) -> Vec<f64> {
    let means: Vec<f64> = (0..p)
        .map(|j| (0..n).map(|i| x[i * p + j]).sum::<f64>() / n as f64)
        .collect();
    let denom = if n > 1 { (n - 1) as f64 } else { 1.0 };
    let mut cov = vec![0.0; p * p];
    for a in 0..p {
        for b in a..p {
            let s: f64 = (0..n)
                .map(|i| (x[i * p + a] - means[a]) * (x[i * p + b] - means[b]))
                .sum();
            cov[a * p + b] = s / denom;
            cov[b * p + a] = s / denom;
        }
    }
    cov
}

/// Largest eigenpair of a symmetric matrix by power iteration.
fn power_iteration(matrix: &[f64], p: usize, max_iter: usize, tol: f64) -> (f64, Vec<f64>) {
    let mut v = vec![1.0 / (p as f64).sqrt(); p];
    let mut eigenvalue = 0.0;

    for _ in 0..max_iter {
        let mut next = vec![0.0; p];
        for a in 0..p {
            for b in 0..p {
                next[a] += matrix[a * p + b] * v[b];
            }
        }

        // Rayleigh quotient with the previous (unit) vector.
        let next_eigenvalue: f64 = v.iter().zip(next.iter()).map(|(a, b)| a * b).sum();

        let norm: f64 = next.iter().map(|x| x * x).sum::<f64>().sqrt();
        if norm > 1e-12 {
            for value in next.iter_mut() {
                *value /= norm;
            }
        }

        if (next_eigenvalue - eigenvalue).abs() < tol {
            return (next_eigenvalue, next);
        }
        eigenvalue = next_eigenvalue;
        v = next;
    }

    (eigenvalue, v)
}

/// Leading k eigenpairs of a symmetric matrix, by repeated power iteration
/// with deflation. Eigenvalues come out in descending order and are clamped
/// at zero (the covariance matrix is positive semi-definite).
fn leading_eigenpairs(matrix: &[f64], p: usize, k: usize) -> (Vec<f64>, Vec<Vec<f64>>) {
    let mut deflated = matrix.to_vec();
    let mut eigenvalues = Vec::with_capacity(k);
    let mut eigenvectors = Vec::with_capacity(k);

    for _ in 0..k {
        let (eigenvalue, eigenvector) = power_iteration(&deflated, p, 500, 1e-12);
        let eigenvalue = eigenvalue.max(0.0);

        // Deflate: A <- A - lambda v v^T
        for a in 0..p {
            for b in 0..p {
                deflated[a * p + b] -= eigenvalue * eigenvector[a] * eigenvector[b];
            }
        }

        eigenvalues.push(eigenvalue);
        eigenvectors.push(eigenvector);
    }

    (eigenvalues, eigenvectors)
}

/// PCA over the dataset: missing values are replaced by zero across the
/// whole matrix, the requested scaling is applied, and the scaled data is
/// decomposed through its covariance matrix.
pub fn pca(data: &Data, param: &Param) -> PcaResult {
    let n = data.sample_len;
    let p = data.feature_len;
    let method: ScalingMethod = param.pca.scaling_method;
    let n_components = param.pca.num_components.min(MAX_COMPONENTS).min(p);

    info!("Running PCA on {} samples x {} variables", n, p);

    let cleaned: Vec<f64> = data
        .X
        .iter()
        .map(|v| if v.is_nan() { 0.0 } else { *v })
        .collect();
    let scaled = scale::scale(&cleaned, n, p, method);
    info!("Applied {} scaling", method);

    let cov = covariance_matrix(&scaled, n, p);
    let total_variance: f64 = (0..p).map(|j| cov[j * p + j]).sum();
    let (eigenvalues, eigenvectors) = leading_eigenpairs(&cov, p, n_components);

    let explained_variance: Vec<f64> = eigenvalues
        .iter()
        .map(|&lambda| {
            if total_variance > 0.0 {
                lambda / total_variance * 100.0
            } else {
                0.0
            }
        })
        .collect();
    let cumulative_variance: Vec<f64> = explained_variance
        .iter()
        .scan(0.0, |acc, &v| {
            *acc += v;
            Some(*acc)
        })
        .collect();

    let scores: Vec<PcaScore> = (0..n)
        .map(|i| PcaScore {
            sample: format!("Sample_{}", i + 1),
            group: data.y.get(i).copied().unwrap_or(1),
            coordinates: eigenvectors
                .iter()
                .map(|v| (0..p).map(|j| scaled[i * p + j] * v[j]).sum())
                .collect(),
        })
        .collect();

    if let Some(first) = explained_variance.first() {
        info!("PCA: PC1 explains {:.1}% variance", first);
    }

    PcaResult {
        scores,
        explained_variance,
        cumulative_variance: cumulative_variance.clone(),
        loadings: eigenvectors,
        summary: PcaSummary {
            n_components,
            scaling_method: method.to_string(),
            total_variance_explained: cumulative_variance.last().copied().unwrap_or(0.0),
            design_label: param.pca.design_label.clone(),
        },
    }
}
