/// Multiple-testing correction over a family of raw p-values.
///
/// One record carries both corrections so callers never unpack positional
/// tuples: Bonferroni (threshold = alpha / m, adjusted p = raw * m, reported
/// uncapped) and Benjamini-Hochberg step-up FDR (adjusted p monotone and
/// capped at 1).
#[derive(Debug, Clone, PartialEq)]
pub struct Correction {
    pub bonferroni_adjusted: Vec<f64>,
    pub bonferroni_significant: Vec<bool>,
    pub bh_adjusted: Vec<f64>,
    pub bh_significant: Vec<bool>,
}

impl Correction {
    pub fn bonferroni_count(&self) -> usize {
        self.bonferroni_significant.iter().filter(|&&s| s).count()
    }

    pub fn bh_count(&self) -> usize {
        self.bh_significant.iter().filter(|&&s| s).count()
    }
}

pub fn correct(p_values: &[f64], fdr_threshold: f64) -> Correction {
    let m = p_values.len();
    if m == 0 {
        return Correction {
            bonferroni_adjusted: Vec::new(),
            bonferroni_significant: Vec::new(),
            bh_adjusted: Vec::new(),
            bh_significant: Vec::new(),
        };
    }
    let m_f = m as f64;

    let bonferroni_threshold = fdr_threshold / m_f;
    let bonferroni_adjusted: Vec<f64> = p_values.iter().map(|p| p * m_f).collect();
    let bonferroni_significant: Vec<bool> =
        p_values.iter().map(|&p| p <= bonferroni_threshold).collect();

    // Sort ascending, ties kept in original order for determinism.
    let mut order: Vec<usize> = (0..m).collect();
    order.sort_by(|&a, &b| {
        p_values[a]
            .partial_cmp(&p_values[b])
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    // Step-up rejection: largest rank k with p_(k) <= k/m * alpha rejects
    // every hypothesis of rank <= k.
    let mut last_reject: Option<usize> = None;
    for (rank, &idx) in order.iter().enumerate() {
        if p_values[idx] <= (rank + 1) as f64 / m_f * fdr_threshold {
            last_reject = Some(rank);
        }
    }
    let mut bh_significant = vec![false; m];
    if let Some(k) = last_reject {
        for &idx in &order[..=k] {
            bh_significant[idx] = true;
        }
    }

    // Adjusted p-values: p_(i) * m / i, made monotone from the largest rank
    // down, capped at 1.
    let mut bh_adjusted = vec![0.0; m];
    let mut running_min = f64::INFINITY;
    for rank in (0..m).rev() {
        let idx = order[rank];
        let adjusted = p_values[idx] * m_f / (rank + 1) as f64;
        running_min = running_min.min(adjusted).min(1.0);
        bh_adjusted[idx] = running_min;
    }

    Correction {
        bonferroni_adjusted,
        bonferroni_significant,
        bh_adjusted,
        bh_significant,
    }
}
