use crate::correction::{self, Correction};
use crate::data::Data;
use crate::param::Param;
use log::info;
use rayon::prelude::*;
use rayon::ThreadPoolBuilder;
use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, FisherSnedecor};

/// Per-variable test record, serialized with the upstream wire names.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VariableStats {
    pub variable: String,
    #[serde(rename = "pValue")]
    pub p_value: f64,
    pub fdr: f64,
    pub bonferroni: f64,
    pub benjamini: bool,
    #[serde(rename = "effectSize")]
    pub effect_size: f64,
}

/// Robust five-number summary for one (variable, group) pair. `min`/`max`
/// are whisker bounds, not true extremes; `values` keeps the raw data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupBoxplot {
    pub group: String,
    pub min: f64,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub max: f64,
    pub values: Vec<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnovaSummary {
    pub total_variables: usize,
    pub benjamini_significant: usize,
    pub bonferroni_significant: usize,
    pub nominal_significant: usize,
    pub fdr_threshold: f64,
    pub design_label: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnovaResult {
    pub results: Vec<VariableStats>,
    pub significant_variables: Vec<usize>,
    pub boxplot_data: Vec<Vec<GroupBoxplot>>,
    pub summary: AnovaSummary,
}

/// One-way equal-variance F-test over the given groups.
///
/// Returns (p_value, effect_size_pct). A variable with zero total variance
/// or an undefined test statistic reports p = 1.0; zero within-group
/// variance with distinct means is maximal evidence, p = 0.
fn f_oneway(groups: &[Vec<f64>]) -> (f64, f64) {
    let n: usize = groups.iter().map(|g| g.len()).sum();
    let k = groups.len();
    let grand_mean = groups.iter().flatten().sum::<f64>() / n as f64;

    let mut ss_between = 0.0;
    let mut ss_within = 0.0;
    for group in groups {
        let mean = group.iter().sum::<f64>() / group.len() as f64;
        ss_between += group.len() as f64 * (mean - grand_mean).powi(2);
        ss_within += group.iter().map(|v| (v - mean).powi(2)).sum::<f64>();
    }

    let ss_total = ss_between + ss_within;
    let effect = if ss_total > 0.0 {
        ss_between / ss_total * 100.0
    } else {
        0.0
    };

    let df_between = (k - 1) as f64;
    let df_within = (n - k) as f64;
    if df_within <= 0.0 {
        return (1.0, effect);
    }
    if ss_within == 0.0 {
        // All groups internally constant: either no signal at all or an
        // infinite F statistic.
        return (if ss_between == 0.0 { 1.0 } else { 0.0 }, effect);
    }

    let f_stat = (ss_between / df_between) / (ss_within / df_within);
    let p_value = match FisherSnedecor::new(df_between, df_within) {
        Ok(dist) => 1.0 - dist.cdf(f_stat),
        Err(_) => 1.0,
    };
    let p_value = if p_value.is_nan() { 1.0 } else { p_value };
    (p_value, effect)
}

/// Test one variable: mask missing measurements, then F-test across the
/// groups that remain. Fewer than 2 distinct labels among kept samples
/// reports (1.0, 0.0) without attempting a test.
fn test_variable(data: &Data, j: usize) -> (f64, f64) {
    let mut kept: Vec<(i32, f64)> = Vec::with_capacity(data.sample_len);
    for i in 0..data.sample_len {
        let v = data.value(i, j);
        if !v.is_nan() {
            kept.push((data.y[i], v));
        }
    }

    let mut levels: Vec<i32> = kept.iter().map(|(label, _)| *label).collect();
    levels.sort_unstable();
    levels.dedup();
    if levels.len() < 2 {
        return (1.0, 0.0);
    }

    let groups: Vec<Vec<f64>> = levels
        .iter()
        .map(|&level| {
            kept.iter()
                .filter(|(label, _)| *label == level)
                .map(|(_, v)| *v)
                .collect()
        })
        .collect();

    f_oneway(&groups)
}

/// Linear-interpolated percentile of an ascending-sorted slice, q in 0..=100.
fn percentile(sorted: &[f64], q: f64) -> f64 {
    let n = sorted.len();
    if n == 1 {
        return sorted[0];
    }
    let pos = q / 100.0 * (n - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    if lo == hi {
        sorted[lo]
    } else {
        let frac = pos - lo as f64;
        sorted[lo] + (sorted[hi] - sorted[lo]) * frac
    }
}

fn boxplots_for_variable(data: &Data, j: usize) -> Vec<GroupBoxplot> {
    let mut plots = Vec::new();
    for level in data.class_levels() {
        let values: Vec<f64> = (0..data.sample_len)
            .filter(|&i| data.y[i] == level)
            .map(|i| data.value(i, j))
            .filter(|v| !v.is_nan())
            .collect();
        if values.is_empty() {
            continue;
        }
        let group = format!("Group {}", level);
        if values.len() == 1 {
            let v = values[0];
            plots.push(GroupBoxplot {
                group,
                min: v,
                q1: v,
                median: v,
                q3: v,
                max: v,
                values,
            });
            continue;
        }

        let mut sorted = values.clone();
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap());
        let q1 = percentile(&sorted, 25.0);
        let median = percentile(&sorted, 50.0);
        let q3 = percentile(&sorted, 75.0);
        let iqr = q3 - q1;
        // Whisker bounds exclude outliers but the raw values keep them.
        let lower = sorted[0].max(q1 - 1.5 * iqr);
        let upper = sorted[sorted.len() - 1].min(q3 + 1.5 * iqr);

        plots.push(GroupBoxplot {
            group,
            min: lower,
            q1,
            median,
            q3,
            max: upper,
            values,
        });
    }
    plots
}

fn select_significant(
    results: &[VariableStats],
    mode: u8,
    fdr_threshold: f64,
) -> Vec<usize> {
    match mode {
        0 => Vec::new(),
        1 => results
            .iter()
            .enumerate()
            .filter(|(_, r)| r.p_value <= 0.05)
            .map(|(i, _)| i)
            .collect(),
        2 => results
            .iter()
            .enumerate()
            .filter(|(_, r)| r.bonferroni <= fdr_threshold)
            .map(|(i, _)| i)
            .collect(),
        3 => results
            .iter()
            .enumerate()
            .filter(|(_, r)| r.benjamini)
            .map(|(i, _)| i)
            .collect(),
        _ => (0..results.len()).collect(),
    }
}

/// Per-variable One-Way ANOVA with Bonferroni and Benjamini-Hochberg
/// correction, plus boxplot summaries for the selected variables.
pub fn anova(data: &Data, param: &Param) -> AnovaResult {
    let fdr_threshold = param.anova.fdr_threshold;
    info!(
        "Running ANOVA on {} samples x {} variables ({} design)",
        data.sample_len, data.feature_len, param.anova.design_label
    );

    let pool = ThreadPoolBuilder::new()
        .num_threads(param.general.thread_number)
        .build()
        .unwrap();
    let tested: Vec<(f64, f64)> = pool.install(|| {
        (0..data.feature_len)
            .into_par_iter()
            .map(|j| test_variable(data, j))
            .collect()
    });

    let p_values: Vec<f64> = tested.iter().map(|(p, _)| *p).collect();
    let correction: Correction = correction::correct(&p_values, fdr_threshold);

    let results: Vec<VariableStats> = (0..data.feature_len)
        .map(|j| VariableStats {
            variable: data
                .features
                .get(j)
                .cloned()
                .unwrap_or_else(|| format!("Variable_{}", j + 1)),
            p_value: p_values[j],
            fdr: correction.bh_adjusted[j],
            bonferroni: correction.bonferroni_adjusted[j],
            benjamini: correction.bh_significant[j],
            effect_size: tested[j].1,
        })
        .collect();

    let significant_variables =
        select_significant(&results, param.anova.significance_mode, fdr_threshold);

    // Only the first 4 selected variables get boxplot summaries.
    let boxplot_data: Vec<Vec<GroupBoxplot>> = significant_variables
        .iter()
        .take(4)
        .map(|&j| boxplots_for_variable(data, j))
        .collect();

    let summary = AnovaSummary {
        total_variables: data.feature_len,
        benjamini_significant: correction.bh_count(),
        bonferroni_significant: correction.bonferroni_count(),
        nominal_significant: p_values.iter().filter(|&&p| p <= 0.05).count(),
        fdr_threshold,
        design_label: param.anova.design_label.clone(),
    };
    info!(
        "ANOVA: {} Benjamini significant variables",
        summary.benjamini_significant
    );

    AnovaResult {
        results,
        significant_variables,
        boxplot_data,
        summary,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::param::Param;

    /// 3 groups of 10 samples; group 2 is shifted by a large constant on
    /// every variable.
    fn shifted_data(n_vars: usize) -> Data {
        let sample_len = 30;
        let mut x = Vec::with_capacity(sample_len * n_vars);
        let mut y = Vec::with_capacity(sample_len);
        for i in 0..sample_len {
            let group = (i / 10) as i32 + 1;
            y.push(group);
            for j in 0..n_vars {
                let noise = ((i * 7 + j * 3) % 5) as f64 * 0.1;
                let shift = if group == 2 { 100.0 } else { 0.0 };
                x.push(noise + shift);
            }
        }
        Data {
            X: x,
            y,
            features: (0..n_vars).map(|j| format!("Variable_{}", j + 1)).collect(),
            feature_len: n_vars,
            sample_len,
            class_column: Some("Group".to_string()),
        }
    }

    fn small_data(x: Vec<f64>, y: Vec<i32>, n_vars: usize) -> Data {
        let sample_len = y.len();
        Data {
            X: x,
            y,
            features: (0..n_vars).map(|j| format!("Variable_{}", j + 1)).collect(),
            feature_len: n_vars,
            sample_len,
            class_column: None,
        }
    }

    #[test]
    fn test_shifted_groups_all_significant() {
        let data = shifted_data(5);
        let param = Param::default();
        let result = anova(&data, &param);
        assert_eq!(result.summary.total_variables, 5);
        assert_eq!(
            result.summary.benjamini_significant, 5,
            "a 100-unit shift must make every variable BH-significant"
        );
        assert_eq!(result.summary.bonferroni_significant, 5);
        assert_eq!(result.summary.nominal_significant, 5);
        assert!(result.results.iter().all(|r| r.benjamini));
        assert!(result.results.iter().all(|r| r.effect_size > 90.0));
    }

    #[test]
    fn test_boxplots_capped_at_four() {
        let data = shifted_data(6);
        let param = Param::default(); // significance_mode 3
        let result = anova(&data, &param);
        assert_eq!(result.significant_variables.len(), 6);
        assert_eq!(
            result.boxplot_data.len(),
            4,
            "only the first 4 selected variables get boxplot summaries"
        );
        assert_eq!(result.boxplot_data[0].len(), 3, "one boxplot per group");
        assert_eq!(result.boxplot_data[0][0].group, "Group 1");
    }

    #[test]
    fn test_single_group_after_masking_is_not_an_error() {
        // Variable 0 is only measured for group 1, variable 1 everywhere.
        let x = vec![
            1.0, 5.0, //
            2.0, 6.0, //
            f64::NAN, 7.0, //
            f64::NAN, 8.0,
        ];
        let data = small_data(x, vec![1, 1, 2, 2], 2);
        let param = Param::default();
        let result = anova(&data, &param);
        assert_eq!(result.results[0].p_value, 1.0, "degenerate variable reports p=1");
        assert_eq!(result.results[0].effect_size, 0.0);
    }

    #[test]
    fn test_constant_variable_reports_p_one() {
        let x = vec![3.0, 1.0, 3.0, 2.0, 3.0, 3.0, 3.0, 4.0];
        let data = small_data(x, vec![1, 1, 2, 2], 2);
        let param = Param::default();
        let result = anova(&data, &param);
        assert_eq!(
            result.results[0].p_value, 1.0,
            "zero total variance must fall back to p=1, never NaN"
        );
        assert_eq!(result.results[0].effect_size, 0.0);
    }

    #[test]
    fn test_bonferroni_adjusted_is_uncapped() {
        let x = vec![
            1.0, 1.2, 9.0, //
            2.0, 1.1, 9.1, //
            1.5, 1.3, 8.9, //
            1.8, 1.15, 9.05, //
            1.2, 1.25, 8.95, //
            1.9, 1.12, 9.02,
        ];
        let data = small_data(x, vec![1, 1, 1, 2, 2, 2], 3);
        let param = Param::default();
        let result = anova(&data, &param);
        for r in &result.results {
            assert!(
                (r.bonferroni - r.p_value * 3.0).abs() < 1e-12,
                "bonferroni field is raw p times the family size, uncapped"
            );
        }
    }

    #[test]
    fn test_significance_mode_selection() {
        let data = shifted_data(3);
        let mut param = Param::default();

        param.anova.significance_mode = 0;
        assert!(anova(&data, &param).significant_variables.is_empty());
        assert!(anova(&data, &param).boxplot_data.is_empty());

        param.anova.significance_mode = 4;
        let result = anova(&data, &param);
        assert_eq!(
            result.significant_variables,
            vec![0, 1, 2],
            "mode 4 selects every variable"
        );
    }

    #[test]
    fn test_boxplot_single_value_group() {
        let x = vec![
            5.0, 1.0, //
            f64::NAN, 2.0, //
            3.0, 3.0, //
            4.0, 4.0, //
            2.0, 5.0, //
            6.0, 6.0,
        ];
        let data = small_data(x, vec![1, 1, 2, 2, 2, 2], 2);
        let plots = boxplots_for_variable(&data, 0);
        let g1 = &plots[0];
        assert_eq!(g1.group, "Group 1");
        assert_eq!(
            (g1.min, g1.q1, g1.median, g1.q3, g1.max),
            (5.0, 5.0, 5.0, 5.0, 5.0),
            "a single-valued group repeats that value for all five statistics"
        );
        assert_eq!(g1.values, vec![5.0]);
    }

    #[test]
    fn test_whisker_bounds_within_true_extremes() {
        // 100.0 is an outlier: the upper whisker must stop short of it while
        // the raw values still include it.
        let x: Vec<f64> = vec![1.0, 2.0, 3.0, 4.0, 5.0, 100.0]
            .into_iter()
            .flat_map(|v| [v, 0.0])
            .collect();
        let data = small_data(x, vec![1; 6], 2);
        let plots = boxplots_for_variable(&data, 0);
        let g = &plots[0];
        assert!(g.min >= 1.0, "lower whisker never exceeds the true minimum");
        assert!(g.max <= 100.0, "upper whisker never exceeds the true maximum");
        assert!(g.max < 100.0, "the outlier is excluded from the whisker bound");
        assert!(g.values.contains(&100.0), "raw values keep the outlier");
        assert!(g.q1 <= g.median && g.median <= g.q3);
    }

    #[test]
    fn test_quartiles_interpolated() {
        let x: Vec<f64> = vec![1.0, 2.0, 3.0, 4.0]
            .into_iter()
            .flat_map(|v| [v, 0.0])
            .collect();
        let data = small_data(x, vec![1; 4], 2);
        let plots = boxplots_for_variable(&data, 0);
        let g = &plots[0];
        assert!((g.q1 - 1.75).abs() < 1e-12, "25th percentile interpolates");
        assert!((g.median - 2.5).abs() < 1e-12);
        assert!((g.q3 - 3.25).abs() < 1e-12);
    }

    #[test]
    fn test_missing_values_masked_per_variable() {
        // The NaN in variable 0 must not remove the sample from variable 1.
        let x = vec![
            f64::NAN, 1.0, //
            2.0, 2.0, //
            3.0, 30.0, //
            4.0, 31.0, //
            5.0, 1.5, //
            6.0, 30.5,
        ];
        let data = small_data(x, vec![1, 1, 2, 2, 1, 2], 2);
        let param = Param::default();
        let result = anova(&data, &param);
        assert!(
            result.results[1].p_value < 0.05,
            "variable 1 keeps all six samples and separates its groups"
        );
    }
}
