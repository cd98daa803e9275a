use crate::error::AnalysisError;
use crate::scale::ScalingMethod;
use log::warn;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fs::File;
use std::io::BufReader;

// Field definitions and associated default values

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Param {
    #[serde(default)]
    pub general: General,
    #[serde(default)]
    pub data: Data,
    #[serde(default)]
    pub anova: Anova,
    #[serde(default)]
    pub pca: Pca,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct General {
    /// Which analyses to run: "anova", "pca" or "both".
    #[serde(default = "algorithm_default")]
    pub algo: String,
    #[serde(default = "one_default")]
    pub thread_number: usize,
    #[serde(default = "empty_string")]
    pub log_base: String,
    #[serde(default = "log_suffix_default")]
    pub log_suffix: String,
    #[serde(default = "log_level_default")]
    pub log_level: String,
    /// Report output path; empty writes the report to stdout.
    #[serde(default = "empty_string")]
    pub save_report: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Data {
    /// Input table (.csv comma-separated, .tsv/.txt tab-separated).
    #[serde(default = "empty_string")]
    pub path: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Anova {
    #[serde(default = "fdr_threshold_default")]
    pub fdr_threshold: f64,
    #[serde(default = "design_label_default")]
    pub design_label: String,
    /// 0 none, 1 nominal p, 2 Bonferroni, 3 Benjamini-Hochberg, 4 all.
    #[serde(default = "significance_mode_default")]
    pub significance_mode: u8,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Pca {
    #[serde(default = "num_components_default")]
    pub num_components: usize,
    #[serde(default = "scaling_method_default")]
    pub scaling_method: ScalingMethod,
    #[serde(default = "design_label_default")]
    pub design_label: String,
}

// Default section definitions

impl Default for General {
    fn default() -> Self {
        serde_json::from_value(serde_json::json!({})).unwrap()
    }
}

impl Default for Data {
    fn default() -> Self {
        serde_json::from_value(serde_json::json!({})).unwrap()
    }
}

impl Default for Anova {
    fn default() -> Self {
        serde_json::from_value(serde_json::json!({})).unwrap()
    }
}

impl Default for Pca {
    fn default() -> Self {
        serde_json::from_value(serde_json::json!({})).unwrap()
    }
}

impl Default for Param {
    fn default() -> Self {
        serde_json::from_value(serde_json::json!({})).unwrap()
    }
}

impl Param {
    pub fn new() -> Self {
        Self::default()
    }
}

pub fn get(param_file: String) -> Result<Param, Box<dyn Error>> {
    let param_file_reader = File::open(param_file)?;
    let param_reader = BufReader::new(param_file_reader);

    let mut config: Param = serde_yaml::from_reader(param_reader)?;

    validate(&mut config).map_err(AnalysisError::InvalidParameter)?;

    Ok(config)
}

pub fn validate(param: &mut Param) -> Result<(), String> {
    match param.general.algo.as_str() {
        "anova" | "pca" | "both" => {}
        other => {
            return Err(format!(
                "Unknown algo '{}'. Must be one of anova, pca, both.",
                other
            ))
        }
    }

    if param.anova.significance_mode > 4 {
        return Err(format!(
            "Invalid significance_mode={}. Must be in range 0-4.",
            param.anova.significance_mode
        ));
    }

    if !(param.anova.fdr_threshold > 0.0 && param.anova.fdr_threshold < 1.0) {
        return Err(format!(
            "Invalid fdr_threshold={:.3}. Must be in range (0, 1).",
            param.anova.fdr_threshold
        ));
    }

    if param.pca.num_components == 0 {
        return Err("Invalid num_components=0. Must be >= 1.".to_string());
    }
    if param.pca.num_components > 10 {
        warn!(
            "num_components={} exceeds the maximum of 10 and will be clamped.",
            param.pca.num_components
        );
    }

    Ok(())
}

// Default value definitions

fn algorithm_default() -> String {
    "both".to_string()
}
fn empty_string() -> String {
    "".to_string()
}
fn log_suffix_default() -> String {
    "log".to_string()
}
fn log_level_default() -> String {
    "info".to_string()
}
fn one_default() -> usize {
    1
}
fn fdr_threshold_default() -> f64 {
    0.05
}
fn design_label_default() -> String {
    "Treatment".to_string()
}
fn significance_mode_default() -> u8 {
    3
}
fn num_components_default() -> usize {
    3
}
fn scaling_method_default() -> ScalingMethod {
    ScalingMethod::auto
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let param = Param::default();
        assert_eq!(param.anova.fdr_threshold, 0.05);
        assert_eq!(param.anova.significance_mode, 3);
        assert_eq!(param.anova.design_label, "Treatment");
        assert_eq!(param.pca.num_components, 3);
        assert_eq!(param.pca.scaling_method, ScalingMethod::auto);
        assert_eq!(param.general.algo, "both");
        assert_eq!(param.general.thread_number, 1);
    }

    #[test]
    fn test_yaml_partial_override() {
        let yaml = "anova:\n  fdr_threshold: 0.01\npca:\n  scaling_method: pareto\n";
        let param: Param = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(param.anova.fdr_threshold, 0.01);
        assert_eq!(param.pca.scaling_method, ScalingMethod::pareto);
        assert_eq!(
            param.anova.significance_mode, 3,
            "unset fields keep their defaults"
        );
    }

    #[test]
    fn test_unknown_scaling_method_rejected() {
        let yaml = "pca:\n  scaling_method: range\n";
        assert!(
            serde_yaml::from_str::<Param>(yaml).is_err(),
            "an unknown scaling method must fail to deserialize"
        );
    }

    #[test]
    fn test_validate_significance_mode_range() {
        let mut param = Param::default();
        param.anova.significance_mode = 5;
        let err = validate(&mut param).unwrap_err();
        assert!(err.contains("significance_mode"), "got: {}", err);
    }

    #[test]
    fn test_validate_algo() {
        let mut param = Param::default();
        param.general.algo = "tsne".to_string();
        assert!(validate(&mut param).is_err());
        param.general.algo = "pca".to_string();
        assert!(validate(&mut param).is_ok());
    }

    #[test]
    fn test_get_surfaces_typed_parameter_error() {
        let dir = std::env::temp_dir().join("omicstat_param_test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("bad_mode.yaml");
        std::fs::write(&path, "anova:\n  significance_mode: 7\n").unwrap();

        let err = get(path.to_str().unwrap().to_string()).unwrap_err();
        match err.downcast_ref::<AnalysisError>() {
            Some(AnalysisError::InvalidParameter(msg)) => {
                assert!(msg.contains("significance_mode"), "got: {}", msg)
            }
            other => panic!("expected InvalidParameter, got {:?}", other),
        }
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_validate_fdr_threshold() {
        let mut param = Param::default();
        param.anova.fdr_threshold = 0.0;
        assert!(validate(&mut param).is_err());
        param.anova.fdr_threshold = 1.5;
        assert!(validate(&mut param).is_err());
    }
}
