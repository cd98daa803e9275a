use crate::anova::AnovaResult;
use crate::param::Param;
use crate::pca::PcaResult;
use serde::Serialize;
use std::error::Error;
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Full output graph of one analysis run. Owned by the run that produced
/// it; nothing here is shared across invocations.
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub id: String,
    pub omicstat_version: String,
    pub timestamp: String,
    pub execution_time: f64,
    pub parameters: Param,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub anova: Option<AnovaResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pca: Option<PcaResult>,
}

/// Crate version, suffixed with the git short SHA when the build had one.
pub fn version_string() -> String {
    match option_env!("OMICSTAT_GIT_SHA") {
        Some(sha) => format!("{}#{}", env!("CARGO_PKG_VERSION"), sha),
        None => env!("CARGO_PKG_VERSION").to_string(),
    }
}

impl Report {
    pub fn save_json<P: AsRef<Path>>(&self, path: P) -> Result<(), Box<dyn Error>> {
        let json = serde_json::to_string_pretty(self)?;
        let mut file = File::create(path)?;
        file.write_all(json.as_bytes())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::anova::anova;
    use crate::data::Data;

    fn tiny_data() -> Data {
        Data {
            X: vec![1.0, 5.0, 2.0, 6.0, 8.0, 1.0, 9.0, 2.0, 8.5, 1.5, 9.5, 2.5],
            y: vec![1, 1, 2, 2, 2, 2],
            features: vec!["m1".to_string(), "m2".to_string()],
            feature_len: 2,
            sample_len: 6,
            class_column: Some("Group".to_string()),
        }
    }

    #[test]
    fn test_report_round_trips_through_json() {
        let param = Param::default();
        let report = Report {
            id: "demo_anova_2024-01-01_00-00-00".to_string(),
            omicstat_version: version_string(),
            timestamp: "2024-01-01_00-00-00".to_string(),
            execution_time: 0.01,
            parameters: param.clone(),
            anova: Some(anova(&tiny_data(), &param)),
            pca: None,
        };
        let json = serde_json::to_value(&report).unwrap();
        assert!(json.get("pca").is_none(), "absent analyses are omitted");
        assert_eq!(
            json["anova"]["summary"]["total_variables"], 2,
            "nested analysis output serializes with its wire names"
        );
        assert!(json["anova"]["results"][0].get("pValue").is_some());
    }

    #[test]
    fn test_save_json_writes_file() {
        let dir = std::env::temp_dir().join("omicstat_report_test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("report.json");

        let report = Report {
            id: "t".to_string(),
            omicstat_version: version_string(),
            timestamp: "t".to_string(),
            execution_time: 0.0,
            parameters: Param::default(),
            anova: None,
            pca: None,
        };
        report.save_json(&path).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("\"id\""));
        std::fs::remove_file(&path).unwrap();
    }
}
