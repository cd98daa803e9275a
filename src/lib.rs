#![allow(non_snake_case)]

pub mod anova;
pub mod correction;
pub mod data;
pub mod detect;
pub mod error;
pub mod param;
pub mod pca;
pub mod report;
pub mod scale;
pub mod table;

use crate::data::Data;
use crate::param::Param;
use crate::report::Report;
use crate::table::Table;
use chrono::Local;
use log::info;
use std::error::Error;

/// Run the analyses selected by `param.general.algo` over the table at
/// `param.data.path` and assemble the report.
pub fn run(param: &Param) -> Result<Report, Box<dyn Error>> {
    let start = std::time::Instant::now();
    let timestamp = Local::now().format("%Y-%m-%d_%H-%M-%S").to_string();

    let table = Table::from_path(&param.data.path)?;
    let data = Data::from_table(&table)?;
    info!("{:?}", data);

    let anova_result = if param.general.algo == "anova" || param.general.algo == "both" {
        Some(anova::anova(&data, param))
    } else {
        None
    };
    let pca_result = if param.general.algo == "pca" || param.general.algo == "both" {
        Some(pca::pca(&data, param))
    } else {
        None
    };

    let report_stem = if param.general.save_report.is_empty() {
        "report"
    } else {
        param
            .general
            .save_report
            .split('.')
            .next()
            .unwrap_or("report")
    };

    let report = Report {
        id: format!("{}_{}_{}", report_stem, param.general.algo, timestamp),
        omicstat_version: report::version_string(),
        timestamp,
        execution_time: start.elapsed().as_secs_f64(),
        parameters: param.clone(),
        anova: anova_result,
        pca: pca_result,
    };

    info!("Analysis completed in {:.2}s", report.execution_time);
    Ok(report)
}
