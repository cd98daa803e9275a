use flexi_logger::{Duplicate, FileSpec, Logger};
use log::{error, info};
use omicstat::param;
use omicstat::run;
use std::env;
use std::process::exit;

fn main() {
    let param_file = env::args().nth(1).unwrap_or_else(|| "param.yaml".to_string());

    let param = match param::get(param_file.clone()) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("Cannot load parameter file [{}]: {}", param_file, e);
            exit(1);
        }
    };

    let logger = if param.general.log_base.is_empty() {
        Logger::try_with_env_or_str(&param.general.log_level)
            .unwrap()
            .start()
    } else {
        Logger::try_with_env_or_str(&param.general.log_level)
            .unwrap()
            .log_to_file(
                FileSpec::default()
                    .basename(&param.general.log_base)
                    .suffix(&param.general.log_suffix),
            )
            .duplicate_to_stderr(Duplicate::All)
            .start()
    };
    if let Err(e) = logger {
        eprintln!("Cannot start logger: {}", e);
        exit(1);
    }

    info!("omicstat v{}", env!("CARGO_PKG_VERSION"));

    match run(&param) {
        Ok(report) => {
            if param.general.save_report.is_empty() {
                match serde_json::to_string_pretty(&report) {
                    Ok(json) => println!("{}", json),
                    Err(e) => {
                        error!("Cannot serialize report: {}", e);
                        exit(1);
                    }
                }
            } else if let Err(e) = report.save_json(&param.general.save_report) {
                error!("Cannot save report to [{}]: {}", param.general.save_report, e);
                exit(1);
            } else {
                info!("Report saved to {}", param.general.save_report);
            }
        }
        Err(e) => {
            error!("Analysis failed: {}", e);
            exit(1);
        }
    }
}
