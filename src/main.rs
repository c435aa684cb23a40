use flexi_logger::{Duplicate, FileSpec, Logger, LoggerHandle};
use genepair_llr::param::{self, Param};
use genepair_llr::run;
use log::{error, info};
use std::error::Error;
use std::process;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

fn start_logger(param: &Param) -> Result<LoggerHandle, Box<dyn Error>> {
    let logger = Logger::try_with_env_or_str(&param.general.log_level)?;
    let handle = if param.general.log_base.is_empty() {
        logger.start()?
    } else {
        logger
            .log_to_file(FileSpec::default().basename(&param.general.log_base).suffix(&param.general.log_suffix))
            .duplicate_to_stderr(Duplicate::Warn)
            .format_for_files(flexi_logger::detailed_format)
            .start()?
    };
    Ok(handle)
}

fn main() {
    let param_file = std::env::args().nth(1).unwrap_or_else(|| "param.yaml".to_string());

    let param = match param::get(param_file.clone()) {
        Ok(param) => param,
        Err(e) => {
            eprintln!("Cannot read parameters from {}: {}", param_file, e);
            process::exit(2);
        }
    };

    let _logger = match start_logger(&param) {
        Ok(handle) => handle,
        Err(e) => {
            eprintln!("Cannot start logger: {}", e);
            process::exit(2);
        }
    };
    info!("genepair-llr {} with {}", genepair_llr::version(), param_file);

    // Ctrl-C lets running surfaces finish and skips the remaining ones
    let interrupted = Arc::new(AtomicBool::new(false));
    if let Err(e) = signal_hook::flag::register(signal_hook::consts::SIGINT, Arc::clone(&interrupted)) {
        error!("Cannot install the interrupt handler: {}", e);
    }

    let report = match run(&param, interrupted) {
        Ok(report) => report,
        Err(e) => {
            error!("{}", e);
            process::exit(1);
        }
    };

    println!("{}", report.display_results());

    if !param.general.save_report.is_empty() {
        match report.save_auto(&param.general.save_report) {
            Ok(()) => info!("Report saved to {}", param.general.save_report),
            Err(e) => {
                error!("Cannot save report to {}: {}", param.general.save_report, e);
                process::exit(1);
            }
        }
    }
}
