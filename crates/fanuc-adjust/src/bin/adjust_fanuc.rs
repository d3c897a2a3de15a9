//! Command-line front end: apply the quadrupole correction to plFanuc drill files.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use log::{error, info, warn, LevelFilter};

use fanuc_adjust::config::{load_model, AdjustConfig};
use fanuc_adjust::discover::collect_drill_files;
use fanuc_adjust::processor::process_files;
use fanuc_adjust::report::LogSink;
use fanuc_adjust::VERSION;

/// Command line argument structure
#[derive(Parser, Debug)]
#[command(
    name = "adjust-fanuc",
    version,
    about = "Apply the quadrupole correction to plFanuc drill files",
    long_about = "Writes <name>Adjusted.txt next to each drill file, with every
G60 X.. Y.. position corrected for the drilling machine's quadrupole error.
Files already adjusted, or whose output already exists, are skipped."
)]
struct Args {
    /// Drill files, or directories whose pl*Fanuc*.par files are adjusted
    #[arg(required = true)]
    paths: Vec<PathBuf>,

    /// Configuration file (default: ~/.adjustFanucFiles.dat)
    #[arg(long = "config")]
    config: Option<PathBuf>,

    /// Set logging level (default: info)
    #[arg(long = "log-level", default_value = "info")]
    log_level: LevelFilter,
}

fn main() -> ExitCode {
    let args = Args::parse();

    env_logger::Builder::new()
        .filter_level(args.log_level)
        .format_target(false)
        .init();

    info!("Adjust Fanuc Files version {VERSION}");

    let config_path = match args.config.map_or_else(AdjustConfig::default_path, Ok) {
        Ok(path) => path,
        Err(err) => {
            error!("{err}");
            return ExitCode::from(2);
        }
    };

    let model = match load_model(&config_path) {
        Ok(model) => model,
        Err(err) => {
            error!("Error reading {}: {err}", config_path.display());
            error!("Please fix the config file and try again");
            return ExitCode::from(2);
        }
    };
    let (magnitude, angle) = model.magnitude_angle();
    info!("Config file: {}", config_path.display());
    info!("Quadrupole magnitude = {magnitude}, angle = {angle} deg");

    let files = match collect_drill_files(&args.paths) {
        Ok(files) => files,
        Err(err) => {
            error!("{err}");
            return ExitCode::FAILURE;
        }
    };
    if files.is_empty() {
        warn!("No drill files found");
        return ExitCode::SUCCESS;
    }

    let summary = match process_files(Some(&model), &files, Some(&LogSink)) {
        Ok(summary) => summary,
        Err(err) => {
            error!("{err}");
            return ExitCode::FAILURE;
        }
    };
    info!(
        "Done: {} adjusted, {} skipped, {} failed",
        summary.adjusted.len(),
        summary.skipped.len(),
        summary.failed.len()
    );

    if summary.has_failures() {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
