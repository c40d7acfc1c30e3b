#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! # gradebatch
//!
//! Grades a directory of student submissions.
//!
//! ```text
//! gradebatch [--config PATH] [--debug] SUBMISSIONS_DIR
//! ```
//!
//! Each immediate subdirectory of `SUBMISSIONS_DIR` containing source files
//! is one submission. Reports land in the configured `reports_dir` and
//! `results_dir`; a run log is written to `<results_dir>/grading.log`.

use std::{
    path::PathBuf,
    sync::{Arc, Mutex},
};

use anyhow::Result;
use bpaf::*;
use colored::Colorize;
use dotenvy::dotenv;
use gradebatch::{
    RunReport,
    config::{self, Config},
    constants::LOG_FILE,
    report::{open_run_log, results_table},
    run_pipeline,
};
use tracing::{Level, metadata::LevelFilter};
use tracing_subscriber::{fmt, prelude::*, util::SubscriberInitExt};

/// Parsed command line.
#[derive(Debug, Clone)]
struct Options {
    /// JSON configuration overrides.
    config:      Option<PathBuf>,
    /// Log at DEBUG instead of INFO.
    debug:       bool,
    /// Directory holding one subdirectory per student.
    submissions: PathBuf,
}

/// Parse the command line arguments and return the `Options`
fn options() -> Options {
    let config = long("config")
        .short('c')
        .help("Path to a JSON configuration file")
        .argument::<PathBuf>("PATH")
        .optional();
    let debug = long("debug")
        .short('d')
        .help("Enable debug logging")
        .switch();
    let submissions = positional::<PathBuf>("SUBMISSIONS_DIR")
        .help("Directory containing one subdirectory per submission");

    construct!(Options {
        config,
        debug,
        submissions
    })
    .to_options()
    .descr("Batch grader with AI-content detection")
    .run()
}

/// Whether `GRADEBATCH_DEBUG` asks for debug logging.
fn debug_from_env() -> bool {
    std::env::var("GRADEBATCH_DEBUG")
        .map(|v| matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
        .unwrap_or(false)
}

/// Installs the console layer and, when the results directory is usable,
/// a plain-text log file layer.
fn init_tracing(config: &Config, debug: bool) {
    let level = if debug { Level::DEBUG } else { Level::INFO };

    let console = fmt::layer()
        .without_time()
        .with_file(false)
        .with_line_number(false);

    let log_path = config.output.results_dir.join(LOG_FILE);
    let log_file = open_run_log(&config.output.results_dir)
        .map_err(|e| eprintln!("Could not open {}: {e}", log_path.display()))
        .ok();
    let file_layer = log_file.map(|file| {
        fmt::layer()
            .with_writer(Mutex::new(file))
            .with_ansi(false)
    });

    tracing_subscriber::registry()
        .with(console)
        .with(file_layer)
        .with(LevelFilter::from_level(level))
        .init();
}

/// Prints the results table and a one-paragraph summary.
fn print_summary(run: &RunReport) {
    println!("{}", results_table(&run.results));

    let flagged = run.results.iter().filter(|r| r.integrity_flag).count();
    let reviews = run
        .results
        .iter()
        .filter(|r| r.requires_manual_review)
        .count();

    println!(
        "{} {} graded ({} failed)",
        "Done:".bold().green(),
        run.results.len(),
        run.failed
    );
    if flagged > 0 {
        println!(
            "{} {flagged} flagged for academic integrity review",
            "Alert:".bold().red()
        );
    }
    if reviews > 0 {
        println!("{} {reviews} require manual review", "Review:".bold().yellow());
    }
    for (artifact, e) in &run.reports.failures {
        println!("{} {artifact}: {e}", "Report failed:".bold().red());
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();

    let opts = options();
    let (config, origin) = config::resolve(opts.config.as_deref());
    init_tracing(&config, opts.debug || debug_from_env());
    origin.log();

    let run = run_pipeline(&opts.submissions, Arc::new(config)).await?;
    tracing::info!(
        "Run {} finished: {} completed, {} failed",
        run.run_id,
        run.completed,
        run.failed
    );
    print_summary(&run);

    Ok(())
}
