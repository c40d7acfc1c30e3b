#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! Report synthesis.
//!
//! Four artifacts come out of a finished run: one feedback file per
//! student, the class summary, the gradebook CSV and, when anybody was
//! flagged, the integrity report. Each one is rendered to a string first
//! and written afterwards, and a failure writing one is recorded in the
//! [`ReportSummary`] without stopping the rest.

/// Gradebook export.
pub mod csv;
/// Per-student feedback files.
pub mod feedback;
/// Report for flagged submissions.
pub mod integrity;
/// Class statistics and tables.
pub mod summary;

use std::{
    fmt,
    fs::{self, File, OpenOptions},
    path::{Path, PathBuf},
};

use chrono::{DateTime, Local};
use thiserror::Error;

use crate::{
    config::Config,
    constants::{CSV_FILE, INTEGRITY_FILE, LOG_FILE, SUMMARY_FILE},
    grade::GradingResult,
};

pub use self::{
    csv::render_csv,
    feedback::{feedback_file_name, render_feedback},
    integrity::render_integrity,
    summary::{ClassSummary, render_summary, results_table},
};

/// Failures writing one artifact.
#[derive(Error, Debug)]
pub enum ReportError {
    /// The output directory could not be created.
    #[error("could not create directory {}: {source}", path.display())]
    CreateDir {
        /// Directory we tried to create.
        path:   PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// The file could not be written.
    #[error("could not write {}: {source}", path.display())]
    Write {
        /// File we tried to write.
        path:   PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

/// Which artifact a [`ReportError`] belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Artifact {
    /// Feedback for the given student id.
    Feedback(String),
    /// The class summary.
    Summary,
    /// The gradebook CSV.
    Csv,
    /// The integrity report.
    Integrity,
}

impl fmt::Display for Artifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Artifact::Feedback(id) => write!(f, "feedback for {id}"),
            Artifact::Summary => f.write_str("class summary"),
            Artifact::Csv => f.write_str("CSV export"),
            Artifact::Integrity => f.write_str("integrity report"),
        }
    }
}

/// What a synthesis pass wrote and what it could not.
#[derive(Debug, Default)]
pub struct ReportSummary {
    /// Files written, in the order they were written.
    pub written:  Vec<PathBuf>,
    /// Artifacts that failed, with the reason.
    pub failures: Vec<(Artifact, ReportError)>,
}

impl ReportSummary {
    /// Whether every attempted artifact was written.
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    /// Records the outcome of one artifact.
    fn record(&mut self, artifact: Artifact, outcome: Result<PathBuf, ReportError>) {
        match outcome {
            Ok(path) => {
                tracing::debug!("Wrote {}", path.display());
                self.written.push(path);
            }
            Err(e) => {
                tracing::error!("Failed to write {artifact}: {e}");
                self.failures.push((artifact, e));
            }
        }
    }
}

/// Writes `contents` to `path`, creating parent directories on demand.
fn write_file(path: &Path, contents: &str) -> Result<PathBuf, ReportError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|source| ReportError::CreateDir {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    fs::write(path, contents).map_err(|source| ReportError::Write {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(path.to_path_buf())
}

/// Opens `<results_dir>/grading.log` for appending, creating it if needed.
///
/// Earlier runs' lines are kept.
pub fn open_run_log(results_dir: &Path) -> std::io::Result<File> {
    fs::create_dir_all(results_dir)?;
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(results_dir.join(LOG_FILE))
}

/// Deletes an artifact left behind by an earlier run.
fn remove_stale(path: &Path) {
    match fs::remove_file(path) {
        Ok(()) => tracing::info!("Removed stale {}", path.display()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => tracing::warn!("Could not remove stale {}: {e}", path.display()),
    }
}

/// Turns a finished result set into report files.
pub struct ReportSynthesizer<'a> {
    /// Run configuration; decides which artifacts are enabled and where
    /// they go.
    config:       &'a Config,
    /// Timestamp stamped on every artifact of this pass.
    generated_at: DateTime<Local>,
}

impl<'a> ReportSynthesizer<'a> {
    /// A synthesizer stamping artifacts with the current time.
    pub fn new(config: &'a Config) -> Self {
        Self::at(config, Local::now())
    }

    /// A synthesizer stamping artifacts with `generated_at`.
    pub fn at(config: &'a Config, generated_at: DateTime<Local>) -> Self {
        Self {
            config,
            generated_at,
        }
    }

    /// Writes every enabled artifact for `results`.
    pub fn write_all(&self, results: &[GradingResult]) -> ReportSummary {
        let output = &self.config.output;
        let mut summary = ReportSummary::default();

        if output.individual_feedback {
            for result in results {
                let path = output.reports_dir.join(feedback_file_name(&result.student_id));
                let body = render_feedback(result, self.generated_at);
                summary.record(
                    Artifact::Feedback(result.student_id.clone()),
                    write_file(&path, &body),
                );
            }
        }

        if output.summary_report {
            let body = render_summary(self.config, results, self.generated_at);
            summary.record(
                Artifact::Summary,
                write_file(&output.reports_dir.join(SUMMARY_FILE), &body),
            );
        }

        if output.csv_export {
            let body = render_csv(results);
            summary.record(
                Artifact::Csv,
                write_file(&output.results_dir.join(CSV_FILE), &body),
            );
        }

        let integrity_path = output.reports_dir.join(INTEGRITY_FILE);
        match render_integrity(self.config, results, self.generated_at) {
            Some(body) => summary.record(Artifact::Integrity, write_file(&integrity_path, &body)),
            None => {
                tracing::info!("No academic integrity alerts; integrity report skipped");
                remove_stale(&integrity_path);
            }
        }

        tracing::info!(
            "Reports generated: {} written, {} failed",
            summary.written.len(),
            summary.failures.len()
        );
        summary
    }
}
