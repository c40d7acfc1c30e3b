//! # gradebatch
//!
//! Batch grader for programming assignments. Every submission directory is
//! run through an external AI-content detector and a weighted rubric, and
//! the results come out as per-student feedback, a class summary, a
//! gradebook CSV and an integrity report for flagged work.

#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

/// Layered configuration: defaults, JSON overrides, validation
pub mod config;
/// A module defining a bunch of constant values to be used throughout
pub mod constants;
/// Invoking the external detector and reading its verdict
pub mod detection;
/// Finding submission directories
pub mod discovery;
/// For all things related to grading
pub mod grade;
/// Concurrent detection and grading of a batch
pub mod pipeline;
/// Running child processes with deadlines
pub mod process;
/// Writing feedback, summary, CSV and integrity artifacts
pub mod report;
/// Submission and detection types shared across modules
pub mod types;

use std::{path::Path, sync::Arc};

use anyhow::{Context, Result};
use config::Config;
use grade::GradingResult;
use pipeline::Pipeline;
use report::{ReportSummary, ReportSynthesizer};
use uuid::Uuid;

/// Everything a full run produced.
#[derive(Debug)]
pub struct RunReport {
    /// Identifier of the run.
    pub run_id:    Uuid,
    /// Results, sorted by student id.
    pub results:   Vec<GradingResult>,
    /// Submissions graded normally.
    pub completed: usize,
    /// Submissions that fell back to a failing result.
    pub failed:    usize,
    /// What the report pass wrote.
    pub reports:   ReportSummary,
}

/// Grades every submission under `root` with the default rubric and writes
/// the reports.
pub async fn run_pipeline(root: &Path, config: Arc<Config>) -> Result<RunReport> {
    run_with(&Pipeline::new(config), root).await
}

/// Grades every submission under `root` with `pipeline` and writes the
/// reports.
///
/// Fails only when discovery does; in that case nothing is written.
pub async fn run_with(pipeline: &Pipeline, root: &Path) -> Result<RunReport> {
    let mut outcome = pipeline
        .run(root)
        .await
        .with_context(|| format!("Could not grade submissions in {}", root.display()))?;

    outcome
        .results
        .sort_by(|a, b| a.student_id.cmp(&b.student_id));

    let reports = ReportSynthesizer::new(pipeline.config()).write_all(&outcome.results);

    Ok(RunReport {
        run_id: outcome.run_id,
        results: outcome.results,
        completed: outcome.completed,
        failed: outcome.failed,
        reports,
    })
}
