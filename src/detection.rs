#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! Adapter around the external AI-content detector.
//!
//! The detector is an opaque executable. We hand it the submission path and
//! our thresholds, ask for a JSON report in a scratch file, and fold the
//! `metadata.aiDetection` block of that report into a [`DetectionResult`].
//! Every failure here is recoverable: the caller gets `None` and grades the
//! submission as if no detection signal existed.

use std::{
    ffi::OsString,
    path::{Path, PathBuf},
    time::Duration,
};

use serde::Deserialize;
use thiserror::Error;
use uuid::Uuid;

use crate::{
    config::{DetectionConfig, ProcessingConfig},
    process::{self, ProcessError},
    types::{DetectionResult, Submission},
};

/// Reasons a detector run produced no usable verdict.
#[derive(Error, Debug)]
pub enum DetectionError {
    /// The configured executable is neither a path nor on `PATH`.
    #[error("detector `{command}` not found: {source}")]
    ExecutableNotFound {
        /// Configured command.
        command: String,
        /// Lookup failure.
        #[source]
        source:  which::Error,
    },
    /// The detector exceeded its deadline.
    #[error("detector timed out after {0:?}")]
    TimedOut(Duration),
    /// The detector could not be run.
    #[error("detector failed to run: {0}")]
    Process(#[source] ProcessError),
    /// The detector finished but wrote no report.
    #[error("detector wrote no report to {} (stderr: {stderr})", path.display())]
    MissingOutput {
        /// Where the report was expected.
        path:   PathBuf,
        /// Whatever the detector printed to stderr.
        stderr: String,
    },
    /// The report exists but could not be read.
    #[error("could not read detector report {}: {source}", path.display())]
    Read {
        /// Report path.
        path:   PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// The report is not the JSON shape we expect.
    #[error("could not parse detector report {}: {source}", path.display())]
    Parse {
        /// Report path.
        path:   PathBuf,
        /// Underlying JSON error.
        #[source]
        source: serde_json::Error,
    },
}

impl From<ProcessError> for DetectionError {
    fn from(err: ProcessError) -> Self {
        match err {
            ProcessError::TimedOut(limit) => DetectionError::TimedOut(limit),
            other => DetectionError::Process(other),
        }
    }
}

/// Top level of the detector's JSON report.
#[derive(Deserialize, Debug, Default)]
#[serde(default)]
struct Report {
    /// Report metadata.
    metadata: ReportMetadata,
}

/// The `metadata` block.
#[derive(Deserialize, Debug, Default)]
#[serde(default, rename_all = "camelCase")]
struct ReportMetadata {
    /// The `aiDetection` block.
    ai_detection: AiDetection,
}

/// The `metadata.aiDetection` block; absent fields read as zero/false.
#[derive(Deserialize, Debug, Default)]
#[serde(default, rename_all = "camelCase")]
struct AiDetection {
    /// Detector verdict.
    #[serde(rename = "isAIGenerated")]
    is_ai_generated:          bool,
    /// Confidence in `[0, 1]`.
    confidence_score:         f64,
    /// Number of patterns found.
    patterns_detected:        u64,
    /// Number of high-confidence patterns.
    high_confidence_patterns: u64,
    /// Analysis time in milliseconds.
    analysis_time:            u64,
}

impl From<AiDetection> for DetectionResult {
    fn from(ai: AiDetection) -> Self {
        DetectionResult::new(
            ai.is_ai_generated,
            ai.confidence_score,
            ai.patterns_detected,
            ai.high_confidence_patterns,
            ai.analysis_time,
        )
    }
}

/// Parses a detector report body.
pub fn parse_report(body: &str) -> Result<DetectionResult, serde_json::Error> {
    let report: Report = serde_json::from_str(body)?;
    Ok(report.metadata.ai_detection.into())
}

/// Runs the detector for one submission at a time.
#[derive(Debug, Clone)]
pub struct DetectionAdapter {
    /// The `ai_detection` section.
    config:      DetectionConfig,
    /// Per-invocation deadline.
    timeout:     Duration,
    /// Directory receiving one scratch report per student.
    scratch_dir: PathBuf,
}

impl DetectionAdapter {
    /// Creates an adapter writing scratch reports under `scratch_dir`.
    pub fn new(
        config: &DetectionConfig,
        processing: &ProcessingConfig,
        scratch_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            config:      config.clone(),
            timeout:     processing.timeout(),
            scratch_dir: scratch_dir.into(),
        }
    }

    /// Whether detection runs at all.
    pub fn enabled(&self) -> bool {
        self.config.enabled
    }

    /// Path of the scratch report for one invocation.
    ///
    /// The sanitised id only keeps the name readable; `invocation` is what
    /// keeps two students (or two runs for one student) apart.
    pub fn report_path(&self, student_id: &str, invocation: Uuid) -> PathBuf {
        self.scratch_dir.join(format!(
            "ai-detection-{}-{}.json",
            sanitize(student_id),
            invocation.simple()
        ))
    }

    /// Command-line arguments for one invocation.
    pub fn arguments(&self, target: &Path, report: &Path) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![
            target.as_os_str().to_owned(),
            "--type".into(),
            self.config.review_type.clone().into(),
            "--enable-ai-detection".into(),
            "--ai-detection-threshold".into(),
            self.config.threshold.to_string().into(),
            "--ai-detection-analyzers".into(),
            self.config.analyzers.join(",").into(),
        ];
        if self.config.include_in_report {
            args.push("--ai-detection-include-in-report".into());
        }
        args.extend([
            "--format".into(),
            "json".into(),
            "--output".into(),
            report.as_os_str().to_owned(),
        ]);
        args
    }

    /// Resolves the configured command to an executable path.
    fn executable(&self) -> Result<PathBuf, DetectionError> {
        which::which(&self.config.command).map_err(|source| DetectionError::ExecutableNotFound {
            command: self.config.command.clone(),
            source,
        })
    }

    /// Runs the detector and returns its verdict.
    pub async fn try_detect(&self, submission: &Submission) -> Result<DetectionResult, DetectionError> {
        let program = self.executable()?;
        let report = self.report_path(&submission.student_id, Uuid::new_v4());
        let args = self.arguments(&submission.path, &report);

        let collected = process::run_collect(&program, &args, Some(self.timeout)).await?;
        if !collected.status.success() {
            tracing::debug!(
                "Detector exited with {} for {}",
                collected.status,
                submission.student_id
            );
        }

        if !report.exists() {
            return Err(DetectionError::MissingOutput {
                path:   report,
                stderr: collected.stderr_lossy(),
            });
        }

        let body = tokio::fs::read_to_string(&report)
            .await
            .map_err(|source| DetectionError::Read {
                path: report.clone(),
                source,
            })?;
        if let Err(e) = tokio::fs::remove_file(&report).await {
            tracing::debug!("Could not remove {}: {e}", report.display());
        }
        parse_report(&body).map_err(|source| DetectionError::Parse {
            path: report,
            source,
        })
    }

    /// Runs the detector if enabled, degrading every failure to `None`.
    pub async fn detect(&self, submission: &Submission) -> Option<DetectionResult> {
        if !self.enabled() {
            return None;
        }

        tracing::info!("Running AI detection for {}", submission.student_id);
        match self.try_detect(submission).await {
            Ok(result) => {
                tracing::debug!(
                    "Detection for {}: flagged={} confidence={:.3} risk={}",
                    submission.student_id,
                    result.flagged,
                    result.confidence,
                    result.risk_level
                );
                Some(result)
            }
            Err(DetectionError::TimedOut(limit)) => {
                tracing::error!(
                    "AI detection timeout for {} after {limit:?}",
                    submission.student_id
                );
                None
            }
            Err(e) => {
                tracing::error!("AI detection failed for {}: {e}", submission.student_id);
                None
            }
        }
    }
}

/// Keeps a student id usable as a file-name component.
fn sanitize(student_id: &str) -> String {
    student_id
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect()
}
