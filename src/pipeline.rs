#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! Fans submissions out over a bounded pool of tasks and fans the grades
//! back in.
//!
//! Every submission produces exactly one [`GradingResult`]. A task that
//! errors or panics degrades to [`GradingResult::failed`] for its own
//! student and never affects its siblings.

use std::{
    fmt,
    path::{Path, PathBuf},
    sync::Arc,
};

use futures::{StreamExt, stream};
use tempfile::TempDir;
use thiserror::Error;
use tracing::Instrument;
use uuid::Uuid;

use crate::{
    config::Config,
    detection::DetectionAdapter,
    discovery::{DiscoveryError, DueDatePolicy, LatenessPolicy, SubmissionDiscoverer},
    grade::{FixedRubric, GradeCalculator, GradingResult, ProcessingError, RubricScorer},
    types::Submission,
};

/// Lifecycle of one submission inside a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionState {
    /// Found on disk, not yet scheduled.
    Discovered,
    /// Waiting on the detector.
    Detecting,
    /// Computing the grade.
    Grading,
    /// Graded normally.
    Completed,
    /// Replaced by the synthetic failing result.
    Failed,
}

impl fmt::Display for SubmissionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SubmissionState::Discovered => "discovered",
            SubmissionState::Detecting => "detecting",
            SubmissionState::Grading => "grading",
            SubmissionState::Completed => "completed",
            SubmissionState::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Fatal pipeline errors.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Discovery failed or found nothing to grade.
    #[error(transparent)]
    Discovery(#[from] DiscoveryError),
}

/// Everything a finished run produced.
#[derive(Debug)]
pub struct PipelineOutcome {
    /// Identifier of this run.
    pub run_id:    Uuid,
    /// One result per submission, in completion order.
    pub results:   Vec<GradingResult>,
    /// Submissions that reached [`SubmissionState::Completed`].
    pub completed: usize,
    /// Submissions that ended in [`SubmissionState::Failed`].
    pub failed:    usize,
}

/// Detection and grading for a whole batch.
#[derive(Clone)]
pub struct Pipeline {
    /// Shared run configuration.
    config:   Arc<Config>,
    /// Source of rubric base scores.
    rubric:   Arc<dyn RubricScorer>,
    /// Lateness decision used during discovery.
    lateness: Arc<dyn LatenessPolicy>,
}

impl Pipeline {
    /// A pipeline using [`FixedRubric`] and the configured due date.
    pub fn new(config: Arc<Config>) -> Self {
        let lateness = Arc::new(DueDatePolicy::from_config(&config.assignment));
        Self {
            config,
            rubric: Arc::new(FixedRubric::default()),
            lateness,
        }
    }

    /// Replaces the rubric scorer.
    pub fn with_rubric(mut self, rubric: Arc<dyn RubricScorer>) -> Self {
        self.rubric = rubric;
        self
    }

    /// Replaces the lateness policy.
    pub fn with_lateness(mut self, lateness: Arc<dyn LatenessPolicy>) -> Self {
        self.lateness = lateness;
        self
    }

    /// The configuration this pipeline runs with.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Discovers submissions, treating an empty batch as fatal.
    pub fn discover(&self, root: &Path) -> Result<Vec<Submission>, PipelineError> {
        let submissions = SubmissionDiscoverer::new(self.lateness.as_ref()).discover(root)?;
        if submissions.is_empty() {
            tracing::error!("No submissions found");
            return Err(DiscoveryError::NoSubmissions(root.to_path_buf()).into());
        }
        Ok(submissions)
    }

    /// Discovers and grades everything under `root`.
    pub async fn run(&self, root: &Path) -> Result<PipelineOutcome, PipelineError> {
        let submissions = self.discover(root)?;
        Ok(self.process(submissions).await)
    }

    /// Grades an already discovered batch.
    pub async fn process(&self, submissions: Vec<Submission>) -> PipelineOutcome {
        let run_id = Uuid::new_v4();
        let workers = self.config.processing.worker_count.max(1);
        let total = submissions.len();
        tracing::info!("Processing {total} submissions with {workers} workers (run {run_id})");

        // Held until every task is done; dropping it removes the scratch files.
        let scratch = ScratchDir::create(run_id);
        let scratch_path = scratch.path().to_path_buf();

        let adapter = Arc::new(DetectionAdapter::new(
            &self.config.detection,
            &self.config.processing,
            scratch_path,
        ));
        let calculator = GradeCalculator::new(Arc::clone(&self.config), Arc::clone(&self.rubric));

        let outcomes: Vec<(GradingResult, SubmissionState)> = stream::iter(submissions)
            .map(|submission| {
                tracing::debug!(
                    student_id = %submission.student_id,
                    state = %SubmissionState::Discovered,
                    "scheduling"
                );
                let fallback = submission.clone();
                let handle = tokio::spawn(grade_submission(
                    Arc::clone(&adapter),
                    calculator.clone(),
                    submission,
                ));
                async move {
                    match handle.await {
                        Ok(outcome) => outcome,
                        Err(e) => {
                            let err = ProcessingError::Panicked(e.to_string());
                            tracing::error!("Task failed for {}: {err}", fallback.student_id);
                            (GradingResult::failed(&fallback, &err), SubmissionState::Failed)
                        }
                    }
                }
            })
            .buffer_unordered(workers)
            .collect()
            .await;

        drop(scratch);
        debug_assert_eq!(outcomes.len(), total);

        let failed = outcomes
            .iter()
            .filter(|(_, state)| *state == SubmissionState::Failed)
            .count();
        let results: Vec<GradingResult> = outcomes.into_iter().map(|(r, _)| r).collect();

        PipelineOutcome {
            run_id,
            completed: results.len() - failed,
            failed,
            results,
        }
    }
}

/// Per-run directory for detector reports, removed on drop.
enum ScratchDir {
    /// Managed by `tempfile`.
    Temp(TempDir),
    /// `gradebatch-<run_id>` under the system temp dir, used when `tempfile`
    /// could not create one.
    Fallback(PathBuf),
}

impl ScratchDir {
    /// Creates the scratch directory for `run_id`.
    fn create(run_id: Uuid) -> Self {
        match tempfile::Builder::new()
            .prefix(&format!("gradebatch-{run_id}-"))
            .tempdir()
        {
            Ok(dir) => ScratchDir::Temp(dir),
            Err(e) => {
                tracing::error!("Could not create scratch directory: {e}");
                Self::fallback_in(&std::env::temp_dir(), run_id)
            }
        }
    }

    /// `gradebatch-<run_id>` under `base`, private to this run.
    fn fallback_in(base: &Path, run_id: Uuid) -> Self {
        let path = base.join(format!("gradebatch-{run_id}"));
        tracing::warn!("Using fallback scratch directory {}", path.display());
        if let Err(e) = std::fs::create_dir_all(&path) {
            tracing::error!("Could not create {}: {e}", path.display());
        }
        ScratchDir::Fallback(path)
    }

    /// Where reports go.
    fn path(&self) -> &Path {
        match self {
            ScratchDir::Temp(dir) => dir.path(),
            ScratchDir::Fallback(path) => path,
        }
    }
}

impl Drop for ScratchDir {
    fn drop(&mut self) {
        if let ScratchDir::Fallback(path) = self {
            let _ = std::fs::remove_dir_all(path);
        }
    }
}

/// Detection then grading for one submission.
async fn grade_submission(
    adapter: Arc<DetectionAdapter>,
    calculator: GradeCalculator,
    submission: Submission,
) -> (GradingResult, SubmissionState) {
    let span = tracing::info_span!("submission", student_id = %submission.student_id);
    async move {
        tracing::debug!(state = %SubmissionState::Detecting);
        let detection = adapter.detect(&submission).await;

        tracing::debug!(state = %SubmissionState::Grading);
        match calculator.grade(&submission, detection) {
            Ok(result) => {
                tracing::info!(
                    "Processed {}: {} ({:.1})",
                    submission.student_id,
                    result.letter_grade,
                    result.overall_score
                );
                (result, SubmissionState::Completed)
            }
            Err(e) => {
                tracing::error!("Failed to process {}: {e}", submission.student_id);
                (GradingResult::failed(&submission, &e), SubmissionState::Failed)
            }
        }
    }
    .instrument(span)
    .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scratch_dirs_are_private_to_a_run() {
        let run_id = Uuid::new_v4();
        let scratch = ScratchDir::create(run_id);
        let name = scratch
            .path()
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        assert!(name.contains(&run_id.to_string()));
        assert!(scratch.path().is_dir());
    }

    #[test]
    fn fallback_is_per_run_and_cleaned_up() {
        let base = tempfile::tempdir().expect("tempdir");
        let first = ScratchDir::fallback_in(base.path(), Uuid::new_v4());
        let second = ScratchDir::fallback_in(base.path(), Uuid::new_v4());

        assert_ne!(first.path(), second.path());
        assert_ne!(first.path(), base.path());
        assert!(first.path().is_dir());

        let path = first.path().to_path_buf();
        drop(first);
        assert!(!path.exists());
        assert!(second.path().is_dir());
    }
}
