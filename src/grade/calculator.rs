#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use std::{collections::BTreeMap, sync::Arc};

use thiserror::Error;

use super::{
    feedback::{FeedbackInput, generate_feedback},
    results::{GradingResult, LetterGrade},
    rubric::RubricScorer,
};
use crate::{
    config::Config,
    constants::MAX_DETECTION_PENALTY,
    types::{DetectionResult, Submission},
};

/// Failures while grading a single submission.
#[derive(Error, Debug)]
pub enum ProcessingError {
    /// The rubric scorer gave up on this submission.
    #[error("rubric scoring failed: {0:#}")]
    Rubric(anyhow::Error),
    /// The rubric scorer returned NaN or an infinity.
    #[error("rubric returned a non-finite score for `{criterion}`: {value}")]
    NonFiniteScore {
        /// Offending criterion.
        criterion: String,
        /// Offending value.
        value:     f64,
    },
    /// The grading task panicked.
    #[error("grading task panicked: {0}")]
    Panicked(String),
}

/// Multiplies every score by `factor`.
fn scale(scores: &mut BTreeMap<String, f64>, factor: f64) {
    for score in scores.values_mut() {
        *score *= factor;
    }
}

/// Weighted mean of `scores`, normalised by the sum of all configured
/// weights. Criteria without a weight contribute nothing.
pub fn weighted_score(scores: &BTreeMap<String, f64>, weights: &BTreeMap<String, f64>) -> f64 {
    let total: f64 = weights.values().sum();
    if total <= 0.0 {
        return 0.0;
    }
    scores
        .iter()
        .map(|(criterion, score)| score * weights.get(criterion).copied().unwrap_or(0.0) / total)
        .sum()
}

/// Folds rubric scores, detection and lateness into a grade.
#[derive(Clone)]
pub struct GradeCalculator {
    /// Shared run configuration.
    config: Arc<Config>,
    /// Source of base scores.
    rubric: Arc<dyn RubricScorer>,
}

impl GradeCalculator {
    /// Creates a calculator for one run.
    pub fn new(config: Arc<Config>, rubric: Arc<dyn RubricScorer>) -> Self {
        Self { config, rubric }
    }

    /// Base scores from the rubric, validated and clamped into `[0, 100]`.
    fn base_scores(&self, submission: &Submission) -> Result<BTreeMap<String, f64>, ProcessingError> {
        let scores = self
            .rubric
            .score(submission)
            .map_err(ProcessingError::Rubric)?;
        scores
            .into_iter()
            .map(|(criterion, value)| {
                if value.is_finite() {
                    Ok((criterion, value.clamp(0.0, 100.0)))
                } else {
                    Err(ProcessingError::NonFiniteScore { criterion, value })
                }
            })
            .collect()
    }

    /// Grades one submission.
    ///
    /// Penalties apply in order: detection (zeroing on
    /// `fail_on_detection`, otherwise scaling by `1 - min(0.5, confidence)`),
    /// then lateness (scaling by `1 - late_penalty / 100`).
    pub fn grade(
        &self,
        submission: &Submission,
        detection: Option<DetectionResult>,
    ) -> Result<GradingResult, ProcessingError> {
        tracing::info!("Calculating grade for {}", submission.student_id);

        let mut scores = self.base_scores(submission)?;
        let mut integrity_flag = false;
        let mut requires_manual_review = false;

        if let Some(found) = detection.as_ref().filter(|d| d.flagged) {
            integrity_flag = true;
            requires_manual_review = true;

            if self.config.detection.fail_on_detection {
                scale(&mut scores, 0.0);
            } else {
                scale(&mut scores, 1.0 - found.confidence.min(MAX_DETECTION_PENALTY));
            }
        }

        let late_penalty_percent = self.config.assignment.late_penalty_percent;
        if submission.is_late {
            scale(&mut scores, 1.0 - late_penalty_percent / 100.0);
        }

        let overall_score =
            weighted_score(&scores, &self.config.grading.criteria).clamp(0.0, 100.0);
        let letter_grade = LetterGrade::from_score(overall_score);

        let feedback = generate_feedback(&FeedbackInput {
            overall_score,
            criteria_scores: &scores,
            detection: detection.as_ref(),
            is_late: submission.is_late,
            late_penalty_percent,
        });

        Ok(GradingResult {
            student_id: submission.student_id.clone(),
            student_name: submission.student_name.clone(),
            detection,
            overall_score,
            letter_grade,
            criteria_scores: scores,
            feedback,
            requires_manual_review,
            integrity_flag,
        })
    }
}
