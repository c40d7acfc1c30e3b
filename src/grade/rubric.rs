#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! Rubric base scores.

use std::collections::BTreeMap;

use crate::types::Submission;

/// Produces per-criterion base scores (0–100) for a submission, before any
/// detection or lateness penalty.
///
/// Real code analysis plugs in here; the grade calculator only sees the
/// returned map.
pub trait RubricScorer: Send + Sync {
    /// Scores one submission.
    fn score(&self, submission: &Submission) -> anyhow::Result<BTreeMap<String, f64>>;
}

/// Hands every submission the same base scores.
#[derive(Debug, Clone)]
pub struct FixedRubric {
    /// Scores returned for every submission.
    scores: BTreeMap<String, f64>,
}

impl FixedRubric {
    /// Uses the given scores for everyone.
    pub fn new<I, K>(scores: I) -> Self
    where
        I: IntoIterator<Item = (K, f64)>,
        K: Into<String>,
    {
        Self {
            scores: scores.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

impl Default for FixedRubric {
    /// Placeholder scores for the default five-criterion rubric.
    fn default() -> Self {
        Self::new([
            ("correctness", 85.0),
            ("code_quality", 78.0),
            ("documentation", 90.0),
            ("testing", 75.0),
            ("creativity", 80.0),
        ])
    }
}

impl RubricScorer for FixedRubric {
    fn score(&self, _submission: &Submission) -> anyhow::Result<BTreeMap<String, f64>> {
        Ok(self.scores.clone())
    }
}
