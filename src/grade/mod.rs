#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

/// Weighted scoring and penalty application.
pub mod calculator;
/// Student-facing feedback text.
pub mod feedback;
/// Grade result types.
pub mod results;
/// Rubric base-score sources.
pub mod rubric;

pub use calculator::{GradeCalculator, ProcessingError, weighted_score};
pub use feedback::{FeedbackInput, criterion_title, generate_feedback};
pub use results::{GradingResult, LetterGrade};
pub use rubric::{FixedRubric, RubricScorer};
