#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use std::{collections::BTreeMap, fmt::Display};

use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

use crate::types::{DetectionResult, Submission};

/// Letter grades, ordered from worst to best.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum LetterGrade {
    /// Below 60.
    F,
    /// 60 and up.
    DMinus,
    /// 63 and up.
    D,
    /// 67 and up.
    DPlus,
    /// 70 and up.
    CMinus,
    /// 73 and up.
    C,
    /// 77 and up.
    CPlus,
    /// 80 and up.
    BMinus,
    /// 83 and up.
    B,
    /// 87 and up.
    BPlus,
    /// 90 and up.
    AMinus,
    /// 93 and up.
    A,
    /// 97 and up.
    APlus,
}

impl LetterGrade {
    /// Every grade, best first; the order used by report tables.
    pub const ALL: [LetterGrade; 13] = [
        LetterGrade::APlus,
        LetterGrade::A,
        LetterGrade::AMinus,
        LetterGrade::BPlus,
        LetterGrade::B,
        LetterGrade::BMinus,
        LetterGrade::CPlus,
        LetterGrade::C,
        LetterGrade::CMinus,
        LetterGrade::DPlus,
        LetterGrade::D,
        LetterGrade::DMinus,
        LetterGrade::F,
    ];

    /// Inclusive lower bound of this grade's bracket.
    pub fn lower_bound(self) -> f64 {
        match self {
            LetterGrade::APlus => 97.0,
            LetterGrade::A => 93.0,
            LetterGrade::AMinus => 90.0,
            LetterGrade::BPlus => 87.0,
            LetterGrade::B => 83.0,
            LetterGrade::BMinus => 80.0,
            LetterGrade::CPlus => 77.0,
            LetterGrade::C => 73.0,
            LetterGrade::CMinus => 70.0,
            LetterGrade::DPlus => 67.0,
            LetterGrade::D => 63.0,
            LetterGrade::DMinus => 60.0,
            LetterGrade::F => f64::NEG_INFINITY,
        }
    }

    /// The best grade whose lower bound `score` reaches.
    pub fn from_score(score: f64) -> Self {
        Self::ALL
            .into_iter()
            .find(|grade| score >= grade.lower_bound())
            .unwrap_or(LetterGrade::F)
    }

    /// The conventional spelling (`A+`, `B-`, ...).
    pub fn as_str(self) -> &'static str {
        match self {
            LetterGrade::APlus => "A+",
            LetterGrade::A => "A",
            LetterGrade::AMinus => "A-",
            LetterGrade::BPlus => "B+",
            LetterGrade::B => "B",
            LetterGrade::BMinus => "B-",
            LetterGrade::CPlus => "C+",
            LetterGrade::C => "C",
            LetterGrade::CMinus => "C-",
            LetterGrade::DPlus => "D+",
            LetterGrade::D => "D",
            LetterGrade::DMinus => "D-",
            LetterGrade::F => "F",
        }
    }
}

impl Display for LetterGrade {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, TypedBuilder, Serialize, Deserialize)]
#[builder(field_defaults(setter(into)))]
#[builder(doc)]
/// The outcome of grading one submission
pub struct GradingResult {
    /// * `student_id`: directory name of the submission
    pub student_id:             String,
    /// * `student_name`: parsed display name
    pub student_name:           String,
    /// * `detection`: detector verdict, if one was obtained
    #[builder(default)]
    pub detection:              Option<DetectionResult>,
    /// * `overall_score`: weighted score in `[0, 100]`
    pub overall_score:          f64,
    /// * `letter_grade`: grade derived from `overall_score`
    pub letter_grade:           LetterGrade,
    /// * `criteria_scores`: per-criterion scores after penalties
    #[builder(default)]
    pub criteria_scores:        BTreeMap<String, f64>,
    /// * `feedback`: text shown to the student
    pub feedback:               String,
    /// * `requires_manual_review`: an instructor must look at this one
    #[builder(default)]
    pub requires_manual_review: bool,
    /// * `integrity_flag`: flagged for suspected AI assistance
    #[builder(default)]
    pub integrity_flag:         bool,
}

impl GradingResult {
    /// The worst-case result for a submission whose grading failed.
    pub fn failed(submission: &Submission, reason: impl Display) -> Self {
        Self {
            student_id:             submission.student_id.clone(),
            student_name:           submission.student_name.clone(),
            detection:              None,
            overall_score:          0.0,
            letter_grade:           LetterGrade::F,
            criteria_scores:        BTreeMap::new(),
            feedback:               format!("Processing failed: {reason}"),
            requires_manual_review: true,
            integrity_flag:         false,
        }
    }

    /// Whether the score reaches `threshold`.
    pub fn passes(&self, threshold: f64) -> bool {
        self.overall_score >= threshold
    }
}
