#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use std::{fmt, path::PathBuf};

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

use crate::constants::{RISK_CRITICAL, RISK_HIGH, RISK_MEDIUM};

/// One student's submission directory, as found during discovery.
#[derive(Debug, Clone, PartialEq, Eq, TypedBuilder, Serialize, Deserialize)]
#[builder(field_defaults(setter(into)))]
#[builder(doc)]
pub struct Submission {
    /// Directory name, verbatim.
    pub student_id:   String,
    /// Best-effort name parsed out of the directory name.
    pub student_name: String,
    /// Path to the submission directory.
    pub path:         PathBuf,
    /// Last-modified time of the directory, when available.
    #[builder(default, setter(strip_option))]
    pub submitted_at: Option<DateTime<Local>>,
    /// Whether the lateness policy considers this submission late.
    #[builder(default)]
    pub is_late:      bool,
}

/// Ordinal risk tier derived from detector confidence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskLevel {
    /// Below 0.6.
    Low,
    /// At least 0.6.
    Medium,
    /// At least 0.8.
    High,
    /// At least 0.9.
    Critical,
}

impl RiskLevel {
    /// Maps a confidence score onto its tier.
    pub fn from_confidence(confidence: f64) -> Self {
        if confidence >= RISK_CRITICAL {
            RiskLevel::Critical
        } else if confidence >= RISK_HIGH {
            RiskLevel::High
        } else if confidence >= RISK_MEDIUM {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RiskLevel::Low => "LOW",
            RiskLevel::Medium => "MEDIUM",
            RiskLevel::High => "HIGH",
            RiskLevel::Critical => "CRITICAL",
        };
        f.write_str(s)
    }
}

/// Normalised verdict from the external detector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionResult {
    /// Whether the detector considers the submission AI-generated.
    pub flagged:                       bool,
    /// Detector confidence, clamped into `[0, 1]`.
    pub confidence:                    f64,
    /// Tier derived from `confidence`.
    pub risk_level:                    RiskLevel,
    /// Number of suspicious patterns reported.
    pub pattern_count:                 u64,
    /// Number of those patterns reported with high confidence.
    pub high_confidence_pattern_count: u64,
    /// Analysis time as reported by the detector, in milliseconds.
    pub analysis_duration:             u64,
}

impl DetectionResult {
    /// Builds a result, clamping `confidence` and deriving the risk tier.
    pub fn new(
        flagged: bool,
        confidence: f64,
        pattern_count: u64,
        high_confidence_pattern_count: u64,
        analysis_duration: u64,
    ) -> Self {
        let confidence = if confidence.is_finite() {
            confidence.clamp(0.0, 1.0)
        } else {
            0.0
        };
        Self {
            flagged,
            confidence,
            risk_level: RiskLevel::from_confidence(confidence),
            pattern_count,
            high_confidence_pattern_count,
            analysis_duration,
        }
    }
}
