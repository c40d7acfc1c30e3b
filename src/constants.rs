#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

/// Extensions (lower-case, without the dot) that mark a directory as a
/// code submission.
pub const SOURCE_EXTENSIONS: &[&str] = &["py", "js", "ts", "java", "cpp", "c", "go", "rb", "php", "cs"];

/// Name of the detector executable when the configuration does not say
/// otherwise.
pub const DEFAULT_DETECTOR: &str = "ai-code-review";

/// Review type tag handed to the detector.
pub const DEFAULT_REVIEW_TYPE: &str = "coding-test";

/// Confidence at or above which a detection is `CRITICAL`.
pub const RISK_CRITICAL: f64 = 0.9;
/// Confidence at or above which a detection is `HIGH`.
pub const RISK_HIGH: f64 = 0.8;
/// Confidence at or above which a detection is `MEDIUM`.
pub const RISK_MEDIUM: f64 = 0.6;

/// Upper bound on the fraction of credit a (non-failing) detection can take.
pub const MAX_DETECTION_PENALTY: f64 = 0.5;

/// File name of the class summary inside the reports directory.
pub const SUMMARY_FILE: &str = "grading_summary.md";
/// File name of the gradebook export inside the results directory.
pub const CSV_FILE: &str = "grades.csv";
/// File name of the integrity report inside the reports directory.
pub const INTEGRITY_FILE: &str = "academic_integrity_report.md";
/// File name of the run log inside the results directory.
pub const LOG_FILE: &str = "grading.log";

/// Timestamp format used in generated reports.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
