#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! Configuration resolution.
//!
//! A JSON override document is deep-merged onto a built-in default tree and
//! the merged tree is deserialised into an immutable [`Config`]. Any problem
//! with the override is reported through [`ConfigOrigin::Fallback`] and the
//! defaults are used instead; resolution itself never fails.

use std::{
    collections::BTreeMap,
    fmt,
    path::{Path, PathBuf},
    time::Duration,
};

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value, json};
use thiserror::Error;

use crate::constants::{DEFAULT_DETECTOR, DEFAULT_REVIEW_TYPE};

/// Problems with a configuration override.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The override path does not exist.
    #[error("configuration file {} does not exist", .0.display())]
    NotFound(PathBuf),
    /// The override could not be read.
    #[error("could not read configuration file {}: {source}", path.display())]
    Read {
        /// Path of the override.
        path:   PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// The override is not a JSON object.
    #[error("could not parse configuration file {}: {source}", path.display())]
    Parse {
        /// Path of the override.
        path:   PathBuf,
        /// Underlying JSON error.
        #[source]
        source: serde_json::Error,
    },
    /// The merged tree is well-formed JSON but not a valid configuration.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Where the resolved configuration came from.
#[derive(Debug)]
pub enum ConfigOrigin {
    /// No override was requested.
    Defaults,
    /// The override at this path was merged in.
    File(PathBuf),
    /// The override was requested but rejected; defaults were used.
    Fallback {
        /// Path that was requested.
        path:  PathBuf,
        /// Why it was rejected.
        error: ConfigError,
    },
}

impl ConfigOrigin {
    /// Emits a log line describing this origin.
    pub fn log(&self) {
        match self {
            ConfigOrigin::Defaults => tracing::info!("Using default configuration"),
            ConfigOrigin::File(path) => {
                tracing::info!("Loaded configuration from {}", path.display())
            }
            ConfigOrigin::Fallback { path, error } => {
                tracing::warn!("Failed to load config from {}: {error}", path.display());
                tracing::info!("Using default configuration");
            }
        }
    }
}

/// The `ai_detection` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionConfig {
    /// Whether the detector runs at all.
    pub enabled:           bool,
    /// Confidence threshold forwarded to the detector.
    pub threshold:         f64,
    /// Analyzer names forwarded to the detector.
    #[serde(deserialize_with = "analyzers_from_str_or_list")]
    pub analyzers:         Vec<String>,
    /// Zero every criterion when a submission is flagged.
    pub fail_on_detection: bool,
    /// Ask the detector to include its findings in its own report.
    pub include_in_report: bool,
    /// Executable name (looked up on `PATH`) or path.
    pub command:           String,
    /// Review type tag forwarded to the detector.
    pub review_type:       String,
}

/// How grades are expressed to students.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GradingSystem {
    /// Letter grades (A+ .. F).
    Letter,
    /// Raw numeric scores.
    Numeric,
    /// Pass or fail against the passing threshold.
    PassFail,
}

impl fmt::Display for GradingSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            GradingSystem::Letter => "letter",
            GradingSystem::Numeric => "numeric",
            GradingSystem::PassFail => "pass_fail",
        };
        f.write_str(name)
    }
}

/// The `grading` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradingConfig {
    /// Reporting style.
    pub system:            GradingSystem,
    /// Maximum attainable score.
    pub max_score:         f64,
    /// Lowest passing overall score.
    pub passing_threshold: f64,
    /// Rubric weights keyed by criterion name.
    pub criteria:          BTreeMap<String, f64>,
}

impl GradingConfig {
    /// Sum of all criterion weights.
    pub fn total_weight(&self) -> f64 {
        self.criteria.values().sum()
    }
}

/// The `assignment` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssignmentConfig {
    /// Human readable title used in reports.
    pub title:        String,
    /// Difficulty label.
    pub difficulty:   String,
    /// Assignment kind label (`take-home`, `in-class`, ...).
    #[serde(rename = "type")]
    pub kind:         String,
    /// Percentage removed from every criterion for a late submission.
    #[serde(rename = "late_penalty")]
    pub late_penalty_percent: f64,
    /// Deadline used to decide lateness; nothing is late without one.
    pub due_date:     Option<DateTime<FixedOffset>>,
}

/// The `processing` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessingConfig {
    /// Size of the worker pool.
    #[serde(rename = "parallel_workers")]
    pub worker_count:    usize,
    /// Deadline for a single detector invocation, in seconds.
    #[serde(rename = "timeout_seconds")]
    pub timeout_seconds: u64,
}

impl ProcessingConfig {
    /// The per-invocation detector deadline.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

/// The `output` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Directory receiving the CSV export and the run log.
    pub results_dir:         PathBuf,
    /// Directory receiving markdown reports.
    pub reports_dir:         PathBuf,
    /// Write one feedback file per student.
    pub individual_feedback: bool,
    /// Write the class summary.
    pub summary_report:      bool,
    /// Write the gradebook CSV.
    pub csv_export:          bool,
}

/// Fully resolved, immutable configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Detector settings.
    #[serde(rename = "ai_detection")]
    pub detection:  DetectionConfig,
    /// Rubric settings.
    pub grading:    GradingConfig,
    /// Assignment metadata and penalties.
    pub assignment: AssignmentConfig,
    /// Concurrency and timeouts.
    pub processing: ProcessingConfig,
    /// Report destinations and toggles.
    pub output:     OutputConfig,
}

impl Default for Config {
    fn default() -> Self {
        // The default tree is a literal and always deserialises.
        Config::from_tree(default_tree()).unwrap_or_else(|e| unreachable!("bad default tree: {e}"))
    }
}

impl Config {
    /// Deserialises and validates a merged tree.
    pub fn from_tree(tree: Value) -> Result<Self, ConfigError> {
        let config: Config =
            serde_json::from_value(tree).map_err(|e| ConfigError::Invalid(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Checks the invariants serde cannot express.
    fn validate(&self) -> Result<(), ConfigError> {
        if let Some((name, weight)) = self
            .grading
            .criteria
            .iter()
            .find(|(_, w)| !w.is_finite() || **w < 0.0)
        {
            return Err(ConfigError::Invalid(format!(
                "criterion `{name}` has weight {weight}; weights must be non-negative"
            )));
        }
        if !self.grading.criteria.is_empty() && self.grading.total_weight() <= 0.0 {
            return Err(ConfigError::Invalid("criterion weights must not sum to zero".into()));
        }
        if self.processing.worker_count == 0 {
            return Err(ConfigError::Invalid("parallel_workers must be at least 1".into()));
        }
        let late = self.assignment.late_penalty_percent;
        if !(0.0..=100.0).contains(&late) {
            return Err(ConfigError::Invalid(format!(
                "late_penalty must be between 0 and 100, got {late}"
            )));
        }
        if !self.detection.threshold.is_finite() {
            return Err(ConfigError::Invalid("ai_detection.threshold must be a number".into()));
        }
        Ok(())
    }
}

/// Accepts `"git,documentation"` as well as `["git", "documentation"]`.
fn analyzers_from_str_or_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    /// Either accepted spelling.
    enum Analyzers {
        /// Comma separated.
        Joined(String),
        /// Already split.
        List(Vec<String>),
    }

    let names = match Analyzers::deserialize(deserializer)? {
        Analyzers::Joined(s) => s.split(',').map(str::to_string).collect(),
        Analyzers::List(v) => v,
    };
    Ok(names
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect())
}

/// The built-in configuration tree every override is merged onto.
pub fn default_tree() -> Value {
    json!({
        "ai_detection": {
            "enabled": true,
            "threshold": 0.75,
            "analyzers": "git,documentation",
            "fail_on_detection": false,
            "include_in_report": true,
            "command": DEFAULT_DETECTOR,
            "review_type": DEFAULT_REVIEW_TYPE
        },
        "grading": {
            "system": "letter",
            "max_score": 100,
            "passing_threshold": 70,
            "criteria": {
                "correctness": 40,
                "code_quality": 25,
                "documentation": 15,
                "testing": 10,
                "creativity": 10
            }
        },
        "assignment": {
            "title": "Programming Assignment",
            "difficulty": "mid",
            "type": "take-home",
            "late_penalty": 10,
            "due_date": null
        },
        "processing": {
            "parallel_workers": 4,
            "timeout_seconds": 300
        },
        "output": {
            "results_dir": "./grading-results",
            "reports_dir": "./grading-reports",
            "individual_feedback": true,
            "summary_report": true,
            "csv_export": true
        }
    })
}

/// Merges `update` into `base`.
///
/// Where both sides hold an object the merge recurses key by key; in every
/// other case the value from `update` replaces the one in `base`.
pub fn deep_merge(base: &mut Map<String, Value>, update: Map<String, Value>) {
    for (key, value) in update {
        match (base.get_mut(&key), value) {
            (Some(Value::Object(existing)), Value::Object(incoming)) => {
                deep_merge(existing, incoming)
            }
            (_, value) => {
                base.insert(key, value);
            }
        }
    }
}

/// Reads an override document, requiring a JSON object at the root.
fn read_override(path: &Path) -> Result<Map<String, Value>, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::NotFound(path.to_path_buf()));
    }
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let value: Value = serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    match value {
        Value::Object(map) => Ok(map),
        other => Err(ConfigError::Invalid(format!(
            "expected a JSON object at the root of {}, found {}",
            path.display(),
            json_kind(&other)
        ))),
    }
}

/// Short name of a JSON value's type, for error messages.
fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Merges an override onto the defaults and builds the typed config.
fn merge_override(path: &Path) -> Result<Config, ConfigError> {
    let update = read_override(path)?;
    let mut tree = match default_tree() {
        Value::Object(map) => map,
        _ => unreachable!("default tree is an object"),
    };
    deep_merge(&mut tree, update);
    Config::from_tree(Value::Object(tree))
}

/// Produces the run configuration from an optional override path.
///
/// Never fails: a rejected override degrades to the defaults and the reason
/// is carried in the returned [`ConfigOrigin`].
pub fn resolve(path: Option<&Path>) -> (Config, ConfigOrigin) {
    let Some(path) = path else {
        return (Config::default(), ConfigOrigin::Defaults);
    };

    match merge_override(path) {
        Ok(config) => (config, ConfigOrigin::File(path.to_path_buf())),
        Err(error) => (
            Config::default(),
            ConfigOrigin::Fallback {
                path: path.to_path_buf(),
                error,
            },
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn obj(v: Value) -> Map<String, Value> {
        match v {
            Value::Object(m) => m,
            _ => panic!("not an object"),
        }
    }

    #[test]
    fn nested_maps_merge_key_by_key() {
        let mut base = obj(json!({"a": {"x": 1, "y": 2}}));
        deep_merge(&mut base, obj(json!({"a": {"y": 9, "z": 3}})));
        assert_eq!(Value::Object(base), json!({"a": {"x": 1, "y": 9, "z": 3}}));
    }

    #[test]
    fn scalars_and_maps_replace_each_other() {
        let mut base = obj(json!({"a": {"x": 1}, "b": 5}));
        deep_merge(&mut base, obj(json!({"a": 7, "b": {"nested": true}})));
        assert_eq!(Value::Object(base), json!({"a": 7, "b": {"nested": true}}));
    }

    #[test]
    fn defaults_are_valid() {
        let config = Config::default();
        assert!(config.detection.enabled);
        assert_eq!(config.detection.analyzers, vec!["git", "documentation"]);
        assert_eq!(config.grading.total_weight(), 100.0);
        assert_eq!(config.processing.worker_count, 4);
        assert_eq!(config.processing.timeout(), Duration::from_secs(300));
        assert_eq!(config.assignment.late_penalty_percent, 10.0);
        assert!(config.assignment.due_date.is_none());
    }

    #[test]
    fn analyzers_accept_a_list() {
        let mut tree = obj(default_tree());
        deep_merge(&mut tree, obj(json!({"ai_detection": {"analyzers": ["git", " style "]}})));
        let config = Config::from_tree(Value::Object(tree)).expect("valid");
        assert_eq!(config.detection.analyzers, vec!["git", "style"]);
    }

    #[test]
    fn negative_weight_is_rejected() {
        let mut tree = obj(default_tree());
        deep_merge(&mut tree, obj(json!({"grading": {"criteria": {"testing": -1}}})));
        assert!(matches!(
            Config::from_tree(Value::Object(tree)),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn zero_weight_sum_is_rejected() {
        let mut tree = obj(default_tree());
        deep_merge(&mut tree, obj(json!({"grading": {"criteria": null}})));
        // `null` is not a map, so the criteria table itself is invalid
        assert!(Config::from_tree(Value::Object(tree)).is_err());

        let mut tree = obj(default_tree());
        tree.insert(
            "grading".into(),
            json!({"system": "letter", "max_score": 100, "passing_threshold": 70,
                   "criteria": {"a": 0, "b": 0}}),
        );
        assert!(Config::from_tree(Value::Object(tree)).is_err());
    }

    #[test]
    fn empty_criteria_table_is_allowed() {
        let mut tree = obj(default_tree());
        tree.insert(
            "grading".into(),
            json!({"system": "numeric", "max_score": 100, "passing_threshold": 50,
                   "criteria": {}}),
        );
        let config = Config::from_tree(Value::Object(tree)).expect("valid");
        assert!(config.grading.criteria.is_empty());
        assert_eq!(config.grading.system, GradingSystem::Numeric);
    }

    #[test]
    fn missing_override_falls_back() {
        let (config, origin) = resolve(Some(Path::new("/definitely/not/here.json")));
        assert!(matches!(
            origin,
            ConfigOrigin::Fallback {
                error: ConfigError::NotFound(_),
                ..
            }
        ));
        assert_eq!(config.processing.worker_count, 4);
    }
}
