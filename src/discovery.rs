#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! Finding student submissions on disk.

use std::{
    fs,
    path::{Path, PathBuf},
};

use chrono::{DateTime, FixedOffset, Local};
use thiserror::Error;
use walkdir::WalkDir;

use crate::{config::AssignmentConfig, constants::SOURCE_EXTENSIONS, types::Submission};

/// Reasons discovery cannot produce a batch.
#[derive(Error, Debug)]
pub enum DiscoveryError {
    /// The root path does not exist.
    #[error("submissions directory not found: {}", .0.display())]
    MissingRoot(PathBuf),
    /// The root path is a file.
    #[error("submissions path is not a directory: {}", .0.display())]
    NotADirectory(PathBuf),
    /// The root could not be listed.
    #[error("could not list {}: {source}", path.display())]
    ReadDir {
        /// Directory being listed.
        path:   PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// Nothing under the root looked like a submission.
    #[error("no valid submissions found in {}", .0.display())]
    NoSubmissions(PathBuf),
}

/// Decides whether a submission counts as late.
pub trait LatenessPolicy: Send + Sync {
    /// `submitted_at` is the best-effort timestamp from discovery.
    fn is_late(&self, submitted_at: Option<DateTime<Local>>) -> bool;
}

/// Compares the submission timestamp with the assignment deadline.
///
/// Without a deadline, or without a timestamp, nothing is late.
#[derive(Debug, Clone, Default)]
pub struct DueDatePolicy {
    /// The assignment deadline.
    due: Option<DateTime<FixedOffset>>,
}

impl DueDatePolicy {
    /// Creates a policy for the given deadline.
    pub fn new(due: Option<DateTime<FixedOffset>>) -> Self {
        Self { due }
    }

    /// Builds the policy from the `assignment` config section.
    pub fn from_config(assignment: &AssignmentConfig) -> Self {
        Self::new(assignment.due_date)
    }
}

impl LatenessPolicy for DueDatePolicy {
    fn is_late(&self, submitted_at: Option<DateTime<Local>>) -> bool {
        match (self.due, submitted_at) {
            (Some(due), Some(at)) => at > due,
            _ => false,
        }
    }
}

/// Derives a display name from a directory name such as
/// `s1234_doe_jane`: every token after the first, space separated.
pub fn student_name_from_dir(dir_name: &str) -> String {
    let parts: Vec<&str> = dir_name
        .split(['_', '-'])
        .filter(|p| !p.is_empty())
        .collect();
    if parts.len() >= 2 {
        parts[1..].join(" ")
    } else {
        dir_name.to_string()
    }
}

/// True if `dir` contains, at any depth, a file with a source extension.
pub fn has_source_files(dir: &Path) -> bool {
    WalkDir::new(dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .any(|e| {
            e.path()
                .extension()
                .and_then(|ext| ext.to_str())
                .map(|ext| SOURCE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
                .unwrap_or(false)
        })
}

/// Last-modified time of `path`, if the platform reports one.
fn modified_time(path: &Path) -> Option<DateTime<Local>> {
    fs::metadata(path)
        .and_then(|m| m.modified())
        .ok()
        .map(DateTime::<Local>::from)
}

/// Scans a submissions root for per-student directories.
pub struct SubmissionDiscoverer<'a> {
    /// Lateness policy applied to each accepted directory.
    lateness: &'a dyn LatenessPolicy,
}

impl<'a> SubmissionDiscoverer<'a> {
    /// Creates a discoverer using the given lateness policy.
    pub fn new(lateness: &'a dyn LatenessPolicy) -> Self {
        Self { lateness }
    }

    /// Lists accepted submissions under `root`, sorted by student id.
    ///
    /// Directories without any source file are skipped with a warning. An
    /// empty result is not an error here; the pipeline decides that.
    pub fn discover(&self, root: &Path) -> Result<Vec<Submission>, DiscoveryError> {
        tracing::info!("Discovering submissions in {}", root.display());

        if !root.exists() {
            return Err(DiscoveryError::MissingRoot(root.to_path_buf()));
        }
        if !root.is_dir() {
            return Err(DiscoveryError::NotADirectory(root.to_path_buf()));
        }

        let entries = fs::read_dir(root).map_err(|source| DiscoveryError::ReadDir {
            path: root.to_path_buf(),
            source,
        })?;

        let mut submissions = Vec::new();
        for entry in entries {
            let entry = match entry {
                Ok(e) => e,
                Err(e) => {
                    tracing::warn!("Skipping unreadable entry in {}: {e}", root.display());
                    continue;
                }
            };
            let path = entry.path();
            if !path.is_dir() {
                continue;
            }

            let student_id = entry.file_name().to_string_lossy().into_owned();
            if !has_source_files(&path) {
                tracing::warn!("No code files found in {}", path.display());
                continue;
            }

            let submitted_at = modified_time(&path);
            let submission = Submission {
                student_name: student_name_from_dir(&student_id),
                student_id,
                is_late: self.lateness.is_late(submitted_at),
                submitted_at,
                path,
            };
            tracing::debug!("Found submission: {}", submission.student_id);
            submissions.push(submission);
        }

        submissions.sort_by(|a, b| a.student_id.cmp(&b.student_id));
        tracing::info!("Discovered {} valid submissions", submissions.len());
        Ok(submissions)
    }
}
