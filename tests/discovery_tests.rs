use std::{fs, path::Path};

use chrono::{DateTime, Local};
use gradebatch::discovery::{DiscoveryError, DueDatePolicy, LatenessPolicy, SubmissionDiscoverer};

fn touch(path: &Path) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create parent");
    }
    fs::write(path, "print('hi')\n").expect("write file");
}

/// Marks everything late.
struct AlwaysLate;

impl LatenessPolicy for AlwaysLate {
    fn is_late(&self, _submitted_at: Option<DateTime<Local>>) -> bool {
        true
    }
}

#[test]
fn accepts_directories_with_source_files_sorted() {
    let root = tempfile::tempdir().expect("tempdir");
    touch(&root.path().join("s2_smith_bob/main.py"));
    touch(&root.path().join("s1_doe_jane/src/Main.java"));
    touch(&root.path().join("notes/README.md"));
    fs::create_dir_all(root.path().join("empty")).expect("mkdir");
    touch(&root.path().join("stray.py"));

    let policy = DueDatePolicy::default();
    let found = SubmissionDiscoverer::new(&policy)
        .discover(root.path())
        .expect("discover");

    let ids: Vec<&str> = found.iter().map(|s| s.student_id.as_str()).collect();
    assert_eq!(ids, ["s1_doe_jane", "s2_smith_bob"]);
    assert_eq!(found[0].student_name, "doe jane");
    assert_eq!(found[1].student_name, "smith bob");
    assert!(found.iter().all(|s| !s.is_late));
    assert!(found.iter().all(|s| s.submitted_at.is_some()));
}

#[test]
fn upper_case_extensions_count() {
    let root = tempfile::tempdir().expect("tempdir");
    touch(&root.path().join("alice/PROGRAM.CPP"));

    let policy = DueDatePolicy::default();
    let found = SubmissionDiscoverer::new(&policy)
        .discover(root.path())
        .expect("discover");
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].student_name, "alice");
}

#[test]
fn lateness_policy_is_applied() {
    let root = tempfile::tempdir().expect("tempdir");
    touch(&root.path().join("alice/main.go"));

    let found = SubmissionDiscoverer::new(&AlwaysLate)
        .discover(root.path())
        .expect("discover");
    assert!(found[0].is_late);
}

#[test]
fn empty_root_yields_no_submissions() {
    let root = tempfile::tempdir().expect("tempdir");
    let policy = DueDatePolicy::default();
    let found = SubmissionDiscoverer::new(&policy)
        .discover(root.path())
        .expect("discover");
    assert!(found.is_empty());
}

#[test]
fn missing_root_is_an_error() {
    let root = tempfile::tempdir().expect("tempdir");
    let policy = DueDatePolicy::default();
    let err = SubmissionDiscoverer::new(&policy)
        .discover(&root.path().join("absent"))
        .unwrap_err();
    assert!(matches!(err, DiscoveryError::MissingRoot(_)));
}

#[test]
fn file_root_is_an_error() {
    let root = tempfile::tempdir().expect("tempdir");
    let file = root.path().join("submissions.zip");
    touch(&file);

    let policy = DueDatePolicy::default();
    let err = SubmissionDiscoverer::new(&policy)
        .discover(&file)
        .unwrap_err();
    assert!(matches!(err, DiscoveryError::NotADirectory(_)));
}
