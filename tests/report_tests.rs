use std::{collections::BTreeMap, fs, io::Write, path::Path};

use gradebatch::{
    config::Config,
    constants::{CSV_FILE, INTEGRITY_FILE, LOG_FILE, SUMMARY_FILE},
    grade::{GradingResult, LetterGrade},
    report::{
        Artifact, ReportError, ReportSynthesizer, open_run_log, render_csv, render_integrity,
    },
    types::{DetectionResult, Submission},
};

fn graded(id: &str, name: &str, score: f64, criteria: &[(&str, f64)]) -> GradingResult {
    GradingResult::builder()
        .student_id(id)
        .student_name(name)
        .overall_score(score)
        .letter_grade(LetterGrade::from_score(score))
        .criteria_scores(
            criteria
                .iter()
                .map(|(k, v)| (k.to_string(), *v))
                .collect::<BTreeMap<_, _>>(),
        )
        .feedback(format!("Overall Score: {score:.1}/100"))
        .build()
}

fn flagged(id: &str, confidence: f64) -> GradingResult {
    let mut result = graded(id, id, 41.0, &[("correctness", 41.0)]);
    result.detection = Some(DetectionResult::new(true, confidence, 5, 2, 100));
    result.integrity_flag = true;
    result.requires_manual_review = true;
    result
}

fn config_in(out: &Path) -> Config {
    let mut config = Config::default();
    config.output.results_dir = out.join("results");
    config.output.reports_dir = out.join("reports");
    config
}

#[test]
fn csv_columns_follow_the_first_result() {
    let results = [
        graded("a", "alpha", 90.0, &[("correctness", 95.0), ("testing", 80.0)]),
        graded("b", "beta", 70.0, &[("correctness", 70.0), ("style", 60.0)]),
    ];
    let csv = render_csv(&results);
    let lines: Vec<&str> = csv.lines().collect();

    assert_eq!(lines.len(), 3);
    assert_eq!(
        lines[0],
        "student_id,student_name,overall_score,grade_letter,ai_detected,ai_confidence,\
         ai_risk_level,requires_manual_review,academic_integrity_flag,correctness,testing"
    );
    assert_eq!(lines[1], "a,alpha,90.00,A-,false,0.000,N/A,false,false,95.00,80.00");
    // `style` is not a column; the missing `testing` cell is empty.
    assert_eq!(lines[2], "b,beta,70.00,C-,false,0.000,N/A,false,false,70.00,");
}

#[test]
fn failed_first_result_means_no_criteria_columns() {
    let sub = Submission::builder()
        .student_id("a")
        .student_name("a")
        .path("/tmp/a")
        .build();
    let results = [
        GradingResult::failed(&sub, "boom"),
        graded("b", "b", 80.0, &[("correctness", 80.0)]),
    ];
    let csv = render_csv(&results);
    let header = csv.lines().next().expect("header");
    assert!(header.ends_with("academic_integrity_flag"));
    assert_eq!(csv.lines().count(), 3);
}

#[test]
fn names_with_commas_are_quoted() {
    let results = [graded("s9", "doe, jane", 88.0, &[])];
    let csv = render_csv(&results);
    assert!(csv.lines().nth(1).expect("row").starts_with("s9,\"doe, jane\",88.00,B+,"));
}

#[test]
fn integrity_report_only_when_someone_is_flagged() {
    let config = Config::default();
    let clean = [graded("a", "a", 90.0, &[])];
    assert!(render_integrity(&config, &clean, chrono::Local::now()).is_none());

    let mixed = [graded("a", "a", 90.0, &[]), flagged("b", 0.82), flagged("c", 0.91)];
    let text = render_integrity(&config, &mixed, chrono::Local::now()).expect("report");
    assert_eq!(text.matches("\n## ").count(), 2);
    assert!(text.contains("- Risk level: HIGH"));
    assert!(text.contains("- Risk level: CRITICAL"));
    assert!(text.contains("- Grade impact: F (41.0/100)"));
}

#[test]
fn all_enabled_artifacts_are_written() {
    let out = tempfile::tempdir().expect("tempdir");
    let config = config_in(out.path());
    let results = [graded("a", "a", 90.0, &[("correctness", 90.0)]), flagged("b", 0.95)];

    let summary = ReportSynthesizer::new(&config).write_all(&results);
    assert!(summary.is_clean());
    assert_eq!(summary.written.len(), 5);

    let reports = out.path().join("reports");
    assert!(reports.join("a_feedback.md").exists());
    assert!(reports.join("b_feedback.md").exists());
    assert!(reports.join(SUMMARY_FILE).exists());
    assert!(reports.join(INTEGRITY_FILE).exists());
    assert!(out.path().join("results").join(CSV_FILE).exists());
}

#[test]
fn disabled_artifacts_are_skipped() {
    let out = tempfile::tempdir().expect("tempdir");
    let mut config = config_in(out.path());
    config.output.individual_feedback = false;
    config.output.csv_export = false;
    let results = [graded("a", "a", 90.0, &[])];

    let summary = ReportSynthesizer::new(&config).write_all(&results);
    assert_eq!(summary.written, [out.path().join("reports").join(SUMMARY_FILE)]);
    assert!(!out.path().join("results").exists());
    assert!(!out.path().join("reports").join(INTEGRITY_FILE).exists());
}

#[test]
fn one_failing_artifact_does_not_stop_the_others() {
    let out = tempfile::tempdir().expect("tempdir");
    let config = config_in(out.path());
    // A regular file where the results directory should be.
    fs::write(out.path().join("results"), "in the way").expect("write blocker");
    let results = [graded("a", "a", 90.0, &[]), flagged("b", 0.95)];

    let summary = ReportSynthesizer::new(&config).write_all(&results);

    assert_eq!(summary.failures.len(), 1);
    let (artifact, error) = &summary.failures[0];
    assert_eq!(*artifact, Artifact::Csv);
    assert!(matches!(error, ReportError::CreateDir { .. }));

    let reports = out.path().join("reports");
    assert!(reports.join(SUMMARY_FILE).exists());
    assert!(reports.join(INTEGRITY_FILE).exists());
    assert!(reports.join("a_feedback.md").exists());
}

#[test]
fn clean_rerun_removes_old_integrity_report() {
    let out = tempfile::tempdir().expect("tempdir");
    let config = config_in(out.path());
    let integrity = out.path().join("reports").join(INTEGRITY_FILE);

    ReportSynthesizer::new(&config).write_all(&[flagged("b", 0.95)]);
    assert!(integrity.exists());

    let summary = ReportSynthesizer::new(&config).write_all(&[graded("b", "b", 90.0, &[])]);
    assert!(summary.is_clean());
    assert!(!integrity.exists());
    assert!(!summary.written.contains(&integrity));
}

#[test]
fn run_log_keeps_earlier_runs() {
    let out = tempfile::tempdir().expect("tempdir");
    let results = out.path().join("results");

    writeln!(open_run_log(&results).expect("first open"), "first run").expect("write");
    writeln!(open_run_log(&results).expect("second open"), "second run").expect("write");

    let log = fs::read_to_string(results.join(LOG_FILE)).expect("read log");
    assert_eq!(log, "first run\nsecond run\n");
}
