#![cfg(unix)]

use std::{
    fs,
    os::unix::fs::PermissionsExt,
    path::{Path, PathBuf},
};

use gradebatch::{
    config::Config,
    detection::{DetectionAdapter, DetectionError},
    types::{RiskLevel, Submission},
};

/// Writes an executable shell script and returns its path.
fn script(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, format!("#!/bin/sh\n{body}\n")).expect("write script");
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).expect("chmod");
    path
}

/// Shell snippet that writes `json` to the path following `--output`.
fn writes_report(json: &str) -> String {
    format!(
        r#"out=""
while [ "$#" -gt 0 ]; do
  if [ "$1" = "--output" ]; then out="$2"; fi
  shift
done
cat > "$out" <<'JSON'
{json}
JSON"#
    )
}

fn adapter(command: &Path, timeout_seconds: u64, scratch: &Path) -> DetectionAdapter {
    let mut config = Config::default();
    config.detection.command = command.to_string_lossy().into_owned();
    config.processing.timeout_seconds = timeout_seconds;
    DetectionAdapter::new(&config.detection, &config.processing, scratch)
}

fn submission(dir: &Path) -> Submission {
    Submission::builder()
        .student_id("s7_lee_kim")
        .student_name("lee kim")
        .path(dir.join("s7_lee_kim"))
        .build()
}

#[tokio::test]
async fn detector_report_is_parsed() {
    let dir = tempfile::tempdir().expect("tempdir");
    let cmd = script(
        dir.path(),
        "detector.sh",
        &writes_report(
            r#"{"metadata":{"aiDetection":{"isAIGenerated":true,"confidenceScore":0.95,"patternsDetected":4,"highConfidencePatterns":2,"analysisTime":120}}}"#,
        ),
    );

    let result = adapter(&cmd, 30, dir.path())
        .detect(&submission(dir.path()))
        .await
        .expect("a verdict");

    assert!(result.flagged);
    assert_eq!(result.confidence, 0.95);
    assert_eq!(result.risk_level, RiskLevel::Critical);
    assert_eq!(result.pattern_count, 4);
    assert_eq!(result.high_confidence_pattern_count, 2);
    assert_eq!(result.analysis_duration, 120);
}

#[tokio::test]
async fn non_zero_exit_with_report_still_counts() {
    let dir = tempfile::tempdir().expect("tempdir");
    let body = format!(
        "{}\nexit 3",
        writes_report(r#"{"metadata":{"aiDetection":{"confidenceScore":0.61}}}"#)
    );
    let cmd = script(dir.path(), "detector.sh", &body);

    let result = adapter(&cmd, 30, dir.path())
        .detect(&submission(dir.path()))
        .await
        .expect("a verdict");
    assert!(!result.flagged);
    assert_eq!(result.risk_level, RiskLevel::Medium);
}

#[tokio::test]
async fn slow_detector_times_out() {
    let dir = tempfile::tempdir().expect("tempdir");
    let cmd = script(dir.path(), "slow.sh", "exec sleep 10");
    let adapter = adapter(&cmd, 1, dir.path());
    let sub = submission(dir.path());

    let started = std::time::Instant::now();
    let err = adapter.try_detect(&sub).await.unwrap_err();
    assert!(matches!(err, DetectionError::TimedOut(_)), "{err}");
    assert!(started.elapsed().as_secs() < 8);

    assert!(adapter.detect(&sub).await.is_none());
}

#[tokio::test]
async fn detector_without_output_yields_nothing() {
    let dir = tempfile::tempdir().expect("tempdir");
    let cmd = script(dir.path(), "silent.sh", "echo 'analysis failed' >&2\nexit 1");
    let adapter = adapter(&cmd, 30, dir.path());
    let sub = submission(dir.path());

    match adapter.try_detect(&sub).await {
        Err(DetectionError::MissingOutput { stderr, .. }) => {
            assert_eq!(stderr, "analysis failed")
        }
        other => panic!("unexpected: {other:?}"),
    }
    assert!(adapter.detect(&sub).await.is_none());
}

#[tokio::test]
async fn garbage_report_yields_nothing() {
    let dir = tempfile::tempdir().expect("tempdir");
    let cmd = script(dir.path(), "garbage.sh", &writes_report("not json at all"));
    let adapter = adapter(&cmd, 30, dir.path());

    let err = adapter
        .try_detect(&submission(dir.path()))
        .await
        .unwrap_err();
    assert!(matches!(err, DetectionError::Parse { .. }));
}

#[tokio::test]
async fn unknown_command_yields_nothing() {
    let dir = tempfile::tempdir().expect("tempdir");
    let adapter = adapter(&dir.path().join("does-not-exist"), 30, dir.path());

    let err = adapter
        .try_detect(&submission(dir.path()))
        .await
        .unwrap_err();
    assert!(matches!(err, DetectionError::ExecutableNotFound { .. }));
}

#[tokio::test]
async fn disabled_detection_never_runs() {
    let dir = tempfile::tempdir().expect("tempdir");
    let marker = dir.path().join("ran");
    let cmd = script(
        dir.path(),
        "detector.sh",
        &format!("touch '{}'", marker.display()),
    );

    let mut config = Config::default();
    config.detection.enabled = false;
    config.detection.command = cmd.to_string_lossy().into_owned();
    let adapter = DetectionAdapter::new(&config.detection, &config.processing, dir.path());

    assert!(adapter.detect(&submission(dir.path())).await.is_none());
    assert!(!marker.exists());
}
