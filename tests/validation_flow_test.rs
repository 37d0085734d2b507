//! Integration tests for the candidate validation state machine, using real
//! subprocesses and real coverage artifacts on disk.

mod common;

use std::time::Duration;

use common::{baseline_report, candidate, lost_candidate, Project, TEST_FILE_CONTENT};
use covlift::domain::models::AttemptOutcome;
use covlift::services::candidate_validator::TestFileHandle;

#[tokio::test]
async fn passing_candidate_with_gain_is_accepted() {
    let project = Project::new();
    let validator = project.validator(&project.accepting_command(), Duration::from_secs(30));
    let handle = TestFileHandle::new(project.test_file_path());

    let outcome = validator
        .validate(&handle, &baseline_report(), &candidate("cand-1"), None)
        .await
        .expect("validate");

    assert_eq!(outcome.record.outcome, AttemptOutcome::Accepted);
    assert!((outcome.record.coverage_before.percentage - 40.0).abs() < 1e-9);
    let after = outcome.record.coverage_after.as_ref().expect("after");
    assert!((after.percentage - 60.0).abs() < 1e-9);

    // The accepted candidate stays in the file and becomes the new baseline.
    let new_baseline = outcome.new_baseline.expect("new baseline");
    assert!((new_baseline.percentage - 60.0).abs() < 1e-9);
    let content = handle.read().expect("read");
    assert!(content.contains("def test_two"));
    assert!(outcome.fatal.is_none());
}

#[tokio::test]
async fn failing_candidate_is_rejected_and_rolled_back() {
    let project = Project::new();
    let validator = project.validator(&project.failing_command(), Duration::from_secs(30));
    let handle = TestFileHandle::new(project.test_file_path());

    let outcome = validator
        .validate(&handle, &baseline_report(), &candidate("cand-1"), None)
        .await
        .expect("validate");

    assert_eq!(outcome.record.outcome, AttemptOutcome::RejectedFail);
    assert_eq!(outcome.record.runner_exit_code, Some(1));
    assert!(outcome.new_baseline.is_none());
    assert!(outcome
        .record
        .failure_summary
        .as_ref()
        .expect("summary")
        .contains("AssertionError"));

    // Byte-identical restore.
    assert_eq!(handle.read().expect("read"), TEST_FILE_CONTENT);
}

#[tokio::test]
async fn passing_candidate_without_gain_is_rejected() {
    let project = Project::new();
    let validator = project.validator(&project.no_gain_command(), Duration::from_secs(30));
    let handle = TestFileHandle::new(project.test_file_path());

    let outcome = validator
        .validate(&handle, &baseline_report(), &candidate("cand-1"), None)
        .await
        .expect("validate");

    assert_eq!(outcome.record.outcome, AttemptOutcome::RejectedNoGain);
    // Coverage was measured and recorded even though the candidate lost.
    let after = outcome.record.coverage_after.as_ref().expect("after");
    assert!((after.percentage - 40.0).abs() < 1e-9);
    assert_eq!(handle.read().expect("read"), TEST_FILE_CONTENT);
}

#[tokio::test]
async fn tie_is_accepted_under_no_regression_gate() {
    let project = Project::new();
    let validator = project.validator_with_gate(
        &project.no_gain_command(),
        Duration::from_secs(30),
        covlift::CoverageGate::NoRegression,
    );
    let handle = TestFileHandle::new(project.test_file_path());

    let outcome = validator
        .validate(&handle, &baseline_report(), &candidate("cand-1"), None)
        .await
        .expect("validate");

    assert_eq!(outcome.record.outcome, AttemptOutcome::Accepted);
    assert!(handle.read().expect("read").contains("def test_two"));
}

#[tokio::test]
async fn hanging_suite_times_out_and_rolls_back() {
    let project = Project::new();
    let validator = project.validator(&project.hanging_command(), Duration::from_millis(300));
    let handle = TestFileHandle::new(project.test_file_path());

    let outcome = validator
        .validate(&handle, &baseline_report(), &candidate("cand-1"), None)
        .await
        .expect("validate");

    assert_eq!(outcome.record.outcome, AttemptOutcome::RejectedTimeout);
    assert_eq!(outcome.record.runner_exit_code, None);
    assert!(outcome.fatal.is_none());
    assert_eq!(handle.read().expect("read"), TEST_FILE_CONTENT);
}

#[tokio::test]
async fn unresolvable_hint_skips_without_touching_the_file() {
    let project = Project::new();
    let validator = project.validator(&project.accepting_command(), Duration::from_secs(30));
    let handle = TestFileHandle::new(project.test_file_path());

    let outcome = validator
        .validate(&handle, &baseline_report(), &lost_candidate("cand-1"), None)
        .await
        .expect("validate");

    assert_eq!(outcome.record.outcome, AttemptOutcome::Error);
    assert!(outcome.record.insertion_point.is_none());
    // The resolver refused before any mutation happened.
    assert_eq!(handle.read().expect("read"), TEST_FILE_CONTENT);
}

#[tokio::test]
async fn precheck_failure_short_circuits_to_rejected_compile() {
    let project = Project::new();
    let validator = project.validator(&project.accepting_command(), Duration::from_secs(30));
    let handle = TestFileHandle::new(project.test_file_path());

    let outcome = validator
        .validate(
            &handle,
            &baseline_report(),
            &candidate("cand-1"),
            Some("unbalanced '(' in candidate source".to_string()),
        )
        .await
        .expect("validate");

    assert_eq!(outcome.record.outcome, AttemptOutcome::RejectedCompile);
    // No run was launched, no mutation happened.
    assert_eq!(outcome.record.runner_exit_code, None);
    assert_eq!(handle.read().expect("read"), TEST_FILE_CONTENT);
}

#[tokio::test]
async fn unlaunchable_runner_is_fatal_but_still_recorded() {
    let project = Project::new();
    let mut validator_project_dir = project.dir_string();
    validator_project_dir.push_str("/no/such/subdir");

    let validator = covlift::services::candidate_validator::CandidateValidator::new(
        std::sync::Arc::new(covlift::infrastructure::runner::ShellRunner::new()),
        std::sync::Arc::new(covlift::services::CoverageProcessor::new(
            covlift::CoverageFormat::Lcov,
            None,
        )),
        covlift::services::InsertionResolver::new(Default::default()),
        covlift::services::candidate_validator::ValidatorSettings {
            test_command: "true".to_string(),
            test_command_dir: validator_project_dir,
            report_paths: vec![project.report_path()],
            run_timeout: Duration::from_secs(5),
            runs_per_candidate: 1,
            coverage_gate: covlift::CoverageGate::StrictIncrease,
        },
    );
    let handle = TestFileHandle::new(project.test_file_path());

    let outcome = validator
        .validate(&handle, &baseline_report(), &candidate("cand-1"), None)
        .await
        .expect("validate");

    assert_eq!(outcome.record.outcome, AttemptOutcome::Error);
    assert!(outcome.fatal.is_some());
    assert_eq!(handle.read().expect("read"), TEST_FILE_CONTENT);
}

#[tokio::test]
async fn missing_report_after_passing_run_is_recovered_as_rejection() {
    let project = Project::new();
    // Suite passes but never writes cov.info.
    let validator = project.validator("true", Duration::from_secs(30));
    let handle = TestFileHandle::new(project.test_file_path());

    let outcome = validator
        .validate(&handle, &baseline_report(), &candidate("cand-1"), None)
        .await
        .expect("validate");

    assert_eq!(outcome.record.outcome, AttemptOutcome::RejectedFail);
    assert!(outcome.fatal.is_none());
    assert_eq!(handle.read().expect("read"), TEST_FILE_CONTENT);
}
