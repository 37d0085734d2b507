//! Candidate validation state machine.
//!
//! One validator drives one candidate through
//! `PENDING → APPLIED → RUN → {PASSED, FAILED, TIMED_OUT, CRASHED} →
//! {ACCEPTED, ROLLED_BACK}` and produces exactly one [`AttemptRecord`].
//!
//! The test file is the single shared mutable resource: the validator holds
//! exclusive write access for the duration of the attempt, and every rejected
//! candidate restores the file byte-for-byte before control returns.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use chrono::Utc;
use tracing::{debug, info, instrument, warn};

use crate::domain::models::{
    AttemptOutcome, AttemptRecord, CandidateTest, CoverageGate, CoverageReport, InsertionPoint,
    RunVerdict,
};
use crate::domain::ports::{RunnerError, TestRunner};
use crate::services::coverage_processor::CoverageProcessor;
use crate::services::insertion_resolver::InsertionResolver;

/// Output markers that indicate a build/import failure rather than a failing
/// assertion. Checked before the generic failure classification.
const COMPILE_MARKERS: &[&str] = &[
    "error[E",
    "compilation failed",
    "could not compile",
    "SyntaxError",
    "IndentationError",
    "ImportError",
    "ModuleNotFoundError",
];

/// Exclusive handle to the shared test file for the duration of an attempt.
///
/// Owned by the iteration controller and lent to the validator, so ownership
/// of the mutable file state stays in one place.
pub struct TestFileHandle {
    path: PathBuf,
}

impl TestFileHandle {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn read(&self) -> std::io::Result<String> {
        std::fs::read_to_string(&self.path)
    }

    fn write(&self, text: &str) -> std::io::Result<()> {
        std::fs::write(&self.path, text)
    }
}

/// Environment failures that invalidate the whole run, not just one attempt.
#[derive(Debug, Clone)]
pub enum FatalReason {
    /// The test command could not be launched; no further measurement from
    /// this environment can be trusted.
    RunnerInfrastructure(String),
}

/// Result of validating one candidate.
pub struct ValidationOutcome {
    /// The record to append to the ledger.
    pub record: AttemptRecord,
    /// New baseline coverage when the candidate was accepted.
    pub new_baseline: Option<CoverageReport>,
    /// Set when the environment broke during the attempt; the controller
    /// must stop the run after recording the attempt.
    pub fatal: Option<FatalReason>,
}

/// Settings the validator needs for one run.
#[derive(Debug, Clone)]
pub struct ValidatorSettings {
    pub test_command: String,
    pub test_command_dir: String,
    pub report_paths: Vec<String>,
    pub run_timeout: Duration,
    /// Times the suite must pass before coverage is even measured.
    pub runs_per_candidate: u32,
    pub coverage_gate: CoverageGate,
}

/// Validates candidates one at a time against the real suite.
pub struct CandidateValidator {
    runner: Arc<dyn TestRunner>,
    processor: Arc<CoverageProcessor>,
    resolver: InsertionResolver,
    settings: ValidatorSettings,
}

impl CandidateValidator {
    pub fn new(
        runner: Arc<dyn TestRunner>,
        processor: Arc<CoverageProcessor>,
        resolver: InsertionResolver,
        settings: ValidatorSettings,
    ) -> Self {
        Self {
            runner,
            processor,
            resolver,
            settings,
        }
    }

    /// Drive one candidate through the full apply-run-decide sequence.
    ///
    /// `precheck_failure` carries the result of the concurrent syntactic
    /// pre-check; a failed pre-check short-circuits to `RejectedCompile`
    /// without touching the file.
    #[instrument(skip_all, fields(candidate_id = %candidate.id))]
    pub async fn validate(
        &self,
        test_file: &TestFileHandle,
        baseline: &CoverageReport,
        candidate: &CandidateTest,
        precheck_failure: Option<String>,
    ) -> Result<ValidationOutcome, std::io::Error> {
        if let Some(reason) = precheck_failure {
            debug!(reason = %reason, "Candidate rejected by syntactic pre-check");
            return Ok(Self::outcome(
                candidate,
                baseline,
                None,
                AttemptOutcome::RejectedCompile,
                None,
                None,
                0.0,
                Some(reason),
                None,
                None,
            ));
        }

        // PENDING -> APPLIED: resolve the insertion point against the file as
        // it exists right now, then splice into it. The original content is
        // kept in memory for byte-for-byte rollback.
        let original = test_file.read()?;

        let point = match self.resolver.resolve(&original, &candidate.hint) {
            Ok(point) => point,
            Err(err) => {
                warn!(error = %err, "Insertion point could not be resolved; skipping candidate");
                return Ok(Self::outcome(
                    candidate,
                    baseline,
                    None,
                    AttemptOutcome::Error,
                    None,
                    None,
                    0.0,
                    Some(err.to_string()),
                    None,
                    None,
                ));
            }
        };

        let mutated = splice(&original, &point, &candidate.source_text);
        test_file.write(&mutated)?;

        // APPLIED -> RUN -> verdict. The suite may be required to pass more
        // than once; any non-pass classifies the candidate immediately.
        let run_started = SystemTime::now();
        let mut total_duration = 0.0_f64;
        let mut last_exit_code: Option<i32> = None;
        let mut verdict = RunVerdict::Passed;
        let mut failure_output: Option<String> = None;
        let mut fatal: Option<FatalReason> = None;

        for round in 0..self.settings.runs_per_candidate {
            let run = self
                .runner
                .run(
                    &self.settings.test_command,
                    &self.settings.test_command_dir,
                    self.settings.run_timeout,
                )
                .await;

            match run {
                Err(RunnerError::Infrastructure(reason)) => {
                    verdict = RunVerdict::Crashed;
                    fatal = Some(FatalReason::RunnerInfrastructure(reason.clone()));
                    failure_output = Some(reason);
                    break;
                }
                Ok(output) => {
                    total_duration += output.duration_sec;
                    last_exit_code = output.exit_code;

                    if output.timed_out {
                        verdict = RunVerdict::TimedOut;
                        failure_output = Some(output.combined_output());
                        break;
                    }

                    let combined = output.combined_output();
                    let failed = output.exit_code != Some(0)
                        || combined.contains("AssertionError")
                        || combined.contains("test result: FAILED");
                    if failed {
                        verdict = RunVerdict::Failed;
                        failure_output = Some(combined);
                        break;
                    }

                    debug!(round = round + 1, "Suite passed");
                }
            }
        }

        // Anything but PASSED rolls the file back and records the outcome.
        if verdict != RunVerdict::Passed {
            test_file.write(&original)?;
            let outcome = match verdict {
                RunVerdict::TimedOut => AttemptOutcome::RejectedTimeout,
                RunVerdict::Crashed => AttemptOutcome::Error,
                _ => classify_failure(failure_output.as_deref().unwrap_or_default()),
            };
            info!(outcome = outcome.as_str(), "Candidate rejected");
            return Ok(Self::outcome(
                candidate,
                baseline,
                Some(point),
                outcome,
                None,
                last_exit_code,
                total_duration,
                failure_output.map(|o| AttemptRecord::summarize_failure(&o)),
                None,
                fatal,
            ));
        }

        // PASSED: re-measure coverage and apply the acceptance gate. A broken
        // or missing report after a passing run is recovered locally as a
        // rejection; only the baseline measurement is allowed to be fatal.
        let after = match self.processor.parse(
            &self.settings.report_paths,
            total_duration,
            Some(run_started),
        ) {
            Ok(report) => report,
            Err(err) => {
                warn!(error = %err, "Coverage re-measure failed after passing run");
                test_file.write(&original)?;
                return Ok(Self::outcome(
                    candidate,
                    baseline,
                    Some(point),
                    AttemptOutcome::RejectedFail,
                    None,
                    last_exit_code,
                    total_duration,
                    Some(err.to_string()),
                    None,
                    None,
                ));
            }
        };

        if self.settings.coverage_gate.accepts(baseline, &after) {
            info!(
                before = baseline.percentage,
                after = after.percentage,
                "Candidate accepted"
            );
            Ok(Self::outcome(
                candidate,
                baseline,
                Some(point),
                AttemptOutcome::Accepted,
                Some(after.clone()),
                last_exit_code,
                total_duration,
                None,
                Some(after),
                None,
            ))
        } else {
            info!(
                before = baseline.percentage,
                after = after.percentage,
                "Candidate passed but produced no qualifying gain"
            );
            test_file.write(&original)?;
            Ok(Self::outcome(
                candidate,
                baseline,
                Some(point),
                AttemptOutcome::RejectedNoGain,
                Some(after),
                last_exit_code,
                total_duration,
                None,
                None,
                None,
            ))
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn outcome(
        candidate: &CandidateTest,
        baseline: &CoverageReport,
        insertion_point: Option<InsertionPoint>,
        outcome: AttemptOutcome,
        coverage_after: Option<CoverageReport>,
        runner_exit_code: Option<i32>,
        runner_duration_sec: f64,
        failure_summary: Option<String>,
        new_baseline: Option<CoverageReport>,
        fatal: Option<FatalReason>,
    ) -> ValidationOutcome {
        ValidationOutcome {
            record: AttemptRecord {
                candidate_id: candidate.id.clone(),
                insertion_point,
                outcome,
                coverage_before: baseline.clone(),
                coverage_after,
                runner_exit_code,
                runner_duration_sec,
                failure_summary,
                timestamp: Utc::now(),
            },
            new_baseline,
            fatal,
        }
    }
}

/// Splice candidate code into `original` after the resolved line, applying
/// the resolved indentation to every non-blank inserted line.
pub fn splice(original: &str, point: &InsertionPoint, source_text: &str) -> String {
    let mut lines: Vec<String> = original.lines().map(ToString::to_string).collect();
    let at = (point.line_number as usize).min(lines.len());

    let mut block: Vec<String> = vec![String::new()];
    for line in source_text.lines() {
        if line.trim().is_empty() {
            block.push(String::new());
        } else {
            block.push(format!("{}{}", point.indentation, line));
        }
    }

    lines.splice(at..at, block);
    let mut result = lines.join("\n");
    if original.ends_with('\n') {
        result.push('\n');
    }
    result
}

/// Decide `RejectedCompile` vs `RejectedFail` from runner output.
fn classify_failure(output: &str) -> AttemptOutcome {
    if COMPILE_MARKERS.iter().any(|m| output.contains(m)) {
        AttemptOutcome::RejectedCompile
    } else {
        AttemptOutcome::RejectedFail
    }
}

/// Cheap syntactic well-formedness check, safe to run concurrently for a
/// whole batch since it only reads the candidate.
///
/// Catches the decode garbage that would waste a full suite run: empty
/// bodies and unbalanced brackets outside string literals.
pub fn syntactic_precheck(candidate: &CandidateTest) -> Result<(), String> {
    if candidate.source_text.trim().is_empty() {
        return Err("candidate has no source text".to_string());
    }

    let mut stack: Vec<char> = Vec::new();
    let mut in_string: Option<char> = None;
    let mut escaped = false;

    for c in candidate.source_text.chars() {
        if let Some(quote) = in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == quote || c == '\n' {
                in_string = None;
            }
            continue;
        }
        match c {
            '"' | '\'' => in_string = Some(c),
            '(' | '[' | '{' => stack.push(c),
            ')' | ']' | '}' => {
                let expected = match c {
                    ')' => '(',
                    ']' => '[',
                    _ => '{',
                };
                if stack.pop() != Some(expected) {
                    return Err(format!("unbalanced '{c}' in candidate source"));
                }
            }
            _ => {}
        }
    }

    if let Some(open) = stack.last() {
        return Err(format!("unclosed '{open}' in candidate source"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::InsertionHint;

    fn candidate(source: &str) -> CandidateTest {
        CandidateTest {
            id: "c1".into(),
            source_text: source.into(),
            rationale: None,
            hint: InsertionHint {
                line: 1,
                indentation: String::new(),
                context: String::new(),
            },
        }
    }

    #[test]
    fn splice_inserts_after_line_with_indentation() {
        let original = "class TestSuite:\n    def test_a(self):\n        pass\n";
        let point = InsertionPoint {
            line_number: 3,
            indentation: "    ".into(),
            confidence: 1.0,
        };
        let result = splice(original, &point, "def test_b(self):\n    assert True");

        assert_eq!(
            result,
            "class TestSuite:\n    def test_a(self):\n        pass\n\n    def test_b(self):\n        assert True\n"
        );
    }

    #[test]
    fn splice_preserves_missing_trailing_newline() {
        let original = "line one";
        let point = InsertionPoint {
            line_number: 1,
            indentation: String::new(),
            confidence: 1.0,
        };
        let result = splice(original, &point, "line two");
        assert_eq!(result, "line one\n\nline two");
    }

    #[test]
    fn splice_keeps_blank_candidate_lines_unindented() {
        let point = InsertionPoint {
            line_number: 1,
            indentation: "  ".into(),
            confidence: 1.0,
        };
        let result = splice("top\n", &point, "a\n\nb");
        assert_eq!(result, "top\n\n  a\n\n  b\n");
    }

    #[test]
    fn precheck_accepts_reasonable_code() {
        assert!(syntactic_precheck(&candidate("def test_x():\n    assert f(1) == [2]")).is_ok());
    }

    #[test]
    fn precheck_rejects_empty_source() {
        assert!(syntactic_precheck(&candidate("   \n  ")).is_err());
    }

    #[test]
    fn precheck_rejects_unbalanced_brackets() {
        assert!(syntactic_precheck(&candidate("def test_x():\n    assert f(1 == 2")).is_err());
        assert!(syntactic_precheck(&candidate("fn t() { assert!(x); ")).is_err());
        assert!(syntactic_precheck(&candidate("assert x)")).is_err());
    }

    #[test]
    fn precheck_ignores_brackets_inside_strings() {
        assert!(syntactic_precheck(&candidate("assert f(\"(\") == \"[\"")).is_ok());
    }

    #[test]
    fn classify_failure_spots_compile_errors() {
        assert_eq!(
            classify_failure("error[E0425]: cannot find value `x`"),
            AttemptOutcome::RejectedCompile
        );
        assert_eq!(
            classify_failure("SyntaxError: invalid syntax"),
            AttemptOutcome::RejectedCompile
        );
        assert_eq!(
            classify_failure("test result: FAILED. 1 passed; 1 failed"),
            AttemptOutcome::RejectedFail
        );
    }
}
