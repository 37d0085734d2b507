//! Shared fixtures for integration tests.
//!
//! Builds a throwaway "project" in a temp directory: a small test file the
//! candidates are spliced into, and canned LCOV reports the fake test
//! commands copy into place so coverage genuinely depends on what the test
//! file contains at run time.

#![allow(dead_code)]

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;

use covlift::domain::models::{
    CandidateTest, CoverageGate, CoverageReport, InsertionHint, ResolverConfig,
};
use covlift::infrastructure::runner::ShellRunner;
use covlift::services::candidate_validator::{CandidateValidator, ValidatorSettings};
use covlift::services::{CoverageProcessor, InsertionResolver};
use covlift::CoverageFormat;

pub const TEST_FILE: &str = "tests_app.py";
pub const TEST_FILE_CONTENT: &str = "def test_one():\n    assert True\n";

/// A temp project with a test file and canned coverage reports.
pub struct Project {
    pub dir: TempDir,
}

impl Project {
    pub fn new() -> Self {
        let dir = TempDir::new().expect("temp project dir");

        std::fs::write(dir.path().join(TEST_FILE), TEST_FILE_CONTENT).expect("test file");
        std::fs::write(dir.path().join("baseline.lcov"), lcov(4)).expect("baseline report");
        std::fs::write(dir.path().join("improved.lcov"), lcov(6)).expect("improved report");

        Self { dir }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn dir_string(&self) -> String {
        self.path().display().to_string()
    }

    pub fn test_file_path(&self) -> PathBuf {
        self.path().join(TEST_FILE)
    }

    pub fn report_path(&self) -> String {
        self.path().join("cov.info").display().to_string()
    }

    /// Suite passes; coverage improves iff the candidate landed in the file.
    pub fn accepting_command(&self) -> String {
        format!(
            "grep -q test_two {TEST_FILE} && cp improved.lcov cov.info || cp baseline.lcov cov.info"
        )
    }

    /// Suite fails (with an assertion marker) iff the candidate landed.
    pub fn failing_command(&self) -> String {
        format!(
            "if grep -q test_two {TEST_FILE}; then echo 'AssertionError: boom'; exit 1; else cp baseline.lcov cov.info; fi"
        )
    }

    /// Suite always passes with unchanged coverage.
    pub fn no_gain_command(&self) -> String {
        "cp baseline.lcov cov.info".to_string()
    }

    /// Suite hangs until killed.
    pub fn hanging_command(&self) -> String {
        "sleep 600".to_string()
    }

    pub fn validator(&self, command: &str, timeout: Duration) -> CandidateValidator {
        self.validator_with_gate(command, timeout, CoverageGate::StrictIncrease)
    }

    pub fn validator_with_gate(
        &self,
        command: &str,
        timeout: Duration,
        gate: CoverageGate,
    ) -> CandidateValidator {
        CandidateValidator::new(
            Arc::new(ShellRunner::new()),
            Arc::new(CoverageProcessor::new(CoverageFormat::Lcov, None)),
            InsertionResolver::new(ResolverConfig::default()),
            ValidatorSettings {
                test_command: command.to_string(),
                test_command_dir: self.dir_string(),
                report_paths: vec![self.report_path()],
                run_timeout: timeout,
                runs_per_candidate: 1,
                coverage_gate: gate,
            },
        )
    }
}

/// LCOV report over app.py lines 1..=10 with the first `covered` lines hit.
pub fn lcov(covered: u32) -> String {
    let mut out = String::from("SF:app.py\n");
    for line in 1..=10 {
        let hits = u32::from(line <= covered);
        out.push_str(&format!("DA:{line},{hits}\n"));
    }
    out.push_str("end_of_record\n");
    out
}

/// Baseline coverage matching `baseline.lcov`: lines {1,2,3,4} of {1..10}.
pub fn baseline_report() -> CoverageReport {
    CoverageReport::from_lines(
        (1..=4).collect::<BTreeSet<_>>(),
        (1..=10).collect::<BTreeSet<_>>(),
        1.0,
    )
    .expect("baseline")
}

/// A well-formed candidate whose hint matches line 2 of the test file.
pub fn candidate(id: &str) -> CandidateTest {
    CandidateTest {
        id: id.to_string(),
        source_text: "def test_two():\n    assert True".to_string(),
        rationale: None,
        hint: InsertionHint {
            line: 2,
            indentation: String::new(),
            context: "    assert True".to_string(),
        },
    }
}

/// A candidate whose hint context matches nothing in the test file.
pub fn lost_candidate(id: &str) -> CandidateTest {
    CandidateTest {
        hint: InsertionHint {
            line: 2,
            indentation: String::new(),
            context: "class SomethingEntirelyUnrelated(unittest.TestCase):".to_string(),
        },
        ..candidate(id)
    }
}
