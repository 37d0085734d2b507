//! Run configuration model.
//!
//! Loaded hierarchically by the config loader (defaults, project file, local
//! overrides, environment) and validated before a run starts.

use serde::{Deserialize, Serialize};

use super::coverage::{CoverageFormat, CoverageGate};

/// Main configuration structure for covlift.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Config {
    /// Target project: what to run and where coverage lands.
    #[serde(default)]
    pub project: ProjectConfig,

    /// Coverage goal and iteration budget.
    #[serde(default)]
    pub goal: GoalConfig,

    /// Subprocess runner settings.
    #[serde(default)]
    pub runner: RunnerConfig,

    /// Generation oracle settings.
    #[serde(default)]
    pub oracle: OracleConfig,

    /// Insertion resolver settings.
    #[serde(default)]
    pub resolver: ResolverConfig,

    /// Attempt ledger settings.
    #[serde(default)]
    pub ledger: LedgerConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// The project under test.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ProjectConfig {
    /// Test file that accepted candidates are spliced into.
    #[serde(default)]
    pub test_file: String,

    /// Command that runs the suite and writes coverage artifacts.
    #[serde(default)]
    pub test_command: String,

    /// Working directory for the test command.
    #[serde(default = "default_test_command_dir")]
    pub test_command_dir: String,

    /// Coverage report file(s) produced by one run. Multi-module suites
    /// list one path per module; they are unioned per measurement.
    #[serde(default)]
    pub report_paths: Vec<String>,

    /// Declared format of the coverage reports.
    #[serde(default)]
    pub coverage_format: CoverageFormat,

    /// Optional substring filter: only report entries whose recorded source
    /// path contains this string count toward the line space.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_filter: Option<String>,
}

fn default_test_command_dir() -> String {
    ".".to_string()
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            test_file: String::new(),
            test_command: String::new(),
            test_command_dir: default_test_command_dir(),
            report_paths: vec![],
            coverage_format: CoverageFormat::default(),
            file_filter: None,
        }
    }
}

/// Coverage goal and iteration budget.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct GoalConfig {
    /// Target coverage percentage in `(0, 100]`.
    #[serde(default = "default_desired_coverage")]
    pub desired_coverage: f64,

    /// Maximum iterations of the generate-validate loop.
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,

    /// Wall-clock budget for the whole run, in seconds.
    #[serde(default = "default_max_run_time_sec")]
    pub max_run_time_sec: u64,

    /// Maximum candidates requested from the oracle per iteration.
    #[serde(default = "default_max_tests_per_run")]
    pub max_tests_per_run: u32,

    /// Times the suite is re-run per candidate; a flaky pass is a rejection.
    #[serde(default = "default_runs_per_candidate")]
    pub runs_per_candidate: u32,

    /// Acceptance policy for a passing candidate's coverage delta.
    #[serde(default)]
    pub coverage_gate: CoverageGate,

    /// When true, a run that misses the target exits nonzero.
    #[serde(default)]
    pub strict_coverage: bool,
}

fn default_desired_coverage() -> f64 {
    80.0
}

const fn default_max_iterations() -> u32 {
    5
}

const fn default_max_run_time_sec() -> u64 {
    1800
}

const fn default_max_tests_per_run() -> u32 {
    4
}

const fn default_runs_per_candidate() -> u32 {
    1
}

impl Default for GoalConfig {
    fn default() -> Self {
        Self {
            desired_coverage: default_desired_coverage(),
            max_iterations: default_max_iterations(),
            max_run_time_sec: default_max_run_time_sec(),
            max_tests_per_run: default_max_tests_per_run(),
            runs_per_candidate: default_runs_per_candidate(),
            coverage_gate: CoverageGate::default(),
            strict_coverage: false,
        }
    }
}

/// Subprocess runner settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct RunnerConfig {
    /// Per-invocation timeout in seconds; the child is killed on expiry.
    #[serde(default = "default_runner_timeout_sec")]
    pub timeout_sec: u64,
}

const fn default_runner_timeout_sec() -> u64 {
    300
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            timeout_sec: default_runner_timeout_sec(),
        }
    }
}

/// Generation oracle settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct OracleConfig {
    /// Endpoint the HTTP oracle adapter POSTs generation requests to.
    #[serde(default = "default_oracle_endpoint")]
    pub endpoint: String,

    /// Request timeout in seconds.
    #[serde(default = "default_oracle_timeout_sec")]
    pub request_timeout_sec: u64,

    /// How many recent failed attempts to include in the generation context.
    #[serde(default = "default_failed_attempts_in_context")]
    pub failed_attempts_in_context: usize,

    /// Retry policy for transient oracle failures.
    #[serde(default)]
    pub retry: RetryConfig,
}

fn default_oracle_endpoint() -> String {
    "http://localhost:8700/v1/generate".to_string()
}

const fn default_oracle_timeout_sec() -> u64 {
    120
}

const fn default_failed_attempts_in_context() -> usize {
    10
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            endpoint: default_oracle_endpoint(),
            request_timeout_sec: default_oracle_timeout_sec(),
            failed_attempts_in_context: default_failed_attempts_in_context(),
            retry: RetryConfig::default(),
        }
    }
}

/// Bounded-retry policy with exponential backoff.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct RetryConfig {
    /// Maximum retries before the failure is surfaced.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Initial backoff duration in milliseconds.
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,

    /// Maximum backoff duration in milliseconds.
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
}

const fn default_max_retries() -> u32 {
    3
}

const fn default_initial_backoff_ms() -> u64 {
    10_000
}

const fn default_max_backoff_ms() -> u64 {
    300_000
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            initial_backoff_ms: default_initial_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
        }
    }
}

/// Insertion resolver settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ResolverConfig {
    /// Minimum similarity ratio for a hint (or neighbor) to be trusted.
    #[serde(default = "default_min_similarity")]
    pub min_similarity: f64,

    /// Lines searched above and below a rejected hint.
    #[serde(default = "default_neighborhood_lines")]
    pub neighborhood_lines: u32,

    /// Characters of each compared string considered by the similarity
    /// metric; caps cost on pathological lines.
    #[serde(default = "default_comparison_prefix")]
    pub comparison_prefix: usize,
}

fn default_min_similarity() -> f64 {
    0.8
}

const fn default_neighborhood_lines() -> u32 {
    10
}

const fn default_comparison_prefix() -> usize {
    200
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            min_similarity: default_min_similarity(),
            neighborhood_lines: default_neighborhood_lines(),
            comparison_prefix: default_comparison_prefix(),
        }
    }
}

/// Attempt ledger settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LedgerConfig {
    /// Path to the SQLite ledger database.
    #[serde(default = "default_ledger_path")]
    pub path: String,
}

fn default_ledger_path() -> String {
    ".covlift/attempts.db".to_string()
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            path: default_ledger_path(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: json or pretty.
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let config = Config::default();
        assert!((config.goal.desired_coverage - 80.0).abs() < f64::EPSILON);
        assert_eq!(config.goal.max_iterations, 5);
        assert_eq!(config.goal.runs_per_candidate, 1);
        assert_eq!(config.runner.timeout_sec, 300);
        assert!(config.resolver.min_similarity > 0.0);
        assert!(config.oracle.retry.initial_backoff_ms < config.oracle.retry.max_backoff_ms);
    }

    #[test]
    fn partial_yaml_fills_defaults() {
        let yaml = r"
goal:
  desired_coverage: 65.5
project:
  test_command: cargo test
";
        let config: Config = serde_yaml::from_str(yaml).expect("parse");
        assert!((config.goal.desired_coverage - 65.5).abs() < f64::EPSILON);
        assert_eq!(config.goal.max_iterations, 5);
        assert_eq!(config.project.test_command, "cargo test");
        assert_eq!(config.project.test_command_dir, ".");
    }
}
