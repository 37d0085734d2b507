use anyhow::{Context, Result};
use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use thiserror::Error;

use crate::domain::models::Config;

/// Configuration error types
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Test command cannot be empty")]
    EmptyTestCommand,

    #[error("Test file path cannot be empty")]
    EmptyTestFile,

    #[error("At least one coverage report path is required")]
    NoReportPaths,

    #[error("Invalid desired_coverage: {0}. Must be in (0, 100]")]
    InvalidDesiredCoverage(f64),

    #[error("Invalid max_iterations: {0}. Must be at least 1")]
    InvalidMaxIterations(u32),

    #[error("Invalid max_run_time_sec: {0}. Must be positive")]
    InvalidMaxRunTime(u64),

    #[error("Invalid max_tests_per_run: {0}. Must be at least 1")]
    InvalidBatchSize(u32),

    #[error("Invalid runs_per_candidate: {0}. Must be at least 1")]
    InvalidRunsPerCandidate(u32),

    #[error("Invalid runner timeout: {0}. Must be positive")]
    InvalidRunnerTimeout(u64),

    #[error("Invalid min_similarity: {0}. Must be in (0, 1]")]
    InvalidMinSimilarity(f64),

    #[error("Invalid neighborhood_lines: {0}. Must be at least 1")]
    InvalidNeighborhood(u32),

    #[error("Invalid comparison_prefix: {0}. Must be at least 1")]
    InvalidComparisonPrefix(usize),

    #[error("Oracle endpoint cannot be empty")]
    EmptyOracleEndpoint,

    #[error("Invalid max_retries: {0}. Cannot be 0")]
    InvalidMaxRetries(u32),

    #[error(
        "Invalid backoff configuration: initial_backoff_ms ({0}) must be less than max_backoff_ms ({1})"
    )]
    InvalidBackoff(u64, u64),

    #[error("Ledger path cannot be empty")]
    EmptyLedgerPath,

    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    #[error("Invalid log format: {0}. Must be one of: json, pretty")]
    InvalidLogFormat(String),
}

/// Configuration loader with hierarchical merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with hierarchical merging
    ///
    /// Precedence (lowest to highest):
    /// 1. Programmatic defaults (Serialized)
    /// 2. .covlift/config.yaml (project config, created by init)
    /// 3. .covlift/local.yaml (project local overrides, optional)
    /// 4. Environment variables (`COVLIFT_`* prefix, highest priority)
    ///
    /// Configuration is always project-local (pwd/.covlift/) so one machine
    /// can drive coverage runs for several projects.
    ///
    /// Validation is a separate step ([`Self::validate`]): commands merge
    /// their flag overrides into the loaded config first, then validate.
    pub fn load() -> Result<Config> {
        Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(".covlift/config.yaml"))
            .merge(Yaml::file(".covlift/local.yaml"))
            .merge(Env::prefixed("COVLIFT_").split("__"))
            .extract()
            .context("Failed to extract configuration from figment")
    }

    /// Load configuration from a specific file
    pub fn load_from_file(path: impl AsRef<std::path::Path>) -> Result<Config> {
        Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(path.as_ref()))
            .extract()
            .context(format!(
                "Failed to load config from {}",
                path.as_ref().display()
            ))
    }

    /// Validate configuration after loading
    pub fn validate(config: &Config) -> Result<(), ConfigError> {
        // Project
        if config.project.test_command.trim().is_empty() {
            return Err(ConfigError::EmptyTestCommand);
        }
        if config.project.test_file.trim().is_empty() {
            return Err(ConfigError::EmptyTestFile);
        }
        if config.project.report_paths.is_empty() {
            return Err(ConfigError::NoReportPaths);
        }

        // Goal and budget
        if config.goal.desired_coverage <= 0.0 || config.goal.desired_coverage > 100.0 {
            return Err(ConfigError::InvalidDesiredCoverage(
                config.goal.desired_coverage,
            ));
        }
        if config.goal.max_iterations == 0 {
            return Err(ConfigError::InvalidMaxIterations(config.goal.max_iterations));
        }
        if config.goal.max_run_time_sec == 0 {
            return Err(ConfigError::InvalidMaxRunTime(config.goal.max_run_time_sec));
        }
        if config.goal.max_tests_per_run == 0 {
            return Err(ConfigError::InvalidBatchSize(config.goal.max_tests_per_run));
        }
        if config.goal.runs_per_candidate == 0 {
            return Err(ConfigError::InvalidRunsPerCandidate(
                config.goal.runs_per_candidate,
            ));
        }

        // Runner
        if config.runner.timeout_sec == 0 {
            return Err(ConfigError::InvalidRunnerTimeout(config.runner.timeout_sec));
        }

        // Resolver
        if config.resolver.min_similarity <= 0.0 || config.resolver.min_similarity > 1.0 {
            return Err(ConfigError::InvalidMinSimilarity(
                config.resolver.min_similarity,
            ));
        }
        if config.resolver.neighborhood_lines == 0 {
            return Err(ConfigError::InvalidNeighborhood(
                config.resolver.neighborhood_lines,
            ));
        }
        if config.resolver.comparison_prefix == 0 {
            return Err(ConfigError::InvalidComparisonPrefix(
                config.resolver.comparison_prefix,
            ));
        }

        // Oracle
        if config.oracle.endpoint.trim().is_empty() {
            return Err(ConfigError::EmptyOracleEndpoint);
        }
        if config.oracle.retry.max_retries == 0 {
            return Err(ConfigError::InvalidMaxRetries(config.oracle.retry.max_retries));
        }
        if config.oracle.retry.initial_backoff_ms >= config.oracle.retry.max_backoff_ms {
            return Err(ConfigError::InvalidBackoff(
                config.oracle.retry.initial_backoff_ms,
                config.oracle.retry.max_backoff_ms,
            ));
        }

        // Ledger
        if config.ledger.path.trim().is_empty() {
            return Err(ConfigError::EmptyLedgerPath);
        }

        // Logging
        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&config.logging.level.as_str()) {
            return Err(ConfigError::InvalidLogLevel(config.logging.level.clone()));
        }
        let valid_log_formats = ["json", "pretty"];
        if !valid_log_formats.contains(&config.logging.format.as_str()) {
            return Err(ConfigError::InvalidLogFormat(config.logging.format.clone()));
        }

        Ok(())
    }
}
