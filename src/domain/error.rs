use thiserror::Error;

/// Errors from parsing coverage artifacts.
#[derive(Error, Debug)]
pub enum CoverageError {
    /// The report exists but its content is malformed, truncated, or does not
    /// match the declared format.
    #[error("Malformed coverage report: {reason}")]
    Parse { reason: String },

    /// No report was produced (e.g., the test run died before coverage flush).
    #[error("Coverage report not found: {path}")]
    MissingReport { path: String },
}

impl CoverageError {
    pub fn parse(reason: impl Into<String>) -> Self {
        Self::Parse {
            reason: reason.into(),
        }
    }
}

/// Errors from resolving an insertion point.
#[derive(Error, Debug)]
pub enum InsertionError {
    /// No window near the hint cleared the similarity threshold. The resolver
    /// refuses to guess rather than mutate source under low confidence.
    #[error(
        "No insertion context near line {hint_line} cleared similarity {threshold:.2} (best {best_ratio:.2})"
    )]
    Ambiguous {
        hint_line: u32,
        best_ratio: f64,
        threshold: f64,
    },

    /// The hint points entirely outside the file.
    #[error("Hint line {hint_line} is beyond the end of a {file_lines}-line file")]
    OutOfBounds { hint_line: u32, file_lines: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coverage_error_messages_name_the_cause() {
        let err = CoverageError::parse("non-numeric hit count");
        assert!(err.to_string().contains("non-numeric hit count"));

        let err = CoverageError::MissingReport {
            path: "target/cov.xml".into(),
        };
        assert!(err.to_string().contains("target/cov.xml"));
    }

    #[test]
    fn insertion_error_reports_both_ratios() {
        let err = InsertionError::Ambiguous {
            hint_line: 10,
            best_ratio: 0.42,
            threshold: 0.8,
        };
        let msg = err.to_string();
        assert!(msg.contains("0.42"));
        assert!(msg.contains("0.80"));
    }
}
