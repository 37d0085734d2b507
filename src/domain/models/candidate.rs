//! Candidate test domain model.
//!
//! Candidates are produced by the generation oracle and owned by the
//! validator for exactly one validation attempt. They are never mutated.

use serde::{Deserialize, Serialize};

/// Structural hint describing where the oracle believes a candidate belongs.
///
/// The hint is advisory: it reflects the file as the oracle last saw it and
/// may be stale relative to edits made by previously accepted candidates.
/// The insertion resolver re-verifies it against the file on disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InsertionHint {
    /// 1-based line number to insert after.
    pub line: u32,
    /// Indentation the oracle expects for inserted code.
    pub indentation: String,
    /// The file content the oracle observed around `line`, used for
    /// fuzzy verification.
    pub context: String,
}

/// One generated test awaiting validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateTest {
    /// Stable identifier assigned when the candidate was decoded.
    pub id: String,
    /// The test code to splice into the test file.
    pub source_text: String,
    /// Optional free-text explanation from the oracle.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rationale: Option<String>,
    /// Where the oracle suggests inserting the test.
    pub hint: InsertionHint,
}

/// A resolved, verified place to splice candidate code into the test file.
///
/// Produced per validation attempt and consumed once; it is recorded on the
/// attempt but never reused across attempts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsertionPoint {
    /// 1-based line number the candidate is inserted after.
    pub line_number: u32,
    /// Indentation applied to every inserted line, derived from the matched
    /// line's actual leading whitespace.
    pub indentation: String,
    /// Similarity ratio of the winning match, in `[0, 1]`.
    pub confidence: f64,
}
