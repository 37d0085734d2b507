//! Oracle response decoding.
//!
//! Generation backends answer with YAML, frequently wrapped in markdown
//! fences and occasionally cut off mid-stream. Decoding is strict about the
//! candidate shape but applies a few bounded repair passes before giving up:
//! strip fences, extract the fenced snippet, then drop trailing lines one at
//! a time. Anything that still fails is an [`OracleError::Malformed`].

use serde::Deserialize;
use tracing::debug;
use uuid::Uuid;

use crate::domain::models::{CandidateTest, InsertionHint};
use crate::domain::ports::OracleError;

/// Wire shape of one generated candidate.
#[derive(Debug, Deserialize)]
struct RawCandidate {
    #[serde(default)]
    id: Option<String>,
    test_code: String,
    #[serde(default)]
    rationale: Option<String>,
    insert_after_line: u32,
    #[serde(default)]
    indentation: Option<String>,
    line_context: String,
}

/// Wire shape of a candidate batch.
#[derive(Debug, Deserialize)]
struct RawBatch {
    #[serde(default)]
    candidates: Vec<RawCandidate>,
}

/// Decode a raw oracle response body into validated candidates.
pub fn decode_batch(body: &str) -> Result<Vec<CandidateTest>, OracleError> {
    let raw = parse_with_repair(body)?;

    let mut candidates = Vec::with_capacity(raw.candidates.len());
    for (index, raw_candidate) in raw.candidates.into_iter().enumerate() {
        candidates.push(validate_candidate(raw_candidate, index)?);
    }
    Ok(candidates)
}

fn validate_candidate(raw: RawCandidate, index: usize) -> Result<CandidateTest, OracleError> {
    if raw.test_code.trim().is_empty() {
        return Err(OracleError::Malformed(format!(
            "candidate #{index} has empty test_code"
        )));
    }
    if raw.insert_after_line == 0 {
        return Err(OracleError::Malformed(format!(
            "candidate #{index} has insert_after_line 0; lines are 1-based"
        )));
    }
    if raw.line_context.trim().is_empty() {
        return Err(OracleError::Malformed(format!(
            "candidate #{index} has empty line_context"
        )));
    }

    Ok(CandidateTest {
        id: raw.id.unwrap_or_else(|| Uuid::new_v4().to_string()),
        source_text: raw.test_code,
        rationale: raw.rationale,
        hint: InsertionHint {
            line: raw.insert_after_line,
            indentation: raw.indentation.unwrap_or_default(),
            context: raw.line_context,
        },
    })
}

/// Parse the body as YAML, repairing common LLM formatting damage.
fn parse_with_repair(body: &str) -> Result<RawBatch, OracleError> {
    let stripped = strip_fences(body);

    if let Ok(batch) = serde_yaml::from_str::<RawBatch>(&stripped) {
        return Ok(batch);
    }

    // First fallback: the YAML may be embedded in surrounding prose; take
    // just the fenced snippet.
    if let Some(snippet) = extract_fenced_snippet(body) {
        if let Ok(batch) = serde_yaml::from_str::<RawBatch>(&snippet) {
            debug!("Decoded oracle response after extracting fenced snippet");
            return Ok(batch);
        }
    }

    // Second fallback: a truncated response may become valid by dropping
    // trailing lines.
    let lines: Vec<&str> = stripped.lines().collect();
    for cut in 1..lines.len() {
        let shorter = lines[..lines.len() - cut].join("\n");
        if let Ok(batch) = serde_yaml::from_str::<RawBatch>(&shorter) {
            if !batch.candidates.is_empty() {
                debug!(dropped_lines = cut, "Decoded oracle response after truncation repair");
                return Ok(batch);
            }
        }
    }

    Err(OracleError::Malformed(
        "response is not a candidate batch in any recognized YAML form".to_string(),
    ))
}

/// Strip a leading ```` ```yaml ````/` ``` ` fence and trailing backticks.
fn strip_fences(body: &str) -> String {
    let trimmed = body.trim();
    let without_prefix = trimmed
        .strip_prefix("```yaml")
        .or_else(|| trimmed.strip_prefix("```"))
        .unwrap_or(trimmed);
    without_prefix.trim_end_matches('`').trim().to_string()
}

/// Extract the first fenced block from a larger prose response.
fn extract_fenced_snippet(body: &str) -> Option<String> {
    let start = body.find("```")?;
    let after_fence = &body[start + 3..];
    let after_lang = after_fence.strip_prefix("yaml").unwrap_or(after_fence);
    let end = after_lang.find("```")?;
    Some(after_lang[..end].trim().to_string())
}
