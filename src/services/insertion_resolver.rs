//! Insertion point resolution.
//!
//! Oracle hints describe where a candidate test should be spliced into the
//! test file, but hints are computed against the file as the oracle last saw
//! it and can be stale after prior acceptances. The resolver verifies every
//! hint against the file on disk with a fuzzy match and refuses to resolve
//! when nothing in the neighborhood is convincingly similar — a low-confidence
//! guess would mean mutating source at the wrong place.

use tracing::debug;

use crate::domain::error::InsertionError;
use crate::domain::models::{InsertionHint, InsertionPoint, ResolverConfig};

/// Resolves and verifies insertion points against actual file content.
pub struct InsertionResolver {
    config: ResolverConfig,
}

impl InsertionResolver {
    pub fn new(config: ResolverConfig) -> Self {
        Self { config }
    }

    /// Verify `hint` against `file_text` and return a trusted insertion point.
    ///
    /// The hinted line is checked first; if its context does not clear the
    /// similarity threshold, lines within `neighborhood_lines` of the hint are
    /// tried nearest-first. Indentation always comes from the matched line's
    /// actual leading whitespace, never from the hint.
    pub fn resolve(
        &self,
        file_text: &str,
        hint: &InsertionHint,
    ) -> Result<InsertionPoint, InsertionError> {
        let lines: Vec<&str> = file_text.lines().collect();

        if lines.is_empty() || hint.line == 0 {
            return Err(InsertionError::OutOfBounds {
                hint_line: hint.line,
                file_lines: lines.len(),
            });
        }

        // A hint past EOF is stale, not hopeless: clamp and let the fuzzy
        // match decide.
        #[allow(clippy::cast_possible_truncation)]
        let anchor = hint.line.min(lines.len() as u32);

        let expected = self.normalize(&hint.context);
        let context_height = hint.context.lines().count().max(1);

        let mut best_ratio = 0.0_f64;
        let mut best_line: Option<u32> = None;

        for candidate in self.search_order(anchor, lines.len()) {
            let ratio = self.window_similarity(&lines, candidate, context_height, &expected);
            if ratio > best_ratio {
                best_ratio = ratio;
                best_line = Some(candidate);
            }
            // Exact match cannot be beaten; stop scanning.
            if (best_ratio - 1.0).abs() < f64::EPSILON {
                break;
            }
        }

        match best_line {
            Some(line) if best_ratio >= self.config.min_similarity => {
                let indentation = leading_whitespace(lines[(line - 1) as usize]);
                debug!(
                    hint_line = hint.line,
                    resolved_line = line,
                    confidence = best_ratio,
                    "Resolved insertion point"
                );
                Ok(InsertionPoint {
                    line_number: line,
                    indentation,
                    confidence: best_ratio,
                })
            }
            _ => Err(InsertionError::Ambiguous {
                hint_line: hint.line,
                best_ratio,
                threshold: self.config.min_similarity,
            }),
        }
    }

    /// Candidate lines to try: the anchor, then its neighbors nearest-first.
    fn search_order(&self, anchor: u32, file_lines: usize) -> Vec<u32> {
        #[allow(clippy::cast_possible_truncation)]
        let last = file_lines as u32;
        let mut order = vec![anchor];
        for delta in 1..=self.config.neighborhood_lines {
            if anchor > delta {
                order.push(anchor - delta);
            }
            if anchor + delta <= last {
                order.push(anchor + delta);
            }
        }
        order
    }

    /// Similarity of the window starting at `line` (1-based) to `expected`.
    fn window_similarity(
        &self,
        lines: &[&str],
        line: u32,
        height: usize,
        expected: &str,
    ) -> f64 {
        let start = (line - 1) as usize;
        let end = (start + height).min(lines.len());
        let window = lines[start..end].join("\n");
        similarity_ratio(&self.normalize(&window), expected)
    }

    /// Trim per-line whitespace and cap length at the comparison prefix.
    fn normalize(&self, text: &str) -> String {
        let joined = text
            .lines()
            .map(str::trim)
            .collect::<Vec<_>>()
            .join("\n");
        joined.chars().take(self.config.comparison_prefix).collect()
    }
}

/// Leading whitespace of a line, preserved exactly (tabs included).
fn leading_whitespace(line: &str) -> String {
    line.chars().take_while(|c| c.is_whitespace()).collect()
}

/// Normalized Levenshtein similarity in `[0, 1]`.
///
/// `1 - distance / max_len`; two empty strings are identical (1.0).
fn similarity_ratio(a: &str, b: &str) -> f64 {
    let a_chars: Vec<char> = a.chars().collect();
    let b_chars: Vec<char> = b.chars().collect();
    let longest = a_chars.len().max(b_chars.len());
    if longest == 0 {
        return 1.0;
    }
    let distance = levenshtein(&a_chars, &b_chars);
    #[allow(clippy::cast_precision_loss)]
    {
        1.0 - distance as f64 / longest as f64
    }
}

/// Classic two-row Levenshtein distance over chars.
fn levenshtein(a: &[char], b: &[char]) -> usize {
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut previous: Vec<usize> = (0..=b.len()).collect();
    let mut current = vec![0usize; b.len() + 1];

    for (i, &ca) in a.iter().enumerate() {
        current[0] = i + 1;
        for (j, &cb) in b.iter().enumerate() {
            let substitution = previous[j] + usize::from(ca != cb);
            current[j + 1] = substitution
                .min(previous[j + 1] + 1)
                .min(current[j] + 1);
        }
        std::mem::swap(&mut previous, &mut current);
    }

    previous[b.len()]
}

#[cfg(test)]
mod tests {
    use super::*;

    const FILE: &str = "\
import pytest

def test_parse_empty():
    assert parse(\"\") == []

def test_parse_single():
    assert parse(\"a\") == [\"a\"]
";

    fn resolver() -> InsertionResolver {
        InsertionResolver::new(ResolverConfig::default())
    }

    fn hint(line: u32, context: &str) -> InsertionHint {
        InsertionHint {
            line,
            indentation: String::new(),
            context: context.to_string(),
        }
    }

    #[test]
    fn exact_context_gives_full_confidence_at_hinted_line() {
        let point = resolver()
            .resolve(FILE, &hint(7, "    assert parse(\"a\") == [\"a\"]"))
            .expect("resolve");
        assert_eq!(point.line_number, 7);
        assert!((point.confidence - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn indentation_comes_from_matched_line() {
        let point = resolver()
            .resolve(FILE, &hint(7, "assert parse(\"a\") == [\"a\"]"))
            .expect("resolve");
        assert_eq!(point.indentation, "    ");
    }

    #[test]
    fn stale_hint_recovers_via_neighborhood_search() {
        // Context matches line 7, hint says line 4.
        let point = resolver()
            .resolve(FILE, &hint(4, "assert parse(\"a\") == [\"a\"]"))
            .expect("resolve");
        assert_eq!(point.line_number, 7);
        assert!(point.confidence >= 0.8);
    }

    #[test]
    fn unmatchable_context_is_ambiguous() {
        let err = resolver()
            .resolve(FILE, &hint(4, "class CompletelyDifferentThing:"))
            .expect_err("ambiguous");
        assert!(matches!(err, InsertionError::Ambiguous { .. }));
    }

    #[test]
    fn empty_file_is_out_of_bounds() {
        let err = resolver()
            .resolve("", &hint(1, "anything"))
            .expect_err("out of bounds");
        assert!(matches!(err, InsertionError::OutOfBounds { .. }));
    }

    #[test]
    fn hint_past_eof_is_clamped_and_searched() {
        let point = resolver()
            .resolve(FILE, &hint(500, "assert parse(\"a\") == [\"a\"]"))
            .expect("resolve");
        assert_eq!(point.line_number, 7);
    }

    #[test]
    fn multi_line_context_matches_window() {
        let context = "def test_parse_single():\n    assert parse(\"a\") == [\"a\"]";
        let point = resolver().resolve(FILE, &hint(6, context)).expect("resolve");
        assert_eq!(point.line_number, 6);
        assert!((point.confidence - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn neighborhood_is_bounded() {
        let config = ResolverConfig {
            neighborhood_lines: 1,
            ..ResolverConfig::default()
        };
        let resolver = InsertionResolver::new(config);
        // Match is at line 7, hint at line 2: outside a ±1 neighborhood.
        let err = resolver
            .resolve(FILE, &hint(2, "assert parse(\"a\") == [\"a\"]"))
            .expect_err("out of reach");
        assert!(matches!(err, InsertionError::Ambiguous { .. }));
    }

    #[test]
    fn similarity_ratio_basics() {
        assert!((similarity_ratio("", "") - 1.0).abs() < f64::EPSILON);
        assert!((similarity_ratio("abc", "abc") - 1.0).abs() < f64::EPSILON);
        assert!((similarity_ratio("abc", "") - 0.0).abs() < f64::EPSILON);
        let ratio = similarity_ratio("kitten", "sitting");
        assert!((ratio - (1.0 - 3.0 / 7.0)).abs() < 1e-9);
    }

    #[test]
    fn comparison_prefix_caps_cost_not_correctness() {
        let config = ResolverConfig {
            comparison_prefix: 10,
            ..ResolverConfig::default()
        };
        let resolver = InsertionResolver::new(config);
        let long_line = format!("    assert {} == 1", "x".repeat(500));
        let file = format!("fn a() {{}}\n{long_line}\n");
        let point = resolver
            .resolve(&file, &hint(2, &long_line))
            .expect("resolve");
        assert_eq!(point.line_number, 2);
    }
}
