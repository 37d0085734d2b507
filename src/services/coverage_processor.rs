//! Coverage report processing.
//!
//! Parses raw coverage artifacts (Cobertura-style XML, LCOV text) into the
//! normalized [`CoverageReport`] model. Multiple report files from one run
//! (multi-module suites) are unioned into a single line-number space before
//! the percentage is computed.
//!
//! Parsing is tolerant of unknown fields and directives but strict about the
//! numeric fields it consumes: a non-numeric line number or hit count is a
//! parse failure, not a zero.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::time::SystemTime;

use regex::Regex;
use tracing::debug;

use crate::domain::error::CoverageError;
use crate::domain::models::{CoverageFormat, CoverageReport};

/// Per-file line sets, before flattening into the unioned space.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct FileCoverage {
    covered: BTreeSet<u32>,
    coverable: BTreeSet<u32>,
}

/// Parses coverage artifacts into [`CoverageReport`] values.
pub struct CoverageProcessor {
    format: CoverageFormat,
    /// Only files whose recorded path contains this substring count.
    file_filter: Option<String>,
    class_re: Regex,
    line_number_re: Regex,
    line_hits_re: Regex,
}

impl CoverageProcessor {
    pub fn new(format: CoverageFormat, file_filter: Option<String>) -> Self {
        Self {
            format,
            file_filter,
            // Attribute extraction is split per attribute so ordering inside
            // the tag does not matter.
            class_re: Regex::new(r#"<class\b[^>]*?\bfilename="([^"]*)""#)
                .expect("static regex"),
            line_number_re: Regex::new(r#"\bnumber="([^"]*)""#).expect("static regex"),
            line_hits_re: Regex::new(r#"\bhits="([^"]*)""#).expect("static regex"),
        }
    }

    /// Parse all report files from one measurement into a single report.
    ///
    /// `not_before` guards against stale artifacts: a report file older than
    /// the test-command start time means the run died before coverage flush,
    /// which is reported as a missing report.
    pub fn parse(
        &self,
        report_paths: &[String],
        duration_sec: f64,
        not_before: Option<SystemTime>,
    ) -> Result<CoverageReport, CoverageError> {
        let mut merged: BTreeMap<String, FileCoverage> = BTreeMap::new();

        for path in report_paths {
            let per_file = self.parse_one(Path::new(path), not_before)?;
            for (file, coverage) in per_file {
                match merged.get_mut(&file) {
                    None => {
                        merged.insert(file, coverage);
                    }
                    Some(existing) => {
                        // The same source file measured by two modules must
                        // agree on what is coverable; anything else means the
                        // instrumentation is ambiguous.
                        if existing.coverable != coverage.coverable {
                            return Err(CoverageError::parse(format!(
                                "conflicting coverable-line sets for '{file}' across report files"
                            )));
                        }
                        existing.covered.extend(coverage.covered);
                    }
                }
            }
        }

        if let Some(filter) = &self.file_filter {
            merged.retain(|file, _| file.contains(filter.as_str()));
        }

        let (covered, coverable) = Self::flatten(&merged);
        debug!(
            files = merged.len(),
            covered = covered.len(),
            coverable = coverable.len(),
            "Parsed coverage measurement"
        );
        CoverageReport::from_lines(covered, coverable, duration_sec)
    }

    /// Parse a single report file into per-file line sets.
    fn parse_one(
        &self,
        path: &Path,
        not_before: Option<SystemTime>,
    ) -> Result<BTreeMap<String, FileCoverage>, CoverageError> {
        let missing = || CoverageError::MissingReport {
            path: path.display().to_string(),
        };

        let metadata = std::fs::metadata(path).map_err(|_| missing())?;
        if let (Some(threshold), Ok(modified)) = (not_before, metadata.modified()) {
            // Slack for filesystems with coarse mtime granularity.
            let threshold = threshold - std::time::Duration::from_secs(2);
            if modified < threshold {
                // Present but stale: the run never flushed a fresh report.
                return Err(missing());
            }
        }

        let text = std::fs::read_to_string(path).map_err(|_| missing())?;

        match self.format {
            CoverageFormat::Cobertura => self.parse_cobertura(&text),
            CoverageFormat::Lcov => Self::parse_lcov(&text),
        }
    }

    /// Line-oriented scan of a Cobertura-style XML report.
    ///
    /// Only `<class filename=..>` and `<line number=.. hits=..>` carry the
    /// data we consume; every other element and attribute is ignored.
    fn parse_cobertura(
        &self,
        text: &str,
    ) -> Result<BTreeMap<String, FileCoverage>, CoverageError> {
        let mut files: BTreeMap<String, FileCoverage> = BTreeMap::new();
        let mut current: Option<String> = None;
        let mut saw_root = false;

        for line in text.lines() {
            let trimmed = line.trim();

            if trimmed.contains("<coverage") {
                saw_root = true;
            }

            if let Some(captures) = self.class_re.captures(trimmed) {
                let filename = captures[1].to_string();
                files.entry(filename.clone()).or_default();
                current = Some(filename);
                continue;
            }

            if trimmed.contains("<line") {
                let Some(file) = current.clone() else {
                    return Err(CoverageError::parse(
                        "<line> entry outside any <class> block",
                    ));
                };
                let number = Self::extract_u32(trimmed, &self.line_number_re, "number")?;
                let hits = Self::extract_u64(trimmed, &self.line_hits_re, "hits")?;

                let entry = files.entry(file).or_default();
                entry.coverable.insert(number);
                if hits > 0 {
                    entry.covered.insert(number);
                }
            }
        }

        if !saw_root {
            return Err(CoverageError::parse(
                "no <coverage> root element; not a cobertura report",
            ));
        }

        Ok(files)
    }

    fn extract_u32(line: &str, re: &Regex, attr: &str) -> Result<u32, CoverageError> {
        let raw = re
            .captures(line)
            .map(|c| c[1].to_string())
            .ok_or_else(|| {
                CoverageError::parse(format!("<line> entry missing '{attr}' attribute"))
            })?;
        raw.parse::<u32>().map_err(|_| {
            CoverageError::parse(format!("non-numeric '{attr}' attribute: '{raw}'"))
        })
    }

    fn extract_u64(line: &str, re: &Regex, attr: &str) -> Result<u64, CoverageError> {
        let raw = re
            .captures(line)
            .map(|c| c[1].to_string())
            .ok_or_else(|| {
                CoverageError::parse(format!("<line> entry missing '{attr}' attribute"))
            })?;
        raw.parse::<u64>().map_err(|_| {
            CoverageError::parse(format!("non-numeric '{attr}' attribute: '{raw}'"))
        })
    }

    /// Scan an LCOV tracefile.
    ///
    /// `SF:` opens a file section, `DA:<line>,<hits>[,..]` records a probed
    /// line, `end_of_record` closes the section. Unknown directives (`FN:`,
    /// `BRDA:`, ...) are skipped for forward compatibility.
    fn parse_lcov(text: &str) -> Result<BTreeMap<String, FileCoverage>, CoverageError> {
        let mut files: BTreeMap<String, FileCoverage> = BTreeMap::new();
        let mut current: Option<String> = None;
        let mut saw_section = false;

        for line in text.lines() {
            let trimmed = line.trim();

            if let Some(filename) = trimmed.strip_prefix("SF:") {
                if current.is_some() {
                    return Err(CoverageError::parse(
                        "SF: section opened before previous end_of_record",
                    ));
                }
                current = Some(filename.to_string());
                files.entry(filename.to_string()).or_default();
                saw_section = true;
                continue;
            }

            if let Some(data) = trimmed.strip_prefix("DA:") {
                let Some(file) = current.clone() else {
                    return Err(CoverageError::parse("DA: entry outside any SF: section"));
                };

                let mut fields = data.split(',');
                let number = fields
                    .next()
                    .unwrap_or_default()
                    .trim()
                    .parse::<u32>()
                    .map_err(|_| {
                        CoverageError::parse(format!("non-numeric DA line number in '{data}'"))
                    })?;
                let hits = fields
                    .next()
                    .ok_or_else(|| {
                        CoverageError::parse(format!("DA entry missing hit count: '{data}'"))
                    })?
                    .trim()
                    .parse::<u64>()
                    .map_err(|_| {
                        CoverageError::parse(format!("non-numeric DA hit count in '{data}'"))
                    })?;

                let entry = files.entry(file).or_default();
                entry.coverable.insert(number);
                if hits > 0 {
                    entry.covered.insert(number);
                }
                continue;
            }

            if trimmed == "end_of_record" {
                if current.take().is_none() {
                    return Err(CoverageError::parse(
                        "end_of_record without an open SF: section",
                    ));
                }
            }
        }

        if let Some(file) = current {
            return Err(CoverageError::parse(format!(
                "truncated report: SF:{file} has no end_of_record"
            )));
        }
        if !saw_section {
            return Err(CoverageError::parse(
                "no SF: sections found; not an lcov tracefile",
            ));
        }

        Ok(files)
    }

    /// Flatten per-file sets into a single line space.
    ///
    /// Files are visited in path order and each file's lines are shifted by a
    /// running offset, so a (file, line) pair maps to a stable absolute
    /// position for a given set of files.
    fn flatten(files: &BTreeMap<String, FileCoverage>) -> (BTreeSet<u32>, BTreeSet<u32>) {
        let mut covered = BTreeSet::new();
        let mut coverable = BTreeSet::new();
        let mut base: u32 = 0;

        for coverage in files.values() {
            for line in &coverage.coverable {
                coverable.insert(base + line);
            }
            for line in &coverage.covered {
                covered.insert(base + line);
            }
            base += coverage.coverable.iter().next_back().copied().unwrap_or(0);
        }

        (covered, coverable)
    }
}
