//! Pattern compilation and the per-file scan loop
//!
//! The user's pattern is transformed once at startup (literal quoting, word
//! boundaries, case folding) and the compiled regex is shared read-only
//! across all scanner threads.
//!
//! Matching is line-disciplined: the scan walks the buffer's lines and
//! applies the regex to each line's bytes in isolation, so a match can
//! never span a newline no matter what the pattern says — `a\s+b` will not
//! bridge two lines the way a whole-buffer multiline match would. One
//! match per line is reported, at the leftmost position.

use crate::error::PatternError;
use crate::scanner::matches::{MatchList, MatchRecord};
use regex::bytes::{Regex, RegexBuilder};

/// Pattern-transformation switches, resolved from the CLI (after
/// smart-case) before compilation
#[derive(Debug, Clone, Copy, Default)]
pub struct MatchOptions {
    /// Treat every character of the pattern as literal (`-Q`)
    pub literal: bool,

    /// Require the match to fall on word boundaries (`-w`)
    pub word_regexp: bool,

    /// Case-insensitive matching (`-i`, or smart-case resolution)
    pub ignore_case: bool,
}

/// A compiled search pattern, shared read-only by the scanner pool
#[derive(Debug)]
pub struct PatternMatcher {
    regex: Regex,
}

impl PatternMatcher {
    /// Transform and compile the user's pattern.
    ///
    /// Compilation failure is fatal to the whole run; the error carries the
    /// pattern as the user typed it.
    pub fn new(pattern: &str, opts: MatchOptions) -> Result<Self, PatternError> {
        let mut transformed = if opts.literal {
            regex::escape(pattern)
        } else {
            pattern.to_string()
        };

        if opts.word_regexp {
            transformed = format!(r"\b(?:{})\b", transformed);
        }

        let regex = RegexBuilder::new(&transformed)
            .case_insensitive(opts.ignore_case)
            .multi_line(true)
            // Byte-level scanning; no capture semantics are exposed.
            .unicode(false)
            .build()
            .map_err(|source| PatternError {
                pattern: pattern.to_string(),
                source,
            })?;

        Ok(Self { regex })
    }

    /// Scan a file buffer, appending one record per matching line.
    ///
    /// Line numbers are 1-based. The trailing newline is not part of the
    /// searched line, so `$` anchors at each line end; a final line without
    /// a newline is still searched.
    pub fn scan(&self, data: &[u8], matches: &mut MatchList) {
        let mut line_number = 0u64;
        let mut line_start = 0usize;

        for raw_line in data.split_inclusive(|&b| b == b'\n') {
            line_number += 1;

            let content = raw_line.strip_suffix(b"\n").unwrap_or(raw_line);

            if let Some(found) = self.regex.find(content) {
                matches.push(MatchRecord {
                    start: line_start + found.start(),
                    end: line_start + found.end(),
                    line_number,
                    line_start,
                    line: content.to_vec(),
                });
            }

            line_start += raw_line.len();
        }
    }

    /// Convenience wrapper producing a fresh list
    pub fn scan_to_list(&self, data: &[u8]) -> MatchList {
        let mut matches = MatchList::new();
        self.scan(data, &mut matches);
        matches
    }
}
