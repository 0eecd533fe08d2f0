//! Match records and per-file aggregation

use std::path::PathBuf;

/// One reported match: a byte span within one line of a file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchRecord {
    /// Byte offset of the match start within the file
    pub start: usize,

    /// Byte offset one past the match end
    pub end: usize,

    /// 1-based line number
    pub line_number: u64,

    /// Byte offset where the containing line begins
    pub line_start: usize,

    /// The containing line, without its trailing newline
    pub line: Vec<u8>,
}

impl MatchRecord {
    /// 1-based column of the match start within its line
    pub fn column(&self) -> usize {
        self.start - self.line_start + 1
    }

    /// Match span relative to the start of the line
    pub fn span_in_line(&self) -> (usize, usize) {
        (self.start - self.line_start, self.end - self.line_start)
    }
}

/// Matches for a single file, in ascending line order.
///
/// At most one match per line is retained; a push for a line that already
/// has a match is dropped.
#[derive(Debug, Default, Clone)]
pub struct MatchList {
    records: Vec<MatchRecord>,
}

impl MatchList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a record unless its line already produced one
    pub fn push(&mut self, record: MatchRecord) {
        if let Some(last) = self.records.last() {
            debug_assert!(record.line_number >= last.line_number);
            if last.line_number == record.line_number {
                return;
            }
        }
        self.records.push(record);
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, MatchRecord> {
        self.records.iter()
    }
}

impl<'a> IntoIterator for &'a MatchList {
    type Item = &'a MatchRecord;
    type IntoIter = std::slice::Iter<'a, MatchRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

/// The result unit a scanner worker emits: a file path plus its matches
#[derive(Debug, Clone)]
pub struct FileMatches {
    pub path: PathBuf,
    pub matches: MatchList,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(line_number: u64, start: usize) -> MatchRecord {
        MatchRecord {
            start,
            end: start + 3,
            line_number,
            line_start: start,
            line: b"foo".to_vec(),
        }
    }

    #[test]
    fn test_push_keeps_one_match_per_line() {
        let mut ml = MatchList::new();
        ml.push(record(1, 0));
        ml.push(record(1, 4));
        ml.push(record(3, 10));

        assert_eq!(ml.len(), 2);
        let lines: Vec<u64> = ml.iter().map(|m| m.line_number).collect();
        assert_eq!(lines, vec![1, 3]);
    }

    #[test]
    fn test_column_is_one_based() {
        let m = MatchRecord {
            start: 14,
            end: 17,
            line_number: 2,
            line_start: 10,
            line: b"ab  foo".to_vec(),
        };
        assert_eq!(m.column(), 5);
        assert_eq!(m.span_in_line(), (4, 7));
    }
}
