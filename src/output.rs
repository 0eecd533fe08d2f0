//! Match output formatting
//!
//! The coordinator's result sink feeds a [`MatchPrinter`], which renders
//! grep-style `path:line:content` records, optionally with ANSI color and
//! the match column. User-facing output goes through here; diagnostics go
//! through `tracing` to stderr.

use crate::config::{ColorMode, SearchConfig};
use crate::scanner::matches::FileMatches;
use crate::types::TypeManager;
use console::style;
use std::io::{self, BufWriter, Stdout, Write};

/// Streams match records to a writer
pub struct MatchPrinter<W: Write> {
    out: W,
    color: bool,
    show_column: bool,
}

impl<W: Write> MatchPrinter<W> {
    pub fn new(out: W, color: bool, show_column: bool) -> Self {
        Self {
            out,
            color,
            show_column,
        }
    }

    /// Print every match of one file, one line per record
    pub fn print_file(&mut self, file_matches: &FileMatches) -> io::Result<()> {
        let path = file_matches.path.display().to_string();

        for record in &file_matches.matches {
            let (span_start, span_end) = record.span_in_line();
            let before = String::from_utf8_lossy(&record.line[..span_start]);
            let matched = String::from_utf8_lossy(&record.line[span_start..span_end]);
            let after = String::from_utf8_lossy(&record.line[span_end..]);

            if self.color {
                write!(
                    self.out,
                    "{}:{}:",
                    style(&path).magenta(),
                    style(record.line_number).green()
                )?;
                if self.show_column {
                    write!(self.out, "{}:", style(record.column()).green())?;
                }
                writeln!(
                    self.out,
                    "{}{}{}",
                    before,
                    style(matched).red().bold(),
                    after
                )?;
            } else {
                write!(self.out, "{}:{}:", path, record.line_number)?;
                if self.show_column {
                    write!(self.out, "{}:", record.column())?;
                }
                writeln!(self.out, "{}{}{}", before, matched, after)?;
            }
        }

        Ok(())
    }

    /// Flush buffered output
    pub fn finish(&mut self) -> io::Result<()> {
        self.out.flush()
    }
}

/// Build the stdout printer for a configuration
pub fn stdout_printer(config: &SearchConfig) -> MatchPrinter<BufWriter<Stdout>> {
    let color = match config.color {
        ColorMode::Always => true,
        ColorMode::Never => false,
        ColorMode::Auto => console::colors_enabled(),
    };

    MatchPrinter::new(BufWriter::new(io::stdout()), color, config.show_column)
}

/// Print the `--help-types` listing
pub fn print_help_types(types: &TypeManager) {
    println!("codegrep recognizes the following file types:");
    println!();

    let listing = types.types_for_help();
    let widest = listing.iter().map(|(name, _)| name.len()).max().unwrap_or(0);

    for (name, specs) in listing {
        println!("  --[no]{:<width$}  {}", name, specs, width = widest);
    }
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner::matches::{MatchList, MatchRecord};
    use std::path::PathBuf;

    fn sample() -> FileMatches {
        let mut matches = MatchList::new();
        matches.push(MatchRecord {
            start: 4,
            end: 7,
            line_number: 1,
            line_start: 0,
            line: b"int foo;".to_vec(),
        });
        matches.push(MatchRecord {
            start: 20,
            end: 23,
            line_number: 3,
            line_start: 18,
            line: b"  foo()".to_vec(),
        });
        FileMatches {
            path: PathBuf::from("src/a.c"),
            matches,
        }
    }

    fn render(show_column: bool) -> String {
        let mut buf = Vec::new();
        {
            let mut printer = MatchPrinter::new(&mut buf, false, show_column);
            printer.print_file(&sample()).unwrap();
            printer.finish().unwrap();
        }
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn test_plain_output() {
        assert_eq!(render(false), "src/a.c:1:int foo;\nsrc/a.c:3:  foo()\n");
    }

    #[test]
    fn test_column_output() {
        assert_eq!(render(true), "src/a.c:1:5:int foo;\nsrc/a.c:3:3:  foo()\n");
    }
}
