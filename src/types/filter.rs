//! Filter rules and the filter-spec grammar
//!
//! A filter spec is a `KIND:ARGS` string describing one rule of a file-type
//! definition:
//!
//! - `ext:cpp,hpp` — basename's final extension is in the list
//! - `is:Makefile,GNUmakefile` — basename equals one of the literals
//! - `glob:*.min.js` — shell glob over the basename
//! - `globx:vendor/*.c` — shell glob over the path relative to the scan
//!   root; `*` does not cross `/` (use `**` for that)
//! - `firstlinematch:/^#!.*python/` — regex over the file's first line
//!   (slash-delimited, optional trailing `i` flag)
//!
//! Rules are compiled at registration so malformed specs are rejected up
//! front with the offending text, and matching is allocation-free.

use crate::error::ConfigError;
use globset::{GlobBuilder, GlobMatcher};

/// One rule of a file-type definition
#[derive(Debug, Clone)]
pub enum FilterRule {
    /// Case-sensitive extension set, no leading dots
    Extensions(Vec<String>),

    /// Literal basenames
    Literals(Vec<String>),

    /// Glob over the basename
    NameGlob { pattern: String, matcher: GlobMatcher },

    /// Glob over the scan-root-relative path
    PathGlob { pattern: String, matcher: GlobMatcher },

    /// Regex over the file's first line (without trailing newline)
    FirstLine {
        pattern: String,
        regex: regex::bytes::Regex,
    },
}

impl FilterRule {
    /// Parse a `KIND:ARGS` filter spec
    pub fn parse(spec: &str) -> Result<Self, ConfigError> {
        let (kind, args) = spec
            .split_once(':')
            .ok_or_else(|| bad_spec(spec, "expected KIND:ARGS"))?;

        match kind {
            "ext" => Ok(Self::Extensions(split_list(spec, args)?)),
            "is" => Ok(Self::Literals(split_list(spec, args)?)),
            "glob" => Ok(Self::NameGlob {
                pattern: args.to_string(),
                matcher: compile_glob(spec, args)?,
            }),
            "globx" => Ok(Self::PathGlob {
                pattern: args.to_string(),
                matcher: compile_glob(spec, args)?,
            }),
            "firstlinematch" => {
                let (pattern, ignore_case) = parse_delimited_regex(spec, args)?;
                let regex = regex::bytes::RegexBuilder::new(&pattern)
                    .case_insensitive(ignore_case)
                    .unicode(false)
                    .build()
                    .map_err(|e| bad_spec(spec, &e.to_string()))?;
                Ok(Self::FirstLine {
                    pattern: pattern.to_string(),
                    regex,
                })
            }
            other => Err(bad_spec(spec, &format!("unknown filter kind '{}'", other))),
        }
    }

    /// Whether this rule needs the file's first line to decide
    pub fn needs_first_line(&self) -> bool {
        matches!(self, Self::FirstLine { .. })
    }

    /// Test a filename against this rule.
    ///
    /// `first_line` is invoked only by `firstlinematch` rules; callers
    /// cache the loaded line so repeated rules cost one read.
    pub fn matches(
        &self,
        basename: &str,
        rel_path: &str,
        first_line: &mut dyn FnMut() -> Option<Vec<u8>>,
    ) -> bool {
        match self {
            Self::Extensions(exts) => match basename.rsplit_once('.') {
                Some((stem, ext)) if !stem.is_empty() => exts.iter().any(|e| e == ext),
                _ => false,
            },
            Self::Literals(names) => names.iter().any(|n| n == basename),
            Self::NameGlob { matcher, .. } => matcher.is_match(basename),
            Self::PathGlob { matcher, .. } => matcher.is_match(rel_path),
            Self::FirstLine { regex, .. } => match first_line() {
                Some(line) => regex.is_match(&line),
                None => false,
            },
        }
    }
}

impl std::fmt::Display for FilterRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Extensions(exts) => write!(f, "ext:{}", exts.join(",")),
            Self::Literals(names) => write!(f, "is:{}", names.join(",")),
            Self::NameGlob { pattern, .. } => write!(f, "glob:{}", pattern),
            Self::PathGlob { pattern, .. } => write!(f, "globx:{}", pattern),
            Self::FirstLine { pattern, .. } => write!(f, "firstlinematch:/{}/", pattern),
        }
    }
}

fn bad_spec(spec: &str, reason: &str) -> ConfigError {
    ConfigError::InvalidFilterSpec {
        spec: spec.to_string(),
        reason: reason.to_string(),
    }
}

fn split_list(spec: &str, args: &str) -> Result<Vec<String>, ConfigError> {
    if args.is_empty() {
        return Err(bad_spec(spec, "empty argument list"));
    }
    let items: Vec<String> = args.split(',').map(str::to_string).collect();
    if items.iter().any(|i| i.is_empty()) {
        return Err(bad_spec(spec, "empty element in argument list"));
    }
    Ok(items)
}

fn compile_glob(spec: &str, pattern: &str) -> Result<GlobMatcher, ConfigError> {
    if pattern.is_empty() {
        return Err(bad_spec(spec, "empty glob pattern"));
    }
    GlobBuilder::new(pattern)
        // Directory separators are literal; '*' stays within one component.
        .literal_separator(true)
        .build()
        .map(|g| g.compile_matcher())
        .map_err(|e| bad_spec(spec, &e.to_string()))
}

/// Parse `/pattern/flags`; only the `i` flag is recognized
fn parse_delimited_regex(spec: &str, args: &str) -> Result<(String, bool), ConfigError> {
    let rest = args
        .strip_prefix('/')
        .ok_or_else(|| bad_spec(spec, "regex must be slash-delimited"))?;

    let close = rest
        .rfind('/')
        .ok_or_else(|| bad_spec(spec, "missing closing '/'"))?;

    let (pattern, flags) = rest.split_at(close);
    let flags = &flags[1..];

    let mut ignore_case = false;
    for flag in flags.chars() {
        match flag {
            'i' => ignore_case = true,
            other => {
                return Err(bad_spec(spec, &format!("unknown regex flag '{}'", other)));
            }
        }
    }

    if pattern.is_empty() {
        return Err(bad_spec(spec, "empty regex"));
    }

    Ok((pattern.to_string(), ignore_case))
}
