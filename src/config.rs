//! Configuration for codegrep
//!
//! This module defines:
//! - CLI argument parsing using clap derive macros
//! - Rc-file discovery and parsing (one argument per line)
//! - The pre-parse pass that applies type-definition options and rewrites
//!   dynamic `--TYPE` / `--noTYPE` forms into `--type=...`
//! - The validated runtime configuration, including smart-case resolution
//!
//! Argument processing happens in three phases. First the rc files are
//! folded into one argv (`assemble_argv`). Then `apply_type_arguments`
//! walks that argv applying every type-shaping option to the
//! [`TypeManager`] and rewriting dynamic type options; this must happen
//! before clap runs because clap's option table is static while type names
//! are not. Finally clap parses the rewritten argv and
//! [`SearchConfig::build`] validates the result.

use crate::error::{ConfigError, ConfigResult};
use crate::fileid::DevIno;
use crate::scanner::matcher::MatchOptions;
use crate::types::TypeManager;
use clap::Parser;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Rc file basename, looked up in `$HOME` and then from cwd upward
pub const RC_FILE_NAME: &str = ".ucgrc";

/// Default number of directory-traversal threads.
///
/// Traversal is readdir-bound and saturates early; two threads keep the
/// scanner pool fed without fighting it for cores.
const DEFAULT_DIR_JOBS: usize = 2;

/// Parallel code search tool
#[derive(Parser, Debug, Clone)]
#[command(
    name = "codegrep",
    version,
    about = "Recursively search source code for a regex, file-type aware and parallel",
    long_about = "Recursively searches the given paths for PATTERN, limiting the scan to\n\
                  files of recognized source types. File types are extensible on the\n\
                  command line and in rc files.\n\n\
                  Exit status is 0 if any matches were found, 1 if no matches, 2 or\n\
                  greater on error.",
    after_help = "EXAMPLES:\n    \
        codegrep 'sync_queue' src include\n    \
        codegrep -i --cpp 'todo' .\n    \
        codegrep -w --type-add=cpp:ext:inl 'begin' lib\n    \
        codegrep --noenv --ignore-dir=third_party 'license'"
)]
pub struct CliArgs {
    /// Regular expression to search for
    #[arg(value_name = "PATTERN")]
    pub pattern: Option<String>,

    /// Files or directories to search (default: current directory)
    #[arg(value_name = "PATH")]
    pub paths: Vec<PathBuf>,

    /// Ignore case distinctions in PATTERN
    #[arg(short = 'i', long)]
    pub ignore_case: bool,

    /// Ignore case if PATTERN is all lowercase (default: enabled)
    #[arg(long, overrides_with = "no_smart_case")]
    pub smart_case: bool,

    /// Disable the smart-case heuristic
    #[arg(long = "no-smart-case", alias = "nosmart-case")]
    pub no_smart_case: bool,

    /// PATTERN must match a complete word
    #[arg(short = 'w', long)]
    pub word_regexp: bool,

    /// Treat all characters in PATTERN as literal
    #[arg(short = 'Q', long)]
    pub literal: bool,

    /// Print column of first match after the line number
    #[arg(long, overrides_with = "nocolumn")]
    pub column: bool,

    /// Don't print match columns (default)
    #[arg(long)]
    pub nocolumn: bool,

    /// Render the output with ANSI color codes
    #[arg(long, visible_alias = "colour", overrides_with = "nocolor")]
    pub color: bool,

    /// Render the output without ANSI color codes
    #[arg(long, visible_alias = "nocolour")]
    pub nocolor: bool,

    /// Recurse into subdirectories (default: on)
    #[arg(short = 'r', long, visible_short_alias = 'R', overrides_with = "no_recurse")]
    pub recurse: bool,

    /// Do not recurse into subdirectories
    #[arg(short = 'n', long)]
    pub no_recurse: bool,

    /// Only search in files of recognized types (default: on)
    #[arg(short = 'k', long)]
    pub known_types: bool,

    /// Include only [exclude all] TYPE files; also usable as --[no]TYPE
    #[arg(long = "type", value_name = "[no]TYPE", action = clap::ArgAction::Append)]
    pub type_selections: Vec<String>,

    /// Replace type TYPE with files matching FILTER:FILTERARGS
    #[arg(long, value_name = "TYPE:FILTER:FILTERARGS", action = clap::ArgAction::Append)]
    pub type_set: Vec<String>,

    /// Append FILTER:FILTERARGS to type TYPE
    #[arg(long, value_name = "TYPE:FILTER:FILTERARGS", action = clap::ArgAction::Append)]
    pub type_add: Vec<String>,

    /// Remove any definition of type TYPE
    #[arg(long, value_name = "TYPE", action = clap::ArgAction::Append)]
    pub type_del: Vec<String>,

    /// Files matching FILTER:FILTERARGS (e.g. ext:log) will be ignored
    #[arg(long, value_name = "FILTER:FILTERARGS", action = clap::ArgAction::Append)]
    pub ignore_file: Vec<String>,

    /// Only files matching GLOB will be searched
    #[arg(long, value_name = "GLOB", action = clap::ArgAction::Append)]
    pub include: Vec<String>,

    /// Files matching GLOB will be ignored
    #[arg(long, value_name = "GLOB", visible_alias = "ignore", action = clap::ArgAction::Append)]
    pub exclude: Vec<String>,

    /// Exclude directories with this name
    #[arg(long, value_name = "NAME", visible_alias = "ignore-directory", action = clap::ArgAction::Append)]
    pub ignore_dir: Vec<String>,

    /// Do not exclude directories with this name
    #[arg(long, value_name = "NAME", visible_alias = "noignore-directory", action = clap::ArgAction::Append)]
    pub noignore_dir: Vec<String>,

    /// Number of scanner threads (default: one per CPU)
    #[arg(short = 'j', long, value_name = "NUM")]
    pub jobs: Option<usize>,

    /// Number of directory traversal threads
    #[arg(long, value_name = "NUM")]
    pub dirjobs: Option<usize>,

    /// Ignore rc files
    #[arg(long)]
    pub noenv: bool,

    /// Use mmap() to access files being searched
    #[arg(long, hide = true)]
    pub use_mmap: bool,

    /// Print the list of recognized file types and exit
    #[arg(long, visible_alias = "list-file-types")]
    pub help_types: bool,

    /// Verbose output (show per-file warnings)
    #[arg(short = 'v', long)]
    pub verbose: bool,
}

/// Color output policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorMode {
    /// Color iff stdout is a terminal
    Auto,
    Always,
    Never,
}

/// Validated runtime configuration
#[derive(Debug, Clone)]
pub struct SearchConfig {
    /// The user's pattern, untransformed
    pub pattern: String,

    /// Root paths to search
    pub paths: Vec<PathBuf>,

    /// Resolved pattern-transformation switches (smart case applied)
    pub match_options: MatchOptions,

    /// Scanner pool size
    pub scan_jobs: usize,

    /// Traversal pool size
    pub dir_jobs: usize,

    /// Descend into subdirectories
    pub recurse: bool,

    /// Follow symlinks that resolve to regular files
    pub follow_file_symlinks: bool,

    /// Memory-map large files instead of reading them
    pub use_mmap: bool,

    /// Print the column of the first match on each line
    pub show_column: bool,

    /// Color output policy
    pub color: ColorMode,

    /// Verbose logging
    pub verbose: bool,
}

impl SearchConfig {
    /// Validate CLI arguments and resolve the final configuration.
    ///
    /// `types` must already have been through [`apply_type_arguments`];
    /// this step only applies the (rewritten) `--type=` selections.
    pub fn build(args: CliArgs, mut types: TypeManager) -> ConfigResult<(Self, TypeManager)> {
        let pattern = args.pattern.ok_or(ConfigError::MissingPattern)?;

        for selection in &args.type_selections {
            apply_type_selection(&mut types, selection)?;
        }

        let scan_jobs = match args.jobs {
            Some(0) => return Err(ConfigError::InvalidJobCount { what: "jobs" }),
            Some(n) => n,
            None => num_cpus::get().max(1),
        };

        let dir_jobs = match args.dirjobs {
            Some(0) => return Err(ConfigError::InvalidJobCount { what: "dirjobs" }),
            Some(n) => n,
            None => DEFAULT_DIR_JOBS,
        };

        let paths = if args.paths.is_empty() {
            vec![PathBuf::from(".")]
        } else {
            args.paths
        };

        // Smart case: all-lowercase patterns match case-insensitively
        // unless the heuristic is off. An explicit -i always wins.
        let smart_case_on = !args.no_smart_case;
        let ignore_case = args.ignore_case
            || (smart_case_on && !pattern.chars().any(|c| c.is_ascii_uppercase()));

        let match_options = MatchOptions {
            literal: args.literal,
            word_regexp: args.word_regexp,
            ignore_case,
        };

        let color = if args.color {
            ColorMode::Always
        } else if args.nocolor {
            ColorMode::Never
        } else {
            ColorMode::Auto
        };

        let config = Self {
            pattern,
            paths,
            match_options,
            scan_jobs,
            dir_jobs,
            recurse: !args.no_recurse,
            follow_file_symlinks: true,
            use_mmap: args.use_mmap,
            show_column: args.column,
            color,
            verbose: args.verbose,
        };

        Ok((config, types))
    }

    /// A minimal configuration for unit tests
    #[cfg(test)]
    pub fn for_tests() -> Self {
        Self {
            pattern: "test".into(),
            paths: vec![PathBuf::from(".")],
            match_options: MatchOptions::default(),
            scan_jobs: 2,
            dir_jobs: 2,
            recurse: true,
            follow_file_symlinks: true,
            use_mmap: false,
            show_column: false,
            color: ColorMode::Never,
            verbose: false,
        }
    }
}

/// Apply one `--type=` value: `NAME` enables, `noNAME` disables
fn apply_type_selection(types: &mut TypeManager, value: &str) -> ConfigResult<()> {
    if types.enable(value).is_ok() {
        return Ok(());
    }
    if let Some(negated) = value.strip_prefix("no") {
        return types.disable(negated);
    }
    Err(ConfigError::UnknownType {
        name: value.to_string(),
    })
}

// ---------------------------------------------------------------------------
// Phase 1: rc files
// ---------------------------------------------------------------------------

/// Fold the rc-file arguments into the command-line argv.
///
/// Result: `argv[0]`, user rc args, project rc args, then `argv[1..]`.
/// `--noenv` anywhere before a literal `--` suppresses both rc files.
pub fn assemble_argv(cli: &[String]) -> ConfigResult<Vec<String>> {
    assemble_argv_at(cli, user_home_dir(), std::env::current_dir().ok())
}

/// [`assemble_argv`] with the home directory and cwd made explicit
pub fn assemble_argv_at(
    cli: &[String],
    home: Option<PathBuf>,
    cwd: Option<PathBuf>,
) -> ConfigResult<Vec<String>> {
    let barrier = cli
        .iter()
        .position(|a| a == "--")
        .unwrap_or(cli.len());
    let noenv = cli[..barrier].iter().skip(1).any(|a| a == "--noenv");

    let mut combined = Vec::with_capacity(cli.len() + 8);
    combined.push(cli.first().cloned().unwrap_or_else(|| "codegrep".into()));

    if !noenv {
        if let Some(user_rc) = home.as_ref().map(|h| h.join(RC_FILE_NAME)) {
            combined.extend(read_rc_file(&user_rc)?);
        }

        if let Some(project_rc) = find_project_rc(home.as_deref(), cwd) {
            combined.extend(read_rc_file(&project_rc)?);
        }
    }

    combined.extend(cli.iter().skip(1).cloned());
    Ok(combined)
}

/// `$HOME` first, then the OS user database
fn user_home_dir() -> Option<PathBuf> {
    std::env::var_os("HOME")
        .filter(|h| !h.is_empty())
        .map(PathBuf::from)
        .or_else(dirs::home_dir)
}

/// Read and parse an rc file; a missing file yields no arguments
fn read_rc_file(path: &Path) -> ConfigResult<Vec<String>> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Couldn't open rc file");
            return Ok(Vec::new());
        }
    };

    debug!(path = %path.display(), "Parsing rc file");
    parse_rc_content(path, &content)
}

/// Parse rc file text: one argument per line, `#` comments, whitespace
/// trimmed. A literal `--` or a non-option line is an error.
pub fn parse_rc_content(path: &Path, content: &str) -> ConfigResult<Vec<String>> {
    let mut args = Vec::new();

    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if line == "--" {
            return Err(ConfigError::RcDoubleDash {
                file: path.to_path_buf(),
            });
        }
        if !line.starts_with('-') {
            return Err(ConfigError::RcNonOption {
                file: path.to_path_buf(),
                arg: line.to_string(),
            });
        }
        args.push(line.to_string());
    }

    Ok(args)
}

/// Walk from cwd upward looking for the project rc file.
///
/// Stops without a result at the user's home directory (compared by
/// (dev, ino), so paths needn't be canonical) or at the filesystem root.
/// The home directory's own rc is the *user* rc, never the project rc.
fn find_project_rc(home: Option<&Path>, cwd: Option<PathBuf>) -> Option<PathBuf> {
    let home_id = home.and_then(dir_identity);

    let mut current = cwd?;

    loop {
        if let (Some(home_id), Some(current_id)) = (home_id, dir_identity(&current)) {
            if home_id == current_id {
                return None;
            }
        }

        let candidate = current.join(RC_FILE_NAME);
        if candidate.is_file() {
            debug!(path = %candidate.display(), "Found project rc file");
            return Some(candidate);
        }

        if !current.pop() {
            return None;
        }
    }
}

fn dir_identity(path: &Path) -> Option<DevIno> {
    std::fs::metadata(path).ok().map(|m| DevIno::of(&m))
}

// ---------------------------------------------------------------------------
// Phase 2: type-shaping options and dynamic --TYPE rewriting
// ---------------------------------------------------------------------------

/// Walk the assembled argv left to right, applying every type-shaping
/// option to `types` and rewriting dynamic `--TYPE` / `--noTYPE` forms
/// into `--type=...` so the static clap parser can digest them.
///
/// Processing stops at a literal `--`. Options are matched in both
/// `--opt=value` and `--opt value` forms; the tokens are left in place
/// for clap to validate.
pub fn apply_type_arguments(argv: &mut [String], types: &mut TypeManager) -> ConfigResult<()> {
    let mut i = 1;
    while i < argv.len() {
        if argv[i] == "--" {
            break;
        }

        let Some(body) = argv[i].strip_prefix("--").map(str::to_string) else {
            i += 1;
            continue;
        };
        if body.is_empty() {
            i += 1;
            continue;
        }

        let (cmd, inline_value) = match body.split_once('=') {
            Some((cmd, value)) => (cmd.to_string(), Some(value.to_string())),
            None => (body.clone(), None),
        };

        // Fetch `--opt value` operands without consuming them.
        let take_value = |argv: &[String], at: usize| -> Option<(String, usize)> {
            match &inline_value {
                Some(v) => Some((v.clone(), at + 1)),
                None => argv.get(at + 1).map(|v| (v.clone(), at + 2)),
            }
        };

        match cmd.as_str() {
            "type-set" => {
                let Some((value, next)) = take_value(argv, i) else { break };
                let (name, spec) = split_named_spec(&value)?;
                types.add_rule_spec(name, spec, true)?;
                i = next;
            }
            "type-add" => {
                let Some((value, next)) = take_value(argv, i) else { break };
                let (name, spec) = split_named_spec(&value)?;
                types.add_rule_spec(name, spec, false)?;
                i = next;
            }
            "type-del" => {
                let Some((value, next)) = take_value(argv, i) else { break };
                // Deleting an unknown type is not an error.
                types.delete_type(&value);
                i = next;
            }
            "ignore-file" => {
                let Some((value, next)) = take_value(argv, i) else { break };
                types.add_ignore_file_spec(&value)?;
                i = next;
            }
            "exclude" | "ignore" => {
                let Some((value, next)) = take_value(argv, i) else { break };
                types.add_exclude_glob(&value)?;
                i = next;
            }
            "include" => {
                let Some((value, next)) = take_value(argv, i) else { break };
                types.add_include_glob(&value)?;
                i = next;
            }
            "ignore-dir" | "ignore-directory" => {
                let Some((value, next)) = take_value(argv, i) else { break };
                types.add_excluded_dir(OsStr::new(&value));
                i = next;
            }
            "noignore-dir" | "noignore-directory" => {
                let Some((value, next)) = take_value(argv, i) else { break };
                types.remove_excluded_dir(OsStr::new(&value));
                i = next;
            }
            _ if inline_value.is_none() => {
                rewrite_dynamic_type_option(&mut argv[i], &cmd, types)?;
                i += 1;
            }
            _ => {
                i += 1;
            }
        }
    }

    Ok(())
}

/// Rewrite `--TYPE` / `--noTYPE` into `--type=[no]NAME` when the body is a
/// unique prefix of a registered type name; ambiguity is an error; no
/// match passes the token through untouched for clap to judge.
fn rewrite_dynamic_type_option(
    arg: &mut String,
    body: &str,
    types: &TypeManager,
) -> ConfigResult<()> {
    let candidates = types.matching_type_names(body);
    match candidates.len() {
        1 => {
            *arg = format!("--type={}", candidates[0]);
            return Ok(());
        }
        n if n > 1 => {
            return Err(ambiguous(body, "--", &candidates));
        }
        _ => {}
    }

    if let Some(negated) = body.strip_prefix("no") {
        let candidates = types.matching_type_names(negated);
        match candidates.len() {
            1 => *arg = format!("--type=no{}", candidates[0]),
            n if n > 1 => return Err(ambiguous(body, "--no", &candidates)),
            _ => {}
        }
    }

    Ok(())
}

fn ambiguous(option: &str, dash_prefix: &str, names: &[String]) -> ConfigError {
    let possibilities = names
        .iter()
        .map(|n| format!("'{}{}'", dash_prefix, n))
        .collect::<Vec<_>>()
        .join(" ");
    ConfigError::AmbiguousTypeOption {
        option: option.to_string(),
        possibilities,
    }
}

/// Split `NAME:KIND:ARGS` into the type name and the filter spec
fn split_named_spec(value: &str) -> ConfigResult<(&str, &str)> {
    value.split_once(':').ok_or_else(|| ConfigError::InvalidFilterSpec {
        spec: value.to_string(),
        reason: "expected TYPE:FILTER:FILTERARGS".to_string(),
    })
}
