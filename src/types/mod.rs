//! File-type registry and classifier
//!
//! The [`TypeManager`] owns every file-type definition (builtin plus
//! user-defined), the enabled/disabled selection state, the anonymous
//! ignore-file and include types, and the excluded-directory set. It is
//! built during argument parsing and immutable afterwards, so the
//! traversal workers share it read-only.
//!
//! Classification of a filename runs the cheap name-based rules first;
//! `firstlinematch` rules only ever open the file when nothing cheaper has
//! already decided, and the first line is read at most once per file.

pub mod defaults;
pub mod filter;

use crate::error::ConfigError;
use crate::fileid::FileIdentity;
use filter::FilterRule;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::ffi::{OsStr, OsString};
use std::io::Read;
use tracing::debug;

/// A named file type: an ordered list of disjunctive filter rules
#[derive(Debug, Clone)]
pub struct FileType {
    rules: Vec<FilterRule>,
}

/// Outcome of classifying one filename
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    Accept,
    Reject,
}

/// Registry of file-type definitions and the active selection state
#[derive(Debug, Clone)]
pub struct TypeManager {
    /// name -> definition, sorted for deterministic help and prefix lookup
    types: BTreeMap<String, FileType>,

    /// Enabled type names. Starts as all known types; the first explicit
    /// enable replaces the implicit everything-set with just that name.
    active: BTreeSet<String>,

    /// Whether an explicit enable has replaced the implicit default
    saw_explicit_enable: bool,

    /// Anonymous type: any match unconditionally excludes the file
    ignore_rules: Vec<FilterRule>,

    /// Anonymous type: when non-empty, only matching files survive
    include_rules: Vec<FilterRule>,

    /// Directory basenames pruned from traversal
    excluded_dirs: HashSet<OsString>,
}

impl TypeManager {
    /// An empty registry: no types, no excludes
    pub fn new() -> Self {
        Self {
            types: BTreeMap::new(),
            active: BTreeSet::new(),
            saw_explicit_enable: false,
            ignore_rules: Vec::new(),
            include_rules: Vec::new(),
            excluded_dirs: HashSet::new(),
        }
    }

    /// The standard registry: builtin type table plus default directory
    /// excludes
    pub fn with_default_types() -> Self {
        let mut tm = Self::new();

        for (name, specs) in defaults::DEFAULT_TYPES {
            for spec in *specs {
                tm.add_rule_spec(name, spec, false)
                    .expect("builtin type table is valid");
            }
        }
        for dir in defaults::DEFAULT_IGNORED_DIRS {
            tm.add_excluded_dir(OsStr::new(dir));
        }

        tm
    }

    /// Append (or, with `replace`, replace-then-append) a rule parsed from
    /// a `KIND:ARGS` filter spec to the named type, creating the type if
    /// needed.
    pub fn add_rule_spec(
        &mut self,
        type_name: &str,
        spec: &str,
        replace: bool,
    ) -> Result<(), ConfigError> {
        let rule = FilterRule::parse(spec)?;

        if replace {
            self.types.remove(type_name);
        }

        self.types
            .entry(type_name.to_string())
            .or_insert_with(|| FileType { rules: Vec::new() })
            .rules
            .push(rule);

        // A brand-new type joins the implicit everything-set unless an
        // explicit enable has already narrowed the selection.
        if !self.saw_explicit_enable {
            self.active.insert(type_name.to_string());
        }

        Ok(())
    }

    /// Remove a type definition. Removing an unknown type is not an error.
    pub fn delete_type(&mut self, name: &str) {
        self.types.remove(name);
        self.active.remove(name);
    }

    /// Enable a type (`--type=NAME`). The first enable discards the
    /// implicit all-known-types default.
    pub fn enable(&mut self, name: &str) -> Result<(), ConfigError> {
        if !self.types.contains_key(name) {
            return Err(ConfigError::UnknownType { name: name.into() });
        }
        if !self.saw_explicit_enable {
            self.active.clear();
            self.saw_explicit_enable = true;
        }
        self.active.insert(name.to_string());
        Ok(())
    }

    /// Disable a type (`--type=noNAME`)
    pub fn disable(&mut self, name: &str) -> Result<(), ConfigError> {
        if !self.types.contains_key(name) {
            return Err(ConfigError::UnknownType { name: name.into() });
        }
        self.active.remove(name);
        Ok(())
    }

    /// Append a rule to the anonymous ignore-file type
    pub fn add_ignore_file_spec(&mut self, spec: &str) -> Result<(), ConfigError> {
        self.ignore_rules.push(FilterRule::parse(spec)?);
        Ok(())
    }

    /// Append a basename glob to the anonymous include type; once
    /// non-empty, only files matching it are scanned
    pub fn add_include_glob(&mut self, glob: &str) -> Result<(), ConfigError> {
        self.include_rules
            .push(FilterRule::parse(&format!("glob:{}", glob))?);
        Ok(())
    }

    /// Append a path glob to the ignore-file type (`--exclude`/`--ignore`)
    pub fn add_exclude_glob(&mut self, glob: &str) -> Result<(), ConfigError> {
        self.ignore_rules
            .push(FilterRule::parse(&format!("globx:{}", glob))?);
        Ok(())
    }

    /// Add a directory basename to the traversal excludes
    pub fn add_excluded_dir(&mut self, name: &OsStr) {
        self.excluded_dirs.insert(name.to_os_string());
    }

    /// Remove a directory basename from the traversal excludes
    pub fn remove_excluded_dir(&mut self, name: &OsStr) {
        self.excluded_dirs.remove(name);
    }

    /// Whether traversal should prune a directory with this basename
    pub fn is_dir_excluded(&self, basename: &OsStr) -> bool {
        self.excluded_dirs.contains(basename)
    }

    /// Classify a discovered file.
    ///
    /// `first_line` is called at most once, and only when a
    /// `firstlinematch` rule must decide.
    pub fn classify(
        &self,
        basename: &str,
        rel_path: &str,
        first_line: &mut dyn FnMut() -> Option<Vec<u8>>,
    ) -> Classification {
        // 1. Universal excludes.
        if self
            .ignore_rules
            .iter()
            .any(|r| r.matches(basename, rel_path, first_line))
        {
            return Classification::Reject;
        }

        // 2. Restrictive includes, when any were given.
        if !self.include_rules.is_empty()
            && !self
                .include_rules
                .iter()
                .any(|r| r.matches(basename, rel_path, first_line))
        {
            return Classification::Reject;
        }

        // 3. Known-types-only: some enabled type must claim the file.
        // Name-based rules across all enabled types run before any
        // first-line rule so unclaimed files usually never get opened.
        for name in &self.active {
            let ft = &self.types[name];
            if ft
                .rules
                .iter()
                .filter(|r| !r.needs_first_line())
                .any(|r| r.matches(basename, rel_path, first_line))
            {
                return Classification::Accept;
            }
        }
        for name in &self.active {
            let ft = &self.types[name];
            if ft
                .rules
                .iter()
                .filter(|r| r.needs_first_line())
                .any(|r| r.matches(basename, rel_path, first_line))
            {
                return Classification::Accept;
            }
        }

        Classification::Reject
    }

    /// Resolve a `--PARTIAL` option against the type names: exact match
    /// wins; otherwise every name with this prefix.
    pub fn matching_type_names(&self, partial: &str) -> Vec<String> {
        if self.types.contains_key(partial) {
            return vec![partial.to_string()];
        }
        self.types
            .keys()
            .filter(|name| name.starts_with(partial))
            .cloned()
            .collect()
    }

    /// (name, "spec, spec, ...") pairs for `--help-types`, sorted by name
    pub fn types_for_help(&self) -> Vec<(String, String)> {
        self.types
            .iter()
            .map(|(name, ft)| {
                let specs: Vec<String> = ft.rules.iter().map(|r| r.to_string()).collect();
                (name.clone(), specs.join(", "))
            })
            .collect()
    }

    /// Number of registered types
    pub fn type_count(&self) -> usize {
        self.types.len()
    }
}

impl Default for TypeManager {
    fn default() -> Self {
        Self::with_default_types()
    }
}

/// Cached first-line loader for one file.
///
/// Opens through the identity's directory-handle chain, reads at most
/// [`FIRST_LINE_MAX`] bytes on first use, and caches the result for any
/// further `firstlinematch` rules. The trailing newline is stripped.
pub struct FirstLineLoader<'a> {
    file: &'a FileIdentity,
    cached: Option<Option<Vec<u8>>>,
}

/// Upper bound on how much of a file the first-line probe reads
const FIRST_LINE_MAX: usize = 4096;

impl<'a> FirstLineLoader<'a> {
    pub fn new(file: &'a FileIdentity) -> Self {
        Self { file, cached: None }
    }

    /// The first line without its trailing newline, or `None` if the file
    /// couldn't be read
    pub fn load(&mut self) -> Option<Vec<u8>> {
        if self.cached.is_none() {
            self.cached = Some(read_first_line(self.file));
        }
        self.cached.as_ref().unwrap().clone()
    }
}

fn read_first_line(file: &FileIdentity) -> Option<Vec<u8>> {
    let mut handle = match file.open() {
        Ok(f) => f,
        Err(e) => {
            debug!(path = %file.path().display(), error = %e, "First-line probe failed to open");
            return None;
        }
    };

    let mut buf = vec![0u8; FIRST_LINE_MAX];
    let n = match handle.read(&mut buf) {
        Ok(n) => n,
        Err(e) => {
            debug!(path = %file.path().display(), error = %e, "First-line probe failed to read");
            return None;
        }
    };
    buf.truncate(n);

    if let Some(eol) = buf.iter().position(|&b| b == b'\n') {
        buf.truncate(eol);
        // Keep byte semantics but don't let a CRLF file leak the '\r'.
        if buf.last() == Some(&b'\r') {
            buf.pop();
        }
    }

    Some(buf)
}
