//! codegrep - Parallel Source-Code Search
//!
//! A grep-style tool that recursively discovers source files of recognized
//! types and reports lines matching a regular expression. Designed around
//! a fully parallel pipeline so large repositories scan at I/O speed.
//!
//! # Features
//!
//! - **File-type aware**: files are classified against an extensible
//!   registry of type definitions (extension sets, literal names, globs,
//!   first-line regexes); unrecognized files are never opened.
//!
//! - **Parallel pipeline**: a traversal pool walks directories while a
//!   scanner pool matches file contents, connected by synchronized work
//!   queues.
//!
//! - **Line-disciplined matching**: patterns are free to use multiline
//!   constructs like `\s`, but a match never spans a newline.
//!
//! - **Rc-file configuration**: per-user and per-project rc files are
//!   folded into the command line.
//!
//! # Architecture
//!
//! ```text
//!  root paths
//!      │
//!      ▼
//! ┌───────────────────────┐   subdirs (self-feeding)
//! │  directory queue (Q0) │◄───────────────┐
//! └──────────┬────────────┘                │
//!            ▼                             │
//! ┌───────────────────────┐                │
//! │  Traversal workers    │────────────────┘
//! │  (classify filenames) │
//! └──────────┬────────────┘
//!            │ accepted files
//!            ▼
//! ┌───────────────────────┐
//! │  scan queue (Q1)      │
//! └──────────┬────────────┘
//!            ▼
//! ┌───────────────────────┐
//! │  Scanner workers      │
//! │  (regex over bytes)   │
//! └──────────┬────────────┘
//!            │ per-file match lists
//!            ▼
//! ┌───────────────────────┐
//! │  results channel (Q2) │──► driver thread prints
//! └───────────────────────┘
//! ```
//!
//! Traversal termination uses the directory queue's idle quorum: when
//! every walker is parked on an empty queue there is no more work, and
//! the coordinator closes the queues in dependency order.
//!
//! # Example
//!
//! ```bash
//! # Search all recognized source files under the current directory
//! codegrep 'sync_queue'
//!
//! # C/C++ only, case-insensitive, match whole words
//! codegrep -i -w --cc --cpp 'todo' src include
//!
//! # Teach it a new type on the fly
//! codegrep --type-set=proto:ext:proto 'service' .
//! ```

pub mod config;
pub mod coordinator;
pub mod error;
pub mod fileid;
pub mod output;
pub mod queue;
pub mod scanner;
pub mod types;
pub mod walker;

pub use config::{CliArgs, SearchConfig};
pub use coordinator::{SearchCoordinator, SearchSummary};
pub use error::{ConfigError, Result, SearchError};
pub use fileid::{DevIno, FileIdentity, FileKind};
pub use queue::{QueueClosed, SyncQueue};
pub use scanner::{FileMatches, MatchList, MatchRecord, PatternMatcher};
pub use types::TypeManager;
