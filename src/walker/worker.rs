//! Traversal worker pool
//!
//! Each worker pulls a directory identity off the self-feeding directory
//! queue, enumerates its entries, pushes non-excluded subdirectories back
//! onto the same queue, and runs every regular file through the type
//! classifier; accepted files go onto the scan queue.
//!
//! Workers cannot tell on their own when the walk is done (another worker
//! may still produce directories), so they simply pend on the queue; the
//! coordinator watches for the idle quorum and closes the queue, which
//! breaks every worker out of its pull loop.

use crate::config::SearchConfig;
use crate::error::WorkerError;
use crate::fileid::{FileIdentity, FileKind};
use crate::queue::SyncQueue;
use crate::types::{Classification, FirstLineLoader, TypeManager};
use crate::walker::visited::VisitedSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{debug, trace, warn};

/// Shared state for the traversal pool
pub struct TraversalContext {
    pub config: Arc<SearchConfig>,
    pub types: Arc<TypeManager>,

    /// Q0: directories to enumerate (self-feeding)
    pub dir_queue: Arc<SyncQueue<Arc<FileIdentity>>>,

    /// Q1: files accepted for scanning
    pub file_queue: Arc<SyncQueue<FileIdentity>>,

    /// Directories already entered, for loop/bind-mount protection
    pub visited_dirs: Arc<VisitedSet>,

    /// Files already queued, for hard-link/symlink double-scan protection
    pub visited_files: Arc<VisitedSet>,
}

/// Statistics collected by a traversal worker
#[derive(Debug, Default)]
pub struct TraversalStats {
    /// Directories enumerated
    pub dirs_walked: AtomicU64,

    /// Files pushed onto the scan queue
    pub files_enqueued: AtomicU64,

    /// Files rejected by the type filter
    pub files_rejected: AtomicU64,

    /// Directories pruned by name or dedup
    pub dirs_pruned: AtomicU64,

    /// Readdir/stat errors
    pub errors: AtomicU64,
}

/// A traversal worker thread
pub struct TraversalWorker {
    id: usize,
    handle: Option<JoinHandle<()>>,
    stats: Arc<TraversalStats>,
}

impl TraversalWorker {
    /// Spawn a traversal worker on the shared context
    pub fn spawn(id: usize, ctx: Arc<TraversalContext>) -> Result<Self, WorkerError> {
        let stats = Arc::new(TraversalStats::default());
        let stats_clone = Arc::clone(&stats);

        let handle = thread::Builder::new()
            .name(format!("walker-{}", id))
            .spawn(move || {
                worker_loop(id, ctx, stats_clone);
            })
            .map_err(|e| WorkerError::SpawnFailed {
                id,
                reason: e.to_string(),
            })?;

        Ok(Self {
            id,
            handle: Some(handle),
            stats,
        })
    }

    /// Worker statistics
    pub fn stats(&self) -> &TraversalStats {
        &self.stats
    }

    /// Shared handle to the statistics, for reading after `join`
    pub fn stats_handle(&self) -> Arc<TraversalStats> {
        Arc::clone(&self.stats)
    }

    /// Wait for the worker to finish
    pub fn join(mut self) -> Result<(), WorkerError> {
        if let Some(handle) = self.handle.take() {
            handle.join().map_err(|_| WorkerError::Panicked {
                id: self.id,
                message: "walker thread panicked".into(),
            })?;
        }
        Ok(())
    }
}

/// Main traversal loop: runs until the coordinator closes the directory
/// queue
fn worker_loop(id: usize, ctx: Arc<TraversalContext>, stats: Arc<TraversalStats>) {
    debug!(worker = id, "Walker starting");

    while let Ok(dir) = ctx.dir_queue.pull() {
        walk_directory(id, &dir, &ctx, &stats);
    }

    debug!(
        worker = id,
        dirs = stats.dirs_walked.load(Ordering::Relaxed),
        files = stats.files_enqueued.load(Ordering::Relaxed),
        "Walker shutting down"
    );
}

/// Enumerate one directory: recurse into subdirectories, classify files.
///
/// All filesystem access is relative to the directory's own handle
/// (opened via its parent's handle), never through a re-resolved full
/// path.
fn walk_directory(
    id: usize,
    dir: &Arc<FileIdentity>,
    ctx: &TraversalContext,
    stats: &TraversalStats,
) {
    let dir_handle = match dir.dir_handle() {
        Ok(handle) => handle,
        Err(e) => {
            warn!(worker = id, path = %dir.path().display(), error = %e, "Failed to open directory");
            stats.errors.fetch_add(1, Ordering::Relaxed);
            return;
        }
    };

    let entries = match dir_handle.list_dir(".") {
        Ok(entries) => entries,
        Err(e) => {
            warn!(worker = id, path = %dir.path().display(), error = %e, "Failed to read directory");
            stats.errors.fetch_add(1, Ordering::Relaxed);
            return;
        }
    };

    stats.dirs_walked.fetch_add(1, Ordering::Relaxed);

    for entry in entries {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                warn!(worker = id, path = %dir.path().display(), error = %e, "Failed to read directory entry");
                stats.errors.fetch_add(1, Ordering::Relaxed);
                continue;
            }
        };

        let kind = match entry_kind(dir_handle, &entry) {
            Ok(kind) => kind,
            Err(e) => {
                warn!(worker = id, path = %dir.path().display(), error = %e, "Failed to type directory entry");
                stats.errors.fetch_add(1, Ordering::Relaxed);
                continue;
            }
        };

        let name = entry.file_name().to_os_string();

        match kind {
            FileKind::Directory => {
                enter_subdirectory(id, dir, name, ctx, stats);
            }
            FileKind::Regular => {
                consider_file(id, dir, name, FileKind::Regular, ctx, stats);
            }
            FileKind::Symlink if ctx.config.follow_file_symlinks => {
                consider_symlink(id, dir, name, ctx, stats);
            }
            _ => {
                trace!(worker = id, name = %name.to_string_lossy(), "Skipping non-file entry");
            }
        }
    }
}

/// Entry kind from the readdir record, falling back to an
/// `fstatat`-relative stat when the filesystem reported no d_type
fn entry_kind(dir: &openat::Dir, entry: &openat::Entry) -> std::io::Result<FileKind> {
    if let Some(simple) = entry.simple_type() {
        return Ok(kind_of(simple));
    }
    Ok(kind_of(dir.metadata(entry.file_name())?.simple_type()))
}

fn kind_of(simple: openat::SimpleType) -> FileKind {
    match simple {
        openat::SimpleType::Dir => FileKind::Directory,
        openat::SimpleType::File => FileKind::Regular,
        openat::SimpleType::Symlink => FileKind::Symlink,
        openat::SimpleType::Other => FileKind::Unknown,
    }
}

fn enter_subdirectory(
    id: usize,
    parent: &Arc<FileIdentity>,
    name: std::ffi::OsString,
    ctx: &TraversalContext,
    stats: &TraversalStats,
) {
    if ctx.types.is_dir_excluded(&name) {
        trace!(worker = id, name = %name.to_string_lossy(), "Pruning excluded directory");
        stats.dirs_pruned.fetch_add(1, Ordering::Relaxed);
        return;
    }

    if !ctx.config.recurse {
        stats.dirs_pruned.fetch_add(1, Ordering::Relaxed);
        return;
    }

    let child = Arc::new(FileIdentity::from_entry(
        Arc::clone(parent),
        name,
        Some(FileKind::Directory),
    ));

    let identity = match child.dev_ino() {
        Some(identity) => identity,
        None => {
            warn!(worker = id, path = %child.path().display(), "Failed to stat directory");
            stats.errors.fetch_add(1, Ordering::Relaxed);
            return;
        }
    };

    if !ctx.visited_dirs.first_visit(identity) {
        trace!(worker = id, path = %child.path().display(), "Already visited");
        stats.dirs_pruned.fetch_add(1, Ordering::Relaxed);
        return;
    }

    if ctx.dir_queue.push(child).is_err() {
        // Queue closed mid-walk: shutdown in progress.
        debug!(worker = id, "Directory queue closed during walk");
    }
}

fn consider_file(
    id: usize,
    parent: &Arc<FileIdentity>,
    name: std::ffi::OsString,
    kind: FileKind,
    ctx: &TraversalContext,
    stats: &TraversalStats,
) {
    let child = FileIdentity::from_entry(Arc::clone(parent), name, Some(kind));

    if !classify_accepts(&child, ctx) {
        stats.files_rejected.fetch_add(1, Ordering::Relaxed);
        return;
    }

    let identity = match child.dev_ino() {
        Some(identity) => identity,
        None => {
            warn!(worker = id, path = %child.path().display(), "Failed to stat file");
            stats.errors.fetch_add(1, Ordering::Relaxed);
            return;
        }
    };

    if !ctx.visited_files.first_visit(identity) {
        trace!(worker = id, path = %child.path().display(), "File already queued");
        return;
    }

    stats.files_enqueued.fetch_add(1, Ordering::Relaxed);
    if ctx.file_queue.push(child).is_err() {
        debug!(worker = id, "File queue closed during walk");
    }
}

/// Symlink policy: follow to regular files (identity taken from the
/// target so the object is never scanned twice), never to directories.
fn consider_symlink(
    id: usize,
    parent: &Arc<FileIdentity>,
    name: std::ffi::OsString,
    ctx: &TraversalContext,
    stats: &TraversalStats,
) {
    let child = FileIdentity::from_entry(Arc::clone(parent), name, Some(FileKind::Regular));

    let target = match child.target_stat() {
        Ok(stat) => stat,
        Err(e) => {
            // Dangling link; common enough to stay quiet about.
            trace!(worker = id, path = %child.path().display(), error = %e, "Broken symlink");
            return;
        }
    };

    if target.kind != FileKind::Regular {
        trace!(worker = id, path = %child.path().display(), "Not following symlink to non-file");
        return;
    }

    if !classify_accepts(&child, ctx) {
        stats.files_rejected.fetch_add(1, Ordering::Relaxed);
        return;
    }

    let identity = match target.identity {
        Some(identity) => identity,
        None => return,
    };

    if !ctx.visited_files.first_visit(identity) {
        trace!(worker = id, path = %child.path().display(), "Symlink target already queued");
        return;
    }

    stats.files_enqueued.fetch_add(1, Ordering::Relaxed);
    if ctx.file_queue.push(child).is_err() {
        debug!(worker = id, "File queue closed during walk");
    }
}

/// Run the type classifier over one candidate file
fn classify_accepts(child: &FileIdentity, ctx: &TraversalContext) -> bool {
    let basename = child.basename().to_string_lossy().into_owned();

    let root = child.scan_root();
    let rel_path = child
        .path()
        .strip_prefix(root.path())
        .unwrap_or_else(|_| child.path())
        .to_string_lossy()
        .into_owned();

    let mut loader = FirstLineLoader::new(child);
    let mut first_line = || loader.load();

    ctx.types.classify(&basename, &rel_path, &mut first_line) == Classification::Accept
}
