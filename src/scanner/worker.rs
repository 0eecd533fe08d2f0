//! Scanner worker pool
//!
//! Each worker pulls file identities from the scan queue, obtains the file
//! bytes (read or mmap), runs the compiled pattern over them, and emits a
//! [`FileMatches`] onto the results channel when anything matched. The
//! pool exits when the scan queue is closed and drained.

use crate::config::SearchConfig;
use crate::error::WorkerError;
use crate::fileid::FileIdentity;
use crate::queue::SyncQueue;
use crate::scanner::matcher::PatternMatcher;
use crate::scanner::matches::FileMatches;
use crossbeam_channel::Sender;
use std::io::Read;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{debug, trace, warn};

/// Files at or above this size are memory-mapped when mmap is enabled
const MMAP_THRESHOLD: u64 = 16 * 1024;

/// How many leading bytes the binary-detection heuristic examines
const BINARY_PROBE_LEN: usize = 512;

/// Statistics collected by a scanner worker
#[derive(Debug, Default)]
pub struct ScannerStats {
    /// Files fully scanned
    pub files_scanned: AtomicU64,

    /// Files with at least one match
    pub files_matched: AtomicU64,

    /// Total matching lines emitted
    pub lines_matched: AtomicU64,

    /// Files skipped (empty, binary, unreadable)
    pub files_skipped: AtomicU64,

    /// I/O errors encountered
    pub errors: AtomicU64,
}

/// A scanner worker thread
pub struct ScannerWorker {
    id: usize,
    handle: Option<JoinHandle<()>>,
    stats: Arc<ScannerStats>,
}

impl ScannerWorker {
    /// Spawn a scanner worker on the given queue and results channel
    pub fn spawn(
        id: usize,
        config: Arc<SearchConfig>,
        matcher: Arc<PatternMatcher>,
        file_queue: Arc<SyncQueue<FileIdentity>>,
        results_tx: Sender<FileMatches>,
    ) -> Result<Self, WorkerError> {
        let stats = Arc::new(ScannerStats::default());
        let stats_clone = Arc::clone(&stats);

        let handle = thread::Builder::new()
            .name(format!("scanner-{}", id))
            .spawn(move || {
                scanner_loop(id, config, matcher, file_queue, results_tx, stats_clone);
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
    pub fn stats(&self) -> &ScannerStats {
        &self.stats
    }

    /// Shared handle to the statistics, for reading after `join`
    pub fn stats_handle(&self) -> Arc<ScannerStats> {
        Arc::clone(&self.stats)
    }

    /// Wait for the worker to finish
    pub fn join(mut self) -> Result<(), WorkerError> {
        if let Some(handle) = self.handle.take() {
            handle.join().map_err(|_| WorkerError::Panicked {
                id: self.id,
                message: "scanner thread panicked".into(),
            })?;
        }
        Ok(())
    }
}

/// Main scanner loop: runs until the file queue is closed and empty
fn scanner_loop(
    id: usize,
    config: Arc<SearchConfig>,
    matcher: Arc<PatternMatcher>,
    file_queue: Arc<SyncQueue<FileIdentity>>,
    results_tx: Sender<FileMatches>,
    stats: Arc<ScannerStats>,
) {
    debug!(worker = id, "Scanner starting");

    while let Ok(file) = file_queue.pull() {
        scan_one(id, &file, &config, &matcher, &results_tx, &stats);
    }

    debug!(
        worker = id,
        scanned = stats.files_scanned.load(Ordering::Relaxed),
        matched = stats.files_matched.load(Ordering::Relaxed),
        "Scanner shutting down"
    );
}

fn scan_one(
    id: usize,
    file: &FileIdentity,
    config: &SearchConfig,
    matcher: &PatternMatcher,
    results_tx: &Sender<FileMatches>,
    stats: &ScannerStats,
) {
    let path = file.path();

    // Opened relative to the directory handle captured at traversal time,
    // so a path component swapped since classification cannot redirect
    // the open.
    let handle = match file.open() {
        Ok(f) => f,
        Err(e) => {
            warn!(worker = id, path = %path.display(), error = %e, "Failed to open file");
            stats.errors.fetch_add(1, Ordering::Relaxed);
            stats.files_skipped.fetch_add(1, Ordering::Relaxed);
            return;
        }
    };

    // Size from the open descriptor: the queued stat may describe a
    // symlink rather than its target, and the file may have changed since.
    let size = match handle.metadata() {
        Ok(meta) => meta.len(),
        Err(e) => {
            warn!(worker = id, path = %path.display(), error = %e, "Failed to stat open file");
            stats.errors.fetch_add(1, Ordering::Relaxed);
            stats.files_skipped.fetch_add(1, Ordering::Relaxed);
            return;
        }
    };

    if size == 0 {
        trace!(worker = id, path = %path.display(), "Skipping empty file");
        stats.files_skipped.fetch_add(1, Ordering::Relaxed);
        return;
    }

    // Obtain the bytes: mmap for large files when configured, plain read
    // otherwise. Either way the scan sees one contiguous view.
    let mapped;
    let buffer;
    let data: &[u8] = if config.use_mmap && size >= MMAP_THRESHOLD {
        // Safety: the mapping is dropped before this function returns and
        // the scan only ever reads the view.
        match unsafe { memmap2::Mmap::map(&handle) } {
            Ok(m) => {
                mapped = m;
                &mapped
            }
            Err(e) => {
                warn!(worker = id, path = %path.display(), error = %e, "mmap failed");
                stats.errors.fetch_add(1, Ordering::Relaxed);
                stats.files_skipped.fetch_add(1, Ordering::Relaxed);
                return;
            }
        }
    } else {
        let mut handle = handle;
        let mut buf = Vec::with_capacity(size as usize);
        if let Err(e) = handle.read_to_end(&mut buf) {
            warn!(worker = id, path = %path.display(), error = %e, "Failed to read file");
            stats.errors.fetch_add(1, Ordering::Relaxed);
            stats.files_skipped.fetch_add(1, Ordering::Relaxed);
            return;
        }
        buffer = buf;
        &buffer
    };

    if is_binary(data) {
        trace!(worker = id, path = %path.display(), "Skipping binary file");
        stats.files_skipped.fetch_add(1, Ordering::Relaxed);
        return;
    }

    let matches = matcher.scan_to_list(data);
    stats.files_scanned.fetch_add(1, Ordering::Relaxed);

    if !matches.is_empty() {
        stats.files_matched.fetch_add(1, Ordering::Relaxed);
        stats
            .lines_matched
            .fetch_add(matches.len() as u64, Ordering::Relaxed);

        let result = FileMatches {
            path: path.to_path_buf(),
            matches,
        };

        // A send failure means the driver is gone; nothing useful left to do.
        if results_tx.send(result).is_err() {
            debug!(worker = id, "Results channel closed");
        }
    }
}

/// NUL-byte heuristic over the first [`BINARY_PROBE_LEN`] bytes
fn is_binary(data: &[u8]) -> bool {
    let probe = &data[..data.len().min(BINARY_PROBE_LEN)];
    probe.contains(&0)
}
