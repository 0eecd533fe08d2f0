//! Search coordinator - orchestrates the parallel search pipeline
//!
//! The coordinator is responsible for:
//! - Building the shared pattern matcher
//! - Seeding the directory queue from the user's root paths
//! - Spawning the traversal and scanner pools
//! - Detecting traversal termination via the idle quorum and closing the
//!   queues in dependency order
//! - Streaming results to the caller's sink and producing final statistics
//!
//! Shutdown ordering matters: the directory queue closes only once every
//! traversal worker is parked on it empty (nothing more can be produced),
//! the scan queue closes only after the traversal pool is joined (no more
//! files can arrive), and the results channel drains itself once the last
//! scanner drops its sender.

use crate::config::SearchConfig;
use crate::error::{Result, SearchError};
use crate::fileid::{FileIdentity, FileKind};
use crate::queue::SyncQueue;
use crate::scanner::matcher::PatternMatcher;
use crate::scanner::matches::FileMatches;
use crate::scanner::worker::ScannerWorker;
use crate::types::TypeManager;
use crate::walker::visited::VisitedSet;
use crate::walker::worker::{TraversalContext, TraversalWorker};
use std::path::Path;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Result of a completed search
#[derive(Debug, Clone)]
pub struct SearchSummary {
    /// Directories enumerated
    pub dirs_walked: u64,

    /// Files scanned
    pub files_scanned: u64,

    /// Files with at least one match
    pub files_matched: u64,

    /// Total matching lines reported
    pub lines_matched: u64,

    /// Per-file and per-directory errors (logged, not fatal)
    pub errors: u64,

    /// Wall time of the whole run
    pub duration: Duration,

    /// Whether the search ran to completion (vs was interrupted)
    pub completed: bool,
}

/// Handle that lets a signal handler cancel a running search.
///
/// Closing the queues is the only cancellation primitive: workers drain
/// what remains and exit, and the run reports what it found.
#[derive(Clone)]
pub struct ShutdownHandle {
    dir_queue: Arc<SyncQueue<Arc<FileIdentity>>>,
    file_queue: Arc<SyncQueue<FileIdentity>>,
}

impl ShutdownHandle {
    /// Close both work queues, letting every worker drain and exit
    pub fn shutdown(&self) {
        info!("Shutdown requested; closing work queues");
        self.dir_queue.close();
        self.file_queue.close();
    }
}

/// Coordinates the parallel search
pub struct SearchCoordinator {
    config: Arc<SearchConfig>,
    types: Arc<TypeManager>,
    dir_queue: Arc<SyncQueue<Arc<FileIdentity>>>,
    file_queue: Arc<SyncQueue<FileIdentity>>,
}

impl SearchCoordinator {
    /// Create a coordinator for a validated configuration
    pub fn new(config: SearchConfig, types: TypeManager) -> Self {
        Self {
            config: Arc::new(config),
            types: Arc::new(types),
            dir_queue: Arc::new(SyncQueue::new()),
            file_queue: Arc::new(SyncQueue::new()),
        }
    }

    /// Get a handle for signal handlers
    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle {
            dir_queue: Arc::clone(&self.dir_queue),
            file_queue: Arc::clone(&self.file_queue),
        }
    }

    /// Run the search, invoking `sink` on the calling thread for each
    /// file's matches as they arrive. Result order across files is
    /// unspecified; lines within a file ascend.
    pub fn run<F>(self, mut sink: F) -> Result<SearchSummary>
    where
        F: FnMut(FileMatches),
    {
        let start_time = Instant::now();

        let matcher = Arc::new(PatternMatcher::new(
            &self.config.pattern,
            self.config.match_options,
        )?);

        info!(
            pattern = %self.config.pattern,
            scan_jobs = self.config.scan_jobs,
            dir_jobs = self.config.dir_jobs,
            "Starting search"
        );

        let visited_dirs = Arc::new(VisitedSet::new());
        let visited_files = Arc::new(VisitedSet::new());

        // Seed the queues from the root paths before anything runs.
        let seeded = self.seed_roots(&visited_dirs, &visited_files);
        if seeded == 0 {
            self.dir_queue.close();
            self.file_queue.close();
            return Err(SearchError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "no searchable paths",
            )));
        }

        // Scanner pool.
        let (results_tx, results_rx) = crossbeam_channel::unbounded::<FileMatches>();
        let mut scanners = Vec::with_capacity(self.config.scan_jobs);
        for id in 0..self.config.scan_jobs {
            scanners.push(ScannerWorker::spawn(
                id,
                Arc::clone(&self.config),
                Arc::clone(&matcher),
                Arc::clone(&self.file_queue),
                results_tx.clone(),
            )?);
        }
        // The workers own the only senders now; the channel closes itself
        // once the last scanner exits.
        drop(results_tx);

        // Traversal pool.
        let ctx = Arc::new(TraversalContext {
            config: Arc::clone(&self.config),
            types: Arc::clone(&self.types),
            dir_queue: Arc::clone(&self.dir_queue),
            file_queue: Arc::clone(&self.file_queue),
            visited_dirs,
            visited_files,
        });

        let mut walkers = Vec::with_capacity(self.config.dir_jobs);
        for id in 0..self.config.dir_jobs {
            walkers.push(TraversalWorker::spawn(id, Arc::clone(&ctx))?);
        }

        debug!(
            walkers = walkers.len(),
            scanners = scanners.len(),
            "Pools spawned"
        );

        // The driver thread owns termination: quorum, then ordered close
        // and join. The calling thread is left free to stream results.
        let dir_queue = Arc::clone(&self.dir_queue);
        let file_queue = Arc::clone(&self.file_queue);
        let dir_jobs = self.config.dir_jobs;

        let driver = thread::spawn(move || {
            use std::sync::atomic::Ordering::Relaxed;

            // Ok: all walkers parked on an empty queue, the walk is done.
            // Err: somebody already closed the queue (interrupt).
            let completed = dir_queue.wait_for_idle_quorum(dir_jobs).is_ok();
            dir_queue.close();

            let walk_stats: Vec<_> = walkers.iter().map(|w| w.stats_handle()).collect();
            let mut errors: u64 = 0;
            for w in walkers {
                if let Err(e) = w.join() {
                    warn!(error = %e, "Walker failed to join cleanly");
                    errors += 1;
                }
            }

            // No producer is left; once drained, the scanners exit.
            file_queue.close();

            let scan_stats: Vec<_> = scanners.iter().map(|s| s.stats_handle()).collect();
            for s in scanners {
                if let Err(e) = s.join() {
                    warn!(error = %e, "Scanner failed to join cleanly");
                    errors += 1;
                }
            }

            // Both pools are joined: every counter is final.
            let dirs = walk_stats.iter().map(|s| s.dirs_walked.load(Relaxed)).sum::<u64>();
            errors += walk_stats.iter().map(|s| s.errors.load(Relaxed)).sum::<u64>();

            let scanned = scan_stats.iter().map(|s| s.files_scanned.load(Relaxed)).sum::<u64>();
            let matched = scan_stats.iter().map(|s| s.files_matched.load(Relaxed)).sum::<u64>();
            let lines = scan_stats.iter().map(|s| s.lines_matched.load(Relaxed)).sum::<u64>();
            errors += scan_stats.iter().map(|s| s.errors.load(Relaxed)).sum::<u64>();

            (completed, dirs, scanned, matched, lines, errors)
        });

        // Stream results as they arrive; the iterator ends when the last
        // scanner drops its sender.
        for file_matches in results_rx.iter() {
            sink(file_matches);
        }

        let (completed, dirs, scanned, matched, lines, errors) = driver
            .join()
            .map_err(|_| SearchError::Worker(crate::error::WorkerError::Panicked {
                id: 0,
                message: "driver thread panicked".into(),
            }))?;

        let duration = start_time.elapsed();

        info!(
            dirs,
            scanned,
            matched,
            lines,
            errors,
            duration_ms = duration.as_millis() as u64,
            completed,
            "Search finished"
        );

        Ok(SearchSummary {
            dirs_walked: dirs,
            files_scanned: scanned,
            files_matched: matched,
            lines_matched: lines,
            errors,
            duration,
            completed,
        })
    }

    /// Turn the user's paths into root identities: directories seed the
    /// directory queue, regular files bypass it straight onto the scan
    /// queue. Returns how many roots were accepted.
    fn seed_roots(&self, visited_dirs: &VisitedSet, visited_files: &VisitedSet) -> usize {
        let mut seeded = 0;

        for path in &self.config.paths {
            if self.seed_one_root(path, visited_dirs, visited_files) {
                seeded += 1;
            }
        }

        seeded
    }

    fn seed_one_root(
        &self,
        path: &Path,
        visited_dirs: &VisitedSet,
        visited_files: &VisitedSet,
    ) -> bool {
        let root = FileIdentity::from_root(path);

        // Roots named explicitly follow symlinks: resolve through the
        // link before deciding what to do with the target.
        let stat = match root.stat().kind {
            FileKind::Symlink => match root.target_stat() {
                Ok(stat) => stat,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Cannot resolve root symlink");
                    return false;
                }
            },
            _ => *root.stat(),
        };

        match stat.kind {
            FileKind::Directory => {
                if let Some(id) = stat.identity {
                    if !visited_dirs.first_visit(id) {
                        debug!(path = %path.display(), "Duplicate root directory");
                        return false;
                    }
                }
                // A closed queue here means an interrupt landed before the
                // search even started; the root is simply dropped.
                self.dir_queue.push(Arc::new(root)).is_ok()
            }
            FileKind::Regular => {
                // Explicitly named files skip the type filter.
                if let Some(id) = stat.identity {
                    if !visited_files.first_visit(id) {
                        debug!(path = %path.display(), "Duplicate root file");
                        return false;
                    }
                }
                self.file_queue.push(root).is_ok()
            }
            FileKind::StatFailed => {
                warn!(path = %path.display(), "No such file or directory");
                false
            }
            _ => {
                warn!(path = %path.display(), "Not a searchable file type");
                false
            }
        }
    }
}
