//! Synchronized work queue with idle-quorum termination detection
//!
//! This module provides the unbounded MPMC queue that couples the pipeline
//! stages. Beyond the usual push/pull/close operations it offers
//! [`SyncQueue::wait_for_idle_quorum`], the termination oracle for
//! self-feeding worker pools: the directory-traversal workers both consume
//! from and produce into the same queue, so no worker can know on its own
//! when the walk is finished. The driving thread instead waits until every
//! worker is parked on an empty queue, then closes it.
//!
//! Channel crates don't expose the parked-consumer count, so this is built
//! directly on a `Mutex` plus two `Condvar`s (one for item arrival, one for
//! the quorum condition).

use std::collections::VecDeque;
use std::sync::{Condvar, Mutex};
use thiserror::Error;

/// Returned by queue operations once [`SyncQueue::close`] has taken effect.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("queue closed")]
pub struct QueueClosed;

/// State shared under the queue mutex
struct QueueState<T> {
    /// FIFO item storage
    items: VecDeque<T>,

    /// Set by `close()`; pushes fail afterwards, pulls drain then fail
    closed: bool,

    /// Number of threads currently inside `pull()`
    parked: usize,

    /// Parked-count at which the quorum condvar is notified
    quorum_level: usize,
}

/// Unbounded, thread-safe, closable FIFO queue.
///
/// Ordering: items pushed from a single thread are pulled in push order by
/// any single consumer. No ordering is guaranteed between producers.
pub struct SyncQueue<T> {
    state: Mutex<QueueState<T>>,

    /// Signaled (one waiter) on push, (all waiters) on close
    items_available: Condvar,

    /// Signaled when the parked-count reaches the quorum level, and on close
    idle_quorum: Condvar,
}

impl<T> SyncQueue<T> {
    /// Create a new open, empty queue
    pub fn new() -> Self {
        Self {
            state: Mutex::new(QueueState {
                items: VecDeque::new(),
                closed: false,
                parked: 0,
                // Never reached until a waiter installs a real level.
                quorum_level: usize::MAX,
            }),
            items_available: Condvar::new(),
            idle_quorum: Condvar::new(),
        }
    }

    /// Append an item, waking one parked consumer.
    ///
    /// Fails with [`QueueClosed`] if the queue has been closed.
    pub fn push(&self, item: T) -> Result<(), QueueClosed> {
        let mut state = self.state.lock().unwrap();

        if state.closed {
            return Err(QueueClosed);
        }

        state.items.push_back(item);

        // Drop the lock before notifying so the woken thread doesn't
        // immediately block on the mutex we still hold.
        drop(state);
        self.items_available.notify_one();

        Ok(())
    }

    /// Remove and return the front item, blocking until one is available.
    ///
    /// Returns [`QueueClosed`] only once the queue is closed AND empty;
    /// items pushed before `close()` are still drained.
    pub fn pull(&self) -> Result<T, QueueClosed> {
        let mut state = self.state.lock().unwrap();

        state.parked += 1;
        if state.parked == state.quorum_level {
            self.idle_quorum.notify_all();
        }

        let mut state = self
            .items_available
            .wait_while(state, |s| s.items.is_empty() && !s.closed)
            .unwrap();

        state.parked -= 1;

        match state.items.pop_front() {
            Some(item) => Ok(item),
            // Woken to a closed and empty queue.
            None => Err(QueueClosed),
        }
    }

    /// Close the queue. Idempotent.
    ///
    /// Wakes every thread blocked in `pull()` or `wait_for_idle_quorum()`.
    /// Subsequent pushes fail; pulls keep draining remaining items.
    pub fn close(&self) {
        let mut state = self.state.lock().unwrap();
        state.closed = true;
        drop(state);

        self.items_available.notify_all();
        self.idle_quorum.notify_all();
    }

    /// Block until exactly `num_workers` threads are parked in `pull()` on
    /// an empty queue, or the queue is closed.
    ///
    /// This is the termination oracle for a self-feeding worker pool: the
    /// workers pend on `pull()` for work that will never come once the walk
    /// is exhausted, so the master waits here, then closes the queue, which
    /// makes every worker's `pull()` return [`QueueClosed`] so they can be
    /// joined.
    pub fn wait_for_idle_quorum(&self, num_workers: usize) -> Result<(), QueueClosed> {
        let mut state = self.state.lock().unwrap();
        state.quorum_level = num_workers;

        let state = self
            .idle_quorum
            .wait_while(state, |s| {
                !s.closed && !(s.parked == num_workers && s.items.is_empty())
            })
            .unwrap();

        if state.closed {
            Err(QueueClosed)
        } else {
            Ok(())
        }
    }

    /// Check if the queue currently holds no items
    pub fn is_empty(&self) -> bool {
        self.state.lock().unwrap().items.is_empty()
    }

    /// Current number of queued items
    pub fn len(&self) -> usize {
        self.state.lock().unwrap().items.len()
    }
}

impl<T> Default for SyncQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_push_pull_fifo() {
        let queue = SyncQueue::new();

        queue.push(1).unwrap();
        queue.push(2).unwrap();
        queue.push(3).unwrap();

        assert_eq!(queue.len(), 3);
        assert_eq!(queue.pull(), Ok(1));
        assert_eq!(queue.pull(), Ok(2));
        assert_eq!(queue.pull(), Ok(3));
        assert!(queue.is_empty());
    }

    #[test]
    fn test_push_after_close_fails() {
        let queue = SyncQueue::new();

        queue.push("a").unwrap();
        queue.close();

        assert_eq!(queue.push("b"), Err(QueueClosed));

        // Items pushed before close still drain.
        assert_eq!(queue.pull(), Ok("a"));
        assert_eq!(queue.pull(), Err(QueueClosed));
    }

    #[test]
    fn test_close_is_idempotent() {
        let queue: SyncQueue<u32> = SyncQueue::new();
        queue.close();
        queue.close();
        assert_eq!(queue.pull(), Err(QueueClosed));
    }

    #[test]
    fn test_close_wakes_blocked_pullers() {
        let queue: Arc<SyncQueue<u32>> = Arc::new(SyncQueue::new());

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let q = Arc::clone(&queue);
                thread::spawn(move || q.pull())
            })
            .collect();

        // Give the pullers time to park.
        thread::sleep(Duration::from_millis(50));
        queue.close();

        for handle in handles {
            assert_eq!(handle.join().unwrap(), Err(QueueClosed));
        }
    }

    #[test]
    fn test_idle_quorum_detects_drained_pool() {
        const WORKERS: usize = 3;
        let queue: Arc<SyncQueue<u32>> = Arc::new(SyncQueue::new());

        for i in 0..10 {
            queue.push(i).unwrap();
        }

        let handles: Vec<_> = (0..WORKERS)
            .map(|_| {
                let q = Arc::clone(&queue);
                thread::spawn(move || {
                    let mut seen = 0;
                    while q.pull().is_ok() {
                        seen += 1;
                    }
                    seen
                })
            })
            .collect();

        // Quorum holds only when all workers are parked on an empty queue.
        queue.wait_for_idle_quorum(WORKERS).unwrap();
        assert!(queue.is_empty());

        queue.close();
        let total: u32 = handles.into_iter().map(|h| h.join().unwrap()).sum();
        assert_eq!(total, 10);
    }

    #[test]
    fn test_idle_quorum_returns_closed() {
        let queue: Arc<SyncQueue<u32>> = Arc::new(SyncQueue::new());
        let q = Arc::clone(&queue);

        let waiter = thread::spawn(move || q.wait_for_idle_quorum(2));

        thread::sleep(Duration::from_millis(50));
        queue.close();

        assert_eq!(waiter.join().unwrap(), Err(QueueClosed));
    }

    #[test]
    fn test_per_producer_fifo_under_concurrency() {
        let queue: Arc<SyncQueue<(usize, u32)>> = Arc::new(SyncQueue::new());

        let producers: Vec<_> = (0..4)
            .map(|id| {
                let q = Arc::clone(&queue);
                thread::spawn(move || {
                    for seq in 0..100 {
                        q.push((id, seq)).unwrap();
                    }
                })
            })
            .collect();

        for p in producers {
            p.join().unwrap();
        }
        queue.close();

        let mut last_seen = [None::<u32>; 4];
        while let Ok((id, seq)) = queue.pull() {
            if let Some(prev) = last_seen[id] {
                assert!(seq > prev, "producer {} out of order", id);
            }
            last_seen[id] = Some(seq);
        }
        assert!(last_seen.iter().all(|s| *s == Some(99)));
    }
}
