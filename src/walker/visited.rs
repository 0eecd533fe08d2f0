//! Visited-object tracking for traversal deduplication
//!
//! Bind mounts, hard-linked trees, and symlink loops can present the same
//! filesystem object under multiple paths. Traversal keeps one
//! [`VisitedSet`] for directories (loop prevention) and one for files
//! reached through symlinks or hard links (double-scan prevention), both
//! keyed by (device, inode).
//!
//! A plain mutex-guarded set is enough here: directory count is small
//! compared to file count and the critical section is a single hash probe.

use crate::fileid::DevIno;
use std::collections::HashSet;
use std::sync::Mutex;

/// Thread-safe set of already-seen (device, inode) pairs
#[derive(Debug, Default)]
pub struct VisitedSet {
    seen: Mutex<HashSet<DevIno>>,
}

impl VisitedSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an identity. Returns `true` the first time it is seen.
    pub fn first_visit(&self, id: DevIno) -> bool {
        self.seen.lock().unwrap().insert(id)
    }

    /// Number of distinct identities recorded
    pub fn len(&self) -> usize {
        self.seen.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.lock().unwrap().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_visit_once() {
        let set = VisitedSet::new();
        let id = DevIno { dev: 1, ino: 42 };

        assert!(set.first_visit(id));
        assert!(!set.first_visit(id));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_distinct_devices_are_distinct_objects() {
        let set = VisitedSet::new();

        assert!(set.first_visit(DevIno { dev: 1, ino: 7 }));
        assert!(set.first_visit(DevIno { dev: 2, ino: 7 }));
        assert_eq!(set.len(), 2);
    }
}
