//! File identity: path, kind, (device, inode) uniqueness, and the
//! directory handle chain
//!
//! Traversal produces one [`FileIdentity`] per retained directory entry.
//! An identity is usually known *relative* to its parent directory's
//! identity; the full path and the stat snapshot are materialized lazily so
//! that files rejected by the type filter never cost a `stat()` call or a
//! path allocation.
//!
//! Directory identities also carry a lazily-opened `openat` handle. Every
//! filesystem operation on a child — stat, classify probe, the scanner's
//! open — goes through the parent's handle with just the basename, never
//! by re-resolving a full path string. That keeps the walk immune to
//! paths longer than `PATH_MAX` and to a path component being swapped out
//! underneath us between classification and scan.
//!
//! Once loaded, the lazy fields are immutable. Per-instance `OnceLock`s
//! guarantee concurrent readers observe either "unloaded" or a complete
//! snapshot, without a process-wide lock in the hot path.

use openat::{Dir, SimpleType};
use std::ffi::OsString;
use std::fs::{File, Metadata};
use std::io;
use std::os::unix::fs::MetadataExt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

/// A filesystem object's unique identity: the (device, inode) pair.
///
/// Two identities with equal `DevIno` refer to the same filesystem object
/// even if reached via different paths (hard links, bind mounts, symlink
/// loops).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DevIno {
    pub dev: u64,
    pub ino: u64,
}

impl DevIno {
    pub fn of(meta: &Metadata) -> Self {
        Self {
            dev: meta.dev(),
            ino: meta.ino(),
        }
    }
}

/// What kind of filesystem object an identity refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Regular,
    Directory,
    Symlink,
    /// Something we don't scan (fifo, socket, device node)
    Unknown,
    /// `stat()` failed; the entry is skipped downstream
    StatFailed,
}

impl FileKind {
    fn from_simple_type(simple: SimpleType) -> Self {
        match simple {
            SimpleType::File => FileKind::Regular,
            SimpleType::Dir => FileKind::Directory,
            SimpleType::Symlink => FileKind::Symlink,
            SimpleType::Other => FileKind::Unknown,
        }
    }
}

/// Loaded stat snapshot
#[derive(Debug, Clone, Copy)]
pub struct StatInfo {
    pub kind: FileKind,
    pub size: u64,
    pub block_size: u64,
    /// `None` only when `kind == StatFailed`
    pub identity: Option<DevIno>,
}

impl StatInfo {
    fn from_metadata(meta: &Metadata) -> Self {
        let kind = if meta.file_type().is_file() {
            FileKind::Regular
        } else if meta.file_type().is_dir() {
            FileKind::Directory
        } else if meta.file_type().is_symlink() {
            FileKind::Symlink
        } else {
            FileKind::Unknown
        };

        Self {
            kind,
            size: meta.size(),
            block_size: meta.blksize(),
            identity: Some(DevIno::of(meta)),
        }
    }

    fn from_entry_metadata(meta: &openat::Metadata) -> Self {
        let stat = meta.stat();
        Self {
            kind: FileKind::from_simple_type(meta.simple_type()),
            size: stat.st_size as u64,
            block_size: stat.st_blksize as u64,
            identity: Some(DevIno {
                dev: stat.st_dev as u64,
                ino: stat.st_ino as u64,
            }),
        }
    }

    fn stat_failed() -> Self {
        Self {
            kind: FileKind::StatFailed,
            size: 0,
            block_size: 0,
            identity: None,
        }
    }
}

/// A file known either absolutely or relative to a parent directory.
///
/// Immutable after its lazy fields are loaded.
#[derive(Debug)]
pub struct FileIdentity {
    /// Parent directory identity when constructed relatively
    parent: Option<Arc<FileIdentity>>,

    /// Basename relative to `parent` (or the full path for roots)
    basename: OsString,

    /// Pre-stat kind from the directory entry, when the readdir provided one
    kind_hint: Option<FileKind>,

    /// Fully-resolved path, computed on first use (display and globx only)
    path: OnceLock<PathBuf>,

    /// Stat snapshot, loaded on first use
    stat: OnceLock<StatInfo>,

    /// Open directory handle (directories only), opened on first use
    /// relative to the parent's handle. Closed when the last identity
    /// referencing this directory is dropped.
    handle: OnceLock<io::Result<Dir>>,
}

impl FileIdentity {
    /// Identity for a user-supplied root path (absolute or cwd-relative)
    pub fn from_root(path: &Path) -> Self {
        let full = PathBuf::from(path);
        let id = Self {
            parent: None,
            basename: full.as_os_str().to_os_string(),
            kind_hint: None,
            path: OnceLock::new(),
            stat: OnceLock::new(),
            handle: OnceLock::new(),
        };
        let _ = id.path.set(full);
        id
    }

    /// Identity for a directory entry, relative to its parent's identity.
    ///
    /// `kind_hint` comes from the readdir record and saves a `stat()` when
    /// the entry is filtered out by name alone.
    pub fn from_entry(parent: Arc<FileIdentity>, basename: OsString, kind_hint: Option<FileKind>) -> Self {
        Self {
            parent: Some(parent),
            basename,
            kind_hint,
            path: OnceLock::new(),
            stat: OnceLock::new(),
            handle: OnceLock::new(),
        }
    }

    /// Basename relative to the parent directory
    pub fn basename(&self) -> &OsString {
        &self.basename
    }

    /// The fully-resolved path, materialized on first call by walking the
    /// parent chain. Used for display and `globx` matching; filesystem
    /// access goes through [`FileIdentity::dir_handle`] instead.
    pub fn path(&self) -> &Path {
        self.path.get_or_init(|| match &self.parent {
            Some(parent) => parent.path().join(&self.basename),
            None => PathBuf::from(&self.basename),
        })
    }

    /// The open handle on this directory, opening it on first call.
    ///
    /// Roots open by path; everything below opens `openat`-relative to the
    /// parent's handle, so arbitrarily deep trees never form a full path
    /// and a component swapped for a symlink mid-walk fails the open
    /// instead of silently redirecting it.
    pub fn dir_handle(&self) -> io::Result<&Dir> {
        self.handle
            .get_or_init(|| self.open_handle())
            .as_ref()
            .map_err(|e| io::Error::new(e.kind(), e.to_string()))
    }

    fn open_handle(&self) -> io::Result<Dir> {
        match &self.parent {
            // sub_dir does not follow symlinks: directories are only ever
            // entered as directories.
            Some(parent) => parent.dir_handle()?.sub_dir(self.basename.as_os_str()),
            None => Dir::open(self.path()),
        }
    }

    /// Open this file for reading, relative to the parent's directory
    /// handle when one exists (symlinks to files resolve through the
    /// kernel's normal `openat` path resolution).
    pub fn open(&self) -> io::Result<File> {
        match &self.parent {
            Some(parent) => parent.dir_handle()?.open_file(self.basename.as_os_str()),
            None => File::open(self.path()),
        }
    }

    /// The stat snapshot, loading it (without following symlinks) on first
    /// call — `fstatat`-relative to the parent's handle for non-roots. A
    /// failed stat is recorded as `FileKind::StatFailed` rather than an
    /// error; callers skip such entries.
    pub fn stat(&self) -> &StatInfo {
        self.stat.get_or_init(|| {
            let loaded = match &self.parent {
                Some(parent) => parent
                    .dir_handle()
                    .and_then(|dir| dir.metadata(self.basename.as_os_str()))
                    .map(|meta| StatInfo::from_entry_metadata(&meta)),
                None => {
                    std::fs::symlink_metadata(self.path()).map(|m| StatInfo::from_metadata(&m))
                }
            };
            loaded.unwrap_or_else(|_| StatInfo::stat_failed())
        })
    }

    /// The object kind, preferring the readdir hint over a `stat()` call
    pub fn kind(&self) -> FileKind {
        match self.kind_hint {
            Some(kind) => kind,
            None => self.stat().kind,
        }
    }

    /// The (device, inode) identity; `None` if the stat failed
    pub fn dev_ino(&self) -> Option<DevIno> {
        self.stat().identity
    }

    /// File size in bytes (0 when the stat failed)
    pub fn size(&self) -> u64 {
        self.stat().size
    }

    /// The root identity this file descends from (itself for roots).
    ///
    /// Used to compute scan-root-relative paths for `globx` rules.
    pub fn scan_root(&self) -> &FileIdentity {
        let mut current = self;
        while let Some(parent) = &current.parent {
            current = parent;
        }
        current
    }

    /// Stat *through* a symlink, yielding the target's snapshot.
    ///
    /// Opens the entry relative to the parent handle (resolving the link)
    /// and stats the resulting descriptor, so the identity recorded is the
    /// target's. Used by the traversal's symlink policy: symlinks to
    /// regular files are scanned under the target's (dev, ino) so a file
    /// is never processed twice via different link names. Not cached;
    /// callers invoke it once per symlink entry.
    pub fn target_stat(&self) -> io::Result<StatInfo> {
        match &self.parent {
            Some(parent) => {
                let file = parent.dir_handle()?.open_file(self.basename.as_os_str())?;
                Ok(StatInfo::from_metadata(&file.metadata()?))
            }
            None => Ok(StatInfo::from_metadata(&std::fs::metadata(self.path())?)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::io::Read;
    use tempfile::tempdir;

    #[test]
    fn test_relative_path_materialization() {
        let root = Arc::new(FileIdentity::from_root(Path::new("/some/dir")));
        let sub = Arc::new(FileIdentity::from_entry(
            Arc::clone(&root),
            OsString::from("sub"),
            Some(FileKind::Directory),
        ));
        let leaf = FileIdentity::from_entry(sub, OsString::from("file.c"), Some(FileKind::Regular));

        assert_eq!(leaf.path(), Path::new("/some/dir/sub/file.c"));
        assert_eq!(leaf.kind(), FileKind::Regular);
    }

    #[test]
    fn test_stat_regular_file() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("a.txt");
        fs::write(&file_path, b"hello").unwrap();

        let id = FileIdentity::from_root(&file_path);
        assert_eq!(id.kind(), FileKind::Regular);
        assert_eq!(id.size(), 5);
        assert!(id.dev_ino().is_some());
    }

    #[test]
    fn test_stat_failure_is_not_fatal() {
        let id = FileIdentity::from_root(Path::new("/nonexistent/definitely/missing"));
        assert_eq!(id.kind(), FileKind::StatFailed);
        assert_eq!(id.dev_ino(), None);
        assert_eq!(id.size(), 0);
    }

    #[test]
    fn test_relative_stat_and_open_via_parent_handle() {
        let dir = tempdir().unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        fs::write(dir.path().join("sub/f.rs"), b"fn f() {}").unwrap();

        let root = Arc::new(FileIdentity::from_root(dir.path()));
        let sub = Arc::new(FileIdentity::from_entry(
            root,
            OsString::from("sub"),
            Some(FileKind::Directory),
        ));
        let leaf = FileIdentity::from_entry(sub, OsString::from("f.rs"), None);

        // Stat and open both resolve relative to the parent handle chain.
        assert_eq!(leaf.kind(), FileKind::Regular);
        assert_eq!(leaf.size(), 9);

        let mut content = Vec::new();
        leaf.open().unwrap().read_to_end(&mut content).unwrap();
        assert_eq!(content, b"fn f() {}");
    }

    #[test]
    fn test_dir_handle_failure_surfaces_per_call() {
        let dir = tempdir().unwrap();
        let root = Arc::new(FileIdentity::from_root(dir.path()));
        let ghost = Arc::new(FileIdentity::from_entry(
            root,
            OsString::from("missing"),
            Some(FileKind::Directory),
        ));

        assert!(ghost.dir_handle().is_err());
        // The failure is cached but each caller still gets an error value.
        assert!(ghost.dir_handle().is_err());
        let child = FileIdentity::from_entry(ghost, OsString::from("x.c"), None);
        assert_eq!(child.kind(), FileKind::StatFailed);
    }

    #[test]
    fn test_hard_links_share_identity() {
        let dir = tempdir().unwrap();
        let original = dir.path().join("orig");
        let link = dir.path().join("link");
        fs::write(&original, b"data").unwrap();
        fs::hard_link(&original, &link).unwrap();

        let id_a = FileIdentity::from_root(&original);
        let id_b = FileIdentity::from_root(&link);

        assert_eq!(id_a.dev_ino(), id_b.dev_ino());
        assert_ne!(id_a.path(), id_b.path());
    }

    #[test]
    fn test_symlink_target_stat() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("real.rs");
        fs::write(&target, b"fn main() {}").unwrap();
        std::os::unix::fs::symlink(&target, dir.path().join("alias.rs")).unwrap();

        let root = Arc::new(FileIdentity::from_root(dir.path()));
        let id = FileIdentity::from_entry(root, OsString::from("alias.rs"), None);
        assert_eq!(id.kind(), FileKind::Symlink);

        let through = id.target_stat().unwrap();
        assert_eq!(through.kind, FileKind::Regular);
        assert_eq!(through.identity, FileIdentity::from_root(&target).dev_ino());
    }
}
