//! Filesystem capability handed to subcommand constructors.
//!
//! Commands never touch `std::fs` directly. They receive an
//! `Arc<dyn FileSystem>` so the same command tree can run against the real
//! disk ([`OsFs`]) or an in-memory tree ([`MemoryFs`]) in tests.

use std::collections::{BTreeMap, BTreeSet};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

/// Minimal file I/O surface used by the resolver and subcommands.
pub trait FileSystem: Send + Sync {
    /// Reads a whole file as UTF-8.
    fn read_to_string(&self, path: &Path) -> io::Result<String>;

    /// Creates or truncates `path` and writes `contents` to it.
    fn write(&self, path: &Path, contents: &[u8]) -> io::Result<()>;

    /// Returns `true` if `path` names an existing file or directory.
    fn exists(&self, path: &Path) -> bool;

    /// Creates `path` and all missing parents.
    fn create_dir_all(&self, path: &Path) -> io::Result<()>;
}

/// The real filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsFs;

impl OsFs {
    /// Returns the real filesystem as a shareable capability.
    pub fn shared() -> Arc<dyn FileSystem> {
        Arc::new(Self)
    }
}

impl FileSystem for OsFs {
    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        std::fs::read_to_string(path)
    }

    fn write(&self, path: &Path, contents: &[u8]) -> io::Result<()> {
        std::fs::write(path, contents)
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        std::fs::create_dir_all(path)
    }
}

#[derive(Debug, Default)]
struct MemoryTree {
    files: BTreeMap<PathBuf, Vec<u8>>,
    dirs: BTreeSet<PathBuf>,
}

/// An in-memory filesystem.
///
/// Writing a file requires its parent directory to exist, mirroring the
/// real filesystem, so tests exercise the same `create_dir_all` calls.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use twitter_core::{FileSystem, MemoryFs};
///
/// let fs = MemoryFs::new().with_file("/home/u/.config/.twitter.yaml", "DBPath: /tmp/t.db\n");
/// assert!(fs.exists(Path::new("/home/u/.config")));
/// assert_eq!(
///     fs.read_to_string(Path::new("/home/u/.config/.twitter.yaml")).unwrap(),
///     "DBPath: /tmp/t.db\n"
/// );
/// ```
#[derive(Debug, Default)]
pub struct MemoryFs {
    tree: Mutex<MemoryTree>,
}

impl MemoryFs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a file, creating its parent directories.
    pub fn with_file(self, path: impl AsRef<Path>, contents: &str) -> Self {
        {
            let mut tree = self.lock();
            let path = path.as_ref();
            if let Some(parent) = path.parent() {
                insert_ancestors(&mut tree.dirs, parent);
            }
            tree.files
                .insert(path.to_path_buf(), contents.as_bytes().to_vec());
        }
        self
    }

    /// Returns every file path currently stored.
    pub fn files(&self) -> Vec<PathBuf> {
        self.lock().files.keys().cloned().collect()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryTree> {
        // A poisoned lock only means another test thread panicked mid-write;
        // the map itself is still usable.
        self.tree.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn insert_ancestors(dirs: &mut BTreeSet<PathBuf>, path: &Path) {
    for ancestor in path.ancestors() {
        if ancestor.as_os_str().is_empty() {
            continue;
        }
        dirs.insert(ancestor.to_path_buf());
    }
}

fn not_found(path: &Path) -> io::Error {
    io::Error::new(
        io::ErrorKind::NotFound,
        format!("{}: no such file or directory", path.display()),
    )
}

impl FileSystem for MemoryFs {
    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        let tree = self.lock();
        let bytes = tree.files.get(path).ok_or_else(|| not_found(path))?;
        String::from_utf8(bytes.clone())
            .map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))
    }

    fn write(&self, path: &Path, contents: &[u8]) -> io::Result<()> {
        let mut tree = self.lock();
        if tree.dirs.contains(path) {
            return Err(io::Error::new(
                io::ErrorKind::IsADirectory,
                format!("{}: is a directory", path.display()),
            ));
        }
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !tree.dirs.contains(parent) {
                return Err(not_found(parent));
            }
        }
        tree.files.insert(path.to_path_buf(), contents.to_vec());
        Ok(())
    }

    fn exists(&self, path: &Path) -> bool {
        let tree = self.lock();
        tree.files.contains_key(path) || tree.dirs.contains(path)
    }

    fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        let mut tree = self.lock();
        if let Some(file) = path
            .ancestors()
            .find(|ancestor| tree.files.contains_key(*ancestor))
        {
            return Err(io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("{}: is a file", file.display()),
            ));
        }
        insert_ancestors(&mut tree.dirs, path);
        Ok(())
    }
}
