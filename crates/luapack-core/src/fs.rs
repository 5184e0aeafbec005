//! Filesystem access used by the locator and the graph builder.
//!
//! Everything goes through the [`FileSystem`] trait so bundles can be built
//! against an in-memory tree in tests.

use path_clean::PathClean;
use rustc_hash::FxHashMap;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

pub trait FileSystem: Send + Sync + fmt::Debug {
    /// Read a whole file as text. Sources must be UTF-8; other encodings
    /// fail with [`io::ErrorKind::InvalidData`] naming the first bad byte.
    fn read_file(&self, path: &Path) -> io::Result<String>;

    /// Whether a regular file exists at `path`. Never reads contents.
    fn is_file(&self, path: &Path) -> bool;

    /// Absolute path with `.`/`..` and links resolved.
    fn canonicalize(&self, path: &Path) -> io::Result<PathBuf>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct RealFileSystem;

impl RealFileSystem {
    pub fn new() -> Self {
        Self
    }
}

impl FileSystem for RealFileSystem {
    fn read_file(&self, path: &Path) -> io::Result<String> {
        let bytes = std::fs::read(path)?;
        String::from_utf8(bytes).map_err(|e| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!(
                    "not valid UTF-8 at byte {}, Lua sources must be UTF-8 encoded",
                    e.utf8_error().valid_up_to()
                ),
            )
        })
    }

    fn is_file(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn canonicalize(&self, path: &Path) -> io::Result<PathBuf> {
        dunce::canonicalize(path)
    }
}

/// In-memory filesystem. Paths are normalized lexically, so `/p/./a.lua`
/// and `/p/lib/../a.lua` name the same file. Symlinks map one file path
/// onto another.
#[derive(Debug, Default, Clone)]
pub struct MockFileSystem {
    files: FxHashMap<PathBuf, String>,
    symlinks: FxHashMap<PathBuf, PathBuf>,
}

impl MockFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_file(&mut self, path: impl AsRef<Path>, content: impl Into<String>) {
        self.files.insert(path.as_ref().clean(), content.into());
    }

    pub fn add_symlink(&mut self, link: impl AsRef<Path>, target: impl AsRef<Path>) {
        self.symlinks
            .insert(link.as_ref().clean(), target.as_ref().clean());
    }

    fn follow(&self, path: &Path) -> PathBuf {
        let mut current = path.clean();
        // At most 32 hops
        for _ in 0..32 {
            match self.symlinks.get(&current) {
                Some(target) => current = target.clone(),
                None => break,
            }
        }
        current
    }

    fn not_found(path: &Path) -> io::Error {
        io::Error::new(
            io::ErrorKind::NotFound,
            format!("no such file: {}", path.display()),
        )
    }
}

impl FileSystem for MockFileSystem {
    fn read_file(&self, path: &Path) -> io::Result<String> {
        self.files
            .get(&self.follow(path))
            .cloned()
            .ok_or_else(|| Self::not_found(path))
    }

    fn is_file(&self, path: &Path) -> bool {
        self.files.contains_key(&self.follow(path))
    }

    fn canonicalize(&self, path: &Path) -> io::Result<PathBuf> {
        let resolved = self.follow(path);
        if self.files.contains_key(&resolved) {
            Ok(resolved)
        } else {
            Err(Self::not_found(path))
        }
    }
}
