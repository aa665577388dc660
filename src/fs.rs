//! The file-system capability used by the loader and by `save`.
//!
//! Everything that touches the disk goes through [`Filesystem`], so the load
//! and reload paths can be exercised with an in-memory implementation.

use std::io;
use std::path::Path;
use std::time::SystemTime;

pub trait Filesystem: Send + Sync {
    /// Modification time of `path`. Also serves as the "does it exist" probe.
    fn modified(&self, path: &Path) -> io::Result<SystemTime>;

    fn read(&self, path: &Path) -> io::Result<Vec<u8>>;

    fn create_dir_all(&self, path: &Path) -> io::Result<()>;

    fn write(&self, path: &Path, contents: &[u8]) -> io::Result<()>;
}

/// The real file system, via `std::fs`.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsFilesystem;

impl Filesystem for OsFilesystem {
    fn modified(&self, path: &Path) -> io::Result<SystemTime> {
        std::fs::metadata(path)?.modified()
    }

    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        std::fs::read(path)
    }

    fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        std::fs::create_dir_all(path)
    }

    fn write(&self, path: &Path, contents: &[u8]) -> io::Result<()> {
        std::fs::write(path, contents)
    }
}
