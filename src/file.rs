//! File discovery and loading.
//!
//! # Discovery
//!
//! [`candidate_paths`] turns the builder's explicit files and [`SearchPath`]s
//! into an ordered list of concrete file paths. Explicit files come first,
//! then each search directory joined with the file name. Directories that
//! cannot be resolved (no home directory, no cwd) are skipped.
//!
//! # Resolution
//!
//! [`FileLoader`] walks the candidates in order and settles on the first one
//! whose modification time can be read. That path is remembered for every
//! later read and save, even if the file disappears afterwards.
//!
//! # Change detection
//!
//! The loader keeps the modification time of the last successful read. A read
//! that finds the timestamp unchanged returns an empty tree without touching
//! the file contents, which the reload path treats as "nothing to do".

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::comments::strip_comments;
use crate::error::StrataError;
use crate::fs::Filesystem;
use crate::types::SearchPath;

/// Resolve a [`SearchPath`] to a concrete directory.
///
/// `app_name` is used by `SearchPath::Platform` to construct the platform-specific
/// config directory (e.g. `~/.config/{app_name}/` on Linux).
///
/// Returns `None` if the path cannot be resolved (e.g. no home directory found).
pub fn resolve_search_path(sp: &SearchPath, app_name: &str) -> Option<PathBuf> {
    match sp {
        SearchPath::Platform => {
            let proj = directories::ProjectDirs::from("", "", app_name)?;
            Some(proj.config_dir().to_path_buf())
        }
        SearchPath::Home(subdir) => {
            let user = directories::UserDirs::new()?;
            Some(user.home_dir().join(subdir))
        }
        SearchPath::Cwd => std::env::current_dir().ok(),
        SearchPath::Path(p) => Some(p.clone()),
    }
}

/// Build the ordered candidate list: explicit `files` (empty ones ignored),
/// then every resolvable search directory joined with `file_name`.
pub fn candidate_paths(
    files: &[PathBuf],
    search_paths: &[SearchPath],
    file_name: &str,
    app_name: &str,
) -> Vec<PathBuf> {
    let explicit = files.iter().filter(|f| !f.as_os_str().is_empty()).cloned();
    let searched = search_paths
        .iter()
        .filter_map(|sp| resolve_search_path(sp, app_name))
        .map(|dir| dir.join(file_name));
    explicit.chain(searched).collect()
}

/// Locates, reads and caches the configuration file.
pub struct FileLoader {
    fs: Arc<dyn Filesystem>,
    candidates: Vec<PathBuf>,
    resolved: Option<PathBuf>,
    modified: Option<SystemTime>,
}

impl FileLoader {
    pub fn new(fs: Arc<dyn Filesystem>, candidates: Vec<PathBuf>) -> Self {
        Self {
            fs,
            candidates,
            resolved: None,
            modified: None,
        }
    }

    /// The path settled on by the last lookup, if any.
    pub fn path(&self) -> Option<&Path> {
        self.resolved.as_deref()
    }

    /// Where a save should go: the resolved file, else the first candidate.
    pub fn save_target(&self) -> Option<PathBuf> {
        self.resolved
            .clone()
            .or_else(|| self.candidates.first().cloned())
    }

    /// Forget the last-read timestamp so the next read always parses.
    pub fn reset(&mut self) {
        self.modified = None;
    }

    /// Load the file, logging failures. Returns an empty tree when there is
    /// no file, it has not changed, or it could not be read or parsed.
    pub fn load(&mut self) -> Map<String, Value> {
        match self.read_file() {
            Ok(tree) => tree,
            Err(StrataError::NoConfigFile) => {
                debug!(candidates = self.candidates.len(), "No configuration file found");
                Map::new()
            }
            Err(e) => {
                warn!(error = %e, "Ignoring configuration file");
                Map::new()
            }
        }
    }

    /// Read and parse the file, returning failures to the caller.
    pub fn read_file(&mut self) -> Result<Map<String, Value>, StrataError> {
        let path = self.locate().ok_or(StrataError::NoConfigFile)?;

        let stamp = self.fs.modified(&path).map_err(|e| StrataError::IoError {
            path: path.clone(),
            source: e,
        })?;
        if self.modified.is_some_and(|seen| stamp <= seen) {
            debug!(path = %path.display(), "Configuration file unchanged");
            return Ok(Map::new());
        }

        let bytes = self.fs.read(&path).map_err(|e| StrataError::IoError {
            path: path.clone(),
            source: e,
        })?;
        self.modified = Some(stamp);

        let tree = serde_json::from_slice::<Map<String, Value>>(&strip_comments(&bytes))
            .map_err(|e| StrataError::ParseError {
                path: path.clone(),
                source: e,
            })?;
        debug!(path = %path.display(), keys = tree.len(), "Loaded configuration file");
        Ok(tree)
    }

    fn locate(&mut self) -> Option<PathBuf> {
        if self.resolved.is_none() {
            self.resolved = self
                .candidates
                .iter()
                .find(|p| self.fs.modified(p).is_ok())
                .cloned();
            if let Some(p) = &self.resolved {
                debug!(path = %p.display(), "Resolved configuration file");
            }
        }
        self.resolved.clone()
    }
}
