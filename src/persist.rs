//! Config persistence: serialize the destination back to its JSON file.
//!
//! Creates parent directories as needed. The whole file is rewritten, so
//! comments in the previous version are not preserved.

use std::path::Path;

use serde::Serialize;

use crate::error::StrataError;
use crate::fs::Filesystem;

/// Pure function: render `value` as the pretty-printed JSON document that
/// [`write_json`] stores, with a trailing newline.
pub fn to_document<T: Serialize + ?Sized>(value: &T) -> Result<String, StrataError> {
    let mut doc = serde_json::to_string_pretty(value)?;
    doc.push('\n');
    Ok(doc)
}

/// I/O wrapper: renders `value` and writes it to `path` through `fs`.
/// Creates parent directories if needed.
pub fn write_json<T: Serialize + ?Sized>(
    fs: &dyn Filesystem,
    path: &Path,
    value: &T,
) -> Result<(), StrataError> {
    let doc = to_document(value)?;

    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs.create_dir_all(parent).map_err(|e| StrataError::IoError {
            path: parent.to_path_buf(),
            source: e,
        })?;
    }

    fs.write(path, doc.as_bytes())
        .map_err(|e| StrataError::IoError {
            path: path.to_path_buf(),
            source: e,
        })
}
