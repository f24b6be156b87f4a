//! Loading desired-state documents from disk
//!
//! A path may name a single document or a directory of documents. Directory
//! entries are read in file-name order and merged in that order, so later
//! files win for top-level K/V keys and append to the policy list.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::document::Document;
use crate::{Error, Result};

/// File extensions picked up when loading a directory
pub const DOCUMENT_EXTENSIONS: &[&str] = &["yml", "yaml", "json"];

/// Load and merge the document(s) at `path`.
///
/// # Errors
///
/// Returns an error if the path cannot be read or a document fails to parse.
pub fn load_path(path: &Path) -> Result<Document> {
    let metadata = fs::metadata(path).map_err(|e| Error::io(path, e))?;

    if !metadata.is_dir() {
        return load_file(path);
    }

    let mut merged = Document::default();
    for file in document_files(path)? {
        merged.merge(load_file(&file)?);
    }
    Ok(merged)
}

/// Load one document file.
pub fn load_file(path: &Path) -> Result<Document> {
    info!("Loading file: {}", path.display());
    let content = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
    Document::parse(&content).map_err(|e| Error::DocumentParse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

/// Document files directly inside `dir`, sorted by file name
fn document_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir).map_err(|e| Error::io(dir, e))? {
        let entry = entry.map_err(|e| Error::io(dir, e))?;
        let path = entry.path();
        if path.is_dir() {
            continue;
        }
        let supported = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| DOCUMENT_EXTENSIONS.contains(&ext.to_lowercase().as_str()));
        if supported {
            files.push(path);
        } else {
            debug!("Skipping non-document file {}", path.display());
        }
    }
    files.sort();
    Ok(files)
}
