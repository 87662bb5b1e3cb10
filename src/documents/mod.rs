//! PDF corpus loading.
//!
//! Every `.pdf` file directly inside the corpus directory is read page by
//! page into [`Document`]s. Subdirectories and hidden files are ignored.

#[cfg(test)]
mod tests;

use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::{RagError, Result};

/// One page of a source PDF
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub source: PathBuf,
    /// 1-based, as numbered by the PDF page tree
    pub page_number: u32,
    pub text: String,
}

/// List the PDF files of a corpus directory in a stable order
#[inline]
pub fn list_pdf_files(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(RagError::Document(format!(
            "Document directory not found: {}",
            dir.display()
        )));
    }

    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();

        if !entry.file_type()?.is_file() {
            continue;
        }

        let hidden = path
            .file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| name.starts_with('.'));
        if hidden {
            continue;
        }

        let is_pdf = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"));
        if is_pdf {
            files.push(path);
        }
    }

    files.sort();
    Ok(files)
}

/// Load every page of every PDF in `dir`
#[inline]
pub fn load_directory(dir: &Path) -> Result<Vec<Document>> {
    let files = list_pdf_files(dir)?;
    let mut documents = Vec::new();

    for file in &files {
        documents.extend(load_pdf(file)?);
    }

    info!(
        "Loaded {} pages from {} PDF files in {}",
        documents.len(),
        files.len(),
        dir.display()
    );

    Ok(documents)
}

/// Load the pages of a single PDF file
#[inline]
pub fn load_pdf(path: &Path) -> Result<Vec<Document>> {
    let pdf = lopdf::Document::load(path).map_err(|e| {
        RagError::Document(format!("Failed to load PDF {}: {}", path.display(), e))
    })?;

    let mut documents = Vec::new();
    for page_number in pdf.get_pages().into_keys() {
        match pdf.extract_text(&[page_number]) {
            Ok(text) if text.trim().is_empty() => {
                debug!("Page {} of {} has no text", page_number, path.display());
            }
            Ok(text) => documents.push(Document {
                source: path.to_path_buf(),
                page_number,
                text,
            }),
            Err(e) => {
                warn!(
                    "Skipping page {} of {}: {}",
                    page_number,
                    path.display(),
                    e
                );
            }
        }
    }

    debug!("Read {} pages from {}", documents.len(), path.display());
    Ok(documents)
}
