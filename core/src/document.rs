//! Plain-text extraction for the document the assistant answers from.

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::info;

#[derive(Error, Debug)]
pub enum DocumentError {
    #[error("Document not found: {0}")]
    NotFound(PathBuf),

    #[error("Failed to read document {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Invalid PDF document {path}: {message}")]
    Pdf { path: PathBuf, message: String },

    #[error("Unsupported document format: {0}")]
    UnsupportedFormat(PathBuf),
}

/// Document formats the loader can extract text from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Pdf,
    Text,
}

impl DocumentFormat {
    /// Detects the format from the file extension, case-insensitively.
    pub fn from_path(path: &Path) -> Option<Self> {
        let extension = path.extension()?.to_str()?.to_ascii_lowercase();
        match extension.as_str() {
            "pdf" => Some(Self::Pdf),
            "txt" | "md" | "markdown" => Some(Self::Text),
            _ => None,
        }
    }
}

/// Reads the document at `path` and returns its text in document order.
pub fn load_document(path: &Path) -> Result<String, DocumentError> {
    // A missing file is reported as missing whatever its extension
    let bytes = std::fs::read(path).map_err(|source| match source.kind() {
        io::ErrorKind::NotFound => DocumentError::NotFound(path.to_path_buf()),
        _ => DocumentError::Io {
            path: path.to_path_buf(),
            source,
        },
    })?;

    let format = DocumentFormat::from_path(path)
        .ok_or_else(|| DocumentError::UnsupportedFormat(path.to_path_buf()))?;

    let text = match format {
        DocumentFormat::Pdf => extract_pdf_text(path, &bytes)?,
        DocumentFormat::Text => String::from_utf8(bytes).map_err(|e| DocumentError::Io {
            path: path.to_path_buf(),
            source: io::Error::new(io::ErrorKind::InvalidData, e),
        })?,
    };

    info!(path = %path.display(), chars = text.chars().count(), "Loaded document");
    Ok(text)
}

fn extract_pdf_text(path: &Path, bytes: &[u8]) -> Result<String, DocumentError> {
    let pdf_error = |e: lopdf::Error| DocumentError::Pdf {
        path: path.to_path_buf(),
        message: e.to_string(),
    };

    let document = lopdf::Document::load_mem(bytes).map_err(pdf_error)?;
    let pages: Vec<u32> = document.get_pages().keys().copied().collect();
    if pages.is_empty() {
        return Ok(String::new());
    }
    document.extract_text(&pages).map_err(pdf_error)
}
