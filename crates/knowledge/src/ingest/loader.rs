//! File loaders: turn one source file into [`SourceDocument`]s.

use super::markup::clean_html;
use super::office;
use crate::types::{DocumentMetadata, SourceDocument};
use docent_core::{AppError, AppResult};
use std::path::{Path, PathBuf};
use std::process::Command;

/// Loads a file into one or more documents.
///
/// Loaders are blocking; the ingestion pipeline runs them on the blocking
/// thread pool.
pub trait DocumentLoader: Send + Sync {
    fn load(&self, path: &Path) -> AppResult<Vec<SourceDocument>>;
}

/// Format of a source file, decided by extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Text,
    Html,
    Pdf,
    Docx,
    Pptx,
    Xlsx,
    /// Legacy binary Office formats (`.doc`, `.xls`)
    LegacyOffice,
}

impl FileKind {
    /// Detect the kind from a path's extension, case-insensitively.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "txt" | "md" => Some(Self::Text),
            "html" | "htm" => Some(Self::Html),
            "pdf" => Some(Self::Pdf),
            "docx" => Some(Self::Docx),
            "pptx" => Some(Self::Pptx),
            "xlsx" => Some(Self::Xlsx),
            "doc" | "xls" => Some(Self::LegacyOffice),
            _ => None,
        }
    }
}

/// Loader for every format on the ingestion allow-list.
#[derive(Debug, Clone)]
pub struct FileLoader {
    pdftotext: PathBuf,
}

impl Default for FileLoader {
    fn default() -> Self {
        Self {
            pdftotext: PathBuf::from("pdftotext"),
        }
    }
}

impl FileLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a specific `pdftotext` binary.
    pub fn with_pdftotext(mut self, program: impl Into<PathBuf>) -> Self {
        self.pdftotext = program.into();
        self
    }

    fn load_pdf(&self, path: &Path, source: &str) -> AppResult<Vec<SourceDocument>> {
        let output = Command::new(&self.pdftotext)
            .args(["-layout", "-enc", "UTF-8"])
            .arg(path)
            .arg("-")
            .output()
            .map_err(|e| {
                AppError::Document(format!(
                    "Failed to run {:?} for {:?} (is poppler-utils installed?): {}",
                    self.pdftotext, path, e
                ))
            })?;

        if !output.status.success() {
            return Err(AppError::Document(format!(
                "pdftotext failed for {:?}: {}",
                path,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        let text = String::from_utf8_lossy(&output.stdout);
        Ok(split_pages(&text, source))
    }
}

/// One document per form-feed separated page, numbered from 1. Blank pages
/// are dropped but still counted.
fn split_pages(text: &str, source: &str) -> Vec<SourceDocument> {
    text.split('\u{c}')
        .enumerate()
        .filter(|(_, page)| !page.trim().is_empty())
        .map(|(i, page)| {
            SourceDocument::new(page, DocumentMetadata::new(source, Some(i as u32 + 1)))
        })
        .collect()
}

fn numbered_documents(parts: Vec<(u32, String)>, source: &str) -> Vec<SourceDocument> {
    parts
        .into_iter()
        .filter(|(_, text)| !text.trim().is_empty())
        .map(|(number, text)| SourceDocument::new(text, DocumentMetadata::new(source, Some(number))))
        .collect()
}

impl DocumentLoader for FileLoader {
    fn load(&self, path: &Path) -> AppResult<Vec<SourceDocument>> {
        let kind =
            FileKind::from_path(path).ok_or_else(|| AppError::UnsupportedFile(path.to_path_buf()))?;
        let source = path.to_string_lossy().to_string();

        tracing::debug!(?kind, "Loading {:?}", path);

        let documents = match kind {
            FileKind::Text => {
                let bytes = std::fs::read(path)?;
                let text = String::from_utf8_lossy(&bytes);
                vec![SourceDocument::new(text, DocumentMetadata::new(&source, None))]
            }
            FileKind::Html => {
                let raw = std::fs::read(path)?;
                let text = clean_html(&String::from_utf8_lossy(&raw));
                vec![SourceDocument::new(text, DocumentMetadata::new(&source, None))]
            }
            FileKind::Pdf => self.load_pdf(path, &source)?,
            FileKind::Docx => {
                let text = office::docx_text(path)?;
                vec![SourceDocument::new(text, DocumentMetadata::new(&source, None))]
            }
            FileKind::Pptx => numbered_documents(office::pptx_slides(path)?, &source),
            FileKind::Xlsx => numbered_documents(office::xlsx_sheets(path)?, &source),
            FileKind::LegacyOffice => return Err(AppError::UnsupportedFile(path.to_path_buf())),
        };

        Ok(documents)
    }
}
