//! Plain-text extraction from uploaded files.
//!
//! Dispatch is by file extension: `.pdf` goes through `pdf-extract`, `.docx`
//! is unpacked with `zip` and its `word/document.xml` part walked with
//! `quick-xml`, and `.txt` is read as lossy UTF-8. Every extractor returns
//! trimmed text; callers treat an empty string as "nothing to ingest".

use std::fs::File;
use std::io::Read;
use std::path::Path;

use quick_xml::Reader;
use quick_xml::events::Event;
use tracing::{debug, warn};

use crate::error::{RagError, Result};

/// Extensions accepted by [`FileTextExtractor`], lowercase with leading dot.
pub const SUPPORTED_EXTENSIONS: [&str; 3] = [".pdf", ".docx", ".txt"];

/// The recognised input formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    /// Portable Document Format.
    Pdf,
    /// Office Open XML word-processing document.
    Docx,
    /// Plain text.
    Txt,
}

impl DocumentFormat {
    /// Detect the format from a path's extension (case-insensitive).
    ///
    /// # Errors
    ///
    /// Returns [`RagError::UnsupportedFormat`] for any other extension.
    pub fn from_path(path: &Path) -> Result<Self> {
        let extension = path
            .extension()
            .map(|e| e.to_string_lossy().to_ascii_lowercase())
            .unwrap_or_default();
        match extension.as_str() {
            "pdf" => Ok(Self::Pdf),
            "docx" => Ok(Self::Docx),
            "txt" => Ok(Self::Txt),
            _ => Err(RagError::UnsupportedFormat {
                path: path.to_path_buf(),
                extension: if extension.is_empty() { extension } else { format!(".{extension}") },
            }),
        }
    }
}

/// Converts a file into plain text.
///
/// Implementations are blocking; the pipeline runs them on the blocking
/// thread pool.
pub trait TextExtractor: Send + Sync {
    /// Extract the text of `path`, trimmed of surrounding whitespace.
    fn extract(&self, path: &Path) -> Result<String>;
}

/// The default extractor: dispatches on [`DocumentFormat`].
#[derive(Debug, Clone, Copy, Default)]
pub struct FileTextExtractor;

impl TextExtractor for FileTextExtractor {
    fn extract(&self, path: &Path) -> Result<String> {
        let format = DocumentFormat::from_path(path).inspect_err(|e| {
            warn!(path = %path.display(), error = %e, "unsupported file format");
        })?;
        let text = match format {
            DocumentFormat::Pdf => extract_pdf(path)?,
            DocumentFormat::Docx => extract_docx(path)?,
            DocumentFormat::Txt => extract_txt(path)?,
        };
        debug!(path = %path.display(), ?format, chars = text.chars().count(), "extracted text");
        Ok(text)
    }
}

fn extraction_error(path: &Path, message: impl Into<String>) -> RagError {
    RagError::ExtractionError { path: path.to_path_buf(), message: message.into() }
}

fn extract_pdf(path: &Path) -> Result<String> {
    // pdf-extract panics on some malformed inputs
    let outcome = std::panic::catch_unwind(|| pdf_extract::extract_text(path));
    match outcome {
        Ok(Ok(text)) => Ok(text.trim().to_string()),
        Ok(Err(e)) => Err(extraction_error(path, e.to_string())),
        Err(_) => Err(extraction_error(path, "PDF parser aborted on malformed input")),
    }
}

fn extract_docx(path: &Path) -> Result<String> {
    let file = File::open(path).map_err(|e| extraction_error(path, e.to_string()))?;
    let mut archive = zip::ZipArchive::new(file)
        .map_err(|e| extraction_error(path, format!("not a DOCX archive: {e}")))?;
    let mut entry = archive
        .by_name("word/document.xml")
        .map_err(|e| extraction_error(path, format!("missing word/document.xml: {e}")))?;
    let mut xml = String::new();
    entry.read_to_string(&mut xml).map_err(|e| extraction_error(path, e.to_string()))?;

    docx_xml_to_text(&xml).map_err(|message| extraction_error(path, message))
}

fn extract_txt(path: &Path) -> Result<String> {
    let bytes = std::fs::read(path).map_err(|e| extraction_error(path, e.to_string()))?;
    Ok(String::from_utf8_lossy(&bytes).trim().to_string())
}

/// Flatten the body XML of a DOCX into text, one line per paragraph.
///
/// Only `w:t` runs contribute text; `w:tab` becomes a tab and `w:br`/`w:cr`
/// a newline.
pub fn docx_xml_to_text(xml: &str) -> std::result::Result<String, String> {
    let mut reader = Reader::from_str(xml);
    let mut out = String::new();
    let mut in_text_run = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) if e.name().as_ref() == b"w:t" => in_text_run = true,
            Ok(Event::End(e)) => match e.name().as_ref() {
                b"w:t" => in_text_run = false,
                b"w:p" => out.push('\n'),
                _ => {}
            },
            Ok(Event::Empty(e)) => match e.name().as_ref() {
                b"w:tab" => out.push('\t'),
                b"w:br" | b"w:cr" => out.push('\n'),
                _ => {}
            },
            Ok(Event::Text(t)) if in_text_run => {
                let text = t.unescape().map_err(|e| format!("bad text run: {e}"))?;
                out.push_str(&text);
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(format!("malformed XML at byte {}: {e}", reader.buffer_position()));
            }
            _ => {}
        }
    }

    Ok(out.trim().to_string())
}
