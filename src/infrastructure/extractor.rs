//! Plain-text extraction from uploaded documents.
//!
//! Supported inputs are `.txt` (UTF-8), `.docx` (paragraph text from
//! `word/document.xml`) and `.pdf` (per-page text via lopdf). Failures are
//! logged and reported to callers as "no text".

use regex::Regex;
use std::io::{Cursor, Read};
use std::path::Path;
use std::sync::LazyLock;
use thiserror::Error;
use tracing::{debug, instrument, warn};
use zip::ZipArchive;

const DOCX_BODY: &str = "word/document.xml";

static PARAGRAPH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<w:p(?:\s[^>]*?)?(?:/>|>(.*?)</w:p>)").expect("paragraph pattern")
});
// Tab stops inside <w:pPr> share the <w:tab/> element name with real tabs
static PARAGRAPH_PROPERTIES: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<w:pPr(?:\s[^>]*?)?(?:/>|>.*?</w:pPr>)").expect("paragraph properties pattern")
});
static RUN_CONTENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?s)<w:(?:t(?:\s[^>]*?)?(?:/>|>(?P<text>.*?)</w:t>)|(?P<tab>tab)(?:\s[^>]*?)?/>|(?P<brk>br|cr)(?:\s[^>]*?)?/>)",
    )
    .expect("run content pattern")
});

#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("Unsupported file type: {0}")]
    Unsupported(String),
    #[error("File is not valid UTF-8: {0}")]
    Encoding(#[from] std::string::FromUtf8Error),
    #[error("Malformed docx container: {0}")]
    Docx(#[from] zip::result::ZipError),
    #[error("Failed to read docx body: {0}")]
    Io(#[from] std::io::Error),
    #[error("Malformed pdf: {0}")]
    Pdf(#[from] lopdf::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DocumentKind {
    Text,
    Docx,
    Pdf,
}

impl DocumentKind {
    fn from_filename(filename: &str) -> Option<Self> {
        let extension = Path::new(filename)
            .extension()?
            .to_str()?
            .to_ascii_lowercase();
        match extension.as_str() {
            "txt" => Some(DocumentKind::Text),
            "docx" => Some(DocumentKind::Docx),
            "pdf" => Some(DocumentKind::Pdf),
            _ => None,
        }
    }
}

/// Returns the document's text, or `None` when the type is unsupported or
/// the content cannot be read.
#[instrument(skip(bytes), fields(size = bytes.len()))]
pub fn extract_text(filename: &str, bytes: &[u8]) -> Option<String> {
    match try_extract_text(filename, bytes) {
        Ok(text) => {
            debug!(chars = text.chars().count(), "Extracted text from upload");
            Some(text)
        }
        Err(e) => {
            warn!(filename = filename, error = %e, "Text extraction failed");
            None
        }
    }
}

pub fn try_extract_text(filename: &str, bytes: &[u8]) -> Result<String, ExtractionError> {
    match DocumentKind::from_filename(filename) {
        Some(DocumentKind::Text) => Ok(String::from_utf8(bytes.to_vec())?),
        Some(DocumentKind::Docx) => docx_text(bytes),
        Some(DocumentKind::Pdf) => pdf_text(bytes),
        None => Err(ExtractionError::Unsupported(filename.to_string())),
    }
}

fn docx_text(bytes: &[u8]) -> Result<String, ExtractionError> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))?;
    let mut xml = String::new();
    archive.by_name(DOCX_BODY)?.read_to_string(&mut xml)?;

    let paragraphs: Vec<String> = PARAGRAPH
        .captures_iter(&xml)
        .map(|paragraph| paragraph_text(paragraph.get(1).map_or("", |m| m.as_str())))
        .collect();

    Ok(paragraphs.join("\n"))
}

/// Text runs in document order, with `<w:tab/>` as `\t` and `<w:br/>`/`<w:cr/>` as `\n`.
fn paragraph_text(body: &str) -> String {
    let body = PARAGRAPH_PROPERTIES.replace_all(body, "");
    RUN_CONTENT
        .captures_iter(&body)
        .map(|token| {
            if let Some(text) = token.name("text") {
                unescape_xml(text.as_str())
            } else if token.name("tab").is_some() {
                "\t".to_string()
            } else if token.name("brk").is_some() {
                "\n".to_string()
            } else {
                String::new()
            }
        })
        .collect()
}

fn pdf_text(bytes: &[u8]) -> Result<String, ExtractionError> {
    let document = lopdf::Document::load_mem(bytes)?;
    let mut text = String::new();
    for page_number in document.get_pages().keys() {
        match document.extract_text(&[*page_number]) {
            Ok(page_text) => text.push_str(&page_text),
            Err(e) => debug!(page = page_number, error = %e, "Skipping unreadable pdf page"),
        }
    }
    Ok(text)
}

fn unescape_xml(raw: &str) -> String {
    if !raw.contains('&') {
        return raw.to_string();
    }
    raw.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}
