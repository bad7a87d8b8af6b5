//! Format-dispatching text extraction for uploaded documents.
//!
//! Dispatch is purely on file extension:
//!
//! | Extension | Strategy |
//! |-----------|----------|
//! | `.pdf` | page text in page order, newline-joined |
//! | `.docx`, `.doc` | paragraph text in document order, newline-joined |
//! | `.png`, `.jpg`, `.jpeg`, `.bmp`, `.tiff` | OCR regions in detection order, newline-joined |
//!
//! An unknown extension is the only hard error. Parser and OCR failures
//! never escape: they come back as [`Extraction::Failure`] carrying the
//! reason and whatever text was recovered before the failure.

use std::io::Read;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::error::RagError;
use crate::ocr::OcrEngine;

/// Maximum decompressed bytes to read from a single ZIP entry (zip-bomb protection).
const MAX_XML_ENTRY_BYTES: u64 = 50 * 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Pdf,
    Word,
    Image,
}

impl Format {
    /// Resolve the extraction strategy for a path. Case-insensitive.
    pub fn from_path(path: &Path) -> Result<Self, RagError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "pdf" => Ok(Format::Pdf),
            "docx" | "doc" => Ok(Format::Word),
            "png" | "jpg" | "jpeg" | "bmp" | "tiff" => Ok(Format::Image),
            _ => Err(RagError::UnsupportedFormat(format!(".{}", ext))),
        }
    }
}

/// Outcome of a best-effort extraction.
#[derive(Debug, Clone, PartialEq)]
pub enum Extraction {
    Success(String),
    Failure { reason: String, partial: String },
}

impl Extraction {
    /// Recovered text, whether or not extraction completed.
    pub fn text(&self) -> &str {
        match self {
            Extraction::Success(text) => text,
            Extraction::Failure { partial, .. } => partial,
        }
    }

    pub fn failure_reason(&self) -> Option<&str> {
        match self {
            Extraction::Success(_) => None,
            Extraction::Failure { reason, .. } => Some(reason),
        }
    }

    /// True when there is nothing worth indexing.
    pub fn is_blank(&self) -> bool {
        self.text().trim().is_empty()
    }

    pub fn into_text(self) -> String {
        match self {
            Extraction::Success(text) => text,
            Extraction::Failure { partial, .. } => partial,
        }
    }

    fn failed(reason: impl Into<String>, partial: String) -> Self {
        Extraction::Failure {
            reason: reason.into(),
            partial,
        }
    }
}

pub struct TextExtractor {
    ocr: Arc<dyn OcrEngine>,
    min_confidence: f32,
}

impl TextExtractor {
    pub fn new(ocr: Arc<dyn OcrEngine>, min_confidence: f32) -> Self {
        Self {
            ocr,
            min_confidence,
        }
    }

    /// Extract plain text from a file on disk. Blocking.
    pub fn extract(&self, path: &Path) -> Result<Extraction, RagError> {
        let format = Format::from_path(path)?;
        let extraction = match format {
            Format::Pdf => read_then(path, extract_pdf),
            Format::Word => read_then(path, extract_docx),
            Format::Image => self.extract_image(path),
        };

        match &extraction {
            Extraction::Success(text) => {
                debug!(path = %path.display(), ?format, chars = text.len(), "extracted text");
            }
            Extraction::Failure { reason, partial } => {
                warn!(
                    path = %path.display(),
                    ?format,
                    partial_chars = partial.len(),
                    "extraction failed: {}",
                    reason
                );
            }
        }
        Ok(extraction)
    }

    fn extract_image(&self, path: &Path) -> Extraction {
        match self.ocr.recognize(path) {
            Ok(regions) => {
                let lines: Vec<String> = regions
                    .into_iter()
                    .filter(|r| r.confidence >= self.min_confidence)
                    .map(|r| r.text)
                    .collect();
                Extraction::Success(lines.join("\n"))
            }
            Err(e) => Extraction::failed(format!("OCR failed: {:#}", e), String::new()),
        }
    }
}

fn read_then(path: &Path, parse: fn(&[u8]) -> Extraction) -> Extraction {
    match std::fs::read(path) {
        Ok(bytes) => parse(&bytes),
        Err(e) => Extraction::failed(format!("failed to read file: {}", e), String::new()),
    }
}

/// PDF pages in order, one newline after each page.
pub fn extract_pdf(bytes: &[u8]) -> Extraction {
    // pdf-extract panics on some malformed font tables instead of returning an error.
    let result = std::panic::catch_unwind(|| pdf_extract::extract_text_from_mem_by_pages(bytes));
    match result {
        Ok(Ok(pages)) => {
            let mut out = String::new();
            for page in pages {
                out.push_str(&page);
                out.push('\n');
            }
            Extraction::Success(out)
        }
        Ok(Err(e)) => Extraction::failed(format!("PDF extraction failed: {}", e), String::new()),
        Err(_) => Extraction::failed("PDF parser panicked", String::new()),
    }
}

/// Word paragraphs in document order, one newline after each paragraph.
pub fn extract_docx(bytes: &[u8]) -> Extraction {
    let doc_xml = match read_document_xml(bytes) {
        Ok(xml) => xml,
        Err(reason) => return Extraction::failed(reason, String::new()),
    };
    paragraphs_from_xml(&doc_xml)
}

fn read_document_xml(bytes: &[u8]) -> Result<Vec<u8>, String> {
    let mut archive = zip::ZipArchive::new(std::io::Cursor::new(bytes))
        .map_err(|e| format!("Word extraction failed: {}", e))?;
    let entry = archive
        .by_name("word/document.xml")
        .map_err(|_| "Word extraction failed: word/document.xml not found".to_string())?;
    let mut out = Vec::new();
    entry
        .take(MAX_XML_ENTRY_BYTES)
        .read_to_end(&mut out)
        .map_err(|e| format!("Word extraction failed: {}", e))?;
    if out.len() as u64 >= MAX_XML_ENTRY_BYTES {
        return Err("Word extraction failed: word/document.xml exceeds size limit".to_string());
    }
    Ok(out)
}

/// Collect `w:t` runs per `w:p` paragraph.
fn paragraphs_from_xml(xml: &[u8]) -> Extraction {
    use quick_xml::events::Event;

    let mut out = String::new();
    let mut paragraph = String::new();
    let mut in_text = false;
    let mut reader = quick_xml::Reader::from_reader(xml);
    reader.config_mut().trim_text(false);
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"t" => in_text = true,
                b"p" => paragraph.clear(),
                _ => {}
            },
            Ok(Event::Text(te)) if in_text => {
                paragraph.push_str(te.unescape().unwrap_or_default().as_ref());
            }
            Ok(Event::Empty(e)) => match e.local_name().as_ref() {
                b"tab" => paragraph.push('\t'),
                b"br" => paragraph.push('\n'),
                b"p" => out.push('\n'),
                _ => {}
            },
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"t" => in_text = false,
                b"p" => {
                    out.push_str(&paragraph);
                    out.push('\n');
                    paragraph.clear();
                }
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => {
                out.push_str(&paragraph);
                return Extraction::failed(format!("Word extraction failed: {}", e), out);
            }
            _ => {}
        }
        buf.clear();
    }
    Extraction::Success(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ocr::OcrRegion;

    struct NoOcr;

    impl OcrEngine for NoOcr {
        fn recognize(&self, _image: &Path) -> anyhow::Result<Vec<OcrRegion>> {
            anyhow::bail!("no OCR engine in unit tests")
        }
    }

    fn extractor() -> TextExtractor {
        TextExtractor::new(Arc::new(NoOcr), 0.0)
    }

    #[test]
    fn format_dispatch_is_case_insensitive() {
        assert_eq!(Format::from_path(Path::new("a.PDF")).unwrap(), Format::Pdf);
        assert_eq!(Format::from_path(Path::new("a.doc")).unwrap(), Format::Word);
        assert_eq!(Format::from_path(Path::new("a.Tiff")).unwrap(), Format::Image);
    }

    #[test]
    fn unsupported_extension_is_an_error() {
        let err = extractor().extract(Path::new("notes.xyz")).unwrap_err();
        assert_eq!(err.to_string(), "Unsupported file format: .xyz");
        assert!(matches!(
            Format::from_path(Path::new("README")),
            Err(RagError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn invalid_pdf_is_a_soft_failure() {
        let extraction = extract_pdf(b"not a pdf");
        assert!(extraction.failure_reason().is_some());
        assert!(extraction.is_blank());
    }

    #[test]
    fn invalid_zip_is_a_soft_failure_for_docx() {
        let extraction = extract_docx(b"not a zip");
        assert!(extraction
            .failure_reason()
            .unwrap()
            .starts_with("Word extraction failed"));
    }

    #[test]
    fn paragraphs_are_newline_separated() {
        let xml = br#"<w:document xmlns:w="x"><w:body>
            <w:p><w:r><w:t>First </w:t></w:r><w:r><w:t>paragraph</w:t></w:r></w:p>
            <w:p><w:r><w:t>Second</w:t></w:r></w:p>
        </w:body></w:document>"#;
        let extraction = paragraphs_from_xml(xml);
        assert_eq!(extraction, Extraction::Success("First paragraph\nSecond\n".into()));
    }

    #[test]
    fn malformed_xml_keeps_partial_text() {
        let xml = br#"<w:document xmlns:w="x"><w:body>
            <w:p><w:r><w:t>Kept</w:t></w:r></w:p>
            <w:p><w:r><w:t>Broken</w:x></w:r></w:p>"#;
        match paragraphs_from_xml(xml) {
            Extraction::Failure { partial, .. } => assert!(partial.starts_with("Kept\n")),
            other => panic!("expected failure, got {:?}", other),
        }
    }

    #[test]
    fn ocr_failure_is_reported_with_reason() {
        let extraction = extractor().extract(Path::new("scan.png")).unwrap();
        assert!(extraction.failure_reason().unwrap().contains("no OCR engine"));
    }
}
