//! Format dispatch and extraction against real file fixtures.

mod common;

use std::fs;
use std::sync::Arc;

use common::{docx_with_paragraphs, pdf_with_pages, FakeOcr};
use docrag::error::RagError;
use docrag::extract::{Extraction, TextExtractor};

fn extractor_with(ocr: Arc<FakeOcr>, min_confidence: f32) -> TextExtractor {
    TextExtractor::new(ocr, min_confidence)
}

#[test]
fn pdf_pages_are_extracted_in_order() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("invoice.pdf");
    fs::write(&path, pdf_with_pages(&["Invoice 17", "Total: $42"])).unwrap();

    let extraction = extractor_with(FakeOcr::lines(&[]), 0.0)
        .extract(&path)
        .unwrap();
    assert!(extraction.failure_reason().is_none(), "{:?}", extraction);
    let text = extraction.text();
    let first = text.find("Invoice 17").expect("page 1 text");
    let second = text.find("Total: $42").expect("page 2 text");
    assert!(first < second);
}

#[test]
fn docx_paragraphs_are_newline_separated() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("notes.docx");
    fs::write(
        &path,
        docx_with_paragraphs(&["Quarterly roadmap", "Planning session"]),
    )
    .unwrap();

    let extraction = extractor_with(FakeOcr::lines(&[]), 0.0)
        .extract(&path)
        .unwrap();
    assert_eq!(
        extraction,
        Extraction::Success("Quarterly roadmap\nPlanning session\n".to_string())
    );
}

#[test]
fn legacy_doc_that_is_not_a_zip_fails_softly() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("old.doc");
    fs::write(&path, b"\xD0\xCF\x11\xE0 legacy binary").unwrap();

    let extraction = extractor_with(FakeOcr::lines(&[]), 0.0)
        .extract(&path)
        .unwrap();
    assert!(extraction.is_blank());
    assert!(extraction.failure_reason().is_some());
}

#[test]
fn image_regions_are_joined_in_detection_order() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("scan.PNG");
    fs::write(&path, b"not really a png").unwrap();

    let ocr = FakeOcr::lines(&[("Receipt", 0.92), ("smudge", 0.10), ("Paid in full", 0.88)]);
    let extraction = extractor_with(ocr, 0.5).extract(&path).unwrap();
    assert_eq!(extraction, Extraction::Success("Receipt\nPaid in full".to_string()));
}

#[test]
fn unsupported_extension_fails_immediately() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("data.csv");
    fs::write(&path, b"a,b\n1,2\n").unwrap();

    let err = extractor_with(FakeOcr::lines(&[]), 0.0)
        .extract(&path)
        .unwrap_err();
    assert!(matches!(err, RagError::UnsupportedFormat(ref ext) if ext == ".csv"));
}

#[test]
fn missing_file_is_a_soft_failure() {
    let tmp = tempfile::tempdir().unwrap();
    let extraction = extractor_with(FakeOcr::lines(&[]), 0.0)
        .extract(&tmp.path().join("gone.pdf"))
        .unwrap();
    assert!(extraction.failure_reason().unwrap().contains("failed to read file"));
}
