//! Overlapping token-window chunker.
//!
//! Splits document text into [`Chunk`]s of at most `max_tokens`
//! whitespace-delimited tokens, with consecutive windows sharing
//! `overlap_tokens` tokens. Each chunk is sliced from the original text so
//! its internal whitespace and newlines survive intact.
//!
//! Boundaries depend only on the input text and the two window sizes, so
//! identical input always produces identical chunks, ids and hashes.

use crate::models::{chunk_id, sha256_hex, Chunk, Document};

/// Split a document into overlapping token windows.
///
/// Whitespace-only text produces no chunks. Indices are contiguous from 0.
pub fn chunk_document(document: &Document, max_tokens: usize, overlap_tokens: usize) -> Vec<Chunk> {
    let spans = token_spans(&document.text);
    if spans.is_empty() || max_tokens == 0 {
        return Vec::new();
    }

    let step = max_tokens.saturating_sub(overlap_tokens).max(1);
    let mut chunks = Vec::new();
    let mut start = 0usize;
    loop {
        let end = (start + max_tokens).min(spans.len());
        let text = &document.text[spans[start].0..spans[end - 1].1];
        chunks.push(make_chunk(document, chunks.len() as i64, text));
        if end == spans.len() {
            break;
        }
        start += step;
    }
    chunks
}

/// Byte ranges of whitespace-delimited tokens.
fn token_spans(text: &str) -> Vec<(usize, usize)> {
    let mut spans = Vec::new();
    let mut start: Option<usize> = None;
    for (i, c) in text.char_indices() {
        if c.is_whitespace() {
            if let Some(s) = start.take() {
                spans.push((s, i));
            }
        } else if start.is_none() {
            start = Some(i);
        }
    }
    if let Some(s) = start {
        spans.push((s, text.len()));
    }
    spans
}

fn make_chunk(document: &Document, index: i64, text: &str) -> Chunk {
    Chunk {
        id: chunk_id(&document.id, index),
        document_id: document.id.clone(),
        chunk_index: index,
        text: text.to_string(),
        hash: sha256_hex(text),
        metadata: document.metadata.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::upload_metadata;
    use std::path::Path;

    fn doc(text: &str) -> Document {
        Document::new(text, upload_metadata("doc.pdf", Path::new("docs/doc.pdf"))).unwrap()
    }

    fn numbered(n: usize) -> String {
        (0..n).map(|i| format!("w{}", i)).collect::<Vec<_>>().join(" ")
    }

    #[test]
    fn test_small_text_single_chunk() {
        let chunks = chunk_document(&doc("Hello, world!"), 1024, 200);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].chunk_index, 0);
        assert_eq!(chunks[0].text, "Hello, world!");
    }

    #[test]
    fn test_whitespace_only_text() {
        assert!(chunk_document(&doc("  \n\t "), 1024, 200).is_empty());
    }

    #[test]
    fn test_windows_overlap() {
        // 10 tokens, window 4, overlap 2 => starts at 0, 2, 4, 6
        let chunks = chunk_document(&doc(&numbered(10)), 4, 2);
        let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(
            texts,
            vec!["w0 w1 w2 w3", "w2 w3 w4 w5", "w4 w5 w6 w7", "w6 w7 w8 w9"]
        );
    }

    #[test]
    fn test_last_window_covers_tail() {
        let chunks = chunk_document(&doc(&numbered(7)), 4, 1);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[1].text, "w3 w4 w5 w6");
    }

    #[test]
    fn test_internal_newlines_preserved() {
        let chunks = chunk_document(&doc("Invoice 17\nTotal: $42\n"), 1024, 200);
        assert_eq!(chunks[0].text, "Invoice 17\nTotal: $42");
    }

    #[test]
    fn test_chunk_indices_contiguous_and_metadata_inherited() {
        let chunks = chunk_document(&doc(&numbered(100)), 8, 3);
        for (i, c) in chunks.iter().enumerate() {
            assert_eq!(c.chunk_index, i as i64, "Index mismatch at position {}", i);
            assert_eq!(c.metadata["filename"], "doc.pdf");
        }
    }

    #[test]
    fn test_deterministic() {
        let d = doc("Alpha\n\nBeta\n\nGamma\n\nDelta");
        let c1 = chunk_document(&d, 2, 1);
        let c2 = chunk_document(&d, 2, 1);
        assert_eq!(c1, c2);
    }
}
