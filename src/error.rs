//! Error taxonomy for the ingest and query pipelines.
//!
//! Extraction problems are deliberately absent: a parser or OCR failure is a
//! value ([`Extraction::Failure`](crate::extract::Extraction::Failure)), not an
//! error. It only becomes user-visible as [`RagError::EmptyContent`] when the
//! caller finds nothing usable to index.
//!
//! Every variant maps onto one HTTP status in [`server`](crate::server).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RagError {
    /// File extension has no extraction strategy. Raised before any side effect.
    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),

    /// Extraction produced no indexable text.
    #[error("Could not extract text from file '{filename}'{}", reason_suffix(.reason))]
    EmptyContent {
        filename: String,
        /// Parser/OCR failure reason, when extraction failed rather than found a blank document.
        reason: Option<String>,
    },

    /// Document metadata is missing a required key.
    #[error("Invalid document metadata: {0}")]
    InvalidMetadata(String),

    /// Embedding or vector-store write failure while ingesting.
    #[error("Indexing failed: {0}")]
    Indexing(String),

    /// Query embedding or similarity search failure.
    #[error("Retrieval failed: {0}")]
    Retrieval(String),

    #[error("Generation timed out after {0} seconds")]
    GenerationTimeout(u64),

    #[error("Generation failed: {0}")]
    Generation(String),

    /// The upload store could not persist or remove an artifact.
    #[error("Upload storage failed: {0}")]
    Upload(String),
}

fn reason_suffix(reason: &Option<String>) -> String {
    match reason {
        Some(r) => format!(" ({})", r),
        None => String::new(),
    }
}

impl RagError {
    /// True for errors caused by the request itself rather than by the system.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            RagError::UnsupportedFormat(_)
                | RagError::EmptyContent { .. }
                | RagError::InvalidMetadata(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_content_message_includes_reason() {
        let err = RagError::EmptyContent {
            filename: "scan.png".to_string(),
            reason: Some("tesseract not found".to_string()),
        };
        assert_eq!(
            err.to_string(),
            "Could not extract text from file 'scan.png' (tesseract not found)"
        );
    }

    #[test]
    fn empty_content_message_without_reason() {
        let err = RagError::EmptyContent {
            filename: "blank.pdf".to_string(),
            reason: None,
        };
        assert_eq!(err.to_string(), "Could not extract text from file 'blank.pdf'");
    }

    #[test]
    fn client_errors_are_classified() {
        assert!(RagError::UnsupportedFormat(".xyz".into()).is_client_error());
        assert!(!RagError::GenerationTimeout(120).is_client_error());
        assert!(!RagError::Indexing("disk full".into()).is_client_error());
    }
}
