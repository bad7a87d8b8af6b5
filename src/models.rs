//! Core data models that flow through the ingest and query pipelines.
//!
//! A [`Document`] is created once per ingest call and never mutated. The
//! chunker splits it into [`Chunk`]s that inherit its metadata; at query
//! time retrieved chunks become numbered [`Source`]s inside a
//! [`QueryResult`].

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::error::RagError;

/// Free-form document metadata. Always carries a `filename` key.
pub type Metadata = serde_json::Map<String, Value>;

/// Metadata key every document and chunk must carry.
pub const FILENAME_KEY: &str = "filename";

/// Answer returned when a query runs against an empty index.
pub const NO_DOCUMENTS_ANSWER: &str = "No documents indexed yet.";

/// Namespace for all deterministic identities minted by this crate.
const ID_NAMESPACE: Uuid = Uuid::from_u128(0x6f1c_2a4e_93d8_4b57_a0e2_58c4_1d7e_9b30);

/// Extracted text plus its metadata, ready for indexing.
#[derive(Debug, Clone)]
pub struct Document {
    pub id: String,
    pub text: String,
    pub metadata: Metadata,
}

impl Document {
    /// Build a document, rejecting metadata without a string `filename`.
    ///
    /// The id is derived from the filename and a hash of the text, so
    /// re-ingesting identical content yields the same chunk identities.
    pub fn new(text: impl Into<String>, metadata: Metadata) -> Result<Self, RagError> {
        let text = text.into();
        let filename = metadata
            .get(FILENAME_KEY)
            .and_then(Value::as_str)
            .ok_or_else(|| {
                RagError::InvalidMetadata(format!("missing string key '{}'", FILENAME_KEY))
            })?;
        let id = document_id(filename, &text);
        Ok(Self { id, text, metadata })
    }

    pub fn filename(&self) -> &str {
        filename_of(&self.metadata).unwrap_or_default()
    }
}

/// A contiguous span of a document's text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub id: String,
    pub document_id: String,
    pub chunk_index: i64,
    pub text: String,
    pub hash: String,
    pub metadata: Metadata,
}

/// A chunk paired with its similarity to a query.
#[derive(Debug, Clone)]
pub struct ScoredChunk {
    pub chunk: Chunk,
    pub score: f32,
}

/// One numbered citation in a [`QueryResult`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Source {
    pub id: usize,
    pub content: String,
    pub metadata: Metadata,
    pub score: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    pub answer: String,
    pub sources: Vec<Source>,
}

impl QueryResult {
    pub fn no_documents() -> Self {
        Self {
            answer: NO_DOCUMENTS_ANSWER.to_string(),
            sources: Vec::new(),
        }
    }
}

pub fn filename_of(metadata: &Metadata) -> Option<&str> {
    metadata.get(FILENAME_KEY).and_then(Value::as_str)
}

/// Metadata for an uploaded file: `{filename, path}`.
pub fn upload_metadata(filename: &str, path: &std::path::Path) -> Metadata {
    let mut metadata = Metadata::new();
    metadata.insert(FILENAME_KEY.to_string(), Value::from(filename));
    metadata.insert(
        "path".to_string(),
        Value::from(path.to_string_lossy().into_owned()),
    );
    metadata
}

pub fn sha256_hex(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}

pub fn document_id(filename: &str, text: &str) -> String {
    let name = format!("document:{}:{}", filename, sha256_hex(text));
    Uuid::new_v5(&ID_NAMESPACE, name.as_bytes()).to_string()
}

pub fn chunk_id(document_id: &str, chunk_index: i64) -> String {
    let name = format!("chunk:{}:{}", document_id, chunk_index);
    Uuid::new_v5(&ID_NAMESPACE, name.as_bytes()).to_string()
}
