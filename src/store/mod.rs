//! Vector store abstraction.
//!
//! A store holds named collections of embedded chunks. A collection
//! records the embedding model and dimensionality it was built with so a
//! reopened index can refuse vectors from a different embedding space.
//!
//! | Method | Purpose |
//! |--------|---------|
//! | [`load_collection`](VectorStore::load_collection) | Collection info, `None` if never created |
//! | [`create_collection`](VectorStore::create_collection) | Create (or re-declare) a collection |
//! | [`upsert`](VectorStore::upsert) | Insert or replace entries by chunk id, atomically |
//! | [`search`](VectorStore::search) | Top-k cosine similarity, ties in insertion order |
//! | [`count`](VectorStore::count) | Number of entries |
//!
//! Implementations: [`SqliteStore`](sqlite::SqliteStore) (persistent) and
//! [`InMemoryStore`](memory::InMemoryStore) (tests).

pub mod memory;
pub mod sqlite;

use anyhow::Result;
use async_trait::async_trait;

use crate::models::{Chunk, ScoredChunk};

#[derive(Debug, Clone, PartialEq)]
pub struct CollectionInfo {
    pub name: String,
    pub embedding_model: String,
    pub dims: usize,
    pub count: usize,
}

/// A chunk with its embedding, ready to be written.
#[derive(Debug, Clone)]
pub struct IndexEntry {
    pub chunk: Chunk,
    pub vector: Vec<f32>,
}

#[async_trait]
pub trait VectorStore: Send + Sync {
    async fn load_collection(&self, name: &str) -> Result<Option<CollectionInfo>>;

    async fn create_collection(&self, name: &str, embedding_model: &str, dims: usize) -> Result<()>;

    /// Insert or replace entries keyed by chunk id. All-or-nothing.
    ///
    /// A replaced entry keeps its original insertion position.
    async fn upsert(&self, collection: &str, entries: &[IndexEntry]) -> Result<()>;

    /// The `k` most similar entries, sorted by descending score.
    async fn search(&self, collection: &str, query: &[f32], k: usize) -> Result<Vec<ScoredChunk>>;

    async fn count(&self, collection: &str) -> Result<usize>;
}

/// Sort by descending score and keep the first `k`.
///
/// `scored` must already be in insertion order; the stable sort keeps
/// that order among equal scores.
pub(crate) fn rank(mut scored: Vec<ScoredChunk>, k: usize) -> Vec<ScoredChunk> {
    scored.sort_by(|a, b| b.score.total_cmp(&a.score));
    scored.truncate(k);
    scored
}
