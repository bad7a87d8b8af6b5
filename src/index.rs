//! Incremental vector indexing.
//!
//! The index has two states. [`IndexState::Empty`] means no collection has
//! any entries yet; the first successful [`Indexer::add_document`] declares
//! the collection with the embedder's model and dimensionality and moves
//! the state to [`IndexState::Populated`]. Later documents are upserted
//! into the same collection. There is no way back to `Empty`.

use std::sync::Arc;
use tracing::{debug, info};

use crate::chunk::chunk_document;
use crate::config::ChunkingConfig;
use crate::embedding::{embed_checked, Embedder};
use crate::error::RagError;
use crate::models::Document;
use crate::pool::WorkerPool;
use crate::store::{IndexEntry, VectorStore};

/// Identifies a populated collection and the embedding space it lives in.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexHandle {
    pub collection: String,
    pub embedding_model: String,
    pub dims: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub enum IndexState {
    Empty,
    Populated(IndexHandle),
}

impl IndexState {
    pub fn is_empty(&self) -> bool {
        matches!(self, IndexState::Empty)
    }
}

pub struct Indexer {
    store: Arc<dyn VectorStore>,
    embedder: Arc<dyn Embedder>,
    pool: WorkerPool,
    collection: String,
    chunking: ChunkingConfig,
    batch_size: usize,
}

impl Indexer {
    pub fn new(
        store: Arc<dyn VectorStore>,
        embedder: Arc<dyn Embedder>,
        pool: WorkerPool,
        collection: impl Into<String>,
        chunking: ChunkingConfig,
        batch_size: usize,
    ) -> Self {
        Self {
            store,
            embedder,
            pool,
            collection: collection.into(),
            chunking,
            batch_size: batch_size.max(1),
        }
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    fn handle(&self) -> IndexHandle {
        IndexHandle {
            collection: self.collection.clone(),
            embedding_model: self.embedder.model_name().to_string(),
            dims: self.embedder.dims(),
        }
    }

    /// Load the persisted collection, if any.
    ///
    /// Fails when the collection holds vectors from a different embedding
    /// model or dimensionality than the configured embedder.
    pub async fn open(&self) -> anyhow::Result<IndexState> {
        let Some(info) = self.store.load_collection(&self.collection).await? else {
            info!(collection = %self.collection, "no persisted index, starting empty");
            return Ok(IndexState::Empty);
        };

        if info.count == 0 {
            info!(collection = %self.collection, "persisted collection has no entries, starting empty");
            return Ok(IndexState::Empty);
        }

        if info.embedding_model != self.embedder.model_name() || info.dims != self.embedder.dims() {
            anyhow::bail!(
                "collection '{}' was built with {} ({} dims) but the configured embedder is {} ({} dims)",
                info.name,
                info.embedding_model,
                info.dims,
                self.embedder.model_name(),
                self.embedder.dims()
            );
        }

        info!(
            collection = %info.name,
            entries = info.count,
            model = %info.embedding_model,
            "loaded persisted index"
        );
        Ok(IndexState::Populated(self.handle()))
    }

    /// Chunk, embed and upsert one document.
    ///
    /// Returns the state after the write and the number of chunks written.
    /// Nothing is written unless every chunk embedded successfully.
    pub async fn add_document(
        &self,
        state: &IndexState,
        document: &Document,
    ) -> Result<(IndexState, usize), RagError> {
        let chunks = chunk_document(document, self.chunking.max_tokens, self.chunking.overlap_tokens);
        if chunks.is_empty() {
            return Ok((state.clone(), 0));
        }

        let mut entries = Vec::with_capacity(chunks.len());
        for batch in chunks.chunks(self.batch_size) {
            let texts: Vec<String> = batch.iter().map(|c| c.text.clone()).collect();
            let vectors = self
                .pool
                .run(embed_checked(self.embedder.as_ref(), &texts))
                .await
                .and_then(|r| r)
                .map_err(|e| RagError::Indexing(format!("embedding failed: {:#}", e)))?;
            entries.extend(
                batch
                    .iter()
                    .cloned()
                    .zip(vectors)
                    .map(|(chunk, vector)| IndexEntry { chunk, vector }),
            );
        }
        debug!(document = %document.id, chunks = entries.len(), "embedded chunks");

        if state.is_empty() {
            self.store
                .create_collection(&self.collection, self.embedder.model_name(), self.embedder.dims())
                .await
                .map_err(|e| RagError::Indexing(format!("failed to create collection: {:#}", e)))?;
        }

        self.store
            .upsert(&self.collection, &entries)
            .await
            .map_err(|e| RagError::Indexing(format!("vector store write failed: {:#}", e)))?;

        if state.is_empty() {
            info!(collection = %self.collection, "index populated");
        }
        Ok((IndexState::Populated(self.handle()), entries.len()))
    }
}
