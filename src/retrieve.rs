//! Similarity retrieval over the index.

use std::sync::Arc;
use tracing::debug;

use crate::embedding::{embed_query, Embedder};
use crate::error::RagError;
use crate::index::IndexState;
use crate::models::ScoredChunk;
use crate::pool::WorkerPool;
use crate::store::VectorStore;

pub struct Retriever {
    store: Arc<dyn VectorStore>,
    embedder: Arc<dyn Embedder>,
    pool: WorkerPool,
    similarity_floor: Option<f32>,
}

impl Retriever {
    pub fn new(
        store: Arc<dyn VectorStore>,
        embedder: Arc<dyn Embedder>,
        pool: WorkerPool,
        similarity_floor: Option<f32>,
    ) -> Self {
        Self {
            store,
            embedder,
            pool,
            similarity_floor,
        }
    }

    /// The `k` chunks most similar to `query`, highest score first.
    ///
    /// Equal scores keep insertion order. An empty index yields an empty
    /// list without touching the embedder. Chunks scoring below the
    /// configured similarity floor are dropped.
    pub async fn retrieve(
        &self,
        state: &IndexState,
        query: &str,
        k: usize,
    ) -> Result<Vec<ScoredChunk>, RagError> {
        let handle = match state {
            IndexState::Empty => return Ok(Vec::new()),
            IndexState::Populated(handle) => handle,
        };
        if k == 0 {
            return Ok(Vec::new());
        }

        let vector = self
            .pool
            .run(embed_query(self.embedder.as_ref(), query))
            .await
            .and_then(|r| r)
            .map_err(|e| RagError::Retrieval(format!("query embedding failed: {:#}", e)))?;

        let mut hits = self
            .store
            .search(&handle.collection, &vector, k)
            .await
            .map_err(|e| RagError::Retrieval(format!("similarity search failed: {:#}", e)))?;

        if let Some(floor) = self.similarity_floor {
            hits.retain(|hit| hit.score >= floor);
        }
        debug!(hits = hits.len(), k, "retrieved chunks");
        Ok(hits)
    }
}
