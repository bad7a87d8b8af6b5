//! In-memory [`VectorStore`] for tests.
//!
//! Entries live in a `Vec` per collection behind `std::sync::RwLock`, so
//! insertion order is the vector order. Search is brute-force cosine
//! similarity.

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;

use crate::embedding::cosine_similarity;
use crate::models::ScoredChunk;

use super::{rank, CollectionInfo, IndexEntry, VectorStore};

struct Collection {
    embedding_model: String,
    dims: usize,
    entries: Vec<IndexEntry>,
}

#[derive(Default)]
pub struct InMemoryStore {
    collections: RwLock<HashMap<String, Collection>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, HashMap<String, Collection>>> {
        self.collections
            .read()
            .map_err(|_| anyhow!("in-memory store lock poisoned"))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, HashMap<String, Collection>>> {
        self.collections
            .write()
            .map_err(|_| anyhow!("in-memory store lock poisoned"))
    }
}

#[async_trait]
impl VectorStore for InMemoryStore {
    async fn load_collection(&self, name: &str) -> Result<Option<CollectionInfo>> {
        Ok(self.read()?.get(name).map(|c| CollectionInfo {
            name: name.to_string(),
            embedding_model: c.embedding_model.clone(),
            dims: c.dims,
            count: c.entries.len(),
        }))
    }

    async fn create_collection(&self, name: &str, embedding_model: &str, dims: usize) -> Result<()> {
        let mut collections = self.write()?;
        let collection = collections
            .entry(name.to_string())
            .or_insert_with(|| Collection {
                embedding_model: embedding_model.to_string(),
                dims,
                entries: Vec::new(),
            });
        collection.embedding_model = embedding_model.to_string();
        collection.dims = dims;
        Ok(())
    }

    async fn upsert(&self, collection: &str, entries: &[IndexEntry]) -> Result<()> {
        let mut collections = self.write()?;
        let target = collections
            .get_mut(collection)
            .ok_or_else(|| anyhow!("collection '{}' does not exist", collection))?;

        if let Some(bad) = entries.iter().find(|e| e.vector.len() != target.dims) {
            bail!(
                "vector for chunk {} has {} dims, collection expects {}",
                bad.chunk.id,
                bad.vector.len(),
                target.dims
            );
        }

        for entry in entries {
            match target.entries.iter_mut().find(|e| e.chunk.id == entry.chunk.id) {
                Some(existing) => *existing = entry.clone(),
                None => target.entries.push(entry.clone()),
            }
        }
        Ok(())
    }

    async fn search(&self, collection: &str, query: &[f32], k: usize) -> Result<Vec<ScoredChunk>> {
        let collections = self.read()?;
        let Some(target) = collections.get(collection) else {
            return Ok(Vec::new());
        };
        let scored = target
            .entries
            .iter()
            .map(|e| ScoredChunk {
                chunk: e.chunk.clone(),
                score: cosine_similarity(query, &e.vector),
            })
            .collect();
        Ok(rank(scored, k))
    }

    async fn count(&self, collection: &str) -> Result<usize> {
        Ok(self
            .read()?
            .get(collection)
            .map(|c| c.entries.len())
            .unwrap_or(0))
    }
}
