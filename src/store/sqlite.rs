//! SQLite-backed [`VectorStore`].
//!
//! Embeddings are stored as little-endian `f32` BLOBs and scanned
//! brute-force at query time. `entries.seq` is an autoincrement column, so
//! scanning in `seq` order before the stable sort gives insertion-order
//! tie-breaks.

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{Row, SqlitePool};

use crate::config::StoreConfig;
use crate::db;
use crate::embedding::{blob_to_vec, cosine_similarity, vec_to_blob};
use crate::migrate;
use crate::models::{Chunk, Metadata, ScoredChunk};

use super::{rank, CollectionInfo, IndexEntry, VectorStore};

pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (creating if needed) the store under `store.path` and migrate it.
    pub async fn open(store: &StoreConfig) -> Result<Self> {
        let pool = db::connect(store).await?;
        migrate::run_migrations(&pool).await?;
        Ok(Self { pool })
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl VectorStore for SqliteStore {
    async fn load_collection(&self, name: &str) -> Result<Option<CollectionInfo>> {
        let row = sqlx::query(
            r#"
            SELECT c.name, c.embedding_model, c.dims,
                   (SELECT COUNT(*) FROM entries e WHERE e.collection = c.name) AS count
            FROM collections c
            WHERE c.name = ?
            "#,
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|row| CollectionInfo {
            name: row.get("name"),
            embedding_model: row.get("embedding_model"),
            dims: row.get::<i64, _>("dims") as usize,
            count: row.get::<i64, _>("count") as usize,
        }))
    }

    async fn create_collection(&self, name: &str, embedding_model: &str, dims: usize) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO collections (name, embedding_model, dims, created_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(name) DO UPDATE SET
                embedding_model = excluded.embedding_model,
                dims = excluded.dims
            "#,
        )
        .bind(name)
        .bind(embedding_model)
        .bind(dims as i64)
        .bind(chrono::Utc::now().timestamp())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn upsert(&self, collection: &str, entries: &[IndexEntry]) -> Result<()> {
        let now = chrono::Utc::now().timestamp();
        let mut tx = self.pool.begin().await?;

        for entry in entries {
            let chunk = &entry.chunk;
            let metadata_json = serde_json::to_string(&chunk.metadata)?;
            sqlx::query(
                r#"
                INSERT INTO entries
                    (collection, id, document_id, chunk_index, text, hash, metadata_json, embedding, updated_at)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
                ON CONFLICT(collection, id) DO UPDATE SET
                    document_id = excluded.document_id,
                    chunk_index = excluded.chunk_index,
                    text = excluded.text,
                    hash = excluded.hash,
                    metadata_json = excluded.metadata_json,
                    embedding = excluded.embedding,
                    updated_at = excluded.updated_at
                "#,
            )
            .bind(collection)
            .bind(&chunk.id)
            .bind(&chunk.document_id)
            .bind(chunk.chunk_index)
            .bind(&chunk.text)
            .bind(&chunk.hash)
            .bind(&metadata_json)
            .bind(vec_to_blob(&entry.vector))
            .bind(now)
            .execute(&mut *tx)
            .await
            .with_context(|| format!("failed to write chunk {}", chunk.id))?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn search(&self, collection: &str, query: &[f32], k: usize) -> Result<Vec<ScoredChunk>> {
        let rows = sqlx::query(
            r#"
            SELECT id, document_id, chunk_index, text, hash, metadata_json, embedding
            FROM entries
            WHERE collection = ?
            ORDER BY seq
            "#,
        )
        .bind(collection)
        .fetch_all(&self.pool)
        .await?;

        let mut scored = Vec::with_capacity(rows.len());
        for row in &rows {
            let blob: Vec<u8> = row.get("embedding");
            let metadata_json: String = row.get("metadata_json");
            let metadata: Metadata = serde_json::from_str(&metadata_json)
                .with_context(|| format!("corrupt metadata for chunk {}", row.get::<String, _>("id")))?;
            scored.push(ScoredChunk {
                score: cosine_similarity(query, &blob_to_vec(&blob)),
                chunk: Chunk {
                    id: row.get("id"),
                    document_id: row.get("document_id"),
                    chunk_index: row.get("chunk_index"),
                    text: row.get("text"),
                    hash: row.get("hash"),
                    metadata,
                },
            });
        }

        Ok(rank(scored, k))
    }

    async fn count(&self, collection: &str) -> Result<usize> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM entries WHERE collection = ?")
            .bind(collection)
            .fetch_one(&self.pool)
            .await?;
        Ok(count as usize)
    }
}
