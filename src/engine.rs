//! The RAG engine: one long-lived index plus the ingest and query operations.
//!
//! A single [`RagEngine`] is built at startup and shared (`Arc`) by every
//! HTTP handler and CLI command.
//!
//! # Concurrency
//!
//! - `ingest` calls are serialised by a writer mutex. The writer reads the
//!   current [`IndexState`], performs the (slow) chunk/embed/upsert work
//!   without holding the state lock, then publishes the new state.
//! - `query` takes a snapshot of the state under a short read lock and
//!   releases it before embedding and generation, so queries never wait on
//!   an in-flight ingest and always see a consistent state.
//! - Blocking capability calls go through the shared [`WorkerPool`].

use anyhow::Result;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tracing::{info, warn};

use crate::answer::AnswerComposer;
use crate::config::Config;
use crate::embedding::{create_embedder, Embedder};
use crate::error::RagError;
use crate::extract::{Extraction, TextExtractor};
use crate::generation::{create_generator, Generator};
use crate::index::{IndexState, Indexer};
use crate::models::{Document, Metadata, QueryResult};
use crate::ocr::{OcrEngine, TesseractOcr};
use crate::pool::WorkerPool;
use crate::retrieve::Retriever;
use crate::store::sqlite::SqliteStore;
use crate::store::VectorStore;

/// Capabilities the engine is assembled from.
pub struct Components {
    pub store: Arc<dyn VectorStore>,
    pub embedder: Arc<dyn Embedder>,
    pub generator: Arc<dyn Generator>,
    pub ocr: Arc<dyn OcrEngine>,
}

/// Summary of one successful ingest.
#[derive(Debug, Clone, PartialEq)]
pub struct IngestSummary {
    pub document_id: String,
    pub chunks: usize,
}

pub struct RagEngine {
    extractor: Arc<TextExtractor>,
    indexer: Indexer,
    retriever: Retriever,
    composer: AnswerComposer,
    state: RwLock<IndexState>,
    writer: Mutex<()>,
    top_k: usize,
    pool: WorkerPool,
}

impl RagEngine {
    /// Open the persistent store and build the configured providers.
    pub async fn open(config: &Config) -> Result<Self> {
        let store = SqliteStore::open(&config.store).await?;
        let ocr = TesseractOcr::new(&config.ocr);
        if !ocr.is_available() {
            warn!(command = %config.ocr.command, "OCR engine not found, image uploads will fail to extract");
        }
        let components = Components {
            store: Arc::new(store),
            embedder: create_embedder(&config.embedding)?,
            generator: create_generator(&config.generation)?,
            ocr: Arc::new(ocr),
        };
        Self::with_components(config, components).await
    }

    /// Assemble an engine from explicit capabilities and load the index.
    pub async fn with_components(config: &Config, components: Components) -> Result<Self> {
        let pool = WorkerPool::new(config.workers.blocking_slots);
        let extractor = Arc::new(TextExtractor::new(components.ocr, config.ocr.min_confidence));
        let indexer = Indexer::new(
            Arc::clone(&components.store),
            Arc::clone(&components.embedder),
            pool.clone(),
            config.store.collection.clone(),
            config.chunking.clone(),
            config.embedding.batch_size,
        );
        let retriever = Retriever::new(
            components.store,
            components.embedder,
            pool.clone(),
            config.retrieval.similarity_floor,
        );
        let composer = AnswerComposer::new(
            components.generator,
            Duration::from_secs(config.generation.timeout_secs),
            pool.clone(),
        );

        let state = indexer.open().await?;
        info!(
            collection = %indexer.collection(),
            populated = !state.is_empty(),
            slots = pool.slots(),
            "engine ready"
        );

        Ok(Self {
            extractor,
            indexer,
            retriever,
            composer,
            state: RwLock::new(state),
            writer: Mutex::new(()),
            top_k: config.retrieval.top_k,
            pool,
        })
    }

    pub async fn state(&self) -> IndexState {
        self.state.read().await.clone()
    }

    /// Extract text from a stored file on the worker pool.
    ///
    /// Only an unsupported extension is an error; parser and OCR failures
    /// come back as [`Extraction::Failure`].
    pub async fn extract(&self, path: &Path) -> Result<Extraction, RagError> {
        let extractor = Arc::clone(&self.extractor);
        let path = path.to_path_buf();
        match self.pool.run_blocking(move || extractor.extract(&path)).await {
            Ok(extraction) => extraction,
            Err(e) => Ok(Extraction::Failure {
                reason: format!("{:#}", e),
                partial: String::new(),
            }),
        }
    }

    /// Index extracted text. `metadata` must carry a `filename`.
    pub async fn ingest(&self, text: &str, metadata: Metadata) -> Result<IngestSummary, RagError> {
        let document = Document::new(text, metadata)?;
        if document.text.trim().is_empty() {
            return Err(RagError::EmptyContent {
                filename: document.filename().to_string(),
                reason: None,
            });
        }

        let _writer = self.writer.lock().await;
        let current = self.state.read().await.clone();
        let (next, chunks) = self.indexer.add_document(&current, &document).await?;
        *self.state.write().await = next;

        info!(
            filename = %document.filename(),
            document = %document.id,
            chunks,
            "ingested document"
        );
        Ok(IngestSummary {
            document_id: document.id,
            chunks,
        })
    }

    /// Answer a question from the indexed documents.
    pub async fn query(&self, question: &str) -> Result<QueryResult, RagError> {
        let snapshot = self.state.read().await.clone();
        if snapshot.is_empty() {
            return Ok(QueryResult::no_documents());
        }

        let retrieved = self.retriever.retrieve(&snapshot, question, self.top_k).await?;
        let result = self.composer.compose(question, retrieved).await?;
        info!(sources = result.sources.len(), "answered query");
        Ok(result)
    }
}
