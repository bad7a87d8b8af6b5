//! # docrag
//!
//! An offline document question-answering service. Upload PDFs, Word
//! documents or scanned images; ask questions; get answers that cite the
//! passages they were drawn from.
//!
//! ## Architecture
//!
//! ```text
//!  upload ──▶ TextExtractor ──▶ Indexer ──▶ SQLite vector store
//!            (pdf/docx/OCR)   (chunk+embed)        │
//!                                                  ▼
//!  question ─────────────────────────────▶ Retriever ──▶ AnswerComposer ──▶ answer + sources
//!                                          (top-k)      (prompt+generate)
//! ```
//!
//! [`engine::RagEngine`] owns the index lifecycle and exposes `ingest` and
//! `query`; the CLI and the HTTP server both drive it.
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing and validation |
//! | [`error`] | Pipeline error taxonomy |
//! | [`models`] | Documents, chunks, sources and query results |
//! | [`extract`] | Format-dispatching text extraction |
//! | [`ocr`] | OCR capability (tesseract) |
//! | [`chunk`] | Overlapping token-window chunking |
//! | [`embedding`] | Embedding capability and providers |
//! | [`generation`] | Text generation capability and providers |
//! | [`store`] | Vector store trait, SQLite and in-memory backends |
//! | [`index`] | Index state and incremental indexing |
//! | [`retrieve`] | Top-k similarity retrieval |
//! | [`answer`] | Citation prompt building and answer packaging |
//! | [`engine`] | The RAG engine |
//! | [`pool`] | Bounded worker pool for blocking calls |
//! | [`uploads`] | Stored upload originals |
//! | [`ingest`] | Upload ingestion pipeline |
//! | [`server`] | HTTP API |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migrations |

pub mod answer;
pub mod chunk;
pub mod config;
pub mod db;
pub mod embedding;
pub mod engine;
pub mod error;
pub mod extract;
pub mod generation;
pub mod index;
pub mod ingest;
pub mod migrate;
pub mod models;
pub mod ocr;
pub mod pool;
pub mod retrieve;
pub mod server;
pub mod store;
pub mod uploads;
