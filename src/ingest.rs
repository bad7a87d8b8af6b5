//! Upload ingestion pipeline.
//!
//! `check format → stage → extract → reject empty → index → commit`. The
//! format check runs before anything touches disk. The upload is extracted
//! and indexed from a hidden staging file and only moved over the final
//! path once indexing succeeded. Any failure removes the staging file
//! alone, so an earlier upload under the same name survives a bad retry.

use anyhow::{Context, Result};
use serde::Serialize;
use std::path::Path;
use tracing::{info, warn};

use crate::engine::RagEngine;
use crate::error::RagError;
use crate::extract::{Extraction, Format};
use crate::models::upload_metadata;
use crate::uploads::UploadStore;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IngestAck {
    pub message: String,
    pub filename: String,
    pub chunks: usize,
}

pub async fn ingest_upload(
    engine: &RagEngine,
    uploads: &UploadStore,
    filename: &str,
    bytes: &[u8],
) -> Result<IngestAck, RagError> {
    let name = UploadStore::sanitize(filename)?;
    Format::from_path(Path::new(&name))?;

    let staged = uploads.stage(&name, bytes).await?;
    let indexed = match index_staged(engine, &name, &staged, &uploads.path_for(&name)).await {
        Ok(chunks) => uploads.commit(&staged, &name).await.map(|_| chunks),
        Err(e) => Err(e),
    };

    match indexed {
        Ok(chunks) => {
            info!(filename = %name, chunks, "upload indexed");
            Ok(IngestAck {
                message: format!("File '{}' uploaded and indexed successfully.", name),
                filename: name,
                chunks,
            })
        }
        Err(e) => {
            warn!(filename = %name, "ingest failed, discarding upload: {}", e);
            uploads.remove(&staged).await;
            Err(e)
        }
    }
}

/// Extract from the staged file; record the final path in the metadata.
async fn index_staged(
    engine: &RagEngine,
    name: &str,
    staged: &Path,
    final_path: &Path,
) -> Result<usize, RagError> {
    let extraction = engine.extract(staged).await?;
    if extraction.is_blank() {
        return Err(RagError::EmptyContent {
            filename: name.to_string(),
            reason: extraction.failure_reason().map(str::to_string),
        });
    }
    if let Extraction::Failure { reason, partial } = &extraction {
        warn!(
            filename = %name,
            partial_chars = partial.len(),
            "indexing partial text after extraction failure: {}",
            reason
        );
    }

    let summary = engine
        .ingest(&extraction.into_text(), upload_metadata(name, final_path))
        .await?;
    Ok(summary.chunks)
}

/// Ingest a local file as if it had been uploaded. Used by the CLI.
pub async fn ingest_path(engine: &RagEngine, uploads: &UploadStore, path: &Path) -> Result<IngestAck> {
    let filename = path
        .file_name()
        .and_then(|n| n.to_str())
        .with_context(|| format!("not a file path: {}", path.display()))?;
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    Ok(ingest_upload(engine, uploads, filename, &bytes).await?)
}
