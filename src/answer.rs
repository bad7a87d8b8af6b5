//! Citation-structured prompting and answer packaging.
//!
//! Retrieved chunks are numbered `1..=k` in retrieval order. The same
//! numbers label the context blocks in the prompt and the `id` of each
//! returned [`Source`], so a `[2]` in the answer always refers to
//! `sources[1]`. Citation markers in the generated text are not verified.

use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

use crate::error::RagError;
use crate::generation::Generator;
use crate::models::{filename_of, QueryResult, ScoredChunk, Source};
use crate::pool::WorkerPool;

/// Phrase the model is told to emit when the context cannot answer the question.
pub const INSUFFICIENT_CONTEXT: &str = "I don't have enough information to answer this.";

const UNKNOWN_SOURCE: &str = "Unknown";

pub struct AnswerComposer {
    generator: Arc<dyn Generator>,
    timeout: Duration,
    pool: WorkerPool,
}

impl AnswerComposer {
    pub fn new(generator: Arc<dyn Generator>, timeout: Duration, pool: WorkerPool) -> Self {
        Self {
            generator,
            timeout,
            pool,
        }
    }

    /// Build the prompt, generate, and package the answer with its sources.
    ///
    /// With no retrieved chunks the generator is not called.
    pub async fn compose(
        &self,
        query: &str,
        retrieved: Vec<ScoredChunk>,
    ) -> Result<QueryResult, RagError> {
        if retrieved.is_empty() {
            return Ok(QueryResult::no_documents());
        }

        let prompt = build_prompt(query, &retrieved);
        let generation = self.pool.run(self.generator.generate(&prompt));

        let answer = match tokio::time::timeout(self.timeout, generation).await {
            Err(_) => {
                warn!(
                    model = %self.generator.model_name(),
                    timeout_secs = self.timeout.as_secs(),
                    "generation timed out"
                );
                return Err(RagError::GenerationTimeout(self.timeout.as_secs()));
            }
            Ok(result) => result.and_then(|r| r).map_err(|e| {
                error!(model = %self.generator.model_name(), "generation failed: {:#}", e);
                RagError::Generation(format!("{:#}", e))
            })?,
        };

        info!(sources = retrieved.len(), answer_chars = answer.len(), "composed answer");
        Ok(QueryResult {
            answer,
            sources: number_sources(retrieved),
        })
    }
}

/// Render `[id] Source: <filename>\nContent: <text>\n\n` per chunk.
pub fn build_context(retrieved: &[ScoredChunk]) -> String {
    let mut context = String::new();
    for (i, hit) in retrieved.iter().enumerate() {
        let filename = filename_of(&hit.chunk.metadata).unwrap_or(UNKNOWN_SOURCE);
        context.push_str(&format!(
            "[{}] Source: {}\nContent: {}\n\n",
            i + 1,
            filename,
            hit.chunk.text
        ));
    }
    context
}

pub fn build_prompt(query: &str, retrieved: &[ScoredChunk]) -> String {
    format!(
        "You are an intelligent assistant. Answer the user's question using ONLY the context below.\n\
         Each piece of context is numbered, for example [1] or [2].\n\
         Cite the context you use inline with these numbers, like [1] or [1, 2].\n\
         \n\
         If the context does not contain the answer, say \"{}\"\n\
         \n\
         Context:\n\
         {}\
         Question: {}\n\
         \n\
         Answer:",
        INSUFFICIENT_CONTEXT,
        build_context(retrieved),
        query
    )
}

fn number_sources(retrieved: Vec<ScoredChunk>) -> Vec<Source> {
    retrieved
        .into_iter()
        .enumerate()
        .map(|(i, hit)| Source {
            id: i + 1,
            content: hit.chunk.text,
            metadata: hit.chunk.metadata,
            score: hit.score,
        })
        .collect()
}
