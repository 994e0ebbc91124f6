use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fs;
use std::path::Path;
use tracing::{debug, info};

use super::{DocumentChunk, Embedder, SOURCE_KEY, SourceDocument, TAG_KEY, TextSplitter};
use crate::error::{ClaimsError, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
struct IndexedChunk {
    chunk: DocumentChunk,
    embedding: Vec<f32>,
}

/// A chunk returned by a query together with its similarity to the query.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredChunk {
    pub chunk: DocumentChunk,
    pub score: f32,
}

/// Embedded policy chunks, searched by brute-force cosine similarity.
///
/// Built offline by `ingest-policy`, saved as JSON and loaded read-only by
/// the service.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PolicyIndex {
    entries: Vec<IndexedChunk>,
}

impl PolicyIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of chunks stored under `tag`.
    pub fn tag_count(&self, tag: &str) -> usize {
        self.entries
            .iter()
            .filter(|e| e.chunk.tag() == Some(tag))
            .count()
    }

    /// Split, embed and store a document under `tag`. Returns the number of chunks added.
    ///
    /// Chunks previously stored for the same source id and tag are replaced, so
    /// ingesting a document again does not duplicate its clauses.
    pub async fn ingest(
        &mut self,
        embedder: &dyn Embedder,
        document: &SourceDocument,
        tag: &str,
    ) -> Result<usize> {
        let pieces = TextSplitter::default().split(&document.text);
        if pieces.is_empty() {
            return Err(ClaimsError::input(format!(
                "document {} contains no text",
                document.source_id
            )));
        }

        let embeddings = embedder.embed(pieces.clone()).await?;
        if embeddings.len() != pieces.len() {
            return Err(ClaimsError::service(format!(
                "embedder returned {} vectors for {} chunks",
                embeddings.len(),
                pieces.len()
            )));
        }

        let mut metadata = document.metadata.clone();
        metadata.insert(SOURCE_KEY.to_string(), document.source_id.clone());
        metadata.insert(TAG_KEY.to_string(), tag.to_string());

        let before = self.entries.len();
        self.entries.retain(|e| {
            !(e.chunk.source_id == document.source_id && e.chunk.tag() == Some(tag))
        });
        let replaced = before - self.entries.len();

        let added = pieces.len();
        self.entries
            .extend(pieces.into_iter().zip(embeddings).map(|(text, embedding)| IndexedChunk {
                chunk: DocumentChunk {
                    text,
                    source_id: document.source_id.clone(),
                    metadata: metadata.clone(),
                },
                embedding,
            }));

        info!(
            source_id = %document.source_id,
            tag = %tag,
            chunks = added,
            replaced,
            total = self.entries.len(),
            "Document ingested"
        );
        Ok(added)
    }

    /// The `k` chunks tagged exactly `tag` most similar to `text`, best first.
    pub async fn query(
        &self,
        embedder: &dyn Embedder,
        text: &str,
        tag: &str,
        k: usize,
    ) -> Result<Vec<ScoredChunk>> {
        let candidates: Vec<&IndexedChunk> = self
            .entries
            .iter()
            .filter(|e| e.chunk.tag() == Some(tag))
            .collect();
        if candidates.is_empty() || k == 0 {
            debug!(tag = %tag, "No chunks for tag, skipping query embedding");
            return Ok(Vec::new());
        }

        let query = embedder
            .embed(vec![text.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| ClaimsError::service("embedder returned no query vector"))?;

        let mut scored: Vec<ScoredChunk> = candidates
            .into_iter()
            .map(|e| ScoredChunk {
                chunk: e.chunk.clone(),
                score: cosine(&query, &e.embedding),
            })
            .collect();
        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
        scored.truncate(k);

        debug!(tag = %tag, returned = scored.len(), "Policy clauses retrieved");
        Ok(scored)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_vec(self)?)?;
        info!(path = %path.display(), chunks = self.len(), "Policy index saved");
        Ok(())
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let index: Self = serde_json::from_slice(&fs::read(path)?)?;
        info!(path = %path.display(), chunks = index.len(), "Policy index loaded");
        Ok(index)
    }
}

fn cosine(a: &[f32], b: &[f32]) -> f32 {
    let mut dot = 0.0f32;
    let mut na2 = 0.0f32;
    let mut nb2 = 0.0f32;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        na2 += x * x;
        nb2 += y * y;
    }
    if na2 == 0.0 || nb2 == 0.0 {
        0.0
    } else {
        dot / (na2.sqrt() * nb2.sqrt())
    }
}
