use async_trait::async_trait;
use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::info;

use crate::error::{ClaimsError, Result};

/// Turns texts into fixed-size vectors. Similar texts land close together.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>>;
}

/// Local sentence embeddings (all-MiniLM-L6-v2) via fastembed.
///
/// The model is loaded once and shared; inference runs on the blocking pool.
#[derive(Clone)]
pub struct FastEmbedder {
    model: Arc<Mutex<TextEmbedding>>,
}

impl FastEmbedder {
    pub async fn load() -> Result<Self> {
        let model = tokio::task::spawn_blocking(|| {
            TextEmbedding::try_new(
                InitOptions::new(EmbeddingModel::AllMiniLML6V2).with_show_download_progress(true),
            )
        })
        .await
        .map_err(|e| ClaimsError::service(format!("embedding model loader panicked: {e}")))?
        .map_err(|e| ClaimsError::service(format!("failed to load embedding model: {e}")))?;

        info!("Embedding model loaded");
        Ok(Self {
            model: Arc::new(Mutex::new(model)),
        })
    }
}

#[async_trait]
impl Embedder for FastEmbedder {
    async fn embed(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let model = Arc::clone(&self.model);
        let count = texts.len();

        let embeddings = tokio::task::spawn_blocking(move || {
            let mut model = model.lock().unwrap_or_else(PoisonError::into_inner);
            model.embed(texts, None)
        })
        .await
        .map_err(|e| ClaimsError::service(format!("embedding task panicked: {e}")))?
        .map_err(|e| ClaimsError::service(format!("embedding failed: {e}")))?;

        info!(
            texts = count,
            dimensions = embeddings.first().map(Vec::len).unwrap_or_default(),
            "Texts embedded"
        );
        Ok(embeddings)
    }
}
