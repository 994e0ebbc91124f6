//! Retrieval over policy documents: chunking, embedding and tag-filtered
//! nearest-neighbour search.

pub mod chunker;
pub mod embedder;
pub mod index;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub use chunker::TextSplitter;
pub use embedder::{Embedder, FastEmbedder};
pub use index::{PolicyIndex, ScoredChunk};

/// Metadata key holding the tag that queries filter on.
pub const TAG_KEY: &str = "quote_id";

/// Metadata key holding the chunk's source document.
pub const SOURCE_KEY: &str = "source";

/// A bounded slice of a source document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentChunk {
    pub text: String,
    pub source_id: String,
    pub metadata: BTreeMap<String, String>,
}

impl DocumentChunk {
    pub fn tag(&self) -> Option<&str> {
        self.metadata.get(TAG_KEY).map(String::as_str)
    }
}

/// A whole document handed to ingestion.
#[derive(Debug, Clone)]
pub struct SourceDocument {
    pub source_id: String,
    pub text: String,
    pub metadata: BTreeMap<String, String>,
}

impl SourceDocument {
    pub fn new(source_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            source_id: source_id.into(),
            text: text.into(),
            metadata: BTreeMap::new(),
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}
