//! Build or extend the policy index used by the quote chat.
//!
//! ```text
//! ingest-policy --input policies/family_floater.pdf --tag Q1 --out data/policy_index.json
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use claims_intelligence::{
    config::{DEFAULT_OCR_MODEL, DEFAULT_POLICY_INDEX_PATH},
    extract::DocumentExtractor,
    retrieval::{FastEmbedder, PolicyIndex, SourceDocument},
};
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "ingest-policy", about = "Chunk, embed and index a policy document")]
struct Args {
    /// Policy document (PDF or plain text)
    #[arg(long)]
    input: PathBuf,

    /// Tag the chunks are stored under; quote chat queries match it exactly
    #[arg(long)]
    tag: String,

    /// Human-readable policy name kept in chunk metadata
    #[arg(long)]
    policy_name: Option<String>,

    /// Source id for the document, defaults to the file name
    #[arg(long)]
    source_id: Option<String>,

    /// Index file to extend (created when missing)
    #[arg(long, default_value = DEFAULT_POLICY_INDEX_PATH)]
    out: PathBuf,

    /// Vision model used to transcribe PDFs
    #[arg(long, env = "OCR_MODEL", default_value = DEFAULT_OCR_MODEL)]
    ocr_model: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "claims_intelligence=info,ingest_policy=info".into()),
        )
        .init();

    let args = Args::parse();
    let api_key = std::env::var("OPENROUTER_API_KEY").unwrap_or_default();

    let extractor = DocumentExtractor::new(api_key, args.ocr_model, Duration::from_secs(120));
    let text = extractor
        .extract(&args.input)
        .await
        .with_context(|| format!("reading {}", args.input.display()))?;

    let source_id = args.source_id.unwrap_or_else(|| {
        args.input
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| args.input.display().to_string())
    });
    let mut document = SourceDocument::new(source_id, text);
    if let Some(name) = args.policy_name {
        document = document.with_metadata("policy_name", name);
    }

    let mut index = if args.out.exists() {
        PolicyIndex::load(&args.out).with_context(|| format!("loading {}", args.out.display()))?
    } else {
        PolicyIndex::new()
    };

    let embedder = FastEmbedder::load().await?;
    let added = index.ingest(&embedder, &document, &args.tag).await?;
    index.save(&args.out)?;

    info!(
        tag = %args.tag,
        added,
        tag_total = index.tag_count(&args.tag),
        total = index.len(),
        out = %args.out.display(),
        "Policy ingested"
    );
    Ok(())
}
