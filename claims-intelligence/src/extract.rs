use base64::{Engine as _, engine::general_purpose::STANDARD};
use image::{DynamicImage, ImageFormat};
use pdf2image::{PDF, Pages};
use reqwest::Client;
use serde_json::{Value, json};
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

use crate::error::{ClaimsError, Result};

const OPENROUTER_CHAT_URL: &str = "https://openrouter.ai/api/v1/chat/completions";
const OCR_MAX_TOKENS: u32 = 4000;

/// Reads claim reports and policy documents into plain text.
///
/// PDFs are rendered to page images and transcribed by a vision model; any
/// other file is read as UTF-8.
#[derive(Clone)]
pub struct DocumentExtractor {
    http: Client,
    api_key: String,
    model: String,
    timeout: Duration,
}

impl DocumentExtractor {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>, timeout: Duration) -> Self {
        Self {
            http: Client::new(),
            api_key: api_key.into(),
            model: model.into(),
            timeout,
        }
    }

    pub async fn extract(&self, path: impl AsRef<Path>) -> Result<String> {
        let path = path.as_ref();
        if !tokio::fs::try_exists(path).await? {
            return Err(ClaimsError::input(format!(
                "document not found: {}",
                path.display()
            )));
        }

        let text = if is_pdf(path) {
            let pages = render_pages(path.to_path_buf()).await?;
            self.transcribe(&pages).await?
        } else {
            let bytes = tokio::fs::read(path).await?;
            String::from_utf8(bytes).map_err(|_| {
                ClaimsError::input(format!("{} is not UTF-8 text", path.display()))
            })?
        };

        if text.trim().is_empty() {
            warn!(path = %path.display(), "No text extracted from document");
            return Err(ClaimsError::input(format!(
                "no text could be extracted from {}",
                path.display()
            )));
        }

        info!(path = %path.display(), characters = text.len(), "Document text extracted");
        Ok(text)
    }

    /// Send every page in one vision request and return the transcription.
    async fn transcribe(&self, pages: &[DynamicImage]) -> Result<String> {
        let mut content = vec![json!({
            "type": "text",
            "text": format!(
                "You are a document OCR system. I'm providing you with {} pages of an insurance document. \
                Extract ALL text from these pages exactly, preserving structure, amounts, dates and clause numbers.\n\n\
                Start each page with '=== Page X ===' and return ONLY the extracted text.",
                pages.len()
            )
        })];
        for page in pages {
            content.push(json!({
                "type": "image_url",
                "image_url": { "url": format!("data:image/png;base64,{}", image_to_base64(page)?) }
            }));
        }

        let payload = json!({
            "model": self.model,
            "messages": [{ "role": "user", "content": content }],
            "max_tokens": OCR_MAX_TOKENS,
        });

        let response = self
            .http
            .post(OPENROUTER_CHAT_URL)
            .bearer_auth(&self.api_key)
            .timeout(self.timeout)
            .json(&payload)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ClaimsError::timeout(self.timeout)
                } else {
                    ClaimsError::service(format!("OCR request failed: {e}"))
                }
            })?;

        if !response.status().is_success() {
            return Err(ClaimsError::service(format!(
                "OCR request rejected: {}",
                response.status()
            )));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| ClaimsError::service(format!("OCR response unreadable: {e}")))?;
        let text = body["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| ClaimsError::Parse("OCR response has no message content".to_string()))?;

        info!(pages = pages.len(), characters = text.len(), "Vision OCR completed");
        Ok(text.to_string())
    }
}

/// Resolve a client-supplied document path against the upload directory.
///
/// Relative paths are taken from `upload_dir`. The result is canonicalized, so
/// `..` segments and symlinks are followed before the containment check.
pub async fn resolve_upload(upload_dir: &Path, requested: &str) -> Result<PathBuf> {
    let root = tokio::fs::canonicalize(upload_dir).await.map_err(|e| {
        warn!(upload_dir = %upload_dir.display(), error = %e, "Upload directory unavailable");
        ClaimsError::input("document uploads are not available")
    })?;

    let requested_path = Path::new(requested);
    let candidate = if requested_path.is_absolute() {
        requested_path.to_path_buf()
    } else {
        root.join(requested_path)
    };
    let resolved = tokio::fs::canonicalize(&candidate)
        .await
        .map_err(|_| ClaimsError::input(format!("document not found: {requested}")))?;

    if !resolved.starts_with(&root) {
        warn!(requested = %requested, "Rejected document path outside the upload directory");
        return Err(ClaimsError::input(
            "document_path must point inside the upload directory",
        ));
    }
    Ok(resolved)
}

fn is_pdf(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("pdf"))
}

async fn render_pages(path: PathBuf) -> Result<Vec<DynamicImage>> {
    let pages = tokio::task::spawn_blocking(move || {
        let pdf = PDF::from_file(&path)
            .map_err(|e| ClaimsError::input(format!("failed to load PDF: {e}")))?;
        pdf.render(Pages::All, None)
            .map_err(|e| ClaimsError::service(format!("failed to render PDF pages: {e}")))
    })
    .await
    .map_err(|e| ClaimsError::service(format!("PDF renderer panicked: {e}")))??;

    if pages.is_empty() {
        return Err(ClaimsError::input("PDF has no pages"));
    }
    info!(pages = pages.len(), "PDF rendered to images");
    Ok(pages)
}

fn image_to_base64(image: &DynamicImage) -> Result<String> {
    let mut buffer = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut buffer), ImageFormat::Png)
        .map_err(|e| ClaimsError::service(format!("failed to encode page image: {e}")))?;
    Ok(STANDARD.encode(&buffer))
}
