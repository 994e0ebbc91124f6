use async_trait::async_trait;
use claims_flow::{Context, NextAction, Result, Task, TaskResult};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use super::{require, session_id, session_keys};
use crate::error::ClaimsError;
use crate::extract::{DocumentExtractor, resolve_upload};
use crate::models::ClaimSubmission;

/// Resolves the claim report text: pasted text first, then the uploaded document.
///
/// Documents are only read from inside `upload_dir`.
pub struct ReportIntakeTask {
    extractor: Arc<DocumentExtractor>,
    upload_dir: PathBuf,
}

impl ReportIntakeTask {
    pub fn new(extractor: Arc<DocumentExtractor>, upload_dir: impl Into<PathBuf>) -> Self {
        Self {
            extractor,
            upload_dir: upload_dir.into(),
        }
    }
}

#[async_trait]
impl Task for ReportIntakeTask {
    async fn run(&self, context: Context) -> Result<TaskResult> {
        let session_id = session_id(&context).await;
        let submission: ClaimSubmission = require(&context, session_keys::CLAIM_SUBMISSION).await?;

        let pasted = submission
            .report_text
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty());

        let report = match (pasted, submission.document_path.as_deref()) {
            (Some(text), _) => text.to_string(),
            (None, Some(path)) if !path.trim().is_empty() => {
                let path = resolve_upload(&self.upload_dir, path).await?;
                info!(session_id = %session_id, path = %path.display(), "Extracting claim report");
                self.extractor.extract(&path).await?
            }
            _ => return Err(ClaimsError::input("Claim report is required").into()),
        };

        info!(
            session_id = %session_id,
            task_id = %self.id(),
            claim_type = %submission.claim_type,
            report_length = report.len(),
            "Claim report ready"
        );
        context.set(session_keys::CLAIM_REPORT, report).await;

        Ok(TaskResult::new(None, NextAction::ContinueAndExecute))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ClaimType;
    use crate::tasks::fixtures;
    use tempfile::TempDir;

    fn task(upload_dir: &TempDir) -> ReportIntakeTask {
        ReportIntakeTask::new(Arc::new(fixtures::extractor()), upload_dir.path())
    }

    async fn context_with(report_text: Option<&str>, document_path: Option<String>) -> Context {
        let context = Context::new();
        context
            .set(
                session_keys::CLAIM_SUBMISSION,
                ClaimSubmission {
                    claim_type: ClaimType::Health,
                    language: Default::default(),
                    report_text: report_text.map(str::to_string),
                    document_path,
                },
            )
            .await;
        context
    }

    #[tokio::test]
    async fn pasted_text_wins_over_document() {
        let dir = TempDir::new().unwrap();
        let context = context_with(Some("  Claim approved.  "), Some("/does/not/exist.pdf".into())).await;
        task(&dir).run(context.clone()).await.unwrap();
        assert_eq!(
            context.get::<String>(session_keys::CLAIM_REPORT).await.as_deref(),
            Some("Claim approved.")
        );
    }

    #[tokio::test]
    async fn document_is_read_when_no_text_is_pasted() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("report.txt");
        std::fs::write(&path, "Amount not payable under clause 4.").unwrap();

        let context = context_with(Some("   "), Some("report.txt".to_string())).await;
        task(&dir).run(context.clone()).await.unwrap();
        assert_eq!(
            context.get::<String>(session_keys::CLAIM_REPORT).await.as_deref(),
            Some("Amount not payable under clause 4.")
        );
    }

    #[tokio::test]
    async fn no_report_is_an_input_error() {
        let dir = TempDir::new().unwrap();
        let context = context_with(None, None).await;
        let err = task(&dir).run(context).await.unwrap_err();
        assert!(matches!(
            ClaimsError::from_graph_error(&err),
            Some(ClaimsError::Input(_))
        ));
    }

    #[tokio::test]
    async fn documents_outside_the_upload_directory_are_refused() {
        let uploads = TempDir::new().unwrap();
        let elsewhere = TempDir::new().unwrap();
        let secret = elsewhere.path().join(".env");
        std::fs::write(&secret, "OPENROUTER_API_KEY=sk-secret").unwrap();

        let context = context_with(None, Some(secret.display().to_string())).await;
        let err = task(&uploads).run(context.clone()).await.unwrap_err();

        assert!(matches!(
            ClaimsError::from_graph_error(&err),
            Some(ClaimsError::Input(_))
        ));
        assert!(!context.contains_key(session_keys::CLAIM_REPORT));
    }
}
