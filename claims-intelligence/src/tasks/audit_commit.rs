use async_trait::async_trait;
use chrono::Utc;
use claims_flow::{Context, NextAction, Result, Task, TaskResult};
use std::sync::Arc;
use tracing::{error, info, warn};

use super::{require, session_id, session_keys};
use crate::audit::{AuditLogger, AuditRecord};
use crate::governance::GovernanceReport;
use crate::models::{ClaimExplanation, ClaimSubmission};

/// Writes the session's audit row. A session that already has one is left alone.
///
/// A failed write never fails the workflow: the explanation is already in the
/// context, so the error is stored under `audit_error` and the run ends.
pub struct AuditCommitTask {
    logger: Arc<AuditLogger>,
}

impl AuditCommitTask {
    pub fn new(logger: Arc<AuditLogger>) -> Self {
        Self { logger }
    }
}

#[async_trait]
impl Task for AuditCommitTask {
    async fn run(&self, context: Context) -> Result<TaskResult> {
        let session_id = session_id(&context).await;

        if context.contains_key(session_keys::AUDIT_RECORD) {
            warn!(session_id = %session_id, "Audit record already written for session");
            return Ok(TaskResult::new(None, NextAction::End));
        }

        let submission: ClaimSubmission = require(&context, session_keys::CLAIM_SUBMISSION).await?;
        let explanation: ClaimExplanation = require(&context, session_keys::CLAIM_EXPLANATION).await?;
        let governance: GovernanceReport = require(&context, session_keys::GOVERNANCE).await?;
        let human_review = context
            .get::<bool>(session_keys::REVIEW_DECISION)
            .await
            .unwrap_or(false);

        let record = AuditRecord {
            timestamp: Utc::now(),
            claim_type: submission.claim_type,
            decision: explanation.decision,
            appeal_score: governance.appeal_score,
            human_review,
        };
        if let Err(e) = self.logger.record(&record) {
            error!(
                session_id = %session_id,
                task_id = %self.id(),
                error = %e,
                "Audit record could not be written"
            );
            context.set(session_keys::AUDIT_ERROR, e.to_string()).await;
            return Ok(TaskResult::new_with_status(
                None,
                NextAction::End,
                Some("Audit record not written".to_string()),
            ));
        }

        info!(
            session_id = %session_id,
            task_id = %self.id(),
            decision = %record.decision,
            human_review,
            "Audit record committed"
        );
        context.remove(session_keys::AUDIT_ERROR).await;
        context.set(session_keys::AUDIT_RECORD, record).await;

        Ok(TaskResult::new_with_status(
            None,
            NextAction::End,
            Some("Audit record written".to_string()),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decision::DecisionLabel;
    use crate::models::ClaimType;
    use crate::tasks::fixtures;
    use tempfile::TempDir;

    async fn context(review: Option<bool>) -> Context {
        let context = Context::new();
        context
            .set(
                session_keys::CLAIM_SUBMISSION,
                ClaimSubmission {
                    claim_type: ClaimType::Motor,
                    language: Default::default(),
                    report_text: Some("Claim partially approved.".to_string()),
                    document_path: None,
                },
            )
            .await;
        context
            .set(
                session_keys::CLAIM_EXPLANATION,
                ClaimExplanation {
                    decision: DecisionLabel::PartiallyApproved,
                    explanation: "Part of the claim was paid.".to_string(),
                },
            )
            .await;
        context
            .set(
                session_keys::GOVERNANCE,
                GovernanceReport {
                    supported: true,
                    appeal_score: 0.4,
                    review_suggested: true,
                    degraded: false,
                },
            )
            .await;
        if let Some(flagged) = review {
            context.set(session_keys::REVIEW_DECISION, flagged).await;
        }
        context
    }

    #[tokio::test]
    async fn writes_exactly_once_per_session() {
        let dir = TempDir::new().unwrap();
        let logger = Arc::new(fixtures::audit_logger(&dir));
        let task = AuditCommitTask::new(logger.clone());
        let context = context(Some(true)).await;

        task.run(context.clone()).await.unwrap();
        task.run(context.clone()).await.unwrap();

        let records = logger.read().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].claim_type, ClaimType::Motor);
        assert_eq!(records[0].decision, DecisionLabel::PartiallyApproved);
        assert_eq!(records[0].appeal_score, 0.4);
        assert!(records[0].human_review);
    }

    #[tokio::test]
    async fn unreviewed_sessions_are_not_flagged() {
        let dir = TempDir::new().unwrap();
        let logger = Arc::new(fixtures::audit_logger(&dir));
        let context = context(None).await;

        AuditCommitTask::new(logger.clone()).run(context.clone()).await.unwrap();

        let stored: AuditRecord = context.get(session_keys::AUDIT_RECORD).await.unwrap();
        assert!(!stored.human_review);
        assert_eq!(logger.read().unwrap(), vec![stored]);
    }

    #[tokio::test]
    async fn write_failures_are_stored_instead_of_raised() {
        let dir = TempDir::new().unwrap();
        // a directory cannot be opened for appending
        let logger = Arc::new(AuditLogger::new(dir.path()));
        let context = context(None).await;

        let result = AuditCommitTask::new(logger).run(context.clone()).await.unwrap();

        assert!(matches!(result.next_action, NextAction::End));
        assert!(!context.contains_key(session_keys::AUDIT_RECORD));
        let audit_error: String = context.get(session_keys::AUDIT_ERROR).await.unwrap();
        assert!(!audit_error.is_empty());
    }
}
