use async_trait::async_trait;
use claims_flow::{Context, NextAction, Result, Task, TaskResult};
use std::sync::Arc;
use tracing::info;

use super::{require, session_id, session_keys};
use crate::governance::{self, GovernanceReport};
use crate::llm::LlmClient;
use crate::models::ClaimExplanation;

/// Runs the support and appeal checks on the generated explanation.
pub struct GovernanceCheckTask {
    llm: Arc<dyn LlmClient>,
}

impl GovernanceCheckTask {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self { llm }
    }
}

/// Edge condition: route through the review gate.
pub fn review_suggested(context: &Context) -> bool {
    context
        .get_sync::<GovernanceReport>(session_keys::GOVERNANCE)
        .map(|report| report.review_suggested)
        .unwrap_or(true)
}

#[async_trait]
impl Task for GovernanceCheckTask {
    async fn run(&self, context: Context) -> Result<TaskResult> {
        let report: String = require(&context, session_keys::CLAIM_REPORT).await?;
        let explanation: ClaimExplanation = require(&context, session_keys::CLAIM_EXPLANATION).await?;

        let governance = governance::review(self.llm.as_ref(), &report, &explanation.explanation).await;
        let session_id = session_id(&context).await;
        info!(
            session_id = %session_id,
            task_id = %self.id(),
            review_suggested = governance.review_suggested,
            "Governance report stored"
        );
        context.set(session_keys::GOVERNANCE, governance).await;

        Ok(TaskResult::new(None, NextAction::ContinueAndExecute))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decision::DecisionLabel;
    use crate::llm::testing::ScriptedLlm;

    async fn context() -> Context {
        let context = Context::new();
        context.set(session_keys::CLAIM_REPORT, "Claim approved in full.").await;
        context
            .set(
                session_keys::CLAIM_EXPLANATION,
                ClaimExplanation {
                    decision: DecisionLabel::Approved,
                    explanation: "Your claim was approved.".to_string(),
                },
            )
            .await;
        context
    }

    #[tokio::test]
    async fn confident_supported_explanations_skip_review() {
        let context = context().await;
        let llm = Arc::new(ScriptedLlm::new(["YES", "0.9"]));

        GovernanceCheckTask::new(llm).run(context.clone()).await.unwrap();

        assert!(!review_suggested(&context));
        let report: GovernanceReport = context.get(session_keys::GOVERNANCE).await.unwrap();
        assert!(report.supported);
        assert_eq!(report.appeal_score, 0.9);
    }

    #[tokio::test]
    async fn service_failures_degrade_instead_of_failing() {
        let context = context().await;
        let llm = Arc::new(ScriptedLlm::default());

        let result = GovernanceCheckTask::new(llm).run(context.clone()).await;

        assert!(result.is_ok());
        assert!(review_suggested(&context));
        let report: GovernanceReport = context.get(session_keys::GOVERNANCE).await.unwrap();
        assert!(report.degraded);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn runs_on_a_spawned_worker() {
        let context = context().await;
        context.set(session_keys::SESSION_ID, "s-42").await;
        let task = GovernanceCheckTask::new(Arc::new(ScriptedLlm::new(["YES", "0.7"])));

        let handle = tokio::spawn({
            let context = context.clone();
            async move { task.run(context).await }
        });
        handle.await.unwrap().unwrap();

        assert!(context.contains_key(session_keys::GOVERNANCE));
    }

    #[test]
    fn missing_report_routes_to_review() {
        assert!(review_suggested(&Context::new()));
    }
}
