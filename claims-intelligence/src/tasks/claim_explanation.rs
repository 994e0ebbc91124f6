use async_trait::async_trait;
use claims_flow::{Context, NextAction, Result, Task, TaskResult};
use std::sync::Arc;
use tracing::info;

use super::{require, session_id, session_keys};
use crate::decision::detect_decision;
use crate::llm::{CompletionRequest, LlmClient, temperature};
use crate::models::{ClaimExplanation, ClaimSubmission};
use crate::prompts::explanation_prompt;

/// Detects the stated decision and asks the model for a plain-language explanation.
pub struct ClaimExplanationTask {
    llm: Arc<dyn LlmClient>,
}

impl ClaimExplanationTask {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl Task for ClaimExplanationTask {
    async fn run(&self, context: Context) -> Result<TaskResult> {
        let session_id = session_id(&context).await;
        let submission: ClaimSubmission = require(&context, session_keys::CLAIM_SUBMISSION).await?;
        let report: String = require(&context, session_keys::CLAIM_REPORT).await?;

        let decision = detect_decision(&report);
        info!(
            session_id = %session_id,
            task_id = %self.id(),
            decision = %decision,
            "Decision detected in claim report"
        );

        let prompt = explanation_prompt(submission.claim_type, decision, &report, submission.language);
        let explanation = self
            .llm
            .complete(CompletionRequest::new(prompt).with_temperature(temperature::EXPLANATION))
            .await?;

        context
            .set(
                session_keys::CLAIM_EXPLANATION,
                ClaimExplanation {
                    decision,
                    explanation,
                },
            )
            .await;

        Ok(TaskResult::new_with_status(
            None,
            NextAction::ContinueAndExecute,
            Some(format!("Explanation generated for {decision} claim")),
        ))
    }
}
