use async_trait::async_trait;
use claims_flow::{Context, NextAction, Result, Task, TaskResult};
use std::sync::Arc;
use tracing::info;

use super::{require, session_id, session_keys};
use crate::error::ClaimsError;
use crate::llm::{CompletionRequest, LlmClient, temperature};
use crate::memory::{record_exchange, transcript};
use crate::prompts::domain_question_prompt;

/// Answers follow-up questions about the session's claim report.
pub struct ClaimQuestionTask {
    llm: Arc<dyn LlmClient>,
}

impl ClaimQuestionTask {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl Task for ClaimQuestionTask {
    async fn run(&self, context: Context) -> Result<TaskResult> {
        let session_id = session_id(&context).await;
        let report: String = require(&context, session_keys::CLAIM_REPORT).await?;
        let question: String = context
            .get::<String>(session_keys::USER_INPUT)
            .await
            .map(|q| q.trim().to_string())
            .filter(|q| !q.is_empty())
            .ok_or_else(|| ClaimsError::input("Question is required"))?;

        let history = transcript(&context).await;
        info!(
            session_id = %session_id,
            task_id = %self.id(),
            history_length = history.len(),
            "Answering claim question"
        );

        let prompt = domain_question_prompt(&report, &history, &question);
        let answer = self
            .llm
            .complete(CompletionRequest::new(prompt).with_temperature(temperature::CLAIM_QA))
            .await?;

        record_exchange(&context, question, answer.clone()).await;

        Ok(TaskResult::new(Some(answer), NextAction::WaitForInput))
    }
}
