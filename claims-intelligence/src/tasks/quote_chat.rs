use async_trait::async_trait;
use claims_flow::{Context, NextAction, Result, Task, TaskResult};
use std::sync::Arc;
use tracing::info;

use super::{require, session_id, session_keys};
use crate::error::ClaimsError;
use crate::llm::{CompletionRequest, LlmClient, temperature};
use crate::memory::{record_exchange, transcript};
use crate::models::{QuoteChatTurn, QuoteSet};
use crate::prompts::quote_chat_prompt;
use crate::quotes::compare_quotes;
use crate::retrieval::{Embedder, PolicyIndex};

/// Scores the session's quotes, retrieves matching policy clauses and answers the question.
pub struct QuoteChatTask {
    llm: Arc<dyn LlmClient>,
    index: Arc<PolicyIndex>,
    embedder: Arc<dyn Embedder>,
    top_k: usize,
}

impl QuoteChatTask {
    pub fn new(
        llm: Arc<dyn LlmClient>,
        index: Arc<PolicyIndex>,
        embedder: Arc<dyn Embedder>,
        top_k: usize,
    ) -> Self {
        Self {
            llm,
            index,
            embedder,
            top_k,
        }
    }
}

#[async_trait]
impl Task for QuoteChatTask {
    async fn run(&self, context: Context) -> Result<TaskResult> {
        let session_id = session_id(&context).await;
        let quote_set: QuoteSet = require(&context, session_keys::QUOTE_SET).await?;
        let question: String = context
            .get::<String>(session_keys::USER_INPUT)
            .await
            .map(|q| q.trim().to_string())
            .filter(|q| !q.is_empty())
            .ok_or_else(|| ClaimsError::input("Question is required"))?;

        let comparison = compare_quotes(&quote_set.quotes, &quote_set.profile)?;
        let policy_tag = quote_set
            .policy_tag
            .clone()
            .unwrap_or_else(|| comparison.best_quote.clone());

        let clauses: Vec<_> = self
            .index
            .query(self.embedder.as_ref(), &question, &policy_tag, self.top_k)
            .await?
            .into_iter()
            .map(|hit| hit.chunk)
            .collect();

        info!(
            session_id = %session_id,
            task_id = %self.id(),
            best_quote = %comparison.best_quote,
            policy_tag = %policy_tag,
            clauses = clauses.len(),
            "Answering quote question"
        );

        let history = transcript(&context).await;
        let prompt = quote_chat_prompt(&history, &question, &comparison, &clauses);
        let answer = self
            .llm
            .complete(CompletionRequest::new(prompt).with_temperature(temperature::QUOTE_CHAT))
            .await?;

        record_exchange(&context, question, answer.clone()).await;
        context
            .set(
                session_keys::QUOTE_CHAT_TURN,
                QuoteChatTurn {
                    answer: answer.clone(),
                    comparison,
                    policy_tag,
                    clauses,
                },
            )
            .await;

        Ok(TaskResult::new(Some(answer), NextAction::WaitForInput))
    }
}
