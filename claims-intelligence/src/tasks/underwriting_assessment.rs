use async_trait::async_trait;
use claims_flow::{Context, NextAction, Result, Task, TaskResult};
use std::sync::Arc;
use tracing::info;

use super::{require, session_id, session_keys};
use crate::llm::LlmClient;
use crate::underwriting::{self, UnderwritingRequest};

pub struct UnderwritingAssessmentTask {
    llm: Arc<dyn LlmClient>,
}

impl UnderwritingAssessmentTask {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl Task for UnderwritingAssessmentTask {
    async fn run(&self, context: Context) -> Result<TaskResult> {
        let request: UnderwritingRequest = require(&context, session_keys::UNDERWRITING_REQUEST).await?;

        let result = underwriting::assess(self.llm.as_ref(), &request).await?;
        let session_id = session_id(&context).await;
        info!(
            session_id = %session_id,
            task_id = %self.id(),
            risk_level = ?result.risk_level,
            "Underwriting result stored"
        );
        context.set(session_keys::UNDERWRITING_RESULT, result).await;

        Ok(TaskResult::new(None, NextAction::End))
    }
}
