use async_trait::async_trait;
use claims_flow::{Context, NextAction, Result, Task, TaskResult};
use tracing::info;

use super::{session_id, session_keys};

/// Holds a review-suggested explanation until the reviewer decides whether to flag it.
pub struct ReviewGateTask;

#[async_trait]
impl Task for ReviewGateTask {
    async fn run(&self, context: Context) -> Result<TaskResult> {
        let session_id = session_id(&context).await;

        if let Some(flagged) = context.get::<bool>(session_keys::REVIEW_DECISION).await {
            info!(session_id = %session_id, flagged, "Reviewer decision received");
            context.set(session_keys::AWAITING_REVIEW, false).await;
            return Ok(TaskResult::new_with_status(
                None,
                NextAction::ContinueAndExecute,
                Some("Reviewer decision recorded".to_string()),
            ));
        }

        info!(session_id = %session_id, "Waiting for reviewer decision");
        context.set(session_keys::AWAITING_REVIEW, true).await;

        Ok(TaskResult::new_with_status(
            Some("Explanation ready, waiting for review decision".to_string()),
            NextAction::WaitForInput,
            Some("Review suggested: decide whether to flag for human review".to_string()),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn waits_until_a_decision_is_present() {
        let context = Context::new();

        let first = ReviewGateTask.run(context.clone()).await.unwrap();
        assert!(matches!(first.next_action, NextAction::WaitForInput));
        assert_eq!(context.get::<bool>(session_keys::AWAITING_REVIEW).await, Some(true));

        context.set(session_keys::REVIEW_DECISION, true).await;
        let second = ReviewGateTask.run(context.clone()).await.unwrap();
        assert!(matches!(second.next_action, NextAction::ContinueAndExecute));
        assert_eq!(context.get::<bool>(session_keys::AWAITING_REVIEW).await, Some(false));
    }
}
