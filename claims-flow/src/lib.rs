pub mod context;
pub mod error;
pub mod graph;
pub mod runner;
pub mod storage;
pub mod task;

// Re-export commonly used types
pub use context::{Context, MessageRole, SerializableMessage};
pub use error::{GraphError, Result};
pub use graph::{ExecutionResult, ExecutionStatus, Graph, GraphBuilder};
pub use runner::FlowRunner;
pub use storage::{InMemorySessionStorage, Session, SessionStorage};
pub use task::{NextAction, Task, TaskResult};

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Arc;

    struct DraftTask;

    #[async_trait]
    impl Task for DraftTask {
        async fn run(&self, context: Context) -> Result<TaskResult> {
            let input: String = context.get("input").await.unwrap_or_default();
            context.set("draft", format!("Draft: {}", input)).await;
            context.set("flagged", input.contains("flag")).await;
            Ok(TaskResult::new(None, NextAction::ContinueAndExecute))
        }
    }

    struct ReviewTask;

    #[async_trait]
    impl Task for ReviewTask {
        async fn run(&self, context: Context) -> Result<TaskResult> {
            if context.contains_key("reviewed") {
                return Ok(TaskResult::new(None, NextAction::ContinueAndExecute));
            }
            Ok(TaskResult::new(
                Some("Awaiting review".to_string()),
                NextAction::WaitForInput,
            ))
        }
    }

    struct CommitTask;

    #[async_trait]
    impl Task for CommitTask {
        async fn run(&self, context: Context) -> Result<TaskResult> {
            let draft: String = context
                .get("draft")
                .await
                .ok_or_else(|| GraphError::ContextError("draft not found".to_string()))?;
            Ok(TaskResult::new(Some(draft), NextAction::End))
        }
    }

    struct FailingTask;

    #[async_trait]
    impl Task for FailingTask {
        async fn run(&self, _context: Context) -> Result<TaskResult> {
            Err(anyhow::anyhow!("upstream unavailable").into())
        }
    }

    fn review_graph() -> Graph {
        let draft = Arc::new(DraftTask);
        let review = Arc::new(ReviewTask);
        let commit = Arc::new(CommitTask);
        let draft_id = draft.id().to_string();
        let review_id = review.id().to_string();
        let commit_id = commit.id().to_string();

        GraphBuilder::new("review")
            .add_task(draft)
            .add_task(review)
            .add_task(commit)
            .add_conditional_edge(
                draft_id,
                |ctx| ctx.get_sync::<bool>("flagged").unwrap_or(false),
                review_id.clone(),
                commit_id.clone(),
            )
            .add_edge(review_id, commit_id)
            .build()
    }

    async fn start_session(storage: &InMemorySessionStorage, graph: &Graph, input: &str) {
        let start = graph.start_task_id().unwrap().to_string();
        let session = Session::new_from_task("s1".to_string(), &graph.id, &start);
        session.context.set("input", input).await;
        storage.save(session).await.unwrap();
    }

    #[tokio::test]
    async fn unflagged_input_runs_to_completion() {
        let storage = Arc::new(InMemorySessionStorage::new());
        let graph = Arc::new(review_graph());
        start_session(&storage, &graph, "hello").await;

        let runner = FlowRunner::new(graph, storage.clone());
        let result = runner.run("s1").await.unwrap();

        assert_eq!(result.status, ExecutionStatus::Completed);
        assert_eq!(result.response.as_deref(), Some("Draft: hello"));
    }

    #[tokio::test]
    async fn flagged_input_waits_then_resumes() {
        let storage = Arc::new(InMemorySessionStorage::new());
        let graph = Arc::new(review_graph());
        start_session(&storage, &graph, "please flag").await;

        let runner = FlowRunner::new(graph, storage.clone());
        let first = runner.run("s1").await.unwrap();
        assert_eq!(first.status, ExecutionStatus::WaitingForInput);
        assert_eq!(first.response.as_deref(), Some("Awaiting review"));

        let session = storage.get("s1").await.unwrap().unwrap();
        assert!(session.current_task_id.ends_with("ReviewTask"));
        session.context.set("reviewed", true).await;
        storage.save(session).await.unwrap();

        let second = runner.run("s1").await.unwrap();
        assert_eq!(second.status, ExecutionStatus::Completed);
        assert_eq!(second.response.as_deref(), Some("Draft: please flag"));
    }

    #[tokio::test]
    async fn missing_session_is_reported() {
        let storage = Arc::new(InMemorySessionStorage::new());
        let runner = FlowRunner::new(Arc::new(review_graph()), storage);

        let err = runner.run("nope").await.unwrap_err();
        assert!(matches!(err, GraphError::SessionNotFound(id) if id == "nope"));
    }

    #[tokio::test]
    async fn failed_step_keeps_position_and_written_context() {
        let draft = Arc::new(DraftTask);
        let failing = Arc::new(FailingTask);
        let draft_id = draft.id().to_string();
        let failing_id = failing.id().to_string();
        let graph = GraphBuilder::new("partial")
            .add_task(draft)
            .add_task(failing)
            .add_edge(draft_id.clone(), failing_id)
            .build();
        let graph = Arc::new(graph);
        let storage = Arc::new(InMemorySessionStorage::new());
        start_session(&storage, &graph, "hello").await;

        let runner = FlowRunner::new(graph, storage.clone());
        assert!(runner.run("s1").await.is_err());

        let session = storage.get("s1").await.unwrap().unwrap();
        assert_eq!(session.current_task_id, draft_id);
        assert!(session.status_message.is_none());
        // the context is shared, so the draft written before the failure is kept
        assert_eq!(
            session.context.get::<String>("draft").await.as_deref(),
            Some("Draft: hello")
        );
    }

    #[tokio::test]
    async fn task_errors_keep_their_source() {
        let failing = Arc::new(FailingTask);
        let id = failing.id().to_string();
        let graph = GraphBuilder::new("failing").add_task(failing).build();
        let mut session = Session::new_from_task("s1".to_string(), "failing", &id);

        let err = graph.execute_session(&mut session).await.unwrap_err();
        match err {
            GraphError::Other(source) => assert_eq!(source.to_string(), "upstream unavailable"),
            other => panic!("unexpected error: {other}"),
        }
    }
}
