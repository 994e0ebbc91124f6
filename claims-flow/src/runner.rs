//! FlowRunner – loads a session, executes exactly **one** graph step, and
//! persists the updated session back to storage.
//!
//! HTTP handlers run one step per request: the runner is created once at
//! startup per workflow and shared through the application state.
//!
//! ```rust,ignore
//! let result = state.explanation_runner.run(&session_id).await?;
//! ```
//!
//! Use [`Graph::execute_session`] directly when several steps should run
//! against a session that is saved once at the end.

use std::sync::Arc;

use crate::{
    error::{GraphError, Result},
    graph::{ExecutionResult, Graph},
    storage::SessionStorage,
};

/// High-level helper that orchestrates the common _load → execute → save_ pattern.
#[derive(Clone)]
pub struct FlowRunner {
    graph: Arc<Graph>,
    storage: Arc<dyn SessionStorage>,
}

impl FlowRunner {
    pub fn new(graph: Arc<Graph>, storage: Arc<dyn SessionStorage>) -> Self {
        Self { graph, storage }
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    /// Execute one step for `session_id` and persist the session.
    ///
    /// A failed step is not saved: the stored `current_task_id` and
    /// `status_message` stay where they were, so the caller can retry it.
    /// Context values written before the failure are shared with the stored
    /// session and remain visible.
    pub async fn run(&self, session_id: &str) -> Result<ExecutionResult> {
        let mut session = self
            .storage
            .get(session_id)
            .await?
            .ok_or_else(|| GraphError::SessionNotFound(session_id.to_string()))?;

        let result = self.graph.execute_session(&mut session).await?;

        self.storage.save(session).await?;

        Ok(result)
    }
}
