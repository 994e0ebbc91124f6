use claims_flow::{FlowRunner, Graph, GraphBuilder, Session, SessionStorage, Task};
use std::path::PathBuf;
use std::sync::Arc;
use uuid::Uuid;

use crate::audit::AuditLogger;
use crate::extract::DocumentExtractor;
use crate::llm::LlmClient;
use crate::retrieval::{Embedder, PolicyIndex};
use crate::tasks::governance_check::review_suggested;
use crate::tasks::*;

pub const CLAIM_EXPLANATION_GRAPH: &str = "claim_explanation";
pub const CLAIM_QA_GRAPH: &str = "claim_qa";
pub const QUOTE_CHAT_GRAPH: &str = "quote_chat";
pub const UNDERWRITING_GRAPH: &str = "underwriting";

/// Collaborators shared by every workflow.
#[derive(Clone)]
pub struct WorkflowDeps {
    pub llm: Arc<dyn LlmClient>,
    pub extractor: Arc<DocumentExtractor>,
    pub upload_dir: PathBuf,
    pub audit: Arc<AuditLogger>,
    pub index: Arc<PolicyIndex>,
    pub embedder: Arc<dyn Embedder>,
    pub retrieval_top_k: usize,
}

/// intake → explanation → governance → (review gate) → audit commit
pub fn build_claim_explanation_workflow(deps: &WorkflowDeps) -> Graph {
    let intake_task = Arc::new(ReportIntakeTask::new(
        deps.extractor.clone(),
        deps.upload_dir.clone(),
    ));
    let intake_id = intake_task.id().to_string();

    let explanation_task = Arc::new(ClaimExplanationTask::new(deps.llm.clone()));
    let explanation_id = explanation_task.id().to_string();

    let governance_task = Arc::new(GovernanceCheckTask::new(deps.llm.clone()));
    let governance_id = governance_task.id().to_string();

    let review_task = Arc::new(ReviewGateTask);
    let review_id = review_task.id().to_string();

    let commit_task = Arc::new(AuditCommitTask::new(deps.audit.clone()));
    let commit_id = commit_task.id().to_string();

    GraphBuilder::new(CLAIM_EXPLANATION_GRAPH)
        .add_task(intake_task)
        .add_task(explanation_task)
        .add_task(governance_task)
        .add_task(review_task)
        .add_task(commit_task)
        .add_edge(&intake_id, &explanation_id)
        .add_edge(&explanation_id, &governance_id)
        .add_conditional_edge(&governance_id, review_suggested, &review_id, &commit_id)
        .add_edge(&review_id, &commit_id)
        .build()
}

pub fn build_claim_qa_workflow(deps: &WorkflowDeps) -> Graph {
    GraphBuilder::new(CLAIM_QA_GRAPH)
        .add_task(Arc::new(ClaimQuestionTask::new(deps.llm.clone())))
        .build()
}

pub fn build_quote_chat_workflow(deps: &WorkflowDeps) -> Graph {
    GraphBuilder::new(QUOTE_CHAT_GRAPH)
        .add_task(Arc::new(QuoteChatTask::new(
            deps.llm.clone(),
            deps.index.clone(),
            deps.embedder.clone(),
            deps.retrieval_top_k,
        )))
        .build()
}

pub fn build_underwriting_workflow(deps: &WorkflowDeps) -> Graph {
    GraphBuilder::new(UNDERWRITING_GRAPH)
        .add_task(Arc::new(UnderwritingAssessmentTask::new(deps.llm.clone())))
        .build()
}

/// One runner per workflow, all backed by the same session store.
#[derive(Clone)]
pub struct Workflows {
    pub claim_explanation: FlowRunner,
    pub claim_qa: FlowRunner,
    pub quote_chat: FlowRunner,
    pub underwriting: FlowRunner,
}

impl Workflows {
    pub fn new(deps: &WorkflowDeps, session_storage: Arc<dyn SessionStorage>) -> Self {
        let runner = |graph: Graph| FlowRunner::new(Arc::new(graph), session_storage.clone());
        Self {
            claim_explanation: runner(build_claim_explanation_workflow(deps)),
            claim_qa: runner(build_claim_qa_workflow(deps)),
            quote_chat: runner(build_quote_chat_workflow(deps)),
            underwriting: runner(build_underwriting_workflow(deps)),
        }
    }
}

pub fn new_session_id() -> String {
    Uuid::new_v4().to_string()
}

/// A fresh session positioned at the runner's start task.
pub fn new_session(runner: &FlowRunner, session_id: String) -> Option<Session> {
    let graph = runner.graph();
    let start = graph.start_task_id()?;
    Some(Session::new_from_task(session_id, &graph.id, start))
}
