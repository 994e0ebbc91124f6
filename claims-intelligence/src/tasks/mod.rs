// Workflow tasks for the claim, quote and underwriting flows
pub mod audit_commit;
pub mod claim_explanation;
pub mod claim_question;
pub mod governance_check;
pub mod quote_chat;
pub mod report_intake;
pub mod review_gate;
pub mod underwriting_assessment;

pub use audit_commit::AuditCommitTask;
pub use claim_explanation::ClaimExplanationTask;
pub use claim_question::ClaimQuestionTask;
pub use governance_check::GovernanceCheckTask;
pub use quote_chat::QuoteChatTask;
pub use report_intake::ReportIntakeTask;
pub use review_gate::ReviewGateTask;
pub use underwriting_assessment::UnderwritingAssessmentTask;

use claims_flow::{Context, GraphError};
use serde::de::DeserializeOwned;

/// Keys of the values tasks exchange through the session context.
pub mod session_keys {
    pub const SESSION_ID: &str = "session_id";
    pub const USER_INPUT: &str = "user_input";
    pub const CLAIM_SUBMISSION: &str = "claim_submission";
    pub const CLAIM_REPORT: &str = "claim_report";
    pub const CLAIM_EXPLANATION: &str = "claim_explanation";
    pub const GOVERNANCE: &str = "governance";
    pub const AWAITING_REVIEW: &str = "awaiting_review";
    pub const REVIEW_DECISION: &str = "review_decision";
    pub const AUDIT_RECORD: &str = "audit_record";
    pub const AUDIT_ERROR: &str = "audit_error";
    pub const QUOTE_SET: &str = "quote_set";
    pub const QUOTE_CHAT_TURN: &str = "quote_chat_turn";
    pub const UNDERWRITING_REQUEST: &str = "underwriting_request";
    pub const UNDERWRITING_RESULT: &str = "underwriting_result";
}

pub(crate) async fn session_id(context: &Context) -> String {
    context
        .get::<String>(session_keys::SESSION_ID)
        .await
        .unwrap_or_else(|| "unknown".to_string())
}

pub(crate) async fn require<T: DeserializeOwned>(context: &Context, key: &str) -> claims_flow::Result<T> {
    context
        .get(key)
        .await
        .ok_or_else(|| GraphError::ContextError(format!("{key} not found in context")))
}
