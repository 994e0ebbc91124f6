use serde::{Deserialize, Serialize};
use std::fmt;

use crate::audit::{AuditRecord, AuditSummary};
use crate::decision::DecisionLabel;
use crate::governance::GovernanceReport;
use crate::memory::Exchange;
use crate::quotes::{HouseholdProfile, Quote, QuoteComparison};
use crate::retrieval::DocumentChunk;
use crate::underwriting::{UnderwritingRequest, UnderwritingResult};

/// Line of business a claim belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClaimType {
    Health,
    Motor,
    Life,
    Travel,
    #[serde(rename = "Home / Property")]
    HomeProperty,
    Commercial,
    #[serde(rename = "Personal Accident")]
    PersonalAccident,
}

impl ClaimType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClaimType::Health => "Health",
            ClaimType::Motor => "Motor",
            ClaimType::Life => "Life",
            ClaimType::Travel => "Travel",
            ClaimType::HomeProperty => "Home / Property",
            ClaimType::Commercial => "Commercial",
            ClaimType::PersonalAccident => "Personal Accident",
        }
    }
}

impl fmt::Display for ClaimType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Language the claim explanation is written in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExplanationLanguage {
    #[default]
    English,
    Hindi,
    Marathi,
}

impl fmt::Display for ExplanationLanguage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ExplanationLanguage::English => "English",
            ExplanationLanguage::Hindi => "Hindi",
            ExplanationLanguage::Marathi => "Marathi",
        };
        f.write_str(name)
    }
}

/// What the user submitted to start a claim explanation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClaimSubmission {
    pub claim_type: ClaimType,
    #[serde(default)]
    pub language: ExplanationLanguage,
    /// Pasted report text; takes precedence over `document_path`.
    #[serde(default)]
    pub report_text: Option<String>,
    /// Path of an uploaded report (PDF or plain text) readable by the service.
    #[serde(default)]
    pub document_path: Option<String>,
}

/// Output of the explanation step, before governance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClaimExplanation {
    pub decision: DecisionLabel,
    pub explanation: String,
}

/// Quotes and household captured once at the start of a quote chat.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuoteSet {
    pub quotes: Vec<Quote>,
    pub profile: HouseholdProfile,
    /// Exact tag of the policy document to search; the best quote's id when absent.
    #[serde(default)]
    pub policy_tag: Option<String>,
}

/// One turn of the quote chat.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuoteChatTurn {
    pub answer: String,
    pub comparison: QuoteComparison,
    pub policy_tag: String,
    pub clauses: Vec<DocumentChunk>,
}

pub const EXPLANATION_DISCLAIMER: &str = "This explanation is for understanding purposes only \
and does not replace the official claim decision or policy document.";

// ---- HTTP payloads ----

pub type ExplainClaimRequest = ClaimSubmission;

#[derive(Debug, Serialize, Deserialize)]
pub struct ExplainClaimResponse {
    pub session_id: String,
    pub decision: DecisionLabel,
    pub explanation: String,
    pub disclaimer: String,
    pub governance: GovernanceReport,
    /// `awaiting_review` when the reviewer must decide before the audit row is written.
    pub status: String,
    pub audit_record: Option<AuditRecord>,
    /// Set when the explanation was produced but its audit row could not be written.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audit_error: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ReviewDecisionRequest {
    pub flag_for_review: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ReviewDecisionResponse {
    pub session_id: String,
    pub audit_record: Option<AuditRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audit_error: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ClaimQuestionRequest {
    #[serde(default)]
    pub session_id: Option<String>,
    /// Required when opening a new session.
    #[serde(default)]
    pub report_text: Option<String>,
    pub question: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct QuoteChatRequest {
    #[serde(default)]
    pub session_id: Option<String>,
    /// Required when opening a new session.
    #[serde(default)]
    pub quote_set: Option<QuoteSet>,
    pub question: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatResponse<T> {
    pub session_id: String,
    #[serde(flatten)]
    pub turn: T,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct QuestionAnswer {
    pub answer: String,
}

pub type UnderwritingAssessRequest = UnderwritingRequest;

#[derive(Debug, Serialize, Deserialize)]
pub struct UnderwritingAssessResponse {
    pub session_id: String,
    pub result: UnderwritingResult,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AuditLogResponse {
    pub records: Vec<AuditRecord>,
    pub summary: AuditSummary,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HistoryResponse {
    pub session_id: String,
    pub exchanges: Vec<Exchange>,
}
