//! Prompt templates. Behavioural rules in these prompts are instructions to
//! the model only; the governance checks are the enforcement point.

use crate::decision::DecisionLabel;
use crate::memory::Exchange;
use crate::models::{ClaimType, ExplanationLanguage};
use crate::quotes::QuoteComparison;
use crate::retrieval::DocumentChunk;
use crate::underwriting::UnderwritingRequest;

/// Characters of each retrieved clause passed to the quote chat.
pub const CLAUSE_PREVIEW_CHARS: usize = 400;

pub fn explanation_prompt(
    claim_type: ClaimType,
    decision: DecisionLabel,
    report: &str,
    language: ExplanationLanguage,
) -> String {
    format!(
        r#"You are an insurance claims explanation assistant.

Claim Type: {claim_type}
Decision (as stated in document): {decision}
Language: {language}

RULES:
- Use ONLY information present in the claim report.
- Do NOT invent policy rules.
- Do NOT promise outcomes or approvals.
- If information is missing, say so clearly.

FORMAT:

1. Claim Decision
2. Why This Decision Was Made
3. What This Means for You
4. What You Can Do Next

Claim Report:
"""{report}"""
"#
    )
}

pub fn domain_question_prompt(report: &str, history: &[Exchange], question: &str) -> String {
    let history = render_history(history);
    format!(
        r#"You are an insurance domain assistant.

PRIORITY RULES:
1. First use the uploaded claim report.
2. If the answer is not in the report, you MAY use general insurance knowledge.
3. Clearly say when general knowledge is used.
4. Do NOT provide legal or financial advice.

Claim Report:
"""{report}"""

Conversation history:
{history}

User Question:
{question}
"#
    )
}

pub fn support_check_prompt(report: &str, explanation: &str) -> String {
    format!(
        r#"Check whether the explanation is fully supported by the claim report.
Reply strictly YES or NO.

Report:
{report}

Explanation:
{explanation}
"#
    )
}

pub fn appeal_score_prompt(report: &str) -> String {
    format!(
        r#"Based ONLY on the claim report,
estimate appeal success likelihood between 0 and 1.
Return only a numeric value.

{report}
"#
    )
}

pub fn quote_chat_prompt(
    history: &[Exchange],
    question: &str,
    comparison: &QuoteComparison,
    clauses: &[DocumentChunk],
) -> String {
    let history = render_history(history);
    let scores = comparison
        .scores
        .iter()
        .map(|s| format!("- {}: {:.2}", s.quote_id, s.score))
        .collect::<Vec<_>>()
        .join("\n");
    let clauses = if clauses.is_empty() {
        "(no relevant clauses found)".to_string()
    } else {
        clauses
            .iter()
            .map(|c| truncate_chars(&c.text, CLAUSE_PREVIEW_CHARS))
            .collect::<Vec<_>>()
            .join("\n\n")
    };

    format!(
        r#"You are an insurance assistant.

Conversation history:
{history}

User question:
{question}

Quote comparison result:
Best quote: {best}
Scores:
{scores}

Relevant policy clauses:
{clauses}

Explain clearly:
- Which quote is best
- Why
- Keep it simple
- Do not invent facts
"#,
        best = comparison.best_quote,
    )
}

pub const UNDERWRITING_SYSTEM_PROMPT: &str = r#"You are an insurance underwriting assistant.
Your job is to assess underwriting risk.

Rules:
- Do NOT approve or reject policies
- ONLY assist underwriters
- Be explainable and conservative
- Return valid JSON ONLY"#;

pub fn underwriting_prompt(request: &UnderwritingRequest) -> String {
    let applicant = pretty_json(&request.applicant);
    let claims = pretty_json(&request.claims_history);
    let external = pretty_json(&request.external_risk);
    format!(
        r#"Applicant Profile:
{applicant}

Claims History:
{claims}

External Risk Data:
{external}

Tasks:
1. Identify underwriting risk factors
2. Assign Risk Level: Low / Medium / High
3. Assign Risk Score: 0-100
4. Provide clear justification
5. Recommend next step

Output JSON format:
{{
    "risk_level": "",
    "risk_score": 0,
    "key_risk_factors": [],
    "underwriting_summary": "",
    "recommendation": ""
}}
"#
    )
}

fn render_history(history: &[Exchange]) -> String {
    if history.is_empty() {
        return "(none)".to_string();
    }
    history
        .iter()
        .map(|e| format!("User: {}\nAssistant: {}", e.question, e.answer))
        .collect::<Vec<_>>()
        .join("\n")
}

fn pretty_json(value: &serde_json::Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
