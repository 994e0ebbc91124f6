use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{error, info};

use crate::error::{ClaimsError, Result};
use crate::llm::{CompletionRequest, LlmClient, temperature};
use crate::prompts::{UNDERWRITING_SYSTEM_PROMPT, underwriting_prompt};

/// Applicant data submitted for a risk summary. Each part is free-form JSON.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnderwritingRequest {
    pub applicant: Value,
    #[serde(default)]
    pub claims_history: Value,
    #[serde(default)]
    pub external_risk: Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

pub const MAX_RISK_SCORE: u8 = 100;

/// Structured underwriting output. Anything that does not fit this shape is rejected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UnderwritingResult {
    pub risk_level: RiskLevel,
    pub risk_score: u8,
    pub key_risk_factors: Vec<String>,
    pub underwriting_summary: String,
    pub recommendation: String,
}

/// Run the underwriting prompt and validate the model's JSON answer.
pub async fn assess(llm: &dyn LlmClient, request: &UnderwritingRequest) -> Result<UnderwritingResult> {
    if request.applicant.is_null() {
        return Err(ClaimsError::input("applicant profile is required"));
    }

    let raw = llm
        .complete(
            CompletionRequest::new(underwriting_prompt(request))
                .with_system(UNDERWRITING_SYSTEM_PROMPT)
                .with_temperature(temperature::UNDERWRITING),
        )
        .await?;

    let result = parse_underwriting_result(&raw).inspect_err(|e| {
        error!(error = %e, raw_length = raw.len(), "Underwriting output rejected");
    })?;
    info!(
        risk_level = ?result.risk_level,
        risk_score = result.risk_score,
        factors = result.key_risk_factors.len(),
        "Underwriting assessment parsed"
    );
    Ok(result)
}

/// Extract the JSON object from a model response and validate it.
pub fn parse_underwriting_result(raw: &str) -> Result<UnderwritingResult> {
    let json = extract_json_object(raw)
        .ok_or_else(|| ClaimsError::Parse("model did not return a JSON object".to_string()))?;

    let result: UnderwritingResult = serde_json::from_str(json)
        .map_err(|e| ClaimsError::Parse(format!("output validation failed: {e}")))?;

    if result.risk_score > MAX_RISK_SCORE {
        return Err(ClaimsError::Parse(format!(
            "risk_score {} is outside 0-{MAX_RISK_SCORE}",
            result.risk_score
        )));
    }
    Ok(result)
}

/// The outermost `{...}` span, ignoring code fences and surrounding prose.
fn extract_json_object(raw: &str) -> Option<&str> {
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    (start < end).then(|| &raw[start..=end])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::testing::ScriptedLlm;
    use serde_json::json;

    const VALID: &str = r#"{
        "risk_level": "High",
        "risk_score": 78,
        "key_risk_factors": ["Hazardous occupation", "High-risk zone"],
        "underwriting_summary": "Two claims in two years.",
        "recommendation": "Request medical examination"
    }"#;

    fn request() -> UnderwritingRequest {
        UnderwritingRequest {
            applicant: json!({"age": 45, "occupation": "Construction Worker"}),
            claims_history: json!([{"year": 2022, "claim_amount": 180000}]),
            external_risk: json!({"credit_score": 640, "high_risk_zone": true}),
        }
    }

    #[test]
    fn parses_plain_and_fenced_json() {
        let plain = parse_underwriting_result(VALID).unwrap();
        assert_eq!(plain.risk_level, RiskLevel::High);
        assert_eq!(plain.risk_score, 78);

        let fenced = format!("```json\n{VALID}\n```");
        assert_eq!(parse_underwriting_result(&fenced).unwrap(), plain);
    }

    #[test]
    fn rejects_non_json() {
        assert!(matches!(
            parse_underwriting_result("I cannot assess this applicant."),
            Err(ClaimsError::Parse(_))
        ));
    }

    #[test]
    fn rejects_out_of_schema_values() {
        let bad_level = VALID.replace("\"High\"", "\"Severe\"");
        assert!(matches!(parse_underwriting_result(&bad_level), Err(ClaimsError::Parse(_))));

        let bad_score = VALID.replace("78", "140");
        assert!(matches!(parse_underwriting_result(&bad_score), Err(ClaimsError::Parse(_))));

        let missing = VALID.replace("\"recommendation\": \"Request medical examination\"", "\"notes\": \"\"");
        assert!(matches!(parse_underwriting_result(&missing), Err(ClaimsError::Parse(_))));
    }

    #[tokio::test]
    async fn assess_uses_zero_temperature_and_system_rules() {
        let llm = ScriptedLlm::new([VALID]);
        let result = assess(&llm, &request()).await.unwrap();
        assert_eq!(result.key_risk_factors.len(), 2);

        let sent = &llm.requests()[0];
        assert_eq!(sent.temperature, Some(0.0));
        assert!(sent.system.as_deref().unwrap().contains("Do NOT approve or reject policies"));
        assert!(sent.prompt.contains("\"credit_score\": 640"));
    }

    #[tokio::test]
    async fn assess_has_no_partial_results() {
        let llm = ScriptedLlm::new([r#"{"risk_level": "Low"}"#]);
        assert!(matches!(
            assess(&llm, &request()).await,
            Err(ClaimsError::Parse(_))
        ));
    }

    #[tokio::test]
    async fn missing_applicant_is_an_input_error() {
        let llm = ScriptedLlm::default();
        let mut request = request();
        request.applicant = Value::Null;

        assert!(matches!(assess(&llm, &request).await, Err(ClaimsError::Input(_))));
        assert!(llm.requests().is_empty());
    }
}
