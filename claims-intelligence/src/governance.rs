use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::Result;
use crate::llm::{CompletionRequest, LlmClient};
use crate::prompts::{appeal_score_prompt, support_check_prompt};

/// Appeal scores below this suggest a human review.
pub const REVIEW_THRESHOLD: f64 = 0.6;

/// Score used when the model's answer is not a number: minimum confidence.
pub const UNPARSEABLE_APPEAL_SCORE: f64 = 0.0;

/// Outcome of the post-hoc checks on one explanation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GovernanceReport {
    /// The model judged the explanation supported by the report.
    pub supported: bool,
    pub appeal_score: f64,
    /// Advisory: offer the reviewer a human-review flag.
    pub review_suggested: bool,
    /// At least one check could not reach the completion service.
    pub degraded: bool,
}

/// Ask the model whether `explanation` is backed by `report`.
///
/// The answer counts as supported when it contains "YES" anywhere, ignoring case.
pub async fn support_check(llm: &dyn LlmClient, report: &str, explanation: &str) -> Result<bool> {
    let response = llm
        .complete(CompletionRequest::new(support_check_prompt(report, explanation)))
        .await?;
    Ok(response.to_uppercase().contains("YES"))
}

/// Ask the model for the likelihood that the decision can be appealed.
pub async fn appeal_score(llm: &dyn LlmClient, report: &str) -> Result<f64> {
    let response = llm
        .complete(CompletionRequest::new(appeal_score_prompt(report)))
        .await?;
    Ok(parse_appeal_score(&response))
}

/// Parse a bare number into [0, 1]; anything else is [`UNPARSEABLE_APPEAL_SCORE`].
pub fn parse_appeal_score(response: &str) -> f64 {
    match response.trim().parse::<f64>() {
        Ok(score) if score.is_finite() => score.clamp(0.0, 1.0),
        _ => {
            warn!(response = %response, "Appeal score was not numeric, using default");
            UNPARSEABLE_APPEAL_SCORE
        }
    }
}

pub fn review_suggested(supported: bool, appeal_score: f64) -> bool {
    !supported || appeal_score < REVIEW_THRESHOLD
}

/// Run both checks. Service failures never propagate: the failed check counts
/// against the explanation and the report is marked degraded.
pub async fn review(llm: &dyn LlmClient, report: &str, explanation: &str) -> GovernanceReport {
    let mut degraded = false;

    let supported = support_check(llm, report, explanation)
        .await
        .unwrap_or_else(|e| {
            warn!(error = %e, "Support check failed, treating explanation as unsupported");
            degraded = true;
            false
        });

    let appeal_score = appeal_score(llm, report).await.unwrap_or_else(|e| {
        warn!(error = %e, "Appeal score check failed, using default");
        degraded = true;
        UNPARSEABLE_APPEAL_SCORE
    });

    let report = GovernanceReport {
        supported,
        appeal_score,
        review_suggested: review_suggested(supported, appeal_score),
        degraded,
    };
    info!(
        supported = report.supported,
        appeal_score = report.appeal_score,
        review_suggested = report.review_suggested,
        degraded = report.degraded,
        "Governance checks complete"
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ClaimsError;
    use crate::llm::testing::ScriptedLlm;

    #[test]
    fn non_numeric_scores_default_to_zero() {
        assert_eq!(parse_appeal_score("about 0.7"), 0.0);
        assert_eq!(parse_appeal_score(""), 0.0);
        assert_eq!(parse_appeal_score("NaN"), 0.0);
    }

    #[test]
    fn numeric_scores_are_trimmed_and_clamped() {
        assert_eq!(parse_appeal_score(" 0.75\n"), 0.75);
        assert_eq!(parse_appeal_score("1.4"), 1.0);
        assert_eq!(parse_appeal_score("-0.2"), 0.0);
    }

    #[tokio::test]
    async fn support_check_looks_for_yes_anywhere() {
        let llm = ScriptedLlm::new(["yes, fully supported", "No.", "NO - but eyes wide open"]);
        assert!(support_check(&llm, "r", "e").await.unwrap());
        assert!(!support_check(&llm, "r", "e").await.unwrap());
        // substring rule: "eyes" contains "yes"
        assert!(support_check(&llm, "r", "e").await.unwrap());
    }

    #[tokio::test]
    async fn governance_calls_use_the_default_temperature() {
        let llm = ScriptedLlm::new(["YES", "0.8"]);
        let report = review(&llm, "report text", "explanation text").await;

        assert_eq!(
            report,
            GovernanceReport {
                supported: true,
                appeal_score: 0.8,
                review_suggested: false,
                degraded: false,
            }
        );
        let requests = llm.requests();
        assert_eq!(requests.len(), 2);
        assert!(requests.iter().all(|r| r.temperature.is_none()));
        assert!(requests[0].prompt.contains("explanation text"));
    }

    #[tokio::test]
    async fn low_score_or_unsupported_suggests_review() {
        let llm = ScriptedLlm::new(["YES", "0.59"]);
        assert!(review(&llm, "r", "e").await.review_suggested);

        let llm = ScriptedLlm::new(["NO", "0.9"]);
        assert!(review(&llm, "r", "e").await.review_suggested);

        let llm = ScriptedLlm::new(["YES", "not sure"]);
        let report = review(&llm, "r", "e").await;
        assert_eq!(report.appeal_score, 0.0);
        assert!(report.review_suggested);
        assert!(!report.degraded);
    }

    #[tokio::test]
    async fn service_failures_degrade_to_review() {
        let llm = ScriptedLlm::default();
        llm.push(Err(ClaimsError::service("rate limited")));
        llm.push(Ok("0.9".to_string()));

        let report = review(&llm, "r", "e").await;
        assert!(!report.supported);
        assert_eq!(report.appeal_score, 0.9);
        assert!(report.degraded);
        assert!(report.review_suggested);
    }
}
