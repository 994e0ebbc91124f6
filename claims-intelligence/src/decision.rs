use serde::{Deserialize, Serialize};
use std::fmt;

/// Outcome stated in a claim report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DecisionLabel {
    Approved,
    Denied,
    #[serde(rename = "Partially Approved")]
    PartiallyApproved,
    Unclear,
}

impl DecisionLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            DecisionLabel::Approved => "Approved",
            DecisionLabel::Denied => "Denied",
            DecisionLabel::PartiallyApproved => "Partially Approved",
            DecisionLabel::Unclear => "Unclear",
        }
    }
}

impl fmt::Display for DecisionLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

const DENIAL_MARKERS: [&str; 2] = ["rejected", "not payable"];
const PARTIAL_MARKERS: [&str; 2] = ["partially approved", "partial approval"];
const APPROVAL_MARKER: &str = "approved";

/// Classify a claim report by keyword. Checks run in priority order and the
/// first hit wins, so "partially approved" is never read as a plain approval.
pub fn detect_decision(report: &str) -> DecisionLabel {
    let report = report.to_lowercase();
    if DENIAL_MARKERS.iter().any(|m| report.contains(m)) {
        DecisionLabel::Denied
    } else if PARTIAL_MARKERS.iter().any(|m| report.contains(m)) {
        DecisionLabel::PartiallyApproved
    } else if report.contains(APPROVAL_MARKER) {
        DecisionLabel::Approved
    } else {
        DecisionLabel::Unclear
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn denial_wins_over_approval() {
        assert_eq!(
            detect_decision("Claim Rejected due to missing documents"),
            DecisionLabel::Denied
        );
        assert_eq!(
            detect_decision("Pre-auth approved, final bill NOT PAYABLE under clause 4"),
            DecisionLabel::Denied
        );
        assert_eq!(
            detect_decision("Partially approved earlier; appeal rejected"),
            DecisionLabel::Denied
        );
    }

    #[test]
    fn partial_approval_is_checked_before_approval() {
        assert_eq!(
            detect_decision("The claim is PARTIALLY APPROVED for 60% of the bill"),
            DecisionLabel::PartiallyApproved
        );
        assert_eq!(
            detect_decision("Partial approval granted for room rent"),
            DecisionLabel::PartiallyApproved
        );
    }

    #[test]
    fn plain_approval_and_fallback() {
        assert_eq!(detect_decision("Claim approved."), DecisionLabel::Approved);
        assert_eq!(
            detect_decision("Documents received, under review"),
            DecisionLabel::Unclear
        );
        assert_eq!(detect_decision(""), DecisionLabel::Unclear);
    }

    #[test]
    fn labels_render_for_prompts_and_logs() {
        assert_eq!(DecisionLabel::PartiallyApproved.to_string(), "Partially Approved");
        assert_eq!(
            serde_json::to_string(&DecisionLabel::PartiallyApproved).unwrap(),
            "\"Partially Approved\""
        );
    }
}
