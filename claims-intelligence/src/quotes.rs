use serde::{Deserialize, Serialize};

use crate::error::{ClaimsError, Result};

/// A candidate insurance quote. Amounts are in the policy currency.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub id: String,
    pub annual_premium: f64,
    pub sum_insured: f64,
    pub deductible: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HouseholdProfile {
    pub family_size: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuoteScore {
    pub quote_id: String,
    pub score: f64,
}

/// Scores for every quote, in input order, and the winner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuoteComparison {
    pub best_quote: String,
    pub scores: Vec<QuoteScore>,
}

const FAMILY_COVER_THRESHOLD: u32 = 4;
const SUM_INSURED_UNIT: f64 = 100_000.0;
const DEDUCTIBLE_CEILING: f64 = 20_000.0;
const PREMIUM_CEILING: f64 = 30_000.0;
const AMOUNT_UNIT: f64 = 1_000.0;

/// Heuristic desirability of a quote for a household, rounded to 2 decimals.
///
/// Larger families value cover, everyone values low deductibles and premiums.
pub fn score(quote: &Quote, profile: &HouseholdProfile) -> f64 {
    let mut score = 0.0;
    if profile.family_size >= FAMILY_COVER_THRESHOLD {
        score += quote.sum_insured / SUM_INSURED_UNIT;
    }
    score += ((DEDUCTIBLE_CEILING - quote.deductible) / AMOUNT_UNIT).max(0.0);
    score += ((PREMIUM_CEILING - quote.annual_premium) / AMOUNT_UNIT).max(0.0);
    round_cents(score)
}

fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Score every quote and pick the best one; on a tie the earlier quote wins.
pub fn compare_quotes(quotes: &[Quote], profile: &HouseholdProfile) -> Result<QuoteComparison> {
    let scores: Vec<QuoteScore> = quotes
        .iter()
        .map(|quote| QuoteScore {
            quote_id: quote.id.clone(),
            score: score(quote, profile),
        })
        .collect();

    let best = scores
        .iter()
        .fold(None::<&QuoteScore>, |best, candidate| match best {
            Some(current) if current.score >= candidate.score => Some(current),
            _ => Some(candidate),
        })
        .ok_or_else(|| ClaimsError::input("at least one quote is required"))?;

    Ok(QuoteComparison {
        best_quote: best.quote_id.clone(),
        scores,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quote(id: &str, premium: f64, sum_insured: f64, deductible: f64) -> Quote {
        Quote {
            id: id.to_string(),
            annual_premium: premium,
            sum_insured,
            deductible,
        }
    }

    #[test]
    fn family_of_four_counts_sum_insured() {
        let profile = HouseholdProfile { family_size: 4 };
        let q = quote("Q1", 25_000.0, 500_000.0, 10_000.0);
        assert_eq!(score(&q, &profile), 20.0);
    }

    #[test]
    fn smaller_households_ignore_sum_insured() {
        let profile = HouseholdProfile { family_size: 2 };
        let q = quote("Q1", 25_000.0, 500_000.0, 10_000.0);
        assert_eq!(score(&q, &profile), 15.0);
    }

    #[test]
    fn expensive_terms_never_go_negative() {
        let profile = HouseholdProfile { family_size: 1 };
        let q = quote("Q1", 45_000.0, 300_000.0, 50_000.0);
        assert_eq!(score(&q, &profile), 0.0);
    }

    #[test]
    fn scores_are_rounded_to_two_decimals() {
        let profile = HouseholdProfile { family_size: 5 };
        let q = quote("Q1", 29_876.0, 123_456.0, 19_999.0);
        // 1.23456 + 0.001 + 0.124
        assert_eq!(score(&q, &profile), 1.36);
        assert_eq!(score(&q, &profile), score(&q.clone(), &profile));
    }

    #[test]
    fn best_quote_and_input_order() {
        let profile = HouseholdProfile { family_size: 4 };
        let quotes = vec![
            quote("Q1", 28_000.0, 300_000.0, 15_000.0),
            quote("Q2", 25_000.0, 500_000.0, 10_000.0),
            quote("Q3", 22_000.0, 200_000.0, 18_000.0),
        ];
        let comparison = compare_quotes(&quotes, &profile).unwrap();

        assert_eq!(comparison.best_quote, "Q2");
        let ids: Vec<&str> = comparison.scores.iter().map(|s| s.quote_id.as_str()).collect();
        assert_eq!(ids, ["Q1", "Q2", "Q3"]);
        assert_eq!(comparison.scores[1].score, 20.0);
    }

    #[test]
    fn ties_go_to_the_first_quote() {
        let profile = HouseholdProfile { family_size: 2 };
        let quotes = vec![
            quote("A", 20_000.0, 100_000.0, 10_000.0),
            quote("B", 20_000.0, 900_000.0, 10_000.0),
        ];
        assert_eq!(compare_quotes(&quotes, &profile).unwrap().best_quote, "A");
    }

    #[test]
    fn empty_quote_set_is_an_input_error() {
        let profile = HouseholdProfile { family_size: 2 };
        assert!(matches!(
            compare_quotes(&[], &profile),
            Err(ClaimsError::Input(_))
        ));
    }
}
