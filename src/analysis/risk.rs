//! Overall risk classification.
//!
//! Combines the per-domain risk tiers from the compliance checklist into
//! one overall tier. Raising any single domain's tier can never lower the
//! overall classification.

use crate::models::{ChecklistEntry, RiskTier};

const HIGH_THRESHOLD: f64 = 2.5;
const MODERATE_THRESHOLD: f64 = 1.5;

/// Average the encoded tiers and bucket the result.
pub fn overall_tier(tiers: &[RiskTier]) -> RiskTier {
    if tiers.is_empty() {
        return RiskTier::Low;
    }

    let sum: u32 = tiers.iter().map(|t| t.encode() as u32).sum();
    let average = sum as f64 / tiers.len() as f64;

    if average >= HIGH_THRESHOLD {
        RiskTier::High
    } else if average >= MODERATE_THRESHOLD {
        RiskTier::Moderate
    } else {
        RiskTier::Low
    }
}

/// Classify a checklist into the overall tier and its class label.
pub fn classify(checklist: &[ChecklistEntry]) -> (RiskTier, String) {
    let tiers: Vec<RiskTier> = checklist.iter().map(|e| e.risk).collect();
    let overall = overall_tier(&tiers);
    (overall, overall.class_label().to_string())
}
