//! Appeal scoring and recommended actions.
//!
//! Everything here is arithmetic over values the pipeline has already computed. The thresholds
//! come from [`DenialThresholds`] rather than being baked in.

use crate::config::DenialThresholds;
use crate::corrections::AutoCorrection;
use crate::patterns::DenialPattern;
use claims_types::{Money, Percentage};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Appeal,
    CorrectAndResubmit,
    PatientResponsibility,
    WriteOff,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct RecommendedAction {
    pub action: ActionKind,
    pub priority: Priority,
    pub estimated_value: Money,
    pub timeframe: String,
    pub description: String,
}

/// Estimates the likelihood that an appeal of the claim succeeds.
///
/// The raw score is the mean of each pattern's first-rule success rate. Patterns without rules
/// carry no evidence and are left out of the mean. The score is then scaled by the claim-value
/// multiplier and clamped into `[min_appeal_probability, max_appeal_probability]`.
///
/// Returns `None` when no pattern can be scored, including when `patterns` is empty.
pub fn appeal_probability(
    patterns: &[DenialPattern],
    claim_value: Money,
    thresholds: &DenialThresholds,
) -> Option<Percentage> {
    let rates: Vec<f64> = patterns
        .iter()
        .filter_map(DenialPattern::primary_success_rate)
        .map(Percentage::value)
        .collect();

    if rates.is_empty() {
        return None;
    }

    let mean = rates.iter().sum::<f64>() / rates.len() as f64;
    let scaled = mean * thresholds.value_multiplier(claim_value);

    Some(Percentage::clamped_between(
        scaled,
        thresholds.min_appeal_probability,
        thresholds.max_appeal_probability,
    ))
}

/// Produces zero, one or two actions from the corrections and appeal probability.
///
/// The two rules are independent:
/// - any correction above the confidence threshold yields a high-priority correct-and-resubmit;
/// - an appeal probability above the appeal threshold yields an appeal, high priority for
///   high-value claims and medium otherwise.
pub fn recommend_actions(
    corrections: &[AutoCorrection],
    appeal_probability: Option<Percentage>,
    claim_value: Money,
    thresholds: &DenialThresholds,
) -> Vec<RecommendedAction> {
    let mut actions = Vec::new();

    let best = corrections
        .iter()
        .map(|c| c.confidence)
        .filter(|c| c.value() > thresholds.high_confidence)
        .fold(None, |acc: Option<Percentage>, c| match acc {
            Some(a) if a >= c => Some(a),
            _ => Some(c),
        });

    if let Some(confidence) = best {
        actions.push(RecommendedAction {
            action: ActionKind::CorrectAndResubmit,
            priority: Priority::High,
            estimated_value: claim_value.scaled(confidence),
            timeframe: "7-14 days".into(),
            description: format!(
                "Apply the suggested corrections and resubmit ({confidence} confidence)"
            ),
        });
    }

    if let Some(probability) = appeal_probability.filter(|p| p.value() > thresholds.appeal_probability) {
        let priority = if claim_value > thresholds.high_value {
            Priority::High
        } else {
            Priority::Medium
        };
        actions.push(RecommendedAction {
            action: ActionKind::Appeal,
            priority,
            estimated_value: claim_value.scaled(probability),
            timeframe: "30-45 days".into(),
            description: format!("File a formal appeal ({probability} estimated success)"),
        });
    }

    actions
}
