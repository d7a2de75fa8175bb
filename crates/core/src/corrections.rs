//! Auto-correction generation and application.
//!
//! Generation expands every auto-correctible pattern into one [`AutoCorrection`] per rule.
//! Emission order is pattern order, then rule order. Rules never interact with each other.
//!
//! Application is split in two: [`apply_to_claim`] mutates an in-memory claim, and
//! [`DenialService::apply_corrections`](crate::service::DenialService::apply_corrections)
//! persists the result and writes the audit entry.

use crate::constants::{
    lookup, FALLBACK_MODIFIER, MODIFIER_REPLACEMENTS, PROCEDURE_CODE_REPLACEMENTS,
};
use crate::models::{Claim, ProcessingStatus};
use crate::patterns::{CorrectionRule, DenialPattern, RuleAction};
use claims_types::Percentage;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "snake_case")]
pub enum CorrectionKind {
    CodeChange,
    ModifierAdd,
    DocumentationUpdate,
}

/// A proposed, confidence-scored change to a claim field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct AutoCorrection {
    pub kind: CorrectionKind,
    pub original_value: String,
    pub corrected_value: String,
    pub confidence: Percentage,
    pub reason: String,
}

/// Proposes corrections for `claim` from the matched `patterns`.
///
/// Patterns that are not auto-correctible are skipped entirely.
pub fn generate_corrections(claim: &Claim, patterns: &[DenialPattern]) -> Vec<AutoCorrection> {
    patterns
        .iter()
        .filter(|p| p.auto_correctible)
        .flat_map(|p| {
            p.correction_rules
                .iter()
                .map(move |rule| correction_for_rule(claim, p, rule))
        })
        .collect()
}

fn correction_for_rule(
    claim: &Claim,
    pattern: &DenialPattern,
    rule: &CorrectionRule,
) -> AutoCorrection {
    let primary = claim.primary_line();
    let code = pattern.denial_code.as_str();

    let (kind, original_value, corrected_value) = match rule.action {
        RuleAction::Recode => {
            let original = primary
                .map(|l| l.procedure_code.clone())
                .unwrap_or_default();
            let corrected = lookup(PROCEDURE_CODE_REPLACEMENTS, &original)
                .map(str::to_string)
                .or_else(|| rule.parameters.get("replacement_code").cloned())
                .unwrap_or_else(|| original.clone());
            (CorrectionKind::CodeChange, original, corrected)
        }
        RuleAction::Modifier => {
            let original = primary
                .and_then(|l| l.modifiers.first().cloned())
                .unwrap_or_default();
            let corrected = lookup(MODIFIER_REPLACEMENTS, code)
                .map(str::to_string)
                .or_else(|| rule.parameters.get("modifier").cloned())
                .unwrap_or_else(|| FALLBACK_MODIFIER.to_string());
            (CorrectionKind::ModifierAdd, original, corrected)
        }
        RuleAction::Documentation => {
            let corrected = rule
                .parameters
                .get("document")
                .cloned()
                .unwrap_or_else(|| rule.condition.clone());
            (CorrectionKind::DocumentationUpdate, String::new(), corrected)
        }
        RuleAction::Resubmit => (
            CorrectionKind::DocumentationUpdate,
            status_label(claim.processing_status).to_string(),
            "resubmit".to_string(),
        ),
    };

    AutoCorrection {
        kind,
        original_value,
        corrected_value,
        confidence: rule.success_rate,
        reason: format!("{}: {}", code, rule.condition),
    }
}

fn status_label(status: ProcessingStatus) -> &'static str {
    match status {
        ProcessingStatus::Pending => "pending",
        ProcessingStatus::Submitted => "submitted",
        ProcessingStatus::Denied => "denied",
        ProcessingStatus::AutoCorrected => "auto_corrected",
        ProcessingStatus::Resubmitted => "resubmitted",
        ProcessingStatus::Paid => "paid",
    }
}

/// Writes `corrections` onto the in-memory claim.
///
/// - `code_change` replaces the procedure code on every line whose code equals the original.
/// - `modifier_add` adds the modifier to every line that does not already carry it.
/// - `documentation_update` appends a note to the claim.
///
/// The claim is marked auto-corrected only if at least one correction changed it. Returns the
/// number of corrections that changed something.
pub fn apply_to_claim(claim: &mut Claim, corrections: &[AutoCorrection]) -> usize {
    let mut changed = 0;

    for c in corrections {
        let touched = match c.kind {
            CorrectionKind::CodeChange => {
                let mut hit = false;
                if c.original_value != c.corrected_value {
                    for line in claim
                        .line_items
                        .iter_mut()
                        .filter(|l| l.procedure_code == c.original_value)
                    {
                        line.procedure_code = c.corrected_value.clone();
                        hit = true;
                    }
                }
                hit
            }
            CorrectionKind::ModifierAdd => {
                let mut hit = false;
                for line in claim.line_items.iter_mut() {
                    if !line.modifiers.iter().any(|m| m == &c.corrected_value) {
                        line.modifiers.push(c.corrected_value.clone());
                        hit = true;
                    }
                }
                hit
            }
            CorrectionKind::DocumentationUpdate => {
                claim.notes.push(format!("{} ({})", c.corrected_value, c.reason));
                true
            }
        };

        if touched {
            changed += 1;
        }
    }

    if changed > 0 {
        claim.processing_status = ProcessingStatus::AutoCorrected;
    }
    changed
}
