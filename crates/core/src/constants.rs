//! Constants used throughout the denials core crate.
//!
//! Static lookup tables for auto-correction plus the default values for
//! [`DenialThresholds`](crate::config::DenialThresholds).

/// Replacement procedure codes used by `recode` correction rules, keyed by the billed code.
pub const PROCEDURE_CODE_REPLACEMENTS: &[(&str, &str)] = &[
    ("99215", "99214"),
    ("99214", "99213"),
    ("99205", "99204"),
    ("99204", "99203"),
    ("97140", "97530"),
    ("G0439", "G0438"),
];

/// Replacement modifiers used by `modifier` correction rules, keyed by denial code.
pub const MODIFIER_REPLACEMENTS: &[(&str, &str)] = &[
    ("CO-97", "59"),
    ("CO-16", "GT"),
    ("CO-11", "25"),
    ("CO-236", "XU"),
];

/// Modifier used when neither the table nor the rule supplies one.
pub const FALLBACK_MODIFIER: &str = "59";

/// Audit-log action recorded when corrections are written back to a claim.
pub const AUDIT_ACTION_CORRECTIONS_APPLIED: &str = "auto_correction_applied";

/// Default confidence above which a correction justifies correct-and-resubmit.
pub const DEFAULT_HIGH_CONFIDENCE_THRESHOLD: f64 = 80.0;

/// Default appeal probability above which an appeal is recommended.
pub const DEFAULT_APPEAL_THRESHOLD: f64 = 70.0;

/// Default claim value (in cents) above which a claim counts as high value.
pub const DEFAULT_HIGH_VALUE_CENTS: u64 = 50_000;

/// Default claim value (in cents) above which a claim counts as medium value.
pub const DEFAULT_MEDIUM_VALUE_CENTS: u64 = 20_000;

/// Default appeal-probability multiplier for high-value claims.
pub const DEFAULT_HIGH_VALUE_MULTIPLIER: f64 = 1.2;

/// Default appeal-probability multiplier for medium-value claims.
pub const DEFAULT_MEDIUM_VALUE_MULTIPLIER: f64 = 1.1;

/// Lower bound of the appeal-probability clamp.
pub const DEFAULT_MIN_APPEAL_PROBABILITY: f64 = 10.0;

/// Upper bound of the appeal-probability clamp.
pub const DEFAULT_MAX_APPEAL_PROBABILITY: f64 = 95.0;

/// Default maximum number of claims accepted by one batch validation call.
pub const DEFAULT_MAX_BATCH_SIZE: usize = 100;

/// A charge above this multiple of the default fee is flagged during validation.
pub const EXCESSIVE_CHARGE_MULTIPLE: u64 = 3;

/// Confidence ceiling applied when a validation check could not complete.
pub const FAILED_CHECK_CONFIDENCE: f64 = 20.0;

/// Look up a value in one of the static pair tables.
pub(crate) fn lookup(table: &'static [(&'static str, &'static str)], key: &str) -> Option<&'static str> {
    table.iter().find(|(k, _)| *k == key).map(|(_, v)| *v)
}
