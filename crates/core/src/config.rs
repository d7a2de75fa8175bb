//! Core runtime configuration.
//!
//! This module defines configuration that should be resolved once at process startup and then
//! passed into core services. Request handling never reads process-wide environment variables;
//! binaries collect the values and hand them to the parsing helpers here.

use crate::constants::{
    DEFAULT_APPEAL_THRESHOLD, DEFAULT_HIGH_CONFIDENCE_THRESHOLD, DEFAULT_HIGH_VALUE_CENTS,
    DEFAULT_HIGH_VALUE_MULTIPLIER, DEFAULT_MAX_APPEAL_PROBABILITY, DEFAULT_MAX_BATCH_SIZE,
    DEFAULT_MEDIUM_VALUE_CENTS, DEFAULT_MEDIUM_VALUE_MULTIPLIER, DEFAULT_MIN_APPEAL_PROBABILITY,
};
use crate::{DenialError, DenialResult};
use claims_types::Money;

pub const ENV_HIGH_CONFIDENCE_THRESHOLD: &str = "DENIALS_HIGH_CONFIDENCE_THRESHOLD";
pub const ENV_APPEAL_THRESHOLD: &str = "DENIALS_APPEAL_THRESHOLD";
pub const ENV_HIGH_VALUE_DOLLARS: &str = "DENIALS_HIGH_VALUE_DOLLARS";
pub const ENV_MEDIUM_VALUE_DOLLARS: &str = "DENIALS_MEDIUM_VALUE_DOLLARS";
pub const ENV_HIGH_VALUE_MULTIPLIER: &str = "DENIALS_HIGH_VALUE_MULTIPLIER";
pub const ENV_MEDIUM_VALUE_MULTIPLIER: &str = "DENIALS_MEDIUM_VALUE_MULTIPLIER";
pub const ENV_MIN_APPEAL_PROBABILITY: &str = "DENIALS_MIN_APPEAL_PROBABILITY";
pub const ENV_MAX_APPEAL_PROBABILITY: &str = "DENIALS_MAX_APPEAL_PROBABILITY";
pub const ENV_MAX_BATCH_SIZE: &str = "DENIALS_MAX_BATCH_SIZE";

/// Optional JSON store snapshot loaded at startup.
pub const ENV_STORE_FILE: &str = "DENIALS_STORE_FILE";
/// Optional YAML pattern catalogue replacing the standard one.
pub const ENV_PATTERN_FILE: &str = "DENIALS_PATTERN_FILE";
pub const ENV_REST_ADDR: &str = "DENIALS_REST_ADDR";
pub const DEFAULT_REST_ADDR: &str = "0.0.0.0:3000";

/// Business thresholds used by the recommendation engine.
///
/// The defaults reproduce the values the billing team has used so far. They have no documented
/// derivation, so deployments may override each one.
#[derive(Clone, Debug, PartialEq)]
pub struct DenialThresholds {
    /// A correction above this confidence triggers correct-and-resubmit.
    pub high_confidence: f64,
    /// An appeal probability above this triggers an appeal.
    pub appeal_probability: f64,
    pub high_value: Money,
    pub medium_value: Money,
    pub high_value_multiplier: f64,
    pub medium_value_multiplier: f64,
    pub min_appeal_probability: f64,
    pub max_appeal_probability: f64,
}

impl Default for DenialThresholds {
    fn default() -> Self {
        Self {
            high_confidence: DEFAULT_HIGH_CONFIDENCE_THRESHOLD,
            appeal_probability: DEFAULT_APPEAL_THRESHOLD,
            high_value: Money::from_cents(DEFAULT_HIGH_VALUE_CENTS),
            medium_value: Money::from_cents(DEFAULT_MEDIUM_VALUE_CENTS),
            high_value_multiplier: DEFAULT_HIGH_VALUE_MULTIPLIER,
            medium_value_multiplier: DEFAULT_MEDIUM_VALUE_MULTIPLIER,
            min_appeal_probability: DEFAULT_MIN_APPEAL_PROBABILITY,
            max_appeal_probability: DEFAULT_MAX_APPEAL_PROBABILITY,
        }
    }
}

impl DenialThresholds {
    /// Checks that the thresholds are mutually consistent.
    ///
    /// # Errors
    ///
    /// Returns `DenialError::InvalidInput` if:
    /// - a percentage threshold lies outside `[0, 100]`,
    /// - the appeal-probability clamp has `min > max`,
    /// - the medium value exceeds the high value,
    /// - a multiplier is not a positive finite number.
    pub fn validate(&self) -> DenialResult<()> {
        for (name, v) in [
            ("high_confidence", self.high_confidence),
            ("appeal_probability", self.appeal_probability),
            ("min_appeal_probability", self.min_appeal_probability),
            ("max_appeal_probability", self.max_appeal_probability),
        ] {
            if !v.is_finite() || !(0.0..=100.0).contains(&v) {
                return Err(DenialError::InvalidInput(format!(
                    "{name} must be within 0..=100, got {v}"
                )));
            }
        }

        if self.min_appeal_probability > self.max_appeal_probability {
            return Err(DenialError::InvalidInput(
                "min_appeal_probability cannot exceed max_appeal_probability".into(),
            ));
        }

        if self.medium_value > self.high_value {
            return Err(DenialError::InvalidInput(
                "medium_value cannot exceed high_value".into(),
            ));
        }

        for (name, v) in [
            ("high_value_multiplier", self.high_value_multiplier),
            ("medium_value_multiplier", self.medium_value_multiplier),
        ] {
            if !v.is_finite() || v <= 0.0 {
                return Err(DenialError::InvalidInput(format!(
                    "{name} must be a positive number, got {v}"
                )));
            }
        }

        Ok(())
    }

    /// Multiplier applied to the raw appeal probability for a claim of `value`.
    pub fn value_multiplier(&self, value: Money) -> f64 {
        if value > self.high_value {
            self.high_value_multiplier
        } else if value > self.medium_value {
            self.medium_value_multiplier
        } else {
            1.0
        }
    }
}

/// Core configuration resolved at startup.
#[derive(Clone, Debug)]
pub struct CoreConfig {
    thresholds: DenialThresholds,
    max_batch_size: usize,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            thresholds: DenialThresholds::default(),
            max_batch_size: DEFAULT_MAX_BATCH_SIZE,
        }
    }
}

impl CoreConfig {
    /// Create a new `CoreConfig`.
    ///
    /// # Errors
    ///
    /// Returns `DenialError::InvalidInput` if the thresholds are inconsistent or
    /// `max_batch_size` is zero.
    pub fn new(thresholds: DenialThresholds, max_batch_size: usize) -> DenialResult<Self> {
        thresholds.validate()?;

        if max_batch_size == 0 {
            return Err(DenialError::InvalidInput(
                "max_batch_size must be at least 1".into(),
            ));
        }

        Ok(Self {
            thresholds,
            max_batch_size,
        })
    }

    pub fn thresholds(&self) -> &DenialThresholds {
        &self.thresholds
    }

    pub fn max_batch_size(&self) -> usize {
        self.max_batch_size
    }
}

fn parse_f64(key: &str, value: Option<String>) -> DenialResult<Option<f64>> {
    let value = value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty());
    value
        .map(|v| {
            v.parse::<f64>()
                .map_err(|e| DenialError::InvalidInput(format!("{key}: {e}")))
        })
        .transpose()
}

/// Build `DenialThresholds` from optional environment values.
///
/// `lookup` receives each `DENIALS_*` key and returns its raw value, if any. Missing or
/// blank values fall back to the defaults. Dollar amounts are converted to cents.
///
/// # Errors
///
/// Returns `DenialError::InvalidInput` if a value cannot be parsed, or if the resulting
/// thresholds fail [`DenialThresholds::validate`].
pub fn thresholds_from_env_values(
    lookup: impl Fn(&str) -> Option<String>,
) -> DenialResult<DenialThresholds> {
    let mut t = DenialThresholds::default();

    if let Some(v) = parse_f64(ENV_HIGH_CONFIDENCE_THRESHOLD, lookup(ENV_HIGH_CONFIDENCE_THRESHOLD))? {
        t.high_confidence = v;
    }
    if let Some(v) = parse_f64(ENV_APPEAL_THRESHOLD, lookup(ENV_APPEAL_THRESHOLD))? {
        t.appeal_probability = v;
    }
    if let Some(v) = parse_f64(ENV_HIGH_VALUE_DOLLARS, lookup(ENV_HIGH_VALUE_DOLLARS))? {
        t.high_value = Money::from_dollars(v)?;
    }
    if let Some(v) = parse_f64(ENV_MEDIUM_VALUE_DOLLARS, lookup(ENV_MEDIUM_VALUE_DOLLARS))? {
        t.medium_value = Money::from_dollars(v)?;
    }
    if let Some(v) = parse_f64(ENV_HIGH_VALUE_MULTIPLIER, lookup(ENV_HIGH_VALUE_MULTIPLIER))? {
        t.high_value_multiplier = v;
    }
    if let Some(v) = parse_f64(ENV_MEDIUM_VALUE_MULTIPLIER, lookup(ENV_MEDIUM_VALUE_MULTIPLIER))? {
        t.medium_value_multiplier = v;
    }
    if let Some(v) = parse_f64(ENV_MIN_APPEAL_PROBABILITY, lookup(ENV_MIN_APPEAL_PROBABILITY))? {
        t.min_appeal_probability = v;
    }
    if let Some(v) = parse_f64(ENV_MAX_APPEAL_PROBABILITY, lookup(ENV_MAX_APPEAL_PROBABILITY))? {
        t.max_appeal_probability = v;
    }

    t.validate()?;
    Ok(t)
}

/// Parse the batch-size limit from an optional string value.
///
/// If `value` is `None` or empty/whitespace, returns the default limit.
pub fn max_batch_size_from_env_value(value: Option<String>) -> DenialResult<usize> {
    let value = value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty());
    let parsed = value
        .map(|v| {
            v.parse::<usize>()
                .map_err(|e| DenialError::InvalidInput(format!("{ENV_MAX_BATCH_SIZE}: {e}")))
        })
        .transpose()?;

    Ok(parsed.unwrap_or(DEFAULT_MAX_BATCH_SIZE))
}

/// Resolve the full `CoreConfig` from a key lookup, typically `|k| std::env::var(k).ok()`.
pub fn core_config_from_env_values(
    lookup: impl Fn(&str) -> Option<String>,
) -> DenialResult<CoreConfig> {
    let thresholds = thresholds_from_env_values(&lookup)?;
    let max_batch_size = max_batch_size_from_env_value(lookup(ENV_MAX_BATCH_SIZE))?;
    CoreConfig::new(thresholds, max_batch_size)
}
