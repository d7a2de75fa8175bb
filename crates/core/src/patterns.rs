//! Denial pattern catalogue and identification.
//!
//! A [`DenialPattern`] is reference data describing a recognised kind of payer rejection,
//! keyed by its denial code (for example `CO-97`). Patterns are immutable once the catalogue
//! is built. The catalogue is an ordinary value handed to the services that need it, so tests
//! and deployments can substitute their own.
//!
//! ## Matching
//!
//! [`PatternCatalogue::identify`] is a literal substring test: a pattern matches when its code
//! appears anywhere in any of the supplied denial-reason strings. There is no normalisation
//! (case, whitespace or punctuation) and no ranking; results keep catalogue order and each
//! pattern is reported at most once.

use crate::{DenialError, DenialResult};
use claims_types::{NonEmptyText, Percentage};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "snake_case")]
pub enum DenialCategory {
    Coding,
    Authorization,
    Eligibility,
    Documentation,
    Billing,
}

/// What a correction rule does when applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "snake_case")]
pub enum RuleAction {
    Recode,
    Modifier,
    Documentation,
    Resubmit,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct CorrectionRule {
    pub id: NonEmptyText,
    /// Human-readable condition under which the rule applies.
    pub condition: String,
    pub action: RuleAction,
    #[serde(default)]
    pub parameters: BTreeMap<String, String>,
    pub success_rate: Percentage,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct DenialPattern {
    pub id: NonEmptyText,
    pub denial_code: NonEmptyText,
    pub description: String,
    /// Observed number of denials carrying this code.
    #[serde(default)]
    pub frequency: u32,
    pub auto_correctible: bool,
    #[serde(default)]
    pub correction_rules: Vec<CorrectionRule>,
    pub category: DenialCategory,
}

impl DenialPattern {
    /// Success rate of the first rule, which stands for the pattern when scoring appeals.
    pub fn primary_success_rate(&self) -> Option<Percentage> {
        self.correction_rules.first().map(|r| r.success_rate)
    }
}

/// An ordered, immutable set of denial patterns with unique denial codes.
#[derive(Debug, Clone, PartialEq)]
pub struct PatternCatalogue {
    patterns: Vec<DenialPattern>,
}

impl PatternCatalogue {
    /// Builds a catalogue, rejecting duplicate denial codes.
    ///
    /// # Errors
    ///
    /// Returns `DenialError::InvalidInput` if two patterns share a denial code.
    pub fn new(patterns: Vec<DenialPattern>) -> DenialResult<Self> {
        let mut seen = HashSet::new();
        for p in &patterns {
            if !seen.insert(p.denial_code.as_str()) {
                return Err(DenialError::InvalidInput(format!(
                    "duplicate denial code in catalogue: {}",
                    p.denial_code
                )));
            }
        }
        Ok(Self { patterns })
    }

    /// Parses a catalogue from a YAML sequence of patterns.
    ///
    /// # Errors
    ///
    /// Returns `DenialError::YamlDeserialization` for malformed YAML or out-of-range values,
    /// and `DenialError::InvalidInput` for duplicate codes.
    pub fn from_yaml_str(yaml: &str) -> DenialResult<Self> {
        let patterns: Vec<DenialPattern> =
            serde_yaml::from_str(yaml).map_err(DenialError::YamlDeserialization)?;
        Self::new(patterns)
    }

    /// Loads a catalogue from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns `DenialError::FileRead` if the file cannot be read, otherwise as
    /// [`PatternCatalogue::from_yaml_str`].
    pub fn load_yaml_file(path: &std::path::Path) -> DenialResult<Self> {
        let yaml = std::fs::read_to_string(path).map_err(DenialError::FileRead)?;
        let catalogue = Self::from_yaml_str(&yaml)?;
        tracing::debug!(
            "loaded {} denial patterns from {}",
            catalogue.len(),
            path.display()
        );
        Ok(catalogue)
    }

    pub fn patterns(&self) -> &[DenialPattern] {
        &self.patterns
    }

    pub fn get(&self, denial_code: &str) -> Option<&DenialPattern> {
        self.patterns
            .iter()
            .find(|p| p.denial_code.as_str() == denial_code)
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Returns every pattern whose denial code occurs as a substring of any reason.
    pub fn identify<S: AsRef<str>>(&self, reasons: &[S]) -> Vec<DenialPattern> {
        self.patterns
            .iter()
            .filter(|p| {
                reasons
                    .iter()
                    .any(|r| r.as_ref().contains(p.denial_code.as_str()))
            })
            .cloned()
            .collect()
    }

    /// The built-in catalogue of common CARC denial codes.
    pub fn standard() -> Self {
        let patterns = vec![
            pattern(
                "bundled-service",
                "CO-97",
                "Benefit included in the payment for another service already adjudicated",
                142,
                true,
                DenialCategory::Coding,
                vec![rule(
                    "co97-distinct-procedure",
                    "Procedure is separately identifiable from the bundled service",
                    RuleAction::Modifier,
                    &[("modifier", "59")],
                    85.0,
                )],
            ),
            pattern(
                "missing-information",
                "CO-16",
                "Claim lacks information needed for adjudication",
                118,
                true,
                DenialCategory::Documentation,
                vec![
                    rule(
                        "co16-attach-information",
                        "Required claim field or attachment missing",
                        RuleAction::Documentation,
                        &[("document", "Attach missing claim information")],
                        78.0,
                    ),
                    rule(
                        "co16-resubmit",
                        "Information supplied after initial submission",
                        RuleAction::Resubmit,
                        &[],
                        70.0,
                    ),
                ],
            ),
            pattern(
                "diagnosis-inconsistent",
                "CO-11",
                "Diagnosis is inconsistent with the procedure",
                87,
                true,
                DenialCategory::Coding,
                vec![
                    rule(
                        "co11-recode-level",
                        "Service level not supported by the documented diagnosis",
                        RuleAction::Recode,
                        &[],
                        72.0,
                    ),
                    rule(
                        "co11-significant-em",
                        "Separate E/M performed on the same day as a procedure",
                        RuleAction::Modifier,
                        &[("modifier", "25")],
                        65.0,
                    ),
                ],
            ),
            pattern(
                "authorization-absent",
                "CO-197",
                "Precertification or authorization absent",
                64,
                false,
                DenialCategory::Authorization,
                vec![rule(
                    "co197-retro-authorization",
                    "Payer accepts retroactive authorization",
                    RuleAction::Documentation,
                    &[("document", "Request retroactive authorization")],
                    45.0,
                )],
            ),
            pattern(
                "coverage-terminated",
                "CO-27",
                "Expenses incurred after coverage terminated",
                41,
                false,
                DenialCategory::Eligibility,
                vec![rule(
                    "co27-verify-eligibility",
                    "Patient has other active coverage",
                    RuleAction::Resubmit,
                    &[],
                    30.0,
                )],
            ),
            pattern(
                "medical-necessity",
                "CO-50",
                "Service not deemed a medical necessity by the payer",
                56,
                false,
                DenialCategory::Documentation,
                vec![rule(
                    "co50-necessity-letter",
                    "Clinical records support necessity",
                    RuleAction::Documentation,
                    &[("document", "Submit letter of medical necessity with records")],
                    55.0,
                )],
            ),
            pattern(
                "duplicate-claim",
                "CO-18",
                "Exact duplicate claim or service",
                33,
                false,
                DenialCategory::Billing,
                vec![],
            ),
        ];

        Self { patterns }
    }
}

impl Default for PatternCatalogue {
    fn default() -> Self {
        Self::standard()
    }
}

fn text(s: &str) -> NonEmptyText {
    NonEmptyText::new(s).unwrap_or_else(|_| unreachable!("catalogue literals are non-empty"))
}

fn rule(
    id: &str,
    condition: &str,
    action: RuleAction,
    parameters: &[(&str, &str)],
    success_rate: f64,
) -> CorrectionRule {
    CorrectionRule {
        id: text(id),
        condition: condition.into(),
        action,
        parameters: parameters
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect(),
        success_rate: Percentage::clamped(success_rate),
    }
}

fn pattern(
    id: &str,
    denial_code: &str,
    description: &str,
    frequency: u32,
    auto_correctible: bool,
    category: DenialCategory,
    correction_rules: Vec<CorrectionRule>,
) -> DenialPattern {
    DenialPattern {
        id: text(id),
        denial_code: text(denial_code),
        description: description.into(),
        frequency,
        auto_correctible,
        correction_rules,
        category,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn codes(patterns: &[DenialPattern]) -> Vec<&str> {
        patterns.iter().map(|p| p.denial_code.as_str()).collect()
    }

    #[test]
    fn test_standard_catalogue_has_unique_codes() {
        let standard = PatternCatalogue::standard();
        let rebuilt = PatternCatalogue::new(standard.patterns().to_vec())
            .expect("standard catalogue should have unique codes");
        assert_eq!(rebuilt.len(), standard.len());
    }

    #[test]
    fn test_identify_matches_substring() {
        let catalogue = PatternCatalogue::standard();
        let found = catalogue.identify(&["Denied: CO-97 procedure bundled"]);
        assert_eq!(codes(&found), vec!["CO-97"]);
    }

    #[test]
    fn test_identify_reports_each_pattern_once() {
        let catalogue = PatternCatalogue::standard();
        let found = catalogue.identify(&["CO-97", "CO-97 again", "see CO-97 / CO-97"]);
        assert_eq!(codes(&found), vec!["CO-97"]);
    }

    #[test]
    fn test_identify_keeps_catalogue_order() {
        let catalogue = PatternCatalogue::standard();
        let found = catalogue.identify(&["CO-11 diagnosis", "CO-97 bundled", "CO-16 missing"]);
        assert_eq!(codes(&found), vec!["CO-97", "CO-16", "CO-11"]);
    }

    #[test]
    fn test_identify_is_case_sensitive() {
        let catalogue = PatternCatalogue::standard();
        assert!(catalogue.identify(&["co-97"]).is_empty());
    }

    #[test]
    fn test_identify_empty_input_returns_empty() {
        let catalogue = PatternCatalogue::standard();
        let none: [&str; 0] = [];
        assert!(catalogue.identify(&none).is_empty());
        assert!(catalogue.identify(&["no code here"]).is_empty());
    }

    #[test]
    fn test_new_rejects_duplicate_codes() {
        let p = PatternCatalogue::standard().patterns()[0].clone();
        let err = PatternCatalogue::new(vec![p.clone(), p]).expect_err("duplicates should fail");
        assert!(matches!(err, DenialError::InvalidInput(_)));
    }

    #[test]
    fn test_from_yaml_str_parses_patterns() {
        let yaml = r#"
- id: timely-filing
  denial_code: CO-29
  description: Time limit for filing has expired
  frequency: 12
  auto_correctible: false
  category: billing
  correction_rules:
    - id: co29-proof
      condition: Proof of timely filing exists
      action: documentation
      parameters:
        document: Attach clearinghouse acceptance report
      success_rate: 40
"#;
        let catalogue = PatternCatalogue::from_yaml_str(yaml).expect("yaml should parse");
        let p = catalogue.get("CO-29").expect("CO-29 should be present");
        assert_eq!(p.category, DenialCategory::Billing);
        assert_eq!(p.primary_success_rate().unwrap().value(), 40.0);
        assert_eq!(
            p.correction_rules[0].parameters.get("document").map(String::as_str),
            Some("Attach clearinghouse acceptance report")
        );
    }

    #[test]
    fn test_from_yaml_str_rejects_bad_success_rate() {
        let yaml = r#"
- id: x
  denial_code: CO-1
  description: d
  auto_correctible: true
  category: coding
  correction_rules:
    - id: r
      condition: c
      action: recode
      success_rate: 140
"#;
        let err = PatternCatalogue::from_yaml_str(yaml).expect_err("140% should be rejected");
        assert!(matches!(err, DenialError::YamlDeserialization(_)));
    }

    #[test]
    fn test_load_yaml_file_reads_catalogue() {
        let temp_dir = tempfile::TempDir::new().expect("Failed to create temp dir");
        let path = temp_dir.path().join("patterns.yaml");
        std::fs::write(
            &path,
            "- id: p\n  denial_code: PR-1\n  description: Deductible\n  auto_correctible: false\n  category: eligibility\n",
        )
        .expect("Failed to write catalogue");

        let catalogue = PatternCatalogue::load_yaml_file(&path).expect("file should load");
        assert_eq!(catalogue.len(), 1);
        assert!(catalogue.get("PR-1").unwrap().correction_rules.is_empty());

        let err = PatternCatalogue::load_yaml_file(&temp_dir.path().join("absent.yaml"))
            .expect_err("missing file should fail");
        assert!(matches!(err, DenialError::FileRead(_)));
    }
}
