//! Pre-submission claim validation.
//!
//! A claim is run through a fixed set of independent checks. Problems the checks find are
//! returned as [`ValidationIssue`] data with a severity, and the caller decides whether to block
//! on them. If a check cannot complete, for example because the store errors, the failure is
//! logged and reported as a high-severity issue. The claim is then marked invalid and the
//! confidence is capped, but the other checks still run.
//!
//! All checks for one claim run concurrently, and so do the claims in a batch. Results are
//! matched to their inputs by position.

use crate::constants::{EXCESSIVE_CHARGE_MULTIPLE, FAILED_CHECK_CONFIDENCE};
use crate::models::Claim;
use crate::store::ClaimsStore;
use crate::{DenialError, DenialResult};
use claims_types::Percentage;
use serde::Serialize;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    /// Confidence points deducted for one issue of this severity.
    fn penalty(self) -> f64 {
        match self {
            Severity::Low => 5.0,
            Severity::Medium => 10.0,
            Severity::High => 25.0,
            Severity::Critical => 40.0,
        }
    }

    /// Whether an issue of this severity makes the claim invalid.
    pub fn is_blocking(self) -> bool {
        self >= Severity::High
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ValidationIssue {
    pub severity: Severity,
    pub field: String,
    pub message: String,
}

impl ValidationIssue {
    fn new(severity: Severity, field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity,
            field: field.into(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ClaimValidation {
    pub claim_id: String,
    pub valid: bool,
    pub confidence: Percentage,
    pub issues: Vec<ValidationIssue>,
}

impl ClaimValidation {
    /// The result reported for a claim that could not be validated at all.
    fn unavailable(claim_id: &str, err: &DenialError) -> Self {
        Self {
            claim_id: claim_id.to_string(),
            valid: false,
            confidence: Percentage::ZERO,
            issues: vec![ValidationIssue::new(
                Severity::Critical,
                "claim",
                format!("claim could not be validated: {err}"),
            )],
        }
    }

    pub fn highest_severity(&self) -> Option<Severity> {
        self.issues.iter().map(|i| i.severity).max()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Check {
    LineItems,
    ProcedureCodes,
    Charges,
    DiagnosisCodes,
    ProviderNpi,
}

impl Check {
    fn name(self) -> &'static str {
        match self {
            Check::LineItems => "line_items",
            Check::ProcedureCodes => "procedure_codes",
            Check::Charges => "charges",
            Check::DiagnosisCodes => "diagnosis_codes",
            Check::ProviderNpi => "provider_npi",
        }
    }
}

struct CheckOutcome {
    issues: Vec<ValidationIssue>,
    failed: bool,
}

impl CheckOutcome {
    fn from_result(claim_id: &str, check: Check, result: DenialResult<Vec<ValidationIssue>>) -> Self {
        match result {
            Ok(issues) => Self {
                issues,
                failed: false,
            },
            Err(e) => {
                tracing::warn!(
                    "validation check {} failed for claim {}: {}",
                    check.name(),
                    claim_id,
                    e
                );
                Self {
                    issues: vec![ValidationIssue::new(
                        Severity::High,
                        check.name(),
                        format!("check could not be completed: {e}"),
                    )],
                    failed: true,
                }
            }
        }
    }
}

/// Runs validation checks against claims in a [`ClaimsStore`].
#[derive(Clone)]
pub struct ClaimValidator {
    store: Arc<dyn ClaimsStore>,
}

impl ClaimValidator {
    pub fn new(store: Arc<dyn ClaimsStore>) -> Self {
        Self { store }
    }

    /// Loads and validates one claim.
    ///
    /// # Errors
    ///
    /// Returns `DenialError::ClaimNotFound` if the claim does not exist, or the store error if
    /// the claim cannot be read. Failures inside individual checks are not errors.
    pub async fn validate(&self, claim_id: &str) -> DenialResult<ClaimValidation> {
        let claim = self
            .store
            .find_claim(claim_id)
            .await?
            .ok_or_else(|| DenialError::ClaimNotFound(claim_id.to_string()))?;
        Ok(self.validate_claim(&claim).await)
    }

    /// Validates every claim concurrently, returning results in input order.
    ///
    /// A claim that cannot be loaded yields an invalid, zero-confidence result instead of
    /// failing the batch.
    pub async fn validate_batch<S: AsRef<str>>(&self, claim_ids: &[S]) -> Vec<ClaimValidation> {
        let futures = claim_ids.iter().map(|id| async move {
            let id = id.as_ref();
            match self.validate(id).await {
                Ok(v) => v,
                Err(e) => {
                    tracing::warn!("batch validation could not load claim {}: {}", id, e);
                    ClaimValidation::unavailable(id, &e)
                }
            }
        });
        futures::future::join_all(futures).await
    }

    /// Runs all checks on an already-loaded claim.
    pub async fn validate_claim(&self, claim: &Claim) -> ClaimValidation {
        let claim_id = claim.id.as_str();

        let (line_items, procedure_codes, charges, diagnosis_codes, provider_npi) = futures::join!(
            async { Ok::<_, DenialError>(check_line_items(claim)) },
            self.check_procedure_codes(claim),
            self.check_charges(claim),
            async { Ok::<_, DenialError>(check_diagnosis_codes(claim)) },
            self.check_provider_npi(claim),
        );

        let outcomes = [
            CheckOutcome::from_result(claim_id, Check::LineItems, line_items),
            CheckOutcome::from_result(claim_id, Check::ProcedureCodes, procedure_codes),
            CheckOutcome::from_result(claim_id, Check::Charges, charges),
            CheckOutcome::from_result(claim_id, Check::DiagnosisCodes, diagnosis_codes),
            CheckOutcome::from_result(claim_id, Check::ProviderNpi, provider_npi),
        ];

        let any_failed = outcomes.iter().any(|o| o.failed);
        let issues: Vec<ValidationIssue> = outcomes.into_iter().flat_map(|o| o.issues).collect();

        let penalty: f64 = issues.iter().map(|i| i.severity.penalty()).sum();
        let mut confidence = Percentage::clamped(100.0 - penalty);
        if any_failed && confidence.value() > FAILED_CHECK_CONFIDENCE {
            confidence = Percentage::clamped(FAILED_CHECK_CONFIDENCE);
        }

        let valid = !issues.iter().any(|i| i.severity.is_blocking());

        tracing::debug!(
            "validated claim {}: valid={} issues={} confidence={}",
            claim_id,
            valid,
            issues.len(),
            confidence
        );

        ClaimValidation {
            claim_id: claim_id.to_string(),
            valid,
            confidence,
            issues,
        }
    }

    async fn check_procedure_codes(&self, claim: &Claim) -> DenialResult<Vec<ValidationIssue>> {
        let mut issues = Vec::new();
        for (i, line) in claim.line_items.iter().enumerate() {
            let field = format!("line_items[{i}].procedure_code");
            match self.store.find_billing_code(&line.procedure_code).await? {
                None => issues.push(ValidationIssue::new(
                    Severity::High,
                    field,
                    format!("procedure code {} is not a known billing code", line.procedure_code),
                )),
                Some(code) if !code.active => issues.push(ValidationIssue::new(
                    Severity::High,
                    field,
                    format!("procedure code {} is inactive", line.procedure_code),
                )),
                Some(_) => {}
            }
        }
        Ok(issues)
    }

    async fn check_charges(&self, claim: &Claim) -> DenialResult<Vec<ValidationIssue>> {
        let mut issues = Vec::new();
        for (i, line) in claim.line_items.iter().enumerate() {
            let field = format!("line_items[{i}].charge");
            if line.charge.is_zero() {
                issues.push(ValidationIssue::new(Severity::High, field, "charge is zero"));
                continue;
            }

            // Unknown codes are reported by the procedure code check.
            let Some(code) = self.store.find_billing_code(&line.procedure_code).await? else {
                continue;
            };

            let ceiling = code
                .default_fee
                .cents()
                .saturating_mul(u64::from(line.units.max(1)))
                .saturating_mul(EXCESSIVE_CHARGE_MULTIPLE);
            if line.charge.cents() > ceiling {
                issues.push(ValidationIssue::new(
                    Severity::Medium,
                    field,
                    format!(
                        "charge {} exceeds {}x the default fee of {}",
                        line.charge, EXCESSIVE_CHARGE_MULTIPLE, code.default_fee
                    ),
                ));
            }
        }
        Ok(issues)
    }

    async fn check_provider_npi(&self, claim: &Claim) -> DenialResult<Vec<ValidationIssue>> {
        let provider = self.store.find_provider(claim.provider_id.as_str()).await?;
        let issue = match provider {
            None => Some(ValidationIssue::new(
                Severity::Critical,
                "provider_id",
                format!("provider {} not found", claim.provider_id),
            )),
            Some(p) if !is_valid_npi(&p.npi) => Some(ValidationIssue::new(
                Severity::Critical,
                "provider.npi",
                "NPI must be exactly 10 digits",
            )),
            Some(_) => None,
        };
        Ok(issue.into_iter().collect())
    }
}

fn check_line_items(claim: &Claim) -> Vec<ValidationIssue> {
    if claim.line_items.is_empty() {
        vec![ValidationIssue::new(
            Severity::Critical,
            "line_items",
            "claim has no line items",
        )]
    } else {
        Vec::new()
    }
}

fn check_diagnosis_codes(claim: &Claim) -> Vec<ValidationIssue> {
    claim
        .line_items
        .iter()
        .enumerate()
        .filter(|(_, l)| l.diagnosis_codes.iter().all(|d| d.trim().is_empty()))
        .map(|(i, _)| {
            ValidationIssue::new(
                Severity::High,
                format!("line_items[{i}].diagnosis_codes"),
                "line item has no diagnosis code",
            )
        })
        .collect()
}

pub fn is_valid_npi(npi: &str) -> bool {
    npi.len() == 10 && npi.bytes().all(|b| b.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::fixtures::{billing_code, claim, line, provider};
    use crate::models::{
        AuditEntry, BillingCode, DateRange, DenialRecord, PayerConnection, Provider,
    };
    use crate::store::{InMemoryStore, StoreSnapshot};
    use async_trait::async_trait;

    fn store_with(claims: Vec<Claim>, npi: &str) -> Arc<dyn ClaimsStore> {
        Arc::new(InMemoryStore::from_snapshot(StoreSnapshot {
            claims,
            providers: vec![provider(npi)],
            billing_codes: vec![
                billing_code("99214", 15_000, true),
                billing_code("99215", 20_000, true),
                billing_code("90000", 5_000, false),
            ],
            ..Default::default()
        }))
    }

    /// Store whose billing-code lookups always fail.
    struct FailingCodes(InMemoryStore);

    #[async_trait]
    impl ClaimsStore for FailingCodes {
        async fn find_claim(&self, id: &str) -> DenialResult<Option<Claim>> {
            self.0.find_claim(id).await
        }
        async fn update_claim(&self, claim: &Claim) -> DenialResult<()> {
            self.0.update_claim(claim).await
        }
        async fn find_provider(&self, id: &str) -> DenialResult<Option<Provider>> {
            self.0.find_provider(id).await
        }
        async fn find_payer_connection(&self, id: &str) -> DenialResult<Option<PayerConnection>> {
            self.0.find_payer_connection(id).await
        }
        async fn find_billing_code(&self, _code: &str) -> DenialResult<Option<BillingCode>> {
            Err(DenialError::Store("billing codes unavailable".into()))
        }
        async fn find_denials(&self, range: DateRange) -> DenialResult<Vec<DenialRecord>> {
            self.0.find_denials(range).await
        }
        async fn insert_audit_entry(&self, entry: AuditEntry) -> DenialResult<()> {
            self.0.insert_audit_entry(entry).await
        }
    }

    #[tokio::test]
    async fn test_clean_claim_is_valid() {
        let store = store_with(vec![claim("c1", vec![line("l1", "99214", 15_000)])], "1234567890");
        let v = ClaimValidator::new(store).validate("c1").await.unwrap();

        assert!(v.valid);
        assert!(v.issues.is_empty());
        assert_eq!(v.confidence, Percentage::FULL);
    }

    #[tokio::test]
    async fn test_missing_claim_is_not_found() {
        let store = store_with(vec![], "1234567890");
        let err = ClaimValidator::new(store)
            .validate("missing")
            .await
            .expect_err("should be not found");
        assert!(matches!(err, DenialError::ClaimNotFound(_)));
    }

    #[tokio::test]
    async fn test_empty_claim_and_bad_npi_are_critical() {
        let store = store_with(vec![claim("c1", vec![])], "12345");
        let v = ClaimValidator::new(store).validate("c1").await.unwrap();

        assert!(!v.valid);
        assert_eq!(v.highest_severity(), Some(Severity::Critical));
        assert_eq!(v.issues.len(), 2);
        assert_eq!(v.confidence.value(), 20.0);
    }

    #[tokio::test]
    async fn test_unknown_inactive_and_excessive_codes() {
        let mut no_dx = line("l3", "99215", 20_000);
        no_dx.diagnosis_codes.clear();
        let c = claim(
            "c1",
            vec![
                line("l1", "12345", 1_000),
                line("l2", "90000", 16_000),
                no_dx,
            ],
        );
        let store = store_with(vec![c], "1234567890");
        let v = ClaimValidator::new(store).validate("c1").await.unwrap();

        let fields: Vec<&str> = v.issues.iter().map(|i| i.field.as_str()).collect();
        assert_eq!(
            fields,
            vec![
                "line_items[0].procedure_code",
                "line_items[1].procedure_code",
                "line_items[1].charge",
                "line_items[2].diagnosis_codes",
            ]
        );
        assert_eq!(v.issues[2].severity, Severity::Medium);
        assert!(!v.valid);
    }

    #[tokio::test]
    async fn test_zero_charge_is_high() {
        let store = store_with(vec![claim("c1", vec![line("l1", "99214", 0)])], "1234567890");
        let v = ClaimValidator::new(store).validate("c1").await.unwrap();
        assert_eq!(v.issues.len(), 1);
        assert_eq!(v.issues[0].severity, Severity::High);
        assert_eq!(v.confidence.value(), 75.0);
    }

    #[tokio::test]
    async fn test_failing_check_is_converted_to_issue() {
        let inner = InMemoryStore::from_snapshot(StoreSnapshot {
            claims: vec![claim("c1", vec![line("l1", "99214", 15_000)])],
            providers: vec![provider("1234567890")],
            ..Default::default()
        });
        let store: Arc<dyn ClaimsStore> = Arc::new(FailingCodes(inner));
        let v = ClaimValidator::new(store).validate("c1").await.unwrap();

        assert!(!v.valid);
        assert!(v.confidence.value() <= FAILED_CHECK_CONFIDENCE);
        let fields: Vec<&str> = v.issues.iter().map(|i| i.field.as_str()).collect();
        assert_eq!(fields, vec!["procedure_codes", "charges"]);
    }

    #[tokio::test]
    async fn test_batch_keeps_input_order_and_isolates_failures() {
        let store = store_with(
            vec![
                claim("c1", vec![line("l1", "99214", 15_000)]),
                claim("c2", vec![]),
            ],
            "1234567890",
        );
        let results = ClaimValidator::new(store)
            .validate_batch(&["c2", "missing", "c1"])
            .await;

        let ids: Vec<&str> = results.iter().map(|r| r.claim_id.as_str()).collect();
        assert_eq!(ids, vec!["c2", "missing", "c1"]);
        assert!(!results[0].valid);
        assert!(!results[1].valid);
        assert_eq!(results[1].confidence, Percentage::ZERO);
        assert!(results[2].valid);
    }

    #[test]
    fn test_is_valid_npi() {
        assert!(is_valid_npi("1234567890"));
        assert!(!is_valid_npi("123456789"));
        assert!(!is_valid_npi("12345678ab"));
    }
}
