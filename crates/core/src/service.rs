//! Denial resolution service.
//!
//! [`DenialService`] wires the pure pipeline stages to a [`ClaimsStore`]:
//!
//! ```text
//! claim id + denial reasons
//!   -> PatternCatalogue::identify
//!   -> generate_corrections          (per auto-correctible pattern rule)
//!   -> appeal_probability + recommend_actions
//!   -> DenialAnalysis
//! ```
//!
//! The service holds no global state. Config, catalogue and store are all injected, and each
//! call awaits its store reads one after another.

use crate::analytics::{summarise, DenialAnalytics};
use crate::config::CoreConfig;
use crate::constants::AUDIT_ACTION_CORRECTIONS_APPLIED;
use crate::corrections::{apply_to_claim, generate_corrections, AutoCorrection};
use crate::edi::render_837p;
use crate::models::{AuditEntry, Claim, DateRange};
use crate::patterns::{DenialPattern, PatternCatalogue};
use crate::recommendations::{appeal_probability, recommend_actions, RecommendedAction};
use crate::store::ClaimsStore;
use crate::validation::{ClaimValidation, ClaimValidator};
use crate::{DenialError, DenialResult};
use chrono::Utc;
use claims_types::Percentage;
use serde::Serialize;
use std::sync::Arc;

/// The combined result of analysing one denied claim.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct DenialAnalysis {
    pub claim_id: String,
    pub denial_reasons: Vec<String>,
    pub patterns: Vec<DenialPattern>,
    pub corrections: Vec<AutoCorrection>,
    pub recommended_actions: Vec<RecommendedAction>,
    /// `None` when no matched pattern carries a correction rule to score from.
    pub appeal_probability: Option<Percentage>,
}

/// Outcome of writing corrections back to a claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct AppliedCorrections {
    /// Corrections that changed the claim.
    pub applied: usize,
}

#[derive(Clone)]
pub struct DenialService {
    cfg: Arc<CoreConfig>,
    catalogue: Arc<PatternCatalogue>,
    store: Arc<dyn ClaimsStore>,
}

impl DenialService {
    pub fn new(
        cfg: Arc<CoreConfig>,
        catalogue: Arc<PatternCatalogue>,
        store: Arc<dyn ClaimsStore>,
    ) -> Self {
        Self {
            cfg,
            catalogue,
            store,
        }
    }

    pub fn config(&self) -> &CoreConfig {
        &self.cfg
    }

    pub fn catalogue(&self) -> &PatternCatalogue {
        &self.catalogue
    }

    async fn load_claim(&self, claim_id: &str) -> DenialResult<Claim> {
        self.store
            .find_claim(claim_id)
            .await?
            .ok_or_else(|| DenialError::ClaimNotFound(claim_id.to_string()))
    }

    /// Runs the full denial analysis for a claim.
    ///
    /// # Errors
    ///
    /// Returns `DenialError::ClaimNotFound` if the claim does not exist, or the store error if
    /// it cannot be read.
    pub async fn analyse_denial<S: AsRef<str>>(
        &self,
        claim_id: &str,
        denial_reasons: &[S],
    ) -> DenialResult<DenialAnalysis> {
        let claim = self.load_claim(claim_id).await?;
        Ok(self.analyse_claim(&claim, denial_reasons))
    }

    /// Runs the analysis on an already-loaded claim. Pure; touches no store.
    pub fn analyse_claim<S: AsRef<str>>(
        &self,
        claim: &Claim,
        denial_reasons: &[S],
    ) -> DenialAnalysis {
        let thresholds = self.cfg.thresholds();
        let value = claim.total_charge();

        let patterns = self.catalogue.identify(denial_reasons);
        let corrections = generate_corrections(claim, &patterns);
        let probability = appeal_probability(&patterns, value, thresholds);
        let recommended_actions = recommend_actions(&corrections, probability, value, thresholds);

        tracing::info!(
            "analysed denial for claim {}: {} patterns, {} corrections, {} actions, appeal probability {}",
            claim.id,
            patterns.len(),
            corrections.len(),
            recommended_actions.len(),
            probability.map_or_else(|| "unscoreable".to_string(), |p| p.to_string())
        );

        DenialAnalysis {
            claim_id: claim.id.to_string(),
            denial_reasons: denial_reasons
                .iter()
                .map(|r| r.as_ref().to_string())
                .collect(),
            patterns,
            corrections,
            recommended_actions,
            appeal_probability: probability,
        }
    }

    /// Writes corrections back to the claim, marks it auto-corrected, and records an audit entry.
    ///
    /// When no correction changes the claim, nothing is written and no audit entry is recorded.
    /// No rollback is attempted. If the claim update succeeds but the audit insert fails, the
    /// claim keeps its corrections and the call still reports failure.
    ///
    /// # Errors
    ///
    /// - `DenialError::InvalidInput` if a correction has a blank corrected value.
    /// - `DenialError::ClaimNotFound` if the claim does not exist.
    /// - `DenialError::CorrectionsNotApplied` for any store failure while reading or writing.
    pub async fn apply_corrections(
        &self,
        claim_id: &str,
        corrections: &[AutoCorrection],
    ) -> DenialResult<AppliedCorrections> {
        if let Some(blank) = corrections
            .iter()
            .find(|c| c.corrected_value.trim().is_empty())
        {
            return Err(DenialError::InvalidInput(format!(
                "correction for {} has a blank corrected value",
                blank.reason
            )));
        }

        let not_applied = |e: DenialError| {
            tracing::error!("applying corrections to claim {} failed: {}", claim_id, e);
            DenialError::CorrectionsNotApplied {
                claim_id: claim_id.to_string(),
                reason: e.to_string(),
            }
        };

        let mut claim = match self.load_claim(claim_id).await {
            Ok(c) => c,
            Err(e @ DenialError::ClaimNotFound(_)) => return Err(e),
            Err(e) => return Err(not_applied(e)),
        };

        let applied = apply_to_claim(&mut claim, corrections);
        if applied == 0 {
            tracing::info!(
                "none of {} corrections changed claim {}",
                corrections.len(),
                claim_id
            );
            return Ok(AppliedCorrections { applied });
        }

        self.store.update_claim(&claim).await.map_err(not_applied)?;

        let details = serde_json::json!({
            "applied": applied,
            "corrections": corrections,
        });
        self.store
            .insert_audit_entry(AuditEntry::new(
                claim.id.clone(),
                AUDIT_ACTION_CORRECTIONS_APPLIED,
                details,
            ))
            .await
            .map_err(not_applied)?;

        tracing::info!(
            "applied {} of {} corrections to claim {}",
            applied,
            corrections.len(),
            claim_id
        );
        Ok(AppliedCorrections { applied })
    }

    /// Aggregates stored denials whose date falls within `range`.
    pub async fn denial_analytics(&self, range: DateRange) -> DenialResult<DenialAnalytics> {
        let records = self.store.find_denials(range).await?;
        tracing::debug!(
            "summarising {} denials from {} to {}",
            records.len(),
            range.from(),
            range.to()
        );
        Ok(summarise(range, &records))
    }

    pub async fn validate_claim(&self, claim_id: &str) -> DenialResult<ClaimValidation> {
        ClaimValidator::new(self.store.clone()).validate(claim_id).await
    }

    /// Validates several claims concurrently, in input order.
    ///
    /// # Errors
    ///
    /// Returns `DenialError::InvalidInput` if the batch is empty or larger than the configured
    /// maximum.
    pub async fn validate_batch<S: AsRef<str> + Sync>(
        &self,
        claim_ids: &[S],
    ) -> DenialResult<Vec<ClaimValidation>> {
        if claim_ids.is_empty() {
            return Err(DenialError::InvalidInput("claim_ids cannot be empty".into()));
        }
        if claim_ids.len() > self.cfg.max_batch_size() {
            return Err(DenialError::InvalidInput(format!(
                "batch of {} claims exceeds maximum of {}",
                claim_ids.len(),
                self.cfg.max_batch_size()
            )));
        }
        Ok(ClaimValidator::new(self.store.clone())
            .validate_batch(claim_ids)
            .await)
    }

    /// Renders the claim as an 837P interchange for the given payer.
    ///
    /// # Errors
    ///
    /// Returns the relevant not-found error for a missing claim, provider or payer connection,
    /// and `DenialError::InvalidInput` if the payer is inactive or the claim is empty.
    pub async fn render_edi(
        &self,
        claim_id: &str,
        payer_id: &str,
        control_number: u32,
    ) -> DenialResult<String> {
        let claim = self.load_claim(claim_id).await?;
        let provider = self
            .store
            .find_provider(claim.provider_id.as_str())
            .await?
            .ok_or_else(|| DenialError::ProviderNotFound(claim.provider_id.to_string()))?;
        let payer = self
            .store
            .find_payer_connection(payer_id)
            .await?
            .ok_or_else(|| DenialError::PayerConnectionNotFound(payer_id.to_string()))?;

        render_837p(&claim, &provider, &payer, control_number, Utc::now())
    }
}
