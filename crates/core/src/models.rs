//! Typed records exchanged with the claims store.
//!
//! These replace the loosely-shaped rows a hosted database client would hand back. Every field
//! is explicit; optional data is `#[serde(default)]` so older snapshots still load, while
//! money and identifiers are validated on the way in.

use chrono::{DateTime, NaiveDate, Utc};
use claims_types::{Money, NonEmptyText};
use serde::{Deserialize, Serialize};

/// Where a claim is in its processing lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "snake_case")]
pub enum ProcessingStatus {
    #[default]
    Pending,
    Submitted,
    Denied,
    AutoCorrected,
    Resubmitted,
    Paid,
}

/// A single billed service on a claim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ClaimLineItem {
    pub id: NonEmptyText,
    pub procedure_code: String,
    #[serde(default)]
    pub modifiers: Vec<String>,
    #[serde(default)]
    pub diagnosis_codes: Vec<String>,
    #[serde(default = "default_units")]
    pub units: u32,
    pub charge: Money,
}

fn default_units() -> u32 {
    1
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct Claim {
    pub id: NonEmptyText,
    pub patient_id: NonEmptyText,
    pub provider_id: NonEmptyText,
    pub payer_id: NonEmptyText,
    pub service_date: NaiveDate,
    #[serde(default)]
    pub line_items: Vec<ClaimLineItem>,
    #[serde(default)]
    pub processing_status: ProcessingStatus,
    #[serde(default)]
    pub notes: Vec<String>,
}

impl Claim {
    /// Total billed value: the sum of line-item charges.
    pub fn total_charge(&self) -> Money {
        self.line_items.iter().map(|l| l.charge).sum()
    }

    /// The first line item, which auto-correction treats as the primary service.
    pub fn primary_line(&self) -> Option<&ClaimLineItem> {
        self.line_items.first()
    }

    /// All distinct diagnosis codes across line items, in first-seen order.
    pub fn diagnosis_codes(&self) -> Vec<&str> {
        let mut out: Vec<&str> = Vec::new();
        for code in self.line_items.iter().flat_map(|l| l.diagnosis_codes.iter()) {
            if !out.contains(&code.as_str()) {
                out.push(code);
            }
        }
        out
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Provider {
    pub id: NonEmptyText,
    pub name: NonEmptyText,
    pub npi: String,
}

/// Connection details for submitting to a payer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PayerConnection {
    pub payer_id: NonEmptyText,
    pub name: NonEmptyText,
    pub submitter_id: NonEmptyText,
    pub receiver_id: NonEmptyText,
    #[serde(default = "default_active")]
    pub active: bool,
}

/// Reference entry from the billing-codes table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BillingCode {
    pub code: NonEmptyText,
    pub description: String,
    pub default_fee: Money,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

/// A historical denial, as used for reporting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DenialRecord {
    pub id: NonEmptyText,
    pub claim_id: NonEmptyText,
    pub reason: String,
    pub amount: Money,
    pub denial_date: NaiveDate,
    #[serde(default)]
    pub auto_correctible: bool,
    /// Whether an auto-correction for this denial was applied and accepted.
    #[serde(default)]
    pub auto_corrected: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: uuid::Uuid,
    pub claim_id: NonEmptyText,
    pub action: String,
    pub details: serde_json::Value,
    pub recorded_at: DateTime<Utc>,
}

impl AuditEntry {
    pub fn new(
        claim_id: NonEmptyText,
        action: impl Into<String>,
        details: serde_json::Value,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4(),
            claim_id,
            action: action.into(),
            details,
            recorded_at: Utc::now(),
        }
    }
}

/// Inclusive date range used to select denial records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct DateRange {
    from: NaiveDate,
    to: NaiveDate,
}

impl DateRange {
    /// # Errors
    ///
    /// Returns `DenialError::InvalidInput` if `from` is after `to`.
    pub fn new(from: NaiveDate, to: NaiveDate) -> crate::DenialResult<Self> {
        if from > to {
            return Err(crate::DenialError::InvalidInput(format!(
                "date range start {from} is after end {to}"
            )));
        }
        Ok(Self { from, to })
    }

    pub fn from(&self) -> NaiveDate {
        self.from
    }

    pub fn to(&self) -> NaiveDate {
        self.to
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.from <= date && date <= self.to
    }
}
