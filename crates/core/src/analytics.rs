//! Denial reporting aggregates.
//!
//! [`summarise`] folds a materialised set of denial records into totals and two groupings,
//! one by reason and one by calendar month. Both groupings partition the input, so their
//! counts and amounts always add up to the overall totals.

use crate::models::{DateRange, DenialRecord};
use chrono::Datelike;
use claims_types::{Money, Percentage};
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct DenialBucket {
    pub count: u64,
    pub amount: Money,
}

impl DenialBucket {
    fn add(&mut self, amount: Money) {
        self.count += 1;
        self.amount = self.amount + amount;
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct DenialAnalytics {
    pub range: DateRange,
    pub total_denials: u64,
    pub total_denied_amount: Money,
    pub auto_correctible_count: u64,
    pub auto_corrected_count: u64,
    /// Share of auto-correctible denials whose correction succeeded; zero when there are none.
    pub auto_correct_success_rate: Percentage,
    pub by_reason: BTreeMap<String, DenialBucket>,
    /// Keyed by `YYYY-MM`.
    pub by_month: BTreeMap<String, DenialBucket>,
}

/// Month key for a denial date, e.g. `2024-03`.
pub fn month_key(date: chrono::NaiveDate) -> String {
    format!("{:04}-{:02}", date.year(), date.month())
}

pub fn summarise(range: DateRange, records: &[DenialRecord]) -> DenialAnalytics {
    let mut total = DenialBucket::default();
    let mut auto_correctible_count = 0u64;
    let mut auto_corrected_count = 0u64;
    let mut by_reason: BTreeMap<String, DenialBucket> = BTreeMap::new();
    let mut by_month: BTreeMap<String, DenialBucket> = BTreeMap::new();

    for r in records {
        total.add(r.amount);

        if r.auto_correctible {
            auto_correctible_count += 1;
            if r.auto_corrected {
                auto_corrected_count += 1;
            }
        }

        by_reason.entry(r.reason.clone()).or_default().add(r.amount);
        by_month
            .entry(month_key(r.denial_date))
            .or_default()
            .add(r.amount);
    }

    let auto_correct_success_rate = if auto_correctible_count == 0 {
        Percentage::ZERO
    } else {
        Percentage::clamped(auto_corrected_count as f64 / auto_correctible_count as f64 * 100.0)
    };

    DenialAnalytics {
        range,
        total_denials: total.count,
        total_denied_amount: total.amount,
        auto_correctible_count,
        auto_corrected_count,
        auto_correct_success_rate,
        by_reason,
        by_month,
    }
}
