//! X12 837P (professional claim) rendering.
//!
//! This is plain templating: one interchange, one functional group and one transaction set per
//! claim. The output is never parsed back or validated against the X12 implementation guide.
//! Free-text values are stripped of the delimiter characters before they are written.

use crate::models::{Claim, PayerConnection, Provider};
use crate::{DenialError, DenialResult};
use chrono::{DateTime, Utc};
use claims_types::Money;

const SEGMENT_TERMINATOR: char = '~';
const IMPLEMENTATION_REFERENCE: &str = "005010X222A1";
const TRANSACTION_CONTROL: &str = "0001";

/// Largest control number that fits the nine-digit ISA13 element.
pub const MAX_CONTROL_NUMBER: u32 = 999_999_999;

/// Removes X12 delimiters from a free-text element.
fn element(value: &str) -> String {
    value
        .chars()
        .filter(|c| !matches!(c, '*' | '~' | ':' | '^'))
        .collect::<String>()
        .trim()
        .to_string()
}

/// Left-justified, space-padded fixed-width ISA element.
fn fixed(value: &str, width: usize) -> String {
    let v: String = element(value).chars().take(width).collect();
    format!("{v:<width$}")
}

/// Interchange control number derived from a timestamp, wrapped into nine digits.
pub fn control_number_for(now: DateTime<Utc>) -> u32 {
    let wrapped = now.timestamp().rem_euclid(i64::from(MAX_CONTROL_NUMBER) + 1);
    u32::try_from(wrapped).unwrap_or(0)
}

fn amount(m: Money) -> String {
    format!("{}.{:02}", m.cents() / 100, m.cents() % 100)
}

/// Renders `claim` as an 837P interchange addressed to `payer`.
///
/// # Errors
///
/// Returns `DenialError::InvalidInput` if the payer connection is inactive, the claim has no
/// line items, or `control_number` does not fit in nine digits.
pub fn render_837p(
    claim: &Claim,
    provider: &Provider,
    payer: &PayerConnection,
    control_number: u32,
    now: DateTime<Utc>,
) -> DenialResult<String> {
    if !payer.active {
        return Err(DenialError::InvalidInput(format!(
            "payer connection {} is inactive",
            payer.payer_id
        )));
    }
    if claim.line_items.is_empty() {
        return Err(DenialError::InvalidInput(format!(
            "claim {} has no line items to submit",
            claim.id
        )));
    }
    if control_number > MAX_CONTROL_NUMBER {
        return Err(DenialError::InvalidInput(format!(
            "control number {control_number} exceeds nine digits"
        )));
    }

    let submitter = element(payer.submitter_id.as_str());
    let receiver = element(payer.receiver_id.as_str());
    let claim_id = element(claim.id.as_str());
    let provider_name = element(provider.name.as_str());
    let date6 = now.format("%y%m%d").to_string();
    let date8 = now.format("%Y%m%d").to_string();
    let time = now.format("%H%M").to_string();

    let mut transaction: Vec<String> = vec![
        format!("ST*837*{TRANSACTION_CONTROL}*{IMPLEMENTATION_REFERENCE}"),
        format!("BHT*0019*00*{claim_id}*{date8}*{time}*CH"),
        format!("NM1*41*2*{provider_name}*****46*{submitter}"),
        format!("NM1*40*2*{}*****46*{receiver}", element(payer.name.as_str())),
        format!("NM1*85*2*{provider_name}*****XX*{}", element(&provider.npi)),
        format!(
            "CLM*{claim_id}*{}***11:B:1*Y*A*Y*Y",
            amount(claim.total_charge())
        ),
    ];

    let diagnoses: Vec<String> = claim
        .diagnosis_codes()
        .into_iter()
        .map(|d| element(d).replace('.', ""))
        .filter(|d| !d.is_empty())
        .enumerate()
        .map(|(i, d)| {
            let qualifier = if i == 0 { "ABK" } else { "ABF" };
            format!("{qualifier}:{d}")
        })
        .collect();
    if !diagnoses.is_empty() {
        transaction.push(format!("HI*{}", diagnoses.join("*")));
    }

    let service_date = claim.service_date.format("%Y%m%d").to_string();
    for (i, line) in claim.line_items.iter().enumerate() {
        let mut procedure = format!("HC:{}", element(&line.procedure_code));
        for m in line.modifiers.iter().take(4) {
            procedure.push(':');
            procedure.push_str(&element(m));
        }
        transaction.push(format!("LX*{}", i + 1));
        transaction.push(format!(
            "SV1*{procedure}*{}*UN*{}***1",
            amount(line.charge),
            line.units
        ));
        transaction.push(format!("DTP*472*D8*{service_date}"));
    }

    // SE counts every segment from ST through SE inclusive.
    let segment_count = transaction.len() + 1;
    transaction.push(format!("SE*{segment_count}*{TRANSACTION_CONTROL}"));

    let mut segments = Vec::with_capacity(transaction.len() + 4);
    segments.push(format!(
        "ISA*00*{}*00*{}*ZZ*{}*ZZ*{}*{date6}*{time}*^*00501*{control_number:09}*0*P*:",
        " ".repeat(10),
        " ".repeat(10),
        fixed(&submitter, 15),
        fixed(&receiver, 15),
    ));
    segments.push(format!(
        "GS*HC*{submitter}*{receiver}*{date8}*{time}*{control_number}*X*{IMPLEMENTATION_REFERENCE}"
    ));
    segments.extend(transaction);
    segments.push(format!("GE*1*{control_number}"));
    segments.push(format!("IEA*1*{control_number:09}"));

    let mut out = segments.join(&SEGMENT_TERMINATOR.to_string());
    out.push(SEGMENT_TERMINATOR);
    Ok(out)
}
