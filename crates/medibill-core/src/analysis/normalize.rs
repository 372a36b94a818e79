//! Response validation and normalization
//!
//! The model's JSON is treated as an untrusted, partially-typed record: every
//! field is coerced explicitly and the numeric fields are clamped so that
//! `0 <= potential_money_back <= total_billed_amount` and
//! `0 <= percentage <= 90` always hold on the way out.

use serde_json::{Map, Value};
use tracing::error;

use crate::error::{Error, Result};
use crate::models::AnalysisResult;

/// Highest win probability ever reported; certainty is never claimed
pub const MAX_WIN_PERCENTAGE: f64 = 90.0;

/// Values above this are read as scaled percentages (8500 meaning 85)
const SCALED_PERCENTAGE_THRESHOLD: f64 = 100.0;

/// Parse raw model text and normalize it into an [`AnalysisResult`]
///
/// Fails with [`Error::InvalidResponseFormat`] (carrying the raw text) when the
/// text is not JSON. The raw text is logged here and must not reach clients.
pub fn normalize_response(raw: &str) -> Result<AnalysisResult> {
    let parsed: Value = serde_json::from_str(raw).map_err(|e| {
        error!(error = %e, raw = %raw, "AI response was not valid JSON");
        Error::InvalidResponseFormat(raw.to_string())
    })?;

    Ok(normalize_value(&parsed))
}

/// Normalize an already-parsed record
///
/// Anything other than a JSON object yields the all-defaults result.
pub fn normalize_value(value: &Value) -> AnalysisResult {
    let empty = Map::new();
    let record = value.as_object().unwrap_or(&empty);

    let percentage = normalize_percentage(coerce_number(record.get("percentage")));

    let total_billed_amount = coerce_number(record.get("total_billed_amount")).max(0.0);
    let potential_money_back = coerce_number(record.get("potential_money_back"))
        .max(0.0)
        .min(total_billed_amount);

    AnalysisResult {
        email: coerce_text(record.get("email")),
        appeal: coerce_text(record.get("appeal")),
        potential_money_back,
        percentage,
        total_billed_amount,
    }
}

/// Apply the percentage rules in order: scaled-value heuristic, clamp, round
///
/// The heuristic divides anything above 100 by 100 and caps the quotient at
/// 90, so 8500 becomes 85 but 150 becomes 1.5 and then rounds to 2.
pub fn normalize_percentage(raw: f64) -> u32 {
    let mut pct = raw;
    if pct > SCALED_PERCENTAGE_THRESHOLD {
        pct = (pct / 100.0).min(MAX_WIN_PERCENTAGE);
    }
    pct = pct.clamp(0.0, MAX_WIN_PERCENTAGE);
    // Non-negative here, so round-half-away-from-zero matches round-half-up
    pct.round() as u32
}

/// Re-apply the invariants to an existing result
///
/// Idempotent: a result that already satisfies the invariants comes back
/// unchanged.
pub fn renormalize(result: &AnalysisResult) -> AnalysisResult {
    let total_billed_amount = sanitize(result.total_billed_amount).max(0.0);
    AnalysisResult {
        email: result.email.clone(),
        appeal: result.appeal.clone(),
        potential_money_back: sanitize(result.potential_money_back)
            .max(0.0)
            .min(total_billed_amount),
        percentage: normalize_percentage(f64::from(result.percentage)),
        total_billed_amount,
    }
}

/// Coerce a JSON value to a finite number, defaulting to 0
///
/// Only plain numeric strings are read ("1200", " 42.5 "); anything with a
/// currency symbol, separator or unit is non-numeric.
fn coerce_number(value: Option<&Value>) -> f64 {
    let number = match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    sanitize(number.unwrap_or(0.0))
}

fn sanitize(n: f64) -> f64 {
    if n.is_finite() {
        n
    } else {
        0.0
    }
}

fn coerce_text(value: Option<&Value>) -> String {
    value
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_default()
}
