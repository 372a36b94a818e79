//! Domain models for MediBill

use serde::{Deserialize, Serialize};

/// Normalized result of analyzing one medical bill
///
/// Invariants (enforced by [`crate::analysis::normalize_response`]):
/// - `0 <= potential_money_back <= total_billed_amount`
/// - `0 <= percentage <= 90`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    /// Drafted outreach email text
    pub email: String,
    /// Drafted appeal letter text
    pub appeal: String,
    /// Estimated amount the patient could recover, in dollars
    pub potential_money_back: f64,
    /// Estimated win probability, in whole percentage points
    pub percentage: u32,
    /// Total billed on the document before adjustments, in dollars
    pub total_billed_amount: f64,
}

/// Authenticated account as seen by callers (never carries the password hash)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: String,
}
