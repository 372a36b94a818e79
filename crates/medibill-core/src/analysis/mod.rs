//! Bill analysis pipeline pieces
//!
//! - [`request`]: instruction text + response schema for one document
//! - [`normalize`]: untrusted model output to a validated [`crate::models::AnalysisResult`]

pub mod normalize;
pub mod request;

pub use normalize::{normalize_percentage, normalize_response, normalize_value, renormalize};
pub use request::{build_request, response_schema, AnalysisRequest, RESPONSE_FIELDS};
