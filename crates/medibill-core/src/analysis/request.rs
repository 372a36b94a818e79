//! Analysis request builder
//!
//! Produces the instruction text and the declared output schema for one
//! bill. Nothing is extracted from the document locally; dates, codes,
//! identities and amounts are all left to the model.

use std::collections::HashMap;

use chrono::NaiveDate;
use serde_json::{json, Value};

use crate::document::{EncodedDocument, UploadedDocument};
use crate::error::Result;
use crate::prompts::{PromptId, PromptLibrary};

/// Fields the model must return, all required and non-nullable
pub const RESPONSE_FIELDS: [&str; 5] = [
    "email",
    "appeal",
    "potential_money_back",
    "percentage",
    "total_billed_amount",
];

/// One multi-part request: instruction text plus the inline document
#[derive(Debug, Clone)]
pub struct AnalysisRequest {
    /// Role/system instruction, when the prompt defines one
    pub system_instruction: Option<String>,
    /// Rendered user instruction
    pub prompt: String,
    /// Declared output schema (OpenAPI subset understood by Gemini)
    pub schema: Value,
    pub document: EncodedDocument,
}

/// Build the request for `document` as of `today`
pub fn build_request(
    prompts: &mut PromptLibrary,
    document: &UploadedDocument,
    today: NaiveDate,
) -> Result<AnalysisRequest> {
    let template = prompts.get(PromptId::AnalyzeBill)?;

    let date = today.format("%Y-%m-%d").to_string();
    let mut vars = HashMap::new();
    vars.insert("date", date.as_str());

    Ok(AnalysisRequest {
        system_instruction: template.system_section().map(str::to_string),
        prompt: template.render_user(&vars),
        schema: response_schema(),
        document: document.encode(),
    })
}

/// Output schema with the five required fields
pub fn response_schema() -> Value {
    json!({
        "description": "Medical bill analysis for insurance appeal",
        "type": "OBJECT",
        "properties": {
            "email": {
                "type": "STRING",
                "description": "A professional email draft to the insurance company or provider regarding the claim.",
                "nullable": false
            },
            "appeal": {
                "type": "STRING",
                "description": "A formal appeal letter citing specific codes and dates from the document, with explicit line breaks between line-level fields.",
                "nullable": false
            },
            "potential_money_back": {
                "type": "NUMBER",
                "description": "Estimated dollar amount the patient could save or be reimbursed, as a plain number.",
                "nullable": false
            },
            "percentage": {
                "type": "NUMBER",
                "description": "Probability in whole percentage points (0-90) that the appeal is won.",
                "nullable": false
            },
            "total_billed_amount": {
                "type": "NUMBER",
                "description": "The total amount billed on the document before any adjustments or appeals.",
                "nullable": false
            }
        },
        "required": RESPONSE_FIELDS,
    })
}
