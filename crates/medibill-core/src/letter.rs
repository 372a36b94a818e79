//! Appeal letter reformatting
//!
//! Models sometimes return the letter as one run-on block. These rules put
//! the usual letter landmarks (salutation, subject, claim fields, closing)
//! back on their own lines so the text reads and prints like a letter.

use std::sync::OnceLock;

use regex::Regex;

/// Ordered rewrite rules: (pattern, replacement)
fn rules() -> &'static [(Regex, &'static str)] {
    static RULES: OnceLock<Vec<(Regex, &'static str)>> = OnceLock::new();
    RULES.get_or_init(|| {
        [
            // Year glued to the next sentence ("2026Dear")
            (r"(\d{4})([A-Z])", "${1}\n\n${2}"),
            (r"(?i)(Dear\s+)", "\n\n${1}"),
            (r"(?i)(Subject:)", "\n\n${1}"),
            (r"(?i)(Subject:[^\n]+)", "${1}\n"),
            // Claim fields joined with commas
            (r"(?i),\s*(Patient:)", "\n${1}"),
            (r"(?i),\s*(Member ID:)", "\n${1}"),
            (r"(?i),\s*(Service Date:)", "\n${1}"),
            (r"(?i),\s*(Bill ID:)", "\n${1}"),
            (r"(?i),\s*(Claim ID:)", "\n${1}"),
            (r"(?i),\s*(Claim Number:)", "\n${1}"),
            (r"(?i),\s*(Date of Service:)", "\n${1}"),
            (r"(?i),\s*(Account Number:)", "\n${1}"),
            // ... or with dashes
            (r"(?i)-\s*(Patient:)", "\n${1}"),
            (r"(?i)-\s*(Member ID:)", "\n${1}"),
            (r"(?i)-\s*(Service Date:)", "\n${1}"),
            (r"(?i)-\s*(Bill ID:)", "\n${1}"),
            (r"(?i)(Sincerely|Respectfully|Best regards|Thank you)", "\n\n${1}"),
            (
                r"(?i)\.\s*(I am writing|I request|I expect|Please|Furthermore|Additionally|Moreover)",
                ".\n\n${1}",
            ),
            (r"\n{3,}", "\n\n"),
        ]
        .into_iter()
        .map(|(pattern, replacement)| (Regex::new(pattern).expect("valid regex"), replacement))
        .collect()
    })
}

/// Reformat raw letter text into paragraphs separated by blank lines
pub fn format_letter_as_text(raw: &str) -> String {
    let formatted = rules()
        .iter()
        .fold(raw.to_string(), |text, (re, replacement)| {
            re.replace_all(&text, *replacement).into_owned()
        });
    formatted.trim().to_string()
}

/// Split text on blank lines into trimmed, non-empty paragraphs
pub fn letter_paragraphs(text: &str) -> Vec<String> {
    text.split("\n\n")
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect()
}
