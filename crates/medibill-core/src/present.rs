//! Presentation derivations for analysis results
//!
//! Everything a results view shows is derived here from one
//! [`AnalysisResult`]: KPI tiles, the billed-vs-savings comparison, the
//! reflowed letter, and the mail compose handoff.

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::Serialize;

use crate::letter::{format_letter_as_text, letter_paragraphs};
use crate::models::AnalysisResult;

/// Subject used for the compose handoff unless the caller overrides it
pub const DEFAULT_EMAIL_SUBJECT: &str = "Medical Bill Appeal";

/// Shown when no analysis has been run in this session
pub const EMPTY_RESULTS_MESSAGE: &str =
    "Upload and analyze a medical record to see your results here.";

/// Characters left as-is by `encodeURIComponent`
const URI_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Format dollars with no decimals and thousands separators ("$1,235")
pub fn format_currency(value: f64) -> String {
    let rounded = if value.is_finite() { value.round() } else { 0.0 };
    let digits = format!("{:.0}", rounded.abs());

    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }

    if rounded < 0.0 {
        format!("-${}", grouped)
    } else {
        format!("${}", grouped)
    }
}

/// Compact axis label: thousands as "$1.2k", smaller values as currency
pub fn format_currency_compact(value: f64) -> String {
    if value >= 1000.0 {
        format!("${}k", to_fixed_1(value / 1000.0))
    } else {
        format_currency(value)
    }
}

/// Share of the bill that could be recovered, in percent
pub fn savings_percentage(result: &AnalysisResult) -> f64 {
    if result.total_billed_amount > 0.0 {
        result.potential_money_back / result.total_billed_amount * 100.0
    } else {
        0.0
    }
}

/// One decimal, ties rounded up
fn to_fixed_1(value: f64) -> String {
    format!("{:.1}", (value * 10.0).round() / 10.0)
}

/// Headline figure on the results view
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KpiTile {
    pub title: String,
    pub value: String,
    pub highlight: bool,
}

impl KpiTile {
    fn new(title: &str, value: String, highlight: bool) -> Self {
        Self {
            title: title.to_string(),
            value,
            highlight,
        }
    }
}

/// One bar of the billed-vs-savings comparison
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonBar {
    pub label: String,
    pub amount: f64,
    /// Amount as shown next to the bar
    pub display: String,
}

/// Everything the results view renders
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ResultsView {
    /// Nothing analyzed yet
    Empty { message: String },
    Ready {
        kpis: Vec<KpiTile>,
        comparison: Vec<ComparisonBar>,
        letter_paragraphs: Vec<String>,
        email: String,
        appeal: String,
    },
}

impl ResultsView {
    pub fn from_analysis(analysis: Option<&AnalysisResult>) -> Self {
        match analysis {
            None => ResultsView::Empty {
                message: EMPTY_RESULTS_MESSAGE.to_string(),
            },
            Some(result) => ResultsView::Ready {
                kpis: kpi_tiles(result),
                comparison: comparison_bars(result),
                letter_paragraphs: letter_paragraphs(&format_letter_as_text(&result.appeal)),
                email: result.email.clone(),
                appeal: result.appeal.clone(),
            },
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, ResultsView::Empty { .. })
    }
}

pub fn kpi_tiles(result: &AnalysisResult) -> Vec<KpiTile> {
    vec![
        KpiTile::new(
            "Total Billed",
            format_currency(result.total_billed_amount),
            false,
        ),
        KpiTile::new(
            "Potential Savings",
            format_currency(result.potential_money_back),
            true,
        ),
        KpiTile::new("Win Probability", format!("{}%", result.percentage), false),
    ]
}

pub fn comparison_bars(result: &AnalysisResult) -> Vec<ComparisonBar> {
    let share = if result.total_billed_amount > 0.0 {
        to_fixed_1(savings_percentage(result))
    } else {
        "0".to_string()
    };

    vec![
        ComparisonBar {
            label: "Total Billed".to_string(),
            amount: result.total_billed_amount,
            display: format_currency(result.total_billed_amount),
        },
        ComparisonBar {
            label: format!("Potential Savings ({}%)", share),
            amount: result.potential_money_back,
            display: format_currency(result.potential_money_back),
        },
    ]
}

/// Build a `mailto:` URI with no recipient and an encoded subject and body
pub fn mailto_uri(subject: &str, body: &str) -> String {
    format!(
        "mailto:?subject={}&body={}",
        utf8_percent_encode(subject, URI_COMPONENT),
        utf8_percent_encode(body, URI_COMPONENT)
    )
}
