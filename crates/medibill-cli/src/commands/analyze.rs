//! Analyze command implementation

use std::path::Path;

use anyhow::{Context, Result};
use medibill_core::present::{comparison_bars, kpi_tiles};
use medibill_core::{
    export::appeal_letter_pdf, format_letter_as_text, letter_paragraphs, AnalysisResult,
    AppConfig, BillAnalyzer, UploadedDocument,
};

pub async fn cmd_analyze(
    config: &AppConfig,
    file: &Path,
    mime: Option<&str>,
    json: bool,
    pdf: Option<&Path>,
) -> Result<()> {
    let analyzer = BillAnalyzer::from_config(config)?;

    if !json {
        println!("🔍 Analyzing {}...", file.display());
    }

    let result = analyze_file(&analyzer, file, mime).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print!("{}", render_summary(&result));
    }

    if let Some(out) = pdf {
        write_letter_pdf(&result, out)?;
        if !json {
            println!();
            println!("📄 Appeal letter written to {}", out.display());
        }
    }

    Ok(())
}

/// Read `file` and run it through the analyzer
pub async fn analyze_file(
    analyzer: &BillAnalyzer,
    file: &Path,
    mime: Option<&str>,
) -> Result<AnalysisResult> {
    let bytes =
        std::fs::read(file).with_context(|| format!("Failed to read {}", file.display()))?;

    let mut document = UploadedDocument::new(bytes);
    if let Some(name) = file.file_name() {
        document = document.with_file_name(name.to_string_lossy());
    }
    if let Some(mime) = mime {
        document = document.with_content_type(mime);
    }

    let result = analyzer
        .analyze(&document)
        .await
        .with_context(|| format!("Failed to analyze {}", file.display()))?;
    Ok(result)
}

/// Human-readable report: headline figures, comparison, email and letter
pub fn render_summary(result: &AnalysisResult) -> String {
    let mut out = String::new();

    out.push('\n');
    for tile in kpi_tiles(result) {
        let marker = if tile.highlight { " ★" } else { "" };
        out.push_str(&format!("{:<20} {:>12}{}\n", tile.title, tile.value, marker));
    }

    out.push('\n');
    for bar in comparison_bars(result) {
        out.push_str(&format!("{:<32} {:>12}\n", bar.label, bar.display));
    }

    out.push_str("\n--- Email ---\n");
    out.push_str(result.email.trim());
    out.push('\n');

    out.push_str("\n--- Appeal Letter ---\n");
    let paragraphs = letter_paragraphs(&format_letter_as_text(&result.appeal));
    out.push_str(&paragraphs.join("\n\n"));
    out.push('\n');

    out
}

/// Write the formatted appeal letter as a PDF
pub fn write_letter_pdf(result: &AnalysisResult, out: &Path) -> Result<()> {
    let bytes = appeal_letter_pdf(result).context("Failed to render appeal letter")?;
    std::fs::write(out, bytes).with_context(|| format!("Failed to write {}", out.display()))?;
    Ok(())
}
