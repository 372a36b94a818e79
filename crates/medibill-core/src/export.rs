//! Appeal letter PDF export
//!
//! Letter-size pages, 1 inch margins, Times Roman 12 pt. Text is reflowed
//! with a fixed average glyph width, which is close enough for a serif body
//! font and keeps layout independent of font metrics.

use std::io::BufWriter;

use printpdf::{BuiltinFont, Mm, PdfDocument};

use crate::error::{Error, Result};
use crate::letter::format_letter_as_text;
use crate::models::AnalysisResult;

/// Download name for the exported letter
pub const PDF_FILE_NAME: &str = "medical-bill-appeal.pdf";

const MM_PER_INCH: f32 = 25.4;
const POINTS_PER_INCH: f32 = 72.0;

/// Page geometry and type settings, in inches and points
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LetterLayout {
    pub page_width_in: f32,
    pub page_height_in: f32,
    pub margin_left_in: f32,
    pub margin_right_in: f32,
    pub margin_top_in: f32,
    pub margin_bottom_in: f32,
    pub font_size_pt: f32,
    pub line_height_in: f32,
    /// Average glyph advance as a fraction of the font size
    pub avg_glyph_width_em: f32,
}

impl Default for LetterLayout {
    fn default() -> Self {
        let font_size_pt = 12.0;
        Self {
            page_width_in: 8.5,
            page_height_in: 11.0,
            margin_left_in: 1.0,
            margin_right_in: 1.0,
            margin_top_in: 1.0,
            margin_bottom_in: 1.0,
            font_size_pt,
            line_height_in: font_size_pt * 1.5 / POINTS_PER_INCH,
            avg_glyph_width_em: 0.5,
        }
    }
}

impl LetterLayout {
    pub fn usable_width_in(&self) -> f32 {
        self.page_width_in - self.margin_left_in - self.margin_right_in
    }

    /// Characters that fit on one line at the average glyph width
    pub fn chars_per_line(&self) -> usize {
        let glyph_pt = self.font_size_pt * self.avg_glyph_width_em;
        if glyph_pt <= 0.0 {
            return 1;
        }
        let usable_pt = self.usable_width_in() * POINTS_PER_INCH;
        ((usable_pt / glyph_pt).floor() as usize).max(1)
    }
}

/// Greedy word wrap to `max_chars` per line
///
/// Explicit newlines are kept, blank lines survive as empty lines, and words
/// longer than a line are split.
pub fn wrap_lines(text: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let mut lines = Vec::new();

    for source_line in text.lines() {
        let mut current = String::new();
        let mut current_len = 0;

        for word in source_line.split_whitespace() {
            let chars: Vec<char> = word.chars().collect();

            if chars.len() > max_chars {
                if !current.is_empty() {
                    lines.push(std::mem::take(&mut current));
                    current_len = 0;
                }
                let mut chunks = chars.chunks(max_chars).peekable();
                while let Some(chunk) = chunks.next() {
                    let piece: String = chunk.iter().collect();
                    if chunks.peek().is_some() {
                        lines.push(piece);
                    } else {
                        current_len = chunk.len();
                        current = piece;
                    }
                }
                continue;
            }

            if current_len > 0 && current_len + 1 + chars.len() > max_chars {
                lines.push(std::mem::take(&mut current));
                current_len = 0;
            }
            if current_len > 0 {
                current.push(' ');
                current_len += 1;
            }
            current.push_str(word);
            current_len += chars.len();
        }

        lines.push(current);
    }

    lines
}

/// Split wrapped lines into pages
///
/// A new page starts once the next line would cross the bottom margin.
pub fn paginate(lines: &[String], layout: &LetterLayout) -> Vec<Vec<String>> {
    let limit = layout.page_height_in - layout.margin_bottom_in;
    let mut pages = vec![Vec::new()];
    let mut y = layout.margin_top_in;

    for line in lines {
        if y + layout.line_height_in > limit {
            pages.push(Vec::new());
            y = layout.margin_top_in;
        }
        if let Some(page) = pages.last_mut() {
            page.push(line.clone());
        }
        y += layout.line_height_in;
    }

    pages
}

/// Render plain letter text to PDF bytes
pub fn render_letter_pdf(text: &str, layout: &LetterLayout) -> Result<Vec<u8>> {
    let lines = wrap_lines(text, layout.chars_per_line());
    let pages = paginate(&lines, layout);

    let width = Mm(layout.page_width_in * MM_PER_INCH);
    let height = Mm(layout.page_height_in * MM_PER_INCH);

    let (doc, page1, layer1) = PdfDocument::new("Medical Bill Appeal", width, height, "Layer 1");
    let font = doc
        .add_builtin_font(BuiltinFont::TimesRoman)
        .map_err(|e| Error::Export(format!("PDF font error: {e}")))?;

    let mut layers = vec![doc.get_page(page1).get_layer(layer1)];
    for number in 2..=pages.len() {
        let (page, layer) = doc.add_page(width, height, format!("Page {}", number));
        layers.push(doc.get_page(page).get_layer(layer));
    }

    for (layer, page_lines) in layers.iter().zip(&pages) {
        // Baselines measured from the top edge, printpdf measures from the bottom
        let mut y = layout.margin_top_in;
        for line in page_lines {
            if !line.is_empty() {
                layer.use_text(
                    line.as_str(),
                    layout.font_size_pt,
                    Mm(layout.margin_left_in * MM_PER_INCH),
                    Mm((layout.page_height_in - y) * MM_PER_INCH),
                    &font,
                );
            }
            y += layout.line_height_in;
        }
    }

    let mut buf = BufWriter::new(Vec::new());
    doc.save(&mut buf)
        .map_err(|e| Error::Export(format!("PDF save error: {e}")))?;
    buf.into_inner()
        .map_err(|e| Error::Export(format!("PDF buffer error: {e}")))
}

/// Render the appeal letter of `result` as it appears on screen
pub fn appeal_letter_pdf(result: &AnalysisResult) -> Result<Vec<u8>> {
    render_letter_pdf(
        &format_letter_as_text(&result.appeal),
        &LetterLayout::default(),
    )
}
