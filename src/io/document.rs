//! Summary document rendering.
//!
//! The PDF writer here covers exactly what the summary needs: plain text
//! lines in one built-in font, flowing over as many pages as required.

use std::fmt::Write as _;

use anyhow::Result;

use crate::application::SummaryRow;
use crate::domain::format_paise;

pub const PDF_CONTENT_TYPE: &str = "application/pdf";

/// Turns a summary into a binary document.
pub trait DocumentRenderer {
    fn content_type(&self) -> &'static str;
    fn render(&self, title: &str, rows: &[SummaryRow]) -> Result<Vec<u8>>;
}

/// One text line of the document, with its font size.
#[derive(Debug, Clone, PartialEq)]
pub struct Line {
    pub size: u32,
    pub text: String,
}

/// Lay the summary out as text lines: a heading, then one block per student.
pub fn summary_lines(title: &str, rows: &[SummaryRow]) -> Vec<Line> {
    let mut lines = vec![Line {
        size: 18,
        text: title.to_string(),
    }];

    for (index, row) in rows.iter().enumerate() {
        lines.push(Line {
            size: 12,
            text: String::new(),
        });
        for text in [
            format!("Student {}", index + 1),
            format!("Name: {}", row.name),
            format!("Roll: {}", row.roll),
            format!("Wing: {}", row.wing),
            format!("Hall: {}", row.hall),
            format!("Total Clothes: {}", row.total_clothes),
            format!("Total Dues: {}", format_paise(row.total_dues)),
            format!("Month: {}", row.month),
        ] {
            lines.push(Line { size: 12, text });
        }
    }

    lines
}

/// Minimal PDF 1.4 writer using the standard Helvetica font.
#[derive(Debug, Clone)]
pub struct PdfRenderer {
    pub page_width: u32,
    pub page_height: u32,
    pub margin: u32,
}

impl Default for PdfRenderer {
    /// US Letter with one-inch margins.
    fn default() -> Self {
        Self {
            page_width: 612,
            page_height: 792,
            margin: 72,
        }
    }
}

impl PdfRenderer {
    fn paginate(&self, lines: &[Line]) -> Vec<String> {
        let mut pages = Vec::new();
        let mut content = String::new();
        let top = self.page_height - self.margin;
        let mut y = top;

        for line in lines {
            let leading = line.size + line.size / 2;
            if y < self.margin + leading && y < top {
                pages.push(std::mem::take(&mut content));
                y = top;
            }
            y -= leading;
            if !line.text.is_empty() {
                let _ = writeln!(
                    content,
                    "BT /F1 {} Tf {} {} Td ({}) Tj ET",
                    line.size,
                    self.margin,
                    y,
                    escape_text(&line.text)
                );
            }
        }
        pages.push(content);
        pages
    }

    pub fn render_lines(&self, lines: &[Line]) -> Vec<u8> {
        let pages = self.paginate(lines);

        // Objects: 1 catalog, 2 page tree, 3 font, then a page and a content
        // stream per page.
        let page_ids: Vec<usize> = (0..pages.len()).map(|i| 4 + i * 2).collect();
        let mut objects: Vec<String> = vec![
            "<< /Type /Catalog /Pages 2 0 R >>".to_string(),
            format!(
                "<< /Type /Pages /Kids [{}] /Count {} >>",
                page_ids
                    .iter()
                    .map(|id| format!("{id} 0 R"))
                    .collect::<Vec<_>>()
                    .join(" "),
                pages.len()
            ),
            "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica >>".to_string(),
        ];
        for (page, id) in pages.iter().zip(&page_ids) {
            objects.push(format!(
                "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 {} {}] /Resources << /Font << /F1 3 0 R >> >> /Contents {} 0 R >>",
                self.page_width,
                self.page_height,
                id + 1
            ));
            objects.push(format!(
                "<< /Length {} >>\nstream\n{}endstream",
                page.len(),
                page
            ));
        }

        let mut out = String::from("%PDF-1.4\n");
        let mut offsets = Vec::with_capacity(objects.len());
        for (i, body) in objects.iter().enumerate() {
            offsets.push(out.len());
            let _ = write!(out, "{} 0 obj\n{}\nendobj\n", i + 1, body);
        }

        let xref_at = out.len();
        let _ = write!(out, "xref\n0 {}\n0000000000 65535 f \n", objects.len() + 1);
        for offset in offsets {
            let _ = write!(out, "{offset:010} 00000 n \n");
        }
        let _ = write!(
            out,
            "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{}\n%%EOF\n",
            objects.len() + 1,
            xref_at
        );

        out.into_bytes()
    }
}

impl DocumentRenderer for PdfRenderer {
    fn content_type(&self) -> &'static str {
        PDF_CONTENT_TYPE
    }

    fn render(&self, title: &str, rows: &[SummaryRow]) -> Result<Vec<u8>> {
        Ok(self.render_lines(&summary_lines(title, rows)))
    }
}

/// Escape a string for a PDF literal. Characters outside printable ASCII
/// are replaced, since the built-in font has no encoding for them.
fn escape_text(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '(' | ')' | '\\' => {
                escaped.push('\\');
                escaped.push(c);
            }
            ' '..='~' => escaped.push(c),
            _ => escaped.push('?'),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(roll: &str) -> SummaryRow {
        SummaryRow {
            name: "Asha (day scholar)".into(),
            wing: "A".into(),
            hall: "H1".into(),
            roll: roll.into(),
            total_clothes: 12,
            total_dues: 30000,
            month: "May".into(),
        }
    }

    #[test]
    fn test_summary_lines_layout() {
        let lines = summary_lines("Summary Report", &[row("1")]);
        assert_eq!(lines[0].text, "Summary Report");
        assert_eq!(lines[0].size, 18);
        assert!(lines.iter().any(|l| l.text == "Total Dues: 300.00"));
        assert!(lines.iter().any(|l| l.text == "Total Clothes: 12"));
    }

    #[test]
    fn test_pdf_structure() {
        let bytes = PdfRenderer::default()
            .render("Summary Report", &[row("1")])
            .unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert!(text.starts_with("%PDF-1.4\n"));
        assert!(text.trim_end().ends_with("%%EOF"));
        assert!(text.contains("(Name: Asha \\(day scholar\\)) Tj"));
        assert!(text.contains("/Count 1"));
    }

    #[test]
    fn test_xref_offsets_point_at_objects() {
        let bytes = PdfRenderer::default().render("Summary Report", &[row("1")]).unwrap();
        let text = String::from_utf8(bytes).unwrap();

        let xref_at: usize = text
            .lines()
            .skip_while(|l| *l != "startxref")
            .nth(1)
            .unwrap()
            .parse()
            .unwrap();
        assert!(text[xref_at..].starts_with("xref"));

        let first_entry = text[xref_at..].lines().nth(3).unwrap();
        let offset: usize = first_entry[..10].parse().unwrap();
        assert!(text[offset..].starts_with("1 0 obj"));
    }

    #[test]
    fn test_long_summary_spans_pages() {
        let rows: Vec<SummaryRow> = (0..40).map(|i| row(&i.to_string())).collect();
        let bytes = PdfRenderer::default().render("Summary Report", &rows).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert!(!text.contains("/Count 1 "));
        assert!(text.matches("/Type /Page ").count() > 1);
    }

    #[test]
    fn test_non_ascii_is_replaced() {
        assert_eq!(escape_text("₹300"), "?300");
    }
}
