//! Word (`.docx`) rendering of a report.
//!
//! Headings map to `Heading1`..`Heading4`, bullets to `ListBullet`, and
//! numbered items to `ListNumber` with their number written out.

use std::fs::File;
use std::path::Path;

use docx_rs::{Docx, Paragraph, Run, Style, StyleType};

use super::markdown::{Block, body_blocks};
use super::report::ReportDocument;
use crate::error::{Error, Result};

/// Heading font sizes in half-points, level 1 first.
const HEADING_SIZES: [usize; 4] = [32, 28, 26, 24];
const TITLE_SIZE: usize = 48;

fn styles() -> Vec<Style> {
    let mut styles = vec![
        Style::new("Title", StyleType::Paragraph)
            .name("Title")
            .size(TITLE_SIZE)
            .bold(),
    ];
    for (i, size) in HEADING_SIZES.iter().enumerate() {
        let level = i + 1;
        styles.push(
            Style::new(format!("Heading{level}"), StyleType::Paragraph)
                .name(format!("Heading {level}"))
                .size(*size)
                .bold(),
        );
    }
    styles.push(Style::new("ListBullet", StyleType::Paragraph).name("List Bullet"));
    styles.push(Style::new("ListNumber", StyleType::Paragraph).name("List Number"));
    styles
}

fn paragraph(text: &str, style: &str) -> Paragraph {
    Paragraph::new()
        .add_run(Run::new().add_text(text))
        .style(style)
}

/// Builds the Word document for a report.
#[must_use]
pub fn render_docx(doc: &ReportDocument) -> Docx {
    let mut docx = styles().into_iter().fold(Docx::new(), Docx::add_style);
    docx = docx.add_paragraph(paragraph(&doc.title, "Title"));

    let mut counter = 0_usize;
    for block in body_blocks(&doc.title, &doc.blocks) {
        if !matches!(block, Block::Numbered(_)) {
            counter = 0;
        }
        let para = match block {
            Block::Heading { level, text } => paragraph(text, &format!("Heading{level}")),
            Block::Bullet(text) => paragraph(&format!("\u{2022} {text}"), "ListBullet"),
            Block::Numbered(text) => {
                counter += 1;
                paragraph(&format!("{counter}. {text}"), "ListNumber")
            }
            Block::Paragraph(text) => Paragraph::new().add_run(Run::new().add_text(text)),
        };
        docx = docx.add_paragraph(para);
    }
    docx
}

/// Writes a report as a `.docx` file, creating the parent directory.
///
/// # Errors
///
/// Returns an error if the file cannot be created or packaged.
pub fn write_docx(path: &Path, doc: &ReportDocument) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let file = File::create(path)?;
    render_docx(doc)
        .build()
        .pack(file)
        .map_err(|e| Error::Docx(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const REPORT: &str = "# gossip protocols\n\n## Spread\n\n- epidemic\n- anti-entropy\n\n1. push\n2. pull\n\n#### Details\n\nPlain text.";

    #[test]
    fn test_write_docx_produces_readable_package() {
        let dir = TempDir::new().unwrap_or_else(|_| unreachable!());
        let path = dir.path().join("nested").join("gossip_report.docx");
        let doc = ReportDocument::new("gossip protocols", REPORT);

        write_docx(&path, &doc).unwrap_or_else(|_| unreachable!());

        let bytes = std::fs::read(&path).unwrap_or_default();
        assert!(bytes.starts_with(b"PK"));

        let parsed = docx_rs::read_docx(&bytes).unwrap_or_else(|_| unreachable!());
        let json = parsed.json();
        for needle in [
            "Heading2",
            "Heading4",
            "ListBullet",
            "ListNumber",
            "Spread",
            "2. pull",
            "Plain text.",
        ] {
            assert!(json.contains(needle), "missing {needle}");
        }
        // The duplicate level-1 heading is folded into the title.
        assert_eq!(json.matches("\"gossip protocols\"").count(), 1);
    }
}
