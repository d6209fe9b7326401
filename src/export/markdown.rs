//! Block-level markdown subset used for exported reports.
//!
//! Recognized blocks: headings (`#` to `####`), bullets (`- ` or `* `),
//! numbered items (`1. `), and paragraphs. Everything else is paragraph
//! text; inline markup is passed through untouched.

use std::fmt::Write;

/// Deepest heading level kept as a heading.
pub const MAX_HEADING_LEVEL: u8 = 4;

/// One block of a report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    /// Heading of level 1 to 4.
    Heading {
        /// Heading level.
        level: u8,
        /// Heading text.
        text: String,
    },
    /// Bullet list item.
    Bullet(String),
    /// Numbered list item (number not kept).
    Numbered(String),
    /// Paragraph; consecutive plain lines are joined with a space.
    Paragraph(String),
}

fn heading(line: &str) -> Option<Block> {
    let hashes = line.chars().take_while(|c| *c == '#').count();
    let level = u8::try_from(hashes).ok()?;
    if level == 0 || level > MAX_HEADING_LEVEL {
        return None;
    }
    let text = line[hashes..].strip_prefix(' ')?;
    Some(Block::Heading {
        level,
        text: text.trim().to_string(),
    })
}

fn numbered(line: &str) -> Option<&str> {
    let digits = line.chars().take_while(char::is_ascii_digit).count();
    if digits == 0 {
        return None;
    }
    line[digits..].strip_prefix(". ")
}

/// Splits markdown text into blocks.
#[must_use]
pub fn parse_blocks(markdown: &str) -> Vec<Block> {
    let mut blocks = Vec::new();
    let mut paragraph: Vec<&str> = Vec::new();

    let flush = |paragraph: &mut Vec<&str>, blocks: &mut Vec<Block>| {
        if !paragraph.is_empty() {
            blocks.push(Block::Paragraph(paragraph.join(" ")));
            paragraph.clear();
        }
    };

    for raw in markdown.lines() {
        let line = raw.trim();
        if line.is_empty() {
            flush(&mut paragraph, &mut blocks);
            continue;
        }

        let block = if let Some(h) = heading(line) {
            Some(h)
        } else if let Some(item) = line.strip_prefix("- ").or_else(|| line.strip_prefix("* ")) {
            Some(Block::Bullet(item.trim().to_string()))
        } else {
            numbered(line).map(|item| Block::Numbered(item.trim().to_string()))
        };

        match block {
            Some(block) => {
                flush(&mut paragraph, &mut blocks);
                blocks.push(block);
            }
            None => paragraph.push(line),
        }
    }
    flush(&mut paragraph, &mut blocks);
    blocks
}

/// Blocks after a leading level-1 heading equal to `title`, if any.
pub(crate) fn body_blocks<'a>(title: &str, blocks: &'a [Block]) -> &'a [Block] {
    match blocks.first() {
        Some(Block::Heading { level: 1, text }) if text == title => &blocks[1..],
        _ => blocks,
    }
}

/// Renders blocks back to markdown under a level-1 title.
///
/// Numbered items are renumbered from 1 within each run, and a leading
/// level-1 heading equal to `title` is not repeated.
#[must_use]
pub fn render_markdown(title: &str, blocks: &[Block]) -> String {
    let mut out = format!("# {title}\n");
    let mut counter = 0_usize;
    let mut in_list = false;

    for block in body_blocks(title, blocks) {
        let is_item = matches!(block, Block::Bullet(_) | Block::Numbered(_));
        if !is_item || !in_list {
            out.push('\n');
        }
        if !matches!(block, Block::Numbered(_)) {
            counter = 0;
        }
        match block {
            Block::Heading { level, text } => {
                let _ = writeln!(out, "{} {text}", "#".repeat(usize::from(*level)));
            }
            Block::Bullet(text) => {
                let _ = writeln!(out, "- {text}");
            }
            Block::Numbered(text) => {
                counter += 1;
                let _ = writeln!(out, "{counter}. {text}");
            }
            Block::Paragraph(text) => {
                let _ = writeln!(out, "{text}");
            }
        }
        in_list = is_item;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const REPORT: &str = "# Title\n\n## Summary\n\nFirst line\ncontinues here.\n\n- one\n* two\n\n1. alpha\n2. beta\n\n##### too deep\n#nospace\n";

    #[test]
    fn test_parse_blocks() {
        let blocks = parse_blocks(REPORT);
        assert_eq!(
            blocks,
            vec![
                Block::Heading { level: 1, text: "Title".to_string() },
                Block::Heading { level: 2, text: "Summary".to_string() },
                Block::Paragraph("First line continues here.".to_string()),
                Block::Bullet("one".to_string()),
                Block::Bullet("two".to_string()),
                Block::Numbered("alpha".to_string()),
                Block::Numbered("beta".to_string()),
                Block::Paragraph("##### too deep #nospace".to_string()),
            ]
        );
    }

    #[test]
    fn test_render_skips_duplicate_title() {
        let blocks = parse_blocks("# Title\n\nBody text.");
        let rendered = render_markdown("Title", &blocks);
        assert_eq!(rendered, "# Title\n\nBody text.\n");
    }

    #[test]
    fn test_render_renumbers_lists() {
        let blocks = vec![
            Block::Numbered("a".to_string()),
            Block::Numbered("b".to_string()),
            Block::Paragraph("break".to_string()),
            Block::Numbered("c".to_string()),
        ];
        let rendered = render_markdown("T", &blocks);
        assert_eq!(rendered, "# T\n\n1. a\n2. b\n\nbreak\n\n1. c\n");
    }

    #[test]
    fn test_render_keeps_list_items_together() {
        let rendered = render_markdown("T", &parse_blocks("- x\n- y"));
        assert_eq!(rendered, "# T\n\n- x\n- y\n");
    }
}
