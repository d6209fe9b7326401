//! Report export.
//!
//! Parses the markdown subset the writer produces and persists finished
//! reports as JSON, markdown, and Word files.

pub mod docx;
pub mod markdown;
pub mod report;

pub use docx::{render_docx, write_docx};
pub use markdown::{Block, parse_blocks, render_markdown};
pub use report::{
    ReportDocument, SavedReport, load_report, safe_file_stem, save_report, write_markdown,
};
