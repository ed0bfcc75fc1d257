//! CLI output formatting for scan and convert.
//!
//! # Output Format
//!
//! ## Scan
//!
//! ```text
//! Pages
//! 001 Guides/Setup.html → Guides/Setup.md
//! 002 index.html → index.md
//!
//! Attachments
//!     attachments/ (2 files)
//! ```
//!
//! ## Convert
//!
//! One line per page as it completes, then attachments and a summary:
//!
//! ```text
//! Guides/Setup.html → Guides/Setup.md
//! no-content.html → no-content.md
//!     Warning: no #main-content element, wrote an empty document
//! broken.html: Failed to read export/broken.html: permission denied, skipping
//! Copied attachments/ (2 files)
//!
//! Converted 2 pages (1 empty), 1 failed, 2 attachments
//! ```
//!
//! # Architecture
//!
//! Each stage has a `format_*` function (returns `Vec<String>`) for testability
//! and a `print_*` wrapper that writes to stdout. Format functions are pure:
//! no I/O, no side effects.

use crate::html::CONTENT_ID;
use crate::process::{ProcessEvent, ProcessSummary};
use crate::scan::Manifest;
use std::path::Path;

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

/// Forward slashes on every platform, so output reads the same everywhere.
fn display_path(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

fn plural(n: usize, one: &str, many: &str) -> String {
    if n == 1 {
        format!("{n} {one}")
    } else {
        format!("{n} {many}")
    }
}

fn page_line(source: &Path, output: &Path) -> String {
    format!("{} \u{2192} {}", display_path(source), display_path(output))
}

// ============================================================================
// Scan output
// ============================================================================

/// Format scan output: every page with its target, then attachments.
pub fn format_scan_output(manifest: &Manifest) -> Vec<String> {
    let mut lines = Vec::new();

    lines.push("Pages".to_string());
    if manifest.pages.is_empty() {
        lines.push(format!("{}(none)", indent(1)));
    }
    for (i, page) in manifest.pages.iter().enumerate() {
        lines.push(format!(
            "{} {}",
            format_index(i + 1),
            page_line(&page.source, &page.output)
        ));
    }

    if let Some(attachments) = &manifest.attachments {
        lines.push(String::new());
        lines.push("Attachments".to_string());
        lines.push(format!(
            "{}{}/ ({})",
            indent(1),
            display_path(&attachments.path),
            plural(attachments.files, "file", "files")
        ));
    }

    lines
}

/// Print scan output to stdout.
pub fn print_scan_output(manifest: &Manifest) {
    for line in format_scan_output(manifest) {
        println!("{}", line);
    }
}

// ============================================================================
// Convert output
// ============================================================================

/// Format a single conversion progress event as display lines.
pub fn format_process_event(event: &ProcessEvent) -> Vec<String> {
    match event {
        ProcessEvent::Converted { page, report } => {
            let mut lines = vec![page_line(&page.source, &page.output)];
            if report.is_empty() {
                lines.push(format!(
                    "{}Warning: no #{} element, wrote an empty document",
                    indent(1),
                    CONTENT_ID
                ));
            }
            lines
        }
        ProcessEvent::Failed { page, error } => {
            vec![format!(
                "{}: {}, skipping",
                display_path(&page.source),
                error
            )]
        }
        ProcessEvent::AttachmentsCopied { path, files } => {
            vec![format!(
                "Copied {}/ ({})",
                display_path(path),
                plural(*files, "file", "files")
            )]
        }
    }
}

/// Format the end-of-run summary.
pub fn format_summary(summary: &ProcessSummary) -> Vec<String> {
    let mut converted = format!("Converted {}", plural(summary.converted, "page", "pages"));
    if summary.empty > 0 {
        converted.push_str(&format!(" ({} empty)", summary.empty));
    }
    vec![
        String::new(),
        format!(
            "{}, {} failed, {}",
            converted,
            summary.failed,
            plural(summary.attachments, "attachment", "attachments")
        ),
    ]
}

pub fn print_summary(summary: &ProcessSummary) {
    for line in format_summary(summary) {
        println!("{}", line);
    }
}
