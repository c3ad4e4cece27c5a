//! Human-readable report formatting
//!
//! Applies ANSI colors using crossterm when enabled:
//! - Valid block markers: Green
//! - Invalid block markers and error text: Red
//! - Unreadable documents: Yellow
//! - File headings: Bold

use crossterm::style::{Color, Stylize};
use std::fmt::Write;

use mermaid_check::{CheckedBlock, MultiReport, Report};

/// Formats reports for a terminal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Printer {
    color: bool,
    quiet: bool,
}

impl Printer {
    /// `quiet` drops per-block lines and keeps only totals and failures
    pub fn new(color: bool, quiet: bool) -> Self {
        Self { color, quiet }
    }

    fn paint(&self, text: &str, color: Color) -> String {
        if self.color {
            format!("{}", text.to_string().with(color))
        } else {
            text.to_string()
        }
    }

    fn heading(&self, text: &str) -> String {
        if self.color {
            format!("{}", text.to_string().bold())
        } else {
            text.to_string()
        }
    }

    /// Lines for one document
    pub fn report(&self, report: &Report) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "{}", self.heading(report.source_file()));

        if report.total_blocks() == 0 {
            let _ = writeln!(out, "  no diagram blocks found");
            return out;
        }

        for checked in report.blocks() {
            if self.quiet && checked.is_valid() {
                continue;
            }
            self.block(&mut out, checked);
        }

        let _ = writeln!(
            out,
            "  {} blocks: {} valid, {} invalid ({:.1}ms)",
            report.total_blocks(),
            report.valid_count(),
            report.invalid_count(),
            report.total_time()
        );
        out
    }

    fn block(&self, out: &mut String, checked: &CheckedBlock) {
        let block = &checked.block;
        let marker = if checked.is_valid() {
            self.paint("✓", Color::Green)
        } else {
            self.paint("✗", Color::Red)
        };
        let _ = writeln!(
            out,
            "  {} block {} {} (lines {}-{}) {:.1}ms",
            marker,
            block.index,
            block.diagram_type,
            block.line_start,
            block.line_end,
            checked.result.elapsed_ms()
        );

        if let Some(error) = checked.result.error() {
            for line in error.lines() {
                let _ = writeln!(out, "      {}", self.paint(line, Color::Red));
            }
        }
    }

    /// Lines for a multi-document run, ending with the summary
    pub fn multi_report(&self, multi: &MultiReport) -> String {
        let mut out = String::new();

        for report in multi.files() {
            if self.quiet && report.passed() {
                continue;
            }
            out.push_str(&self.report(report));
        }

        for failure in multi.failures() {
            let _ = writeln!(
                out,
                "{} {}: {}",
                self.paint("!", Color::Yellow),
                failure.source_file,
                failure.error
            );
        }

        let summary = multi.summary();
        let files_label = if summary.files_with_errors == 1 { "file" } else { "files" };
        let _ = writeln!(
            out,
            "{} {} files: {} diagrams, {} valid, {} invalid, {} {} with errors ({:.1}ms)",
            self.heading("Checked"),
            summary.files_checked,
            summary.total_diagrams,
            summary.total_valid,
            summary.total_invalid,
            summary.files_with_errors,
            files_label,
            summary.total_time
        );
        out
    }
}
