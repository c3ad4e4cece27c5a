//! Per-document reports, the cross-document summary and the run outcome

use serde::Serialize;
use std::fmt;

use super::types::CheckedBlock;

/// How a run ended, ordered from best to worst
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Outcome {
    /// No blocks found, or every block is valid
    Passed,
    /// At least one block has a syntax error
    Invalid,
    /// The tool itself could not do its job
    OperationalError,
}

impl Outcome {
    /// Process exit status for this outcome
    pub fn exit_code(self) -> i32 {
        match self {
            Outcome::Passed => 0,
            Outcome::Invalid => 1,
            Outcome::OperationalError => 2,
        }
    }

    /// The worse of two outcomes
    pub fn combine(self, other: Outcome) -> Outcome {
        self.max(other)
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Passed => write!(f, "passed"),
            Outcome::Invalid => write!(f, "invalid"),
            Outcome::OperationalError => write!(f, "error"),
        }
    }
}

/// Aggregate of every block checked in one document
///
/// Counters only change through [`Report::push`], so
/// `valid_count + invalid_count == total_blocks` always holds.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    source_file: String,
    total_blocks: usize,
    valid_count: usize,
    invalid_count: usize,
    blocks: Vec<CheckedBlock>,
    total_time: f64,
}

impl Report {
    /// Create an empty report for `source_file`
    pub fn new(source_file: impl Into<String>) -> Self {
        Self {
            source_file: source_file.into(),
            total_blocks: 0,
            valid_count: 0,
            invalid_count: 0,
            blocks: Vec::new(),
            total_time: 0.0,
        }
    }

    /// Append a checked block and update the running totals
    pub fn push(&mut self, block: CheckedBlock) {
        self.total_blocks += 1;
        if block.is_valid() {
            self.valid_count += 1;
        } else {
            self.invalid_count += 1;
        }
        self.total_time += block.result.elapsed_ms();
        self.blocks.push(block);
    }

    pub fn source_file(&self) -> &str {
        &self.source_file
    }

    pub fn total_blocks(&self) -> usize {
        self.total_blocks
    }

    pub fn valid_count(&self) -> usize {
        self.valid_count
    }

    pub fn invalid_count(&self) -> usize {
        self.invalid_count
    }

    /// Checked blocks in extraction order
    pub fn blocks(&self) -> &[CheckedBlock] {
        &self.blocks
    }

    /// Sum of every block's validation time, in milliseconds
    pub fn total_time(&self) -> f64 {
        self.total_time
    }

    pub fn invalid_blocks(&self) -> impl Iterator<Item = &CheckedBlock> {
        self.blocks.iter().filter(|b| !b.is_valid())
    }

    /// A document passes when none of its blocks is invalid
    pub fn passed(&self) -> bool {
        self.invalid_count == 0
    }

    pub fn outcome(&self) -> Outcome {
        if self.passed() {
            Outcome::Passed
        } else {
            Outcome::Invalid
        }
    }
}

/// A document that could not be checked at all
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileFailure {
    pub source_file: String,
    pub error: String,
}

/// Totals across every document of a multi-document run
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub files_checked: usize,
    pub total_diagrams: usize,
    pub total_valid: usize,
    pub total_invalid: usize,
    pub files_with_errors: usize,
    pub total_time: f64,
}

impl Summary {
    pub fn from_reports(reports: &[Report]) -> Self {
        reports.iter().fold(Self::default(), |mut summary, report| {
            summary.files_checked += 1;
            summary.total_diagrams += report.total_blocks();
            summary.total_valid += report.valid_count();
            summary.total_invalid += report.invalid_count();
            summary.total_time += report.total_time();
            if !report.passed() {
                summary.files_with_errors += 1;
            }
            summary
        })
    }
}

/// Reports for several documents plus their summary
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MultiReport {
    files: Vec<Report>,
    failures: Vec<FileFailure>,
    #[serde(flatten)]
    summary: Summary,
}

impl MultiReport {
    pub fn new(files: Vec<Report>, failures: Vec<FileFailure>) -> Self {
        let summary = Summary::from_reports(&files);
        Self {
            files,
            failures,
            summary,
        }
    }

    pub fn files(&self) -> &[Report] {
        &self.files
    }

    pub fn failures(&self) -> &[FileFailure] {
        &self.failures
    }

    pub fn summary(&self) -> &Summary {
        &self.summary
    }

    /// Unreadable documents outrank invalid diagrams
    pub fn outcome(&self) -> Outcome {
        let checked = self
            .files
            .iter()
            .map(Report::outcome)
            .fold(Outcome::Passed, Outcome::combine);
        if self.failures.is_empty() {
            checked
        } else {
            checked.combine(Outcome::OperationalError)
        }
    }
}
