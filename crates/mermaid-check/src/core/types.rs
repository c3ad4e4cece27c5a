//! Core type definitions for diagram checking
//!
//! This module contains the records that flow through the pipeline:
//! blocks found in a document, the outcome of validating one block,
//! and the merged record that ends up in a report.

use serde::Serialize;
use std::fmt;
use std::time::Duration;

/// Diagram type reported when a block has no leading keyword
pub const UNKNOWN_DIAGRAM_TYPE: &str = "unknown";

/// Leading Mermaid keywords and the short name each one is reported as
const DIAGRAM_KEYWORDS: &[(&str, &str)] = &[
    ("graph", "flowchart"),
    ("flowchart", "flowchart"),
    ("sequenceDiagram", "sequence"),
    ("classDiagram", "class"),
    ("stateDiagram", "state"),
    ("erDiagram", "er"),
    ("journey", "journey"),
    ("gantt", "gantt"),
    ("pie", "pie"),
    ("quadrantChart", "quadrant"),
    ("requirementDiagram", "requirement"),
    ("gitGraph", "gitgraph"),
    ("C4Context", "c4"),
    ("C4Container", "c4"),
    ("C4Component", "c4"),
    ("C4Dynamic", "c4"),
    ("C4Deployment", "c4"),
    ("mindmap", "mindmap"),
    ("timeline", "timeline"),
    ("sankey", "sankey"),
    ("xychart", "xychart"),
    ("block", "block"),
    ("packet", "packet"),
    ("kanban", "kanban"),
    ("architecture", "architecture"),
];

/// Infer a short diagram type label from the first token of a block
///
/// Only the word-character run at the very start of `code` is considered;
/// leading whitespace, front matter or directives yield [`UNKNOWN_DIAGRAM_TYPE`].
/// Keywords missing from the lookup table are returned as written.
///
/// # Example
/// ```rust
/// use mermaid_check::infer_diagram_type;
///
/// assert_eq!(infer_diagram_type("graph TD\nA-->B"), "flowchart");
/// assert_eq!(infer_diagram_type("sequenceDiagram\nA->>B: hi"), "sequence");
/// assert_eq!(infer_diagram_type("stateDiagram-v2\n[*] --> A"), "state");
/// assert_eq!(infer_diagram_type("%%{init: {}}%%\ngraph TD"), "unknown");
/// ```
pub fn infer_diagram_type(code: &str) -> String {
    let keyword_len = code
        .char_indices()
        .find(|(_, c)| !(c.is_ascii_alphanumeric() || *c == '_'))
        .map(|(i, _)| i)
        .unwrap_or(code.len());

    if keyword_len == 0 {
        return UNKNOWN_DIAGRAM_TYPE.to_string();
    }

    let keyword = &code[..keyword_len];
    DIAGRAM_KEYWORDS
        .iter()
        .find(|(known, _)| *known == keyword)
        .map(|(_, short)| short.to_string())
        .unwrap_or_else(|| keyword.to_string())
}

/// One fenced diagram region extracted from a document
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    /// Diagram source between the fences, lines joined with `\n`
    #[serde(skip)]
    pub code: String,
    /// 0-based position among the blocks of one document
    pub index: usize,
    /// 1-based line number of the first content line
    pub line_start: usize,
    /// 1-based line number of the closing fence
    pub line_end: usize,
    /// Short label inferred from the leading keyword
    pub diagram_type: String,
}

impl Block {
    /// Create a block, inferring its diagram type from `code`
    pub fn new(index: usize, line_start: usize, line_end: usize, code: impl Into<String>) -> Self {
        let code = code.into();
        let diagram_type = infer_diagram_type(&code);
        Self {
            code,
            index,
            line_start,
            line_end,
            diagram_type,
        }
    }
}

impl fmt::Display for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "block {} ({}, lines {}-{})",
            self.index, self.diagram_type, self.line_start, self.line_end
        )
    }
}

/// Outcome of checking one block against the diagram grammar
///
/// Exactly one of `valid == true` with no error, or `valid == false` with a
/// non-empty error, holds. The constructors are the only way to build one.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResult {
    valid: bool,
    error: Option<String>,
    elapsed_time: f64,
}

impl ValidationResult {
    /// Message used when a parser fails without saying why
    pub const UNSPECIFIED_ERROR: &'static str = "syntax error";

    /// A successful check that took `elapsed`
    pub fn passed(elapsed: Duration) -> Self {
        Self {
            valid: true,
            error: None,
            elapsed_time: millis(elapsed),
        }
    }

    /// A failed check that took `elapsed`
    pub fn failed(error: impl Into<String>, elapsed: Duration) -> Self {
        let error = error.into();
        let error = if error.trim().is_empty() {
            Self::UNSPECIFIED_ERROR.to_string()
        } else {
            error
        };
        Self {
            valid: false,
            error: Some(error),
            elapsed_time: millis(elapsed),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.valid
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Time the check took, in milliseconds
    pub fn elapsed_ms(&self) -> f64 {
        self.elapsed_time
    }
}

fn millis(elapsed: Duration) -> f64 {
    elapsed.as_secs_f64() * 1000.0
}

/// A block merged with its validation result
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckedBlock {
    #[serde(flatten)]
    pub block: Block,
    #[serde(flatten)]
    pub result: ValidationResult,
    /// Name of the materialised block file, when artifacts are enabled
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
}

impl CheckedBlock {
    pub fn new(block: Block, result: ValidationResult) -> Self {
        Self {
            block,
            result,
            file_name: None,
        }
    }

    pub fn with_file_name(mut self, file_name: impl Into<String>) -> Self {
        self.file_name = Some(file_name.into());
        self
    }

    pub fn is_valid(&self) -> bool {
        self.result.is_valid()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_infer_known_keywords() {
        assert_eq!(infer_diagram_type("graph LR\nA-->B"), "flowchart");
        assert_eq!(infer_diagram_type("flowchart TD\nA-->B"), "flowchart");
        assert_eq!(infer_diagram_type("sequenceDiagram"), "sequence");
        assert_eq!(infer_diagram_type("classDiagram\nA <|-- B"), "class");
        assert_eq!(infer_diagram_type("erDiagram"), "er");
        assert_eq!(infer_diagram_type("gitGraph\ncommit"), "gitgraph");
        assert_eq!(infer_diagram_type("C4Context\ntitle x"), "c4");
        assert_eq!(infer_diagram_type("xychart-beta"), "xychart");
    }

    #[test]
    fn test_infer_unknown_keyword_kept_literally() {
        assert_eq!(infer_diagram_type("zenuml\nA->B"), "zenuml");
        assert_eq!(infer_diagram_type("Graph TD"), "Graph");
    }

    #[test]
    fn test_infer_without_leading_word() {
        assert_eq!(infer_diagram_type(""), UNKNOWN_DIAGRAM_TYPE);
        assert_eq!(infer_diagram_type("  graph TD"), UNKNOWN_DIAGRAM_TYPE);
        assert_eq!(infer_diagram_type("---\ntitle: x\n---"), UNKNOWN_DIAGRAM_TYPE);
        assert_eq!(infer_diagram_type("\ngraph TD"), UNKNOWN_DIAGRAM_TYPE);
    }

    #[test]
    fn test_failed_result_never_has_empty_error() {
        let result = ValidationResult::failed("   ", Duration::from_millis(3));
        assert!(!result.is_valid());
        assert_eq!(result.error(), Some(ValidationResult::UNSPECIFIED_ERROR));
    }

    #[test]
    fn test_passed_result_has_no_error() {
        let result = ValidationResult::passed(Duration::from_micros(1500));
        assert!(result.is_valid());
        assert_eq!(result.error(), None);
        assert!((result.elapsed_ms() - 1.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_checked_block_serializes_flat() {
        let block = Block::new(0, 2, 4, "graph TD\nA-->B");
        let checked = CheckedBlock::new(block, ValidationResult::passed(Duration::ZERO));
        let json = serde_json::to_value(&checked).unwrap();

        assert_eq!(json["index"], 0);
        assert_eq!(json["lineStart"], 2);
        assert_eq!(json["lineEnd"], 4);
        assert_eq!(json["diagramType"], "flowchart");
        assert_eq!(json["valid"], true);
        assert!(json["error"].is_null());
        assert!(json.get("code").is_none());
        assert!(json.get("fileName").is_none());
    }

    #[test]
    fn test_block_display() {
        let block = Block::new(2, 10, 13, "pie\n\"a\": 1");
        assert_eq!(block.to_string(), "block 2 (pie, lines 10-13)");
    }
}
