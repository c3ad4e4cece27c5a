//! Fenced diagram block extraction
//!
//! Scans Markdown line by line for code fences tagged with a diagram
//! language and records each block's source and line range. The scanner
//! knows nothing about Markdown beyond fence lines: a fence only opens on a
//! line that trims to exactly `` ```<language> `` and only closes on a line
//! that trims to exactly `` ``` ``.

use tracing::{debug, span, trace, warn, Level};

use super::types::Block;

/// Fence language targeted by default
pub const DEFAULT_LANGUAGE: &str = "mermaid";

const FENCE: &str = "```";

/// Line-oriented scanner for fenced diagram blocks
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extractor {
    language: String,
    open_marker: String,
}

impl Extractor {
    /// Create an extractor for fences tagged with `language`
    pub fn new(language: impl Into<String>) -> Self {
        let language = language.into();
        let open_marker = format!("{FENCE}{language}");
        Self {
            language,
            open_marker,
        }
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    /// Extract every closed diagram block from `text`, in document order
    ///
    /// A block still open at end of input is dropped.
    pub fn extract(&self, text: &str) -> Vec<Block> {
        let extract_span = span!(Level::DEBUG, "extract", input_len = text.len());
        let _enter = extract_span.enter();

        let mut blocks = Vec::new();
        let mut current: Option<usize> = None;
        let mut lines: Vec<&str> = Vec::new();

        for (offset, raw) in text.split('\n').enumerate() {
            let line_number = offset + 1;
            let line = raw.strip_suffix('\r').unwrap_or(raw);
            let trimmed = line.trim();

            match current {
                None if trimmed == self.open_marker => {
                    trace!(line = line_number, "Opening fence");
                    current = Some(line_number + 1);
                    lines.clear();
                }
                None => {}
                Some(line_start) if trimmed == FENCE => {
                    let block = Block::new(blocks.len(), line_start, line_number, lines.join("\n"));
                    trace!(
                        index = block.index,
                        line_start,
                        line_end = line_number,
                        diagram_type = %block.diagram_type,
                        "Closed block"
                    );
                    blocks.push(block);
                    current = None;
                }
                Some(_) => lines.push(line),
            }
        }

        if let Some(line_start) = current {
            warn!(
                opened_at = line_start - 1,
                language = %self.language,
                "Dropping unterminated diagram block"
            );
        }

        debug!(block_count = blocks.len(), "Extraction completed");
        blocks
    }
}

impl Default for Extractor {
    fn default() -> Self {
        Self::new(DEFAULT_LANGUAGE)
    }
}

/// Extract Mermaid blocks from a Markdown document
///
/// # Example
/// ```rust
/// use mermaid_check::extract;
///
/// let doc = "# Title\n\n```mermaid\ngraph TD\nA-->B\n```\n";
/// let blocks = extract(doc);
/// assert_eq!(blocks.len(), 1);
/// assert_eq!(blocks[0].line_start, 4);
/// assert_eq!(blocks[0].line_end, 6);
/// assert_eq!(blocks[0].diagram_type, "flowchart");
/// ```
pub fn extract(text: &str) -> Vec<Block> {
    Extractor::default().extract(text)
}
