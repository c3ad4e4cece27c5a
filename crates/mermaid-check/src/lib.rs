//! Mermaid Check - Validate Mermaid.js diagrams embedded in Markdown
//!
//! A library for finding fenced `mermaid` blocks in Markdown documents and
//! checking each one against the Mermaid grammar.
//!
//! # Quick Start
//!
//! ```rust
//! use mermaid_check::extract;
//!
//! let doc = "# Design\n\n```mermaid\nsequenceDiagram\n    A->>B: hello\n```\n";
//! let blocks = extract(doc);
//! assert_eq!(blocks.len(), 1);
//! assert_eq!(blocks[0].diagram_type, "sequence");
//! ```
//!
//! # Advanced Usage
//!
//! Validation needs a [`DiagramParser`]. The bundled one runs mermaid.js under
//! Node.js; any other implementation can be plugged into a [`plugins::Checker`]:
//!
//! ```rust
//! use mermaid_check::prelude::*;
//! use std::time::Duration;
//!
//! struct AcceptAll;
//!
//! impl DiagramParser for AcceptAll {
//!     fn name(&self) -> &str {
//!         "accept-all"
//!     }
//!
//!     fn parse(&mut self, _code: &str, _timeout: Option<Duration>) -> Result<(), ParseFailure> {
//!         Ok(())
//!     }
//! }
//!
//! let mut checker = Checker::with_parser(CheckConfig::default(), Box::new(AcceptAll));
//! let report = checker
//!     .check_text("notes.md", "```mermaid\ngraph TD\nA-->B\n```")
//!     .unwrap();
//! assert_eq!(report.valid_count(), 1);
//! assert_eq!(report.outcome(), Outcome::Passed);
//! ```

pub mod core;
pub mod plugins;

pub use core::*;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::core::{
        extract, ArtifactDir, Block, CheckError, CheckedBlock, DiagramParser, Extractor,
        MultiReport, Outcome, ParseFailure, Report, Summary, ValidationResult, Validator,
        ValidatorConfig,
    };
    pub use crate::plugins::{CheckConfig, Checker, MermaidJs, MermaidJsConfig};
}

/// Check one Markdown file with mermaid.js, configured from the environment
///
/// Node.js and the `mermaid`/`jsdom` packages are only looked up when the
/// document actually contains diagram blocks.
pub fn check_file(path: impl AsRef<std::path::Path>) -> Result<Report> {
    let mut checker = plugins::Checker::mermaid_js(
        plugins::CheckConfig::default(),
        plugins::MermaidJsConfig::from_env(),
    );
    checker.check_document(path.as_ref())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_file_without_blocks_needs_no_parser() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("README.md");
        std::fs::write(&path, "# Title\n\n```rust\nfn main() {}\n```\n").unwrap();

        let report = check_file(&path).unwrap();
        assert_eq!(report.total_blocks(), 0);
        assert_eq!(report.outcome(), Outcome::Passed);
    }

    #[test]
    fn test_check_file_missing() {
        let error = check_file("definitely/not/here.md").unwrap_err();
        assert!(matches!(error, CheckError::NotFound { .. }));
    }
}
