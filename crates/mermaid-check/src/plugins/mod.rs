//! Parser backends and the orchestrator that drives them
//!
//! The core traits know nothing about how diagrams are parsed; this module
//! supplies the mermaid.js backend and wires it into the check pipeline.

pub mod mermaid_js;
pub mod orchestrator;

pub use mermaid_js::{MermaidJs, MermaidJsConfig};
pub use orchestrator::*;
