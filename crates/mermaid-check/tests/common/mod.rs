//! Shared helpers for integration tests

#![allow(dead_code)]

use mermaid_check::{DiagramParser, ParseFailure};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Parser that rejects any diagram containing a given token
pub struct TokenParser {
    token: String,
    calls: Arc<AtomicUsize>,
}

impl TokenParser {
    /// Returns the parser and a counter of `parse` calls
    pub fn rejecting(token: &str) -> (Self, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let parser = Self {
            token: token.to_string(),
            calls: Arc::clone(&calls),
        };
        (parser, calls)
    }
}

impl DiagramParser for TokenParser {
    fn name(&self) -> &str {
        "token"
    }

    fn parse(&mut self, code: &str, _timeout: Option<Duration>) -> Result<(), ParseFailure> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match code.lines().position(|line| line.contains(&self.token)) {
            Some(line) => Err(ParseFailure::Syntax(format!(
                "Parse error on line {}: unexpected '{}'",
                line + 1,
                self.token
            ))),
            None => Ok(()),
        }
    }
}

/// Fenced block of `language` around `body`
pub fn fence(language: &str, body: &str) -> String {
    format!("```{language}\n{body}\n```\n")
}

pub fn calls(counter: &Arc<AtomicUsize>) -> usize {
    counter.load(Ordering::SeqCst)
}
