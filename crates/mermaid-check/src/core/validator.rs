//! Block validation against an external diagram parser
//!
//! The parser is a black box behind [`DiagramParser`]. [`Validator`] times
//! each call and folds every kind of parser failure into a
//! [`ValidationResult`], so nothing a parser does can abort a run.

use std::fmt;
use std::time::{Duration, Instant};
use tracing::{debug, span, trace, Level};

use super::types::ValidationResult;

/// Default bound on a single parse call
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Ways a parse call can fail
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseFailure {
    /// The parser rejected the input; carries its message
    Syntax(String),
    /// The parser did not answer within the allowed time
    Timeout(Duration),
    /// The parser went away or answered with garbage
    Crashed(String),
}

impl ParseFailure {
    /// Message to report for this failure
    ///
    /// Falls back to the display form when a syntax failure has no text.
    pub fn message(&self) -> String {
        match self {
            ParseFailure::Syntax(message) if !message.trim().is_empty() => message.clone(),
            other => other.to_string(),
        }
    }
}

impl fmt::Display for ParseFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseFailure::Syntax(message) if message.trim().is_empty() => {
                write!(f, "{}", ValidationResult::UNSPECIFIED_ERROR)
            }
            ParseFailure::Syntax(message) => write!(f, "{}", message),
            ParseFailure::Timeout(limit) => {
                write!(f, "validation timed out after {}ms", limit.as_millis())
            }
            ParseFailure::Crashed(message) => write!(f, "parser failed: {}", message),
        }
    }
}

/// The external syntax checker
///
/// Implementations must be callable repeatedly with unrelated inputs.
pub trait DiagramParser: Send {
    /// Human-readable name of the parser
    fn name(&self) -> &str;

    /// Get ready for the next `parse` call
    ///
    /// Runs outside the timed region, so restarting a backend here does not
    /// count against the next block.
    fn prepare(&mut self) -> Result<(), ParseFailure> {
        Ok(())
    }

    /// Check `code`, giving up after `timeout` when one is set
    fn parse(&mut self, code: &str, timeout: Option<Duration>) -> Result<(), ParseFailure>;
}

/// Validator settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatorConfig {
    /// Per-block bound; `None` waits forever
    pub timeout: Option<Duration>,
}

impl ValidatorConfig {
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            timeout: Some(DEFAULT_TIMEOUT),
        }
    }
}

/// Times parse calls and turns their outcome into [`ValidationResult`]s
pub struct Validator {
    parser: Box<dyn DiagramParser>,
    config: ValidatorConfig,
}

impl Validator {
    pub fn new(parser: Box<dyn DiagramParser>) -> Self {
        Self::with_config(parser, ValidatorConfig::default())
    }

    pub fn with_config(parser: Box<dyn DiagramParser>, config: ValidatorConfig) -> Self {
        Self { parser, config }
    }

    pub fn parser_name(&self) -> &str {
        self.parser.name()
    }

    /// Validate one block of diagram source
    pub fn validate(&mut self, code: &str) -> ValidationResult {
        let validate_span = span!(Level::DEBUG, "validate", code_len = code.len());
        let _enter = validate_span.enter();

        if let Err(failure) = self.parser.prepare() {
            debug!(failure = %failure, "Parser not ready");
            return ValidationResult::failed(failure.message(), Duration::ZERO);
        }

        let start = Instant::now();
        let outcome = self.parser.parse(code, self.config.timeout);
        let elapsed = start.elapsed();

        match outcome {
            Ok(()) => {
                trace!(elapsed_us = elapsed.as_micros() as u64, "Block is valid");
                ValidationResult::passed(elapsed)
            }
            Err(failure) => {
                debug!(
                    elapsed_us = elapsed.as_micros() as u64,
                    failure = %failure,
                    "Block is invalid"
                );
                ValidationResult::failed(failure.message(), elapsed)
            }
        }
    }
}

impl fmt::Debug for Validator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Validator")
            .field("parser", &self.parser.name())
            .field("config", &self.config)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Scripted(Vec<Result<(), ParseFailure>>);

    impl DiagramParser for Scripted {
        fn name(&self) -> &str {
            "scripted"
        }

        fn parse(&mut self, _code: &str, _timeout: Option<Duration>) -> Result<(), ParseFailure> {
            self.0.remove(0)
        }
    }

    fn validator(script: Vec<Result<(), ParseFailure>>) -> Validator {
        Validator::new(Box::new(Scripted(script)))
    }

    #[test]
    fn test_success_has_no_error() {
        let result = validator(vec![Ok(())]).validate("graph TD");
        assert!(result.is_valid());
        assert!(result.error().is_none());
        assert!(result.elapsed_ms() >= 0.0);
    }

    #[test]
    fn test_syntax_failure_message_kept() {
        let failure = ParseFailure::Syntax("Parse error on line 2".to_string());
        let result = validator(vec![Err(failure)]).validate("graph TD\nA--");
        assert!(!result.is_valid());
        assert_eq!(result.error(), Some("Parse error on line 2"));
    }

    #[test]
    fn test_empty_syntax_message_falls_back() {
        let result = validator(vec![Err(ParseFailure::Syntax(String::new()))]).validate("x");
        assert_eq!(result.error(), Some(ValidationResult::UNSPECIFIED_ERROR));
    }

    #[test]
    fn test_timeout_is_a_failed_result() {
        let failure = ParseFailure::Timeout(Duration::from_millis(250));
        let result = validator(vec![Err(failure)]).validate("graph TD");
        assert!(!result.is_valid());
        assert_eq!(result.error(), Some("validation timed out after 250ms"));
    }

    #[test]
    fn test_crash_is_a_failed_result() {
        let failure = ParseFailure::Crashed("process exited".to_string());
        let result = validator(vec![Err(failure)]).validate("graph TD");
        assert_eq!(result.error(), Some("parser failed: process exited"));
    }

    struct SlowStart {
        restarts: usize,
    }

    impl DiagramParser for SlowStart {
        fn name(&self) -> &str {
            "slow-start"
        }

        fn prepare(&mut self) -> Result<(), ParseFailure> {
            self.restarts += 1;
            if self.restarts > 1 {
                return Err(ParseFailure::Crashed("could not restart".to_string()));
            }
            std::thread::sleep(Duration::from_millis(200));
            Ok(())
        }

        fn parse(&mut self, _code: &str, _timeout: Option<Duration>) -> Result<(), ParseFailure> {
            Ok(())
        }
    }

    #[test]
    fn test_prepare_is_not_timed() {
        let mut validator = Validator::new(Box::new(SlowStart { restarts: 0 }));
        let result = validator.validate("graph TD");
        assert!(result.is_valid());
        assert!(result.elapsed_ms() < 200.0);
    }

    #[test]
    fn test_prepare_failure_is_a_failed_result() {
        let mut validator = Validator::new(Box::new(SlowStart { restarts: 1 }));
        let result = validator.validate("graph TD");
        assert!(!result.is_valid());
        assert_eq!(result.error(), Some("parser failed: could not restart"));
    }

    #[test]
    fn test_default_config_has_timeout() {
        let config = ValidatorConfig::default();
        assert_eq!(config.timeout, Some(DEFAULT_TIMEOUT));
        assert_eq!(config.with_timeout(None).timeout, None);
    }

    #[test]
    fn test_debug_shows_parser_name() {
        let debug = format!("{:?}", validator(Vec::new()));
        assert!(debug.contains("scripted"));
    }
}
