//! Mermaid.js parser backend
//!
//! Runs the official mermaid package in a Node.js child process with a jsdom
//! window standing in for the browser. The process is started once and
//! reused for every block; it is restarted only after a timeout or crash.
//!
//! # Requirements
//!
//! `node` on PATH (or [`NODE_ENV`]) and a `node_modules` with `mermaid` and
//! `jsdom`, found through [`ResolutionStrategy`]:
//!
//! ```bash
//! npm install mermaid jsdom
//! ```

mod resolver;
mod session;
#[cfg(all(test, unix))]
mod test_support;

pub use resolver::*;

use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, span, warn, Level};

use self::session::HarnessSession;
use crate::core::{DiagramParser, ParseFailure, Result};

/// Default bound on harness start-up, which includes importing mermaid
pub const DEFAULT_STARTUP_TIMEOUT: Duration = Duration::from_secs(30);

/// Where to find Node.js and the harness packages
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MermaidJsConfig {
    /// Node.js binary; `None` searches PATH
    pub node: Option<PathBuf>,
    /// Directory tried before the default search
    pub node_modules: Option<PathBuf>,
    pub startup_timeout: Duration,
}

impl MermaidJsConfig {
    /// Defaults overridden by [`NODE_ENV`] and [`NODE_MODULES_ENV`]
    pub fn from_env() -> Self {
        Self {
            node: std::env::var_os(NODE_ENV).map(PathBuf::from),
            node_modules: std::env::var_os(NODE_MODULES_ENV).map(PathBuf::from),
            ..Self::default()
        }
    }

    pub fn with_node(mut self, node: impl Into<PathBuf>) -> Self {
        self.node = Some(node.into());
        self
    }

    pub fn with_node_modules(mut self, node_modules: impl Into<PathBuf>) -> Self {
        self.node_modules = Some(node_modules.into());
        self
    }
}

impl Default for MermaidJsConfig {
    fn default() -> Self {
        Self {
            node: None,
            node_modules: None,
            startup_timeout: DEFAULT_STARTUP_TIMEOUT,
        }
    }
}

/// [`DiagramParser`] backed by mermaid.js
pub struct MermaidJs {
    node: PathBuf,
    node_modules: PathBuf,
    startup_timeout: Duration,
    version: String,
    session: Option<HarnessSession>,
}

impl MermaidJs {
    /// Locate Node.js and mermaid, start the harness and wait until it is ready
    ///
    /// Any failure here is a setup error for the whole run.
    pub fn setup(config: &MermaidJsConfig) -> Result<Self> {
        let setup_span = span!(Level::INFO, "mermaid_js_setup");
        let _enter = setup_span.enter();

        let node = resolve_node(config.node.as_deref())?;
        let strategies = ResolutionStrategy::defaults(config.node_modules.clone());
        let node_modules = resolve_node_modules(&strategies)?;
        let session = HarnessSession::spawn(&node, &node_modules, config.startup_timeout)?;
        let version = session.version().to_string();

        info!(
            %version,
            node = %node.display(),
            node_modules = %node_modules.display(),
            "Mermaid parser ready"
        );

        Ok(Self {
            node,
            node_modules,
            startup_timeout: config.startup_timeout,
            version,
            session: Some(session),
        })
    }

    /// Version of the loaded mermaid package
    pub fn version(&self) -> &str {
        &self.version
    }

    fn ensure_session(&mut self) -> std::result::Result<&mut HarnessSession, ParseFailure> {
        if self.session.is_none() {
            info!("Restarting parser process");
            let session =
                HarnessSession::spawn(&self.node, &self.node_modules, self.startup_timeout)
                    .map_err(|e| ParseFailure::Crashed(format!("could not restart parser: {e}")))?;
            self.session = Some(session);
        }
        self.session
            .as_mut()
            .ok_or_else(|| ParseFailure::Crashed("parser is not running".to_string()))
    }
}

impl DiagramParser for MermaidJs {
    fn name(&self) -> &str {
        "mermaid.js"
    }

    fn prepare(&mut self) -> std::result::Result<(), ParseFailure> {
        self.ensure_session().map(|_| ())
    }

    fn parse(
        &mut self,
        code: &str,
        timeout: Option<Duration>,
    ) -> std::result::Result<(), ParseFailure> {
        let session = self.ensure_session()?;
        let outcome = session.parse(code, timeout);
        if let Err(failure @ (ParseFailure::Timeout(_) | ParseFailure::Crashed(_))) = &outcome {
            warn!(%failure, "Stopping parser process; it will restart for the next block");
            self.session = None;
        }
        outcome
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::test_support::{fake_node, fake_node_modules, READY, RESPONDER};
    use super::*;
    use crate::core::CheckError;
    use std::fs;
    use std::path::Path;

    fn config(dir: &Path, body: &str) -> MermaidJsConfig {
        MermaidJsConfig::default()
            .with_node(fake_node(dir, body))
            .with_node_modules(fake_node_modules(dir))
    }

    #[test]
    fn test_setup_reports_version() {
        let dir = tempfile::tempdir().unwrap();
        let body = format!("{READY}\n{RESPONDER}");
        let parser = MermaidJs::setup(&config(dir.path(), &body)).unwrap();
        assert_eq!(parser.version(), "0.0.0-test");
        assert_eq!(parser.name(), "mermaid.js");
    }

    #[test]
    fn test_fatal_handshake_is_setup_error() {
        let dir = tempfile::tempdir().unwrap();
        let body = r#"echo '{"fatal":"Cannot find package mermaid"}'"#;
        let error = MermaidJs::setup(&config(dir.path(), body)).err().unwrap();
        assert!(matches!(error, CheckError::Setup { .. }));
        assert!(error.to_string().contains("Cannot find package mermaid"));
    }

    #[test]
    fn test_restart_after_timeout() {
        let dir = tempfile::tempdir().unwrap();
        let spawns = dir.path().join("spawns");
        let body = format!("echo spawn >> '{}'\n{READY}\n{RESPONDER}", spawns.display());
        let mut parser = MermaidJs::setup(&config(dir.path(), &body)).unwrap();

        let limit = Duration::from_millis(300);
        assert_eq!(parser.parse("hang", Some(limit)), Err(ParseFailure::Timeout(limit)));
        assert!(parser.session.is_none());

        parser.prepare().unwrap();
        assert!(parser.session.is_some());
        assert_eq!(parser.parse("graph TD", Some(limit)), Ok(()));

        let count = fs::read_to_string(&spawns).unwrap().lines().count();
        assert_eq!(count, 2);
    }

    #[test]
    fn test_parse_restarts_without_prepare() {
        let dir = tempfile::tempdir().unwrap();
        let mut parser =
            MermaidJs::setup(&config(dir.path(), &format!("{READY}\n{RESPONDER}"))).unwrap();
        parser.session = None;
        assert_eq!(parser.parse("graph TD", Some(Duration::from_secs(5))), Ok(()));
    }
}
