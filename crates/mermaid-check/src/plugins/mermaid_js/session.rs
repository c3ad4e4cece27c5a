//! The long-lived Node.js process running the harness
//!
//! Requests go to the child's stdin as one JSON object per line. A reader
//! thread forwards stdout lines over a channel so each wait can be bounded;
//! a second thread drains stderr into the log.

use serde::{Deserialize, Serialize};
use std::io::{self, BufRead, BufReader, Write};
use std::path::Path;
use std::process::{Child, ChildStdin, Command, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, trace};

use crate::core::{CheckError, ParseFailure, Result};

const HARNESS: &str = include_str!("harness.mjs");

/// Environment variable the harness reads its `node_modules` path from
pub(crate) const HARNESS_NODE_MODULES_ENV: &str = "MERMAID_CHECK_NODE_MODULES_DIR";

#[derive(Debug, Deserialize)]
struct Handshake {
    #[serde(default)]
    ready: bool,
    version: Option<String>,
    fatal: Option<String>,
}

#[derive(Debug, Serialize)]
struct Request<'a> {
    id: u64,
    code: &'a str,
}

#[derive(Debug, Deserialize)]
struct Response {
    id: u64,
    valid: bool,
    #[serde(default)]
    error: Option<String>,
}

/// A running harness that has completed its handshake
pub(crate) struct HarnessSession {
    child: Child,
    stdin: ChildStdin,
    lines: Receiver<io::Result<String>>,
    next_id: u64,
    version: String,
}

impl HarnessSession {
    /// Start the harness and wait up to `startup_timeout` for it to load mermaid
    pub(crate) fn spawn(
        node: &Path,
        node_modules: &Path,
        startup_timeout: Duration,
    ) -> Result<Self> {
        debug!(node = %node.display(), node_modules = %node_modules.display(), "Spawning harness");

        let mut child = Command::new(node)
            .arg("--input-type=module")
            .arg("--eval")
            .arg(HARNESS)
            .env(HARNESS_NODE_MODULES_ENV, node_modules)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                CheckError::setup(format!("failed to start {}: {e}", node.display()))
            })?;

        let (Some(stdin), Some(stdout), Some(stderr)) =
            (child.stdin.take(), child.stdout.take(), child.stderr.take())
        else {
            let _ = child.kill();
            return Err(CheckError::setup("harness stdio was not captured"));
        };

        let (tx, lines) = mpsc::channel();
        thread::Builder::new()
            .name("mermaid-harness-stdout".to_string())
            .spawn(move || {
                for line in BufReader::new(stdout).lines() {
                    if tx.send(line).is_err() {
                        break;
                    }
                }
            })
            .map_err(|e| CheckError::setup(format!("failed to start reader thread: {e}")))?;

        thread::Builder::new()
            .name("mermaid-harness-stderr".to_string())
            .spawn(move || {
                for line in BufReader::new(stderr).lines().map_while(|line| line.ok()) {
                    debug!(target: "mermaid_check::plugins::mermaid_js::harness", "{}", line);
                }
            })
            .map_err(|e| CheckError::setup(format!("failed to start stderr thread: {e}")))?;

        let mut session = Self {
            child,
            stdin,
            lines,
            next_id: 0,
            version: String::new(),
        };
        session.version = session.handshake(startup_timeout)?;
        Ok(session)
    }

    pub(crate) fn version(&self) -> &str {
        &self.version
    }

    fn handshake(&mut self, startup_timeout: Duration) -> Result<String> {
        let deadline = Instant::now() + startup_timeout;
        loop {
            let line = match self.next_line(Some(deadline)) {
                Ok(line) => line,
                Err(RecvTimeoutError::Timeout) => {
                    return Err(CheckError::setup(format!(
                        "harness did not become ready within {}ms",
                        startup_timeout.as_millis()
                    )))
                }
                Err(RecvTimeoutError::Disconnected) => {
                    return Err(CheckError::setup("harness exited before becoming ready"))
                }
            };

            match serde_json::from_str::<Handshake>(&line) {
                Ok(Handshake {
                    fatal: Some(reason),
                    ..
                }) => return Err(CheckError::setup(reason)),
                Ok(Handshake {
                    ready: true,
                    version,
                    ..
                }) => {
                    let version = version.unwrap_or_else(|| "unknown".to_string());
                    debug!(%version, "Harness ready");
                    return Ok(version);
                }
                _ => trace!(%line, "Ignoring output before handshake"),
            }
        }
    }

    /// Send one block to the harness and wait for its verdict
    pub(crate) fn parse(
        &mut self,
        code: &str,
        timeout: Option<Duration>,
    ) -> std::result::Result<(), ParseFailure> {
        let id = self.next_id;
        self.next_id += 1;

        let mut request = serde_json::to_string(&Request { id, code })
            .map_err(|e| ParseFailure::Crashed(format!("could not encode request: {e}")))?;
        request.push('\n');
        self.stdin
            .write_all(request.as_bytes())
            .and_then(|_| self.stdin.flush())
            .map_err(|e| ParseFailure::Crashed(format!("could not send request: {e}")))?;

        let deadline = timeout.map(|limit| Instant::now() + limit);
        loop {
            let line = match self.next_line(deadline) {
                Ok(line) => line,
                Err(RecvTimeoutError::Timeout) => {
                    return Err(ParseFailure::Timeout(timeout.unwrap_or_default()))
                }
                Err(RecvTimeoutError::Disconnected) => {
                    return Err(ParseFailure::Crashed("parser process exited".to_string()))
                }
            };

            match serde_json::from_str::<Response>(&line) {
                Ok(response) if response.id == id => {
                    trace!(id, valid = response.valid, "Harness response");
                    return if response.valid {
                        Ok(())
                    } else {
                        Err(ParseFailure::Syntax(response.error.unwrap_or_default()))
                    };
                }
                Ok(response) => trace!(expected = id, got = response.id, "Skipping stale response"),
                Err(_) => trace!(%line, "Ignoring non-protocol output"),
            }
        }
    }

    /// Next stdout line, waiting until `deadline` if there is one
    fn next_line(
        &self,
        deadline: Option<Instant>,
    ) -> std::result::Result<String, RecvTimeoutError> {
        let received = match deadline {
            Some(deadline) => self
                .lines
                .recv_timeout(deadline.saturating_duration_since(Instant::now())),
            None => self.lines.recv().map_err(|_| RecvTimeoutError::Disconnected),
        };
        match received {
            Ok(Ok(line)) => Ok(line),
            Ok(Err(e)) => {
                debug!(error = %e, "Harness stdout unreadable");
                Err(RecvTimeoutError::Disconnected)
            }
            Err(e) => Err(e),
        }
    }
}

impl Drop for HarnessSession {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::super::test_support::{fake_node, fake_node_modules, READY, RESPONDER};
    use super::*;

    const STARTUP: Duration = Duration::from_secs(5);

    fn spawn(body: &str) -> (tempfile::TempDir, Result<HarnessSession>) {
        let dir = tempfile::tempdir().unwrap();
        let node = fake_node(dir.path(), body);
        let node_modules = fake_node_modules(dir.path());
        let session = HarnessSession::spawn(&node, &node_modules, STARTUP);
        (dir, session)
    }

    #[test]
    fn test_handshake_and_valid_response() {
        let (_dir, session) = spawn(&format!("{READY}\n{RESPONDER}"));
        let mut session = session.unwrap();
        assert_eq!(session.version(), "0.0.0-test");
        assert_eq!(session.parse("graph TD", Some(STARTUP)), Ok(()));
        assert_eq!(session.parse("pie", None), Ok(()));
    }

    #[test]
    fn test_noise_before_handshake_is_skipped() {
        let (_dir, session) = spawn(&format!("echo 'loading mermaid'\n{READY}\n{RESPONDER}"));
        assert!(session.is_ok());
    }

    #[test]
    fn test_syntax_error_response() {
        let response = r#"{"id":0,"valid":false,"error":"Parse error on line 2"}"#;
        let body = format!("{READY}\nread -r line\necho '{response}'\nsleep 5");
        let (_dir, session) = spawn(&body);
        let mut session = session.unwrap();
        assert_eq!(
            session.parse("graph TD\nA--", Some(STARTUP)),
            Err(ParseFailure::Syntax("Parse error on line 2".to_string()))
        );
    }

    #[test]
    fn test_slow_response_times_out() {
        let (_dir, session) = spawn(&format!("{READY}\n{RESPONDER}"));
        let mut session = session.unwrap();

        let limit = Duration::from_millis(300);
        let start = Instant::now();
        assert_eq!(session.parse("hang", Some(limit)), Err(ParseFailure::Timeout(limit)));
        assert!(start.elapsed() >= limit);
    }

    #[test]
    fn test_exit_mid_run_is_crash() {
        let (_dir, session) = spawn(&format!("{READY}\nread -r line\nexit 3"));
        let mut session = session.unwrap();
        let failure = session.parse("graph TD", Some(STARTUP)).unwrap_err();
        assert!(matches!(failure, ParseFailure::Crashed(_)));
    }

    #[test]
    fn test_fatal_handshake() {
        let (_dir, session) = spawn(r#"echo '{"fatal":"jsdom is not installed"}'"#);
        let error = session.err().unwrap();
        assert!(matches!(error, CheckError::Setup { .. }));
        assert!(error.to_string().contains("jsdom is not installed"));
    }

    #[test]
    fn test_exit_before_handshake() {
        let (_dir, session) = spawn("exit 1");
        let error = session.err().unwrap();
        assert!(matches!(error, CheckError::Setup { .. }));
        assert!(error.to_string().contains("exited before becoming ready"));
    }

    #[test]
    fn test_silent_startup_times_out() {
        let dir = tempfile::tempdir().unwrap();
        let node = fake_node(dir.path(), "exec sleep 30");
        let node_modules = fake_node_modules(dir.path());
        let error = HarnessSession::spawn(&node, &node_modules, Duration::from_millis(300))
            .err()
            .unwrap();
        assert!(error.to_string().contains("did not become ready within 300ms"));
    }
}
