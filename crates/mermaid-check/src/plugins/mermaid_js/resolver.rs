//! Locating Node.js and the JavaScript packages the harness needs
//!
//! `node_modules` is found by trying [`ResolutionStrategy`]s in order; the
//! first directory that holds every package in [`REQUIRED_PACKAGES`] wins.
//! When all of them fall through the run cannot start.

use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{debug, trace};

use crate::core::{CheckError, Result};

/// Packages that must be importable from the resolved `node_modules`
pub const REQUIRED_PACKAGES: &[&str] = &["mermaid", "jsdom"];

/// Overrides the Node.js binary
pub const NODE_ENV: &str = "MERMAID_CHECK_NODE";

/// Overrides the `node_modules` search
pub const NODE_MODULES_ENV: &str = "MERMAID_CHECK_NODE_MODULES";

/// One place to look for a usable `node_modules` directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolutionStrategy {
    /// A configured directory, either `node_modules` itself or a project root
    Explicit(PathBuf),
    /// `node_modules` in the working directory or any ancestor
    CurrentDirAncestors,
    /// `node_modules` next to the executable or any ancestor
    ExecutableAncestors,
    /// The global npm install root
    GlobalNpmRoot,
}

impl ResolutionStrategy {
    /// Strategies in the order they are tried
    pub fn defaults(explicit: Option<PathBuf>) -> Vec<ResolutionStrategy> {
        let mut strategies = Vec::with_capacity(4);
        if let Some(dir) = explicit {
            strategies.push(ResolutionStrategy::Explicit(dir));
        }
        strategies.extend([
            ResolutionStrategy::CurrentDirAncestors,
            ResolutionStrategy::ExecutableAncestors,
            ResolutionStrategy::GlobalNpmRoot,
        ]);
        strategies
    }

    /// Try this strategy, returning the `node_modules` directory it found
    pub fn resolve(&self) -> Option<PathBuf> {
        match self {
            ResolutionStrategy::Explicit(dir) => [dir.clone(), dir.join("node_modules")]
                .into_iter()
                .find(|candidate| has_required_packages(candidate)),
            ResolutionStrategy::CurrentDirAncestors => {
                std::env::current_dir().ok().and_then(|cwd| search_ancestors(&cwd))
            }
            ResolutionStrategy::ExecutableAncestors => std::env::current_exe()
                .ok()
                .and_then(|exe| exe.parent().and_then(search_ancestors)),
            ResolutionStrategy::GlobalNpmRoot => {
                npm_global_root().filter(|dir| has_required_packages(dir))
            }
        }
    }
}

impl fmt::Display for ResolutionStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolutionStrategy::Explicit(dir) => write!(f, "configured path {}", dir.display()),
            ResolutionStrategy::CurrentDirAncestors => write!(f, "working directory ancestors"),
            ResolutionStrategy::ExecutableAncestors => write!(f, "executable ancestors"),
            ResolutionStrategy::GlobalNpmRoot => write!(f, "global npm root"),
        }
    }
}

/// Find a `node_modules` directory holding the harness packages
pub fn resolve_node_modules(strategies: &[ResolutionStrategy]) -> Result<PathBuf> {
    for strategy in strategies {
        trace!(%strategy, "Trying node_modules resolution strategy");
        if let Some(dir) = strategy.resolve() {
            debug!(%strategy, path = %dir.display(), "Resolved node_modules");
            return Ok(dir);
        }
    }

    let tried = strategies
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ");
    Err(CheckError::setup(format!(
        "could not find {} in any node_modules (tried: {})",
        REQUIRED_PACKAGES.join(" and "),
        tried
    )))
}

/// Find the Node.js binary, preferring an explicit path
pub fn resolve_node(explicit: Option<&Path>) -> Result<PathBuf> {
    match explicit {
        Some(path) if path.is_file() => Ok(path.to_path_buf()),
        Some(path) => Err(CheckError::setup(format!(
            "Node.js binary not found at {}",
            path.display()
        ))),
        None => which::which("node")
            .map_err(|e| CheckError::setup(format!("Node.js is not on PATH ({e})"))),
    }
}

/// Whether `dir` contains every package in [`REQUIRED_PACKAGES`]
pub fn has_required_packages(dir: &Path) -> bool {
    REQUIRED_PACKAGES
        .iter()
        .all(|package| dir.join(package).join("package.json").is_file())
}

fn search_ancestors(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .map(|dir| dir.join("node_modules"))
        .find(|candidate| has_required_packages(candidate))
}

fn npm_global_root() -> Option<PathBuf> {
    let npm = which::which("npm").ok()?;
    let output = Command::new(npm).args(["root", "-g"]).output().ok()?;
    if !output.status.success() {
        return None;
    }
    let root = String::from_utf8(output.stdout).ok()?;
    let root = root.trim();
    (!root.is_empty()).then(|| PathBuf::from(root))
}
