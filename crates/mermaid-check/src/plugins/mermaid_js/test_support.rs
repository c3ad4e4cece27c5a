//! Stand-ins for Node.js and an npm install, driven by `/bin/sh`

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use super::REQUIRED_PACKAGES;

/// Handshake line the real harness prints once mermaid is loaded
pub(crate) const READY: &str = r#"echo '{"ready":true,"version":"0.0.0-test"}'"#;

/// Answers every request as valid, except code containing `hang`
pub(crate) const RESPONDER: &str = r#"while read -r line; do
  case "$line" in
    *hang*) exec sleep 30 ;;
  esac
  id=$(printf '%s' "$line" | sed 's/^{"id":\([0-9]*\).*/\1/')
  echo "{\"id\":$id,\"valid\":true}"
done"#;

/// Write an executable shell script posing as `node`
pub(crate) fn fake_node(dir: &Path, body: &str) -> PathBuf {
    let path = dir.join("node");
    fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    path
}

/// A `node_modules` that passes resolution without real packages
pub(crate) fn fake_node_modules(root: &Path) -> PathBuf {
    let node_modules = root.join("node_modules");
    for package in REQUIRED_PACKAGES {
        let dir = node_modules.join(package);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("package.json"), "{}").unwrap();
    }
    node_modules
}
