//! Turning command-line inputs into a list of documents

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use mermaid_check::CheckError;

/// File extensions picked up when scanning a directory
pub const MARKDOWN_EXTENSIONS: &[&str] = &["md", "markdown"];

/// Documents selected for one run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Targets {
    pub documents: Vec<PathBuf>,
    /// Exactly one literal path was given
    pub single: bool,
}

fn is_glob(pattern: &str) -> bool {
    pattern.contains('*') || pattern.contains('?') || pattern.contains('[')
}

/// Expand literal paths and glob patterns
///
/// Literal paths must exist and each glob must match at least one file.
pub fn expand_patterns(patterns: &[String]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    for pattern in patterns {
        if is_glob(pattern) {
            let paths = glob::glob(pattern)
                .map_err(|e| CheckError::usage(format!("invalid glob pattern '{pattern}': {e}")))?;

            let before = files.len();
            for path in paths {
                let path =
                    path.with_context(|| format!("Failed to read glob match for: {}", pattern))?;
                if path.is_file() {
                    files.push(path);
                }
            }

            if files.len() == before {
                return Err(CheckError::no_matches(pattern.clone()).into());
            }
        } else {
            let path = PathBuf::from(pattern);
            if !path.exists() {
                return Err(CheckError::not_found(path).into());
            }
            files.push(path);
        }
    }

    Ok(files)
}

/// Markdown files under `dir`, sorted, descending only when `recursive`
pub fn scan_directory(dir: &Path, recursive: bool) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(CheckError::not_found(dir).into());
    }

    let max_depth = if recursive { usize::MAX } else { 1 };
    let mut files = Vec::new();
    for entry in WalkDir::new(dir).max_depth(max_depth).sort_by_file_name() {
        let entry = entry.with_context(|| format!("Failed to scan {}", dir.display()))?;
        if entry.file_type().is_file() && is_markdown(entry.path()) {
            files.push(entry.into_path());
        }
    }

    if files.is_empty() {
        return Err(CheckError::no_matches(format!("{}/*.md", dir.display())).into());
    }
    Ok(files)
}

fn is_markdown(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| MARKDOWN_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

/// Resolve positional inputs and `--dir` into the documents to check
pub fn resolve_targets(inputs: &[String], dir: Option<&Path>, recursive: bool) -> Result<Targets> {
    let mut documents = expand_patterns(inputs)?;
    if let Some(dir) = dir {
        documents.extend(scan_directory(dir, recursive)?);
    }

    if documents.is_empty() {
        return Err(CheckError::usage("no input documents given").into());
    }

    let single = dir.is_none() && inputs.len() == 1 && !is_glob(&inputs[0]);
    Ok(Targets { documents, single })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn touch(path: &Path) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, "# doc\n").unwrap();
    }

    #[test]
    fn test_literal_path() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("README.md");
        touch(&file);

        let pattern = file.display().to_string();
        let targets = resolve_targets(&[pattern], None, false).unwrap();
        assert_eq!(targets.documents, vec![file]);
        assert!(targets.single);
    }

    #[test]
    fn test_nonexistent_file_errors() {
        let result = expand_patterns(&["file-that-does-not-exist.md".to_string()]);
        let error = result.unwrap_err();
        assert!(matches!(
            error.downcast_ref::<CheckError>(),
            Some(CheckError::NotFound { .. })
        ));
    }

    #[test]
    fn test_glob_expansion() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("a.md"));
        touch(&dir.path().join("b.md"));
        touch(&dir.path().join("c.txt"));

        let pattern = format!("{}/*.md", dir.path().display());
        let targets = resolve_targets(&[pattern], None, false).unwrap();
        assert_eq!(targets.documents.len(), 2);
        assert!(!targets.single);
    }

    #[test]
    fn test_glob_without_matches_errors() {
        let dir = tempfile::tempdir().unwrap();
        let pattern = format!("{}/*.md", dir.path().display());
        let error = expand_patterns(&[pattern]).unwrap_err();
        assert!(matches!(
            error.downcast_ref::<CheckError>(),
            Some(CheckError::NoMatches { .. })
        ));
    }

    #[test]
    fn test_directory_scan_depth() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("top.md"));
        touch(&dir.path().join("nested").join("deep.markdown"));
        touch(&dir.path().join("nested").join("notes.txt"));

        let shallow = scan_directory(dir.path(), false).unwrap();
        assert_eq!(shallow, vec![dir.path().join("top.md")]);

        let deep = scan_directory(dir.path(), true).unwrap();
        assert_eq!(deep.len(), 2);
    }

    #[test]
    fn test_directory_without_markdown_errors() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("notes.txt"));
        assert!(scan_directory(dir.path(), true).is_err());
    }

    #[test]
    fn test_dir_mode_is_never_single() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("only.md"));
        let targets = resolve_targets(&[], Some(dir.path()), false).unwrap();
        assert_eq!(targets.documents.len(), 1);
        assert!(!targets.single);
    }

    #[test]
    fn test_no_inputs_is_usage_error() {
        let error = resolve_targets(&[], None, false).unwrap_err();
        assert!(matches!(
            error.downcast_ref::<CheckError>(),
            Some(CheckError::Usage { .. })
        ));
    }
}
