//! File set helpers shared by the leaf tasks and the watcher

use crate::error::{ConfigError, ConfigResult, Result};
use globset::{Glob, GlobBuilder, GlobMatcher, GlobSet, GlobSetBuilder};
use std::io;
use std::path::{Component, Path, PathBuf};
use walkdir::WalkDir;

/// A source file matched by a glob
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    /// Absolute (root-joined) path
    pub path: PathBuf,
    /// Path relative to the glob's base directory
    pub relative: PathBuf,
}

/// Build a glob where `*` stops at `/` and only `**` crosses directories
fn build_glob(pattern: &str) -> ConfigResult<Glob> {
    GlobBuilder::new(pattern)
        .literal_separator(true)
        .build()
        .map_err(|e| ConfigError::InvalidPattern {
            pattern: pattern.to_string(),
            error: e.to_string(),
        })
}

/// Compile one glob pattern, mapping failures to a config error
pub fn compile_glob(pattern: &str) -> ConfigResult<GlobMatcher> {
    build_glob(pattern).map(|g| g.compile_matcher())
}

/// Compile several patterns into one set
pub fn compile_glob_set<S: AsRef<str>>(patterns: &[S]) -> ConfigResult<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(build_glob(pattern.as_ref())?);
    }
    builder.build().map_err(|e| ConfigError::InvalidPattern {
        pattern: patterns
            .iter()
            .map(|p| p.as_ref())
            .collect::<Vec<_>>()
            .join(", "),
        error: e.to_string(),
    })
}

/// The leading directory of a glob that contains no wildcard characters.
///
/// `fonts/**/*.woff` has base `fonts`, `index.html` has base `` (the root).
pub fn glob_base(pattern: &str) -> PathBuf {
    let mut base = PathBuf::new();
    let components: Vec<&str> = pattern.split('/').collect();
    // The last component is a file name or a wildcard, never part of the base
    for component in components.iter().take(components.len().saturating_sub(1)) {
        if has_glob_meta(component) {
            break;
        }
        base.push(component);
    }
    base
}

fn has_glob_meta(s: &str) -> bool {
    s.contains(|c| matches!(c, '*' | '?' | '[' | '{'))
}

/// Render a relative path with `/` separators, as glob patterns and object keys expect
pub fn to_slash(path: &Path) -> String {
    path.components()
        .filter_map(|c| match c {
            Component::Normal(s) => Some(s.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Expand a glob relative to `root` into a sorted list of files.
///
/// Unreadable directories and symlink loops are errors, not skipped.
pub fn expand_glob(root: &Path, pattern: &str) -> Result<Vec<SourceFile>> {
    let matcher = compile_glob(pattern)?;
    let base = glob_base(pattern);

    // Literal paths need no walk
    if !has_glob_meta(pattern) {
        let path = root.join(pattern);
        return Ok(match path.strip_prefix(root.join(&base)) {
            Ok(relative) if path.is_file() => vec![SourceFile {
                relative: relative.to_path_buf(),
                path,
            }],
            _ => Vec::new(),
        });
    }

    let walk_root = root.join(&base);

    if !walk_root.is_dir() {
        return Ok(Vec::new());
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(&walk_root).follow_links(true) {
        let entry = entry.map_err(io::Error::from)?;
        if !entry.file_type().is_file() {
            continue;
        }
        let Ok(rel_to_root) = entry.path().strip_prefix(root) else {
            continue;
        };
        if !matcher.is_match(to_slash(rel_to_root)) {
            continue;
        }
        let Ok(relative) = entry.path().strip_prefix(&walk_root) else {
            continue;
        };
        files.push(SourceFile {
            relative: relative.to_path_buf(),
            path: entry.path().to_path_buf(),
        });
    }

    files.sort_by(|a, b| a.relative.cmp(&b.relative));
    Ok(files)
}

/// Every file under `dir`, relative to it, sorted. A missing `dir` is empty.
pub fn list_files(dir: &Path) -> io::Result<Vec<PathBuf>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(dir).follow_links(true) {
        let entry = entry.map_err(io::Error::from)?;
        if !entry.file_type().is_file() {
            continue;
        }
        if let Ok(relative) = entry.path().strip_prefix(dir) {
            files.push(relative.to_path_buf());
        }
    }
    files.sort();
    Ok(files)
}
