//! Common functionality and types.

use anyhow::{Context, Result};
use console::Emoji;
use globset::Glob;
use once_cell::sync::Lazy;
use std::collections::HashSet;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;

pub static BUILDING: Emoji = Emoji("📦 ", "");
pub static SUCCESS: Emoji = Emoji("✅ ", "");
pub static ERROR: Emoji = Emoji("❌ ", "");
pub static SERVER: Emoji = Emoji("📡 ", "");
pub static STARTING: Emoji = Emoji("🚀 ", "");

// If we fail to get the current_dir, we can't do much and just fail, so we can use expect(..).
#[allow(clippy::expect_used)]
static CWD: Lazy<PathBuf> =
    Lazy::new(|| std::env::current_dir().expect("error getting current dir"));

/// A source file matched by one of a category's glob patterns.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct SourceFile {
    /// The absolute path to the file.
    pub path: PathBuf,
    /// The path relative to the base directory of the glob which matched it.
    pub rel: PathBuf,
}

/// Derive the static directory prefix of a glob pattern.
///
/// This is the portion of the pattern up to (but not including) the last path
/// separator before the first glob metacharacter. A pattern without any
/// directory component yields the empty string.
pub fn glob_base(pattern: &str) -> &str {
    let meta = pattern
        .find(|c| matches!(c, '*' | '?' | '[' | '{'))
        .unwrap_or(pattern.len());
    match pattern[..meta].rfind('/') {
        Some(idx) => &pattern[..idx],
        None => "",
    }
}

/// Collect all files matching the given glob patterns, rooted at the working directory.
///
/// Files are returned in pattern order, sorted within each pattern, with
/// duplicates (a file matched by more than one pattern) removed. The ordering
/// is deterministic so that concatenating pipelines produce identical output
/// for identical inputs.
pub async fn collect_sources(working_dir: &Path, patterns: &[String]) -> Result<Vec<SourceFile>> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for pattern in patterns {
        let matcher = Glob::new(pattern)
            .with_context(|| format!("invalid glob pattern {:?}", pattern))?
            .compile_matcher();
        let base = working_dir.join(glob_base(pattern));
        if !path_exists(&base).await? {
            tracing::debug!(path = ?base, "source directory does not exist, skipping");
            continue;
        }
        let mut matched = Vec::new();
        for path in walk_files(base.clone()).await? {
            let rel_to_wd = path.strip_prefix(working_dir).unwrap_or(&path);
            if matcher.is_match(rel_to_wd) {
                let rel = path.strip_prefix(&base).unwrap_or(&path).to_owned();
                matched.push(SourceFile { path, rel });
            }
        }
        matched.sort();
        for source in matched {
            if seen.insert(source.path.clone()) {
                out.push(source);
            }
        }
    }
    Ok(out)
}

/// Recursively list all files below the given directory.
pub async fn walk_files(dir: PathBuf) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    let mut read_dir = fs::read_dir(&dir)
        .await
        .with_context(|| format!("error reading directory {:?}", &dir))?;
    while let Some(entry) = read_dir
        .next_entry()
        .await
        .context("error reading next dir entry")?
    {
        if entry.file_type().await?.is_dir() {
            let nested = Box::pin(walk_files(entry.path())).await?;
            files.extend(nested);
        } else {
            files.push(entry.path());
        }
    }
    Ok(files)
}

/// A utility function to recursively delete a directory.
///
/// Use this instead of fs::remove_dir_all(...) because of Windows compatibility issues, per
/// advice of https://blog.qwaz.io/chat/issues-of-rusts-remove-dir-all-implementation-on-windows
pub async fn remove_dir_all(from_dir: PathBuf) -> Result<()> {
    if !path_exists(&from_dir).await? {
        return Ok(());
    }
    tokio::task::spawn_blocking(move || {
        ::remove_dir_all::remove_dir_all(from_dir).context("error removing directory")?;
        Ok(())
    })
    .await
    .context("error awaiting spawned remove dir call")?
}

/// Checks if path exists.
pub async fn path_exists(path: impl AsRef<Path>) -> Result<bool> {
    fs::metadata(path.as_ref())
        .await
        .map(|_| true)
        .or_else(|error| {
            if error.kind() == ErrorKind::NotFound {
                Ok(false)
            } else {
                Err(error)
            }
        })
        .with_context(|| {
            format!(
                "error checking for existence of path at {:?}",
                path.as_ref()
            )
        })
}

/// Strip the CWD prefix from the given path.
///
/// Returns `target` unmodified if an error is returned from the operation.
pub fn strip_prefix(target: &Path) -> &Path {
    match target.strip_prefix(CWD.as_path()) {
        Ok(relative) => relative,
        Err(_) => target,
    }
}
