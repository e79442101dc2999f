//! Cache-busting revision pass.
//!
//! Content-hashes every file under the scripts/styles/images destinations,
//! renames it to `{stem}-{hash}.{ext}`, and rewrites references in HTML & CSS
//! under the html destination.

use crate::common;
use crate::config::rt::RtcBuild;
use anyhow::{Context, Result};
use regex::Regex;
use std::borrow::Cow;
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use tokio::fs;

/// Revision asset file names below the html destination.
#[tracing::instrument(level = "trace", skip(cfg))]
pub async fn revision(cfg: &RtcBuild) -> Result<()> {
    let base = cfg.html_dist();
    let mut dirs = BTreeSet::new();
    for spec in [&cfg.assets.scripts, &cfg.assets.styles, &cfg.assets.images] {
        dirs.insert(cfg.dest_dir(spec));
    }

    // Hash & rename, recording the reference rewrite for each renamed file.
    let mut renames = BTreeMap::new();
    for dir in dirs {
        if !common::path_exists(&dir).await? {
            continue;
        }
        let mut files = common::walk_files(dir).await?;
        files.sort();
        for path in files {
            let bytes = fs::read(&path)
                .await
                .with_context(|| format!("error reading asset {:?}", &path))?;
            let hash = seahash::hash(&bytes);
            let stem = path
                .file_stem()
                .with_context(|| format!("asset {:?} has no file name stem", &path))?
                .to_string_lossy();
            let hashed_name = match path.extension() {
                Some(ext) => format!("{}-{:x}.{}", stem, hash, ext.to_string_lossy()),
                None => format!("{}-{:x}", stem, hash),
            };
            let target = path.with_file_name(&hashed_name);
            fs::rename(&path, &target)
                .await
                .with_context(|| format!("error renaming {:?} to {:?}", &path, &target))?;
            tracing::debug!(path = ?common::strip_prefix(&target), "revisioned asset");

            // References can only be rewritten for outputs below the html
            // destination, which is where documents resolve URLs from.
            if let (Ok(old_rel), Ok(new_rel)) =
                (path.strip_prefix(&base), target.strip_prefix(&base))
            {
                renames.insert(url_of(old_rel), url_of(new_rel));
            }
        }
    }
    if renames.is_empty() {
        return Ok(());
    }

    // Rewrite references in HTML & CSS below the html destination.
    let pattern = renames
        .keys()
        .map(|old| regex::escape(old))
        .collect::<Vec<_>>()
        .join("|");
    let re = Regex::new(&pattern).context("error building reference rewrite pattern")?;
    for path in common::walk_files(base.clone()).await? {
        if !matches!(
            path.extension().and_then(|ext| ext.to_str()),
            Some("html" | "css")
        ) {
            continue;
        }
        let content = fs::read_to_string(&path)
            .await
            .with_context(|| format!("error reading {:?} for reference rewriting", &path))?;
        if let Cow::Owned(rewritten) =
            re.replace_all(&content, |caps: &regex::Captures| renames[&caps[0]].clone())
        {
            fs::write(&path, rewritten)
                .await
                .with_context(|| format!("error writing rewritten references to {:?}", &path))?;
        }
    }
    Ok(())
}

fn url_of(rel: &Path) -> String {
    rel.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn setup() -> Result<(tempfile::TempDir, RtcBuild)> {
        let tmpdir = tempfile::tempdir().context("error building tempdir for test")?;
        let cfg = RtcBuild::new_test(tmpdir.path()).await?;
        tokio::fs::create_dir_all(tmpdir.path().join("dist/js")).await?;
        tokio::fs::write(tmpdir.path().join("dist/js/main.js"), "console.log(1);\n").await?;
        tokio::fs::write(
            tmpdir.path().join("dist/index.html"),
            "<script src=\"js/main.js\"></script>\n",
        )
        .await?;
        Ok((tmpdir, cfg))
    }

    #[tokio::test]
    async fn revision_renames_and_rewrites_references() -> Result<()> {
        let (tmpdir, cfg) = setup().await?;

        revision(&cfg).await?;

        let mut names = Vec::new();
        let mut entries = tokio::fs::read_dir(tmpdir.path().join("dist/js")).await?;
        while let Some(entry) = entries.next_entry().await? {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
        anyhow::ensure!(names.len() == 1, "expected a single revisioned file");
        let hashed = &names[0];
        anyhow::ensure!(
            hashed.starts_with("main-") && hashed.ends_with(".js") && *hashed != "main.js",
            "expected hashed file name, got {hashed}"
        );

        let html = tokio::fs::read_to_string(tmpdir.path().join("dist/index.html")).await?;
        anyhow::ensure!(
            html.contains(&format!("js/{hashed}")),
            "reference must point at the hashed name"
        );
        Ok(())
    }

    #[tokio::test]
    async fn revision_is_stable_for_identical_bytes() -> Result<()> {
        let (tmpdir_a, cfg_a) = setup().await?;
        let (tmpdir_b, cfg_b) = setup().await?;

        revision(&cfg_a).await?;
        revision(&cfg_b).await?;

        async fn hashed_name(root: &std::path::Path) -> Result<std::ffi::OsString> {
            let mut entries = tokio::fs::read_dir(root.join("dist/js")).await?;
            let entry = entries.next_entry().await?.context("missing output")?;
            Ok(entry.file_name())
        }
        anyhow::ensure!(
            hashed_name(tmpdir_a.path()).await? == hashed_name(tmpdir_b.path()).await?,
            "identical input bytes must hash to identical names"
        );
        Ok(())
    }
}
