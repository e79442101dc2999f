//! Offline cache: generate a service worker precaching built assets.

use crate::common;
use crate::config::rt::RtcBuild;
use anyhow::{Context, Result};
use tokio::fs;

const OUTPUT_FILE: &str = "service-worker.js";
/// Cache name prefix; the full name carries a revision hash of the manifest,
/// so stale caches from prior deploys are evicted on activation.
const CACHE_ID: &str = "gantry";
/// Asset extensions worth having offline.
const PRECACHE_EXTENSIONS: &[&str] = &["js", "html", "css", "png", "jpg", "gif"];

const SW_TEMPLATE: &str = r#"'use strict';

var CACHE = '@CACHE@';
var PRECACHE = [
@PRECACHE@
];

self.addEventListener('install', function (event) {
  event.waitUntil(
    caches.open(CACHE)
      .then(function (cache) { return cache.addAll(PRECACHE); })
      .then(function () { return self.skipWaiting(); })
  );
});

self.addEventListener('activate', function (event) {
  event.waitUntil(
    caches.keys()
      .then(function (keys) {
        return Promise.all(keys
          .filter(function (key) { return key.indexOf('@ID@-') === 0 && key !== CACHE; })
          .map(function (key) { return caches.delete(key); }));
      })
      .then(function () { return self.clients.claim(); })
  );
});

self.addEventListener('fetch', function (event) {
  event.respondWith(
    caches.match(event.request).then(function (cached) {
      return cached || fetch(event.request);
    })
  );
});
"#;

/// Generate the offline-cache service worker at the html destination.
#[tracing::instrument(level = "trace", skip(cfg))]
pub async fn generate(cfg: &RtcBuild) -> Result<()> {
    let root = cfg.html_dist();
    if !common::path_exists(&root).await? {
        tracing::debug!("no output to cache");
        return Ok(());
    }

    let mut files = common::walk_files(root.clone()).await?;
    files.sort();

    let mut urls = Vec::new();
    let mut manifest = String::new();
    for path in files {
        let ext = path.extension().and_then(|ext| ext.to_str()).unwrap_or("");
        if !PRECACHE_EXTENSIONS.contains(&ext) {
            continue;
        }
        if path.file_name().and_then(|name| name.to_str()) == Some(OUTPUT_FILE) {
            continue;
        }
        let rel = path.strip_prefix(&root).unwrap_or(&path);
        let url = rel
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        let bytes = fs::read(&path)
            .await
            .with_context(|| format!("error reading asset {:?}", &path))?;
        manifest.push_str(&format!("{url}:{:x}\n", seahash::hash(&bytes)));
        urls.push(url);
    }
    tracing::debug!("precaching {} asset(s)", urls.len());

    let revision = seahash::hash(manifest.as_bytes());
    let precache = urls
        .iter()
        .map(|url| format!("  './{url}'"))
        .collect::<Vec<_>>()
        .join(",\n");
    let sw = SW_TEMPLATE
        .replace("@CACHE@", &format!("{CACHE_ID}-{revision:x}"))
        .replace("@ID@", CACHE_ID)
        .replace("@PRECACHE@", &precache);

    fs::write(root.join(OUTPUT_FILE), sw)
        .await
        .context("error writing service worker")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn setup() -> Result<(tempfile::TempDir, RtcBuild)> {
        let tmpdir = tempfile::tempdir().context("error building tempdir for test")?;
        let cfg = RtcBuild::new_test(tmpdir.path()).await?;
        tokio::fs::create_dir_all(tmpdir.path().join("dist/js")).await?;
        tokio::fs::write(tmpdir.path().join("dist/index.html"), "<html></html>").await?;
        tokio::fs::write(tmpdir.path().join("dist/js/main.js"), "console.log(1);").await?;
        tokio::fs::write(tmpdir.path().join("dist/notes.txt"), "not cached").await?;
        Ok((tmpdir, cfg))
    }

    #[tokio::test]
    async fn generate_precaches_matching_assets() -> Result<()> {
        let (tmpdir, cfg) = setup().await?;

        generate(&cfg).await?;

        let sw =
            tokio::fs::read_to_string(tmpdir.path().join("dist/service-worker.js")).await?;
        anyhow::ensure!(sw.contains("'./index.html'"), "html must be precached");
        anyhow::ensure!(sw.contains("'./js/main.js'"), "scripts must be precached");
        anyhow::ensure!(!sw.contains("notes.txt"), "non-asset extensions are skipped");
        anyhow::ensure!(!sw.contains("'./service-worker.js'"), "must not cache itself");
        Ok(())
    }

    #[tokio::test]
    async fn generate_is_idempotent() -> Result<()> {
        let (tmpdir, cfg) = setup().await?;

        generate(&cfg).await?;
        let first = tokio::fs::read(tmpdir.path().join("dist/service-worker.js")).await?;
        generate(&cfg).await?;
        let second = tokio::fs::read(tmpdir.path().join("dist/service-worker.js")).await?;

        anyhow::ensure!(first == second, "identical inputs must produce identical output");
        Ok(())
    }
}
