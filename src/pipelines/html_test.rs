use std::sync::Arc;

use anyhow::{Context, Result};

use crate::config::rt::RtcBuild;
use crate::pipelines::html::*;

const PAGE: &str = "<!DOCTYPE html>\n<html>\n  <!-- a comment -->\n  <body>\n    <p>hello   world</p>\n  </body>\n</html>\n";

async fn setup_test_config() -> Result<(tempfile::TempDir, RtcBuild)> {
    let tmpdir = tempfile::tempdir().context("error building tempdir for test")?;
    let cfg = RtcBuild::new_test(tmpdir.path()).await?;
    tokio::fs::create_dir_all(tmpdir.path().join("src")).await?;
    tokio::fs::write(tmpdir.path().join("src/index.html"), PAGE).await?;
    Ok((tmpdir, cfg))
}

#[tokio::test]
async fn ok_run_dev_copies_verbatim() -> Result<()> {
    // Assemble.
    let (tmpdir, cfg) = setup_test_config().await?;

    // Action.
    let _out = Html::new(Arc::new(cfg))
        .spawn()
        .await
        .context("unexpected task join error from pipeline")?
        .context("unexpected pipeline error")?;

    // Assert.
    let copied = tokio::fs::read_to_string(tmpdir.path().join("dist/index.html")).await?;
    anyhow::ensure!(copied == PAGE, "dev mode must not alter HTML");
    Ok(())
}

#[tokio::test]
async fn ok_run_release_minifies_in_place() -> Result<()> {
    // Assemble.
    let (tmpdir, mut cfg) = setup_test_config().await?;
    cfg.release = true;

    // Action.
    let _out = Html::new(Arc::new(cfg))
        .spawn()
        .await
        .context("unexpected task join error from pipeline")?
        .context("unexpected pipeline error")?;

    // Assert.
    let minified = tokio::fs::read_to_string(tmpdir.path().join("dist/index.html")).await?;
    anyhow::ensure!(minified.len() < PAGE.len(), "expected smaller output");
    anyhow::ensure!(!minified.contains("a comment"), "comments must be removed");
    anyhow::ensure!(minified.contains("hello world"), "text must collapse, not vanish");
    Ok(())
}

#[tokio::test]
async fn ok_run_serve_injects_autoreload() -> Result<()> {
    // Assemble.
    let (tmpdir, mut cfg) = setup_test_config().await?;
    cfg.inject_autoloader = true;

    // Action.
    let _out = Html::new(Arc::new(cfg))
        .spawn()
        .await
        .context("unexpected task join error from pipeline")?
        .context("unexpected pipeline error")?;

    // Assert.
    let page = tokio::fs::read_to_string(tmpdir.path().join("dist/index.html")).await?;
    let script = page
        .find("/_gantry/autoreload.js")
        .context("autoreload script missing")?;
    let body_close = page.rfind("</body>").context("body close tag missing")?;
    anyhow::ensure!(script < body_close, "script tag must precede </body>");
    Ok(())
}
