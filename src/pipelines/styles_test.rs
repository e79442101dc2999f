use std::sync::Arc;

use anyhow::{Context, Result};

use crate::config::models::AssetSpec;
use crate::config::rt::RtcBuild;
use crate::pipelines::styles::*;

/// A fixture for setting up basic test config.
async fn setup_test_config() -> Result<(tempfile::TempDir, RtcBuild)> {
    let tmpdir = tempfile::tempdir().context("error building tempdir for test")?;
    let cfg = RtcBuild::new_test(tmpdir.path()).await?;
    Ok((tmpdir, cfg))
}

#[tokio::test]
async fn ok_run_single_entry_point() -> Result<()> {
    // Assemble.
    let (tmpdir, mut cfg) = setup_test_config().await?;
    cfg.assets.styles = serde_json::from_str::<AssetSpec>(
        r#"{"src": ["a.scss"], "dest": "dist/css"}"#,
    )?;
    tokio::fs::write(
        tmpdir.path().join("a.scss"),
        "$color: #336699;\nbody {\n  color: $color;\n  a { text-decoration: none; }\n}\n",
    )
    .await
    .context("error writing test stylesheet")?;

    // Action.
    let _out = Styles::new(Arc::new(cfg))
        .spawn()
        .await
        .context("unexpected task join error from pipeline")?
        .context("unexpected pipeline error")?;

    // Assert.
    let css_dir = tmpdir.path().join("dist/css");
    let mut entries = tokio::fs::read_dir(&css_dir).await?;
    let mut names = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        names.push(entry.file_name().to_string_lossy().into_owned());
    }
    anyhow::ensure!(
        names == ["main.css"],
        "expected exactly one main.css, found {names:?}"
    );

    let css = tokio::fs::read_to_string(css_dir.join("main.css")).await?;
    anyhow::ensure!(css.contains("body"), "expected compiled selector");
    anyhow::ensure!(!css.contains("$color"), "sass variables must be resolved");
    anyhow::ensure!(css.contains("#369") || css.contains("#336699"), "expected resolved color");
    Ok(())
}

#[tokio::test]
async fn ok_run_concatenates_in_source_order() -> Result<()> {
    // Assemble.
    let (tmpdir, mut cfg) = setup_test_config().await?;
    cfg.assets.styles = serde_json::from_str::<AssetSpec>(
        r#"{"src": ["first.scss", "second.scss"], "dest": "dist/css"}"#,
    )?;
    tokio::fs::write(tmpdir.path().join("first.scss"), "header { margin: 0; }\n").await?;
    tokio::fs::write(tmpdir.path().join("second.scss"), "footer { margin: 0; }\n").await?;

    // Action.
    let _out = Styles::new(Arc::new(cfg))
        .spawn()
        .await
        .context("unexpected task join error from pipeline")?
        .context("unexpected pipeline error")?;

    // Assert.
    let css = tokio::fs::read_to_string(tmpdir.path().join("dist/css/main.css")).await?;
    let header = css.find("header").context("header rule missing")?;
    let footer = css.find("footer").context("footer rule missing")?;
    anyhow::ensure!(header < footer, "source order must be preserved");
    Ok(())
}

#[tokio::test]
async fn err_run_invalid_sass() -> Result<()> {
    // Assemble.
    let (tmpdir, mut cfg) = setup_test_config().await?;
    cfg.assets.styles =
        serde_json::from_str::<AssetSpec>(r#"{"src": ["bad.scss"], "dest": "dist/css"}"#)?;
    tokio::fs::write(tmpdir.path().join("bad.scss"), "body { color: $undefined; }\n").await?;

    // Action.
    let res = Styles::new(Arc::new(cfg))
        .spawn()
        .await
        .context("unexpected task join error from pipeline")?;

    // Assert.
    anyhow::ensure!(res.is_err(), "expected sass compilation failure to propagate");
    Ok(())
}
