//! HTML asset pipeline.

use super::{Category, PipelineOutput};
use crate::common;
use crate::config::rt::RtcBuild;
use crate::processing::minify;
use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::fs;
use tokio::task::JoinHandle;

/// The script tag referencing the autoreload client served by the dev server.
const AUTORELOAD_SNIPPET: &str = r#"<script src="/_gantry/autoreload.js"></script>"#;

/// The HTML asset pipeline.
pub struct Html {
    /// Runtime build config.
    cfg: Arc<RtcBuild>,
}

impl Html {
    pub fn new(cfg: Arc<RtcBuild>) -> Self {
        Self { cfg }
    }

    /// Spawn the pipeline for this asset type.
    #[tracing::instrument(level = "trace", skip(self))]
    pub fn spawn(self) -> JoinHandle<Result<PipelineOutput>> {
        tokio::spawn(self.run())
    }

    #[tracing::instrument(level = "trace", skip(self))]
    async fn run(self) -> Result<PipelineOutput> {
        let sources = common::collect_sources(
            &self.cfg.working_directory,
            self.cfg.assets.html.src.patterns(),
        )
        .await?;
        if sources.is_empty() {
            tracing::debug!("no HTML sources to copy");
            return Ok(PipelineOutput {
                category: Category::Html,
                reload: Category::Html.reloads(),
            });
        }

        let dest = self.cfg.dest_dir(&self.cfg.assets.html);
        fs::create_dir_all(&dest)
            .await
            .with_context(|| format!("error creating output directory {:?}", &dest))?;

        for source in &sources {
            let mut raw = fs::read_to_string(&source.path)
                .await
                .with_context(|| format!("error reading HTML file {:?}", &source.path))?;
            if self.cfg.inject_autoloader {
                raw = inject_autoreload(&raw);
            }
            let bytes = if self.cfg.release {
                minify::minify_html(raw.as_bytes())
            } else {
                raw.into_bytes()
            };

            let out = dest.join(&source.rel);
            if let Some(parent) = out.parent() {
                fs::create_dir_all(parent)
                    .await
                    .with_context(|| format!("error creating output directory {:?}", parent))?;
            }
            fs::write(&out, bytes)
                .await
                .context("error writing HTML pipeline output")?;
        }
        tracing::debug!("finished copying {} HTML file(s)", sources.len());

        Ok(PipelineOutput {
            category: Category::Html,
            reload: Category::Html.reloads(),
        })
    }
}

/// Insert the autoreload script tag just before the closing body tag, or
/// append it when no such tag exists.
fn inject_autoreload(html: &str) -> String {
    match html.rfind("</body>") {
        Some(idx) => format!("{}{AUTORELOAD_SNIPPET}\n{}", &html[..idx], &html[idx..]),
        None => format!("{html}\n{AUTORELOAD_SNIPPET}\n"),
    }
}
