//! Styles asset pipeline: compile Sass, add vendor prefixes, concatenate to a
//! single minified stylesheet.

use super::{Category, PipelineOutput};
use crate::common::{self, SourceFile};
use crate::config::rt::RtcBuild;
use anyhow::{anyhow, Context, Result};
use lightningcss::stylesheet::{MinifyOptions, ParserOptions, PrinterOptions, StyleSheet};
use lightningcss::targets::{Browsers, Targets};
use std::sync::Arc;
use tokio::fs;
use tokio::task::JoinHandle;

const OUTPUT_FILE: &str = "main.css";

/// The styles asset pipeline.
pub struct Styles {
    /// Runtime build config.
    cfg: Arc<RtcBuild>,
}

impl Styles {
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
            self.cfg.assets.styles.src.patterns(),
        )
        .await?;
        if sources.is_empty() {
            tracing::debug!("no style sources to compile");
            return Ok(PipelineOutput {
                category: Category::Styles,
                reload: Category::Styles.reloads(),
            });
        }
        tracing::debug!("compiling {} stylesheet(s)", sources.len());

        let dest = self.cfg.dest_dir(&self.cfg.assets.styles);
        fs::create_dir_all(&dest)
            .await
            .with_context(|| format!("error creating output directory {:?}", &dest))?;

        let css = tokio::task::spawn_blocking(move || compile(&sources))
            .await
            .context("error awaiting spawned sass compilation task")??;

        let out_file = dest.join(OUTPUT_FILE);
        fs::write(&out_file, css)
            .await
            .context("error writing styles pipeline output")?;
        tracing::debug!(path = ?common::strip_prefix(&out_file), "finished compiling styles");

        Ok(PipelineOutput {
            category: Category::Styles,
            reload: Category::Styles.reloads(),
        })
    }
}

/// Compile each Sass entry point, concatenate, prefix & minify.
fn compile(sources: &[SourceFile]) -> Result<String> {
    let mut css = String::new();
    for source in sources {
        let compiled = grass::from_path(&source.path, &grass::Options::default())
            .map_err(|err| anyhow!("error compiling sass for {:?}: {}", &source.path, err))?;
        css.push_str(&compiled);
    }

    let targets = Targets {
        browsers: Some(browser_targets()),
        ..Targets::default()
    };
    let mut sheet = StyleSheet::parse(&css, ParserOptions::default())
        .map_err(|err| anyhow!("error parsing compiled CSS: {err}"))?;
    sheet
        .minify(MinifyOptions {
            targets,
            ..MinifyOptions::default()
        })
        .map_err(|err| anyhow!("error minifying CSS: {err}"))?;
    let output = sheet
        .to_css(PrinterOptions {
            minify: true,
            targets,
            ..PrinterOptions::default()
        })
        .map_err(|err| anyhow!("error printing CSS: {err}"))?;
    Ok(output.code)
}

/// The fixed browser support matrix vendor prefixing targets.
///
/// Versions are encoded as `major << 16 | minor << 8`.
fn browser_targets() -> Browsers {
    Browsers {
        ie: Some(10 << 16),
        firefox: Some(30 << 16),
        chrome: Some(34 << 16),
        safari: Some(7 << 16),
        opera: Some(23 << 16),
        ios_saf: Some(7 << 16),
        android: Some((4 << 16) | (4 << 8)),
        ..Browsers::default()
    }
}
