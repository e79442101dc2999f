//! Templates asset pipeline: inline template fragments into a single cache
//! module.

use super::{Category, PipelineOutput};
use crate::common;
use crate::config::rt::RtcBuild;
use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::fs;
use tokio::task::JoinHandle;

const OUTPUT_FILE: &str = "templates.js";
/// The framework module the generated cache registers under.
const MODULE_NAME: &str = "app.templates";

/// The templates asset pipeline.
pub struct Templates {
    /// Runtime build config.
    cfg: Arc<RtcBuild>,
}

impl Templates {
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
            self.cfg.assets.templates.src.patterns(),
        )
        .await?;
        if sources.is_empty() {
            tracing::debug!("no template fragments to inline");
            return Ok(PipelineOutput {
                category: Category::Templates,
                reload: Category::Templates.reloads(),
            });
        }
        tracing::debug!("inlining {} template fragment(s)", sources.len());

        let mut entries = String::new();
        for source in &sources {
            let raw = fs::read_to_string(&source.path)
                .await
                .with_context(|| format!("error reading template {:?}", &source.path))?;
            // Fragment URLs use the path below the glob base, which is how the
            // application's templateUrl values reference them.
            let url = source
                .rel
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            entries.push_str(&format!(
                "  $templateCache.put('{}', '{}');\n",
                escape_js(&url),
                escape_js(&raw)
            ));
        }
        let module = format!(
            "angular.module('{MODULE_NAME}', []).run(['$templateCache', function ($templateCache) {{\n{entries}}}]);\n"
        );

        let dest = self.cfg.dest_dir(&self.cfg.assets.templates);
        fs::create_dir_all(&dest)
            .await
            .with_context(|| format!("error creating output directory {:?}", &dest))?;
        let out_file = dest.join(OUTPUT_FILE);
        fs::write(&out_file, module)
            .await
            .context("error writing templates pipeline output")?;
        tracing::debug!(path = ?common::strip_prefix(&out_file), "finished inlining templates");

        Ok(PipelineOutput {
            category: Category::Templates,
            reload: Category::Templates.reloads(),
        })
    }
}

/// Escape text for embedding in a single-quoted JS string literal.
fn escape_js(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => {}
            c => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escape_js_handles_quotes_and_newlines() {
        assert_eq!(
            escape_js("<a class='x'>\nback\\slash</a>"),
            "<a class=\\'x\\'>\\nback\\\\slash</a>"
        );
    }
}
