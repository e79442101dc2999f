//! Scripts asset pipeline: bundle application script modules into one file.

use super::{Category, PipelineOutput};
use crate::common::{self, SourceFile};
use crate::config::rt::RtcBuild;
use crate::processing::{js, minify};
use anyhow::{bail, Context, Result};
use std::sync::Arc;
use swc_ecma_ast::{Module, ModuleDecl, ModuleItem, Stmt};
use tokio::fs;
use tokio::task::JoinHandle;

const OUTPUT_FILE: &str = "main.js";

/// The scripts asset pipeline.
pub struct Scripts {
    /// Runtime build config.
    cfg: Arc<RtcBuild>,
}

impl Scripts {
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
            self.cfg.assets.scripts.src.patterns(),
        )
        .await?;
        if sources.is_empty() {
            tracing::debug!("no script sources to bundle");
            return Ok(PipelineOutput {
                category: Category::Scripts,
                reload: Category::Scripts.reloads(),
            });
        }
        tracing::debug!("bundling {} script module(s)", sources.len());

        let dest = self.cfg.dest_dir(&self.cfg.assets.scripts);
        fs::create_dir_all(&dest)
            .await
            .with_context(|| format!("error creating output directory {:?}", &dest))?;

        let release = self.cfg.release;
        let output = tokio::task::spawn_blocking(move || -> Result<String> {
            let bundled = bundle(&sources)?;
            if release {
                minify::minify_js(OUTPUT_FILE, &bundled)
            } else {
                Ok(bundled)
            }
        })
        .await
        .context("error awaiting spawned script bundling task")??;

        let out_file = dest.join(OUTPUT_FILE);
        fs::write(&out_file, output)
            .await
            .context("error writing scripts pipeline output")?;
        tracing::debug!(path = ?common::strip_prefix(&out_file), "finished bundling scripts");

        Ok(PipelineOutput {
            category: Category::Scripts,
            reload: Category::Scripts.reloads(),
        })
    }
}

/// Parse each module, strip its import/export declarations, and concatenate
/// the generated output in source order.
fn bundle(sources: &[SourceFile]) -> Result<String> {
    let cm = js::source_map();
    let mut parts = Vec::with_capacity(sources.len());
    for source in sources {
        let display = common::strip_prefix(&source.path).display().to_string();
        let mut module = match js::parse_module_file(&cm, &source.path)? {
            Ok(module) => module,
            Err(diagnostics) => {
                let first = &diagnostics[0];
                bail!("{display}:{}:{}: {}", first.line, first.col, first.message);
            }
        };
        strip_module_decls(&mut module);
        parts.push(js::emit_module(&cm, &module, false)?);
    }
    Ok(parts.join("\n"))
}

/// Rewrite module items into plain statements: imports vanish (all modules end
/// up in the same scope), exported declarations stay as declarations, and all
/// other export forms are dropped.
fn strip_module_decls(module: &mut Module) {
    module.body = module
        .body
        .drain(..)
        .filter_map(|item| match item {
            ModuleItem::ModuleDecl(ModuleDecl::ExportDecl(export)) => {
                Some(ModuleItem::Stmt(Stmt::Decl(export.decl)))
            }
            ModuleItem::ModuleDecl(_) => None,
            item => Some(item),
        })
        .collect();
}
