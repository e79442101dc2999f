//! Script source linting.
//!
//! Every configured script source must parse as an ES module, and every
//! identifier resolving to a global must be on the allowlist (standard
//! browser globals plus any extras from the config's `lint.globals`).

use crate::common::{self, SourceFile};
use crate::config::rt::RtcBuild;
use crate::processing::js;
use anyhow::{bail, Context, Result};
use std::collections::HashSet;
use std::sync::Arc;
use swc_common::{Globals, Mark, Span, Spanned, SyntaxContext, GLOBALS};
use swc_ecma_ast::Ident;
use swc_ecma_transforms_base::resolver;
use swc_ecma_visit::{Visit, VisitMutWith, VisitWith};
use thiserror::Error;

/// Globals always accepted in script sources.
const DEFAULT_GLOBALS: &[&str] = &[
    "Array",
    "Boolean",
    "CustomEvent",
    "Date",
    "Error",
    "Event",
    "Infinity",
    "JSON",
    "Map",
    "Math",
    "NaN",
    "Number",
    "Object",
    "Promise",
    "RegExp",
    "Set",
    "String",
    "Symbol",
    "URL",
    "XMLHttpRequest",
    "clearInterval",
    "clearTimeout",
    "console",
    "document",
    "fetch",
    "history",
    "isNaN",
    "localStorage",
    "location",
    "navigator",
    "parseFloat",
    "parseInt",
    "requestAnimationFrame",
    "sessionStorage",
    "setInterval",
    "setTimeout",
    "undefined",
    "window",
];

/// A single lint finding.
#[derive(Clone, Debug, Error)]
#[error("{path}:{line}:{col}: {message}")]
pub struct Violation {
    pub path: String,
    pub line: usize,
    pub col: usize,
    pub message: String,
}

/// Lint all configured script sources, failing on any violation.
#[tracing::instrument(level = "trace", skip(cfg))]
pub async fn run(cfg: Arc<RtcBuild>) -> Result<()> {
    let sources =
        common::collect_sources(&cfg.working_directory, cfg.assets.scripts.src.patterns()).await?;
    if sources.is_empty() {
        tracing::debug!("no script sources to lint");
        return Ok(());
    }

    let mut allowed: HashSet<String> = DEFAULT_GLOBALS.iter().map(|s| s.to_string()).collect();
    allowed.extend(cfg.assets.lint.globals.iter().cloned());

    let violations = tokio::task::spawn_blocking(move || lint_files(&sources, &allowed))
        .await
        .context("error awaiting spawned lint task")??;

    if violations.is_empty() {
        tracing::debug!("lint passed");
        return Ok(());
    }
    for violation in &violations {
        tracing::error!("{violation}");
    }
    bail!("lint failed with {} violation(s)", violations.len());
}

fn lint_files(sources: &[SourceFile], allowed: &HashSet<String>) -> Result<Vec<Violation>> {
    let mut violations = Vec::new();
    for source in sources {
        violations.extend(lint_file(source, allowed)?);
    }
    Ok(violations)
}

fn lint_file(source: &SourceFile, allowed: &HashSet<String>) -> Result<Vec<Violation>> {
    let cm = js::source_map();
    let display = common::strip_prefix(&source.path).display().to_string();

    let module = match js::parse_module_file(&cm, &source.path)? {
        Ok(module) => module,
        Err(diagnostics) => {
            return Ok(diagnostics
                .into_iter()
                .map(|d| Violation {
                    path: display.clone(),
                    line: d.line,
                    col: d.col,
                    message: d.message,
                })
                .collect());
        }
    };

    let refs = GLOBALS.set(&Globals::new(), || {
        let unresolved_mark = Mark::new();
        let top_level_mark = Mark::new();
        let mut module = module;
        module.visit_mut_with(&mut resolver(unresolved_mark, top_level_mark, false));

        let mut collector = GlobalRefs {
            unresolved: SyntaxContext::empty().apply_mark(unresolved_mark),
            refs: Vec::new(),
        };
        module.visit_with(&mut collector);
        collector.refs
    });

    let mut violations = Vec::new();
    for (sym, span) in refs {
        if !allowed.contains(&sym) {
            let loc = cm.lookup_char_pos(span.lo());
            violations.push(Violation {
                path: display.clone(),
                line: loc.line,
                col: loc.col_display + 1,
                message: format!("reference to undeclared global `{sym}`"),
            });
        }
    }
    Ok(violations)
}

/// Collects identifiers left unresolved by the resolver pass, i.e. references
/// to globals.
struct GlobalRefs {
    unresolved: SyntaxContext,
    refs: Vec<(String, Span)>,
}

impl Visit for GlobalRefs {
    fn visit_ident(&mut self, ident: &Ident) {
        if ident.ctxt == self.unresolved {
            self.refs.push((ident.sym.to_string(), ident.span()));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::rt::RtcBuild;

    async fn setup(script: &str) -> Result<(tempfile::TempDir, Arc<RtcBuild>)> {
        let tmpdir = tempfile::tempdir().context("error building tempdir for test")?;
        let cfg = RtcBuild::new_test(tmpdir.path()).await?;
        tokio::fs::create_dir_all(tmpdir.path().join("src/scripts")).await?;
        tokio::fs::write(tmpdir.path().join("src/scripts/main.js"), script).await?;
        Ok((tmpdir, Arc::new(cfg)))
    }

    #[tokio::test]
    async fn ok_clean_script() -> Result<()> {
        let (_tmpdir, cfg) = setup("const el = document.querySelector('p');\nwindow.x = el;\n").await?;
        run(cfg).await
    }

    #[tokio::test]
    async fn err_undeclared_global() -> Result<()> {
        let (_tmpdir, cfg) = setup("frobnicate();\n").await?;
        let res = run(cfg).await;
        anyhow::ensure!(res.is_err(), "expected undeclared global to fail lint");
        Ok(())
    }

    #[tokio::test]
    async fn ok_configured_global() -> Result<()> {
        let (_tmpdir, cfg) = setup("angular.bootstrap(document, ['app']);\n").await?;
        let mut cfg = (*cfg).clone();
        cfg.assets.lint.globals = vec!["angular".to_string()];
        run(Arc::new(cfg)).await
    }

    #[tokio::test]
    async fn err_syntax_error() -> Result<()> {
        let (_tmpdir, cfg) = setup("function ( {\n").await?;
        let res = run(cfg).await;
        anyhow::ensure!(res.is_err(), "expected syntax error to fail lint");
        Ok(())
    }
}
