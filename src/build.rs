//! Build system & task graph.

use crate::config::rt::RtcBuild;
use crate::pipelines::{self, Category, PipelineOutput};
use crate::{cache, common, lint, rev};
use anyhow::{Context, Result};
use futures_util::stream::{FuturesUnordered, StreamExt};
use std::collections::BTreeSet;
use std::sync::Arc;

/// Categories with no mutual dependencies; release builds fan these out
/// concurrently, alongside the linter.
const PARALLEL_GROUP: [Category; 5] = [
    Category::Images,
    Category::Fonts,
    Category::Styles,
    Category::Html,
    Category::Extras,
];

/// Categories that run strictly after the parallel group, in order: the
/// bundle may reference inlined template output, and the revision & cache
/// passes consume everything written before them.
const SEQUENTIAL_GROUP: [Category; 2] = [Category::Templates, Category::Scripts];

/// A system for driving the asset pipelines over a fixed task graph.
pub struct BuildSystem {
    /// Runtime config.
    cfg: Arc<RtcBuild>,
}

impl BuildSystem {
    /// Create a new instance.
    pub fn new(cfg: Arc<RtcBuild>) -> Self {
        Self { cfg }
    }

    /// Remove & recreate the output root.
    pub async fn clean_output(&self) -> Result<()> {
        common::remove_dir_all(self.cfg.final_dist.clone()).await?;
        tokio::fs::create_dir_all(&self.cfg.final_dist)
            .await
            .with_context(|| format!("error creating output root {:?}", &self.cfg.final_dist))
    }

    /// Run the full build graph.
    #[tracing::instrument(level = "trace", skip(self))]
    pub async fn build(&self) -> Result<()> {
        tracing::info!("{}starting build", common::BUILDING);
        self.clean_output().await?;

        // The linter runs alongside the independent asset pipelines.
        tokio::try_join!(lint::run(self.cfg.clone()), self.run_parallel(&PARALLEL_GROUP))?;

        for category in SEQUENTIAL_GROUP {
            self.run_category(category).await?;
        }
        if self.cfg.filehash {
            rev::revision(&self.cfg).await?;
        }
        cache::generate(&self.cfg).await?;

        tracing::info!("{}build finished", common::SUCCESS);
        Ok(())
    }

    /// Run the pipelines for a set of changed categories, sequentially.
    ///
    /// A change to script sources lints them first, as the watcher always did
    /// for the scripts category. Returns whether any completed pipeline
    /// qualifies for a browser reload.
    pub async fn run_changed(&self, categories: &BTreeSet<Category>) -> Result<bool> {
        if categories.contains(&Category::Scripts) {
            lint::run(self.cfg.clone()).await?;
        }
        let mut reload = false;
        for category in categories {
            let output = self.run_category(*category).await?;
            reload |= output.reload;
        }
        Ok(reload)
    }

    /// Fan a group of categories out concurrently, aborting on first failure.
    async fn run_parallel(&self, categories: &[Category]) -> Result<()> {
        let mut handles: FuturesUnordered<_> = categories
            .iter()
            .map(|category| pipelines::spawn(*category, self.cfg.clone()))
            .collect();
        while let Some(joined) = handles.next().await {
            joined.context("error joining pipeline task")??;
        }
        Ok(())
    }

    async fn run_category(&self, category: Category) -> Result<PipelineOutput> {
        pipelines::spawn(category, self.cfg.clone())
            .await
            .context("error joining pipeline task")?
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Lay down a miniature application exercising every asset category.
    async fn setup_app() -> Result<(tempfile::TempDir, RtcBuild)> {
        let tmpdir = tempfile::tempdir().context("error building tempdir for test")?;
        let root = tmpdir.path();
        let cfg = RtcBuild::new_test(root).await?;
        for dir in ["src/scripts", "src/styles", "src/app", "src/fonts", "src/images"] {
            tokio::fs::create_dir_all(root.join(dir)).await?;
        }
        tokio::fs::write(
            root.join("src/scripts/main.js"),
            "const el = document.querySelector('p');\nconsole.log(el);\n",
        )
        .await?;
        tokio::fs::write(root.join("src/styles/main.scss"), "body { margin: 0; }\n").await?;
        tokio::fs::write(root.join("src/app/app.html"), "<div>app</div>\n").await?;
        tokio::fs::write(root.join("src/fonts/body.woff2"), b"\0font").await?;
        tokio::fs::write(root.join("src/index.html"), "<html>\n  <body>\n  </body>\n</html>\n")
            .await?;
        tokio::fs::write(root.join("src/robots.txt"), "User-agent: *\n").await?;
        Ok((tmpdir, cfg))
    }

    #[tokio::test]
    async fn release_build_produces_full_output_tree() -> Result<()> {
        let (tmpdir, mut cfg) = setup_app().await?;
        cfg.release = true;
        let root = tmpdir.path();

        // A stale file from a previous run must not survive the build.
        tokio::fs::write(root.join("dist/stale.txt"), "old").await?;

        BuildSystem::new(Arc::new(cfg)).build().await?;

        for output in [
            "dist/js/main.js",
            "dist/js/templates.js",
            "dist/css/main.css",
            "dist/fonts/body.woff2",
            "dist/index.html",
            "dist/robots.txt",
            "dist/service-worker.js",
        ] {
            anyhow::ensure!(root.join(output).exists(), "missing expected output {output}");
        }
        anyhow::ensure!(!root.join("dist/stale.txt").exists(), "stale files must be cleaned");
        Ok(())
    }

    #[tokio::test]
    async fn release_build_is_idempotent() -> Result<()> {
        let (tmpdir, mut cfg) = setup_app().await?;
        cfg.release = true;
        let system = BuildSystem::new(Arc::new(cfg));
        let root = tmpdir.path();

        system.build().await?;
        let mut first = std::collections::BTreeMap::new();
        for path in common::walk_files(root.join("dist")).await? {
            first.insert(path.clone(), tokio::fs::read(&path).await?);
        }

        system.build().await?;
        let mut second = std::collections::BTreeMap::new();
        for path in common::walk_files(root.join("dist")).await? {
            second.insert(path.clone(), tokio::fs::read(&path).await?);
        }

        anyhow::ensure!(first == second, "two identical builds must be byte-identical");
        Ok(())
    }

    #[tokio::test]
    async fn build_fails_on_lint_violation() -> Result<()> {
        let (tmpdir, cfg) = setup_app().await?;
        tokio::fs::write(tmpdir.path().join("src/scripts/bad.js"), "mystery();\n").await?;

        let res = BuildSystem::new(Arc::new(cfg)).build().await;
        anyhow::ensure!(res.is_err(), "lint violations must abort the build");
        Ok(())
    }
}
