//! Images asset pipeline: copy one directory level deep, recompressing PNGs
//! in release mode.

use super::{Category, PipelineOutput};
use crate::common;
use crate::config::rt::RtcBuild;
use anyhow::{anyhow, Context, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tokio::task::JoinHandle;

/// How many directory levels below the glob base survive in the output tree.
const DEPTH: usize = 1;

/// The images asset pipeline.
pub struct Images {
    /// Runtime build config.
    cfg: Arc<RtcBuild>,
}

impl Images {
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
            self.cfg.assets.images.src.patterns(),
        )
        .await?;
        if sources.is_empty() {
            tracing::debug!("no images to copy");
            return Ok(PipelineOutput {
                category: Category::Images,
                reload: Category::Images.reloads(),
            });
        }

        let dest = self.cfg.dest_dir(&self.cfg.assets.images);
        fs::create_dir_all(&dest)
            .await
            .with_context(|| format!("error creating output directory {:?}", &dest))?;

        for source in &sources {
            let out = dest.join(depth_limited(&source.rel, DEPTH));
            if let Some(parent) = out.parent() {
                fs::create_dir_all(parent)
                    .await
                    .with_context(|| format!("error creating output directory {:?}", parent))?;
            }

            if self.cfg.release && is_png(&source.path) {
                let bytes = fs::read(&source.path)
                    .await
                    .with_context(|| format!("error reading image {:?}", &source.path))?;
                let optimized = tokio::task::spawn_blocking(move || {
                    oxipng::optimize_from_memory(&bytes, &oxipng::Options::from_preset(2))
                })
                .await
                .context("error awaiting spawned PNG optimization task")?
                .map_err(|err| anyhow!("error optimizing PNG {:?}: {}", &source.path, err))?;
                fs::write(&out, optimized)
                    .await
                    .context("error writing images pipeline output")?;
            } else {
                fs::copy(&source.path, &out)
                    .await
                    .with_context(|| format!("error copying {:?} to {:?}", &source.path, &out))?;
            }
        }
        tracing::debug!("finished copying {} image(s)", sources.len());

        Ok(PipelineOutput {
            category: Category::Images,
            reload: Category::Images.reloads(),
        })
    }
}

fn is_png(path: &Path) -> bool {
    mime_guess::from_path(path)
        .first()
        .map(|mime| mime.essence_str() == "image/png")
        .unwrap_or(false)
}

/// Trim a relative path so that at most `depth` directory levels remain above
/// the file name.
fn depth_limited(rel: &Path, depth: usize) -> PathBuf {
    let components: Vec<_> = rel.components().collect();
    let keep = components.len().saturating_sub(1).min(depth);
    components[components.len() - 1 - keep..].iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("logo.png", "logo.png")]
    #[case("icons/check.png", "icons/check.png")]
    #[case("deep/nested/icons/check.png", "icons/check.png")]
    fn depth_limited_keeps_one_level(#[case] rel: &str, #[case] expected: &str) {
        assert_eq!(depth_limited(Path::new(rel), DEPTH), PathBuf::from(expected));
    }
}
