//! Fonts asset pipeline: verbatim copy.

use super::{copy_sources, Category, PipelineOutput};
use crate::config::rt::RtcBuild;
use anyhow::Result;
use std::sync::Arc;
use tokio::task::JoinHandle;

/// The fonts asset pipeline.
pub struct Fonts {
    /// Runtime build config.
    cfg: Arc<RtcBuild>,
}

impl Fonts {
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
        let copied = copy_sources(&self.cfg, &self.cfg.assets.fonts).await?;
        tracing::debug!("finished copying {copied} font file(s)");
        Ok(PipelineOutput {
            category: Category::Fonts,
            reload: Category::Fonts.reloads(),
        })
    }
}
