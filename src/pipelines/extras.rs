//! Extras asset pipeline: verbatim copy of miscellaneous root files.

use super::{copy_sources, Category, PipelineOutput};
use crate::config::rt::RtcBuild;
use anyhow::Result;
use std::sync::Arc;
use tokio::task::JoinHandle;

/// The extras asset pipeline.
pub struct Extras {
    /// Runtime build config.
    cfg: Arc<RtcBuild>,
}

impl Extras {
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
        let copied = copy_sources(&self.cfg, &self.cfg.assets.extras).await?;
        tracing::debug!("finished copying {copied} extra file(s)");
        Ok(PipelineOutput {
            category: Category::Extras,
            reload: Category::Extras.reloads(),
        })
    }
}
