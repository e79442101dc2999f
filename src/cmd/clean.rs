use crate::common::remove_dir_all;
use crate::config::{
    self,
    rt::{CleanOptions, RtcClean},
};
use anyhow::Result;
use clap::Args;
use std::path::PathBuf;

/// Clean output artifacts.
#[derive(Clone, Debug, Default, Args)]
#[command(name = "clean")]
#[command(next_help_heading = "Clean")]
pub struct Clean {
    /// The output root to remove
    #[arg(short, long)]
    pub dist: Option<PathBuf>,
}

impl Clean {
    #[tracing::instrument(level = "trace", skip(self, config))]
    pub async fn run(self, config: Option<PathBuf>) -> Result<()> {
        let (assets, working_directory) = config::load(config).await?;
        let cfg = RtcClean::from_config(assets, working_directory, CleanOptions { dist: self.dist })?;
        remove_dir_all(cfg.dist).await
    }
}
