use crate::build::BuildSystem;
use crate::config::{
    self,
    rt::{BuildOptions, RtcBuild},
};
use anyhow::Result;
use clap::Args;
use std::path::PathBuf;
use std::sync::Arc;

/// Build all assets in release mode.
#[derive(Clone, Debug, Default, Args)]
#[command(name = "build")]
#[command(next_help_heading = "Build")]
pub struct Build {
    /// The output root for all final assets
    #[arg(short, long)]
    pub dist: Option<PathBuf>,

    /// Append content hashes to asset file names (cache busting)
    #[arg(long)]
    pub filehash: bool,
}

impl Build {
    #[tracing::instrument(level = "trace", skip(self, config))]
    pub async fn run(self, config: Option<PathBuf>) -> Result<()> {
        let (assets, working_directory) = config::load(config).await?;
        let cfg = RtcBuild::from_config(
            assets,
            working_directory,
            BuildOptions {
                release: true,
                filehash: self.filehash,
                inject_autoloader: false,
                dist: self.dist,
            },
        )?;
        BuildSystem::new(Arc::new(cfg)).build().await
    }
}
