use crate::config::{
    self,
    rt::{RtcWatch, WatchOptions},
};
use crate::watch::WatchSystem;
use anyhow::Result;
use clap::Args;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::broadcast;

/// Watch asset sources & rebuild on change.
#[derive(Clone, Debug, Default, Args)]
#[command(name = "watch")]
#[command(next_help_heading = "Watch")]
pub struct Watch {
    /// The output root for all final assets
    #[arg(short, long)]
    pub dist: Option<PathBuf>,
}

impl Watch {
    #[tracing::instrument(level = "trace", skip(self, config))]
    pub async fn run(self, config: Option<PathBuf>) -> Result<()> {
        let (assets, working_directory) = config::load(config).await?;
        let cfg = RtcWatch::from_config(
            assets,
            working_directory,
            WatchOptions {
                inject_autoloader: false,
                dist: self.dist,
            },
        )?;

        let (shutdown_tx, _) = broadcast::channel(1);
        spawn_shutdown_listener(shutdown_tx.clone());

        let mut system = WatchSystem::new(Arc::new(cfg), shutdown_tx, None).await?;
        system.prime().await?;
        system.run().await;
        Ok(())
    }
}

/// Translate ctrl-c into a shutdown broadcast.
pub(crate) fn spawn_shutdown_listener(shutdown_tx: broadcast::Sender<()>) {
    tokio::spawn(async move {
        let _res = tokio::signal::ctrl_c().await;
        tracing::info!("received shutdown signal");
        let _res = shutdown_tx.send(());
    });
}
