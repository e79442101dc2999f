use crate::config::{
    self,
    rt::{RtcServe, ServeOptions},
};
use crate::serve::ServeSystem;
use anyhow::Result;
use clap::Args;
use std::net::IpAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::broadcast;

/// Watch, rebuild & serve with live reload.
#[derive(Clone, Debug, Default, Args)]
#[command(name = "serve")]
#[command(next_help_heading = "Serve")]
pub struct Serve {
    /// The address to serve on [default: 127.0.0.1]
    #[arg(long)]
    pub address: Option<IpAddr>,

    /// The port to serve on [default: 8080]
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Open a browser tab once the initial server is up
    #[arg(long)]
    pub open: bool,

    /// The output root for all final assets
    #[arg(short, long)]
    pub dist: Option<PathBuf>,
}

impl Serve {
    #[tracing::instrument(level = "trace", skip(self, config))]
    pub async fn run(self, config: Option<PathBuf>) -> Result<()> {
        let (assets, working_directory) = config::load(config).await?;
        let cfg = RtcServe::from_config(
            assets,
            working_directory,
            ServeOptions {
                address: self.address,
                port: self.port,
                open: self.open,
                dist: self.dist,
            },
        )?;

        let (shutdown_tx, _) = broadcast::channel(1);
        super::watch::spawn_shutdown_listener(shutdown_tx.clone());

        let system = ServeSystem::new(Arc::new(cfg), shutdown_tx).await?;
        system.run().await
    }
}
