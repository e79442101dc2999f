use super::{RtcWatch, WatchOptions};
use crate::config::models::Configuration;
use anyhow::Result;
use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;
use std::sync::Arc;

/// The default address the dev server binds.
pub(crate) const DEFAULT_ADDRESS: IpAddr = IpAddr::V4(Ipv4Addr::LOCALHOST);
/// The default port the dev server binds.
pub(crate) const DEFAULT_PORT: u16 = 8080;

/// Options for constructing a runtime serve config.
#[derive(Clone, Debug, Default)]
pub struct ServeOptions {
    /// The address to serve on.
    pub address: Option<IpAddr>,
    /// The port to serve on.
    pub port: Option<u16>,
    /// Open a browser tab once the server is up.
    pub open: bool,
    /// Override for the output root.
    pub dist: Option<PathBuf>,
}

/// Runtime config for the serve system.
#[derive(Clone, Debug)]
pub struct RtcServe {
    /// Runtime watch config.
    pub watch: Arc<RtcWatch>,
    /// The address to serve on.
    pub address: IpAddr,
    /// The port to serve on.
    pub port: u16,
    /// Open a browser tab once the server is up.
    pub open: bool,
}

impl RtcServe {
    pub(crate) fn new(
        assets: Configuration,
        working_directory: PathBuf,
        opts: ServeOptions,
    ) -> Result<Self> {
        let watch = RtcWatch::new(
            assets,
            working_directory,
            WatchOptions {
                // Serving implies a reload channel, so built HTML references
                // the autoreload client.
                inject_autoloader: true,
                dist: opts.dist,
            },
        )?;
        Ok(Self {
            watch: Arc::new(watch),
            address: opts.address.unwrap_or(DEFAULT_ADDRESS),
            port: opts.port.unwrap_or(DEFAULT_PORT),
            open: opts.open,
        })
    }

    /// Construct from a loaded configuration file.
    pub fn from_config(
        assets: Configuration,
        working_directory: PathBuf,
        opts: ServeOptions,
    ) -> Result<Self> {
        Self::new(assets, working_directory, opts)
    }
}
