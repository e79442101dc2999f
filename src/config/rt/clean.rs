use super::DIST_DIR;
use crate::config::models::Configuration;
use anyhow::Result;
use std::path::PathBuf;

/// Options for constructing a runtime clean config.
#[derive(Clone, Debug, Default)]
pub struct CleanOptions {
    /// Override for the output root.
    pub dist: Option<PathBuf>,
}

/// Runtime config for the clean command.
#[derive(Clone, Debug)]
pub struct RtcClean {
    /// The output root to remove.
    pub dist: PathBuf,
}

impl RtcClean {
    pub(crate) fn new(
        _assets: Configuration,
        working_directory: PathBuf,
        opts: CleanOptions,
    ) -> Result<Self> {
        Ok(Self {
            dist: working_directory.join(opts.dist.unwrap_or_else(|| DIST_DIR.into())),
        })
    }

    /// Construct from a loaded configuration file.
    pub fn from_config(
        assets: Configuration,
        working_directory: PathBuf,
        opts: CleanOptions,
    ) -> Result<Self> {
        Self::new(assets, working_directory, opts)
    }
}
