//! Configuration: file models and runtime config.

pub mod models;
pub mod rt;

#[cfg(test)]
mod models_test;

pub use models::*;

use anyhow::{Context, Result};
use std::path::PathBuf;

/// The default configuration file name.
pub const CONFIG_FILE: &str = "gantry.json";

/// Load the configuration file, returning it along with the working directory
/// all relative paths resolve against.
///
/// A missing file is not an error: the default configuration is returned, so
/// a conventionally laid out project needs no config file at all.
pub async fn load(path: Option<PathBuf>) -> Result<(Configuration, PathBuf)> {
    let working_directory = std::env::current_dir()
        .and_then(|cwd| cwd.canonicalize())
        .context("error getting canonical path to working directory")?;
    let explicit = path.is_some();
    let path = path.unwrap_or_else(|| working_directory.join(CONFIG_FILE));

    if !crate::common::path_exists(&path).await? {
        if explicit {
            anyhow::bail!("config file {:?} does not exist", path);
        }
        tracing::debug!("no {CONFIG_FILE} found, using default configuration");
        return Ok((Configuration::default(), working_directory));
    }

    let raw = tokio::fs::read_to_string(&path)
        .await
        .with_context(|| format!("error reading config file {:?}", &path))?;
    let cfg = serde_json::from_str(&raw)
        .with_context(|| format!("error parsing config file {:?}", &path))?;
    Ok((cfg, working_directory))
}
