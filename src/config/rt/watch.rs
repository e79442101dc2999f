use super::{BuildOptions, RtcBuild};
use crate::common::glob_base;
use crate::config::models::Configuration;
use anyhow::Result;
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;

/// Options for constructing a runtime watch config.
#[derive(Clone, Debug, Default)]
pub struct WatchOptions {
    /// Inject the autoreload client script into built HTML.
    pub inject_autoloader: bool,
    /// Override for the output root.
    pub dist: Option<PathBuf>,
}

/// Runtime config for the watch system.
#[derive(Clone, Debug)]
pub struct RtcWatch {
    /// Runtime build config.
    ///
    /// Always a dev-mode config: watching and release builds are mutually
    /// exclusive, so construction forces `release` off.
    pub build: Arc<RtcBuild>,
    /// Directories to register file-system watchers on, derived from the
    /// static prefixes of all category globs.
    pub paths: Vec<PathBuf>,
    /// Paths to be ignored by the watcher.
    pub ignored_paths: Vec<PathBuf>,
}

impl RtcWatch {
    pub(crate) fn new(
        assets: Configuration,
        working_directory: PathBuf,
        opts: WatchOptions,
    ) -> Result<Self> {
        // Watch mode never builds in release mode, and never revisions file
        // names: pipelines must stay re-runnable in place.
        let build = RtcBuild::new(
            assets,
            working_directory,
            BuildOptions {
                release: false,
                filehash: false,
                inject_autoloader: opts.inject_autoloader,
                dist: opts.dist,
            },
        )?;

        let mut bases = BTreeSet::new();
        for spec in [
            &build.assets.scripts,
            &build.assets.styles,
            &build.assets.templates,
            &build.assets.images,
            &build.assets.fonts,
            &build.assets.html,
            &build.assets.extras,
        ] {
            for pattern in spec.src.patterns() {
                bases.insert(build.working_directory.join(glob_base(pattern)));
            }
        }
        // Collapse nested bases: watching a parent recursively covers children.
        let mut paths: Vec<PathBuf> = Vec::new();
        for base in bases {
            if !paths.iter().any(|prior| base.starts_with(prior)) {
                paths.push(base);
            }
        }

        let ignored_paths = vec![build.final_dist.clone()];

        Ok(Self {
            build: Arc::new(build),
            paths,
            ignored_paths,
        })
    }

    /// Construct from a loaded configuration file.
    pub fn from_config(
        assets: Configuration,
        working_directory: PathBuf,
        opts: WatchOptions,
    ) -> Result<Self> {
        Self::new(assets, working_directory, opts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn watch_mode_is_never_release() -> Result<()> {
        let tmpdir = tempfile::tempdir()?;
        let cfg = RtcWatch::new(
            Configuration::default(),
            tmpdir.path().to_path_buf(),
            WatchOptions::default(),
        )?;
        assert!(!cfg.build.release, "watch config must force dev mode");
        assert!(!cfg.build.filehash, "watch config must not revision names");
        Ok(())
    }

    #[tokio::test]
    async fn watch_paths_collapse_nested_bases() -> Result<()> {
        let tmpdir = tempfile::tempdir()?;
        let cfg = RtcWatch::new(
            Configuration::default(),
            tmpdir.path().to_path_buf(),
            WatchOptions::default(),
        )?;
        // All default category globs live under `src`, which itself is a base
        // (html/extras globs), so a single watch root remains.
        assert_eq!(cfg.paths, vec![tmpdir.path().join("src")]);
        Ok(())
    }
}
