use super::DIST_DIR;
use crate::config::models::{AssetSpec, Configuration};
use anyhow::{Context, Result};
use std::path::PathBuf;

/// Options for constructing a runtime build config.
#[derive(Clone, Debug, Default)]
pub struct BuildOptions {
    /// Build in release mode.
    pub release: bool,
    /// Append content hashes to asset file names and rewrite references.
    pub filehash: bool,
    /// Inject the autoreload client script into built HTML.
    pub inject_autoloader: bool,
    /// Override for the output root.
    pub dist: Option<PathBuf>,
}

/// Runtime config for the build system.
#[derive(Clone, Debug)]
pub struct RtcBuild {
    /// The working directory all relative paths resolve against.
    pub working_directory: PathBuf,
    /// The asset category mapping from the configuration file.
    pub assets: Configuration,
    /// Build in release mode: minify HTML, CSS & JS output.
    ///
    /// Never true together with a watcher; see [`super::RtcWatch`].
    pub release: bool,
    /// Append content hashes to asset file names and rewrite references
    /// (cache busting).
    pub filehash: bool,
    /// Whether built HTML should reference the autoreload client script.
    ///
    /// This value is set by the serve config only. If the dev server is not
    /// being used, the autoloader is not injected.
    pub inject_autoloader: bool,
    /// The output root, removed by `clean` and ignored by the watcher.
    pub final_dist: PathBuf,
}

impl RtcBuild {
    /// Construct a new instance.
    pub(crate) fn new(
        assets: Configuration,
        working_directory: PathBuf,
        opts: BuildOptions,
    ) -> Result<Self> {
        let final_dist = working_directory.join(opts.dist.unwrap_or_else(|| DIST_DIR.into()));
        Ok(Self {
            working_directory,
            assets,
            release: opts.release,
            filehash: opts.filehash,
            inject_autoloader: opts.inject_autoloader,
            final_dist,
        })
    }

    /// Construct from a loaded configuration file.
    pub fn from_config(
        assets: Configuration,
        working_directory: PathBuf,
        opts: BuildOptions,
    ) -> Result<Self> {
        Self::new(assets, working_directory, opts)
            .context("error building runtime build config")
    }

    /// The absolute destination directory of an asset category.
    pub fn dest_dir(&self, spec: &AssetSpec) -> PathBuf {
        self.working_directory.join(&spec.dest)
    }

    /// The absolute directory built HTML lands in; also the dev server root.
    pub fn html_dist(&self) -> PathBuf {
        self.dest_dir(&self.assets.html)
    }

    /// Construct a new instance for testing.
    #[cfg(test)]
    pub async fn new_test(tmpdir: &std::path::Path) -> Result<Self> {
        let final_dist = tmpdir.join(DIST_DIR);
        tokio::fs::create_dir_all(&final_dist)
            .await
            .context("error creating dist dir for test")?;
        Ok(Self {
            working_directory: tmpdir.to_path_buf(),
            assets: Configuration::default(),
            release: false,
            filehash: false,
            inject_autoloader: false,
            final_dist,
        })
    }
}
