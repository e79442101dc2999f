//! Asset pipelines.

#[cfg(test)]
mod html_test;
#[cfg(test)]
mod styles_test;

mod extras;
mod fonts;
mod html;
mod images;
mod scripts;
mod styles;
mod templates;

use crate::common;
use crate::config::models::{AssetSpec, Configuration};
use crate::config::rt::RtcBuild;
use anyhow::{Context, Result};
use std::fmt;
use std::sync::Arc;
use tokio::fs;
use tokio::task::JoinHandle;

/// An asset category from the configuration file.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Category {
    Scripts,
    Styles,
    Templates,
    Images,
    Fonts,
    Html,
    Extras,
}

impl Category {
    /// Every category, in canonical order.
    pub const ALL: [Self; 7] = [
        Self::Scripts,
        Self::Styles,
        Self::Templates,
        Self::Images,
        Self::Fonts,
        Self::Html,
        Self::Extras,
    ];

    /// The category's name as written in the configuration file.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Scripts => "scripts",
            Self::Styles => "styles",
            Self::Templates => "templates",
            Self::Images => "images",
            Self::Fonts => "fonts",
            Self::Html => "html",
            Self::Extras => "extras",
        }
    }

    /// Whether a successful run should notify connected browsers.
    pub fn reloads(&self) -> bool {
        matches!(
            self,
            Self::Scripts | Self::Styles | Self::Images | Self::Fonts | Self::Html
        )
    }

    /// The category's record in the configuration file.
    pub fn spec<'a>(&self, assets: &'a Configuration) -> &'a AssetSpec {
        match self {
            Self::Scripts => &assets.scripts,
            Self::Styles => &assets.styles,
            Self::Templates => &assets.templates,
            Self::Images => &assets.images,
            Self::Fonts => &assets.fonts,
            Self::Html => &assets.html,
            Self::Extras => &assets.extras,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The output of a single pipeline run.
#[derive(Clone, Copy, Debug)]
pub struct PipelineOutput {
    /// The category that ran.
    pub category: Category,
    /// Whether connected browsers should reload.
    pub reload: bool,
}

/// Spawn the pipeline for the given asset category.
pub fn spawn(category: Category, cfg: Arc<RtcBuild>) -> JoinHandle<Result<PipelineOutput>> {
    match category {
        Category::Scripts => scripts::Scripts::new(cfg).spawn(),
        Category::Styles => styles::Styles::new(cfg).spawn(),
        Category::Templates => templates::Templates::new(cfg).spawn(),
        Category::Images => images::Images::new(cfg).spawn(),
        Category::Fonts => fonts::Fonts::new(cfg).spawn(),
        Category::Html => html::Html::new(cfg).spawn(),
        Category::Extras => extras::Extras::new(cfg).spawn(),
    }
}

/// Copy every source of the given category into its destination, preserving
/// paths relative to the glob base. Returns the number of files copied.
pub(self) async fn copy_sources(cfg: &RtcBuild, spec: &AssetSpec) -> Result<usize> {
    let sources = common::collect_sources(&cfg.working_directory, spec.src.patterns()).await?;
    if sources.is_empty() {
        return Ok(0);
    }
    let dest = cfg.dest_dir(spec);
    fs::create_dir_all(&dest)
        .await
        .with_context(|| format!("error creating output directory {:?}", &dest))?;
    for source in &sources {
        let out = dest.join(&source.rel);
        if let Some(parent) = out.parent() {
            fs::create_dir_all(parent)
                .await
                .with_context(|| format!("error creating output directory {:?}", parent))?;
        }
        fs::copy(&source.path, &out)
            .await
            .with_context(|| format!("error copying {:?} to {:?}", &source.path, &out))?;
    }
    Ok(sources.len())
}
