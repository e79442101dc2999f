//! Model of the configuration file.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// The source glob(s) of an asset category, either a single pattern or an
/// array of patterns.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum SourceGlobs {
    /// A single glob pattern.
    One(String),
    /// A list of glob patterns, processed in order.
    Many(Vec<String>),
}

impl SourceGlobs {
    /// The patterns as a slice, regardless of representation.
    pub fn patterns(&self) -> &[String] {
        match self {
            Self::One(pattern) => std::slice::from_ref(pattern),
            Self::Many(patterns) => patterns.as_slice(),
        }
    }
}

impl From<&str> for SourceGlobs {
    fn from(pattern: &str) -> Self {
        Self::One(pattern.to_string())
    }
}

/// An asset category record: where its sources live and where its outputs go.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct AssetSpec {
    /// Source glob pattern(s), relative to the working directory.
    pub src: SourceGlobs,
    /// Destination directory, relative to the working directory.
    pub dest: PathBuf,
}

impl AssetSpec {
    fn new(src: &str, dest: &str) -> Self {
        Self {
            src: src.into(),
            dest: dest.into(),
        }
    }
}

/// Options for the script linter.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct LintOpts {
    /// Additional global identifiers the linter should accept, on top of the
    /// standard browser globals.
    #[serde(default)]
    pub globals: Vec<String>,
}

/// The complete configuration file model: one record per asset category, plus
/// linter options.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct Configuration {
    #[serde(default = "default_scripts")]
    pub scripts: AssetSpec,
    #[serde(default = "default_styles")]
    pub styles: AssetSpec,
    #[serde(default = "default_templates")]
    pub templates: AssetSpec,
    #[serde(default = "default_images")]
    pub images: AssetSpec,
    #[serde(default = "default_fonts")]
    pub fonts: AssetSpec,
    #[serde(default = "default_html")]
    pub html: AssetSpec,
    #[serde(default = "default_extras")]
    pub extras: AssetSpec,
    #[serde(default)]
    pub lint: LintOpts,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            scripts: default_scripts(),
            styles: default_styles(),
            templates: default_templates(),
            images: default_images(),
            fonts: default_fonts(),
            html: default_html(),
            extras: default_extras(),
            lint: LintOpts::default(),
        }
    }
}

fn default_scripts() -> AssetSpec {
    AssetSpec::new("src/scripts/**/*.js", "dist/js")
}

fn default_styles() -> AssetSpec {
    AssetSpec::new("src/styles/main.scss", "dist/css")
}

fn default_templates() -> AssetSpec {
    AssetSpec::new("src/app/**/*.html", "dist/js")
}

fn default_images() -> AssetSpec {
    AssetSpec::new("src/images/**/*.{png,jpg,jpeg,gif,svg}", "dist/img")
}

fn default_fonts() -> AssetSpec {
    AssetSpec::new("src/fonts/**/*.{woff,woff2,ttf,eot,svg}", "dist/fonts")
}

fn default_html() -> AssetSpec {
    AssetSpec::new("src/*.html", "dist")
}

fn default_extras() -> AssetSpec {
    AssetSpec::new("src/*.{txt,ico,json,webmanifest}", "dist")
}
