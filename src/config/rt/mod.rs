//! Runtime config: immutable, fully resolved configuration handed to the
//! build, watch, serve & clean systems.
//!
//! The file model ([`super::models`]) is what users write; the types here are
//! what the rest of the system consumes. Mode flags live on these structs and
//! are fixed at construction: release ("prod") and watch modes are mutually
//! exclusive by construction rather than by runtime bookkeeping.

mod build;
mod clean;
mod serve;
mod watch;

pub use build::{BuildOptions, RtcBuild};
pub use clean::{CleanOptions, RtcClean};
pub use serve::{RtcServe, ServeOptions};
pub use watch::{RtcWatch, WatchOptions};

/// The default output root directory.
pub(crate) const DIST_DIR: &str = "dist";
