//! Watch system: re-run pipelines in response to file-system changes.

use crate::build::BuildSystem;
use crate::common;
use crate::config::models::Configuration;
use crate::config::rt::RtcWatch;
use crate::pipelines::Category;
use crate::ws;
use anyhow::{Context, Result};
use futures_util::StreamExt;
use globset::{Glob, GlobSet, GlobSetBuilder};
use notify::{recommended_watcher, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, watch};
use tokio_stream::wrappers::BroadcastStream;

/// Blacklisted path segments which are ignored by the watcher by default.
const BLACKLIST: [&str; 1] = [".git"];

/// A watch system wrapping a build system and a watcher.
pub struct WatchSystem {
    /// The build system.
    build: BuildSystem,
    /// Runtime config.
    cfg: Arc<RtcWatch>,
    /// Compiled glob matchers, one per asset category.
    matchers: Vec<(Category, GlobSet)>,
    /// A channel of FS watch events.
    watch_rx: mpsc::Receiver<Event>,
    /// The watcher; dropping it stops watching.
    _watcher: RecommendedWatcher,
    /// The application shutdown channel.
    shutdown: BroadcastStream<()>,
    /// Channel observed by the dev server's autoreload clients, when serving.
    build_status_tx: Option<watch::Sender<ws::BuildState>>,
}

impl WatchSystem {
    /// Create a new instance.
    pub async fn new(
        cfg: Arc<RtcWatch>,
        shutdown: broadcast::Sender<()>,
        build_status_tx: Option<watch::Sender<ws::BuildState>>,
    ) -> Result<Self> {
        let (watch_tx, watch_rx) = mpsc::channel(16);
        let _watcher = build_watcher(watch_tx, cfg.paths.clone())?;
        let matchers = build_matchers(&cfg.build.assets)?;
        let build = BuildSystem::new(cfg.build.clone());
        Ok(Self {
            build,
            cfg,
            matchers,
            watch_rx,
            _watcher,
            shutdown: BroadcastStream::new(shutdown.subscribe()),
            build_status_tx,
        })
    }

    /// Populate the output tree before watching starts: clear it, then copy
    /// the extras category. Everything else is produced on change.
    pub async fn prime(&mut self) -> Result<()> {
        self.build.clean_output().await?;
        self.build
            .run_changed(&BTreeSet::from([Category::Extras]))
            .await?;
        Ok(())
    }

    /// Run the watch system, responding to events and triggering pipelines.
    #[tracing::instrument(level = "trace", skip(self))]
    pub async fn run(mut self) {
        loop {
            tokio::select! {
                Some(event) = self.watch_rx.recv() => self.handle_watch_event(event).await,
                _ = self.shutdown.next() => break, // Any event, even a drop, will trigger shutdown.
            }
        }

        tracing::debug!("watcher system has shut down");
    }

    async fn handle_watch_event(&mut self, event: Event) {
        let mut categories = self.categories_for(&event);
        // Coalesce the burst: anything queued while a previous run was in
        // flight is unioned into a single follow-up run.
        while let Ok(event) = self.watch_rx.try_recv() {
            categories.extend(self.categories_for(&event));
        }
        if categories.is_empty() {
            return;
        }

        let names: Vec<_> = categories.iter().map(Category::name).collect();
        tracing::info!("{}change detected, rebuilding {}", common::BUILDING, names.join(", "));

        match self.build.run_changed(&categories).await {
            Ok(reload) => {
                tracing::info!("{}rebuild finished", common::SUCCESS);
                if reload {
                    if let Some(tx) = &self.build_status_tx {
                        let _ = tx.send(ws::BuildState::Ok);
                    }
                }
            }
            Err(err) => {
                tracing::error!("{}rebuild failed: {err:?}", common::ERROR);
                if let Some(tx) = &self.build_status_tx {
                    let _ = tx.send(ws::BuildState::Failed {
                        reason: err.to_string(),
                    });
                }
            }
        }
    }

    /// Map a watch event to the set of asset categories whose globs cover any
    /// of its paths.
    fn categories_for(&self, event: &Event) -> BTreeSet<Category> {
        let mut categories = BTreeSet::new();
        if matches!(
            &event.kind,
            EventKind::Access(_) | EventKind::Any | EventKind::Other
        ) {
            return categories; // Nothing to do with these.
        }

        for ev_path in &event.paths {
            let ev_path = match ev_path.canonicalize() {
                Ok(canonical) => canonical,
                // Only happens for removed resources; their category will be
                // picked up again on the next write.
                Err(_) => continue,
            };

            if ev_path
                .ancestors()
                .any(|path| self.cfg.ignored_paths.iter().any(|ignored| ignored == path))
            {
                continue;
            }
            if ev_path
                .components()
                .filter_map(|segment| segment.as_os_str().to_str())
                .any(|segment| BLACKLIST.contains(&segment))
            {
                continue;
            }

            let Ok(rel) = ev_path.strip_prefix(&self.cfg.build.working_directory) else {
                continue;
            };
            for (category, matcher) in &self.matchers {
                if matcher.is_match(rel) {
                    categories.insert(*category);
                }
            }
        }
        categories
    }
}

fn build_matchers(assets: &Configuration) -> Result<Vec<(Category, GlobSet)>> {
    Category::ALL
        .iter()
        .map(|category| {
            let mut builder = GlobSetBuilder::new();
            for pattern in category.spec(assets).src.patterns() {
                builder.add(
                    Glob::new(pattern)
                        .with_context(|| format!("invalid glob pattern {:?}", pattern))?,
                );
            }
            Ok((
                *category,
                builder
                    .build()
                    .with_context(|| format!("error compiling {category} glob matcher"))?,
            ))
        })
        .collect()
}

/// Build a FS watcher; when the watcher is dropped, it will stop watching for events.
fn build_watcher(watch_tx: mpsc::Sender<Event>, paths: Vec<PathBuf>) -> Result<RecommendedWatcher> {
    let event_handler = move |event_res: notify::Result<Event>| match event_res {
        Ok(event) => {
            let _res = watch_tx.try_send(event);
        }
        Err(err) => {
            tracing::error!(error = ?err, "error from FS watcher");
        }
    };
    let mut watcher =
        recommended_watcher(event_handler).context("failed to build file system watcher")?;

    for path in paths {
        if !path.exists() {
            tracing::warn!(path = ?path, "skipping watch on missing directory");
            continue;
        }
        watcher
            .watch(&path, RecursiveMode::Recursive)
            .with_context(|| format!("failed to watch {:?} for file system changes", path))?;
    }

    Ok(watcher)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::rt::WatchOptions;
    use notify::event::{CreateKind, ModifyKind};

    async fn setup() -> Result<(tempfile::TempDir, WatchSystem)> {
        let tmpdir = tempfile::tempdir().context("error building tempdir for test")?;
        let root = tmpdir.path().canonicalize()?;
        tokio::fs::create_dir_all(root.join("src/styles")).await?;
        tokio::fs::create_dir_all(root.join("dist")).await?;
        tokio::fs::write(root.join("src/styles/main.scss"), "body { margin: 0; }\n").await?;

        let cfg = RtcWatch::from_config(
            Configuration::default(),
            root,
            WatchOptions::default(),
        )?;
        let (shutdown_tx, _) = broadcast::channel(1);
        let system = WatchSystem::new(Arc::new(cfg), shutdown_tx, None).await?;
        Ok((tmpdir, system))
    }

    #[tokio::test]
    async fn change_to_style_source_maps_to_styles() -> Result<()> {
        let (tmpdir, system) = setup().await?;
        let path = tmpdir.path().canonicalize()?.join("src/styles/main.scss");

        let event = Event::new(EventKind::Modify(ModifyKind::Any)).add_path(path);
        let categories = system.categories_for(&event);
        assert_eq!(categories, BTreeSet::from([Category::Styles]));
        Ok(())
    }

    #[tokio::test]
    async fn change_below_output_root_is_ignored() -> Result<()> {
        let (tmpdir, system) = setup().await?;
        let root = tmpdir.path().canonicalize()?;
        tokio::fs::write(root.join("dist/out.css"), "x").await?;

        let event = Event::new(EventKind::Create(CreateKind::File))
            .add_path(root.join("dist/out.css"));
        let categories = system.categories_for(&event);
        assert!(categories.is_empty(), "output tree changes must not loop");
        Ok(())
    }
}
