//! Dev server: static files from the html destination, plus the autoreload
//! WebSocket.

use crate::common::SERVER;
use crate::config::rt::RtcServe;
use crate::watch::WatchSystem;
use crate::ws;
use anyhow::Result;
use axum::extract::ws::WebSocketUpgrade;
use axum::extract::State as AxumState;
use axum::response::IntoResponse;
use axum::routing::{get, get_service, Router};
use axum_server::Handle;
use http::header::CONTENT_TYPE;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;

const INDEX_HTML: &str = "index.html";

/// A system encapsulating a build & watch system, responsible for serving
/// generated content.
pub struct ServeSystem {
    cfg: Arc<RtcServe>,
    watch: WatchSystem,
    http_addr: String,
    shutdown_tx: broadcast::Sender<()>,
    //  N.B. qualifying pipeline completions are pushed on this channel; the
    //  websocket handlers fan the state out to connected browsers.
    ws_state: watch::Sender<ws::BuildState>,
}

impl ServeSystem {
    /// Construct a new instance.
    pub async fn new(cfg: Arc<RtcServe>, shutdown: broadcast::Sender<()>) -> Result<Self> {
        let (ws_state, _) = watch::channel(ws::BuildState::Ok);
        let watch = WatchSystem::new(
            cfg.watch.clone(),
            shutdown.clone(),
            Some(ws_state.clone()),
        )
        .await?;
        let http_addr = format!("http://{}:{}/", cfg.address, cfg.port);
        Ok(Self {
            cfg,
            watch,
            http_addr,
            shutdown_tx: shutdown,
            ws_state,
        })
    }

    /// Run the serve system.
    #[tracing::instrument(level = "trace", skip(self))]
    pub async fn run(mut self) -> Result<()> {
        self.watch.prime().await?;
        let watch_handle = tokio::spawn(self.watch.run());
        let server_handle = Self::spawn_server(
            self.cfg.clone(),
            self.shutdown_tx.subscribe(),
            self.ws_state.subscribe(),
        )?;

        if self.cfg.open {
            if let Err(err) = open::that(&self.http_addr) {
                tracing::error!(error = ?err, "error opening browser");
            }
        }
        drop(self.shutdown_tx); // Drop the broadcast channel to ensure it does not keep the system alive.
        if let Err(err) = watch_handle.await {
            tracing::error!(error = ?err, "error joining watch system handle");
        }
        if let Err(err) = server_handle.await {
            tracing::error!(error = ?err, "error joining server handle");
        }
        Ok(())
    }

    #[tracing::instrument(level = "trace", skip(cfg, shutdown_rx, ws_state))]
    fn spawn_server(
        cfg: Arc<RtcServe>,
        mut shutdown_rx: broadcast::Receiver<()>,
        ws_state: watch::Receiver<ws::BuildState>,
    ) -> Result<JoinHandle<()>> {
        let state = Arc::new(State {
            dist_dir: cfg.watch.build.html_dist(),
            ws_state,
        });
        let router = router(state);
        let addr = SocketAddr::new(cfg.address, cfg.port);

        // Build a shutdown signal for the server.
        let shutdown_handle = Handle::new();
        {
            let handle = shutdown_handle.clone();
            tokio::spawn(async move {
                // Any event on this channel, even a drop, should trigger shutdown.
                let _res = shutdown_rx.recv().await;
                tracing::debug!("server is shutting down");
                handle.graceful_shutdown(Some(Duration::from_secs(0)));
            });
        }

        tracing::info!("{}server listening at http://{}", SERVER, addr);
        Ok(tokio::spawn(async move {
            if let Err(err) = axum_server::bind(addr)
                .handle(shutdown_handle)
                .serve(router.into_make_service())
                .await
            {
                tracing::error!(error = ?err, "error from server task");
            }
        }))
    }
}

/// Server state.
pub struct State {
    /// The directory being served.
    pub dist_dir: PathBuf,
    /// Receiver for build status updates pushed to autoreload clients.
    pub ws_state: watch::Receiver<ws::BuildState>,
}

/// Build the router: the static file server rooted at the html destination,
/// and the autoreload WebSocket & client script.
fn router(state: Arc<State>) -> Router {
    let serve_dir = ServeDir::new(&state.dist_dir)
        .fallback(ServeFile::new(state.dist_dir.join(INDEX_HTML)));
    Router::new()
        .route(
            "/_gantry/ws",
            get(
                |ws: WebSocketUpgrade, AxumState(state): AxumState<Arc<State>>| async move {
                    ws.on_upgrade(move |socket| ws::handle_ws(socket, state))
                },
            ),
        )
        .route("/_gantry/autoreload.js", get(autoreload_client))
        .fallback_service(get_service(serve_dir))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn autoreload_client() -> impl IntoResponse {
    ([(CONTENT_TYPE, "application/javascript")], ws::AUTORELOAD_JS)
}
