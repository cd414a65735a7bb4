//! Development server
//!
//! Serves the build output over HTTP, injects the live-reload client into
//! HTML responses and pushes reload messages over a WebSocket.

pub mod reload;

pub use reload::*;

use crate::config::ServerSettings;
use crate::runner::Runner;
use crate::watch::WatchService;
use anyhow::Context as _;
use axum::body::Body;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Request, State};
use axum::http::{header, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tower_http::services::ServeDir;

/// Where the client script is served
pub const CLIENT_PATH: &str = "/__livereload.js";

/// WebSocket endpoint carrying reload messages
pub const SOCKET_PATH: &str = "/__livereload";

#[derive(Clone)]
struct ServerState {
    hub: ReloadHub,
    shutdown: watch::Receiver<bool>,
}

/// Build the router: reload endpoints plus static files from `build_dir`
pub fn build_router(build_dir: PathBuf, hub: ReloadHub, shutdown: watch::Receiver<bool>) -> Router {
    Router::new()
        .route(SOCKET_PATH, get(socket_handler))
        .route(CLIENT_PATH, get(client_script))
        .fallback_service(ServeDir::new(build_dir))
        .layer(middleware::from_fn(inject_livereload))
        .with_state(ServerState { hub, shutdown })
}

/// Insert the client script tag before `</body>`, or append it when the
/// document has no body close tag
pub fn inject_client(html: &str) -> String {
    let tag = format!(r#"<script src="{}"></script>"#, CLIENT_PATH);
    match html.rfind("</body>") {
        Some(pos) => format!("{}{}{}", &html[..pos], tag, &html[pos..]),
        None => format!("{}{}", html, tag),
    }
}

async fn inject_livereload(request: Request, next: Next) -> Response {
    let response = next.run(request).await;

    let is_html = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.starts_with("text/html"))
        .unwrap_or(false);
    if !is_html || !response.status().is_success() {
        return response;
    }

    let (mut parts, body) = response.into_parts();
    let bytes = match axum::body::to_bytes(body, usize::MAX).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!(error = %e, "could not buffer HTML response");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    let html = inject_client(&String::from_utf8_lossy(&bytes));
    parts.headers.remove(header::CONTENT_LENGTH);
    Response::from_parts(parts, Body::from(html))
}

async fn client_script() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "application/javascript")],
        CLIENT_SCRIPT,
    )
}

async fn socket_handler(ws: WebSocketUpgrade, State(state): State<ServerState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| forward_reloads(socket, state))
}

async fn forward_reloads(mut socket: WebSocket, state: ServerState) {
    let mut rx = state.hub.subscribe();
    let mut shutdown = state.shutdown;
    tracing::debug!("live-reload client connected");

    loop {
        tokio::select! {
            message = rx.recv() => {
                let message = match message {
                    Ok(message) => message,
                    // Missed messages; a full reload catches the page up
                    Err(broadcast::error::RecvError::Lagged(_)) => ReloadMessage::Reload,
                    Err(broadcast::error::RecvError::Closed) => break,
                };
                let Ok(text) = serde_json::to_string(&message) else {
                    continue;
                };
                if socket.send(Message::Text(text.into())).await.is_err() {
                    break;
                }
            }
            incoming = socket.recv() => match incoming {
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                Some(Ok(_)) => {}
            },
            _ = shutdown.changed() => {
                let _ = socket.send(Message::Close(None)).await;
                break;
            }
        }
    }

    tracing::debug!("live-reload client disconnected");
}

/// A running dev server
pub struct DevServer {
    addr: SocketAddr,
    shutdown: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl DevServer {
    /// Bind and start serving `build_dir` in the background
    pub async fn start(
        settings: &ServerSettings,
        build_dir: PathBuf,
        hub: ReloadHub,
    ) -> anyhow::Result<Self> {
        let listener = TcpListener::bind((settings.host.as_str(), settings.port))
            .await
            .with_context(|| format!("binding {}:{}", settings.host, settings.port))?;
        let addr = listener.local_addr()?;

        let (shutdown, shutdown_rx) = watch::channel(false);
        let router = build_router(build_dir, hub, shutdown_rx.clone());

        let handle = tokio::spawn(async move {
            let mut signal = shutdown_rx;
            let graceful = async move {
                let _ = signal.changed().await;
            };
            if let Err(e) = axum::serve(listener, router)
                .with_graceful_shutdown(graceful)
                .await
            {
                tracing::error!(error = %e, "dev server stopped");
            }
        });

        tracing::info!(%addr, "dev server listening");
        Ok(DevServer {
            addr,
            shutdown,
            handle,
        })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Stop accepting connections and close live-reload sockets
    pub async fn stop(self) {
        let _ = self.shutdown.send(true);
        if let Err(e) = self.handle.await {
            tracing::warn!(error = %e, "dev server task failed");
        }
    }
}

/// Serve the build, watch sources, and block until Ctrl-C
pub async fn serve_until_shutdown(runner: &Runner) -> anyhow::Result<()> {
    let ctx = runner.context();
    let settings = &ctx.config.server;

    let server = DevServer::start(settings, ctx.build_dir(), ctx.reload.clone()).await?;
    let watcher = WatchService::start(
        ctx.root.clone(),
        &ctx.config.watch,
        runner.clone(),
        Duration::from_millis(settings.debounce_ms),
    )?;

    println!("Serving {} at http://{}", ctx.config.paths.build, server.addr());

    let waited = tokio::signal::ctrl_c().await.context("waiting for Ctrl-C");

    watcher.stop().await;
    server.stop().await;
    waited
}
