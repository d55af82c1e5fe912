use crate::core::router::{Router, WELL_KNOWN_PREFIX};
use crate::domain::model::App;
use crate::domain::ports::{IncomingRequest, RequestHandler};
use crate::utils::error::{HostError, Result};
use anyhow::Context as _;
use chrono::Utc;
use http::{Request, Response, StatusCode};
use http_body_util::BodyExt;
use hyper::body::{Bytes, Incoming};
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::Write as _;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast;

/// 回應 body 型別
pub type Body = http_body_util::combinators::BoxBody<Bytes, std::convert::Infallible>;

pub mod body {
    use super::Body;
    use http_body_util::{combinators::BoxBody, Empty, Full};
    use hyper::body::Bytes;

    pub fn full(bytes: Bytes) -> Body {
        BoxBody::new(Full::new(bytes))
    }

    pub fn empty() -> Body {
        BoxBody::new(Empty::new())
    }
}

struct ServerState {
    app_name: String,
    app_version: String,
    router: Router,
    handlers: HashMap<String, Arc<dyn RequestHandler>>,
    access_log: Option<Mutex<File>>,
}

/// 已綁定 socket 的 HTTP 伺服器
pub struct HttpServer {
    listener: TcpListener,
    local_addr: SocketAddr,
    shutdown_tx: broadcast::Sender<()>,
    state: Arc<ServerState>,
}

#[derive(Clone, Debug)]
pub struct ShutdownHandle {
    tx: broadcast::Sender<()>,
}

impl ShutdownHandle {
    pub fn shutdown(&self) {
        let _ = self.tx.send(());
    }
}

impl HttpServer {
    pub async fn bind(
        addr: SocketAddr,
        app: &App,
        handlers: HashMap<String, Arc<dyn RequestHandler>>,
        log_dir: Option<&Path>,
    ) -> Result<Self> {
        let router = Router::new(&app.routes)?;

        let listener = TcpListener::bind(addr).await.map_err(|e| HostError::ServerError {
            message: format!("Cannot bind {}: {}", addr, e),
        })?;
        let local_addr = listener.local_addr().map_err(HostError::IoError)?;

        let access_log = log_dir.and_then(open_access_log).map(Mutex::new);

        let (shutdown_tx, _) = broadcast::channel(1);

        Ok(Self {
            listener,
            local_addr,
            shutdown_tx,
            state: Arc::new(ServerState {
                app_name: app.name.clone(),
                app_version: app.version.clone(),
                router,
                handlers,
                access_log,
            }),
        })
    }

    /// 實際綁定的位址；listen port 設 0 時由 OS 決定
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle {
            tx: self.shutdown_tx.clone(),
        }
    }

    pub async fn serve(self) -> Result<()> {
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        tracing::info!(
            "🚀 {} v{} listening on http://{}",
            self.state.app_name,
            self.state.app_version,
            self.local_addr
        );

        loop {
            tokio::select! {
                accept_result = self.listener.accept() => {
                    match accept_result {
                        Ok((stream, peer)) => {
                            let state = Arc::clone(&self.state);
                            tokio::spawn(async move {
                                if let Err(e) = serve_connection(stream, state).await {
                                    tracing::debug!("Connection from {} failed: {:#}", peer, e);
                                }
                            });
                        }
                        Err(e) => {
                            tracing::error!("Accept error: {}", e);
                        }
                    }
                }
                _ = shutdown_rx.recv() => {
                    tracing::info!("Shutdown signal received");
                    break;
                }
            }
        }

        Ok(())
    }
}

async fn serve_connection(stream: TcpStream, state: Arc<ServerState>) -> anyhow::Result<()> {
    let io = TokioIo::new(stream);
    hyper::server::conn::http1::Builder::new()
        .serve_connection(
            io,
            service_fn(move |req| {
                let state = Arc::clone(&state);
                async move {
                    Ok::<_, std::convert::Infallible>(handle_request(state, req).await)
                }
            }),
        )
        .await
        .context("HTTP/1 connection failed")?;
    Ok(())
}

async fn handle_request(state: Arc<ServerState>, req: Request<Incoming>) -> Response<Body> {
    let started = Instant::now();
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    let (response, component) = dispatch(&state, req).await;

    log_access(
        &state,
        method.as_str(),
        &path,
        response.status(),
        started.elapsed(),
        component.as_deref(),
    );

    response
}

async fn dispatch(
    state: &ServerState,
    req: Request<Incoming>,
) -> (Response<Body>, Option<String>) {
    let path = req.uri().path().to_string();

    if path.starts_with(WELL_KNOWN_PREFIX) {
        return (well_known_response(state, &path), None);
    }

    let Some(matched) = state.router.route(&path) else {
        return (text_response(StatusCode::NOT_FOUND, "Not found\n"), None);
    };
    let component = matched.component.to_string();
    let trailer = matched.trailer;

    let Some(handler) = state.handlers.get(&component) else {
        tracing::error!("No handler registered for component '{}'", component);
        return (
            text_response(StatusCode::INTERNAL_SERVER_ERROR, "Internal error\n"),
            Some(component),
        );
    };
    let handler = Arc::clone(handler);

    let (parts, body) = req.into_parts();
    let body = match body.collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) => {
            tracing::warn!("Failed to read request body: {}", e);
            return (
                text_response(StatusCode::BAD_REQUEST, "Bad request\n"),
                Some(component),
            );
        }
    };

    let incoming = IncomingRequest {
        method: parts.method,
        path,
        query: parts.uri.query().map(str::to_string),
        trailer,
        headers: parts.headers,
        body,
    };

    match handler.handle(incoming).await {
        Ok(response) => (response.map(body::full), Some(component)),
        Err(e) => {
            tracing::error!("❌ Component '{}' failed: {}", component, e);
            let status = match e {
                HostError::UpstreamError(_) => StatusCode::BAD_GATEWAY,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            };
            let message = match status {
                StatusCode::BAD_GATEWAY => "Bad gateway\n",
                _ => "Internal error\n",
            };
            (text_response(status, message), Some(component))
        }
    }
}

fn well_known_response(state: &ServerState, path: &str) -> Response<Body> {
    match path.strip_prefix(WELL_KNOWN_PREFIX) {
        Some("health") => text_response(StatusCode::OK, "OK\n"),
        Some("info") => {
            let info = serde_json::json!({
                "name": state.app_name,
                "version": state.app_version,
            });
            Response::builder()
                .status(StatusCode::OK)
                .header(http::header::CONTENT_TYPE, "application/json")
                .body(body::full(Bytes::from(info.to_string())))
                .unwrap_or_else(|_| text_response(StatusCode::INTERNAL_SERVER_ERROR, "Internal error\n"))
        }
        _ => text_response(StatusCode::NOT_FOUND, "Not found\n"),
    }
}

fn text_response(status: StatusCode, message: &'static str) -> Response<Body> {
    let mut response = Response::new(body::full(Bytes::from_static(message.as_bytes())));
    *response.status_mut() = status;
    response.headers_mut().insert(
        http::header::CONTENT_TYPE,
        http::HeaderValue::from_static("text/plain"),
    );
    response
}

fn log_access(
    state: &ServerState,
    method: &str,
    path: &str,
    status: StatusCode,
    elapsed: Duration,
    component: Option<&str>,
) {
    let Some(access_log) = &state.access_log else {
        return;
    };

    let line = format!(
        "{} {} {} {} {}ms component={}\n",
        Utc::now().format("%Y-%m-%dT%H:%M:%S%.3fZ"),
        method,
        path,
        status.as_u16(),
        elapsed.as_millis(),
        component.unwrap_or("-"),
    );

    // access log 寫入失敗不影響回應
    if let Ok(mut file) = access_log.lock() {
        let _ = file.write_all(line.as_bytes());
    }
}

fn open_access_log(dir: &Path) -> Option<File> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(dir.join("access.log"))
        .ok()
}
