use crate::app::handlers::build_handlers;
use crate::config::manifest::AppManifest;
use crate::config::HostConfig;
use crate::core::server::{HttpServer, ShutdownHandle};
use crate::utils::error::{HostError, Result};
use crate::utils::validation::Validate;
use std::net::SocketAddr;
use std::path::Path;
use tokio::task::JoinHandle;

const LOCK_FILE_NAME: &str = "app.lock";

/// 將四個啟動參數變成一個跑起來的應用
pub struct HostEngine {
    config: HostConfig,
}

impl HostEngine {
    pub fn new(config: HostConfig) -> Self {
        Self { config }
    }

    /// 啟動伺服器，回傳可觀察、可停止的 handle
    pub async fn start(self) -> Result<RunningHost> {
        let config = self.config;
        config.validate()?;

        std::fs::create_dir_all(&config.temp_dir)?;
        std::fs::create_dir_all(&config.log_dir)?;

        let manifest = AppManifest::from_file(&config.manifest_path)?;
        let manifest_dir = config
            .manifest_path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or(Path::new("."));
        let app = crate::core::app::resolve(&manifest, manifest_dir)?;

        let lock_path = config.temp_dir.join(LOCK_FILE_NAME);
        std::fs::write(&lock_path, crate::core::app::lock(&app).to_json()?)?;
        tracing::debug!("Lock file written to {}", lock_path.display());

        let handlers = build_handlers(&app)?;
        let server = HttpServer::bind(config.listen, &app, handlers, Some(&config.log_dir)).await?;
        let addr = server.local_addr();
        let shutdown = server.shutdown_handle();

        tracing::info!("📦 Application '{}' with {} route(s):", app.name, app.routes.len());
        for route in &app.routes {
            tracing::info!("    {} -> {}", route.route, route.component);
        }

        // ctrl-c 轉成 graceful shutdown
        let signal_handle = shutdown.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("Ctrl-C received, shutting down");
                signal_handle.shutdown();
            }
        });

        let task = tokio::spawn(server.serve());

        Ok(RunningHost {
            addr,
            shutdown,
            task,
        })
    }

    /// 啟動並等待伺服器結束
    pub async fn run(self) -> Result<()> {
        self.start().await?.wait().await
    }
}

/// 啟動後的控制 handle
#[derive(Debug)]
pub struct RunningHost {
    addr: SocketAddr,
    shutdown: ShutdownHandle,
    task: JoinHandle<Result<()>>,
}

impl RunningHost {
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        self.shutdown.clone()
    }

    pub async fn wait(self) -> Result<()> {
        match self.task.await {
            Ok(result) => result,
            Err(e) => Err(HostError::ServerError {
                message: format!("Server task failed: {}", e),
            }),
        }
    }

    /// 觸發 graceful shutdown 並等待結束
    pub async fn stop(self) -> Result<()> {
        self.shutdown.shutdown();
        self.wait().await
    }
}
