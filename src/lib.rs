pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

pub use config::manifest::AppManifest;
pub use config::HostConfig;
pub use core::engine::{HostEngine, RunningHost};
pub use utils::error::{HostError, Result};

use crate::utils::logger;

/// 用四個參數把應用跑起來，回傳 process 結束碼。
///
/// 伺服器跑到收到 shutdown（ctrl-c）為止；任何失敗都會變成
/// 記錄過的錯誤加上非零結束碼，不會 panic。
pub fn run(listen_addr: &str, manifest_path: &str, temp_dir: &str, log_dir: &str) -> i32 {
    let config = match HostConfig::from_args(listen_addr, manifest_path, temp_dir, log_dir) {
        Ok(config) => config,
        Err(e) => {
            logger::init_host_logger(None);
            report_error(&e);
            return e.exit_status();
        }
    };

    // log 目錄要先就位，host.log 才開得起來
    if let Err(e) = std::fs::create_dir_all(&config.log_dir) {
        logger::init_host_logger(None);
        let e = HostError::IoError(e);
        report_error(&e);
        return e.exit_status();
    }
    logger::init_host_logger(Some(&config.log_dir));

    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(e) => {
            let e = HostError::IoError(e);
            report_error(&e);
            return e.exit_status();
        }
    };

    match runtime.block_on(HostEngine::new(config).run()) {
        Ok(()) => {
            tracing::info!("✅ Host stopped cleanly");
            0
        }
        Err(e) => {
            report_error(&e);
            e.exit_status()
        }
    }
}

fn report_error(e: &HostError) {
    tracing::error!(
        "❌ Host failed: {} (Category: {:?}, Severity: {:?})",
        e,
        e.category(),
        e.severity()
    );
    tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

    eprintln!("❌ {}", e.user_friendly_message());
    eprintln!("💡 {}", e.recovery_suggestion());
}
