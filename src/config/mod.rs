pub mod manifest;

use crate::utils::error::{HostError, Result};
use crate::utils::validation::{validate_path, Validate};
use std::net::{Ipv4Addr, SocketAddr, ToSocketAddrs};
use std::path::PathBuf;

/// Host 啟動所需的四個參數
#[derive(Debug, Clone)]
pub struct HostConfig {
    pub listen: SocketAddr,
    pub manifest_path: PathBuf,
    pub temp_dir: PathBuf,
    pub log_dir: PathBuf,
}

impl HostConfig {
    pub fn from_args(
        listen_addr: &str,
        manifest_path: &str,
        temp_dir: &str,
        log_dir: &str,
    ) -> Result<Self> {
        validate_path("manifest_path", manifest_path)?;
        validate_path("temp_dir", temp_dir)?;
        validate_path("log_dir", log_dir)?;

        Ok(Self {
            listen: parse_listen_addr(listen_addr)?,
            manifest_path: PathBuf::from(manifest_path),
            temp_dir: PathBuf::from(temp_dir),
            log_dir: PathBuf::from(log_dir),
        })
    }
}

impl Validate for HostConfig {
    fn validate(&self) -> Result<()> {
        if !self.manifest_path.is_file() {
            return Err(HostError::InvalidConfigValueError {
                field: "manifest_path".to_string(),
                value: self.manifest_path.display().to_string(),
                reason: "Manifest file does not exist".to_string(),
            });
        }
        Ok(())
    }
}

/// 解析 listen 位址；hostname 解出多個候選時優先 IPv4 loopback
pub fn parse_listen_addr(addr: &str) -> Result<SocketAddr> {
    let invalid = |reason: String| HostError::InvalidConfigValueError {
        field: "listen_addr".to_string(),
        value: addr.to_string(),
        reason,
    };

    let addrs: Vec<SocketAddr> = addr
        .to_socket_addrs()
        .map_err(|e| invalid(format!("Cannot resolve address: {}", e)))?
        .collect();

    if let Some(addr) = addrs
        .iter()
        .find(|a| a.is_ipv4() && a.ip() == Ipv4Addr::LOCALHOST)
    {
        return Ok(*addr);
    }

    addrs
        .into_iter()
        .next()
        .ok_or_else(|| invalid("Address resolved to nothing".to_string()))
}
