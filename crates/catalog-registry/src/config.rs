//! Registry server configuration, loaded from YAML.

use std::net::{IpAddr, Ipv4Addr};
use std::num::NonZeroU32;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};

use crate::rate_limit::DEFAULT_REQUESTS_PER_MINUTE;
use crate::storage::{FileStore, MemoryStore, ServiceStore};
use crate::transport::{TransportConfig, DEFAULT_PORT};

/// Top-level configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegistryConfig {
    #[serde(default)]
    pub server: ServerOptions,
    #[serde(default)]
    pub storage: StorageOptions,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerOptions {
    #[serde(default = "default_listen")]
    pub listen: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Serve on a Unix domain socket instead of TCP.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unix_socket: Option<PathBuf>,
    /// Requests per minute allowed from one client address; 0 disables.
    #[serde(default = "default_rate_limit")]
    pub rate_limit_per_minute: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageBackend {
    #[default]
    File,
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageOptions {
    #[serde(default)]
    pub backend: StorageBackend,
    #[serde(default = "default_storage_path")]
    pub path: PathBuf,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            port: default_port(),
            unix_socket: None,
            rate_limit_per_minute: default_rate_limit(),
        }
    }
}

impl Default for StorageOptions {
    fn default() -> Self {
        Self {
            backend: StorageBackend::default(),
            path: default_storage_path(),
        }
    }
}

impl RegistryConfig {
    /// Load configuration from a YAML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        Self::load_from_string(&content)
    }

    /// Load configuration from a YAML string
    pub fn load_from_string(content: &str) -> Result<Self> {
        let config: RegistryConfig =
            serde_yaml::from_str(content).context("Failed to parse YAML configuration")?;

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.server.unix_socket.is_none() && self.server.port == 0 {
            return Err(anyhow!("Port must be between 1 and 65535, got: {}", self.server.port));
        }

        #[cfg(not(unix))]
        if self.server.unix_socket.is_some() {
            return Err(anyhow!("Unix sockets are not supported on this platform"));
        }

        if self.storage.backend == StorageBackend::File && self.storage.path.as_os_str().is_empty() {
            return Err(anyhow!("File storage requires a non-empty path"));
        }

        match self.log_level.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
            _ => Err(anyhow!(
                "Invalid log level: {}, must be one of: trace, debug, info, warn, error",
                self.log_level
            )),
        }
    }

    pub fn transport(&self) -> TransportConfig {
        #[cfg(unix)]
        if let Some(path) = &self.server.unix_socket {
            return TransportConfig::unix_socket(path);
        }

        TransportConfig::tcp_on(self.server.listen, self.server.port)
    }

    /// Per-client quota, or `None` when rate limiting is off.
    pub fn rate_limit(&self) -> Option<NonZeroU32> {
        NonZeroU32::new(self.server.rate_limit_per_minute)
    }

    /// Opens the configured storage backend.
    pub fn build_store(&self) -> Result<Arc<dyn ServiceStore>> {
        Ok(match self.storage.backend {
            StorageBackend::Memory => Arc::new(MemoryStore::new()),
            StorageBackend::File => Arc::new(FileStore::open(&self.storage.path).with_context(
                || format!("Failed to open catalog at {}", self.storage.path.display()),
            )?),
        })
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_listen() -> IpAddr {
    IpAddr::V4(Ipv4Addr::UNSPECIFIED)
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_rate_limit() -> u32 {
    DEFAULT_REQUESTS_PER_MINUTE
}

fn default_storage_path() -> PathBuf {
    PathBuf::from("./service_db")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_empty_document_uses_defaults() {
        let config = RegistryConfig::load_from_string("{}").unwrap();
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.server.listen, default_listen());
        assert_eq!(config.storage.backend, StorageBackend::File);
        assert_eq!(config.storage.path, PathBuf::from("./service_db"));
        assert_eq!(config.log_level, "info");
        assert_eq!(config.transport(), TransportConfig::default());
        assert_eq!(config.rate_limit(), NonZeroU32::new(80));
    }

    #[test]
    fn test_full_document() {
        let yaml = r#"
server:
  listen: 127.0.0.1
  port: 9100
storage:
  backend: memory
log_level: debug
"#;
        let config = RegistryConfig::load_from_string(yaml).unwrap();
        assert_eq!(config.storage.backend, StorageBackend::Memory);
        assert_eq!(
            config.transport(),
            TransportConfig::tcp_on("127.0.0.1".parse().unwrap(), 9100)
        );
        assert_eq!(config.build_store().unwrap().describe(), "in-memory");
    }

    #[test]
    fn test_rate_limit_setting() {
        let config =
            RegistryConfig::load_from_string("server:\n  rate_limit_per_minute: 5\n").unwrap();
        assert_eq!(config.rate_limit(), NonZeroU32::new(5));

        let config =
            RegistryConfig::load_from_string("server:\n  rate_limit_per_minute: 0\n").unwrap();
        assert_eq!(config.rate_limit(), None);
    }

    #[test]
    fn test_rejects_bad_values() {
        let err = RegistryConfig::load_from_string("server:\n  port: 0\n").unwrap_err();
        assert!(err.to_string().contains("Port must be between"));

        let err = RegistryConfig::load_from_string("log_level: loud\n").unwrap_err();
        assert!(err.to_string().contains("Invalid log level"));

        let err = RegistryConfig::load_from_string("storage:\n  path: \"\"\n").unwrap_err();
        assert!(err.to_string().contains("non-empty path"));

        let err = RegistryConfig::load_from_string("storage:\n  backend: mongo\n").unwrap_err();
        assert!(err.to_string().contains("Failed to parse"));
    }

    #[test]
    #[cfg(unix)]
    fn test_unix_socket_replaces_tcp() {
        let config =
            RegistryConfig::load_from_string("server:\n  unix_socket: /tmp/catalog.sock\n").unwrap();
        assert_eq!(
            config.transport(),
            TransportConfig::unix_socket("/tmp/catalog.sock")
        );
    }

    #[test]
    fn test_load_from_file_and_open_file_store() {
        let dir = tempdir().unwrap();
        let db = dir.path().join("db");
        let config_path = dir.path().join("registry.yaml");
        std::fs::write(
            &config_path,
            format!("storage:\n  backend: file\n  path: {}\n", db.display()),
        )
        .unwrap();

        let config = RegistryConfig::load_from_file(&config_path).unwrap();
        let store = config.build_store().unwrap();
        assert!(store.describe().starts_with("file"));
        assert!(db.is_dir());
    }

    #[test]
    fn test_missing_file_has_context() {
        let err = RegistryConfig::load_from_file("/nonexistent/registry.yaml").unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }
}
