//! kubelite.toml configuration parser.

use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KubeliteConfig {
    pub server: ServerConfig,
    pub store: StoreConfig,
    pub dispatcher: DispatcherConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub address: IpAddr,
    pub port: u16,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Root directory; one sub-directory per resource kind is created below it.
    pub data_dir: PathBuf,
    /// Remove data files for keys dropped by an update.
    pub prune_stale_keys: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatcherConfig {
    /// Maximum number of pending mutation operations.
    pub queue_capacity: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: 6443,
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("/var/lib/kubelite"),
            prune_stale_keys: false,
        }
    }
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self { queue_capacity: 1024 }
    }
}

impl ServerConfig {
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.address, self.port)
    }
}

impl StoreConfig {
    pub fn configmap_dir(&self) -> PathBuf {
        self.data_dir.join("configmaps")
    }

    pub fn secret_dir(&self) -> PathBuf {
        self.data_dir.join("secrets")
    }

    pub fn namespace_dir(&self) -> PathBuf {
        self.data_dir.join("namespaces")
    }
}

impl KubeliteConfig {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: KubeliteConfig = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> anyhow::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}
