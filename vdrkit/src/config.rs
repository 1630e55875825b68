//! Configuration of the native engine.
mod file;

pub use self::file::FileStore;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::path::PathBuf;
use tracing::debug;
use vdrkit_ffi::Bridge;

/// Process-wide settings for the native engine.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Location of the shared library, or a directory containing it.
    pub library_path: Option<PathBuf>,
    /// Ledger protocol version, `1` or `2`.
    pub protocol_version: Option<i64>,
    /// Pool connection tuning.
    pub pool: Option<PoolConfig>,
    /// SOCKS5 proxy used for node connections, as `host:port`.
    pub socks_proxy: Option<String>,
}

/// Pool connection tuning. Unset values keep the engine defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolConfig {
    /// Seconds after which a state proof is considered stale.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub freshness_threshold: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ack_timeout: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_timeout: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conn_request_limit: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conn_active_timeout: Option<i64>,
    /// Number of nodes a read request is sent to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_read_nodes: Option<usize>,
}

impl Config {
    /// Loads the configuration from the provided loader.
    pub async fn load(loader: &impl Loader) -> Result<Self> {
        loader.load().await.map_err(Error::ConfigLoad)
    }
    /// Saves the configuration using the provided saver.
    pub async fn save(&self, saver: &impl Saver) -> Result<()> {
        saver.save(self).await.map_err(Error::ConfigSave)
    }
    /// Pushes the settings into the engine behind `bridge`.
    pub fn apply(&self, bridge: &Bridge) -> Result<()> {
        if let Some(pool) = &self.pool {
            bridge.set_config(pool)?;
        }
        if let Some(version) = self.protocol_version {
            bridge.set_protocol_version(version)?;
        }
        if let Some(proxy) = &self.socks_proxy {
            bridge.set_socks_proxy(proxy)?;
        }
        debug!(config = ?self, "engine configured");
        Ok(())
    }
    /// Loads the shared library from `library_path` and applies the settings.
    #[cfg_attr(docsrs, doc(cfg(feature = "dylib")))]
    #[cfg(feature = "dylib")]
    pub fn init_library(&self) -> Result<&'static Bridge> {
        let bridge = vdrkit_ffi::load(self.library_path.as_deref())?;
        self.apply(bridge)?;
        Ok(bridge)
    }
}

/// The trait for loading configuration data.
pub trait Loader {
    /// Loads the configuration data.
    fn load(
        &self,
    ) -> impl Future<
        Output = core::result::Result<Config, Box<dyn std::error::Error + Send + Sync + 'static>>,
    > + Send;
}

/// The trait for saving configuration data.
pub trait Saver {
    /// Saves the configuration data.
    fn save(
        &self,
        config: &Config,
    ) -> impl Future<
        Output = core::result::Result<(), Box<dyn std::error::Error + Send + Sync + 'static>>,
    > + Send;
}
