use super::{Config, Loader, Saver};
use anyhow::anyhow;
use std::path::{Path, PathBuf};
use tracing::debug;

type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Serialization chosen from the file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    Json,
    #[cfg(feature = "config-toml")]
    Toml,
}

impl Format {
    fn of(path: &Path) -> Result<Self, BoxError> {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Ok(Self::Json),
            #[cfg(feature = "config-toml")]
            Some("toml") => Ok(Self::Toml),
            Some(ext) => Err(anyhow!("Unsupported file format: .{ext}").into()),
            None => Err(anyhow!("Unsupported file format: no extension").into()),
        }
    }
    fn parse(self, text: &str) -> Result<Config, BoxError> {
        match self {
            Self::Json => Ok(serde_json::from_str(text)?),
            #[cfg(feature = "config-toml")]
            Self::Toml => Ok(toml::from_str(text)?),
        }
    }
    fn render(self, config: &Config) -> Result<String, BoxError> {
        match self {
            Self::Json => Ok(serde_json::to_string_pretty(config)? + "\n"),
            #[cfg(feature = "config-toml")]
            Self::Toml => Ok(toml::to_string_pretty(config)?),
        }
    }
}

/// An implementation of [`Loader`] and [`Saver`] backed by a configuration file.
///
/// The format follows the file extension: `.json`, or `.toml` with the `config-toml` feature.
/// Saving creates missing parent directories.
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self { path: path.as_ref().to_path_buf() }
    }
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Loader for FileStore {
    async fn load(&self) -> core::result::Result<Config, BoxError> {
        let format = Format::of(&self.path)?;
        format.parse(&std::fs::read_to_string(&self.path)?)
    }
}

impl Saver for FileStore {
    async fn save(&self, config: &Config) -> core::result::Result<(), BoxError> {
        let text = Format::of(&self.path)?.render(config)?;
        if let Some(dir) = self.path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            if !dir.exists() {
                debug!(dir = %dir.display(), "creating config directory");
                std::fs::create_dir_all(dir)?;
            }
        }
        Ok(std::fs::write(&self.path, text)?)
    }
}
