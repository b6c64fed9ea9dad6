//! Configuration loading

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

/// Main configuration structure (`gearview.toml`)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub catalog: CatalogConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Model generation backend, full URL or host:port
    #[serde(default = "default_backend_url")]
    pub url: String,
    /// Request timeout in seconds (generation can be slow)
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            url: default_backend_url(),
            timeout_secs: default_timeout(),
        }
    }
}

fn default_backend_url() -> String {
    gearview_core::DEFAULT_BACKEND.to_string()
}

fn default_timeout() -> u64 {
    120
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address for the static server
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Built viewer (index.html, pkg/)
    #[serde(default = "default_web_dir")]
    pub web_dir: PathBuf,
    /// Static GLB models, served under /models
    #[serde(default = "default_models_dir")]
    pub models_dir: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            web_dir: default_web_dir(),
            models_dir: default_models_dir(),
        }
    }
}

fn default_bind() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_web_dir() -> PathBuf {
    PathBuf::from("web")
}

fn default_models_dir() -> PathBuf {
    PathBuf::from("models")
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// Part catalog replacing the built-in one
    #[serde(default)]
    pub path: Option<PathBuf>,
}

/// Load configuration from file, using defaults if it doesn't exist
pub fn load_config(path: &Path) -> Result<Config> {
    if path.exists() {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        info!(path = %path.display(), "Loaded configuration");
        Ok(config)
    } else {
        info!(
            path = %path.display(),
            "Configuration file not found, using defaults"
        );
        Ok(Config::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_missing_file_uses_defaults() {
        let config = load_config(Path::new("/nonexistent/gearview.toml")).unwrap();
        assert_eq!(config.backend.url, "http://localhost:5000");
        assert_eq!(config.backend.timeout_secs, 120);
        assert_eq!(config.server.bind, "0.0.0.0:8080");
        assert_eq!(config.server.models_dir, PathBuf::from("models"));
        assert!(config.catalog.path.is_none());
    }

    #[test]
    fn test_partial_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[backend]
url = "gen.local:5000"

[catalog]
path = "parts.toml"
"#
        )
        .unwrap();

        let config = load_config(file.path()).unwrap();
        assert_eq!(config.backend.url, "gen.local:5000");
        assert_eq!(config.backend.timeout_secs, 120);
        assert_eq!(config.server.web_dir, PathBuf::from("web"));
        assert_eq!(config.catalog.path, Some(PathBuf::from("parts.toml")));
    }

    #[test]
    fn test_invalid_file_is_an_error() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[backend]\ntimeout_secs = \"soon\"").unwrap();
        assert!(load_config(file.path()).is_err());
    }
}
