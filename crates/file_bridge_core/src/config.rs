//! Bridge configuration and its TOML loader.

use std::fs;
use std::path::{Path, PathBuf};

use file_bridge_contract::{BridgeError, BridgeResult, LocalDestination};
use serde::{Deserialize, Serialize};

fn default_imports_dir_name() -> String {
    "imports".to_string()
}

/// Storage locations and limits for one bridge instance.
///
/// Loaded from TOML:
///
/// ```toml
/// cache_dir = "/var/app/cache"
/// documents_dir = "/var/app/documents"
/// grant_store = "/var/app/grants.json"
/// max_payload_bytes = 33554432
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeConfig {
    /// Evictable storage for local copies and imports.
    pub cache_dir: PathBuf,
    /// Durable storage for local copies.
    pub documents_dir: PathBuf,
    /// Subdirectory of `cache_dir` that receives import-mode picks.
    #[serde(default = "default_imports_dir_name")]
    pub imports_dir_name: String,
    /// JSON file that mirrors persisted grants. Persisted grants are session-only without it.
    #[serde(default)]
    pub grant_store: Option<PathBuf>,
    /// Largest decoded payload `read_content` will return in one response.
    #[serde(default)]
    pub max_payload_bytes: Option<u64>,
}

impl BridgeConfig {
    /// Lays out cache, documents, and the grant store beneath one application data root.
    pub fn under(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        Self {
            cache_dir: root.join("cache"),
            documents_dir: root.join("documents"),
            imports_dir_name: default_imports_dir_name(),
            grant_store: Some(root.join("grants.json")),
            max_payload_bytes: None,
        }
    }

    /// Loads and deserializes a TOML config file.
    ///
    /// # Errors
    ///
    /// Unreadable files and parse failures are `InvalidArgument` errors targeting `path`.
    pub fn load(path: impl AsRef<Path>) -> BridgeResult<Self> {
        let path = path.as_ref();
        let body = fs::read_to_string(path).map_err(|err| {
            BridgeError::invalid_argument(format!("failed to read {}: {err}", path.display()))
                .with_target(path.display().to_string())
        })?;
        Self::parse(&body).map_err(|err| err.with_target(path.display().to_string()))
    }

    /// Parses TOML config text.
    pub fn parse(body: &str) -> BridgeResult<Self> {
        let config: Self = toml::from_str(body).map_err(|err| {
            BridgeError::invalid_argument(format!("failed to parse bridge config: {err}"))
        })?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> BridgeResult<()> {
        if self.imports_dir_name.is_empty() || self.imports_dir_name.contains(['/', '\\']) {
            return Err(BridgeError::invalid_argument(format!(
                "imports_dir_name `{}` must be a single path component",
                self.imports_dir_name
            )));
        }
        if self.max_payload_bytes == Some(0) {
            return Err(BridgeError::invalid_argument(
                "max_payload_bytes must be greater than zero",
            ));
        }
        Ok(())
    }

    /// Directory backing a local-copy destination.
    pub fn dir_for(&self, destination: LocalDestination) -> &Path {
        match destination {
            LocalDestination::Cache => &self.cache_dir,
            LocalDestination::Documents => &self.documents_dir,
        }
    }

    /// Directory receiving import-mode picks.
    pub fn imports_dir(&self) -> PathBuf {
        self.cache_dir.join(&self.imports_dir_name)
    }
}
