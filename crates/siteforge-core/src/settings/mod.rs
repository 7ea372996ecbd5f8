//! Tool configuration for siteforge.toml
//!
//! Relative paths are resolved against `shared_root`.

pub mod parser;
pub mod store;

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

pub use parser::{parse_settings, parse_settings_str};
pub use store::SettingsStore;

pub const SHARED_ROOT_ENV: &str = "SITEFORGE_SHARED_ROOT";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Root of the shared runtime hosting tenant sites.
    pub shared_root: PathBuf,
    /// Tenant directories are named `<tenant_prefix>-<name>`.
    pub tenant_prefix: String,
    pub registry_file: PathBuf,
    /// Core schema dump shipped with the runtime.
    pub core_schema: PathBuf,
    pub profiles_dir: Option<PathBuf>,
    pub staging_dir: Option<PathBuf>,
    pub cache_dir: Option<PathBuf>,
    /// Path segment of the admin page on a freshly installed site.
    pub preinstall_path: String,
    /// Runtime archive URL; `{version}` is substituted.
    pub runtime_url: String,
    pub http_timeout_secs: u64,
    pub download_timeout_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            shared_root: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            tenant_prefix: "site".to_string(),
            registry_file: PathBuf::from("sites.json"),
            core_schema: PathBuf::from("wire/core/install.sql"),
            profiles_dir: None,
            staging_dir: None,
            cache_dir: None,
            preinstall_path: "processwire".to_string(),
            runtime_url:
                "https://github.com/processwire/processwire/archive/refs/tags/{version}.zip"
                    .to_string(),
            http_timeout_secs: 30,
            download_timeout_secs: 300,
        }
    }
}

impl Settings {
    pub fn with_shared_root(shared_root: impl Into<PathBuf>) -> Self {
        Self {
            shared_root: shared_root.into(),
            ..Self::default()
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.tenant_prefix.trim().is_empty() {
            anyhow::bail!("tenant_prefix must not be empty");
        }
        if !self.runtime_url.contains("{version}") {
            anyhow::bail!("runtime_url must contain a {{version}} placeholder");
        }
        if self.preinstall_path.contains('/') {
            anyhow::bail!("preinstall_path must be a single path segment");
        }
        Ok(())
    }

    fn under_root(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.shared_root.join(path)
        }
    }

    pub fn registry_path(&self) -> PathBuf {
        self.under_root(&self.registry_file)
    }

    pub fn core_schema_path(&self) -> PathBuf {
        self.under_root(&self.core_schema)
    }

    pub fn profiles_path(&self) -> PathBuf {
        match &self.profiles_dir {
            Some(dir) => self.under_root(dir),
            None => self.shared_root.join("profiles"),
        }
    }

    pub fn profile_archive(&self, profile: &str) -> PathBuf {
        self.profiles_path().join(format!("{profile}.zip"))
    }

    pub fn staging_path(&self) -> PathBuf {
        match &self.staging_dir {
            Some(dir) => self.under_root(dir),
            None => std::env::temp_dir(),
        }
    }

    pub fn cache_path(&self) -> PathBuf {
        match &self.cache_dir {
            Some(dir) => self.under_root(dir),
            None => dirs::cache_dir()
                .map(|p| p.join("siteforge"))
                .unwrap_or_else(|| self.shared_root.join(".siteforge-cache")),
        }
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    pub fn download_timeout(&self) -> Duration {
        Duration::from_secs(self.download_timeout_secs)
    }
}

/// Substitute `version` into a `runtime_url` template.
pub fn runtime_url(template: &str, version: &str) -> String {
    template.replace("{version}", version)
}
