//! Settings store for loading siteforge.toml.

use std::path::{Path, PathBuf};

use super::{SHARED_ROOT_ENV, Settings, parser};

#[derive(Debug, Clone)]
pub struct SettingsStore {
    path: PathBuf,
}

impl SettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store at `<config dir>/siteforge/siteforge.toml`.
    pub fn from_default_location() -> anyhow::Result<Self> {
        let dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?
            .join("siteforge");
        Ok(Self::new(dir.join("siteforge.toml")))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load settings; a missing file yields defaults.
    pub fn load(&self) -> anyhow::Result<Settings> {
        let mut settings = if self.path.exists() {
            parser::parse_settings(&self.path)?
        } else {
            tracing::debug!(
                "settings file {} not found, using defaults",
                self.path.display()
            );
            Settings::default()
        };

        if let Some(root) = std::env::var_os(SHARED_ROOT_ENV).filter(|v| !v.is_empty()) {
            settings.shared_root = PathBuf::from(root);
        }
        Ok(settings)
    }
}
