//! Hostname to tenant-directory mapping read by the shared front controller.

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::Context;
use indexmap::IndexMap;

/// Hostname → tenant directory, in file order.
pub type TenantMap = IndexMap<String, String>;

pub trait TenantRegistryStore {
    fn load(&self) -> anyhow::Result<TenantMap>;

    /// Map `host` to `dir`, replacing any previous mapping for the host.
    fn add(&self, host: &str, dir: &str) -> anyhow::Result<()>;

    /// Drop every host mapped to `dir`. Returns the removed hostnames.
    fn remove(&self, dir: &str) -> anyhow::Result<Vec<String>>;
}

/// Registry persisted as one JSON object.
#[derive(Debug, Clone)]
pub struct JsonTenantRegistry {
    path: PathBuf,
}

impl JsonTenantRegistry {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn save(&self, map: &TenantMap) -> anyhow::Result<()> {
        let parent = self
            .path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create registry directory: {}", parent.display()))?;

        let bytes = serde_json::to_vec_pretty(map).context("Failed to serialize tenant registry")?;

        // Write beside the target and rename into place
        let mut tmp = tempfile::NamedTempFile::new_in(parent).with_context(|| {
            format!("Failed to create temp file in {}", parent.display())
        })?;
        tmp.write_all(&bytes)
            .and_then(|_| tmp.write_all(b"\n"))
            .with_context(|| format!("Failed to write tenant registry: {}", self.path.display()))?;
        tmp.persist(&self.path).map_err(|e| {
            anyhow::Error::new(e.error)
                .context(format!("Failed to write tenant registry: {}", self.path.display()))
        })?;
        Ok(())
    }
}

impl TenantRegistryStore for JsonTenantRegistry {
    fn load(&self) -> anyhow::Result<TenantMap> {
        if !self.path.exists() {
            return Ok(TenantMap::new());
        }
        let bytes = std::fs::read(&self.path)
            .with_context(|| format!("Failed to read tenant registry: {}", self.path.display()))?;
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(TenantMap::new());
        }
        serde_json::from_slice(&bytes).with_context(|| {
            format!(
                "Expected a JSON object of hostname to directory strings: {}",
                self.path.display()
            )
        })
    }

    fn add(&self, host: &str, dir: &str) -> anyhow::Result<()> {
        let mut map = self.load()?;
        if let Some(previous) = map.insert(host.to_string(), dir.to_string())
            && previous != dir
        {
            tracing::warn!(
                "tenant registry: host {} moved from {} to {}",
                host,
                previous,
                dir
            );
        }
        self.save(&map)
    }

    fn remove(&self, dir: &str) -> anyhow::Result<Vec<String>> {
        let mut map = self.load()?;
        let removed: Vec<String> = map
            .iter()
            .filter(|(_, value)| value.as_str() == dir)
            .map(|(host, _)| host.clone())
            .collect();
        if removed.is_empty() {
            return Ok(removed);
        }
        map.retain(|_, value| value.as_str() != dir);
        self.save(&map)?;
        Ok(removed)
    }
}
