//! Site specification: the validated input to one provisioning run.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::PipelineError;

const DEFAULT_DIR_MODE: u32 = 0o755;
const DEFAULT_FILE_MODE: u32 = 0o644;

/// Whether the site owns its runtime or shares one with sibling tenants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Topology {
    Standalone,
    MultiTenant,
}

impl Topology {
    pub fn as_str(self) -> &'static str {
        match self {
            Topology::Standalone => "standalone",
            Topology::MultiTenant => "multi-tenant",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseCredentials {
    #[serde(default = "default_db_host")]
    pub host: String,
    #[serde(default = "default_db_port")]
    pub port: u16,
    pub name: String,
    pub user: String,
    #[serde(default)]
    pub password: String,
    #[serde(default = "default_charset")]
    pub charset: String,
    #[serde(default = "default_engine")]
    pub engine: String,
}

fn default_db_host() -> String {
    "localhost".to_string()
}

fn default_db_port() -> u16 {
    3306
}

fn default_charset() -> String {
    "utf8".to_string()
}

fn default_engine() -> String {
    "MyISAM".to_string()
}

/// Directory and file modes as 3-digit octal strings, e.g. `"755"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionSet {
    #[serde(default = "default_dir_perm")]
    pub dir: String,
    #[serde(default = "default_file_perm")]
    pub file: String,
}

fn default_dir_perm() -> String {
    "755".to_string()
}

fn default_file_perm() -> String {
    "644".to_string()
}

impl Default for PermissionSet {
    fn default() -> Self {
        Self {
            dir: default_dir_perm(),
            file: default_file_perm(),
        }
    }
}

impl PermissionSet {
    pub fn dir_mode(&self) -> u32 {
        parse_mode(&self.dir).unwrap_or(DEFAULT_DIR_MODE)
    }

    pub fn file_mode(&self) -> u32 {
        parse_mode(&self.file).unwrap_or(DEFAULT_FILE_MODE)
    }
}

fn parse_mode(value: &str) -> Option<u32> {
    if !is_octal_mode(value) {
        return None;
    }
    u32::from_str_radix(value, 8).ok()
}

fn is_octal_mode(value: &str) -> bool {
    value.len() == 3 && value.bytes().all(|b| (b'0'..=b'7').contains(&b))
}

/// Superuser account and admin appearance for the new site.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminAccount {
    pub name: String,
    pub password: String,
    pub email: String,
    /// Page name of the admin login URL.
    #[serde(default = "default_admin_login")]
    pub admin_login: String,
    #[serde(default = "default_admin_theme")]
    pub admin_theme: String,
    #[serde(default = "default_colour_theme")]
    pub colour_theme: String,
}

fn default_admin_login() -> String {
    "processwire".to_string()
}

fn default_admin_theme() -> String {
    "AdminThemeUikit".to_string()
}

fn default_colour_theme() -> String {
    "default".to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteSpecification {
    pub topology: Topology,
    pub title: String,
    #[serde(default)]
    pub description: String,
    /// Install path for standalone sites, short tenant name otherwise.
    pub target: String,
    pub host: String,
    #[serde(default)]
    pub http_hosts: Vec<String>,
    pub profile: String,
    pub admin: AdminAccount,
    #[serde(default = "default_timezone")]
    pub timezone: String,
    pub database: DatabaseCredentials,
    #[serde(default)]
    pub permissions: PermissionSet,
    #[serde(default)]
    pub runtime_version: Option<String>,
}

fn default_timezone() -> String {
    "UTC".to_string()
}

impl SiteSpecification {
    pub fn from_toml_str(content: &str) -> anyhow::Result<Self> {
        let spec: SiteSpecification = toml::from_str(content)?;
        Ok(spec)
    }

    pub fn from_path(path: &Path) -> anyhow::Result<Self> {
        use anyhow::Context;

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read site file: {}", path.display()))?;
        Self::from_toml_str(&content)
            .with_context(|| format!("Failed to parse site file: {}", path.display()))
    }

    /// Check that every field the topology needs is present.
    ///
    /// Callers run this before handing the specification to the pipeline,
    /// which performs no field-level validation of its own.
    pub fn validate(&self) -> Result<(), PipelineError> {
        let mut missing = Vec::new();
        let required = [
            ("title", &self.title),
            ("target", &self.target),
            ("host", &self.host),
            ("profile", &self.profile),
            ("timezone", &self.timezone),
            ("admin.name", &self.admin.name),
            ("admin.password", &self.admin.password),
            ("admin.email", &self.admin.email),
            ("admin.admin_login", &self.admin.admin_login),
            ("admin.admin_theme", &self.admin.admin_theme),
            ("database.host", &self.database.host),
            ("database.name", &self.database.name),
            ("database.user", &self.database.user),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                missing.push(field);
            }
        }
        if self.topology == Topology::Standalone
            && self
                .runtime_version
                .as_deref()
                .is_none_or(|v| v.trim().is_empty())
        {
            missing.push("runtime_version");
        }
        if !missing.is_empty() {
            return Err(PipelineError::Validation(format!(
                "Missing required fields for {} site: {}",
                self.topology.as_str(),
                missing.join(", ")
            )));
        }

        for (field, value) in [
            ("permissions.dir", &self.permissions.dir),
            ("permissions.file", &self.permissions.file),
        ] {
            if !is_octal_mode(value) {
                return Err(PipelineError::Validation(format!(
                    "{field} must be a 3-digit octal mode, got '{value}'"
                )));
            }
        }
        Ok(())
    }
}
