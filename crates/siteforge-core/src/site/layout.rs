//! Path conventions inside a site tree and for final site locations.

use std::path::{Path, PathBuf};

use super::{SiteSpecification, Topology};

pub const ASSETS_DIR: &str = "assets";
pub const MODULES_DIR: &str = "modules";
pub const INSTALL_DIR: &str = "install";
pub const CONFIG_FILE: &str = "config.php";
pub const ADMIN_TEMPLATE: &str = "templates/admin.php";
pub const INSTALLED_MARKER: &str = "assets/installed.php";

/// Asset subdirectories created for every new site.
pub const RUNTIME_ASSET_DIRS: [&str; 3] = ["cache", "logs", "sessions"];

/// Directory name for a tenant under the shared root, e.g. `site-blog`.
pub fn tenant_dir_name(prefix: &str, name: &str) -> String {
    format!("{prefix}-{name}")
}

/// Typed view over a site tree rooted at `root`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteTree {
    root: PathBuf,
}

impl SiteTree {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn assets(&self) -> PathBuf {
        self.root.join(ASSETS_DIR)
    }

    pub fn modules(&self) -> PathBuf {
        self.root.join(MODULES_DIR)
    }

    pub fn install(&self) -> PathBuf {
        self.root.join(INSTALL_DIR)
    }

    pub fn install_sql(&self) -> PathBuf {
        self.install().join("install.sql")
    }

    pub fn install_files(&self) -> PathBuf {
        self.install().join("files")
    }

    pub fn config_file(&self) -> PathBuf {
        self.root.join(CONFIG_FILE)
    }

    pub fn admin_template(&self) -> PathBuf {
        self.root.join(ADMIN_TEMPLATE)
    }

    pub fn installed_marker(&self) -> PathBuf {
        self.root.join(INSTALLED_MARKER)
    }
}

/// Where a site ends up once relocated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Destination {
    /// Final site tree location.
    pub site_dir: PathBuf,
    /// Standalone install root receiving the runtime files.
    pub install_root: Option<PathBuf>,
    /// Registry value for tenant sites.
    pub tenant_dir: Option<String>,
}

impl Destination {
    pub fn resolve(spec: &SiteSpecification, shared_root: &Path, tenant_prefix: &str) -> Self {
        match spec.topology {
            Topology::MultiTenant => {
                let dir = tenant_dir_name(tenant_prefix, &spec.target);
                Self {
                    site_dir: shared_root.join(&dir),
                    install_root: None,
                    tenant_dir: Some(dir),
                }
            }
            Topology::Standalone => {
                let root = PathBuf::from(&spec.target);
                Self {
                    site_dir: root.join("site"),
                    install_root: Some(root),
                    tenant_dir: None,
                }
            }
        }
    }
}
