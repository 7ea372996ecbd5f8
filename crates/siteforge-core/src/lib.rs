//! Siteforge Core Library
//!
//! Provides the installation pipeline that provisions CMS sites from
//! profile archives, either standalone or as tenants of a shared root.

pub mod archive;
pub mod db;
pub mod error;
pub mod fs;
pub mod http;
pub mod install;
pub mod notice;
pub mod registry;
pub mod settings;
pub mod site;

/// Re-exports of commonly used types
pub mod prelude {
    // Errors and notices
    pub use crate::error::{ErrorKind, PipelineError};
    pub use crate::notice::{CallbackProtocol, NoticeLog, Outcomes};

    // Site description
    pub use crate::site::{
        AdminAccount, DatabaseCredentials, PermissionSet, SiteSpecification, Topology,
    };

    // Pipeline
    pub use crate::install::{InstallOptions, InstallPipeline, InstallReport, InstalledSite, Services};

    // Collaborators
    pub use crate::archive::{Archiver, ZipArchiver};
    pub use crate::db::{DatabaseAdmin, DatabaseHandle, MySqlAdmin};
    pub use crate::http::{HttpClient, ReqwestClient};
    pub use crate::registry::{JsonTenantRegistry, TenantRegistryStore};

    // Configuration
    pub use crate::settings::{Settings, SettingsStore};
}
