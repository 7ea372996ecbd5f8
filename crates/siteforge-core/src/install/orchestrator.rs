//! Drives the installation steps in order, stopping at the first failure.

use std::path::PathBuf;

use serde::Serialize;

use crate::archive::{Archiver, ZipArchiver};
use crate::db::{DatabaseAdmin, MySqlAdmin};
use crate::error::{PipelineError, describe};
use crate::http::{HttpClient, ReqwestClient};
use crate::install::admin::{AdminCallback, provision_admin};
use crate::install::database::provision_database;
use crate::install::expand::expand_profile;
use crate::install::import::{SchemaImport, import_assets, import_schema};
use crate::install::prereq::check_prerequisites;
use crate::install::relocate::relocate_site;
use crate::install::runtime::{CachedRuntimeSource, RuntimeSource, place_runtime};
use crate::install::site_config::write_site_config;
use crate::notice::NoticeLog;
use crate::registry::{JsonTenantRegistry, TenantRegistryStore};
use crate::settings::Settings;
use crate::site::{Destination, SiteSpecification, SiteTree, Topology};

/// External collaborators used by the pipeline.
pub struct Services {
    pub archiver: Box<dyn Archiver>,
    pub database: Box<dyn DatabaseAdmin>,
    pub http: Box<dyn HttpClient>,
    pub registry: Box<dyn TenantRegistryStore>,
    pub runtime: Box<dyn RuntimeSource>,
}

impl Services {
    /// Zip archives, MySQL, reqwest and the JSON registry under the shared root.
    pub fn production(settings: &Settings) -> anyhow::Result<Self> {
        let http = ReqwestClient::new(settings.http_timeout(), settings.download_timeout())?;
        Ok(Self {
            archiver: Box::new(ZipArchiver::new()),
            database: Box::new(MySqlAdmin::default()),
            http: Box::new(http.clone()),
            registry: Box::new(JsonTenantRegistry::new(settings.registry_path())),
            runtime: Box::new(CachedRuntimeSource::new(
                settings.cache_path(),
                settings.runtime_url.clone(),
                http,
            )),
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct InstallOptions {
    /// Restore the schema even when the core tables already exist.
    pub force_replace_schema: bool,
}

/// What the caller needs to record the installed site.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstalledSite {
    pub topology: Topology,
    pub host: String,
    pub path: PathBuf,
    pub tenant_dir: Option<String>,
}

#[derive(Debug)]
pub struct InstallReport {
    pub log: NoticeLog,
    pub result: Result<InstalledSite, PipelineError>,
}

impl InstallReport {
    pub fn is_success(&self) -> bool {
        self.result.is_ok() && !self.log.has_errors()
    }
}

pub struct InstallPipeline {
    settings: Settings,
    services: Services,
}

impl InstallPipeline {
    pub fn new(settings: Settings, services: Services) -> Self {
        Self { settings, services }
    }

    /// Run every step for `spec`.
    ///
    /// The halting error, if any, is also the last entry of `log.errors`.
    /// Side effects of completed steps are left in place.
    pub fn run(&self, spec: &SiteSpecification, options: &InstallOptions) -> InstallReport {
        let mut log = NoticeLog::new();
        tracing::info!(
            "installing {} site '{}' from profile '{}'",
            spec.topology.as_str(),
            spec.target,
            spec.profile
        );
        let result = self.execute(spec, options, &mut log);
        if let Err(err) = &result {
            log.error(err.clone());
        }
        InstallReport { log, result }
    }

    fn execute(
        &self,
        spec: &SiteSpecification,
        options: &InstallOptions,
        log: &mut NoticeLog,
    ) -> Result<InstalledSite, PipelineError> {
        let settings = &self.settings;
        let services = &self.services;
        let destination =
            Destination::resolve(spec, &settings.shared_root, &settings.tenant_prefix);

        // Dropped on return, taking anything not relocated with it
        let staging = self.staging_area()?;

        let staged = expand_profile(
            services.archiver.as_ref(),
            &settings.profile_archive(&spec.profile),
            staging.path(),
            log,
        )?;

        check_prerequisites(&staged, &destination, spec.topology, log)?;

        let mut db = provision_database(services.database.as_ref(), &spec.database, log)?;

        write_site_config(&staged, spec, log)?;

        let core_schema = settings.core_schema_path();
        let request = SchemaImport {
            core_schema: &core_schema,
            engine: db.engine,
            charset: &db.charset,
            force_replace: options.force_replace_schema,
        };
        import_schema(db.handle.as_mut(), &staged, &request, log)?;
        drop(db);

        import_assets(&staged, &spec.permissions, log)?;

        let site = relocate_site(&staged, &destination, log)?;

        match spec.topology {
            Topology::Standalone => self.place_runtime(spec, &destination, log)?,
            Topology::MultiTenant => self.register_tenant(spec, &destination, log)?,
        }

        let callback = AdminCallback {
            host: &spec.host,
            preinstall_path: &settings.preinstall_path,
            account: &spec.admin,
        };
        provision_admin(services.http.as_ref(), &site, &callback, log)?;

        Ok(InstalledSite {
            topology: spec.topology,
            host: spec.host.clone(),
            path: installed_path(&site, &destination),
            tenant_dir: destination.tenant_dir.clone(),
        })
    }

    fn staging_area(&self) -> Result<tempfile::TempDir, PipelineError> {
        let root = self.settings.staging_path();
        std::fs::create_dir_all(&root).map_err(|e| {
            PipelineError::environment(format!(
                "Unable to create staging directory {}: {}",
                root.display(),
                e
            ))
        })?;
        tempfile::Builder::new()
            .prefix("siteforge-")
            .tempdir_in(&root)
            .map_err(|e| {
                PipelineError::environment(format!(
                    "Unable to create staging area in {}: {}",
                    root.display(),
                    e
                ))
            })
    }

    fn place_runtime(
        &self,
        spec: &SiteSpecification,
        destination: &Destination,
        log: &mut NoticeLog,
    ) -> Result<(), PipelineError> {
        let version = spec
            .runtime_version
            .as_deref()
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| {
                PipelineError::environment("Standalone install requires a runtime version")
            })?;
        let install_root = destination
            .install_root
            .as_deref()
            .ok_or_else(|| PipelineError::environment("Standalone install has no install path"))?;
        place_runtime(
            self.services.runtime.as_ref(),
            self.services.archiver.as_ref(),
            version,
            install_root,
            log,
        )
    }

    fn register_tenant(
        &self,
        spec: &SiteSpecification,
        destination: &Destination,
        log: &mut NoticeLog,
    ) -> Result<(), PipelineError> {
        let dir = destination
            .tenant_dir
            .as_deref()
            .ok_or_else(|| PipelineError::environment("Tenant install has no tenant directory"))?;
        self.services.registry.add(&spec.host, dir).map_err(|e| {
            PipelineError::environment(format!(
                "Unable to update tenant registry: {}",
                describe(&e)
            ))
        })?;
        log.message(format!("Registered {} -> {}", spec.host, dir));
        Ok(())
    }
}

fn installed_path(site: &SiteTree, destination: &Destination) -> PathBuf {
    destination
        .install_root
        .clone()
        .unwrap_or_else(|| site.root().to_path_buf())
}
