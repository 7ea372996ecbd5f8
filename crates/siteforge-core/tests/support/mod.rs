#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::VecDeque;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use siteforge_core::archive::ZipArchiver;
use siteforge_core::db::dump::SqlDump;
use siteforge_core::db::{ConnectError, DatabaseAdmin, DatabaseHandle};
use siteforge_core::http::HttpClient;
use siteforge_core::install::{InstallPipeline, RuntimeSource, Services};
use siteforge_core::registry::JsonTenantRegistry;
use siteforge_core::settings::Settings;
use siteforge_core::site::{
    AdminAccount, DatabaseCredentials, PermissionSet, SiteSpecification, Topology,
};
use tempfile::TempDir;

pub const CORE_SQL: &str = "# core tables\n\
CREATE TABLE `pages` (`id` int unsigned NOT NULL) ENGINE=MyISAM DEFAULT CHARSET=utf8;\n\
CREATE TABLE `fields` (`id` int unsigned NOT NULL) ENGINE=MyISAM DEFAULT CHARSET=utf8;\n\
CREATE TABLE `fieldgroups` (`id` int unsigned NOT NULL) ENGINE=MyISAM DEFAULT CHARSET=utf8;\n\
CREATE TABLE `templates` (`id` int unsigned NOT NULL) ENGINE=MyISAM DEFAULT CHARSET=utf8;\n\
CREATE TABLE `modules` (`id` int unsigned NOT NULL) ENGINE=MyISAM DEFAULT CHARSET=utf8;\n\
INSERT INTO `pages` (`id`) VALUES (1);\n";

pub const PROFILE_SQL: &str = "-- profile content\n\
CREATE TABLE `field_body` (\n\
  `pages_id` int unsigned NOT NULL\n\
) ENGINE=MyISAM DEFAULT CHARSET=utf8;\n\
INSERT INTO `pages` (`id`) VALUES (1001);\n";

pub const ADMIN_TEMPLATE: &str = "<?php namespace ProcessWire;\nrequire($config->paths->core . 'admin.php');\n";

// =========================================================================
// Archives
// =========================================================================

pub fn write_zip(path: &Path, entries: &[(&str, Option<&str>)]) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    let file = std::fs::File::create(path).unwrap();
    let mut zip = zip::ZipWriter::new(file);
    let options = zip::write::SimpleFileOptions::default()
        .compression_method(zip::CompressionMethod::Stored);
    for (name, content) in entries {
        match content {
            Some(body) => {
                zip.start_file(*name, options).unwrap();
                zip.write_all(body.as_bytes()).unwrap();
            }
            None => zip.add_directory(*name, options).unwrap(),
        }
    }
    zip.finish().unwrap();
}

/// A profile wrapping everything in `site-blank/`.
pub fn write_profile(path: &Path) {
    write_zip(
        path,
        &[
            ("site-blank/", None),
            ("site-blank/assets/", None),
            ("site-blank/modules/", None),
            ("site-blank/config.php", Some("<?php namespace ProcessWire;\n")),
            ("site-blank/templates/admin.php", Some(ADMIN_TEMPLATE)),
            ("site-blank/templates/home.php", Some("<?php echo 'home';\n")),
            ("site-blank/install/install.sql", Some(PROFILE_SQL)),
            ("site-blank/install/files/1001/", None),
            ("site-blank/install/files/1001/hero.jpg", Some("jpeg")),
        ],
    );
}

pub fn write_runtime(path: &Path) {
    write_zip(
        path,
        &[
            ("processwire-3.0.229/", None),
            ("processwire-3.0.229/wire/core/ProcessWire.php", Some("<?php\n")),
            ("processwire-3.0.229/index.php", Some("<?php // front controller\n")),
            ("processwire-3.0.229/htaccess.txt", Some("RewriteEngine On\n")),
            ("processwire-3.0.229/README.md", Some("# runtime\n")),
            ("processwire-3.0.229/install.php", Some("<?php // installer\n")),
            ("processwire-3.0.229/CONTRIBUTING.md", Some("contribute\n")),
            ("processwire-3.0.229/site-blank/config.php", Some("<?php\n")),
        ],
    );
}

// =========================================================================
// Fake database
// =========================================================================

#[derive(Debug, Default)]
pub struct DbState {
    pub schema_exists: bool,
    pub tables: Vec<String>,
    pub executed: Vec<String>,
    /// `use_schema` flag of every connect call.
    pub connects: Vec<bool>,
    pub fail_connect: Option<String>,
    /// Fail any statement containing this text.
    pub fail_on: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct FakeDatabase {
    pub state: Rc<RefCell<DbState>>,
}

impl FakeDatabase {
    pub fn fresh() -> Self {
        Self::default()
    }

    pub fn existing_schema() -> Self {
        let db = Self::default();
        db.state.borrow_mut().schema_exists = true;
        db
    }

    pub fn installed() -> Self {
        let db = Self::existing_schema();
        db.state.borrow_mut().tables = ["pages", "fields", "fieldgroups", "templates", "modules"]
            .iter()
            .map(|t| t.to_string())
            .collect();
        db
    }

    pub fn connect_count(&self) -> usize {
        self.state.borrow().connects.len()
    }

    pub fn executed(&self) -> Vec<String> {
        self.state.borrow().executed.clone()
    }
}

impl DatabaseAdmin for FakeDatabase {
    fn connect(
        &self,
        creds: &DatabaseCredentials,
        use_schema: bool,
    ) -> Result<Box<dyn DatabaseHandle>, ConnectError> {
        let mut state = self.state.borrow_mut();
        state.connects.push(use_schema);
        if let Some(message) = &state.fail_connect {
            return Err(ConnectError::Other(anyhow::anyhow!(message.clone())));
        }
        if use_schema && !state.schema_exists {
            return Err(ConnectError::UnknownSchema(creds.name.clone()));
        }
        Ok(Box::new(FakeHandle {
            state: Rc::clone(&self.state),
        }))
    }
}

struct FakeHandle {
    state: Rc<RefCell<DbState>>,
}

impl DatabaseHandle for FakeHandle {
    fn execute(&mut self, sql: &str) -> anyhow::Result<()> {
        let mut state = self.state.borrow_mut();
        if let Some(needle) = &state.fail_on
            && sql.contains(needle.as_str())
        {
            anyhow::bail!("You have an error in your SQL syntax near '{}'", needle);
        }
        state.executed.push(sql.to_string());
        if sql.starts_with("CREATE SCHEMA") {
            state.schema_exists = true;
        }
        for table in SqlDump::parse(sql).created_tables() {
            state.tables.push(table);
        }
        Ok(())
    }

    fn table_names(&mut self) -> anyhow::Result<Vec<String>> {
        Ok(self.state.borrow().tables.clone())
    }
}

// =========================================================================
// Fake HTTP
// =========================================================================

#[derive(Debug, Clone)]
pub struct Post {
    pub url: String,
    pub fields: Vec<(String, String)>,
    /// Contents of the watched file at the time of the request.
    pub watched: Option<String>,
}

#[derive(Debug, Default)]
pub struct HttpState {
    /// Scripted outcomes, consumed in order; success once exhausted.
    pub responses: VecDeque<Result<(), String>>,
    pub posts: Vec<Post>,
    pub watch: Option<PathBuf>,
}

#[derive(Debug, Clone, Default)]
pub struct FakeHttp {
    pub state: Rc<RefCell<HttpState>>,
}

impl FakeHttp {
    pub fn ok() -> Self {
        Self::default()
    }

    pub fn scripted(responses: Vec<Result<(), String>>) -> Self {
        let http = Self::default();
        http.state.borrow_mut().responses = responses.into();
        http
    }

    pub fn watch(&self, path: PathBuf) {
        self.state.borrow_mut().watch = Some(path);
    }

    pub fn posts(&self) -> Vec<Post> {
        self.state.borrow().posts.clone()
    }
}

impl HttpClient for FakeHttp {
    fn post_form(&self, url: &str, fields: &[(String, String)]) -> anyhow::Result<()> {
        let mut state = self.state.borrow_mut();
        let watched = state
            .watch
            .as_ref()
            .and_then(|p| std::fs::read_to_string(p).ok());
        state.posts.push(Post {
            url: url.to_string(),
            fields: fields.to_vec(),
            watched,
        });
        match state.responses.pop_front() {
            Some(Err(message)) => Err(anyhow::anyhow!(message)),
            _ => Ok(()),
        }
    }

    fn get_bytes(&self, url: &str) -> anyhow::Result<Vec<u8>> {
        anyhow::bail!("unexpected download of {}", url)
    }
}

// =========================================================================
// Fake runtime source
// =========================================================================

#[derive(Debug, Clone)]
pub struct LocalRuntime {
    pub archive: PathBuf,
}

impl RuntimeSource for LocalRuntime {
    fn locate(&self, _version: &str) -> anyhow::Result<PathBuf> {
        if self.archive.is_file() {
            Ok(self.archive.clone())
        } else {
            anyhow::bail!("runtime archive not found: {}", self.archive.display())
        }
    }
}

// =========================================================================
// Specifications
// =========================================================================

pub fn admin_account() -> AdminAccount {
    AdminAccount {
        name: "admin".to_string(),
        password: "correct horse battery".to_string(),
        email: "admin@example.com".to_string(),
        admin_login: "processwire".to_string(),
        admin_theme: "AdminThemeUikit".to_string(),
        colour_theme: "default".to_string(),
    }
}

pub fn credentials(name: &str) -> DatabaseCredentials {
    DatabaseCredentials {
        host: "localhost".to_string(),
        port: 3306,
        name: name.to_string(),
        user: "cms".to_string(),
        password: "pw".to_string(),
        charset: "utf8".to_string(),
        engine: "MyISAM".to_string(),
    }
}

pub fn tenant_spec(name: &str) -> SiteSpecification {
    SiteSpecification {
        topology: Topology::MultiTenant,
        title: "Blog".to_string(),
        description: "A tenant blog".to_string(),
        target: name.to_string(),
        host: format!("{name}.example.com"),
        http_hosts: vec![format!("{name}.example.com")],
        profile: "site-blank".to_string(),
        admin: admin_account(),
        timezone: "UTC".to_string(),
        database: credentials(name),
        permissions: PermissionSet::default(),
        runtime_version: None,
    }
}

pub fn standalone_spec(install_path: &Path) -> SiteSpecification {
    SiteSpecification {
        topology: Topology::Standalone,
        target: install_path.to_string_lossy().to_string(),
        host: "shop.example.com".to_string(),
        http_hosts: vec!["shop.example.com".to_string()],
        runtime_version: Some("3.0.229".to_string()),
        ..tenant_spec("shop")
    }
}

// =========================================================================
// Harness
// =========================================================================

/// Shared root with a core schema and profile, plus fake collaborators.
pub struct Harness {
    pub temp: TempDir,
    pub settings: Settings,
    pub db: FakeDatabase,
    pub http: FakeHttp,
    pub runtime_archive: PathBuf,
}

impl Harness {
    pub fn new(db: FakeDatabase, http: FakeHttp) -> Self {
        let temp = TempDir::new().expect("Failed to create temp dir");
        let shared_root = temp.path().join("cms");
        std::fs::create_dir_all(shared_root.join("wire/core")).unwrap();
        std::fs::write(shared_root.join("wire/core/install.sql"), CORE_SQL).unwrap();
        write_profile(&shared_root.join("profiles/site-blank.zip"));

        let runtime_archive = temp.path().join("downloads/runtime.zip");
        write_runtime(&runtime_archive);

        let mut settings = Settings::with_shared_root(&shared_root);
        settings.staging_dir = Some(temp.path().join("staging"));
        settings.cache_dir = Some(temp.path().join("cache"));

        Self {
            temp,
            settings,
            db,
            http,
            runtime_archive,
        }
    }

    pub fn shared_root(&self) -> &Path {
        &self.settings.shared_root
    }

    pub fn registry(&self) -> JsonTenantRegistry {
        JsonTenantRegistry::new(self.settings.registry_path())
    }

    pub fn pipeline(&self) -> InstallPipeline {
        let services = Services {
            archiver: Box::new(ZipArchiver::new()),
            database: Box::new(self.db.clone()),
            http: Box::new(self.http.clone()),
            registry: Box::new(self.registry()),
            runtime: Box::new(LocalRuntime {
                archive: self.runtime_archive.clone(),
            }),
        };
        InstallPipeline::new(self.settings.clone(), services)
    }
}
