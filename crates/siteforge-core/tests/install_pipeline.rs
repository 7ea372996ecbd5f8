//! End-to-end installs against fake database and HTTP collaborators.

mod support;

use siteforge_core::error::ErrorKind;
use siteforge_core::install::InstallOptions;
use siteforge_core::notice::CallbackProtocol;
use siteforge_core::registry::TenantRegistryStore;
use siteforge_core::site::Topology;
use support::{ADMIN_TEMPLATE, FakeDatabase, FakeHttp, Harness, standalone_spec, tenant_spec};

#[test]
fn tenant_install_completes_and_registers_host() {
    let harness = Harness::new(FakeDatabase::fresh(), FakeHttp::ok());
    let site_dir = harness.shared_root().join("site-blog");
    harness.http.watch(site_dir.join("templates/admin.php"));

    let report = harness
        .pipeline()
        .run(&tenant_spec("blog"), &InstallOptions::default());

    assert!(report.log.errors.is_empty(), "errors: {:?}", report.log.errors);
    assert!(report.is_success());
    let site = report.result.as_ref().unwrap();
    assert_eq!(site.topology, Topology::MultiTenant);
    assert_eq!(site.path, site_dir);
    assert_eq!(site.tenant_dir.as_deref(), Some("site-blog"));

    // Relocated tree
    assert!(site_dir.join("templates/home.php").is_file());
    assert!(site_dir.join("assets/files/1001/hero.jpg").is_file());
    for dir in ["cache", "logs", "sessions"] {
        assert!(site_dir.join("assets").join(dir).is_dir(), "missing assets/{dir}");
    }
    assert!(!site_dir.join("install").exists());
    assert!(site_dir.join("assets/installed.php").is_file());

    let config = std::fs::read_to_string(site_dir.join("config.php")).unwrap();
    assert!(config.contains("$config->dbName = 'blog';"));
    assert!(config.contains("$config->httpHosts = array('blog.example.com');"));
    assert!(!config.contains("dbEngine"));

    // Registry
    let map = harness.registry().load().unwrap();
    assert_eq!(map.get("blog.example.com").map(String::as_str), Some("site-blog"));

    // Database
    let state = harness.db.state.borrow();
    assert!(state.schema_exists);
    assert!(state.tables.iter().any(|t| t == "field_body"));
    assert!(report.log.outcomes.connection_ok);
    assert!(report.log.outcomes.schema_created);
    assert!(report.log.outcomes.schema_imported);

    // Callback served over https and cleaned up afterwards
    let posts = harness.http.posts();
    assert_eq!(posts.len(), 1);
    assert_eq!(posts[0].url, "https://blog.example.com/processwire/");
    let (_, token_value) = &posts[0].fields[0];
    let served = posts[0].watched.as_deref().unwrap();
    assert!(served.contains(token_value.as_str()));
    assert_eq!(
        std::fs::read_to_string(site_dir.join("templates/admin.php")).unwrap(),
        ADMIN_TEMPLATE
    );
    assert!(!site_dir.join("templates/admin.php.siteforge-orig").exists());
    assert_eq!(
        report.log.outcomes.callback_protocol,
        Some(CallbackProtocol::Secure)
    );
    assert!(report.log.outcomes.installed_marker_written);
}

#[test]
fn existing_tenant_directory_halts_before_database() {
    let harness = Harness::new(FakeDatabase::fresh(), FakeHttp::ok());
    let site_dir = harness.shared_root().join("site-blog");
    std::fs::create_dir_all(&site_dir).unwrap();
    std::fs::write(site_dir.join("keep.txt"), "existing").unwrap();

    let report = harness
        .pipeline()
        .run(&tenant_spec("blog"), &InstallOptions::default());

    assert!(!report.is_success());
    assert_eq!(report.log.errors.len(), 1);
    assert_eq!(report.log.errors[0].kind(), ErrorKind::Environment);
    assert!(report.log.errors[0].message().contains("already exists"));
    assert_eq!(
        report.result.as_ref().unwrap_err().kind(),
        ErrorKind::Environment
    );

    assert_eq!(harness.db.connect_count(), 0);
    assert!(harness.db.executed().is_empty());
    assert!(!harness.settings.registry_path().exists());
    assert!(harness.http.posts().is_empty());
    assert_eq!(
        std::fs::read_to_string(site_dir.join("keep.txt")).unwrap(),
        "existing"
    );
    assert!(!site_dir.join("config.php").exists());
}

#[test]
fn standalone_without_install_path_halts_before_relocation() {
    let harness = Harness::new(FakeDatabase::fresh(), FakeHttp::ok());
    let install_path = harness.temp.path().join("www");

    let report = harness
        .pipeline()
        .run(&standalone_spec(&install_path), &InstallOptions::default());

    let err = report.result.as_ref().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Environment);
    assert!(err.message().contains("does not exist"));
    assert!(!install_path.exists());
    assert_eq!(harness.db.connect_count(), 0);
    assert!(harness.http.posts().is_empty());
}

#[test]
fn standalone_install_places_runtime_next_to_site() {
    let harness = Harness::new(FakeDatabase::existing_schema(), FakeHttp::ok());
    let install_path = harness.temp.path().join("www");
    std::fs::create_dir_all(&install_path).unwrap();

    let report = harness
        .pipeline()
        .run(&standalone_spec(&install_path), &InstallOptions::default());

    assert!(report.is_success(), "errors: {:?}", report.log.errors);
    let site = report.result.as_ref().unwrap();
    assert_eq!(site.path, install_path);
    assert_eq!(site.tenant_dir, None);

    assert!(install_path.join("site/config.php").is_file());
    assert!(install_path.join("site/assets/installed.php").is_file());
    assert!(install_path.join("wire/core/ProcessWire.php").is_file());
    assert!(install_path.join("index.php").is_file());
    assert!(install_path.join(".htaccess").is_file());
    assert!(install_path.join("README.md").is_file());
    assert!(!install_path.join("htaccess.txt").exists());
    assert!(!install_path.join("install.php").exists());
    assert!(!install_path.join("CONTRIBUTING.md").exists());
    assert!(!install_path.join("site-blank").exists());

    // Existing schema is reused, tenants are left alone
    assert!(!report.log.outcomes.schema_created);
    assert!(!harness.settings.registry_path().exists());
    assert_eq!(
        harness.http.posts()[0].url,
        "https://shop.example.com/processwire/"
    );
}

#[test]
fn installed_schema_is_left_untouched() {
    let harness = Harness::new(FakeDatabase::installed(), FakeHttp::ok());

    let report = harness
        .pipeline()
        .run(&tenant_spec("blog"), &InstallOptions::default());

    assert!(report.is_success(), "errors: {:?}", report.log.errors);
    assert!(harness.db.executed().is_empty());
    assert!(!report.log.outcomes.schema_imported);
    assert!(
        report
            .log
            .messages
            .iter()
            .any(|m| m.contains("schema import skipped"))
    );
}

#[test]
fn forced_schema_replace_drops_tables_first() {
    let harness = Harness::new(FakeDatabase::installed(), FakeHttp::ok());
    let options = InstallOptions {
        force_replace_schema: true,
    };

    let report = harness.pipeline().run(&tenant_spec("blog"), &options);

    assert!(report.is_success(), "errors: {:?}", report.log.errors);
    let executed = harness.db.executed();
    let first_create = executed
        .iter()
        .position(|s| s.starts_with("CREATE TABLE"))
        .unwrap();
    let last_drop = executed
        .iter()
        .rposition(|s| s.starts_with("DROP TABLE IF EXISTS"))
        .unwrap();
    assert!(last_drop < first_create);
    assert!(executed.contains(&"DROP TABLE IF EXISTS `pages`".to_string()));
    assert!(executed.contains(&"DROP TABLE IF EXISTS `field_body`".to_string()));
    assert!(report.log.outcomes.schema_imported);
}

#[test]
fn unreachable_database_halts_with_database_error() {
    let db = FakeDatabase::fresh();
    db.state.borrow_mut().fail_connect = Some("Access denied for user 'cms'".to_string());
    let harness = Harness::new(db, FakeHttp::ok());

    let report = harness
        .pipeline()
        .run(&tenant_spec("blog"), &InstallOptions::default());

    let err = report.result.as_ref().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Database);
    assert!(err.message().contains("Access denied"));
    assert!(!report.log.outcomes.connection_ok);
    assert!(!harness.shared_root().join("site-blog").exists());
}

#[test]
fn failed_statement_halts_with_import_error() {
    let db = FakeDatabase::existing_schema();
    db.state.borrow_mut().fail_on = Some("field_body".to_string());
    let harness = Harness::new(db, FakeHttp::ok());

    let report = harness
        .pipeline()
        .run(&tenant_spec("blog"), &InstallOptions::default());

    let err = report.result.as_ref().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Import);
    assert!(err.message().contains("profile schema"));
    assert!(!report.log.outcomes.schema_imported);
    assert!(!harness.shared_root().join("site-blog").exists());
}

#[test]
fn missing_profile_archive_is_an_environment_error() {
    let harness = Harness::new(FakeDatabase::fresh(), FakeHttp::ok());
    let mut spec = tenant_spec("blog");
    spec.profile = "site-missing".to_string();

    let report = harness.pipeline().run(&spec, &InstallOptions::default());

    let err = report.result.as_ref().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Environment);
    assert_eq!(harness.db.connect_count(), 0);
}

#[test]
fn unreachable_site_leaves_installed_files_without_marker() {
    let http = FakeHttp::scripted(vec![
        Err("connection refused".to_string()),
        Err("connection refused".to_string()),
    ]);
    let harness = Harness::new(FakeDatabase::fresh(), http);
    let site_dir = harness.shared_root().join("site-blog");

    let report = harness
        .pipeline()
        .run(&tenant_spec("blog"), &InstallOptions::default());

    let err = report.result.as_ref().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::RemoteProvision);
    assert_eq!(harness.http.posts().len(), 2);

    // No rollback: the site and its registration stay in place
    assert!(site_dir.join("config.php").is_file());
    let map = harness.registry().load().unwrap();
    assert!(map.contains_key("blog.example.com"));

    assert_eq!(
        std::fs::read_to_string(site_dir.join("templates/admin.php")).unwrap(),
        ADMIN_TEMPLATE
    );
    assert!(!site_dir.join("assets/installed.php").exists());
    assert!(!report.log.outcomes.installed_marker_written);
    assert_eq!(report.log.outcomes.callback_protocol, None);
}
