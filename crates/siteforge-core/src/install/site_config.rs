//! Appends generated runtime settings to the site's config file.

use std::io::Write;

use rand::Rng;
use rand::distributions::Alphanumeric;

use crate::db::{DbEngine, is_default_charset, normalize_charset};
use crate::error::PipelineError;
use crate::notice::NoticeLog;
use crate::site::{SiteSpecification, SiteTree};

const SALT_LEN: usize = 40;

pub fn generate_salt() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(SALT_LEN)
        .map(char::from)
        .collect()
}

/// Render the settings block in its fixed order.
pub fn render_config_block(spec: &SiteSpecification, salt: &str) -> String {
    let db = &spec.database;
    let charset = normalize_charset(&db.charset);
    let engine = DbEngine::from_request(&db.engine);

    let mut out = String::new();
    out.push_str("\n/**\n * Installer: Database Configuration\n *\n */\n");
    push_assign(&mut out, "dbHost", &quote(&db.host));
    push_assign(&mut out, "dbName", &quote(&db.name));
    push_assign(&mut out, "dbUser", &quote(&db.user));
    push_assign(&mut out, "dbPass", &quote(&db.password));
    push_assign(&mut out, "dbPort", &quote(&db.port.to_string()));
    if !is_default_charset(&charset) {
        push_assign(&mut out, "dbCharset", &quote(&charset));
    }
    if engine == DbEngine::InnoDb {
        push_assign(&mut out, "dbEngine", &quote(engine.as_str()));
    }

    out.push_str("\n/**\n * Installer: User Authentication Salt\n *\n */\n");
    push_assign(&mut out, "userAuthSalt", &quote(salt));

    out.push_str("\n/**\n * Installer: File Permission Configuration\n *\n */\n");
    push_assign(
        &mut out,
        "chmodDir",
        &quote(&format!("0{}", spec.permissions.dir)),
    );
    push_assign(
        &mut out,
        "chmodFile",
        &quote(&format!("0{}", spec.permissions.file)),
    );

    out.push_str("\n/**\n * Installer: Time zone setting\n *\n */\n");
    push_assign(&mut out, "timezone", &quote(&spec.timezone));

    if !spec.http_hosts.is_empty() {
        out.push_str("\n/**\n * Installer: HTTP Hosts Whitelist\n *\n */\n");
        let hosts: Vec<String> = spec.http_hosts.iter().map(|h| quote(h)).collect();
        push_assign(
            &mut out,
            "httpHosts",
            &format!("array({})", hosts.join(", ")),
        );
    }

    out
}

fn push_assign(out: &mut String, key: &str, value: &str) {
    out.push_str(&format!("$config->{key} = {value};\n"));
}

/// Single-quoted literal with `\` and `'` escaped.
fn quote(value: &str) -> String {
    let escaped = value.replace('\\', "\\\\").replace('\'', "\\'");
    format!("'{escaped}'")
}

/// Append the generated block; never truncates the existing file.
pub fn write_site_config(
    tree: &SiteTree,
    spec: &SiteSpecification,
    log: &mut NoticeLog,
) -> Result<(), PipelineError> {
    let path = tree.config_file();
    let block = render_config_block(spec, &generate_salt());

    let mut file = std::fs::OpenOptions::new()
        .append(true)
        .open(&path)
        .map_err(|e| {
            PipelineError::environment(format!(
                "Failed to open {} for writing: {}",
                path.display(),
                e
            ))
        })?;
    file.write_all(block.as_bytes()).map_err(|e| {
        PipelineError::environment(format!("Failed to write {}: {}", path.display(), e))
    })?;

    log.message(format!("Saved configuration to {}", path.display()));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::site::{AdminAccount, DatabaseCredentials, PermissionSet, Topology};

    fn spec(engine: &str, charset: &str) -> SiteSpecification {
        SiteSpecification {
            topology: Topology::MultiTenant,
            title: "Blog".to_string(),
            description: String::new(),
            target: "blog".to_string(),
            host: "blog.example.com".to_string(),
            http_hosts: Vec::new(),
            profile: "site-blank".to_string(),
            admin: AdminAccount {
                name: "admin".to_string(),
                password: "pw".to_string(),
                email: "a@example.com".to_string(),
                admin_login: "processwire".to_string(),
                admin_theme: "AdminThemeUikit".to_string(),
                colour_theme: "default".to_string(),
            },
            timezone: "Europe/Helsinki".to_string(),
            database: DatabaseCredentials {
                host: "localhost".to_string(),
                port: 3306,
                name: "blog".to_string(),
                user: "blog".to_string(),
                password: "it's\\secret".to_string(),
                charset: charset.to_string(),
                engine: engine.to_string(),
            },
            permissions: PermissionSet::default(),
            runtime_version: None,
        }
    }

    fn count_lines(block: &str, key: &str) -> usize {
        block
            .lines()
            .filter(|l| l.starts_with(&format!("$config->{key} ")))
            .count()
    }

    #[test]
    fn innodb_and_latin1_emit_one_line_each() {
        let block = render_config_block(&spec("InnoDB", "LATIN1"), "salt");
        assert_eq!(count_lines(&block, "dbEngine"), 1);
        assert_eq!(count_lines(&block, "dbCharset"), 1);
        assert!(block.contains("$config->dbEngine = 'InnoDB';"));
        assert!(block.contains("$config->dbCharset = 'latin1';"));
    }

    #[test]
    fn defaults_emit_neither_line() {
        let block = render_config_block(&spec("MyISAM", "utf8"), "salt");
        assert_eq!(count_lines(&block, "dbEngine"), 0);
        assert_eq!(count_lines(&block, "dbCharset"), 0);
    }

    #[test]
    fn settings_follow_fixed_order() {
        let mut spec = spec("InnoDB", "latin1");
        spec.http_hosts = vec!["blog.example.com".to_string(), "www.blog.example.com".to_string()];
        let block = render_config_block(&spec, "salt");

        let keys: Vec<&str> = block
            .lines()
            .filter_map(|l| l.strip_prefix("$config->"))
            .filter_map(|l| l.split(' ').next())
            .collect();
        assert_eq!(
            keys,
            vec![
                "dbHost",
                "dbName",
                "dbUser",
                "dbPass",
                "dbPort",
                "dbCharset",
                "dbEngine",
                "userAuthSalt",
                "chmodDir",
                "chmodFile",
                "timezone",
                "httpHosts"
            ]
        );
        assert!(block.contains("$config->chmodDir = '0755';"));
        assert!(
            block.contains("$config->httpHosts = array('blog.example.com', 'www.blog.example.com');")
        );
    }

    #[test]
    fn values_are_escaped() {
        let block = render_config_block(&spec("MyISAM", "utf8"), "salt");
        assert!(block.contains(r"$config->dbPass = 'it\'s\\secret';"));
    }

    #[test]
    fn write_appends_to_existing_file() {
        let temp = tempfile::TempDir::new().unwrap();
        std::fs::write(temp.path().join("config.php"), "<?php\n$config->debug = false;\n")
            .unwrap();
        let tree = SiteTree::new(temp.path());
        let mut log = NoticeLog::new();

        write_site_config(&tree, &spec("MyISAM", "utf8"), &mut log).unwrap();

        let content = std::fs::read_to_string(tree.config_file()).unwrap();
        assert!(content.starts_with("<?php\n$config->debug = false;\n"));
        assert!(content.contains("$config->userAuthSalt = '"));
    }

    #[test]
    fn missing_config_file_is_environment_error() {
        let temp = tempfile::TempDir::new().unwrap();
        let tree = SiteTree::new(temp.path());
        let mut log = NoticeLog::new();

        let err = write_site_config(&tree, &spec("MyISAM", "utf8"), &mut log).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Environment);
    }

    #[test]
    fn salts_are_random() {
        let a = generate_salt();
        assert_eq!(a.len(), SALT_LEN);
        assert_ne!(a, generate_salt());
    }
}
