//! Token-guarded callback that provisions the superuser on the new site.
//!
//! The new site runs in its own process, so the account is set by planting a
//! one-time handler in place of the admin template, POSTing its token to the
//! pre-install admin URL, and then restoring the original template.

use std::io::Write;
use std::path::{Path, PathBuf};

use rand::Rng;
use rand::distributions::Alphanumeric;
use serde::Serialize;

use crate::error::PipelineError;
use crate::http::HttpClient;
use crate::notice::{CallbackProtocol, NoticeLog};
use crate::site::{AdminAccount, SiteTree};

const TOKEN_NAME_LEN: usize = 20;
const TOKEN_VALUE_LEN: usize = 40;
const ORIGINAL_SUFFIX: &str = "siteforge-orig";

const INSTALLED_MARKER_BODY: &str = "<?php // This file marks the site as installed. \
Remove it only to run the installer again.\n";

/// Fixed handler; `{payload}` is replaced by the JSON instruction.
const CALLBACK_TEMPLATE: &str = r#"<?php namespace ProcessWire;
// One-time account setup, removed by siteforge after the first request.
$instruction = json_decode(<<<'SITEFORGE_JSON'
{payload}
SITEFORGE_JSON, true);
if(!is_array($instruction) || $input->post($instruction['token_name']) !== $instruction['token_value']) {
	throw new Wire404Exception();
}
$account = $instruction['account'];
$adminTheme = $modules->getInstall($account['admin_theme']);
$su = $users->get($config->superUserPageID);
$su->of(false);
$su->name = $sanitizer->pageName($account['name']);
$su->pass = $account['password'];
$su->email = $sanitizer->email($account['email']);
if($adminTheme) $su->admin_theme = $adminTheme;
$su->save();
$admin = $pages->get($config->adminRootPageID);
$admin->of(false);
$admin->name = $sanitizer->pageName($account['admin_login']);
$admin->save();
if($adminTheme && $account['colour_theme'] !== '') {
	$data = $modules->getConfig($adminTheme);
	$data['colour_theme'] = $account['colour_theme'];
	$modules->saveConfig($adminTheme, $data);
}
echo 'ok';
"#;

/// Single-use field name and value the callback expects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallbackToken {
    pub name: String,
    pub value: String,
}

impl CallbackToken {
    pub fn generate() -> Self {
        Self {
            name: format!("t{}", random_alphanumeric(TOKEN_NAME_LEN)),
            value: random_alphanumeric(TOKEN_VALUE_LEN),
        }
    }
}

fn random_alphanumeric(len: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

#[derive(Serialize)]
struct Instruction<'a> {
    token_name: &'a str,
    token_value: &'a str,
    account: &'a AdminAccount,
}

pub fn render_callback_script(
    token: &CallbackToken,
    account: &AdminAccount,
) -> Result<String, PipelineError> {
    let payload = serde_json::to_string(&Instruction {
        token_name: &token.name,
        token_value: &token.value,
        account,
    })
    .map_err(|e| PipelineError::environment(format!("Unable to encode callback: {e}")))?;
    Ok(CALLBACK_TEMPLATE.replace("{payload}", &payload))
}

/// Where the callback is served and what it installs.
#[derive(Debug, Clone)]
pub struct AdminCallback<'a> {
    pub host: &'a str,
    pub preinstall_path: &'a str,
    pub account: &'a AdminAccount,
}

impl AdminCallback<'_> {
    pub fn url(&self, protocol: CallbackProtocol) -> Result<url::Url, PipelineError> {
        let raw = format!(
            "{}://{}/{}/",
            protocol.scheme(),
            self.host.trim_end_matches('/'),
            self.preinstall_path.trim_matches('/')
        );
        url::Url::parse(&raw).map_err(|e| {
            PipelineError::RemoteProvision(format!("Invalid callback URL {raw}: {e}"))
        })
    }
}

pub fn provision_admin(
    http: &dyn HttpClient,
    site: &SiteTree,
    callback: &AdminCallback<'_>,
    log: &mut NoticeLog,
) -> Result<(), PipelineError> {
    let token = CallbackToken::generate();
    let script = render_callback_script(&token, callback.account)?;

    let entry = site.admin_template();
    let original = plant_callback(&entry, &script)?;

    let fields = vec![(token.name.clone(), token.value.clone())];
    let outcome = post_with_fallback(http, callback, &fields, log);

    restore_entry_point(&entry, original.as_deref(), log);

    let protocol = outcome?;
    log.outcomes.callback_protocol = Some(protocol);
    log.message(format!(
        "Provisioned superuser '{}' over {}",
        callback.account.name,
        protocol.scheme()
    ));

    let marker = site.installed_marker();
    match std::fs::write(&marker, INSTALLED_MARKER_BODY) {
        Ok(()) => log.outcomes.installed_marker_written = true,
        Err(e) => log.error(PipelineError::environment(format!(
            "Unable to write {}: {}",
            marker.display(),
            e
        ))),
    }
    Ok(())
}

/// Move the existing entry point aside and write the callback in its place.
///
/// Returns where the original was moved, if there was one.
fn plant_callback(entry: &Path, script: &str) -> Result<Option<PathBuf>, PipelineError> {
    if let Some(parent) = entry.parent() {
        std::fs::create_dir_all(parent).map_err(|e| {
            PipelineError::environment(format!("Unable to create {}: {}", parent.display(), e))
        })?;
    }

    let original = if entry.exists() {
        let aside = aside_path(entry);
        std::fs::rename(entry, &aside).map_err(|e| {
            PipelineError::environment(format!(
                "Unable to move {} aside: {}",
                entry.display(),
                e
            ))
        })?;
        Some(aside)
    } else {
        None
    };

    let written = std::fs::File::create(entry).and_then(|mut f| f.write_all(script.as_bytes()));
    if let Err(e) = written {
        let _ = std::fs::remove_file(entry);
        if let Some(aside) = &original {
            let _ = std::fs::rename(aside, entry);
        }
        return Err(PipelineError::environment(format!(
            "Unable to write callback {}: {}",
            entry.display(),
            e
        )));
    }
    Ok(original)
}

fn aside_path(entry: &Path) -> PathBuf {
    let mut name = entry.file_name().unwrap_or_default().to_os_string();
    name.push(".");
    name.push(ORIGINAL_SUFFIX);
    entry.with_file_name(name)
}

fn post_with_fallback(
    http: &dyn HttpClient,
    callback: &AdminCallback<'_>,
    fields: &[(String, String)],
    log: &mut NoticeLog,
) -> Result<CallbackProtocol, PipelineError> {
    let mut failures = Vec::new();
    for protocol in [CallbackProtocol::Secure, CallbackProtocol::Insecure] {
        let url = callback.url(protocol)?;
        match http.post_form(url.as_str(), fields) {
            Ok(()) => {
                if protocol == CallbackProtocol::Insecure {
                    log.warning(format!(
                        "Callback over HTTPS failed, used HTTP instead ({})",
                        failures.join("; ")
                    ));
                }
                return Ok(protocol);
            }
            Err(e) => {
                tracing::debug!("callback POST to {} failed: {:#}", url, e);
                failures.push(format!("{url}: {e:#}"));
            }
        }
    }
    Err(PipelineError::RemoteProvision(format!(
        "Unable to reach the new site to create the superuser account: {}",
        failures.join("; ")
    )))
}

fn restore_entry_point(entry: &Path, original: Option<&Path>, log: &mut NoticeLog) {
    if let Err(e) = std::fs::remove_file(entry) {
        log.error(PipelineError::environment(format!(
            "Unable to remove callback {}: {}",
            entry.display(),
            e
        )));
        return;
    }
    if let Some(aside) = original
        && let Err(e) = std::fs::rename(aside, entry)
    {
        log.error(PipelineError::environment(format!(
            "Unable to restore {} from {}: {}",
            entry.display(),
            aside.display(),
            e
        )));
    }
}
