//! Runtime placement for standalone installs.

use std::path::{Path, PathBuf};

use anyhow::Context;

use crate::archive::Archiver;
use crate::error::{PipelineError, describe};
use crate::fs::{move_tree, remove_path};
use crate::http::HttpClient;
use crate::notice::NoticeLog;
use crate::settings::runtime_url;

/// Runtime core subtree.
pub const CORE_DIR: &str = "wire";

/// Top-level runtime files carried into the install root.
pub const KEPT_FILES: [&str; 4] = ["index.php", "htaccess.txt", "README.md", "LICENSE.TXT"];

/// Entry that is renamed to its dot-prefixed form when placed.
const HTACCESS_SOURCE: &str = "htaccess.txt";
const HTACCESS_TARGET: &str = ".htaccess";

/// Resolves a runtime version to a local archive.
pub trait RuntimeSource {
    fn locate(&self, version: &str) -> anyhow::Result<PathBuf>;
}

/// Archives cached as `<cache_dir>/runtime-<version>.zip`, downloaded on a miss.
#[derive(Debug, Clone)]
pub struct CachedRuntimeSource<H> {
    cache_dir: PathBuf,
    url_template: String,
    http: H,
}

impl<H: HttpClient> CachedRuntimeSource<H> {
    pub fn new(cache_dir: PathBuf, url_template: impl Into<String>, http: H) -> Self {
        Self {
            cache_dir,
            url_template: url_template.into(),
            http,
        }
    }

    fn archive_path(&self, version: &str) -> PathBuf {
        let safe: String = version
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        self.cache_dir.join(format!("runtime-{safe}.zip"))
    }
}

impl<H: HttpClient> RuntimeSource for CachedRuntimeSource<H> {
    fn locate(&self, version: &str) -> anyhow::Result<PathBuf> {
        let path = self.archive_path(version);
        if path.is_file() {
            tracing::debug!("using cached runtime {}", path.display());
            return Ok(path);
        }

        let url = runtime_url(&self.url_template, version);
        tracing::info!("downloading runtime {} from {}", version, url);
        let bytes = self.http.get_bytes(&url)?;

        std::fs::create_dir_all(&self.cache_dir).with_context(|| {
            format!("Failed to create cache directory: {}", self.cache_dir.display())
        })?;
        // Write to a temp name first so an interrupted download is not cached
        let partial = path.with_extension("zip.part");
        std::fs::write(&partial, &bytes)
            .with_context(|| format!("Failed to write {}", partial.display()))?;
        std::fs::rename(&partial, &path)
            .with_context(|| format!("Failed to move download into {}", path.display()))?;
        Ok(path)
    }
}

/// Extract the runtime and move its core files into `install_root`.
///
/// A failed entry move is logged and the remaining entries still move.
pub fn place_runtime(
    source: &dyn RuntimeSource,
    archiver: &dyn Archiver,
    version: &str,
    install_root: &Path,
    log: &mut NoticeLog,
) -> Result<(), PipelineError> {
    let archive = source.locate(version).map_err(|e| {
        PipelineError::environment(format!(
            "Unable to obtain runtime {}: {}",
            version,
            describe(&e)
        ))
    })?;

    let scratch = tempfile::Builder::new()
        .prefix(".siteforge-runtime-")
        .tempdir_in(install_root)
        .map_err(|e| {
            PipelineError::environment(format!(
                "Unable to create a temporary directory in {}: {}",
                install_root.display(),
                e
            ))
        })?;

    let report = archiver.extract(&archive, scratch.path()).map_err(|e| {
        PipelineError::environment(format!(
            "Unable to extract runtime {}: {}",
            archive.display(),
            describe(&e)
        ))
    })?;
    let top = report.top_level.ok_or_else(|| {
        PipelineError::environment(format!(
            "Runtime archive must contain a single top-level directory: {}",
            archive.display()
        ))
    })?;
    let runtime_root = scratch.path().join(top);
    if !runtime_root.join(CORE_DIR).is_dir() {
        return Err(PipelineError::environment(format!(
            "Runtime archive has no ./{CORE_DIR}/ directory: {}",
            archive.display()
        )));
    }

    let entries = std::fs::read_dir(&runtime_root).map_err(|e| {
        PipelineError::environment(format!(
            "Unable to read {}: {}",
            runtime_root.display(),
            e
        ))
    })?;

    let mut kept = Vec::new();
    for entry in entries.flatten() {
        let name = entry.file_name().to_string_lossy().to_string();
        if name == CORE_DIR || KEPT_FILES.contains(&name.as_str()) {
            kept.push(name);
        } else if let Err(e) = remove_path(&entry.path()) {
            tracing::debug!("{:#}", e);
        }
    }
    kept.sort();

    let mut placed = 0usize;
    for name in kept {
        let from = runtime_root.join(&name);
        let target_name = if name == HTACCESS_SOURCE {
            HTACCESS_TARGET
        } else {
            name.as_str()
        };
        let to = install_root.join(target_name);
        if to.exists() {
            log.error(PipelineError::relocation(format!(
                "Unable to place ./{}: {} already exists",
                target_name,
                to.display()
            )));
            continue;
        }
        match move_tree(&from, &to, None) {
            Ok(()) => placed += 1,
            Err(e) => log.error(PipelineError::relocation(format!(
                "Unable to move runtime entry {}: {}",
                name,
                describe(&e)
            ))),
        }
    }

    log.message(format!(
        "Placed runtime {} in {} ({} entries)",
        version,
        install_root.display(),
        placed
    ));
    Ok(())
}
