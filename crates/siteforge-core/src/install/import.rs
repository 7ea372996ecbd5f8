//! Schema restore and asset relocation inside the staging tree.

use std::path::Path;

use crate::db::dump::SqlDump;
use crate::db::{DatabaseHandle, DbEngine};
use crate::error::{PipelineError, describe};
use crate::fs::{copy_then_remove, create_dir_with_mode, set_mode};
use crate::notice::NoticeLog;
use crate::site::layout::RUNTIME_ASSET_DIRS;
use crate::site::{PermissionSet, SiteTree};

/// Tables whose presence means the CMS schema is already installed.
pub const CORE_TABLES: [&str; 5] = ["pages", "fields", "fieldgroups", "templates", "modules"];

#[derive(Debug, Clone)]
pub struct SchemaImport<'a> {
    /// Core schema dump shipped with the runtime.
    pub core_schema: &'a Path,
    pub engine: DbEngine,
    pub charset: &'a str,
    /// Restore even when the core tables already exist.
    pub force_replace: bool,
}

pub fn import_schema(
    handle: &mut dyn DatabaseHandle,
    tree: &SiteTree,
    request: &SchemaImport<'_>,
    log: &mut NoticeLog,
) -> Result<(), PipelineError> {
    let existing = handle.table_names().map_err(|e| {
        PipelineError::import(format!("Unable to inspect database tables: {}", describe(&e)))
    })?;
    let installed = CORE_TABLES
        .iter()
        .all(|t| existing.iter().any(|e| e.eq_ignore_ascii_case(t)));

    if installed && !request.force_replace {
        log.message("Database already contains the core tables; schema import skipped");
        return Ok(());
    }

    let mut dumps = Vec::with_capacity(2);
    for (label, path) in [
        ("core", request.core_schema.to_path_buf()),
        ("profile", tree.install_sql()),
    ] {
        let text = std::fs::read_to_string(&path).map_err(|e| {
            PipelineError::import(format!(
                "Unable to read {} schema {}: {}",
                label,
                path.display(),
                e
            ))
        })?;
        let mut dump = SqlDump::parse(&text);
        if dump.rewrite(request.engine, request.charset) {
            log.warning(format!(
                "Rewrote {} schema tables to ENGINE={} CHARSET={}",
                label,
                request.engine.as_str(),
                request.charset
            ));
        }
        dumps.push((label, dump));
    }

    if request.force_replace {
        for (_, dump) in &dumps {
            for table in dump.created_tables() {
                handle
                    .execute(&format!("DROP TABLE IF EXISTS `{table}`"))
                    .map_err(|e| {
                        PipelineError::import(format!(
                            "Failed to drop table '{}': {}",
                            table,
                            describe(&e)
                        ))
                    })?;
            }
        }
    }

    for (label, dump) in &dumps {
        tracing::debug!("restoring {} schema ({} statements)", label, dump.len());
        for statement in &dump.statements {
            handle.execute(statement).map_err(|e| {
                PipelineError::import(format!(
                    "Failed to restore {} schema: {}",
                    label,
                    describe(&e)
                ))
            })?;
        }
    }

    log.outcomes.schema_imported = true;
    log.message("Imported database schema");
    Ok(())
}

/// Move profile files into `assets/` and create the runtime asset dirs.
///
/// Every directory is attempted; failures are logged and the last one is
/// returned as the halting error.
pub fn import_assets(
    tree: &SiteTree,
    permissions: &PermissionSet,
    log: &mut NoticeLog,
) -> Result<(), PipelineError> {
    let dir_mode = permissions.dir_mode();
    let file_mode = permissions.file_mode();
    let assets = tree.assets();
    let mut failures = Vec::new();

    let source = tree.install_files();
    if source.is_dir() {
        match std::fs::read_dir(&source) {
            Ok(entries) => {
                for entry in entries.flatten() {
                    let from = entry.path();
                    if !from.is_dir() {
                        tracing::debug!("skipping non-directory {}", from.display());
                        continue;
                    }
                    let to = assets.join(entry.file_name());
                    match move_asset_dir(&from, &to, file_mode, dir_mode) {
                        Ok(()) => log.message(format!(
                            "Imported ./{}/",
                            relative_to(tree.root(), &to)
                        )),
                        Err(err) => failures.push(err),
                    }
                }
            }
            Err(e) => failures.push(PipelineError::environment(format!(
                "Unable to read {}: {}",
                source.display(),
                e
            ))),
        }
    } else if let Err(e) = create_dir_with_mode(&assets.join("files"), dir_mode) {
        failures.push(PipelineError::environment(describe(&e)));
    }

    for name in RUNTIME_ASSET_DIRS {
        if let Err(e) = create_dir_with_mode(&assets.join(name), dir_mode) {
            failures.push(PipelineError::environment(describe(&e)));
        }
    }

    match failures.pop() {
        Some(last) => {
            for failure in failures {
                log.error(failure);
            }
            Err(last)
        }
        None => Ok(()),
    }
}

fn move_asset_dir(
    from: &Path,
    to: &Path,
    file_mode: u32,
    dir_mode: u32,
) -> Result<(), PipelineError> {
    let renamed = !to.exists() && std::fs::rename(from, to).is_ok();
    if !renamed {
        tracing::debug!(
            "rename {} -> {} not possible, copying",
            from.display(),
            to.display()
        );
        copy_then_remove(from, to, Some(file_mode)).map_err(|e| {
            PipelineError::environment(format!(
                "Unable to copy {} to {}: {}",
                from.display(),
                to.display(),
                describe(&e)
            ))
        })?;
    }
    set_mode(to, dir_mode).map_err(|e| PipelineError::environment(describe(&e)))
}

fn relative_to(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .to_string_lossy()
        .to_string()
}
