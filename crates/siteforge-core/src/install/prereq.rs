//! Staging tree and destination checks run before any database work.

use crate::error::PipelineError;
use crate::fs::{dir_is_writable, file_is_writable};
use crate::notice::NoticeLog;
use crate::site::layout::{ASSETS_DIR, CONFIG_FILE, MODULES_DIR};
use crate::site::{Destination, SiteTree, Topology};

/// Run every check, logging all hard failures.
///
/// Returns the last hard failure as the halting error; earlier ones are
/// already in the log.
pub fn check_prerequisites(
    tree: &SiteTree,
    destination: &Destination,
    topology: Topology,
    log: &mut NoticeLog,
) -> Result<(), PipelineError> {
    let mut failures = destination_failures(destination, topology);

    if !dir_is_writable(&tree.assets()) {
        failures.push(PipelineError::environment(format!(
            "Directory ./{ASSETS_DIR}/ must exist and be writable: {}",
            tree.assets().display()
        )));
    }

    if !dir_is_writable(&tree.modules()) {
        log.warning(format!(
            "Directory ./{MODULES_DIR}/ is missing or not writable; module installs from the admin will not work"
        ));
    }

    if !tree.install_sql().is_file() {
        failures.push(PipelineError::environment(format!(
            "Profile is missing install/install.sql: {}",
            tree.install_sql().display()
        )));
    }

    if !file_is_writable(&tree.config_file()) {
        failures.push(PipelineError::environment(format!(
            "File ./{CONFIG_FILE} must exist and be writable: {}",
            tree.config_file().display()
        )));
    }

    match failures.pop() {
        Some(last) => {
            for failure in failures {
                log.error(failure);
            }
            Err(last)
        }
        None => {
            log.message("Prerequisites OK");
            Ok(())
        }
    }
}

fn destination_failures(destination: &Destination, topology: Topology) -> Vec<PipelineError> {
    let mut failures = Vec::new();
    match topology {
        Topology::MultiTenant => {
            if destination.site_dir.exists() {
                failures.push(PipelineError::environment(format!(
                    "Target directory already exists: {}",
                    destination.site_dir.display()
                )));
            }
        }
        Topology::Standalone => {
            let root = destination
                .install_root
                .as_deref()
                .unwrap_or(destination.site_dir.as_path());
            if !root.is_dir() {
                failures.push(PipelineError::environment(format!(
                    "Install path does not exist: {}",
                    root.display()
                )));
            } else if destination.site_dir.exists() {
                failures.push(PipelineError::environment(format!(
                    "Install path already contains a site: {}",
                    destination.site_dir.display()
                )));
            }
        }
    }
    failures
}
