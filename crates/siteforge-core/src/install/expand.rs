//! Profile expansion into the staging area.

use std::path::Path;

use crate::archive::Archiver;
use crate::error::{PipelineError, describe};
use crate::notice::NoticeLog;
use crate::site::SiteTree;

/// Extract `archive` under `staging_root`.
///
/// The archive's single top-level directory becomes the staging tree.
pub fn expand_profile(
    archiver: &dyn Archiver,
    archive: &Path,
    staging_root: &Path,
    log: &mut NoticeLog,
) -> Result<SiteTree, PipelineError> {
    if !archive.is_file() {
        return Err(PipelineError::environment(format!(
            "Profile archive not found: {}",
            archive.display()
        )));
    }

    let report = archiver.extract(archive, staging_root).map_err(|e| {
        PipelineError::environment(format!(
            "Failed to extract profile {}: {}",
            archive.display(),
            describe(&e)
        ))
    })?;

    if report.entries == 0 {
        return Err(PipelineError::environment(format!(
            "empty profile: {}",
            archive.display()
        )));
    }

    let top = report.top_level.ok_or_else(|| {
        PipelineError::environment(format!(
            "Profile archive must contain a single top-level directory: {}",
            archive.display()
        ))
    })?;

    let root = staging_root.join(&top);
    if !root.is_dir() {
        return Err(PipelineError::environment(format!(
            "Expanded profile directory is missing: {}",
            root.display()
        )));
    }

    log.message(format!(
        "Extracted profile '{}' ({} entries)",
        top, report.entries
    ));
    Ok(SiteTree::new(root))
}
