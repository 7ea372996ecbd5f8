//! Move the finished staging tree to its final location.

use crate::error::{PipelineError, describe};
use crate::fs::{move_tree, remove_path};
use crate::notice::NoticeLog;
use crate::site::{Destination, SiteTree};

pub fn relocate_site(
    staged: &SiteTree,
    destination: &Destination,
    log: &mut NoticeLog,
) -> Result<SiteTree, PipelineError> {
    if !staged.root().is_dir() {
        return Err(PipelineError::relocation(format!(
            "Staging directory is missing: {}",
            staged.root().display()
        )));
    }

    let install = staged.install();
    if install.exists()
        && let Err(e) = remove_path(&install)
    {
        log.warning(format!("Unable to remove installer files: {}", describe(&e)));
    }

    let target = &destination.site_dir;
    if target.exists() {
        return Err(PipelineError::relocation(format!(
            "Destination already exists: {}",
            target.display()
        )));
    }

    move_tree(staged.root(), target, None).map_err(|e| {
        PipelineError::relocation(format!(
            "Unable to move {} to {}: {}",
            staged.root().display(),
            target.display(),
            describe(&e)
        ))
    })?;

    log.message(format!("Moved site to {}", target.display()));
    Ok(SiteTree::new(target.clone()))
}
