//! Archive extraction for profile and runtime bundles.
//!
//! Both profiles and runtimes ship as zip archives wrapping a single
//! top-level directory.

use std::io::{Read, Write};
use std::path::{Component, Path};

use anyhow::Context;

/// Resource-fork directory added by the macOS archive utility.
const MACOS_METADATA_DIR: &str = "__MACOSX";

/// Summary of one extraction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractReport {
    /// Number of entries written (files and directories).
    pub entries: usize,
    /// Name of the single directory every entry lives under, if any.
    pub top_level: Option<String>,
}

pub trait Archiver {
    fn extract(&self, archive: &Path, dest: &Path) -> anyhow::Result<ExtractReport>;
}

/// Extracts zip archives from disk.
#[derive(Debug, Default, Clone, Copy)]
pub struct ZipArchiver;

impl ZipArchiver {
    pub fn new() -> Self {
        Self
    }
}

impl Archiver for ZipArchiver {
    fn extract(&self, archive: &Path, dest: &Path) -> anyhow::Result<ExtractReport> {
        let file = std::fs::File::open(archive)
            .with_context(|| format!("Failed to open archive: {}", archive.display()))?;
        let mut zip = zip::ZipArchive::new(file)
            .with_context(|| format!("Failed to read zip archive: {}", archive.display()))?;

        std::fs::create_dir_all(dest)
            .with_context(|| format!("Failed to create extract directory: {}", dest.display()))?;

        let mut tops = TopLevelTracker::default();
        let mut entries = 0usize;

        for i in 0..zip.len() {
            let mut file = zip
                .by_index(i)
                .with_context(|| format!("Failed to read zip entry {}", i))?;

            // Entries with unsafe paths are skipped
            let Some(relative) = file.enclosed_name() else {
                tracing::debug!("skipping unsafe zip entry {}", file.name());
                continue;
            };
            if is_macos_metadata(&relative) {
                continue;
            }
            tops.observe(&relative, file.is_dir());
            let outpath = dest.join(&relative);

            if file.is_dir() {
                std::fs::create_dir_all(&outpath).with_context(|| {
                    format!("Failed to create directory: {}", outpath.display())
                })?;
            } else {
                if let Some(parent) = outpath.parent() {
                    std::fs::create_dir_all(parent).with_context(|| {
                        format!("Failed to create parent directory: {}", parent.display())
                    })?;
                }

                let mut buffer = Vec::new();
                file.read_to_end(&mut buffer)
                    .with_context(|| format!("Failed to read zip entry: {}", file.name()))?;

                let mut outfile = std::fs::File::create(&outpath)
                    .with_context(|| format!("Failed to create file: {}", outpath.display()))?;
                outfile
                    .write_all(&buffer)
                    .with_context(|| format!("Failed to write file: {}", outpath.display()))?;

                #[cfg(unix)]
                {
                    use std::os::unix::fs::PermissionsExt;
                    if let Some(mode) = file.unix_mode() {
                        std::fs::set_permissions(
                            &outpath,
                            std::fs::Permissions::from_mode(mode & 0o7777),
                        )
                        .ok();
                    }
                }
            }
            entries += 1;
        }

        Ok(ExtractReport {
            entries,
            top_level: tops.finish(),
        })
    }
}

fn is_macos_metadata(path: &Path) -> bool {
    matches!(
        path.components().next(),
        Some(Component::Normal(first)) if first.to_str() == Some(MACOS_METADATA_DIR)
    )
}

/// Tracks whether every entry shares one leading directory.
#[derive(Debug, Default)]
struct TopLevelTracker {
    name: Option<String>,
    nested: bool,
    mixed: bool,
}

impl TopLevelTracker {
    fn observe(&mut self, path: &Path, is_dir: bool) {
        let mut components = path.components().filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().to_string()),
            _ => None,
        });
        let Some(first) = components.next() else {
            return;
        };
        let has_more = components.next().is_some();
        if has_more || is_dir {
            self.nested = true;
        } else {
            // A plain file at the archive root
            self.mixed = true;
        }
        match &self.name {
            None => self.name = Some(first),
            Some(existing) if *existing != first => self.mixed = true,
            Some(_) => {}
        }
    }

    fn finish(self) -> Option<String> {
        if self.mixed || !self.nested {
            None
        } else {
            self.name
        }
    }
}
