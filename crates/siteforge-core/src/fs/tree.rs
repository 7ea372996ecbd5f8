//! Moving, copying and probing directory trees.

use std::fs;
use std::path::Path;

use anyhow::Context;

/// Move `src` to `dst`, copying across devices when a rename cannot.
///
/// `file_mode` is applied to every copied file when the copy path is taken.
pub fn move_tree(src: &Path, dst: &Path, file_mode: Option<u32>) -> anyhow::Result<()> {
    match fs::rename(src, dst) {
        Ok(()) => Ok(()),
        Err(err) if is_cross_device_os_error(&err) => {
            tracing::debug!(
                "rename {} -> {} crossed devices, copying instead",
                src.display(),
                dst.display()
            );
            copy_then_remove(src, dst, file_mode)
        }
        Err(err) => Err(anyhow::Error::new(err).context(format!(
            "Failed to move {} to {}",
            src.display(),
            dst.display()
        ))),
    }
}

/// Copy `src` into `dst` and remove `src` once the copy is complete.
pub fn copy_then_remove(src: &Path, dst: &Path, file_mode: Option<u32>) -> anyhow::Result<()> {
    let meta = fs::symlink_metadata(src)
        .with_context(|| format!("Failed to stat source: {}", src.display()))?;
    if meta.is_dir() {
        fs::create_dir_all(dst)
            .with_context(|| format!("Failed to create directory: {}", dst.display()))?;
        copy_tree(src, dst, file_mode)?;
    } else {
        copy_file(src, dst, file_mode)?;
    }
    remove_path(src)
}

/// Copy the contents of `src` into the existing directory `dst`.
///
/// Symlinks and other special entries abort the copy.
pub fn copy_tree(src: &Path, dst: &Path, file_mode: Option<u32>) -> anyhow::Result<()> {
    let mut pending = vec![(src.to_path_buf(), dst.to_path_buf())];
    while let Some((from_dir, to_dir)) = pending.pop() {
        let entries = fs::read_dir(&from_dir)
            .with_context(|| format!("Failed to read dir: {}", from_dir.display()))?;
        for entry in entries {
            let entry = entry
                .with_context(|| format!("Failed to read dir entry: {}", from_dir.display()))?;
            let from = entry.path();
            let to = to_dir.join(entry.file_name());
            let meta = fs::symlink_metadata(&from)
                .with_context(|| format!("Failed to stat {}", from.display()))?;

            if meta.is_dir() {
                fs::create_dir_all(&to)
                    .with_context(|| format!("Failed to create directory: {}", to.display()))?;
                pending.push((from, to));
            } else if meta.is_file() {
                copy_file(&from, &to, file_mode)?;
            } else {
                anyhow::bail!("Refusing to copy special file {}", from.display());
            }
        }
    }
    Ok(())
}

fn copy_file(from: &Path, to: &Path, file_mode: Option<u32>) -> anyhow::Result<()> {
    fs::copy(from, to).with_context(|| {
        format!(
            "Failed to copy file from {} to {}",
            from.display(),
            to.display()
        )
    })?;
    if let Some(mode) = file_mode {
        set_mode(to, mode)?;
    }
    Ok(())
}

/// Remove a file, symlink or whole directory tree.
pub fn remove_path(path: &Path) -> anyhow::Result<()> {
    let is_dir = fs::symlink_metadata(path)
        .map(|meta| meta.is_dir())
        .with_context(|| format!("Failed to stat {}", path.display()))?;
    let removed = if is_dir {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    };
    removed.with_context(|| format!("Failed to remove {}", path.display()))
}

/// Create `path` (and parents) and apply `mode` to the leaf directory.
pub fn create_dir_with_mode(path: &Path, mode: u32) -> anyhow::Result<()> {
    fs::create_dir_all(path)
        .with_context(|| format!("Failed to create directory: {}", path.display()))?;
    set_mode(path, mode)
}

#[cfg(unix)]
pub fn set_mode(path: &Path, mode: u32) -> anyhow::Result<()> {
    use std::os::unix::fs::PermissionsExt;

    fs::set_permissions(path, fs::Permissions::from_mode(mode))
        .with_context(|| format!("Failed to set mode {:o} on {}", mode, path.display()))
}

#[cfg(not(unix))]
pub fn set_mode(_path: &Path, _mode: u32) -> anyhow::Result<()> {
    Ok(())
}

/// Whether a file can be created inside `dir`.
pub fn dir_is_writable(dir: &Path) -> bool {
    dir.is_dir() && tempfile::tempfile_in(dir).is_ok()
}

/// Whether `file` exists and can be opened for appending.
pub fn file_is_writable(file: &Path) -> bool {
    file.is_file()
        && fs::OpenOptions::new()
            .append(true)
            .open(file)
            .is_ok()
}

fn is_cross_device_os_error(err: &std::io::Error) -> bool {
    err.kind() == std::io::ErrorKind::CrossesDevices
}
