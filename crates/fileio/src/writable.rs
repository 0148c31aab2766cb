//! Write-conflict-safe output naming.

use std::fs::OpenOptions;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Probe `path` for writability, renaming on conflict.
///
/// Opens (creating or truncating) the target; when the open is denied —
/// typically because another program holds the file — the name is retried
/// with a `_copy1`, `_copy2`, ... suffix before the extension until a
/// writable name is found. Any prior `_copyN` token is stripped first so
/// retries do not stack suffixes. Errors other than a permission denial
/// propagate; a locked destination alone never fails the caller.
pub fn writable_path(path: &Path) -> std::io::Result<PathBuf> {
    let mut candidate = path.to_path_buf();
    let mut suffix = 0u32;
    loop {
        match OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&candidate)
        {
            Ok(_) => return Ok(candidate),
            Err(err) if err.kind() == ErrorKind::PermissionDenied => {
                suffix += 1;
                candidate = with_copy_suffix(path, suffix);
                log::warn!(
                    "{} is not writable, retrying as {}",
                    path.display(),
                    candidate.display()
                );
            }
            Err(err) => return Err(err),
        }
    }
}

fn with_copy_suffix(path: &Path, suffix: u32) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let stem = strip_copy_token(&stem);
    let ext = path
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();
    let dir = path.parent().unwrap_or_else(|| Path::new(""));
    dir.join(format!("{stem}_copy{suffix}{ext}"))
}

fn strip_copy_token(stem: &str) -> &str {
    if let Some(pos) = stem.rfind("_copy") {
        let tail = &stem[pos + "_copy".len()..];
        if tail.chars().all(|c| c.is_ascii_digit()) {
            return &stem[..pos];
        }
    }
    stem
}

/// Best-effort removal of intermediate files; failures are logged, not raised.
pub fn delete_files<I, P>(paths: I)
where
    I: IntoIterator<Item = P>,
    P: AsRef<Path>,
{
    for path in paths {
        let path = path.as_ref();
        match std::fs::remove_file(path) {
            Ok(()) => log::debug!("Removed intermediate file {}", path.display()),
            Err(err) => log::warn!("Could not remove {}: {err}", path.display()),
        }
    }
}
