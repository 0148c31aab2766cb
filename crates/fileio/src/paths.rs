//! Path normalization and naming conventions shared by every stage.

use std::path::{Path, PathBuf};

/// Strip matched surrounding quotes and normalize separators.
///
/// Paths arrive copy-pasted from shells and spreadsheets, so they may carry
/// quotes and a mix of `/` and `\`. A leading `\\server\share` UNC prefix is
/// preserved verbatim; everywhere else repeated separators collapse.
pub fn normalize_input_path(raw: &str) -> String {
    let mut s = raw.trim();
    if (s.starts_with('"') && s.ends_with('"') && s.len() >= 2)
        || (s.starts_with('\'') && s.ends_with('\'') && s.len() >= 2)
    {
        s = &s[1..s.len() - 1];
    }

    let unc = s.starts_with("\\\\");
    let body = if unc { &s[2..] } else { s };
    let mut parts: Vec<&str> = Vec::new();
    for piece in body.split(['/', '\\']) {
        match piece {
            "" | "." => continue,
            ".." => {
                if matches!(parts.last(), Some(&p) if p != "..") {
                    parts.pop();
                } else {
                    parts.push("..");
                }
            }
            other => parts.push(other),
        }
    }
    let sep = std::path::MAIN_SEPARATOR.to_string();
    let joined = parts.join(&sep);
    let mut out = String::new();
    if unc {
        out.push_str("\\\\");
    } else if body.starts_with(['/', '\\']) {
        out.push_str(&sep);
    }
    out.push_str(&joined);
    out
}

/// Extract the module name: the path segment directly under `Modules`.
///
/// Test-program trees follow `<base>/Modules/<MODULE>/...`; decoder and
/// configuration paths are qualified by that module segment.
pub fn module_name_from_path(path: &str) -> Option<String> {
    let mut segments = path.split(['/', '\\']).filter(|s| !s.is_empty());
    while let Some(segment) = segments.next() {
        if segment == "Modules" {
            return segments.next().map(str::to_string);
        }
    }
    None
}

/// The portion of `path` starting at its `Modules` segment, if any.
pub fn path_from_modules(path: &str) -> Option<&str> {
    path.find("Modules").map(|pos| &path[pos..])
}

/// First `base_1.ext`, `base_2.ext`, ... that does not exist yet.
pub fn unused_numbered_path(path: &Path) -> PathBuf {
    if !path.exists() {
        return path.to_path_buf();
    }
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let ext = path
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();
    let dir = path.parent().unwrap_or_else(|| Path::new(""));
    let mut i = 1;
    loop {
        let candidate = dir.join(format!("{stem}_{i}{ext}"));
        if !candidate.exists() {
            return candidate;
        }
        i += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn strips_matched_quotes() {
        let sep = std::path::MAIN_SEPARATOR;
        assert_eq!(
            normalize_input_path("\"a/b/c.csv\""),
            format!("a{sep}b{sep}c.csv")
        );
    }

    #[test]
    fn preserves_unc_prefix() {
        let normalized = normalize_input_path(r"\\server\share\file.csv");
        assert!(normalized.starts_with("\\\\"));
        assert!(normalized.contains("server"));
    }

    #[test]
    fn module_name_found_with_either_separator() {
        assert_eq!(
            module_name_from_path(r"C:\tp\Modules\CLK_PLL_BASE\dec.csv"),
            Some("CLK_PLL_BASE".to_string())
        );
        assert_eq!(
            module_name_from_path("/tp/Modules/PTH_FIVROPS/PTH_FIVROPS.mtpl"),
            Some("PTH_FIVROPS".to_string())
        );
        assert_eq!(module_name_from_path("/no/module/here.csv"), None);
    }

    #[test]
    fn numbered_path_skips_existing() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("log.csv");
        std::fs::write(&base, b"x").unwrap();
        std::fs::write(dir.path().join("log_1.csv"), b"x").unwrap();
        assert_eq!(unused_numbered_path(&base), dir.path().join("log_2.csv"));
    }
}
