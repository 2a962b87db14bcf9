//! Canonical artifact names
//!
//! `<display name>_<kind>` lowercased, spaces and dots replaced by
//! underscores, with the doubled kind suffix collapsed:
//!   "My Tool" plugin        → my_tool_plugin.apk
//!   "Map Plugin" plugin     → map_plugin.apk
//!   "v1.2 Viewer" app       → v1_2_viewer_app.apk

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use same_file::is_same_file;
use tracing::info;

use crate::bundle::FileCallback;
use crate::error::{Result, TaktoolError};
use crate::record::ArtifactRecord;

const DEFAULT_EXTENSION: &str = "apk";
const DOUBLED_SUFFIXES: &[(&str, &str)] = &[("_plugin_plugin", "_plugin"), ("_app_app", "_app")];

/// Normalize a raw name. Applying it twice gives the same result as once.
pub fn normalize_name(name: &str) -> String {
    let mut name = name.to_lowercase().replace([' ', '.'], "_");

    for (doubled, single) in DOUBLED_SUFFIXES {
        while name.contains(doubled) {
            name = name.replace(doubled, single);
        }
    }
    name
}

/// Canonical file name for a record, keeping the artifact's extension.
pub fn canonical_file_name(record: &ArtifactRecord) -> String {
    let stem = normalize_name(&format!("{}_{}", record.display_name, record.kind));
    let extension = record
        .artifact_path
        .extension()
        .map(|e| e.to_string_lossy().to_string())
        .unwrap_or_else(|| DEFAULT_EXTENSION.to_string());
    format!("{stem}.{extension}")
}

/// A file at `to` left over from an earlier run. On case-insensitive
/// filesystems `to` may name the artifact itself.
fn is_stale(from: &Path, to: &Path) -> bool {
    to.exists() && !is_same_file(from, to).unwrap_or(false)
}

/// Rename every artifact to its canonical name and update the records.
/// Returns how many files were renamed.
pub fn normalize(
    workdir: &Path,
    records: &mut [ArtifactRecord],
    on_file: FileCallback<'_>,
) -> Result<usize> {
    // Paths held by records in this run; these are never overwritten
    let mut claimed: HashSet<PathBuf> = records.iter().map(|r| r.artifact_path.clone()).collect();
    let mut renamed = 0;

    for record in records.iter_mut() {
        let current = record.artifact_path.clone();
        let parent = current.parent().map(Path::to_path_buf).unwrap_or_default();
        let target = parent.join(canonical_file_name(record));

        if target == current {
            continue;
        }
        if claimed.contains(&target) {
            return Err(TaktoolError::Format {
                path: workdir.join(&current),
                message: format!(
                    "canonical name {} is already used by another artifact",
                    target.display()
                ),
            });
        }

        let from = workdir.join(&current);
        let to = workdir.join(&target);
        if is_stale(&from, &to) {
            fs::remove_file(&to).map_err(|e| TaktoolError::io(&to, e))?;
        }
        fs::rename(&from, &to).map_err(|e| TaktoolError::io(&from, e))?;

        info!(from = %current.display(), to = %target.display(), "renamed artifact");
        if let Some(f) = on_file {
            f(
                "RENAME",
                &format!("{} -> {}", current.display(), target.display()),
            );
        }

        claimed.remove(&current);
        claimed.insert(target.clone());
        record.artifact_path = target;
        renamed += 1;
    }

    Ok(renamed)
}
