//! Revision reconciliation
//!
//! Groups records by (identity, kind) and keeps one record per group: the
//! highest revision, or the later one on equal revisions. Artifacts of the
//! dropped records are deleted from the working directory.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use tracing::info;

use crate::bundle::FileCallback;
use crate::error::{Result, TaktoolError};
use crate::record::{ArtifactRecord, Kind};

#[derive(Debug, Default)]
pub struct Reconciliation {
    /// Surviving records in their original order
    pub kept: Vec<ArtifactRecord>,
    /// Records whose artifact was deleted
    pub removed: Vec<ArtifactRecord>,
}

/// Index of the record that survives within each conflict group.
fn select_survivors(records: &[ArtifactRecord]) -> Vec<bool> {
    let mut winners: HashMap<(&str, Kind), usize> = HashMap::new();

    for (index, record) in records.iter().enumerate() {
        winners
            .entry(record.conflict_key())
            .and_modify(|best| {
                if record.revision_number() >= records[*best].revision_number() {
                    *best = index;
                }
            })
            .or_insert(index);
    }

    let mut keep = vec![false; records.len()];
    for index in winners.into_values() {
        keep[index] = true;
    }
    keep
}

/// Remove superseded revisions. Deletion stops at the first failure; files
/// deleted before it stay deleted.
pub fn reconcile(
    workdir: &Path,
    records: Vec<ArtifactRecord>,
    on_file: FileCallback<'_>,
) -> Result<Reconciliation> {
    let keep = select_survivors(&records);
    let mut result = Reconciliation::default();

    for (record, keep) in records.into_iter().zip(keep) {
        if keep {
            result.kept.push(record);
            continue;
        }

        let path = workdir.join(&record.artifact_path);
        fs::remove_file(&path).map_err(|e| TaktoolError::io(&path, e))?;
        info!(
            identity = %record.identity,
            revision = %record.revision,
            artifact = %record.artifact_path.display(),
            "removed older revision"
        );
        if let Some(f) = on_file {
            f(
                "REMOVE",
                &format!("{} (revision {})", record.file_name(), record.revision),
            );
        }
        result.removed.push(record);
    }

    Ok(result)
}
