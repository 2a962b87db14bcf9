//! `product.inf` rendering
//!
//! A comment header followed by one comma separated line per record. There
//! is no escaping, so every field must already be free of commas and line
//! breaks.

use std::cmp::Ordering;
use std::path::Path;

use crate::error::{Result, TaktoolError};
use crate::record::ArtifactRecord;

pub const INVENTORY_HEADER: &str = "#platform (Android Windows or iOS), type (app or plugin), full package name, display/label, version, revision code (integer), relative path to APK file, relative path to icon file, description, apk hash, os requirement, tak prereq (e.g. plugin-api), apk size";

pub const FIELD_COUNT: usize = 13;

fn compare(a: &ArtifactRecord, b: &ArtifactRecord) -> Ordering {
    a.platform
        .cmp(&b.platform)
        .then_with(|| a.kind.as_str().cmp(b.kind.as_str()))
        .then_with(|| a.identity.cmp(&b.identity))
        .then_with(|| a.display_name.cmp(&b.display_name))
        .then_with(|| a.version.cmp(&b.version))
}

/// Stable sort by (platform, kind, identity, display name, version).
pub fn sort_records(records: &mut [ArtifactRecord]) {
    records.sort_by(compare);
}

/// Fields that are not sanitized on extraction are checked here instead.
fn checked_field(record: &ArtifactRecord, name: &str, value: String) -> Result<String> {
    if value.contains([',', '\n', '\r']) {
        return Err(TaktoolError::Format {
            path: record.artifact_path.clone(),
            message: format!("{name} '{value}' cannot be written to the inventory"),
        });
    }
    Ok(value)
}

fn path_field(record: &ArtifactRecord, path: &Path) -> Result<String> {
    checked_field(record, "file name", path.to_string_lossy().replace('\\', "/"))
}

/// One inventory line, without the line break.
pub fn render_line(record: &ArtifactRecord) -> Result<String> {
    let platform = checked_field(record, "platform", record.platform.clone())?;
    let artifact_path = path_field(record, &record.artifact_path)?;
    let icon_path = path_field(record, Path::new(&record.icon_ref))?;

    let fields: [String; FIELD_COUNT] = [
        platform,
        record.kind.to_string(),
        record.identity.clone(),
        record.display_name.clone(),
        record.version.clone(),
        record.revision.clone(),
        artifact_path,
        icon_path,
        record.description.clone(),
        record.digest.clone(),
        record.min_platform_version.to_string(),
        record.min_host_version.clone(),
        record.size_bytes.to_string(),
    ];
    Ok(fields.join(","))
}

/// Render the full inventory. Records are sorted on a copy; the input
/// order does not affect the output.
pub fn build(records: &[ArtifactRecord]) -> Result<String> {
    let mut sorted: Vec<&ArtifactRecord> = records.iter().collect();
    sorted.sort_by(|a, b| compare(a, b));

    let mut inventory = String::from(INVENTORY_HEADER);
    for record in sorted {
        inventory.push('\n');
        inventory.push_str(&render_line(record)?);
    }
    Ok(inventory)
}
