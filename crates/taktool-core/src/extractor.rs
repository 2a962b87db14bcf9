//! Artifact metadata extraction
//!
//! Walks a [`ManifestDocument`] and folds the attributes of interest into an
//! [`ArtifactRecord`]. Every field keeps the first non-empty value seen;
//! later duplicates are ignored.

use std::fs::{self, File};
use std::io;
use std::path::Path;

use sha2::{Digest, Sha256};
use tracing::debug;

use crate::error::{Result, TaktoolError};
use crate::manifest::{ManifestDocument, ManifestParser};
use crate::record::{sanitize, ArtifactRecord, Kind, MIN_PLATFORM_VERSION};

const ELEMENT_MANIFEST: &str = "manifest";
const ELEMENT_APPLICATION: &str = "application";
const ELEMENT_META_DATA: &str = "meta-data";

/// Meta-data key naming the minimum host version a plugin needs
const META_HOST_VERSION: &str = "plugin-api";
/// Meta-data key used as description when the application has none
const META_DESCRIPTION: &str = "app_desc";

#[derive(Debug, Default)]
struct ManifestFields {
    package: Option<String>,
    version_name: Option<String>,
    version_code: Option<String>,
    label: Option<String>,
    description: Option<String>,
    icon: Option<String>,
    host_version: Option<String>,
}

fn set_once(slot: &mut Option<String>, value: Option<&str>) {
    if slot.is_some() {
        return;
    }
    if let Some(value) = value.map(sanitize).filter(|v| !v.is_empty()) {
        *slot = Some(value);
    }
}

impl ManifestFields {
    fn collect(document: &ManifestDocument) -> Self {
        let mut fields = Self::default();

        for element in &document.elements {
            match element.name.as_str() {
                ELEMENT_MANIFEST => {
                    set_once(&mut fields.package, element.attr("package"));
                    set_once(&mut fields.version_name, element.attr("versionName"));
                    set_once(&mut fields.version_code, element.attr("versionCode"));
                }
                ELEMENT_APPLICATION => {
                    set_once(&mut fields.label, element.attr("label"));
                    set_once(&mut fields.description, element.attr("description"));
                    set_once(&mut fields.icon, element.attr("icon"));
                }
                ELEMENT_META_DATA => match element.attr("name") {
                    Some(META_HOST_VERSION) => {
                        set_once(&mut fields.host_version, element.attr("value"));
                    }
                    // Only fills in when the application element had no description
                    Some(META_DESCRIPTION) => {
                        set_once(&mut fields.description, element.attr("value"));
                    }
                    _ => {}
                },
                _ => {}
            }
        }

        fields
    }
}

pub struct Extractor<'a> {
    parser: &'a dyn ManifestParser,
    platform: String,
}

impl<'a> Extractor<'a> {
    pub fn new(parser: &'a dyn ManifestParser, platform: impl Into<String>) -> Self {
        Self {
            parser,
            platform: platform.into(),
        }
    }

    /// Build the record for `relative`, a path inside `workdir`.
    pub fn extract(&self, workdir: &Path, relative: &Path) -> Result<ArtifactRecord> {
        let path = workdir.join(relative);
        let document = self.parser.parse(&path)?;
        let mut record = self.record_from_document(&path, &document)?;
        record.artifact_path = relative.to_path_buf();

        let metadata = fs::metadata(&path).map_err(|e| TaktoolError::io(&path, e))?;
        record.size_bytes = metadata.len();
        record.digest = content_digest(&path)?;

        debug!(
            artifact = %relative.display(),
            identity = %record.identity,
            revision = %record.revision,
            "extracted artifact metadata"
        );
        Ok(record)
    }

    fn record_from_document(&self, path: &Path, document: &ManifestDocument) -> Result<ArtifactRecord> {
        let fields = ManifestFields::collect(document);

        let identity = fields.package.ok_or_else(|| TaktoolError::Format {
            path: path.to_path_buf(),
            message: "manifest has no package name".to_string(),
        })?;

        Ok(ArtifactRecord {
            platform: self.platform.clone(),
            kind: Kind::from_identity(&identity),
            identity,
            display_name: fields.label.unwrap_or_default(),
            version: fields.version_name.unwrap_or_default(),
            revision: fields.version_code.unwrap_or_default(),
            artifact_path: path.to_path_buf(),
            icon_ref: fields.icon.unwrap_or_default(),
            description: fields.description.unwrap_or_default(),
            digest: String::new(),
            min_platform_version: MIN_PLATFORM_VERSION,
            min_host_version: fields.host_version.unwrap_or_default(),
            size_bytes: 0,
        })
    }
}

/// SHA-256 of the file contents as lowercase hex, streamed.
pub fn content_digest(path: &Path) -> Result<String> {
    let mut file = File::open(path).map_err(|e| TaktoolError::io(path, e))?;
    let mut hasher = Sha256::new();
    io::copy(&mut file, &mut hasher).map_err(|e| TaktoolError::io(path, e))?;
    Ok(hex::encode(hasher.finalize()))
}
