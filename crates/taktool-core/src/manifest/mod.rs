//! Manifest Module
//!
//! Turns an installable artifact into a [`ManifestDocument`]: the ordered
//! list of elements and attributes of its embedded manifest.
//!
//! - `binary`: chunk and string pool primitives
//! - `arsc`: resource table used to resolve `@string/...` style references
//! - `axml`: binary XML decoding of `AndroidManifest.xml`
//!
//! The [`ManifestParser`] trait is the seam the extractor depends on, so
//! tests and other front ends can supply documents without real APKs.

mod arsc;
mod axml;
mod binary;

use std::fs::File;
use std::io::Read;
use std::path::Path;

use zip::result::ZipError;
use zip::ZipArchive;

use crate::error::{Result, TaktoolError};

const ANDROID_MANIFEST: &str = "AndroidManifest.xml";
const RESOURCES_ARSC: &str = "resources.arsc";

/// One manifest element with its attributes in document order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Element {
    pub name: String,
    pub attributes: Vec<(String, String)>,
}

impl Element {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
        }
    }

    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.push((name.into(), value.into()));
        self
    }

    /// First value of the named attribute
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ManifestDocument {
    pub elements: Vec<Element>,
}

impl ManifestDocument {
    pub fn new(elements: Vec<Element>) -> Self {
        Self { elements }
    }
}

/// Produces the manifest document of one artifact.
pub trait ManifestParser {
    fn parse(&self, artifact: &Path) -> Result<ManifestDocument>;
}

/// Reads `AndroidManifest.xml` and `resources.arsc` straight from an APK.
#[derive(Debug, Clone, Copy, Default)]
pub struct ApkManifestParser;

impl ManifestParser for ApkManifestParser {
    fn parse(&self, artifact: &Path) -> Result<ManifestDocument> {
        let file = File::open(artifact).map_err(|e| TaktoolError::io(artifact, e))?;
        let mut archive = ZipArchive::new(file).map_err(|e| TaktoolError::Parse {
            path: artifact.to_path_buf(),
            message: format!("failed to open the APK: {e}"),
        })?;

        let resource_error = |message: String| TaktoolError::Resource {
            path: artifact.to_path_buf(),
            message,
        };
        let table = match read_entry(&mut archive, RESOURCES_ARSC)
            .map_err(|e| resource_error(e.to_string()))?
        {
            Some(bytes) => Some(
                arsc::ResourceTable::decode(&bytes).map_err(|e| resource_error(e.to_string()))?,
            ),
            None => None,
        };

        let parse_error = |message: String| TaktoolError::Parse {
            path: artifact.to_path_buf(),
            message,
        };
        let manifest = read_entry(&mut archive, ANDROID_MANIFEST)
            .map_err(|e| parse_error(e.to_string()))?
            .ok_or_else(|| parse_error(format!("{ANDROID_MANIFEST} not found")))?;

        let elements = axml::decode(&manifest, table.as_ref())
            .map_err(|e| parse_error(format!("failed to parse {ANDROID_MANIFEST}: {e}")))?;

        Ok(ManifestDocument::new(elements))
    }
}

fn read_entry(
    archive: &mut ZipArchive<File>,
    name: &str,
) -> std::result::Result<Option<Vec<u8>>, ZipError> {
    let mut entry = match archive.by_name(name) {
        Ok(entry) => entry,
        Err(ZipError::FileNotFound) => return Ok(None),
        Err(e) => return Err(e),
    };
    let mut buf = Vec::with_capacity(entry.size() as usize);
    entry.read_to_end(&mut buf)?;
    Ok(Some(buf))
}
