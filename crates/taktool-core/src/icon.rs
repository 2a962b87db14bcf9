//! Icon resolution
//!
//! Each bundled artifact gets one PNG entry named after the artifact. The
//! bytes come from, in order of preference:
//! 1. a custom image in the override directory with exactly that name
//! 2. a 1x1 transparent placeholder, when the manifest icon is not a PNG
//! 3. the PNG embedded in the artifact
//!
//! Images are copied verbatim, never resized.

use std::collections::HashSet;
use std::fs::{self, File};
use std::io::{self, Seek, Write};
use std::path::{Path, PathBuf};

use tracing::{info, warn};
use zip::result::ZipError;
use zip::write::SimpleFileOptions;
use zip::{ZipArchive, ZipWriter};

use crate::bundle::FileCallback;
use crate::error::{Result, TaktoolError};
use crate::record::ArtifactRecord;

pub const ICON_EXTENSION: &str = "png";

/// Smallest valid PNG: 1x1 pixel, fully transparent
pub const PLACEHOLDER_PNG: &[u8] = &[
    0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x48, 0x44,
    0x52, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x08, 0x06, 0x00, 0x00, 0x00, 0x1F,
    0x15, 0xC4, 0x89, 0x00, 0x00, 0x00, 0x0A, 0x49, 0x44, 0x41, 0x54, 0x78, 0x9C, 0x63, 0x00,
    0x01, 0x00, 0x00, 0x05, 0x00, 0x01, 0x0D, 0x0A, 0x2D, 0xB4, 0x00, 0x00, 0x00, 0x00, 0x49,
    0x45, 0x4E, 0x44, 0xAE, 0x42, 0x60, 0x82,
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IconSource {
    /// Custom image from the override directory
    Override(PathBuf),
    /// Entry copied from inside the artifact
    Embedded(String),
    Placeholder,
}

/// Custom icons available in the override directory
#[derive(Debug, Default)]
pub struct OverrideIcons {
    dir: PathBuf,
    names: HashSet<String>,
}

impl OverrideIcons {
    /// List PNG files in `dir`. A missing directory yields an empty set.
    pub fn scan(dir: &Path) -> Result<Self> {
        let mut names = HashSet::new();
        if !dir.is_dir() {
            return Ok(Self {
                dir: dir.to_path_buf(),
                names,
            });
        }

        for entry in fs::read_dir(dir).map_err(|e| TaktoolError::io(dir, e))? {
            let entry = entry.map_err(|e| TaktoolError::io(dir, e))?;
            if !entry.path().is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().to_string();
            if name.ends_with(&format!(".{ICON_EXTENSION}")) {
                names.insert(name);
            }
        }

        Ok(Self {
            dir: dir.to_path_buf(),
            names,
        })
    }

    pub fn get(&self, name: &str) -> Option<PathBuf> {
        self.names.contains(name).then(|| self.dir.join(name))
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Bundle entry name for an artifact's icon: the file name with a png extension.
pub fn icon_entry_name(artifact_path: &Path) -> String {
    let file_name = artifact_path
        .file_name()
        .map(PathBuf::from)
        .unwrap_or_default();
    file_name
        .with_extension(ICON_EXTENSION)
        .to_string_lossy()
        .to_string()
}

fn references_png(icon_ref: &str) -> bool {
    Path::new(icon_ref)
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case(ICON_EXTENSION))
}

/// Decide where the icon comes from, before touching the artifact.
pub fn choose_source(record: &ArtifactRecord, overrides: &OverrideIcons) -> IconSource {
    let entry_name = icon_entry_name(&record.artifact_path);
    if let Some(path) = overrides.get(&entry_name) {
        return IconSource::Override(path);
    }
    if !references_png(&record.icon_ref) {
        return IconSource::Placeholder;
    }
    IconSource::Embedded(record.icon_ref.clone())
}

/// Write the record's icon into `zip` and point `icon_ref` at the new entry.
pub fn write_icon<W: Write + Seek>(
    workdir: &Path,
    record: &mut ArtifactRecord,
    overrides: &OverrideIcons,
    zip: &mut ZipWriter<W>,
    bundle_path: &Path,
    on_file: FileCallback<'_>,
) -> Result<IconSource> {
    let entry_name = icon_entry_name(&record.artifact_path);
    let zip_err = |e: ZipError| TaktoolError::zip(bundle_path, e);

    let source = match choose_source(record, overrides) {
        IconSource::Override(path) => {
            let mut file = File::open(&path).map_err(|e| TaktoolError::io(&path, e))?;
            zip.start_file(entry_name.as_str(), SimpleFileOptions::default())
                .map_err(zip_err)?;
            io::copy(&mut file, zip).map_err(|e| TaktoolError::io(&path, e))?;
            info!(artifact = %record.artifact_path.display(), icon = %entry_name, "using custom icon");
            if let Some(f) = on_file {
                f("CUSTOM", &entry_name);
            }
            IconSource::Override(path)
        }
        IconSource::Embedded(icon_ref) => {
            let artifact = workdir.join(&record.artifact_path);
            if copy_embedded(&artifact, &icon_ref, &entry_name, zip, bundle_path)? {
                if let Some(f) = on_file {
                    f("ICON", &entry_name);
                }
                IconSource::Embedded(icon_ref)
            } else {
                warn!(
                    artifact = %record.artifact_path.display(),
                    icon = %icon_ref,
                    "icon not found in artifact, using placeholder"
                );
                write_placeholder(zip, &entry_name, bundle_path, on_file)?
            }
        }
        IconSource::Placeholder => {
            info!(
                artifact = %record.artifact_path.display(),
                icon = %record.icon_ref,
                "no png icon, using placeholder"
            );
            write_placeholder(zip, &entry_name, bundle_path, on_file)?
        }
    };

    record.icon_ref = entry_name;
    Ok(source)
}

/// Returns false when the artifact has no entry named `icon_ref`.
fn copy_embedded<W: Write + Seek>(
    artifact: &Path,
    icon_ref: &str,
    entry_name: &str,
    zip: &mut ZipWriter<W>,
    bundle_path: &Path,
) -> Result<bool> {
    let file = File::open(artifact).map_err(|e| TaktoolError::io(artifact, e))?;
    let mut archive = ZipArchive::new(file).map_err(|e| TaktoolError::zip(artifact, e))?;
    let mut icon = match archive.by_name(icon_ref) {
        Ok(icon) => icon,
        Err(ZipError::FileNotFound) => return Ok(false),
        Err(e) => return Err(TaktoolError::zip(artifact, e)),
    };

    zip.start_file(entry_name, SimpleFileOptions::default())
        .map_err(|e| TaktoolError::zip(bundle_path, e))?;
    io::copy(&mut icon, zip).map_err(|e| TaktoolError::io(artifact, e))?;
    Ok(true)
}

fn write_placeholder<W: Write + Seek>(
    zip: &mut ZipWriter<W>,
    entry_name: &str,
    bundle_path: &Path,
    on_file: FileCallback<'_>,
) -> Result<IconSource> {
    zip.start_file(entry_name, SimpleFileOptions::default())
        .map_err(|e| TaktoolError::zip(bundle_path, e))?;
    zip.write_all(PLACEHOLDER_PNG)
        .map_err(|e| TaktoolError::io(bundle_path, e))?;
    if let Some(f) = on_file {
        f("PLACEHOLDER", entry_name);
    }
    Ok(IconSource::Placeholder)
}
