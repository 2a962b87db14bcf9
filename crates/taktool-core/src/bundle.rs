//! Plugin bundle assembly
//!
//! Ties the pipeline together for one working directory:
//!
//! ```text
//! *.apk ──extract──▶ records ──reconcile──▶ survivors ──rename──▶ canonical names
//!                                                              │
//!        product.infz ◀── icons + product.inf ◀────────────────┘
//! ```
//!
//! The archive is written to a temporary file next to the artifacts and
//! moved into place only once it is complete.

use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::{debug, info};
use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

use crate::config::BundleConfig;
use crate::error::{Result, TaktoolError};
use crate::extractor::Extractor;
use crate::icon::{write_icon, OverrideIcons};
use crate::inventory;
use crate::manifest::{ApkManifestParser, ManifestParser};
use crate::reconcile::reconcile;
use crate::record::ArtifactRecord;
use crate::rename::normalize;

/// Callback type for file operation progress reporting: (status, subject)
pub type FileCallback<'a> = Option<&'a dyn Fn(&str, &str)>;

/// Inventory entry name inside the bundle
pub const INVENTORY_ENTRY: &str = "product.inf";

/// Files whose name contains this are treated as artifacts
pub const ARTIFACT_MARKER: &str = ".apk";

#[derive(Debug, Default)]
pub struct BundleReport {
    /// Absolute path of the written archive
    pub output: PathBuf,
    /// Bundled records, in inventory order
    pub records: Vec<ArtifactRecord>,
    /// Records dropped as older revisions
    pub removed: Vec<ArtifactRecord>,
    pub renamed: usize,
}

pub struct Bundler {
    workdir: PathBuf,
    config: BundleConfig,
    parser: Box<dyn ManifestParser>,
}

impl Bundler {
    pub fn new(workdir: PathBuf, config: BundleConfig) -> Self {
        Self::with_parser(workdir, config, Box::new(ApkManifestParser))
    }

    pub fn with_parser(
        workdir: PathBuf,
        config: BundleConfig,
        parser: Box<dyn ManifestParser>,
    ) -> Self {
        Self {
            workdir,
            config,
            parser,
        }
    }

    pub fn workdir(&self) -> &Path {
        &self.workdir
    }

    pub fn output_path(&self) -> PathBuf {
        self.workdir.join(&self.config.output)
    }

    fn ensure_workdir(&self) -> Result<()> {
        if !self.workdir.is_dir() {
            return Err(TaktoolError::WorkdirNotFound {
                path: self.workdir.clone(),
            });
        }
        Ok(())
    }

    /// Artifact files directly inside the working directory, sorted by name.
    pub fn find_artifacts(&self) -> Result<Vec<PathBuf>> {
        self.ensure_workdir()?;

        let mut artifacts = Vec::new();
        for entry in WalkDir::new(&self.workdir).min_depth(1).max_depth(1) {
            let entry = entry.map_err(|e| {
                let path = e.path().unwrap_or(&self.workdir).to_path_buf();
                TaktoolError::io(path, e.into())
            })?;
            // Follows symlinks; dangling links are skipped
            if !entry.path().is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy();
            if name.contains(ARTIFACT_MARKER) {
                artifacts.push(PathBuf::from(entry.file_name()));
            }
        }

        artifacts.sort();
        Ok(artifacts)
    }

    /// Extract the record of a single artifact without changing anything.
    pub fn inspect(&self, relative: &Path) -> Result<ArtifactRecord> {
        let extractor = Extractor::new(self.parser.as_ref(), self.config.platform.as_str());
        extractor.extract(&self.workdir, relative)
    }

    /// Build the bundle archive. Any failure aborts the whole run and leaves
    /// a previously written archive untouched.
    pub fn bundle(&self, on_file: FileCallback<'_>) -> Result<BundleReport> {
        let candidates = self.find_artifacts()?;
        debug!(count = candidates.len(), workdir = %self.workdir.display(), "found artifacts");

        let extractor = Extractor::new(self.parser.as_ref(), self.config.platform.as_str());
        let records = candidates
            .iter()
            .map(|relative| extractor.extract(&self.workdir, relative))
            .collect::<Result<Vec<_>>>()?;

        let mut report = BundleReport {
            output: self.output_path(),
            ..Default::default()
        };

        let mut records = if self.config.rename {
            let reconciled = reconcile(&self.workdir, records, on_file)?;
            report.removed = reconciled.removed;
            let mut kept = reconciled.kept;
            report.renamed = normalize(&self.workdir, &mut kept, on_file)?;
            kept
        } else {
            records
        };

        self.write_archive(&mut records, on_file)?;
        inventory::sort_records(&mut records);
        report.records = records;

        info!(
            output = %report.output.display(),
            artifacts = report.records.len(),
            removed = report.removed.len(),
            renamed = report.renamed,
            "bundle created"
        );
        Ok(report)
    }

    fn write_archive(&self, records: &mut [ArtifactRecord], on_file: FileCallback<'_>) -> Result<()> {
        let output = self.output_path();
        let overrides = OverrideIcons::scan(&self.workdir.join(&self.config.images_dir))?;
        debug!(count = overrides.len(), "custom icons available");

        let mut tmp =
            NamedTempFile::new_in(&self.workdir).map_err(|e| TaktoolError::io(&self.workdir, e))?;
        {
            let mut zip = ZipWriter::new(tmp.as_file_mut());

            for record in records.iter_mut() {
                write_icon(&self.workdir, record, &overrides, &mut zip, &output, on_file)?;
                if let Some(f) = on_file {
                    f("ADD", &record.file_name());
                }
            }

            let inventory = inventory::build(records)?;
            zip.start_file(INVENTORY_ENTRY, SimpleFileOptions::default())
                .map_err(|e| TaktoolError::zip(&output, e))?;
            zip.write_all(inventory.as_bytes())
                .map_err(|e| TaktoolError::io(&output, e))?;

            zip.finish().map_err(|e| TaktoolError::zip(&output, e))?;
        }

        tmp.as_file()
            .sync_all()
            .map_err(|e| TaktoolError::io(tmp.path(), e))?;
        tmp.persist(&output)
            .map_err(|e| TaktoolError::io(&output, e.error))?;
        Ok(())
    }
}
