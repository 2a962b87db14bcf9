pub mod bundle;
pub mod config;
pub mod error;
pub mod extractor;
pub mod icon;
pub mod inventory;
pub mod manifest;
pub mod reconcile;
pub mod record;
pub mod rename;

#[cfg(test)]
pub(crate) mod testing;

pub use bundle::{BundleReport, Bundler, FileCallback, ARTIFACT_MARKER, INVENTORY_ENTRY};
pub use config::{BundleConfig, Config};
pub use error::{Result, TaktoolError};
pub use extractor::{content_digest, Extractor};
pub use icon::{IconSource, OverrideIcons, PLACEHOLDER_PNG};
pub use inventory::{FIELD_COUNT, INVENTORY_HEADER};
pub use manifest::{ApkManifestParser, Element, ManifestDocument, ManifestParser};
pub use reconcile::{reconcile, Reconciliation};
pub use record::{ArtifactRecord, Kind};
pub use rename::{canonical_file_name, normalize_name};
