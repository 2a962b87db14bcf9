//! Artifact records
//!
//! One [`ArtifactRecord`] describes one installable package found in the
//! working directory. Records are built by the extractor, pruned by the
//! reconciler, renamed by the normalizer and finally rendered as one
//! `product.inf` line each.

use std::fmt;
use std::path::PathBuf;

/// Identity suffix that marks a package as a plugin
pub const PLUGIN_SUFFIX: &str = ".plugin";

/// Value of the os requirement column; no other value is produced today
pub const MIN_PLATFORM_VERSION: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    App,
    Plugin,
}

impl Kind {
    /// Classify a package identity. Identities shorter than the suffix are apps.
    pub fn from_identity(identity: &str) -> Self {
        if has_suffix(identity, PLUGIN_SUFFIX) {
            Self::Plugin
        } else {
            Self::App
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::App => "app",
            Self::Plugin => "plugin",
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn has_suffix(value: &str, suffix: &str) -> bool {
    value.len() >= suffix.len() && value.ends_with(suffix)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactRecord {
    pub platform: String,
    pub kind: Kind,
    /// Reverse-domain package name
    pub identity: String,
    pub display_name: String,
    pub version: String,
    /// Version code; compared numerically during reconciliation
    pub revision: String,
    /// Path relative to the working directory
    pub artifact_path: PathBuf,
    /// Icon entry inside the artifact until the icon is resolved, then the
    /// icon entry name inside the bundle
    pub icon_ref: String,
    pub description: String,
    /// Lowercase hex SHA-256 of the artifact
    pub digest: String,
    pub min_platform_version: u32,
    pub min_host_version: String,
    pub size_bytes: u64,
}

impl ArtifactRecord {
    /// Revision as an integer; anything unparsable ranks lowest.
    pub fn revision_number(&self) -> i64 {
        self.revision.trim().parse().unwrap_or(0)
    }

    /// Two records with the same key are revisions of the same package.
    pub fn conflict_key(&self) -> (&str, Kind) {
        (&self.identity, self.kind)
    }

    pub fn file_name(&self) -> String {
        self.artifact_path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default()
    }
}

/// Make a value safe for the comma separated, line oriented inventory:
/// cut at the first line break and drop every comma.
pub fn sanitize(value: &str) -> String {
    let first_line = value.split(['\n', '\r']).next().unwrap_or_default();
    first_line.replace(',', "")
}
