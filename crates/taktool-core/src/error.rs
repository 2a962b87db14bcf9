use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TaktoolError {
    #[error("Working directory does not exist: {path}")]
    WorkdirNotFound { path: PathBuf },

    #[error("No plugin artifacts found in {path}")]
    NoArtifacts { path: PathBuf },

    #[error("Failed to parse manifest of {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("Failed to read resource table of {path}: {message}")]
    Resource { path: PathBuf, message: String },

    #[error("Invalid artifact {path}: {message}")]
    Format { path: PathBuf, message: String },

    #[error("IO error on {path}: {source}")]
    ArtifactIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Archive error on {path}: {source}")]
    Zip {
        path: PathBuf,
        #[source]
        source: zip::result::ZipError,
    },

    #[error("Failed to parse config {path}: {message}")]
    ConfigParse { path: PathBuf, message: String },

    #[error("Config key not found: {key}")]
    ConfigKeyNotFound { key: String },

    #[error("Invalid value for {key}: {value}")]
    ConfigValue { key: String, value: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, TaktoolError>;

impl TaktoolError {
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Parse { .. } => 2,
            Self::Resource { .. } => 3,
            Self::Format { .. } => 4,
            Self::Zip { .. } => 5,
            Self::WorkdirNotFound { .. } => 6,
            Self::NoArtifacts { .. } => 7,
            _ => 1,
        }
    }

    /// Attach a path to a bare IO error.
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::ArtifactIo {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn zip(path: impl Into<PathBuf>, source: zip::result::ZipError) -> Self {
        Self::Zip {
            path: path.into(),
            source,
        }
    }
}
