use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum IngestError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Verification failed for {path}: expected hash {expected}, got {actual}")]
    VerificationMismatch {
        path: PathBuf,
        expected: String,
        actual: String,
    },

    #[error("Verification failed: archived file {0} could not be found")]
    ArchiveMissing(PathBuf),

    #[error("Malformed ledger {path}: {source}")]
    MalformedLedger {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Malformed settings file {path}: {source}")]
    MalformedSettings {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Configuration missing: {0}")]
    ConfigurationMissing(String),
}

impl IngestError {
    /// Wrap an I/O error with the path it happened on.
    pub fn io(path: impl AsRef<Path>, source: io::Error) -> Self {
        IngestError::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    /// True for failures of the post-copy integrity check.
    pub fn is_verification_failure(&self) -> bool {
        matches!(
            self,
            IngestError::VerificationMismatch { .. } | IngestError::ArchiveMissing(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, IngestError>;
