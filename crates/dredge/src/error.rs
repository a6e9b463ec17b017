//! Error types for dredge

use crate::datemath::DateMathError;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Dredge error type
#[derive(Error, Debug)]
pub enum DredgeError {
    // === Configuration errors: fatal, never retried ===
    #[error("'{0}' is a required attribute")]
    MissingAttribute(String),

    #[error("'baseDir' value: {} is not a directory", .0.display())]
    NotADirectory(PathBuf),

    #[error("Invalid pattern for '{attribute}': {source}")]
    InvalidPattern {
        attribute: String,
        #[source]
        source: regex::Error,
    },

    #[error("Invalid expression for '{attribute}': '{value}' ({reason})")]
    InvalidBound {
        attribute: String,
        value: String,
        reason: String,
    },

    #[error("Invalid date expression for '{attribute}': {source}")]
    DateMath {
        attribute: String,
        #[source]
        source: DateMathError,
    },

    #[error("Variable '{0}' could not be resolved")]
    UnresolvedVariable(String),

    #[error("Variable '{name}' resolved to {found}, expected {expected}")]
    TypeMismatch {
        name: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error("Unsupported encoding: {0}")]
    UnsupportedEncoding(String),

    #[error("Config error: {0}")]
    Config(String),

    // === I/O errors: fatal for the current scan or resolution ===
    #[error("IO error at {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Walk error: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("No archive (.zip) found in directory: {}", .0.display())]
    NoArchive(PathBuf),

    #[error("Unable to open ZIP file {}: {source}", .archive.display())]
    Archive {
        archive: PathBuf,
        #[source]
        source: zip::result::ZipError,
    },

    #[error("Unable to locate file {entry} inside archive {} ({reason})", .archive.display())]
    ArchiveEntry {
        entry: String,
        archive: PathBuf,
        reason: String,
    },
}

impl DredgeError {
    /// Wrap an I/O error with the path it happened at.
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        DredgeError::Io {
            path: path.into(),
            source,
        }
    }

    /// True for the configuration family: the entity cannot run at all.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            DredgeError::MissingAttribute(_)
                | DredgeError::NotADirectory(_)
                | DredgeError::InvalidPattern { .. }
                | DredgeError::InvalidBound { .. }
                | DredgeError::DateMath { .. }
                | DredgeError::UnresolvedVariable(_)
                | DredgeError::TypeMismatch { .. }
                | DredgeError::UnsupportedEncoding(_)
                | DredgeError::Config(_)
        )
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, DredgeError>;
