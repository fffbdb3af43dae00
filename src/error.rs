//! Error taxonomy for the reconciliation engine.
//!
//! Engine modules return these typed variants; CLI handlers attach
//! human-readable context with `anyhow` at the boundary.

use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// A required input is missing or malformed.
    #[error("invalid input: {0}")]
    Validation(String),

    /// A profile id, report key, or batch job name does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// A source file could not be parsed as tabular data.
    #[error("failed to read {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Every supplied source file failed to load.
    #[error("no source files could be read")]
    NoReadableSources,

    /// A store read or write failed.
    #[error("storage failure at {path}")]
    Persistence {
        path: PathBuf,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl Error {
    pub fn read(
        path: impl Into<PathBuf>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Error::Read {
            path: path.into(),
            source: source.into(),
        }
    }

    pub fn persistence(
        path: impl Into<PathBuf>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Error::Persistence {
            path: path.into(),
            source: source.into(),
        }
    }
}
