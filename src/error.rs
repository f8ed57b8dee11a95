use std::path::PathBuf;

use polars::prelude::PolarsError;
use thiserror::Error;

use crate::validation::ValidationError;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Process exit codes shared by both binaries.
pub mod exit {
    pub const SUCCESS: u8 = 0;
    pub const FATAL: u8 = 1;
    /// At least one batch was rejected or could not be processed.
    pub const BATCH_SKIPPED: u8 = 2;
    /// At least one probe query failed.
    pub const QUERY_FAILED: u8 = 3;
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("input file not found: {}", path.display())]
    MissingFile { path: PathBuf },

    #[error("could not parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: PolarsError,
    },

    #[error("invalid batch: {0}")]
    SchemaValidation(#[from] ValidationError),

    #[error("query `{query}` failed: {source}")]
    Query {
        query: String,
        #[source]
        source: PolarsError,
    },

    #[error("warehouse: {0}")]
    Warehouse(String),

    #[error("could not write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: PolarsError,
    },

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("configuration error in {}: {message}", path.display())]
    Config { path: PathBuf, message: String },
}

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>) -> impl FnOnce(std::io::Error) -> Self {
        let path = path.into();
        move |source| Error::Io { path, source }
    }

    /// Validation failures are recoverable per batch, everything else is not.
    pub fn is_validation(&self) -> bool {
        matches!(self, Error::SchemaValidation(_))
    }
}
