use std::path::PathBuf;

use thiserror::Error;

/// Every fallible operation in the consolidation engine returns this.
///
/// Variants map onto the error taxonomy of the batch: a malformed input block
/// is never retried, a missing day file is not an error at all (see the
/// reader/writer modules), so there is deliberately no `NotFound` variant here.
#[derive(Debug, Error)]
pub enum CdcError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("io error on day file {path:?}: {source}")]
    DayFileIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    #[error("config file {path:?} is not valid TOML: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("malformed input at line {line}: {reason}")]
    InputParse { line: usize, reason: String },

    #[error("{0}")]
    Other(String),
}

pub type CResult<T> = Result<T, CdcError>;
