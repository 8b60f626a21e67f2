//! Error taxonomy for the ETL run
//!
//! Only pipeline-fatal conditions live here. Per-record problems (an
//! unparseable date, a malformed position) never become errors: they turn
//! into `None` sentinels and the record is filtered out by the cleaner.

use std::path::PathBuf;
use std::process::ExitCode;
use thiserror::Error;

/// Input shape problems detected before any row is processed
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    #[error("missing required columns: {missing:?} (found: {found:?})")]
    MissingColumns {
        missing: Vec<String>,
        found: Vec<String>,
    },

    #[error("input has no data rows")]
    EmptyInput,
}

#[derive(Error, Debug)]
pub enum EtlError {
    #[error("schema error: {0}")]
    Schema(#[from] SchemaError),

    #[error("cannot read input {path}: {message}")]
    Source { path: PathBuf, message: String },

    #[error("storage error on {target}: {source}")]
    Storage {
        target: String,
        #[source]
        source: sqlx::Error,
    },

    #[error("cannot export workbook {path}: {source}")]
    Export {
        path: PathBuf,
        #[source]
        source: rust_xlsxwriter::XlsxError,
    },

    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl EtlError {
    pub fn storage(target: impl Into<String>, source: sqlx::Error) -> Self {
        Self::Storage {
            target: target.into(),
            source,
        }
    }

    pub fn source_error(path: impl Into<PathBuf>, message: impl std::fmt::Display) -> Self {
        Self::Source {
            path: path.into(),
            message: message.to_string(),
        }
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Process exit code for this failure.
    /// - 2: input shape rejected
    /// - 1: everything else (read, storage, export, IO)
    pub fn exit_code(&self) -> ExitCode {
        match self {
            Self::Schema(_) => ExitCode::from(2),
            Self::Source { .. } | Self::Storage { .. } | Self::Export { .. } | Self::Io { .. } => {
                ExitCode::from(1)
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, EtlError>;
