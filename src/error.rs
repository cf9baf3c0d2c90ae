//! Crate-wide error type.
//!
//! Mirrors the taxonomy in the snapshot engine's error handling design:
//! config-fatal errors abort the whole run, job-fatal errors abort a
//! single (host, directory) job and are recorded rather than propagated.

use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, SnapbackError>;

#[derive(Debug, Error)]
pub enum SnapbackError {
    #[error("no configuration file found (searched {searched:?})")]
    ConfigNotFound { searched: Vec<PathBuf> },

    #[error("config error at {path}:{line}: {message}")]
    ConfigParse {
        path: PathBuf,
        line: usize,
        message: String,
    },

    #[error("Hourlies must be >= 1 for host {host:?} directory {directory:?}")]
    InvalidRetention { host: String, directory: String },

    #[error("invalid regex {pattern:?}: {source}")]
    InvalidRegex {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("no destination configured for host {host:?} directory {directory:?}")]
    MissingDestination { host: String, directory: String },

    #[error("destination parent {path:?} exists but is not a directory")]
    DestinationNotDirectory { path: PathBuf },

    #[error("command {program:?} exited with status {status}: {stderr}")]
    CommandFailed {
        program: String,
        status: i32,
        stderr: String,
    },

    #[error("job failed for host {host:?} directory {directory:?}: {message}")]
    JobFatal {
        host: String,
        directory: String,
        message: String,
    },

    #[error("io error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl SnapbackError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
