//! Errors raised while reading records and demultiplexing them.

use std::path::PathBuf;

use bstr::BString;
use itertools::Itertools;
use thiserror::Error;

/// The errors that may occur when reading records from a file or binning them to outputs.
///
/// None of these are recoverable for the current job.
#[derive(Error, Debug)]
pub enum DemuxError {
    #[error("Unrecognized record format for file: {file_name}")]
    UnrecognizedFormat { file_name: String },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Output file(s) already exist: {}", .paths.iter().map(|p| p.to_string_lossy()).join(", "))]
    DestinationCollision { paths: Vec<PathBuf> },

    #[error("Unable to extract an index sequence from header `{header}` in {}", .path.to_string_lossy())]
    MalformedHeader { header: BString, path: PathBuf },

    #[error("Failed to open {}", .path.to_string_lossy())]
    Open { path: PathBuf, source: fgoxide::FgError },

    #[error("I/O error on {}", .path.to_string_lossy())]
    Io { path: PathBuf, source: std::io::Error },
}

impl DemuxError {
    /// Wrap an [`std::io::Error`] with the path of the file being read or written.
    pub fn io<P: Into<PathBuf>>(path: P, source: std::io::Error) -> Self {
        Self::Io { path: path.into(), source }
    }
}
