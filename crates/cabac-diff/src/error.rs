use std::path::PathBuf;

use thiserror::Error;

use crate::semantic::ContextRange;

/// Analyzer errors.
#[derive(Error, Debug)]
pub enum Error {
    #[error("trace file not found: {path}")]
    InputNotFound {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("context range {range} is inverted (low > high)")]
    InvertedRange { range: ContextRange },
    #[error("context ranges overlap: {first} and {second}")]
    OverlappingRanges {
        first: ContextRange,
        second: ContextRange,
    },
}

pub type Result<T> = std::result::Result<T, Error>;
