use std::path::PathBuf;

/// Errors raised while reading or decoding a single run file.
#[derive(thiserror::Error, Debug)]
pub enum DecodeError {
    #[error("file not found: {}", .0.display())]
    FileNotFound(PathBuf),
    #[error("invalid data format: {0}")]
    DataFormat(String),
    #[error("i/o failure: {0}")]
    Io(#[from] std::io::Error),
}

pub type DecodeResult<T> = Result<T, DecodeError>;

/// Errors raised while designing or applying a filter.
///
/// These never invalidate results already held by a run's cache.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum FilterError {
    #[error("invalid filter parameter: {0}")]
    InvalidParameter(String),
    #[error("filter design failure: {0}")]
    Design(String),
}

pub type FilterResult<T> = Result<T, FilterError>;

impl From<csv::Error> for DecodeError {
    fn from(err: csv::Error) -> Self {
        if !err.is_io_error() {
            return DecodeError::DataFormat(err.to_string());
        }
        match err.into_kind() {
            csv::ErrorKind::Io(io) => DecodeError::Io(io),
            other => DecodeError::DataFormat(format!("{:?}", other)),
        }
    }
}
