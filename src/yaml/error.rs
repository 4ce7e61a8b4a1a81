//! Error types for YAML operations.

use std::io;
use yaml_rust2::ScanError;

/// Error type for YAML operations.
#[derive(Debug)]
pub enum Error {
    /// Input is not parseable YAML
    Parse(String),
    /// Path navigation reached a missing key
    Path(String),
    /// Path or operation hit a node of the wrong kind
    Type(String),
    /// Array index out of bounds
    Index(String),
    /// Path string is malformed
    InvalidPath(String),
    /// I/O error
    Io(String),
    /// Document could not be serialized
    Serialize(String),
}

impl std::error::Error for Error {}

impl From<ScanError> for Error {
    fn from(e: ScanError) -> Self {
        Error::Parse(e.to_string())
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Error::Io(e.to_string())
    }
}

impl From<String> for Error {
    fn from(e: String) -> Self {
        Error::Parse(e)
    }
}

impl From<&str> for Error {
    fn from(e: &str) -> Self {
        Error::Parse(e.to_string())
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Error::Parse(e) => write!(f, "{}", e),
            Error::Path(e) => write!(f, "{}", e),
            Error::Type(e) => write!(f, "{}", e),
            Error::Index(e) => write!(f, "{}", e),
            Error::InvalidPath(e) => write!(f, "{}", e),
            Error::Io(e) => write!(f, "{}", e),
            Error::Serialize(e) => write!(f, "{}", e),
        }
    }
}
