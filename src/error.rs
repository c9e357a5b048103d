//! Error handling for encrypted lookup
//!
//! One error type is shared by the library so that the store layer can hand
//! failures back to its caller unchanged.

use std::fmt;

/// Lookup operation error
#[derive(Debug)]
pub enum LookupError {
    /// Invalid algebra parameters
    Params(String),
    /// Text that cannot be packed into a plaintext vector
    Codec(String),
    /// Malformed row in a source table
    Table { line: usize, reason: String },
    /// Error reported by the homomorphic backend
    Fhe(fhe::Error),
    /// Missing rotation key or other backend capability
    Backend(String),
    /// Malformed serialized object
    Serialization(String),
    /// Store command failure
    Store(String),
    /// A reserved store key has not been set
    MissingReservedKey(&'static str),
    /// Attempt to write a table entry under a reserved key
    ReservedKey(String),
    /// I/O failure
    Io(std::io::Error),
}

impl fmt::Display for LookupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LookupError::Params(msg) => write!(f, "invalid parameters: {}", msg),
            LookupError::Codec(msg) => write!(f, "encoding error: {}", msg),
            LookupError::Table { line, reason } => write!(f, "table line {}: {}", line, reason),
            LookupError::Fhe(err) => write!(f, "fhe error: {}", err),
            LookupError::Backend(msg) => write!(f, "backend error: {}", msg),
            LookupError::Serialization(msg) => write!(f, "serialization error: {}", msg),
            LookupError::Store(msg) => write!(f, "store error: {}", msg),
            LookupError::MissingReservedKey(key) => write!(f, "key {} is not set", key),
            LookupError::ReservedKey(key) => write!(f, "key {} is reserved", key),
            LookupError::Io(err) => write!(f, "io error: {}", err),
        }
    }
}

impl std::error::Error for LookupError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            LookupError::Fhe(err) => Some(err),
            LookupError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for LookupError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<bincode::Error> for LookupError {
    fn from(err: bincode::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<fhe::Error> for LookupError {
    fn from(err: fhe::Error) -> Self {
        Self::Fhe(err)
    }
}

/// Result type for lookup operations
pub type Result<T> = std::result::Result<T, LookupError>;

/// Create a `LookupError::Store` with format string support
macro_rules! store_err {
    ($($arg:tt)*) => {
        $crate::error::LookupError::Store(format!($($arg)*))
    };
}

pub(crate) use store_err;
