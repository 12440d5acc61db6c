//! Error types for memlog core.

use std::fmt;
use std::io;
use thiserror::Error;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur in memlog core operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Storage layer error.
    #[error("storage error: {0}")]
    Storage(#[from] memlog_storage::StorageError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// JSON encoding error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The address failed validation or resolves outside the book.
    #[error("invalid address {address:?}: {reason}")]
    InvalidAddress {
        /// The address as supplied by the caller.
        address: String,
        /// Why it was rejected.
        reason: String,
    },

    /// A parameter violates its type or shape contract.
    #[error("invalid parameter: {message}")]
    InvalidParam {
        /// Description of the violation.
        message: String,
    },

    /// The address or identifier is valid but holds no data.
    #[error("not found: {what}")]
    NotFound {
        /// What was looked up.
        what: String,
    },

    /// Bytes at an indexed range are not a record.
    #[error("decode failure at offset {offset}: {message}")]
    Decode {
        /// Offset of the range that failed to decode.
        offset: u64,
        /// Description of the failure.
        message: String,
    },
}

impl CoreError {
    /// Creates an invalid address error.
    pub fn invalid_address(address: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidAddress {
            address: address.into(),
            reason: reason.into(),
        }
    }

    /// Creates an invalid parameter error.
    pub fn invalid_param(message: impl Into<String>) -> Self {
        Self::InvalidParam {
            message: message.into(),
        }
    }

    /// Creates a not found error.
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound { what: what.into() }
    }

    /// Creates a decode error.
    pub fn decode(offset: u64, message: impl Into<String>) -> Self {
        Self::Decode {
            offset,
            message: message.into(),
        }
    }

    /// The uniform status this error is reported as.
    #[must_use]
    pub fn status(&self) -> Status {
        match self {
            Self::InvalidAddress { .. } => Status::InvalidAddress,
            Self::InvalidParam { .. } => Status::InvalidParam,
            Self::NotFound { .. } => Status::NotFound,
            Self::Storage(_) | Self::Io(_) | Self::Json(_) | Self::Decode { .. } => {
                Status::IoError
            }
        }
    }

    /// Returns true if this error is reported as [`Status::NotFound`].
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        self.status() == Status::NotFound
    }
}

/// Outcome of a public store operation.
///
/// Callers that do not care about error detail can collapse any
/// [`CoreResult`] to one of these with [`Status::of`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    /// The operation succeeded.
    Ok,
    /// The address or identifier holds no data.
    NotFound,
    /// A file operation failed or stored bytes could not be decoded.
    IoError,
    /// The address failed validation.
    InvalidAddress,
    /// A parameter violated its contract.
    InvalidParam,
}

impl Status {
    /// Collapses an operation result into its status.
    pub fn of<T>(result: &CoreResult<T>) -> Self {
        match result {
            Ok(_) => Self::Ok,
            Err(e) => e.status(),
        }
    }

    /// Stable integer code for this status.
    #[must_use]
    pub const fn code(self) -> i32 {
        match self {
            Self::Ok => 1,
            Self::NotFound => 0,
            Self::IoError => -1,
            Self::InvalidAddress => -2,
            Self::InvalidParam => -3,
        }
    }

    /// Upper-case name of this status.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ok => "OK",
            Self::NotFound => "NOT_FOUND",
            Self::IoError => "IO_ERROR",
            Self::InvalidAddress => "INVALID_ADDRESS",
            Self::InvalidParam => "INVALID_PARAM",
        }
    }

    /// Returns true for [`Status::Ok`].
    #[must_use]
    pub const fn is_ok(self) -> bool {
        matches!(self, Self::Ok)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl<T> From<&CoreResult<T>> for Status {
    fn from(result: &CoreResult<T>) -> Self {
        Self::of(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_are_stable() {
        assert_eq!(Status::Ok.code(), 1);
        assert_eq!(Status::NotFound.code(), 0);
        assert_eq!(Status::IoError.code(), -1);
        assert_eq!(Status::InvalidAddress.code(), -2);
        assert_eq!(Status::InvalidParam.code(), -3);
    }

    #[test]
    fn errors_map_to_status() {
        assert_eq!(
            CoreError::invalid_address("../x", "traversal").status(),
            Status::InvalidAddress
        );
        assert_eq!(CoreError::invalid_param("limit").status(), Status::InvalidParam);
        assert_eq!(CoreError::not_found("a/b").status(), Status::NotFound);
        assert_eq!(CoreError::decode(12, "bad json").status(), Status::IoError);
        assert_eq!(
            CoreError::from(io::Error::new(io::ErrorKind::Other, "disk full")).status(),
            Status::IoError
        );
    }

    #[test]
    fn status_of_result() {
        let ok: CoreResult<()> = Ok(());
        let missing: CoreResult<()> = Err(CoreError::not_found("x"));
        assert_eq!(Status::of(&ok), Status::Ok);
        assert_eq!(Status::from(&missing), Status::NotFound);
        assert!(missing.unwrap_err().is_not_found());
    }

    #[test]
    fn error_display_mentions_context() {
        let err = CoreError::invalid_address("a/../b", "segment `..` is not allowed");
        let text = err.to_string();
        assert!(text.contains("a/../b"));
        assert!(text.contains("`..`"));
        assert_eq!(Status::InvalidParam.to_string(), "INVALID_PARAM");
    }
}
