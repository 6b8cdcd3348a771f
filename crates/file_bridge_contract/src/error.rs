//! Bridge error taxonomy shared by every operation on the boundary.

use std::fmt::{self, Display, Formatter};
use std::io;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Stable error categories reported across the bridge boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BridgeErrorKind {
    /// The user abandoned an interactive operation. Callers treat this as a negative result.
    Cancelled,
    /// The grant is missing, expired, or revoked.
    PermissionDenied,
    /// The identifier does not resolve to any resource.
    NotFound,
    /// A virtual file was read without, or with an unsupported, conversion target.
    ConversionUnsupported,
    /// Malformed encoded payload or option combination.
    InvalidArgument,
    /// The underlying storage operation did not complete.
    #[serde(rename = "IOFailure")]
    IoFailure,
}

impl BridgeErrorKind {
    /// Returns the stable wire token for this kind.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Cancelled => "Cancelled",
            Self::PermissionDenied => "PermissionDenied",
            Self::NotFound => "NotFound",
            Self::ConversionUnsupported => "ConversionUnsupported",
            Self::InvalidArgument => "InvalidArgument",
            Self::IoFailure => "IOFailure",
        }
    }
}

impl Display for BridgeErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured bridge error with contextual metadata.
///
/// `operation` and `target` are attached as the error propagates so a failure surfaced to the
/// presentation layer still names the bridge operation and identifier it came from.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{kind}: {message}")]
#[serde(rename_all = "camelCase")]
pub struct BridgeError {
    /// High-level error category.
    pub kind: BridgeErrorKind,
    /// Human-readable message.
    pub message: String,
    /// Bridge operation that failed, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation: Option<String>,
    /// Identifier or path the operation targeted, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
}

/// Convenience result type for bridge operations.
pub type BridgeResult<T> = Result<T, BridgeError>;

impl BridgeError {
    /// Creates an error with the given kind and message.
    pub fn new(kind: BridgeErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            operation: None,
            target: None,
        }
    }

    /// Creates a cancellation result.
    pub fn cancelled() -> Self {
        Self::new(BridgeErrorKind::Cancelled, "operation cancelled by user")
    }

    /// Creates a permission error.
    pub fn permission_denied(message: impl Into<String>) -> Self {
        Self::new(BridgeErrorKind::PermissionDenied, message)
    }

    /// Creates a not-found error.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(BridgeErrorKind::NotFound, message)
    }

    /// Creates a conversion error.
    pub fn conversion_unsupported(message: impl Into<String>) -> Self {
        Self::new(BridgeErrorKind::ConversionUnsupported, message)
    }

    /// Creates an invalid-argument error.
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::new(BridgeErrorKind::InvalidArgument, message)
    }

    /// Creates an I/O failure.
    pub fn io_failure(message: impl Into<String>) -> Self {
        Self::new(BridgeErrorKind::IoFailure, message)
    }

    /// Maps a [`std::io::Error`] onto the bridge taxonomy, prefixing `context`.
    pub fn from_io(err: &io::Error, context: impl Display) -> Self {
        let kind = match err.kind() {
            io::ErrorKind::NotFound => BridgeErrorKind::NotFound,
            io::ErrorKind::PermissionDenied => BridgeErrorKind::PermissionDenied,
            _ => BridgeErrorKind::IoFailure,
        };
        Self::new(kind, format!("{context}: {err}"))
    }

    /// Attaches an operation label.
    pub fn with_operation(mut self, operation: impl Into<String>) -> Self {
        self.operation = Some(operation.into());
        self
    }

    /// Attaches a target identifier or path.
    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    /// Returns `true` for user cancellation.
    pub fn is_cancelled(&self) -> bool {
        self.kind == BridgeErrorKind::Cancelled
    }
}
