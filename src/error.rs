//! Gateway error taxonomy.
//!
//! Validation failures are raised locally, before any native runtime call.
//! Runtime failures carry the vendor error code through unchanged; no layer
//! below the caller retries them.

use thiserror::Error;

/// Vendor error codes reported by the simulation runtime.
///
/// The set mirrors the codes the gateway actually has to distinguish; anything
/// else travels as `Other` with the raw code.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RuntimeErrorCode {
    DoesNotExist,
    AlreadyExists,
    Timeout,
    NotSupported,
    OutOfRange,
    WrongType,
    NotRunning,
    Other(i32),
}

impl RuntimeErrorCode {
    pub fn code(&self) -> i32 {
        match self {
            RuntimeErrorCode::DoesNotExist => -20,
            RuntimeErrorCode::AlreadyExists => -21,
            RuntimeErrorCode::Timeout => -22,
            RuntimeErrorCode::NotSupported => -23,
            RuntimeErrorCode::OutOfRange => -24,
            RuntimeErrorCode::WrongType => -25,
            RuntimeErrorCode::NotRunning => -26,
            RuntimeErrorCode::Other(code) => *code,
        }
    }
}

impl std::fmt::Display for RuntimeErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RuntimeErrorCode::DoesNotExist => write!(f, "DoesNotExist"),
            RuntimeErrorCode::AlreadyExists => write!(f, "AlreadyExists"),
            RuntimeErrorCode::Timeout => write!(f, "Timeout"),
            RuntimeErrorCode::NotSupported => write!(f, "NotSupported"),
            RuntimeErrorCode::OutOfRange => write!(f, "OutOfRange"),
            RuntimeErrorCode::WrongType => write!(f, "WrongType"),
            RuntimeErrorCode::NotRunning => write!(f, "NotRunning"),
            RuntimeErrorCode::Other(code) => write!(f, "Other({code})"),
        }
    }
}

/// A failed call into the native simulation runtime.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("runtime error {}: {message}", .code)]
pub struct RuntimeError {
    pub code: RuntimeErrorCode,
    pub message: String,
}

impl RuntimeError {
    pub fn new(code: RuntimeErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

pub type RuntimeResult<T> = Result<T, RuntimeError>;

/// Errors surfaced to the wire layer.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Malformed or missing caller input; detected before the runtime is touched.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A referenced file or archive path does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The session is in a state that forbids the requested action.
    #[error("invalid operation: {0}")]
    InvalidOperation(String),

    /// The native runtime rejected or failed the call.
    #[error(transparent)]
    Runtime(#[from] RuntimeError),
}

impl GatewayError {
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        GatewayError::InvalidArgument(message.into())
    }
}

pub type GatewayResult<T> = Result<T, GatewayError>;

pub(crate) const INVALID_STRING_MESSAGE: &str =
    "the string may not be empty or only whitespace";
pub(crate) const EMPTY_COLLECTION_MESSAGE: &str = "value cannot be an empty collection";
