//! Error types for the binding bridge.
//!
//! This module defines error codes, the JSON error payload delivered to
//! JavaScript callers, and the main error type used throughout the bridge.

use crate::native::NativeStatus;
use serde::{Deserialize, Serialize};

/// Error codes for categorizing errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Every registry slot is in use
    NoCapacity,
    /// Binding name exceeds the configured maximum length
    NameTooLong,
    /// Binding name is empty or contains NUL
    InvalidName,
    /// A binding with the same name is already active
    DuplicateName,
    /// Trampoline token does not address a slot
    InvalidIndex,
    /// Slot is free or was never used
    InactiveBinding,
    /// Binding was removed or replaced while the call was in flight
    StaleBinding,
    /// Binding has no owner handle or no dispatch function
    TornDownBinding,
    /// Application handler returned an error
    HandlerFailed,
    /// Dispatch implementation panicked
    HandlerPanicked,
    /// Serialization/deserialization error
    SerializationError,
    /// Native webview library reported a failure
    NativeError,
    /// No process-wide bridge has been installed
    NotInstalled,
    /// A process-wide bridge is already installed
    AlreadyInstalled,
    /// Internal bridge error (bug)
    InternalError,
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorCode::NoCapacity => write!(f, "NO_CAPACITY"),
            ErrorCode::NameTooLong => write!(f, "NAME_TOO_LONG"),
            ErrorCode::InvalidName => write!(f, "INVALID_NAME"),
            ErrorCode::DuplicateName => write!(f, "DUPLICATE_NAME"),
            ErrorCode::InvalidIndex => write!(f, "INVALID_INDEX"),
            ErrorCode::InactiveBinding => write!(f, "INACTIVE_BINDING"),
            ErrorCode::StaleBinding => write!(f, "STALE_BINDING"),
            ErrorCode::TornDownBinding => write!(f, "TORN_DOWN_BINDING"),
            ErrorCode::HandlerFailed => write!(f, "HANDLER_FAILED"),
            ErrorCode::HandlerPanicked => write!(f, "HANDLER_PANICKED"),
            ErrorCode::SerializationError => write!(f, "SERIALIZATION_ERROR"),
            ErrorCode::NativeError => write!(f, "NATIVE_ERROR"),
            ErrorCode::NotInstalled => write!(f, "NOT_INSTALLED"),
            ErrorCode::AlreadyInstalled => write!(f, "ALREADY_INSTALLED"),
            ErrorCode::InternalError => write!(f, "INTERNAL_ERROR"),
        }
    }
}

/// Error payload used to reject a JavaScript promise
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallError {
    /// Error code
    pub code: ErrorCode,

    /// Human-readable message
    pub message: String,

    /// Binding the call was addressed to, when known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub binding: Option<String>,
}

impl CallError {
    /// Create a new call error
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            binding: None,
        }
    }

    /// Create a handler failure
    pub fn handler_failed(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::HandlerFailed, message)
    }

    /// Create a malformed request error
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::SerializationError, message)
    }

    /// Attach the binding name
    pub fn with_binding(mut self, name: impl Into<String>) -> Self {
        self.binding = Some(name.into());
        self
    }

    /// Serialize to the JSON text handed to `native_return`.
    ///
    /// Falls back to a fixed payload so a rejection is always deliverable.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| {
            format!(
                r#"{{"code":"{}","message":"unserializable error"}}"#,
                self.code
            )
        })
    }
}

impl std::fmt::Display for CallError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)?;
        if let Some(name) = &self.binding {
            write!(f, " (binding '{}')", name)?;
        }
        Ok(())
    }
}

impl std::error::Error for CallError {}

/// Main error type for the bridge
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    /// Registry is full
    #[error("No free binding slot (capacity {capacity})")]
    NoCapacity {
        /// Registry capacity
        capacity: usize,
    },

    /// Name longer than allowed under the reject policy
    #[error("Binding name is {len} bytes, limit is {max}")]
    NameTooLong {
        /// Actual length in bytes
        len: usize,
        /// Configured limit
        max: usize,
    },

    /// Name cannot cross the C boundary
    #[error("Invalid binding name: {0}")]
    InvalidName(String),

    /// Name already bound
    #[error("Binding '{0}' is already registered")]
    DuplicateName(String),

    /// Native library rejected an operation
    #[error("Native webview error: {0}")]
    Native(#[from] NativeStatus),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// `install` called a second time
    #[error("A bridge is already installed")]
    AlreadyInstalled,

    /// Operation not possible in the current state
    #[error("Invalid state: {0}")]
    InvalidState(String),
}

impl BridgeError {
    /// Error code for this error
    pub fn code(&self) -> ErrorCode {
        match self {
            BridgeError::NoCapacity { .. } => ErrorCode::NoCapacity,
            BridgeError::NameTooLong { .. } => ErrorCode::NameTooLong,
            BridgeError::InvalidName(_) => ErrorCode::InvalidName,
            BridgeError::DuplicateName(_) => ErrorCode::DuplicateName,
            BridgeError::Native(_) => ErrorCode::NativeError,
            BridgeError::AlreadyInstalled => ErrorCode::AlreadyInstalled,
            BridgeError::Config(_) | BridgeError::Io(_) | BridgeError::InvalidState(_) => {
                ErrorCode::InternalError
            }
        }
    }

    /// Integer code for the C ABI
    pub fn to_abi_code(&self) -> i32 {
        match self {
            BridgeError::NoCapacity { .. } => error_codes::NO_CAPACITY,
            BridgeError::NameTooLong { .. } | BridgeError::InvalidName(_) => {
                error_codes::INVALID_ARGUMENT
            }
            BridgeError::DuplicateName(_) => error_codes::DUPLICATE,
            BridgeError::Native(_) => error_codes::NATIVE_FAILURE,
            BridgeError::AlreadyInstalled => error_codes::ALREADY_INSTALLED,
            BridgeError::Config(_) | BridgeError::Io(_) | BridgeError::InvalidState(_) => {
                error_codes::INTERNAL_ERROR
            }
        }
    }
}

/// Result type alias for bridge operations
pub type Result<T> = std::result::Result<T, BridgeError>;

/// Error code constants returned across the C ABI
pub mod error_codes {
    /// Success
    pub const SUCCESS: i32 = 0;
    /// Registry full
    pub const NO_CAPACITY: i32 = -1;
    /// Null, non-UTF-8, empty or over-long argument
    pub const INVALID_ARGUMENT: i32 = -2;
    /// Name already bound
    pub const DUPLICATE: i32 = -3;
    /// Native library reported failure
    pub const NATIVE_FAILURE: i32 = -4;
    /// No bridge installed
    pub const NOT_INSTALLED: i32 = -5;
    /// Internal error
    pub const INTERNAL_ERROR: i32 = -6;
    /// A bridge is already installed
    pub const ALREADY_INSTALLED: i32 = -7;
}
