//! Boundary to the native webview library.
//!
//! The bridge needs three operations from the library: bind a JS-visible
//! name to the trampoline, unbind it, and complete a pending JS promise.
//! [`WebviewNative`] abstracts them so the registry and trampoline can be
//! driven without a window.

mod recording;
#[cfg(feature = "native")]
pub mod sys;

pub use recording::{NativeCall, RecordingNative};
#[cfg(feature = "native")]
pub use sys::LibWebview;

use crate::registry::BindingIndex;

/// Status codes reported by the webview library (`webview_error_t`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum NativeStatus {
    /// Missing runtime dependency
    #[error("missing dependency")]
    MissingDependency,
    /// Operation canceled
    #[error("operation canceled")]
    Canceled,
    /// Invalid state detected
    #[error("invalid state")]
    InvalidState,
    /// Invalid argument
    #[error("invalid argument")]
    InvalidArgument,
    /// Unspecified failure
    #[error("unspecified error")]
    Unspecified,
    /// Name already bound
    #[error("duplicate")]
    Duplicate,
    /// Name not bound
    #[error("not found")]
    NotFound,
    /// Code outside the documented range
    #[error("unknown status {0}")]
    Unknown(i32),
}

impl NativeStatus {
    /// Interpret a raw library return code
    pub fn check(code: i32) -> NativeResult {
        match code {
            0 => Ok(()),
            -5 => Err(NativeStatus::MissingDependency),
            -4 => Err(NativeStatus::Canceled),
            -3 => Err(NativeStatus::InvalidState),
            -2 => Err(NativeStatus::InvalidArgument),
            -1 => Err(NativeStatus::Unspecified),
            1 => Err(NativeStatus::Duplicate),
            2 => Err(NativeStatus::NotFound),
            other => Err(NativeStatus::Unknown(other)),
        }
    }

    /// Raw library code
    pub fn code(&self) -> i32 {
        match self {
            NativeStatus::MissingDependency => -5,
            NativeStatus::Canceled => -4,
            NativeStatus::InvalidState => -3,
            NativeStatus::InvalidArgument => -2,
            NativeStatus::Unspecified => -1,
            NativeStatus::Duplicate => 1,
            NativeStatus::NotFound => 2,
            NativeStatus::Unknown(code) => *code,
        }
    }
}

/// Result of a native operation
pub type NativeResult = std::result::Result<(), NativeStatus>;

/// How `native_return` completes the JS promise
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReturnStatus {
    /// Resolve with the payload
    Resolve,
    /// Reject with the payload
    Reject,
}

impl ReturnStatus {
    /// Status argument for `webview_return`; zero resolves
    pub fn code(self) -> i32 {
        match self {
            ReturnStatus::Resolve => 0,
            ReturnStatus::Reject => 1,
        }
    }
}

/// Operations the bridge consumes from the webview library
pub trait WebviewNative: Send + Sync {
    /// Expose `name` to JS; invocations reach the trampoline carrying `index`
    fn bind(&self, name: &str, index: BindingIndex) -> NativeResult;

    /// Remove a JS-visible name
    fn unbind(&self, name: &str) -> NativeResult;

    /// Complete the JS promise identified by `seq` with a JSON payload
    fn ret(&self, seq: &str, status: ReturnStatus, json: &str) -> NativeResult;
}
