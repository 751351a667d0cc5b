//! # Webview Bridge
//!
//! This library lets a garbage-collected host runtime expose named
//! functions to JavaScript running in a native webview. It keeps a
//! fixed-capacity registry of bindings and a single trampoline that the
//! webview library calls back into, suspending the host collector for the
//! duration of each call.
//!
//! ## Architecture
//!
//! ```text
//! JavaScript  window.sum(1, 2)
//!     │
//!     │ webview_bind(name, trampoline, index)
//!     ▼
//! Trampoline (this crate)
//!     │  lookup index ─ suspend GC ─ re-check generation
//!     ▼
//! Dispatch (managed code)
//!     │
//!     │ webview_return(seq, status, json)
//!     ▼
//! JavaScript promise settles
//! ```
//!
//! ## Features
//!
//! - **Slot Registry**: First-fit reuse, name limits and duplicate detection
//! - **GC Bracketing**: The collector is stopped only if it was running
//! - **No Hung Promises**: Dropped calls reject instead of staying pending
//! - **Panic Containment**: Nothing unwinds into the webview library
//! - **Offload**: Slow handlers run on a worker pool
//! - **C ABI**: `wvb_*` entry points for hosts that speak C

#![deny(missing_docs)]
#![deny(unsafe_op_in_unsafe_fn)]

pub mod bridge;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod ffi;
pub mod gc;
pub mod logging;
pub mod metrics;
pub mod native;
pub mod registry;
mod trampoline;

// Re-export commonly used types
pub use bridge::{global, install, Bridge};
pub use config::{BridgeConfig, NamePolicy};
pub use dispatch::{Dispatch, DispatchOutcome, DropReason, JsonDispatch, OffloadQueue};
pub use error::{BridgeError, CallError, ErrorCode, Result};
pub use gc::{GcControl, GcSuspension, ManualGc, NoGc};
pub use metrics::{BridgeStats, MetricsCollector};
pub use native::{NativeStatus, RecordingNative, ReturnStatus, WebviewNative};
pub use registry::{Binding, BindingIndex, BindingRegistry, OwnerHandle};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert_eq!(VERSION, "1.0.0");
    }
}
