//! Managed dispatch functions and what happens to a trampoline call.
//!
//! A [`Dispatch`] is resolved once at registration and invoked by the
//! trampoline with `(owner, name, seq, request)`. It owns the rest of the
//! call: decoding the request, running the application handler and
//! completing the JS promise through `native_return`. The trampoline never
//! waits for a result.

pub mod json;
pub mod offload;

pub use json::{complete, JsonDispatch};
pub use offload::{OffloadDispatch, OffloadQueue};

use crate::error::ErrorCode;
use crate::registry::OwnerHandle;
use serde::Serialize;
use std::sync::Arc;

/// Entry point into managed code for one binding
pub trait Dispatch: Send + Sync {
    /// Handle one JS invocation of `name`.
    ///
    /// Runs on the event-loop thread with the host collector suspended.
    fn dispatch(&self, owner: OwnerHandle, name: &str, seq: &str, request: &str);

    /// Whether there is a function to call. Adapters over nullable C
    /// callbacks return `false` for null.
    fn is_callable(&self) -> bool {
        true
    }
}

/// [`Dispatch`] backed by a closure
pub struct FnDispatch<F>(F);

impl<F> Dispatch for FnDispatch<F>
where
    F: Fn(OwnerHandle, &str, &str, &str) + Send + Sync,
{
    fn dispatch(&self, owner: OwnerHandle, name: &str, seq: &str, request: &str) {
        (self.0)(owner, name, seq, request)
    }
}

/// Wrap a closure as a dispatch function
pub fn from_fn<F>(f: F) -> Arc<dyn Dispatch>
where
    F: Fn(OwnerHandle, &str, &str, &str) + Send + Sync + 'static,
{
    Arc::new(FnDispatch(f))
}

/// Why the trampoline dropped a call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DropReason {
    /// Token addresses no slot
    InvalidIndex,
    /// Slot is free
    Inactive,
    /// Binding was removed or replaced before the call reached managed code
    Stale,
    /// Owner handle or dispatch function is null
    TornDown,
}

impl DropReason {
    /// Error code reported to the JS caller
    pub fn error_code(self) -> ErrorCode {
        match self {
            DropReason::InvalidIndex => ErrorCode::InvalidIndex,
            DropReason::Inactive => ErrorCode::InactiveBinding,
            DropReason::Stale => ErrorCode::StaleBinding,
            DropReason::TornDown => ErrorCode::TornDownBinding,
        }
    }

    /// Metric label
    pub fn as_str(self) -> &'static str {
        match self {
            DropReason::InvalidIndex => "invalid_index",
            DropReason::Inactive => "inactive",
            DropReason::Stale => "stale",
            DropReason::TornDown => "torn_down",
        }
    }
}

impl std::fmt::Display for DropReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of one trampoline invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Managed dispatch ran to completion
    Dispatched,
    /// Call never reached managed code
    Dropped(DropReason),
    /// Managed dispatch panicked; the unwind stopped at the trampoline
    Panicked,
}

impl DispatchOutcome {
    /// Whether managed dispatch ran to completion
    pub fn is_dispatched(&self) -> bool {
        matches!(self, DispatchOutcome::Dispatched)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[test]
    fn test_from_fn_forwards_arguments() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let dispatch = from_fn(move |owner, name, seq, req| {
            sink.lock()
                .push((owner.id(), name.to_string(), seq.to_string(), req.to_string()));
        });

        assert!(dispatch.is_callable());
        dispatch.dispatch(OwnerHandle::from_id(9), "sum", "1", "[1,2]");

        assert_eq!(
            *seen.lock(),
            vec![(9, "sum".to_string(), "1".to_string(), "[1,2]".to_string())]
        );
    }

    #[test]
    fn test_drop_reason_codes() {
        assert_eq!(DropReason::Stale.error_code(), ErrorCode::StaleBinding);
        assert_eq!(DropReason::InvalidIndex.to_string(), "invalid_index");
    }
}
