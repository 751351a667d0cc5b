//! The callback trampoline.
//!
//! Every JS invocation of a bound name arrives here from the native event
//! loop as `(seq, request, token)`. The token is decoded into a slot index,
//! the binding is resolved, and its dispatch function runs inside a
//! collector suspension. Nothing is ever propagated back to the caller of
//! the trampoline; failures are logged and reported to JS through
//! `native_return` instead.

use crate::bridge::Bridge;
use crate::dispatch::{complete, DispatchOutcome, DropReason};
use crate::error::{CallError, ErrorCode};
use crate::gc::GcSuspension;
use crate::metrics::DispatchTimer;
use crate::registry::BindingIndex;
use std::panic::{catch_unwind, AssertUnwindSafe};
use tracing::{debug, error, trace, warn};

/// Longest request prefix written to logs
const REQUEST_PREVIEW_CHARS: usize = 50;

impl Bridge {
    /// Deliver one JS invocation to the binding at `index`.
    ///
    /// The registry lock is only held for the lookup and the re-check, never
    /// across managed dispatch, so handlers may register or unregister
    /// bindings themselves.
    pub fn dispatch(&self, seq: &str, request: &str, index: BindingIndex) -> DispatchOutcome {
        trace!(
            index = %index,
            seq = %seq,
            request = %preview(request),
            "Trampoline invoked"
        );

        let found = self.registry.lock().lookup(index);
        let binding = match found {
            Some(binding) => binding,
            None => {
                let reason = if index.get() >= self.config.capacity {
                    DropReason::InvalidIndex
                } else {
                    DropReason::Inactive
                };
                return self.drop_call(seq, index, None, reason);
            }
        };

        if !binding.is_callable() {
            return self.drop_call(seq, index, Some(binding.name()), DropReason::TornDown);
        }

        let timer = DispatchTimer::start();
        let (result, gc_was_enabled) = {
            let suspension = GcSuspension::acquire(self.gc.as_ref());

            // The slot may have been freed or reused between lookup and
            // suspension; only the registration we resolved may be called.
            if !self
                .registry
                .lock()
                .is_current(index, binding.generation())
            {
                drop(suspension);
                return self.drop_call(seq, index, Some(binding.name()), DropReason::Stale);
            }

            debug!(
                index = %index,
                binding = %binding.name(),
                owner = ?binding.owner(),
                gc_was_enabled = suspension.was_enabled(),
                "Dispatching"
            );

            let result = catch_unwind(AssertUnwindSafe(|| {
                binding
                    .dispatch()
                    .dispatch(binding.owner(), binding.name(), seq, request)
            }));
            (result, suspension.was_enabled())
        };
        let elapsed = timer.elapsed();

        match result {
            Ok(()) => {
                self.metrics.record_dispatch(elapsed, gc_was_enabled, false);
                trace!(
                    index = %index,
                    elapsed_us = elapsed.as_micros() as u64,
                    "Dispatch done"
                );
                DispatchOutcome::Dispatched
            }
            Err(_) => {
                self.metrics.record_dispatch(elapsed, gc_was_enabled, true);
                error!(
                    index = %index,
                    binding = %binding.name(),
                    seq = %seq,
                    "Dispatch panicked"
                );
                if !seq.is_empty() {
                    let err = CallError::new(ErrorCode::HandlerPanicked, "handler panicked")
                        .with_binding(binding.name());
                    complete(self.native.as_ref(), seq, Err(err));
                }
                DispatchOutcome::Panicked
            }
        }
    }

    fn drop_call(
        &self,
        seq: &str,
        index: BindingIndex,
        name: Option<&str>,
        reason: DropReason,
    ) -> DispatchOutcome {
        self.metrics.record_drop(reason);
        warn!(index = %index, binding = ?name, seq = %seq, reason = %reason, "Dropping call");

        if self.config.reject_dropped_calls && !seq.is_empty() {
            let mut err = CallError::new(
                reason.error_code(),
                format!("no callable binding at index {} ({})", index, reason),
            );
            if let Some(name) = name {
                err = err.with_binding(name);
            }
            complete(self.native.as_ref(), seq, Err(err));
        }

        DispatchOutcome::Dropped(reason)
    }
}

fn preview(request: &str) -> &str {
    match request.char_indices().nth(REQUEST_PREVIEW_CHARS) {
        Some((end, _)) => &request[..end],
        None => request,
    }
}
