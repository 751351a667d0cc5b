//! Handler offload onto a worker pool.
//!
//! Dispatch is synchronous on the event-loop thread, so a slow handler
//! freezes the window. An [`OffloadDispatch`] copies the invocation, hands it
//! to a tokio blocking pool and returns immediately; the worker completes the
//! JS promise through `native_return` when the handler finishes.
//!
//! Offloaded handlers do not receive the owner handle: by the time they run
//! the collector is no longer suspended and the handle may be stale.
//!
//! Every submitted call settles its promise exactly once. Calls that reach a
//! stopped pool, or are discarded by shutdown before they run, are rejected
//! with `INTERNAL_ERROR`.

use super::json::{complete, run_handler};
use super::Dispatch;
use crate::config::BridgeConfig;
use crate::error::{BridgeError, CallError, ErrorCode, Result};
use crate::native::WebviewNative;
use crate::registry::OwnerHandle;
use serde_json::Value;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::{Builder, Handle, Runtime};
use tracing::{debug, info, warn};

/// Worker pool for offloaded handlers
pub struct OffloadQueue {
    runtime: Option<Runtime>,
    handle: Handle,
    native: Arc<dyn WebviewNative>,
    closed: Arc<AtomicBool>,
    submitted: Arc<AtomicU64>,
    completed: Arc<AtomicU64>,
}

impl OffloadQueue {
    /// Start a pool with `threads` workers completing calls through `native`
    pub fn new(native: Arc<dyn WebviewNative>, threads: usize) -> Result<Self> {
        if threads == 0 {
            return Err(BridgeError::InvalidState(
                "offload queue needs at least one thread".into(),
            ));
        }

        let runtime = Builder::new_multi_thread()
            .worker_threads(threads)
            .max_blocking_threads(threads)
            .thread_name("webview-bridge-offload")
            .enable_all()
            .build()?;

        info!(threads = threads, "Started handler offload pool");

        Ok(Self {
            handle: runtime.handle().clone(),
            runtime: Some(runtime),
            native,
            closed: Arc::new(AtomicBool::new(false)),
            submitted: Arc::new(AtomicU64::new(0)),
            completed: Arc::new(AtomicU64::new(0)),
        })
    }

    /// Start a pool sized by `config.offload_threads`
    pub fn from_config(native: Arc<dyn WebviewNative>, config: &BridgeConfig) -> Result<Self> {
        Self::new(native, config.offload_threads)
    }

    /// Build a dispatch function that runs `handler` on this pool
    pub fn dispatch<H>(&self, handler: H) -> Arc<dyn Dispatch>
    where
        H: Fn(Vec<Value>) -> anyhow::Result<Value> + Send + Sync + 'static,
    {
        Arc::new(OffloadDispatch {
            handle: self.handle.clone(),
            native: Arc::clone(&self.native),
            closed: Arc::clone(&self.closed),
            handler: Arc::new(handler),
            submitted: Arc::clone(&self.submitted),
            completed: Arc::clone(&self.completed),
        })
    }

    /// Calls handed to the pool so far
    pub fn submitted(&self) -> u64 {
        self.submitted.load(Ordering::SeqCst)
    }

    /// Calls whose promise has been completed
    pub fn completed(&self) -> u64 {
        self.completed.load(Ordering::SeqCst)
    }

    /// Whether the pool has stopped accepting calls
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Stop the pool, waiting up to `timeout` for running handlers
    pub fn shutdown(mut self, timeout: Duration) {
        self.closed.store(true, Ordering::SeqCst);
        info!(
            pending = self.submitted().saturating_sub(self.completed()),
            "Shutting down handler offload pool"
        );
        if let Some(runtime) = self.runtime.take() {
            runtime.shutdown_timeout(timeout);
        }
    }
}

impl Drop for OffloadQueue {
    fn drop(&mut self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

/// A submitted call whose promise has not been settled yet.
///
/// Dropping it unsettled, as happens when the runtime discards a queued
/// task, rejects the promise.
struct PendingCall {
    native: Arc<dyn WebviewNative>,
    seq: String,
    completed: Arc<AtomicU64>,
    settled: bool,
}

impl PendingCall {
    fn settle(mut self, result: std::result::Result<Value, CallError>) {
        complete(self.native.as_ref(), &self.seq, result);
        self.settled = true;
        self.completed.fetch_add(1, Ordering::SeqCst);
    }
}

impl Drop for PendingCall {
    fn drop(&mut self) {
        if !self.settled {
            warn!(seq = %self.seq, "Offloaded call discarded before it ran");
            complete(self.native.as_ref(), &self.seq, Err(pool_stopped()));
            self.completed.fetch_add(1, Ordering::SeqCst);
        }
    }
}

fn pool_stopped() -> CallError {
    CallError::new(ErrorCode::InternalError, "offload pool stopped")
}

/// Dispatch function that forwards to an [`OffloadQueue`]
pub struct OffloadDispatch<H> {
    handle: Handle,
    native: Arc<dyn WebviewNative>,
    closed: Arc<AtomicBool>,
    handler: Arc<H>,
    submitted: Arc<AtomicU64>,
    completed: Arc<AtomicU64>,
}

impl<H> Dispatch for OffloadDispatch<H>
where
    H: Fn(Vec<Value>) -> anyhow::Result<Value> + Send + Sync + 'static,
{
    fn dispatch(&self, _owner: OwnerHandle, name: &str, seq: &str, request: &str) {
        if self.closed.load(Ordering::SeqCst) {
            warn!(binding = %name, seq = %seq, "Offload pool stopped, rejecting call");
            complete(
                self.native.as_ref(),
                seq,
                Err(pool_stopped().with_binding(name)),
            );
            return;
        }

        let name = name.to_string();
        let request = request.to_string();
        let handler = Arc::clone(&self.handler);
        let pending = PendingCall {
            native: Arc::clone(&self.native),
            seq: seq.to_string(),
            completed: Arc::clone(&self.completed),
            settled: false,
        };

        self.submitted.fetch_add(1, Ordering::SeqCst);
        debug!(binding = %name, seq = %seq, "Offloading call");

        self.handle.spawn_blocking(move || {
            let result = run_handler(&name, &request, |args| handler(args));
            pending.settle(result);
        });
    }
}
