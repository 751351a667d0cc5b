//! Shared fixtures for bridge integration tests.

#![allow(dead_code)]

use parking_lot::Mutex;
use std::sync::Arc;
use webview_bridge::gc::GcControl;
use webview_bridge::{dispatch, Bridge, BridgeConfig, Dispatch, ManualGc, OwnerHandle, RecordingNative};

/// One managed call as observed by a recording dispatch function
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Observed {
    pub owner: usize,
    pub name: String,
    pub seq: String,
    pub request: String,
    pub gc_enabled_during: bool,
}

/// A bridge wired to in-memory collaborators
pub struct Harness {
    pub bridge: Bridge,
    pub native: Arc<RecordingNative>,
    pub gc: Arc<ManualGc>,
    pub seen: Arc<Mutex<Vec<Observed>>>,
}

impl Harness {
    pub fn new(config: BridgeConfig) -> Self {
        Self::with_gc(config, true)
    }

    pub fn with_gc(config: BridgeConfig, gc_enabled: bool) -> Self {
        let native = Arc::new(RecordingNative::new());
        let gc = Arc::new(ManualGc::new(gc_enabled));
        let bridge = Bridge::new(config, gc.clone(), native.clone()).unwrap();
        Self {
            bridge,
            native,
            gc,
            seen: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Dispatch function that records every call and the collector state
    pub fn recorder(&self) -> Arc<dyn Dispatch> {
        let seen = Arc::clone(&self.seen);
        let gc = Arc::clone(&self.gc);
        dispatch::from_fn(move |owner: OwnerHandle, name: &str, seq: &str, request: &str| {
            seen.lock().push(Observed {
                owner: owner.id(),
                name: name.to_string(),
                seq: seq.to_string(),
                request: request.to_string(),
                gc_enabled_during: gc.is_enabled(),
            });
        })
    }

    pub fn seen(&self) -> Vec<Observed> {
        self.seen.lock().clone()
    }
}
