//! Bridge metrics for monitoring and observability.
//!
//! Counts registrations, dispatches, dropped calls and collector
//! suspensions, and exports them in Prometheus text format.

use crate::dispatch::DropReason;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Point-in-time view of the bridge
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BridgeStats {
    /// Registry capacity
    pub capacity: usize,

    /// Active bindings
    pub active_bindings: usize,

    /// Successful registrations
    pub registrations: u64,

    /// Calls that reached managed dispatch
    pub dispatches: u64,

    /// Calls dropped before reaching managed dispatch
    pub dropped_calls: u64,

    /// Average dispatch time in microseconds
    pub avg_dispatch_time_us: f64,
}

/// Metrics collector for aggregating bridge metrics
pub struct MetricsCollector {
    registrations: AtomicU64,
    unregistrations: AtomicU64,
    dispatches: AtomicU64,
    panics: AtomicU64,
    gc_suspensions: AtomicU64,
    total_dispatch_time_us: AtomicU64,
    max_dispatch_time_us: AtomicU64,
    registration_failures: parking_lot::Mutex<HashMap<String, u64>>,
    dropped: parking_lot::Mutex<HashMap<DropReason, u64>>,
}

impl MetricsCollector {
    /// Create a new metrics collector
    pub fn new() -> Self {
        Self {
            registrations: AtomicU64::new(0),
            unregistrations: AtomicU64::new(0),
            dispatches: AtomicU64::new(0),
            panics: AtomicU64::new(0),
            gc_suspensions: AtomicU64::new(0),
            total_dispatch_time_us: AtomicU64::new(0),
            max_dispatch_time_us: AtomicU64::new(0),
            registration_failures: parking_lot::Mutex::new(HashMap::new()),
            dropped: parking_lot::Mutex::new(HashMap::new()),
        }
    }

    /// Record a successful registration
    pub fn record_registration(&self) {
        self.registrations.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a failed registration by error code
    pub fn record_registration_failure(&self, code: &str) {
        let mut failures = self.registration_failures.lock();
        *failures.entry(code.to_string()).or_insert(0) += 1;
    }

    /// Record a removed binding
    pub fn record_unregistration(&self) {
        self.unregistrations.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a call that reached managed dispatch
    pub fn record_dispatch(&self, elapsed: Duration, gc_suspended: bool, panicked: bool) {
        self.dispatches.fetch_add(1, Ordering::Relaxed);
        if gc_suspended {
            self.gc_suspensions.fetch_add(1, Ordering::Relaxed);
        }
        if panicked {
            self.panics.fetch_add(1, Ordering::Relaxed);
        }

        let us = elapsed.as_micros() as u64;
        self.total_dispatch_time_us.fetch_add(us, Ordering::Relaxed);
        self.max_dispatch_time_us.fetch_max(us, Ordering::Relaxed);
    }

    /// Record a dropped call
    pub fn record_drop(&self, reason: DropReason) {
        let mut dropped = self.dropped.lock();
        *dropped.entry(reason).or_insert(0) += 1;
    }

    /// Get successful registrations
    pub fn registrations(&self) -> u64 {
        self.registrations.load(Ordering::Relaxed)
    }

    /// Get removed bindings
    pub fn unregistrations(&self) -> u64 {
        self.unregistrations.load(Ordering::Relaxed)
    }

    /// Get dispatched calls
    pub fn dispatches(&self) -> u64 {
        self.dispatches.load(Ordering::Relaxed)
    }

    /// Get panicking dispatches
    pub fn panics(&self) -> u64 {
        self.panics.load(Ordering::Relaxed)
    }

    /// Get dispatches that suspended the collector
    pub fn gc_suspensions(&self) -> u64 {
        self.gc_suspensions.load(Ordering::Relaxed)
    }

    /// Get dropped calls across all reasons
    pub fn dropped_total(&self) -> u64 {
        self.dropped.lock().values().sum()
    }

    /// Get dropped calls for one reason
    pub fn dropped(&self, reason: DropReason) -> u64 {
        self.dropped.lock().get(&reason).copied().unwrap_or(0)
    }

    /// Get registration failures by code
    pub fn registration_failures(&self) -> HashMap<String, u64> {
        self.registration_failures.lock().clone()
    }

    /// Get average dispatch time in microseconds
    pub fn avg_dispatch_time_us(&self) -> f64 {
        let total = self.dispatches();
        if total == 0 {
            0.0
        } else {
            self.total_dispatch_time_us.load(Ordering::Relaxed) as f64 / total as f64
        }
    }

    /// Get the slowest dispatch in microseconds
    pub fn max_dispatch_time_us(&self) -> u64 {
        self.max_dispatch_time_us.load(Ordering::Relaxed)
    }

    /// Export Prometheus-format metrics
    pub fn to_prometheus(&self) -> String {
        let mut output = String::new();

        output.push_str("# HELP webview_bridge_registrations_total Binding registrations\n");
        output.push_str("# TYPE webview_bridge_registrations_total counter\n");
        output.push_str(&format!(
            "webview_bridge_registrations_total{{status=\"success\"}} {}\n",
            self.registrations()
        ));
        for (code, count) in self.registration_failures() {
            output.push_str(&format!(
                "webview_bridge_registrations_total{{status=\"error\",code=\"{}\"}} {}\n",
                code, count
            ));
        }

        output.push_str("\n# HELP webview_bridge_unregistrations_total Bindings removed\n");
        output.push_str("# TYPE webview_bridge_unregistrations_total counter\n");
        output.push_str(&format!(
            "webview_bridge_unregistrations_total {}\n",
            self.unregistrations()
        ));

        output.push_str("\n# HELP webview_bridge_dispatches_total Calls dispatched into managed code\n");
        output.push_str("# TYPE webview_bridge_dispatches_total counter\n");
        output.push_str(&format!(
            "webview_bridge_dispatches_total{{outcome=\"completed\"}} {}\n",
            self.dispatches().saturating_sub(self.panics())
        ));
        output.push_str(&format!(
            "webview_bridge_dispatches_total{{outcome=\"panicked\"}} {}\n",
            self.panics()
        ));

        output.push_str("\n# HELP webview_bridge_dropped_calls_total Calls dropped by the trampoline\n");
        output.push_str("# TYPE webview_bridge_dropped_calls_total counter\n");
        let dropped = self.dropped.lock().clone();
        for (reason, count) in dropped {
            output.push_str(&format!(
                "webview_bridge_dropped_calls_total{{reason=\"{}\"}} {}\n",
                reason, count
            ));
        }

        output.push_str("\n# HELP webview_bridge_gc_suspensions_total Collector suspensions around dispatch\n");
        output.push_str("# TYPE webview_bridge_gc_suspensions_total counter\n");
        output.push_str(&format!(
            "webview_bridge_gc_suspensions_total {}\n",
            self.gc_suspensions()
        ));

        output.push_str("\n# HELP webview_bridge_dispatch_time_us Average dispatch time\n");
        output.push_str("# TYPE webview_bridge_dispatch_time_us gauge\n");
        output.push_str(&format!(
            "webview_bridge_dispatch_time_us {:.2}\n",
            self.avg_dispatch_time_us()
        ));

        output
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}

/// Timer for measuring dispatch duration
pub struct DispatchTimer {
    start: Instant,
}

impl DispatchTimer {
    /// Start a new timer
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Get elapsed time
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}
