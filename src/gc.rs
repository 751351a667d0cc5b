//! Collector coordination for calls into managed code.
//!
//! Owner handles stored in the registry are raw references into the host's
//! heap. They stay valid only while the host collector cannot move or reclaim
//! objects, so every dispatch runs inside a [`GcSuspension`].

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// Control surface of the host runtime's garbage collector
pub trait GcControl: Send + Sync {
    /// Whether collection is currently enabled
    fn is_enabled(&self) -> bool;

    /// Stop collection
    fn suspend(&self);

    /// Restart collection
    fn resume(&self);
}

/// RAII bracket around a call into managed code.
///
/// Records whether collection was enabled, suspends it if so, and on drop
/// resumes it only in that case. A collector that the caller had already
/// stopped stays stopped.
#[must_use = "the collector is resumed when the guard is dropped"]
pub struct GcSuspension<'a> {
    gc: &'a dyn GcControl,
    was_enabled: bool,
}

impl<'a> GcSuspension<'a> {
    /// Suspend `gc` if it is enabled
    pub fn acquire(gc: &'a dyn GcControl) -> Self {
        let was_enabled = gc.is_enabled();
        if was_enabled {
            gc.suspend();
            tracing::trace!("GC suspended");
        }
        Self { gc, was_enabled }
    }

    /// Whether this guard stopped the collector
    pub fn was_enabled(&self) -> bool {
        self.was_enabled
    }
}

impl Drop for GcSuspension<'_> {
    fn drop(&mut self) {
        if self.was_enabled {
            self.gc.resume();
            tracing::trace!("GC resumed");
        }
    }
}

/// Flag-backed collector switch.
///
/// Suits hosts that poll a flag before collecting, and tests.
#[derive(Debug)]
pub struct ManualGc {
    enabled: AtomicBool,
    suspends: AtomicU64,
    resumes: AtomicU64,
}

impl ManualGc {
    /// Create a switch in the given state
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled: AtomicBool::new(enabled),
            suspends: AtomicU64::new(0),
            resumes: AtomicU64::new(0),
        }
    }

    /// Number of `suspend` calls so far
    pub fn suspend_count(&self) -> u64 {
        self.suspends.load(Ordering::SeqCst)
    }

    /// Number of `resume` calls so far
    pub fn resume_count(&self) -> u64 {
        self.resumes.load(Ordering::SeqCst)
    }
}

impl Default for ManualGc {
    fn default() -> Self {
        Self::new(true)
    }
}

impl GcControl for ManualGc {
    fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    fn suspend(&self) {
        self.suspends.fetch_add(1, Ordering::SeqCst);
        self.enabled.store(false, Ordering::SeqCst);
    }

    fn resume(&self) {
        self.resumes.fetch_add(1, Ordering::SeqCst);
        self.enabled.store(true, Ordering::SeqCst);
    }
}

/// Collector for hosts without a moving or reclaiming GC
#[derive(Debug, Default, Clone, Copy)]
pub struct NoGc;

impl GcControl for NoGc {
    fn is_enabled(&self) -> bool {
        false
    }

    fn suspend(&self) {}

    fn resume(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_suspension_restores_enabled() {
        let gc = ManualGc::new(true);
        {
            let guard = GcSuspension::acquire(&gc);
            assert!(guard.was_enabled());
            assert!(!gc.is_enabled());
        }
        assert!(gc.is_enabled());
        assert_eq!(gc.suspend_count(), 1);
        assert_eq!(gc.resume_count(), 1);
    }

    #[test]
    fn test_suspension_keeps_disabled() {
        let gc = ManualGc::new(false);
        {
            let guard = GcSuspension::acquire(&gc);
            assert!(!guard.was_enabled());
            assert!(!gc.is_enabled());
        }
        assert!(!gc.is_enabled());
        assert_eq!(gc.suspend_count(), 0);
        assert_eq!(gc.resume_count(), 0);
    }

    #[test]
    fn test_nested_suspension() {
        let gc = ManualGc::new(true);
        {
            let _outer = GcSuspension::acquire(&gc);
            {
                let inner = GcSuspension::acquire(&gc);
                assert!(!inner.was_enabled());
            }
            // Inner guard must not re-enable under the outer one
            assert!(!gc.is_enabled());
        }
        assert!(gc.is_enabled());
    }

    #[test]
    fn test_suspension_restored_on_unwind() {
        let gc = ManualGc::new(true);
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _guard = GcSuspension::acquire(&gc);
            panic!("handler blew up");
        }));
        assert!(result.is_err());
        assert!(gc.is_enabled());
    }

    #[test]
    fn test_no_gc() {
        let gc = NoGc;
        let guard = GcSuspension::acquire(&gc);
        assert!(!guard.was_enabled());
    }
}
