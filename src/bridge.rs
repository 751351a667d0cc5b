//! The bridge service object.
//!
//! A [`Bridge`] owns the binding registry together with the collector and
//! native-library collaborators, and is what the trampoline dispatches
//! through. Tests build as many independent bridges as they like; the C
//! entry points use the one process-wide instance set by [`install`].

use crate::config::BridgeConfig;
use crate::dispatch::Dispatch;
use crate::error::{BridgeError, Result};
use crate::gc::GcControl;
use crate::metrics::{BridgeStats, MetricsCollector};
use crate::native::WebviewNative;
use crate::registry::{Binding, BindingIndex, BindingRegistry, OwnerHandle};
use once_cell::sync::OnceCell;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

static GLOBAL: OnceCell<Bridge> = OnceCell::new();

/// Binding registry plus the collaborators needed to dispatch into it
pub struct Bridge {
    pub(crate) config: BridgeConfig,
    pub(crate) registry: Mutex<BindingRegistry>,
    /// Held across a registry change and its native bind/unbind, so the two
    /// never disagree. The trampoline only takes `registry`.
    operations: Mutex<()>,
    pub(crate) gc: Arc<dyn GcControl>,
    pub(crate) native: Arc<dyn WebviewNative>,
    pub(crate) metrics: MetricsCollector,
}

impl Bridge {
    /// Create a bridge with an empty registry
    pub fn new(
        config: BridgeConfig,
        gc: Arc<dyn GcControl>,
        native: Arc<dyn WebviewNative>,
    ) -> Result<Self> {
        config.validate()?;

        info!(
            capacity = config.capacity,
            max_name_len = config.max_name_len,
            reject_dropped_calls = config.reject_dropped_calls,
            "Initializing binding bridge"
        );

        Ok(Self {
            registry: Mutex::new(BindingRegistry::from_config(&config)),
            operations: Mutex::new(()),
            config,
            gc,
            native,
            metrics: MetricsCollector::new(),
        })
    }

    /// Register a JS-callable binding and expose it to the page.
    ///
    /// The slot is rolled back if the native library refuses the name.
    /// Concurrent register and unregister calls are serialised, including
    /// their native half.
    #[instrument(skip(self, dispatch))]
    pub fn register_binding(
        &self,
        name: &str,
        owner: OwnerHandle,
        dispatch: Arc<dyn Dispatch>,
    ) -> Result<BindingIndex> {
        let _serial = self.operations.lock();
        let registered = self.registry.lock().register(name, owner, dispatch);
        let binding = match registered {
            Ok(binding) => binding,
            Err(e) => {
                warn!(error = %e, "Registration failed");
                self.metrics.record_registration_failure(&e.code().to_string());
                return Err(e);
            }
        };

        let index = binding.index();
        if let Err(status) = self.native.bind(binding.name(), index) {
            self.registry
                .lock()
                .remove_exact(index, binding.generation());
            warn!(index = %index, error = %status, "Native bind failed, slot released");
            let err = BridgeError::Native(status);
            self.metrics.record_registration_failure(&err.code().to_string());
            return Err(err);
        }

        self.metrics.record_registration();
        debug!(
            index = %index,
            bound_name = %binding.name(),
            generation = binding.generation(),
            "Binding registered"
        );
        Ok(index)
    }

    /// Remove a binding by name.
    ///
    /// Returns the freed slot, or `None` if no active binding had that name.
    /// Removing an unknown name is not an error.
    #[instrument(skip(self))]
    pub fn unregister_binding(&self, name: &str) -> Option<BindingIndex> {
        let _serial = self.operations.lock();
        let removed = self.registry.lock().unregister(name);
        let binding = match removed {
            Some(binding) => binding,
            None => {
                debug!("No active binding to remove");
                return None;
            }
        };

        if let Err(status) = self.native.unbind(binding.name()) {
            warn!(error = %status, "Native unbind failed");
        }

        self.metrics.record_unregistration();
        debug!(index = %binding.index(), "Binding removed");
        Some(binding.index())
    }

    /// Active binding at `index`
    pub fn lookup(&self, index: BindingIndex) -> Option<Arc<Binding>> {
        self.registry.lock().lookup(index)
    }

    /// Slot of the active binding named `name`
    pub fn index_of(&self, name: &str) -> Option<BindingIndex> {
        self.registry.lock().index_of(name)
    }

    /// Active bindings as `(index, name)` in slot order
    pub fn bindings(&self) -> Vec<(BindingIndex, String)> {
        self.registry
            .lock()
            .iter()
            .map(|binding| (binding.index(), binding.name().to_string()))
            .collect()
    }

    /// Bridge configuration
    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// Native library the bridge completes calls through
    pub fn native(&self) -> &Arc<dyn WebviewNative> {
        &self.native
    }

    /// Metrics collector
    pub fn metrics(&self) -> &MetricsCollector {
        &self.metrics
    }

    /// Get bridge statistics
    pub fn stats(&self) -> BridgeStats {
        let registry = self.registry.lock();
        BridgeStats {
            capacity: registry.capacity(),
            active_bindings: registry.len(),
            registrations: self.metrics.registrations(),
            dispatches: self.metrics.dispatches(),
            dropped_calls: self.metrics.dropped_total(),
            avg_dispatch_time_us: self.metrics.avg_dispatch_time_us(),
        }
    }

    /// Get Prometheus metrics
    pub fn prometheus_metrics(&self) -> String {
        let mut output = self.metrics.to_prometheus();
        let registry = self.registry.lock();
        output.push_str("\n# HELP webview_bridge_active_bindings Active bindings\n");
        output.push_str("# TYPE webview_bridge_active_bindings gauge\n");
        output.push_str(&format!(
            "webview_bridge_active_bindings {}\n",
            registry.len()
        ));
        output.push_str(&format!(
            "webview_bridge_binding_capacity {}\n",
            registry.capacity()
        ));
        output
    }
}

impl std::fmt::Debug for Bridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bridge")
            .field("config", &self.config)
            .field("registry", &*self.registry.lock())
            .finish_non_exhaustive()
    }
}

/// Make `bridge` the process-wide instance used by the C entry points.
///
/// Fails if one is already installed.
pub fn install(bridge: Bridge) -> Result<&'static Bridge> {
    GLOBAL
        .try_insert(bridge)
        .map_err(|_| BridgeError::AlreadyInstalled)
}

/// The process-wide instance, if installed
pub fn global() -> Option<&'static Bridge> {
    GLOBAL.get()
}
