//! Binding slot contents and the typed index that crosses the native boundary.

use crate::dispatch::Dispatch;
use std::ffi::c_void;
use std::fmt;
use std::sync::Arc;

/// Slot index of a binding.
///
/// This is the only identifier handed to the native library, smuggled through
/// its `void*` argument. Tokens coming back are decoded into a
/// `BindingIndex` and bounds-checked by the registry; they are never
/// dereferenced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BindingIndex(usize);

impl BindingIndex {
    /// Wrap a slot number
    pub const fn new(index: usize) -> Self {
        Self(index)
    }

    /// Slot number
    pub const fn get(self) -> usize {
        self.0
    }

    /// Encode as the opaque word passed to `webview_bind`
    pub fn into_token(self) -> *mut c_void {
        self.0 as *mut c_void
    }

    /// Decode an opaque word received by the trampoline
    pub fn from_token(token: *mut c_void) -> Self {
        Self(token as usize)
    }
}

impl fmt::Display for BindingIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Non-owning reference to a managed-runtime object.
///
/// The bridge never dereferences it; it is only handed back to the binding's
/// dispatch function while the host collector is suspended.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct OwnerHandle(*mut c_void);

// SAFETY: the pointer is opaque to this crate and only ever passed back to
// the host runtime, which owns the pointee and its thread affinity.
unsafe impl Send for OwnerHandle {}
unsafe impl Sync for OwnerHandle {}

impl OwnerHandle {
    /// Wrap a raw managed-object pointer
    pub const fn from_raw(ptr: *mut c_void) -> Self {
        Self(ptr)
    }

    /// Handle that refers to nothing
    pub const fn null() -> Self {
        Self(std::ptr::null_mut())
    }

    /// Wrap an integer id for hosts that address objects by id
    pub const fn from_id(id: usize) -> Self {
        Self(id as *mut c_void)
    }

    /// Raw pointer value
    pub fn as_ptr(&self) -> *mut c_void {
        self.0
    }

    /// Integer value of the handle
    pub fn id(&self) -> usize {
        self.0 as usize
    }

    /// Whether the handle is null
    pub fn is_null(&self) -> bool {
        self.0.is_null()
    }
}

impl fmt::Debug for OwnerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "OwnerHandle({:p})", self.0)
    }
}

/// One JS-callable name backed by a managed handler.
///
/// Lookups hand out `Arc<Binding>`, so the handle and dispatch object outlive
/// a racing unregister until the in-flight call finishes.
pub struct Binding {
    pub(crate) name: String,
    pub(crate) owner: OwnerHandle,
    pub(crate) dispatch: Arc<dyn Dispatch>,
    pub(crate) index: BindingIndex,
    pub(crate) generation: u64,
}

impl Binding {
    /// JS-visible name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Managed owner object
    pub fn owner(&self) -> OwnerHandle {
        self.owner
    }

    /// Dispatch function resolved at registration
    pub fn dispatch(&self) -> &Arc<dyn Dispatch> {
        &self.dispatch
    }

    /// Slot the binding occupies
    pub fn index(&self) -> BindingIndex {
        self.index
    }

    /// Registration stamp, unique for the registry's lifetime
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Whether the trampoline may call into this binding
    pub fn is_callable(&self) -> bool {
        !self.owner.is_null() && self.dispatch.is_callable()
    }
}

impl fmt::Debug for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Binding")
            .field("name", &self.name)
            .field("owner", &self.owner)
            .field("index", &self.index)
            .field("generation", &self.generation)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_roundtrip() {
        let index = BindingIndex::new(17);
        assert_eq!(BindingIndex::from_token(index.into_token()), index);
        assert_eq!(BindingIndex::from_token(std::ptr::null_mut()).get(), 0);
    }

    #[test]
    fn test_owner_handle() {
        assert!(OwnerHandle::null().is_null());
        let handle = OwnerHandle::from_id(0xbeef);
        assert!(!handle.is_null());
        assert_eq!(handle.id(), 0xbeef);
    }
}
