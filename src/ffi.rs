//! C ABI surface for host runtimes.
//!
//! A host language that can call C registers bindings through
//! [`wvb_register_binding`] and hands [`wvb_dispatch_trampoline`] to
//! `webview_bind`. Both go through the process-wide bridge set by
//! [`crate::install`] (or `wvb_install` with the `native` feature).
//!
//! Nothing here unwinds into C: every entry point catches panics and maps
//! errors onto the integer codes in [`crate::error::error_codes`].

use crate::bridge::{self, Bridge};
use crate::dispatch::{complete, Dispatch};
use crate::error::{error_codes, BridgeError, CallError, Result};
use crate::gc::GcControl;
use crate::native::WebviewNative;
use crate::registry::{BindingIndex, OwnerHandle};
use std::borrow::Cow;
use std::ffi::{c_char, c_int, c_void, CStr, CString};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{error, warn};

/// Managed dispatch entry point: `(owner, name, seq, request)`
pub type RawDispatchFn =
    unsafe extern "C" fn(*mut c_void, *const c_char, *const c_char, *const c_char);

/// Collector hooks supplied by the host runtime
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct GcHooks {
    /// Nonzero while collection is enabled
    pub gc_enabled: Option<unsafe extern "C" fn() -> c_int>,
    /// Stop collection
    pub gc_stop: Option<unsafe extern "C" fn()>,
    /// Restart collection
    pub gc_run: Option<unsafe extern "C" fn()>,
}

/// [`GcControl`] over host-supplied C hooks
#[derive(Debug, Clone, Copy)]
pub struct ExternGc {
    enabled: unsafe extern "C" fn() -> c_int,
    stop: unsafe extern "C" fn(),
    run: unsafe extern "C" fn(),
}

impl ExternGc {
    /// Adapt `hooks`; every hook must be present
    pub fn new(hooks: GcHooks) -> Result<Self> {
        match (hooks.gc_enabled, hooks.gc_stop, hooks.gc_run) {
            (Some(enabled), Some(stop), Some(run)) => Ok(Self { enabled, stop, run }),
            _ => Err(BridgeError::InvalidState(
                "GC hooks must all be non-null".into(),
            )),
        }
    }
}

impl GcControl for ExternGc {
    fn is_enabled(&self) -> bool {
        // SAFETY: hooks are host-provided functions taking no arguments.
        unsafe { (self.enabled)() != 0 }
    }

    fn suspend(&self) {
        // SAFETY: as above.
        unsafe { (self.stop)() }
    }

    fn resume(&self) {
        // SAFETY: as above.
        unsafe { (self.run)() }
    }
}

/// [`Dispatch`] over a C callback, which may be null.
///
/// A call whose arguments cannot be passed as C strings is rejected through
/// `native` instead of reaching the callback.
pub struct RawDispatch {
    callback: Option<RawDispatchFn>,
    native: Arc<dyn WebviewNative>,
}

impl RawDispatch {
    /// Wrap a possibly-null callback
    pub fn new(callback: Option<RawDispatchFn>, native: Arc<dyn WebviewNative>) -> Self {
        Self { callback, native }
    }
}

impl std::fmt::Debug for RawDispatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RawDispatch")
            .field("callback", &self.callback)
            .finish_non_exhaustive()
    }
}

impl Dispatch for RawDispatch {
    fn dispatch(&self, owner: OwnerHandle, name: &str, seq: &str, request: &str) {
        let Some(callback) = self.callback else {
            return;
        };

        let (name, seq, request) = match (
            CString::new(name),
            CString::new(seq),
            CString::new(request),
        ) {
            (Ok(name), Ok(seq), Ok(request)) => (name, seq, request),
            _ => {
                warn!(binding = %name, "Interior NUL in call arguments, not dispatching");
                let err = CallError::bad_request("call arguments contain a NUL byte")
                    .with_binding(name);
                complete(self.native.as_ref(), seq, Err(err));
                return;
            }
        };

        // SAFETY: the callback was registered by the host for this owner; the
        // strings outlive the call.
        unsafe { callback(owner.as_ptr(), name.as_ptr(), seq.as_ptr(), request.as_ptr()) }
    }

    fn is_callable(&self) -> bool {
        self.callback.is_some()
    }
}

/// Read a C string, replacing invalid UTF-8; null reads as empty.
///
/// # Safety
/// `ptr` must be null or point to a NUL-terminated string.
unsafe fn lossy<'a>(ptr: *const c_char) -> Cow<'a, str> {
    if ptr.is_null() {
        Cow::Borrowed("")
    } else {
        // SAFETY: upheld by the caller.
        unsafe { CStr::from_ptr(ptr) }.to_string_lossy()
    }
}

/// Read a C string that must be valid UTF-8.
///
/// # Safety
/// `ptr` must be null or point to a NUL-terminated string.
unsafe fn strict<'a>(ptr: *const c_char) -> Option<&'a str> {
    if ptr.is_null() {
        None
    } else {
        // SAFETY: upheld by the caller.
        unsafe { CStr::from_ptr(ptr) }.to_str().ok()
    }
}

fn installed() -> std::result::Result<&'static Bridge, c_int> {
    bridge::global().ok_or(error_codes::NOT_INSTALLED)
}

/// Trampoline handed to `webview_bind`; `arg` carries the slot index.
///
/// # Safety
/// `seq` and `req` must be null or NUL-terminated strings. `arg` is treated
/// as an integer and never dereferenced.
#[no_mangle]
pub unsafe extern "C" fn wvb_dispatch_trampoline(
    seq: *const c_char,
    req: *const c_char,
    arg: *mut c_void,
) {
    let index = BindingIndex::from_token(arg);
    let Ok(bridge) = installed() else {
        warn!(index = %index, "Trampoline called before a bridge was installed");
        return;
    };

    // SAFETY: upheld by the caller.
    let (seq, req) = unsafe { (lossy(seq), lossy(req)) };

    let result = catch_unwind(AssertUnwindSafe(|| bridge.dispatch(&seq, &req, index)));
    if result.is_err() {
        error!(index = %index, "Trampoline panicked");
    }
}

/// Register a binding; returns its slot index or a negative error code.
///
/// # Safety
/// `name` must be null or a NUL-terminated string. `owner` is stored as an
/// opaque value and only passed back to `callback`.
#[no_mangle]
pub unsafe extern "C" fn wvb_register_binding(
    name: *const c_char,
    owner: *mut c_void,
    callback: Option<RawDispatchFn>,
) -> c_int {
    let bridge = match installed() {
        Ok(bridge) => bridge,
        Err(code) => return code,
    };
    // SAFETY: upheld by the caller.
    let Some(name) = (unsafe { strict(name) }) else {
        return error_codes::INVALID_ARGUMENT;
    };

    let result = catch_unwind(AssertUnwindSafe(|| {
        bridge.register_binding(
            name,
            OwnerHandle::from_raw(owner),
            Arc::new(RawDispatch::new(callback, Arc::clone(bridge.native()))),
        )
    }));

    match result {
        Ok(Ok(index)) => c_int::try_from(index.get()).unwrap_or(error_codes::INTERNAL_ERROR),
        Ok(Err(e)) => e.to_abi_code(),
        Err(_) => error_codes::INTERNAL_ERROR,
    }
}

/// Remove a binding by name; unknown names succeed.
///
/// # Safety
/// `name` must be null or a NUL-terminated string.
#[no_mangle]
pub unsafe extern "C" fn wvb_unregister_binding(name: *const c_char) -> c_int {
    let bridge = match installed() {
        Ok(bridge) => bridge,
        Err(code) => return code,
    };
    // SAFETY: upheld by the caller.
    let Some(name) = (unsafe { strict(name) }) else {
        return error_codes::INVALID_ARGUMENT;
    };

    match catch_unwind(AssertUnwindSafe(|| bridge.unregister_binding(name))) {
        Ok(_) => error_codes::SUCCESS,
        Err(_) => error_codes::INTERNAL_ERROR,
    }
}
