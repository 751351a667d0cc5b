//! libwebview backend.
//!
//! Raw declarations for the webview C API plus [`LibWebview`], the safe
//! handle the bridge binds and completes calls through. Linking requires
//! the `webview` library to be available to the linker.

use super::{NativeResult, NativeStatus, ReturnStatus, WebviewNative};
use crate::bridge::{self, Bridge};
use crate::config::BridgeConfig;
use crate::error::{error_codes, BridgeError, Result};
use crate::ffi::{self, ExternGc, GcHooks};
use crate::logging;
use crate::registry::BindingIndex;
use std::ffi::{c_char, c_int, c_void, CStr, CString};
use std::sync::Arc;
use std::thread::{self, ThreadId};
use tracing::{debug, info, warn};

/// `void (*fn)(const char *id, const char *req, void *arg)`
pub type BindFn = unsafe extern "C" fn(*const c_char, *const c_char, *mut c_void);

#[link(name = "webview")]
extern "C" {
    fn webview_create(debug: c_int, window: *mut c_void) -> *mut c_void;
    fn webview_destroy(w: *mut c_void) -> c_int;
    fn webview_run(w: *mut c_void) -> c_int;
    fn webview_terminate(w: *mut c_void) -> c_int;
    fn webview_get_window(w: *mut c_void) -> *mut c_void;
    fn webview_set_title(w: *mut c_void, title: *const c_char) -> c_int;
    fn webview_set_size(w: *mut c_void, width: c_int, height: c_int, hints: c_int) -> c_int;
    fn webview_navigate(w: *mut c_void, url: *const c_char) -> c_int;
    fn webview_set_html(w: *mut c_void, html: *const c_char) -> c_int;
    fn webview_init(w: *mut c_void, js: *const c_char) -> c_int;
    fn webview_eval(w: *mut c_void, js: *const c_char) -> c_int;
    fn webview_bind(
        w: *mut c_void,
        name: *const c_char,
        func: Option<BindFn>,
        arg: *mut c_void,
    ) -> c_int;
    fn webview_unbind(w: *mut c_void, name: *const c_char) -> c_int;
    fn webview_return(
        w: *mut c_void,
        id: *const c_char,
        status: c_int,
        result: *const c_char,
    ) -> c_int;
}

/// Window sizing behavior (`webview_hint_t`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SizeHint {
    /// Width and height are default size
    #[default]
    None,
    /// Width and height are minimum bounds
    Min,
    /// Width and height are maximum bounds
    Max,
    /// Window size can not be changed by a user
    Fixed,
}

impl SizeHint {
    fn code(self) -> c_int {
        match self {
            SizeHint::None => 0,
            SizeHint::Min => 1,
            SizeHint::Max => 2,
            SizeHint::Fixed => 3,
        }
    }
}

fn c_string(value: &str) -> std::result::Result<CString, NativeStatus> {
    CString::new(value).map_err(|_| NativeStatus::InvalidArgument)
}

/// Handle to a webview instance.
///
/// The library is single-threaded: everything except `terminate` and
/// `webview_return` must run on the thread that owns the event loop. The
/// handle records that thread when it is created or wrapped, and calls from
/// any other thread fail with [`NativeStatus::InvalidState`] without
/// touching the library.
pub struct LibWebview {
    raw: *mut c_void,
    owned: bool,
    loop_thread: ThreadId,
}

// SAFETY: every call that the library confines to the UI thread goes through
// `on_loop_thread`, which refuses other threads before `raw` is used.
// `webview_terminate` and `webview_return` are thread-safe in the library.
unsafe impl Send for LibWebview {}
unsafe impl Sync for LibWebview {}

impl LibWebview {
    /// Create a new window; `debug` enables developer tools
    pub fn create(debug: bool) -> Result<Self> {
        // SAFETY: a null window asks the library to create its own.
        let raw = unsafe { webview_create(c_int::from(debug), std::ptr::null_mut()) };
        if raw.is_null() {
            return Err(BridgeError::Native(NativeStatus::Unspecified));
        }
        let debug_enabled = debug;
        info!(debug = debug_enabled, "Created webview");
        Ok(Self {
            raw,
            owned: true,
            loop_thread: thread::current().id(),
        })
    }

    /// Wrap a webview created elsewhere. It is not destroyed on drop.
    ///
    /// Must be called on the thread that runs the webview's event loop.
    ///
    /// # Safety
    /// `raw` must be a live `webview_t` that outlives the returned value.
    pub unsafe fn from_raw(raw: *mut c_void) -> Self {
        Self {
            raw,
            owned: false,
            loop_thread: thread::current().id(),
        }
    }

    fn on_loop_thread(&self) -> NativeResult {
        if thread::current().id() == self.loop_thread {
            Ok(())
        } else {
            warn!(
                loop_thread = ?self.loop_thread,
                "webview call from outside the event-loop thread refused"
            );
            Err(NativeStatus::InvalidState)
        }
    }

    /// Underlying `webview_t`
    pub fn as_ptr(&self) -> *mut c_void {
        self.raw
    }

    /// Native window handle
    pub fn window(&self) -> *mut c_void {
        // SAFETY: `raw` is live for the lifetime of `self`.
        unsafe { webview_get_window(self.raw) }
    }

    /// Run the event loop until terminated
    pub fn run(&self) -> NativeResult {
        self.on_loop_thread()?;
        // SAFETY: as above.
        NativeStatus::check(unsafe { webview_run(self.raw) })
    }

    /// Stop the event loop; callable from any thread
    pub fn terminate(&self) -> NativeResult {
        // SAFETY: as above.
        NativeStatus::check(unsafe { webview_terminate(self.raw) })
    }

    /// Set the window title
    pub fn set_title(&self, title: &str) -> NativeResult {
        self.on_loop_thread()?;
        let title = c_string(title)?;
        // SAFETY: as above; `title` outlives the call.
        NativeStatus::check(unsafe { webview_set_title(self.raw, title.as_ptr()) })
    }

    /// Resize the window
    pub fn set_size(&self, width: i32, height: i32, hint: SizeHint) -> NativeResult {
        self.on_loop_thread()?;
        // SAFETY: as above.
        NativeStatus::check(unsafe { webview_set_size(self.raw, width, height, hint.code()) })
    }

    /// Load a URL
    pub fn navigate(&self, url: &str) -> NativeResult {
        self.on_loop_thread()?;
        let url = c_string(url)?;
        // SAFETY: as above.
        NativeStatus::check(unsafe { webview_navigate(self.raw, url.as_ptr()) })
    }

    /// Load HTML content directly
    pub fn set_html(&self, html: &str) -> NativeResult {
        self.on_loop_thread()?;
        let html = c_string(html)?;
        // SAFETY: as above.
        NativeStatus::check(unsafe { webview_set_html(self.raw, html.as_ptr()) })
    }

    /// Inject JS that runs before every page load
    pub fn init(&self, js: &str) -> NativeResult {
        self.on_loop_thread()?;
        let js = c_string(js)?;
        // SAFETY: as above.
        NativeStatus::check(unsafe { webview_init(self.raw, js.as_ptr()) })
    }

    /// Evaluate JS in the current page
    pub fn eval(&self, js: &str) -> NativeResult {
        self.on_loop_thread()?;
        let js = c_string(js)?;
        // SAFETY: as above.
        NativeStatus::check(unsafe { webview_eval(self.raw, js.as_ptr()) })
    }
}

impl WebviewNative for LibWebview {
    fn bind(&self, name: &str, index: BindingIndex) -> NativeResult {
        self.on_loop_thread()?;
        let name = c_string(name)?;
        // SAFETY: the library copies `name`; the token is never dereferenced.
        NativeStatus::check(unsafe {
            webview_bind(
                self.raw,
                name.as_ptr(),
                Some(ffi::wvb_dispatch_trampoline),
                index.into_token(),
            )
        })
    }

    fn unbind(&self, name: &str) -> NativeResult {
        self.on_loop_thread()?;
        let name = c_string(name)?;
        // SAFETY: as above.
        NativeStatus::check(unsafe { webview_unbind(self.raw, name.as_ptr()) })
    }

    fn ret(&self, seq: &str, status: ReturnStatus, json: &str) -> NativeResult {
        let seq = c_string(seq)?;
        let json = c_string(json)?;
        // SAFETY: as above; the library posts the result onto its loop.
        NativeStatus::check(unsafe {
            webview_return(self.raw, seq.as_ptr(), status.code(), json.as_ptr())
        })
    }
}

impl Drop for LibWebview {
    fn drop(&mut self) {
        if self.owned {
            // SAFETY: created by `create` and not yet destroyed.
            if let Err(status) = NativeStatus::check(unsafe { webview_destroy(self.raw) }) {
                warn!(error = %status, "webview_destroy failed");
            }
        }
    }
}

impl std::fmt::Debug for LibWebview {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LibWebview")
            .field("raw", &self.raw)
            .field("owned", &self.owned)
            .field("loop_thread", &self.loop_thread)
            .finish()
    }
}

fn install_for(webview: *mut c_void, hooks: GcHooks, config: BridgeConfig) -> c_int {
    if webview.is_null() {
        return error_codes::INVALID_ARGUMENT;
    }
    let gc = match ExternGc::new(hooks) {
        Ok(gc) => gc,
        Err(_) => return error_codes::INVALID_ARGUMENT,
    };

    if let Err(e) = logging::init(&config) {
        debug!(error = %e, "Logging not initialized by install");
    }

    // SAFETY: the host keeps the webview alive while the bridge is in use.
    let native = unsafe { LibWebview::from_raw(webview) };
    let installed = Bridge::new(config, Arc::new(gc), Arc::new(native)).and_then(bridge::install);

    match installed {
        Ok(_) => error_codes::SUCCESS,
        Err(e) => {
            warn!(error = %e, "Bridge install failed");
            e.to_abi_code()
        }
    }
}

/// Install the process-wide bridge over an existing webview with defaults.
///
/// # Safety
/// `webview` must be a live `webview_t` for as long as the process uses the
/// bridge. The hooks must be safe to call from the event-loop thread.
#[no_mangle]
pub unsafe extern "C" fn wvb_install(webview: *mut c_void, hooks: GcHooks) -> c_int {
    install_for(webview, hooks, BridgeConfig::default())
}

/// Like [`wvb_install`] with a JSON configuration document.
///
/// # Safety
/// As for [`wvb_install`]; `config_json` must be null or a NUL-terminated
/// string. Null means defaults.
#[no_mangle]
pub unsafe extern "C" fn wvb_install_with_config(
    webview: *mut c_void,
    hooks: GcHooks,
    config_json: *const c_char,
) -> c_int {
    let config = if config_json.is_null() {
        BridgeConfig::default()
    } else {
        // SAFETY: upheld by the caller.
        let parsed = unsafe { CStr::from_ptr(config_json) }
            .to_str()
            .ok()
            .map(BridgeConfig::from_json_str);
        match parsed {
            Some(Ok(config)) => config,
            Some(Err(e)) => {
                warn!(error = %e, "Rejected bridge configuration");
                return error_codes::INVALID_ARGUMENT;
            }
            None => return error_codes::INVALID_ARGUMENT,
        }
    };

    install_for(webview, hooks, config)
}
