//! C-ABI wrapper around `fh-core`.
//!
//! # Overview
//! Lets native host shells (Swift, Kotlin, C) run the init handshake without
//! linking Rust's async runtime or serde. The host assembles a config key by
//! key, creates an init request bound to a persistence file, and either lets
//! the core synthesize the answer (`fh_init_execute`) or performs the HTTP
//! round-trip itself (`fh_init_build_request` / `fh_init_parse_response`).
//!
//! # Design
//! - Every `extern "C"` function wraps its body in `catch_unwind` so panics
//!   never cross the FFI boundary.
//! - A missing `host` surfaces as a null handle from `fh_init_new`.
//! - The caller owns every returned pointer and must release it with the
//!   matching `fh_*_free` function.

pub mod types;

use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use fh_core::{Config, FileStore, HttpResponse, InitRequest, KeyValueStore, MemoryStore, Request};
use tracing::warn;

use types::*;

/// Borrow a C string as `&str`; null or invalid UTF-8 yields `None`.
fn c_str<'a>(ptr: *const c_char) -> Option<&'a str> {
    if ptr.is_null() {
        return None;
    }
    unsafe { CStr::from_ptr(ptr) }.to_str().ok()
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

/// Create an empty config. Free with `fh_config_free`.
#[unsafe(no_mangle)]
pub extern "C" fn fh_config_new() -> *mut FfiConfig {
    catch_unwind(|| Box::into_raw(Box::<FfiConfig>::default())).unwrap_or(std::ptr::null_mut())
}

/// Set `key` to `value`, replacing any previous value.
///
/// Returns false if any argument is null or not valid UTF-8.
#[unsafe(no_mangle)]
pub extern "C" fn fh_config_set(
    config: *mut FfiConfig,
    key: *const c_char,
    value: *const c_char,
) -> bool {
    catch_unwind(AssertUnwindSafe(|| {
        if config.is_null() {
            return false;
        }
        let (Some(key), Some(value)) = (c_str(key), c_str(value)) else {
            return false;
        };
        let config = unsafe { &mut *config };
        config.values.insert(key.to_string(), value.to_string());
        true
    }))
    .unwrap_or(false)
}

/// Free a config created by `fh_config_new`. Safe to call with null.
#[unsafe(no_mangle)]
pub extern "C" fn fh_config_free(config: *mut FfiConfig) {
    if !config.is_null() {
        let _ = catch_unwind(|| {
            drop(unsafe { Box::from_raw(config) });
        });
    }
}

// ---------------------------------------------------------------------------
// Init request lifecycle
// ---------------------------------------------------------------------------

/// Create an init request from a snapshot of `config`.
///
/// `store_path` names the JSON file the session blob is persisted to; null
/// keeps it in memory. Returns null if `config` is null or lacks `host`.
/// Free with `fh_init_free`.
#[unsafe(no_mangle)]
pub extern "C" fn fh_init_new(
    config: *const FfiConfig,
    store_path: *const c_char,
) -> *mut FfiInitRequest {
    catch_unwind(|| {
        if config.is_null() {
            return std::ptr::null_mut();
        }
        let config = unsafe { &*config };
        let store: Arc<dyn KeyValueStore> = match c_str(store_path) {
            Some(path) => Arc::new(FileStore::new(path)),
            None => Arc::new(MemoryStore::new()),
        };
        let snapshot = Config::new(config.values.clone());
        match InitRequest::try_new(Arc::new(snapshot), store) {
            Ok(inner) => Box::into_raw(Box::new(FfiInitRequest { inner })),
            Err(err) => {
                warn!(error = %err, code = ?FfiErrorCode::from(&err), "rejecting init request");
                std::ptr::null_mut()
            }
        }
    })
    .unwrap_or(std::ptr::null_mut())
}

/// Free an init request created by `fh_init_new`. Safe to call with null.
#[unsafe(no_mangle)]
pub extern "C" fn fh_init_free(init: *mut FfiInitRequest) {
    if !init.is_null() {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            drop(unsafe { Box::from_raw(init) });
        }));
    }
}

// ---------------------------------------------------------------------------
// Execution
// ---------------------------------------------------------------------------

/// Run the init handshake to completion, blocking the calling thread.
///
/// Free the result with `fh_free_result`.
#[unsafe(no_mangle)]
pub extern "C" fn fh_init_execute(init: *mut FfiInitRequest) -> *mut FfiInitResult {
    catch_unwind(AssertUnwindSafe(|| {
        if init.is_null() {
            return FfiInitResult::null_arg("init");
        }
        let init = unsafe { &mut *init };
        let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
            Ok(rt) => rt,
            Err(e) => return FfiInitResult::panic(&format!("runtime unavailable: {e}")),
        };
        let response = runtime.block_on(init.inner.execute());
        FfiInitResult::from_response(&response)
    }))
    .unwrap_or_else(|_| FfiInitResult::panic("panic in fh_init_execute"))
}

/// Build the init call for hosts that perform the HTTP round-trip.
///
/// Returns null if `init` is null or the arguments cannot be encoded.
/// Free with `fh_free_request`.
#[unsafe(no_mangle)]
pub extern "C" fn fh_init_build_request(init: *const FfiInitRequest) -> *mut FfiHttpRequest {
    catch_unwind(AssertUnwindSafe(|| {
        if init.is_null() {
            return std::ptr::null_mut();
        }
        let init = unsafe { &*init };
        match init.inner.build_http_request() {
            Ok(req) => FfiHttpRequest::from_core(req),
            Err(_) => std::ptr::null_mut(),
        }
    }))
    .unwrap_or(std::ptr::null_mut())
}

/// Complete the init call from the host's HTTP response.
///
/// Free the result with `fh_free_result`.
#[unsafe(no_mangle)]
pub extern "C" fn fh_init_parse_response(
    init: *mut FfiInitRequest,
    response: *const FfiHttpResponse,
) -> *mut FfiInitResult {
    catch_unwind(AssertUnwindSafe(|| {
        if init.is_null() {
            return FfiInitResult::null_arg("init");
        }
        if response.is_null() {
            return FfiInitResult::null_arg("response");
        }
        let init = unsafe { &mut *init };
        let resp = unsafe { &*response };
        let core_resp = HttpResponse {
            status: resp.status,
            headers: Vec::new(),
            body: c_str(resp.body).unwrap_or("").to_string(),
        };
        let response = init.inner.parse_http_response(core_resp);
        FfiInitResult::from_response(&response)
    }))
    .unwrap_or_else(|_| FfiInitResult::panic("panic in fh_init_parse_response"))
}

/// Tracking id of the completed session, or null before a successful init.
///
/// Free with `fh_free_string`.
#[unsafe(no_mangle)]
pub extern "C" fn fh_init_track_id(init: *const FfiInitRequest) -> *mut c_char {
    catch_unwind(AssertUnwindSafe(|| {
        if init.is_null() {
            return std::ptr::null_mut();
        }
        let init = unsafe { &*init };
        init.inner
            .props()
            .and_then(|p| p.track_id())
            .map(to_c_string)
            .unwrap_or(std::ptr::null_mut())
    }))
    .unwrap_or(std::ptr::null_mut())
}

// ---------------------------------------------------------------------------
// Memory management
// ---------------------------------------------------------------------------

/// Free an `FfiHttpRequest` returned by `fh_init_build_request`.
/// Safe to call with null.
#[unsafe(no_mangle)]
pub extern "C" fn fh_free_request(req: *mut FfiHttpRequest) {
    if req.is_null() {
        return;
    }
    let _ = catch_unwind(|| {
        let req = unsafe { Box::from_raw(req) };
        free_string(req.path);
        free_string(req.body);
        if !req.headers.is_null() && req.headers_len > 0 {
            let headers = unsafe {
                Box::from_raw(std::ptr::slice_from_raw_parts_mut(
                    req.headers,
                    req.headers_len as usize,
                ))
            };
            for h in headers.iter() {
                free_string(h.key);
                free_string(h.value);
            }
        }
    });
}

/// Free an `FfiInitResult`. Safe to call with null.
#[unsafe(no_mangle)]
pub extern "C" fn fh_free_result(result: *mut FfiInitResult) {
    if result.is_null() {
        return;
    }
    let _ = catch_unwind(|| {
        let result = unsafe { Box::from_raw(result) };
        free_string(result.error_message);
        free_string(result.raw_response);
    });
}

/// Free a C string allocated by this library. Safe to call with null.
#[unsafe(no_mangle)]
pub extern "C" fn fh_free_string(s: *mut c_char) {
    let _ = catch_unwind(|| free_string(s));
}

fn free_string(s: *mut c_char) {
    if !s.is_null() {
        drop(unsafe { CString::from_raw(s) });
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
