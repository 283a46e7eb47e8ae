//! `#[repr(C)]` types for the FFI boundary.
//!
//! # Design
//! Each type mirrors a core type with C-compatible representations:
//! `*mut c_char` for strings, raw pointer plus length for lists, explicit
//! discriminants for enums. Conversions live here so `lib.rs` stays focused
//! on the `extern "C"` surface.

use std::collections::HashMap;
use std::ffi::CString;
use std::os::raw::c_char;

use fh_core::{ConfigError, HttpMethod, InitRequest, RequestError, Response};

/// Config being assembled by the host, one key at a time.
#[derive(Default)]
pub struct FfiConfig {
    pub(crate) values: HashMap<String, String>,
}

/// Opaque handle to an `InitRequest`.
pub struct FfiInitRequest {
    pub(crate) inner: InitRequest,
}

/// Heap C string from `s`. Interior NULs are dropped.
pub(crate) fn to_c_string(s: &str) -> *mut c_char {
    CString::new(s.replace('\0', ""))
        .unwrap_or_default()
        .into_raw()
}

// ---------------------------------------------------------------------------
// Request types
// ---------------------------------------------------------------------------

/// HTTP method as a C enum.
#[repr(C)]
pub enum FfiHttpMethod {
    Get = 0,
    Post = 1,
    Put = 2,
    Delete = 3,
    Patch = 4,
}

impl From<HttpMethod> for FfiHttpMethod {
    fn from(m: HttpMethod) -> Self {
        match m {
            HttpMethod::Get => FfiHttpMethod::Get,
            HttpMethod::Post => FfiHttpMethod::Post,
            HttpMethod::Put => FfiHttpMethod::Put,
            HttpMethod::Delete => FfiHttpMethod::Delete,
            HttpMethod::Patch => FfiHttpMethod::Patch,
        }
    }
}

/// A single HTTP header as a key-value pair of C strings.
#[repr(C)]
pub struct FfiHeader {
    pub key: *mut c_char,
    pub value: *mut c_char,
}

/// The init call as C-compatible plain data, for hosts that do the I/O.
#[repr(C)]
pub struct FfiHttpRequest {
    pub method: FfiHttpMethod,
    pub path: *mut c_char,
    pub headers: *mut FfiHeader,
    pub headers_len: u32,
    pub body: *mut c_char,
}

impl FfiHttpRequest {
    pub(crate) fn from_core(req: fh_core::HttpRequest) -> *mut Self {
        let path = to_c_string(&req.path);
        let body = match req.body {
            Some(b) => to_c_string(&b),
            None => std::ptr::null_mut(),
        };

        let headers_len = req.headers.len() as u32;
        let headers = if req.headers.is_empty() {
            std::ptr::null_mut()
        } else {
            let ffi_headers: Box<[FfiHeader]> = req
                .headers
                .iter()
                .map(|(k, v)| FfiHeader {
                    key: to_c_string(k),
                    value: to_c_string(v),
                })
                .collect();
            Box::into_raw(ffi_headers) as *mut FfiHeader
        };

        Box::into_raw(Box::new(FfiHttpRequest {
            method: req.method.into(),
            path,
            headers,
            headers_len,
            body,
        }))
    }
}

/// HTTP response supplied by the host. The FFI layer reads but never frees
/// these fields.
#[repr(C)]
pub struct FfiHttpResponse {
    pub status: u16,
    pub body: *const c_char,
}

// ---------------------------------------------------------------------------
// Result types
// ---------------------------------------------------------------------------

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FfiErrorCode {
    Ok = 0,
    Serialization = 1,
    Deserialization = 2,
    Http = 3,
    Storage = 4,
    Timeout = 5,
    Cancelled = 6,
    Aborted = 7,
    MissingHost = 8,
    NullArg = 9,
    Panic = 10,
}

impl From<&RequestError> for FfiErrorCode {
    fn from(err: &RequestError) -> Self {
        match err {
            RequestError::Serialization(_) => FfiErrorCode::Serialization,
            RequestError::Deserialization(_) => FfiErrorCode::Deserialization,
            RequestError::Http { .. } => FfiErrorCode::Http,
            RequestError::Storage(_) => FfiErrorCode::Storage,
            RequestError::Timeout(_) => FfiErrorCode::Timeout,
            RequestError::Cancelled => FfiErrorCode::Cancelled,
            RequestError::Aborted => FfiErrorCode::Aborted,
        }
    }
}

impl From<&ConfigError> for FfiErrorCode {
    fn from(err: &ConfigError) -> Self {
        match err {
            ConfigError::MissingHost => FfiErrorCode::MissingHost,
        }
    }
}

/// Outcome of an init call.
///
/// On success `error_code` is `Ok`, `error_message` is null and
/// `raw_response` holds the pretty-printed payload. On failure
/// `raw_response` is null and `error_message` describes the error.
#[repr(C)]
pub struct FfiInitResult {
    pub error_code: FfiErrorCode,
    pub error_message: *mut c_char,
    pub status_code: u16,
    pub raw_response: *mut c_char,
}

impl FfiInitResult {
    pub(crate) fn from_response(response: &Response) -> *mut Self {
        let result = match response.error() {
            Some(err) => FfiInitResult {
                error_code: err.into(),
                error_message: to_c_string(&err.to_string()),
                status_code: response.status_code(),
                raw_response: std::ptr::null_mut(),
            },
            None => FfiInitResult {
                error_code: FfiErrorCode::Ok,
                error_message: std::ptr::null_mut(),
                status_code: response.status_code(),
                raw_response: response
                    .raw_string()
                    .map(to_c_string)
                    .unwrap_or(std::ptr::null_mut()),
            },
        };
        Box::into_raw(Box::new(result))
    }

    pub(crate) fn failure(error_code: FfiErrorCode, msg: &str) -> *mut Self {
        Box::into_raw(Box::new(FfiInitResult {
            error_code,
            error_message: to_c_string(msg),
            status_code: 0,
            raw_response: std::ptr::null_mut(),
        }))
    }

    pub(crate) fn null_arg(name: &str) -> *mut Self {
        Self::failure(FfiErrorCode::NullArg, &format!("null argument: {name}"))
    }

    pub(crate) fn panic(msg: &str) -> *mut Self {
        Self::failure(FfiErrorCode::Panic, msg)
    }
}
