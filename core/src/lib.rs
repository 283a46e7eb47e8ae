//! Network-layer core of the cloud SDK.
//!
//! # Overview
//! Every backend call is a `Request`: a unit of work with config-derived
//! parameters, executed asynchronously, that yields a `Response` carrying
//! either a payload or an error. `InitRequest` is the session handshake; its
//! result is kept as `CloudProps` and persisted for later calls and later
//! process runs.
//!
//! # Design
//! - `Config` is immutable and shared; a missing `host` stops request
//!   construction.
//! - Persistence (`KeyValueStore`) and randomness (`RandomPort`) are injected,
//!   so the core runs in tests without a platform.
//! - `dispatch` delivers each outcome exactly once through a `Completion`,
//!   with optional timeout and cancellation.
//! - Wire I/O stays with the host: `build_http_request` / `parse_http_response`
//!   describe the real round-trip as plain data.

pub mod config;
pub mod error;
pub mod http;
pub mod init;
pub mod props;
pub mod random;
pub mod request;
pub mod storage;

pub use config::Config;
pub use error::{ConfigError, RequestError, StorageError};
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use init::{InitPayload, InitRequest, InitState};
pub use props::{CloudProps, Hosts, InitInfo, PROPS_STORAGE_KEY};
pub use random::{RandomPort, SystemRandom};
pub use request::{dispatch, Completed, Completion, ExecuteOptions, Request, Response};
pub use storage::{FileStore, KeyValueStore, MemoryStore};
