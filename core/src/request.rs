//! The Request/Response execution contract shared by every backend call.
//!
//! # Design
//! A `Request` is one unit of backend work: method, path, optional arguments
//! and headers, plus an async `execute` that always yields a `Response`.
//! Failures travel inside the response (`Response::error`) rather than as a
//! separate `Err`, so every outcome has the same shape at the completion
//! boundary.
//!
//! `dispatch` runs a request on the tokio runtime and hands back a
//! `Completion`. The result crosses a oneshot channel, so it is delivered
//! at most once by construction; the `Completion` turns a lost sender into
//! `RequestError::Aborted`, which makes "exactly once" hold on every path.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{Map, Value};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::RequestError;
use crate::http::HttpMethod;

/// Status code carried by responses that never reached a server.
pub const NO_STATUS: u16 = 0;

#[async_trait]
pub trait Request: Send {
    fn method(&self) -> HttpMethod;

    fn path(&self) -> &str;

    fn args(&self) -> Option<&Map<String, Value>> {
        None
    }

    fn headers(&self) -> Option<&HashMap<String, String>> {
        None
    }

    /// Run the request to a terminal outcome.
    async fn execute(&mut self) -> Response;
}

/// Outcome of one request. Immutable once built.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Response {
    status_code: u16,
    parsed: Option<Value>,
    raw: Option<Vec<u8>>,
    raw_string: Option<String>,
    error: Option<RequestError>,
}

impl Response {
    /// Successful response carrying `payload` in parsed and pretty-printed form.
    ///
    /// Fails with `RequestError::Serialization` when the payload cannot be
    /// encoded; no response is produced in that case.
    pub fn success<T: Serialize>(status_code: u16, payload: &T) -> Result<Self, RequestError> {
        let parsed =
            serde_json::to_value(payload).map_err(|e| RequestError::Serialization(e.to_string()))?;
        let raw_string = serde_json::to_string_pretty(&parsed)
            .map_err(|e| RequestError::Serialization(e.to_string()))?;
        Ok(Self {
            status_code,
            parsed: Some(parsed),
            raw: Some(raw_string.clone().into_bytes()),
            raw_string: Some(raw_string),
            error: None,
        })
    }

    /// Failed response. Payload fields stay empty.
    pub fn failure(status_code: u16, error: RequestError) -> Self {
        Self {
            status_code,
            error: Some(error),
            ..Self::default()
        }
    }

    pub fn status_code(&self) -> u16 {
        self.status_code
    }

    pub fn parsed(&self) -> Option<&Value> {
        self.parsed.as_ref()
    }

    pub fn raw(&self) -> Option<&[u8]> {
        self.raw.as_deref()
    }

    pub fn raw_string(&self) -> Option<&str> {
        self.raw_string.as_deref()
    }

    pub fn error(&self) -> Option<&RequestError> {
        self.error.as_ref()
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    pub fn into_result(self) -> Result<Value, RequestError> {
        match (self.error, self.parsed) {
            (Some(err), _) => Err(err),
            (None, Some(payload)) => Ok(payload),
            (None, None) => Ok(Value::Null),
        }
    }
}

/// Knobs for a dispatched execution.
#[derive(Debug, Clone, Default)]
pub struct ExecuteOptions {
    pub timeout: Option<Duration>,
    pub cancel: CancellationToken,
}

impl ExecuteOptions {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }
}

/// What a `Completion` resolves to.
///
/// `request` is handed back so callers can inspect state it retained (the
/// props of an init call, for instance). It is `None` only when the
/// executing task died.
#[derive(Debug)]
pub struct Completed<R> {
    pub request: Option<R>,
    pub response: Response,
}

impl<R> Completed<R> {
    pub fn error(&self) -> Option<&RequestError> {
        self.response.error()
    }
}

/// Pending result of a dispatched request.
#[derive(Debug)]
pub struct Completion<R> {
    rx: oneshot::Receiver<Completed<R>>,
}

impl<R: Send + 'static> Completion<R> {
    /// Deliver the outcome to `on_complete` exactly once, from a runtime task.
    pub fn on_complete<F>(self, on_complete: F) -> JoinHandle<()>
    where
        F: FnOnce(Response, Option<RequestError>) + Send + 'static,
    {
        tokio::spawn(async move {
            let done = self.await;
            let error = done.response.error().cloned();
            on_complete(done.response, error);
        })
    }
}

impl<R> Future for Completion<R> {
    type Output = Completed<R>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx).poll(cx).map(|res| {
            res.unwrap_or_else(|_| Completed {
                request: None,
                response: Response::failure(NO_STATUS, RequestError::Aborted),
            })
        })
    }
}

/// Execute `request` on the current tokio runtime.
///
/// Returns immediately; the outcome arrives through the `Completion`.
///
/// # Panics
/// Panics when called outside a tokio runtime.
pub fn dispatch<R>(request: R, options: ExecuteOptions) -> Completion<R>
where
    R: Request + 'static,
{
    let (tx, rx) = oneshot::channel();
    debug!(method = %request.method(), path = request.path(), "dispatching request");

    tokio::spawn(async move {
        let mut request = request;
        let response = {
            let run = bounded(options.timeout, request.execute());
            tokio::select! {
                biased;
                _ = options.cancel.cancelled() => {
                    warn!("request cancelled");
                    Response::failure(NO_STATUS, RequestError::Cancelled)
                }
                response = run => response,
            }
        };
        // The receiver may already be gone; nobody is left to tell.
        let _ = tx.send(Completed {
            request: Some(request),
            response,
        });
    });

    Completion { rx }
}

async fn bounded<F>(timeout: Option<Duration>, run: F) -> Response
where
    F: Future<Output = Response>,
{
    match timeout {
        Some(limit) => match tokio::time::timeout(limit, run).await {
            Ok(response) => response,
            Err(_) => {
                warn!(?limit, "request timed out");
                Response::failure(NO_STATUS, RequestError::Timeout(limit))
            }
        },
        None => run.await,
    }
}
