//! The init handshake: the first request of every SDK session.
//!
//! # Design
//! `InitRequest` establishes routing and session context before any other
//! API call. `execute` does not reach the network: it synthesizes the answer
//! the cloud would give for the configured host and runs it through the same
//! completion path a real answer takes (`parse_http_response`). Either way,
//! completion:
//!
//! 1. encodes the payload (failure ends here, nothing persisted),
//! 2. overwrites the `"hosts"` blob in the injected store,
//! 3. retains the payload as `CloudProps` on the request.
//!
//! A missing `host` is a deployment mistake, not a runtime condition, so the
//! request refuses to exist without one.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::config::{self, Config};
use crate::error::{ConfigError, RequestError};
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::props::{CloudProps, PROPS_STORAGE_KEY};
use crate::random::{random_string, RandomPort, SystemRandom, TRACK_ID_LEN};
use crate::request::{Request, Response, NO_STATUS};
use crate::storage::KeyValueStore;

pub const INIT_PATH: &str = "/box/srv/1.1/app/init";

/// Backend flavour reported for every host.
pub const CLOUD_TYPE: &str = "cloud_nodejs";

pub const STATUS_OK: &str = "ok";

/// Wire shape of the init answer. Absent config values serialize as `null`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InitPayload {
    pub apptitle: Option<String>,
    pub domain: Option<String>,
    #[serde(rename = "firstTime")]
    pub first_time: bool,
    pub hosts: HostsPayload,
    pub init: InitInfoPayload,
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HostsPayload {
    pub environment: Option<String>,
    #[serde(rename = "type")]
    pub kind: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InitInfoPayload {
    #[serde(rename = "trackId")]
    pub track_id: String,
}

/// Where an `InitRequest` is in its single run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitState {
    Constructed,
    Executing,
    Succeeded,
    Failed,
}

pub struct InitRequest {
    config: Arc<Config>,
    store: Arc<dyn KeyValueStore>,
    random: Arc<dyn RandomPort>,
    host: String,
    args: Map<String, Value>,
    state: InitState,
    props: Option<CloudProps>,
}

impl InitRequest {
    /// Build an init request, rejecting a config without `host`.
    pub fn try_new(
        config: Arc<Config>,
        store: Arc<dyn KeyValueStore>,
    ) -> Result<Self, ConfigError> {
        let host = config.host().ok_or(ConfigError::MissingHost)?.to_string();
        let args = config.params();
        Ok(Self {
            config,
            store,
            random: Arc::new(SystemRandom),
            host,
            args,
            state: InitState::Constructed,
            props: None,
        })
    }

    /// Build an init request.
    ///
    /// # Panics
    /// Panics when `config` has no `host`: the app bundle is misconfigured
    /// and no request may proceed.
    pub fn new(config: Arc<Config>, store: Arc<dyn KeyValueStore>) -> Self {
        match Self::try_new(config, store) {
            Ok(request) => request,
            Err(err) => panic!("{err}"),
        }
    }

    /// Replace the randomness used for the tracking id.
    pub fn with_random(mut self, random: Arc<dyn RandomPort>) -> Self {
        self.random = random;
        self
    }

    pub fn state(&self) -> InitState {
        self.state
    }

    /// Session context from the last successful completion.
    pub fn props(&self) -> Option<&CloudProps> {
        self.props.as_ref()
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    /// The answer the cloud gives for this configuration.
    pub fn build_payload(&self) -> InitPayload {
        InitPayload {
            apptitle: self.config.get(config::TITLE).map(str::to_string),
            domain: self.config.get(config::DOMAIN).map(str::to_string),
            first_time: true,
            hosts: HostsPayload {
                environment: self.config.get(config::ENV).map(str::to_string),
                kind: CLOUD_TYPE.to_string(),
                url: self.host.clone(),
            },
            init: InitInfoPayload {
                track_id: random_string(self.random.as_ref(), TRACK_ID_LEN),
            },
            status: STATUS_OK.to_string(),
        }
    }

    /// The init call as the host would send it over the wire.
    pub fn build_http_request(&self) -> Result<HttpRequest, RequestError> {
        let body = serde_json::to_string(&self.args)
            .map_err(|e| RequestError::Serialization(e.to_string()))?;
        let path = format!("{}{INIT_PATH}", self.host.trim_end_matches('/'));
        debug!(%path, "built init request");
        Ok(HttpRequest {
            method: HttpMethod::Post,
            path,
            headers: vec![("content-type".to_string(), "application/json".to_string())],
            body: Some(body),
        })
    }

    /// Complete the request from the host's HTTP round-trip.
    pub fn parse_http_response(&mut self, response: HttpResponse) -> Response {
        self.state = InitState::Executing;
        let outcome = check_status(&response, 200)
            .and_then(|()| {
                serde_json::from_str::<Value>(&response.body)
                    .map_err(|e| RequestError::Deserialization(e.to_string()))
            })
            .and_then(|payload| self.complete(&payload));
        self.settle(outcome)
    }

    fn complete<T: Serialize>(&mut self, payload: &T) -> Result<Response, RequestError> {
        let response = Response::success(200, payload)?;
        let parsed = response.parsed().cloned().unwrap_or(Value::Null);
        let props = CloudProps::from_payload(&parsed);
        self.store.set(PROPS_STORAGE_KEY, parsed)?;
        self.props = Some(props);
        Ok(response)
    }

    fn settle(&mut self, outcome: Result<Response, RequestError>) -> Response {
        match outcome {
            Ok(response) => {
                self.state = InitState::Succeeded;
                info!(
                    host = %self.host,
                    track_id = self.props.as_ref().and_then(CloudProps::track_id),
                    "init completed"
                );
                response
            }
            Err(err) => {
                self.state = InitState::Failed;
                warn!(host = %self.host, error = %err, "init failed");
                let status = match &err {
                    RequestError::Http { status, .. } => *status,
                    _ => NO_STATUS,
                };
                Response::failure(status, err)
            }
        }
    }
}

#[async_trait]
impl Request for InitRequest {
    fn method(&self) -> HttpMethod {
        HttpMethod::Post
    }

    fn path(&self) -> &str {
        INIT_PATH
    }

    fn args(&self) -> Option<&Map<String, Value>> {
        Some(&self.args)
    }

    async fn execute(&mut self) -> Response {
        self.state = InitState::Executing;
        let payload = self.build_payload();
        let outcome = self.complete(&payload);
        self.settle(outcome)
    }
}

/// Map a non-matching status code to `RequestError::Http`.
fn check_status(response: &HttpResponse, expected: u16) -> Result<(), RequestError> {
    if response.status == expected {
        return Ok(());
    }
    Err(RequestError::Http {
        status: response.status,
        body: response.body.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StorageError;
    use crate::random::testing::StepRandom;
    use crate::storage::MemoryStore;
    use serde::ser::Error as _;
    use serde_json::json;

    fn config(pairs: &[(&str, &str)]) -> Arc<Config> {
        Arc::new(pairs.iter().copied().collect())
    }

    fn full_config() -> Arc<Config> {
        config(&[
            ("host", "https://x.example.com"),
            ("env", "qa"),
            ("title", "MyApp"),
            ("domain", "mydom"),
        ])
    }

    struct FailingStore;

    impl KeyValueStore for FailingStore {
        fn get(&self, _: &str) -> Result<Option<Value>, StorageError> {
            Ok(None)
        }

        fn set(&self, _: &str, _: Value) -> Result<(), StorageError> {
            Err(std::io::Error::other("disk full").into())
        }

        fn remove(&self, _: &str) -> Result<(), StorageError> {
            Ok(())
        }
    }

    struct Unencodable;

    impl Serialize for Unencodable {
        fn serialize<S: serde::Serializer>(&self, _: S) -> Result<S::Ok, S::Error> {
            Err(S::Error::custom("refused"))
        }
    }

    #[tokio::test]
    async fn execute_builds_payload_from_config() {
        let store = Arc::new(MemoryStore::new());
        let mut req = InitRequest::new(full_config(), store.clone());
        assert_eq!(req.state(), InitState::Constructed);

        let resp = req.execute().await;
        assert_eq!(resp.status_code(), 200);
        assert!(resp.error().is_none());

        let payload = resp.parsed().unwrap();
        assert_eq!(payload["hosts"]["url"], "https://x.example.com");
        assert_eq!(payload["hosts"]["environment"], "qa");
        assert_eq!(payload["hosts"]["type"], "cloud_nodejs");
        assert_eq!(payload["apptitle"], "MyApp");
        assert_eq!(payload["domain"], "mydom");
        assert_eq!(payload["firstTime"], true);
        assert_eq!(payload["status"], "ok");
        assert_eq!(req.state(), InitState::Succeeded);
    }

    #[tokio::test]
    async fn execute_retains_props_and_persists_payload() {
        let store = Arc::new(MemoryStore::new());
        let mut req = InitRequest::new(full_config(), store.clone())
            .with_random(Arc::new(StepRandom::default()));
        let resp = req.execute().await;

        let props = req.props().unwrap();
        assert_eq!(props.track_id(), Some("abcdefghijklmnopqrstuvwx"));
        assert_eq!(props.cloud_host(), Some("https://x.example.com"));
        assert_eq!(store.get(PROPS_STORAGE_KEY).unwrap().as_ref(), resp.parsed());

        let reparsed: Value = serde_json::from_str(resp.raw_string().unwrap()).unwrap();
        assert_eq!(Some(&reparsed), resp.parsed());
        assert!(resp.raw_string().unwrap().contains('\n'));
    }

    #[tokio::test]
    async fn absent_optional_values_are_null_not_omitted() {
        let mut req = InitRequest::new(config(&[("host", "https://h")]), Arc::new(MemoryStore::new()));
        let payload = req.execute().await.into_result().unwrap();
        let obj = payload.as_object().unwrap();
        assert!(obj["apptitle"].is_null());
        assert!(obj["domain"].is_null());
        assert!(obj["hosts"].as_object().unwrap()["environment"].is_null());
        assert!(obj.contains_key("apptitle"));
    }

    #[tokio::test]
    async fn second_init_overwrites_persisted_blob() {
        let store = Arc::new(MemoryStore::new());
        InitRequest::new(full_config(), store.clone()).execute().await;
        let second = InitRequest::new(config(&[("host", "https://other")]), store.clone())
            .execute()
            .await;

        let stored = store.get(PROPS_STORAGE_KEY).unwrap().unwrap();
        assert_eq!(Some(&stored), second.parsed());
        assert!(stored["apptitle"].is_null());
        assert_eq!(stored["hosts"]["url"], "https://other");
    }

    #[test]
    fn tracking_id_has_fixed_shape() {
        let req = InitRequest::new(full_config(), Arc::new(MemoryStore::new()));
        for _ in 0..50 {
            let id = req.build_payload().init.track_id;
            assert_eq!(id.len(), 24);
            assert!(id.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit()));
        }
    }

    #[test]
    #[should_panic(expected = "config must have 'host' defined")]
    fn missing_host_fails_fast() {
        let _ = InitRequest::new(config(&[("env", "qa")]), Arc::new(MemoryStore::new()));
    }

    #[test]
    fn try_new_reports_missing_host() {
        let store = Arc::new(MemoryStore::new());
        let err = InitRequest::try_new(config(&[]), store.clone()).err().unwrap();
        assert_eq!(err, ConfigError::MissingHost);
        assert_eq!(store.get(PROPS_STORAGE_KEY).unwrap(), None);
    }

    #[tokio::test]
    async fn storage_failure_completes_with_error() {
        let mut req = InitRequest::new(full_config(), Arc::new(FailingStore));
        let resp = req.execute().await;
        assert!(matches!(resp.error(), Some(RequestError::Storage(m)) if m.contains("disk full")));
        assert!(resp.parsed().is_none());
        assert!(req.props().is_none());
        assert_eq!(req.state(), InitState::Failed);
    }

    #[test]
    fn serialization_failure_persists_nothing() {
        let store = Arc::new(MemoryStore::new());
        let mut req = InitRequest::new(full_config(), store.clone());
        let outcome = req.complete(&Unencodable);
        let resp = req.settle(outcome);
        assert!(matches!(resp.error(), Some(RequestError::Serialization(_))));
        assert!(resp.raw().is_none());
        assert_eq!(store.get(PROPS_STORAGE_KEY).unwrap(), None);
        assert!(req.props().is_none());
    }

    #[test]
    fn request_contract_describes_init_call() {
        let req = InitRequest::new(
            config(&[("host", "https://h/"), ("appid", "a1")]),
            Arc::new(MemoryStore::new()),
        );
        assert_eq!(req.method(), HttpMethod::Post);
        assert_eq!(req.path(), "/box/srv/1.1/app/init");
        assert_eq!(req.args().unwrap()["appid"], "a1");
        assert!(req.headers().is_none());

        let http = req.build_http_request().unwrap();
        assert_eq!(http.method, HttpMethod::Post);
        assert_eq!(http.path, "https://h/box/srv/1.1/app/init");
        let body: Value = serde_json::from_str(http.body.as_deref().unwrap()).unwrap();
        assert_eq!(body["appid"], "a1");
    }

    #[test]
    fn parse_http_response_accepts_cloud_answer() {
        let store = Arc::new(MemoryStore::new());
        let mut req = InitRequest::new(full_config(), store.clone());
        let body = json!({
            "apptitle": "Some IOS App",
            "domain": "somedom",
            "firstTime": false,
            "hosts": {"environment": "envstr", "type": "cloud_nodejs", "url": "https://cloud"},
            "init": {"trackId": "fromserver"},
            "status": "ok"
        });
        let resp = req.parse_http_response(HttpResponse {
            status: 200,
            headers: Vec::new(),
            body: body.to_string(),
        });
        assert_eq!(resp.parsed(), Some(&body));
        assert_eq!(req.props().unwrap().track_id(), Some("fromserver"));
        assert_eq!(req.props().unwrap().first_time, Some(false));
        assert_eq!(store.get(PROPS_STORAGE_KEY).unwrap(), Some(body));
    }

    #[test]
    fn parse_http_response_rejects_bad_status_and_body() {
        let store = Arc::new(MemoryStore::new());
        let mut req = InitRequest::new(full_config(), store.clone());

        let resp = req.parse_http_response(HttpResponse {
            status: 500,
            headers: Vec::new(),
            body: "boom".to_string(),
        });
        assert_eq!(resp.status_code(), 500);
        assert!(matches!(resp.error(), Some(RequestError::Http { status: 500, .. })));

        let resp = req.parse_http_response(HttpResponse {
            status: 200,
            headers: Vec::new(),
            body: "not json".to_string(),
        });
        assert!(matches!(resp.error(), Some(RequestError::Deserialization(_))));
        assert_eq!(req.state(), InitState::Failed);
        assert_eq!(store.get(PROPS_STORAGE_KEY).unwrap(), None);
    }
}
