//! Verify the init request against JSON test vectors stored in `test-vectors/`.
//!
//! Each case gives a config, the expected wire request, the expected stub
//! payload (minus the random `init.trackId`), a simulated server answer and
//! the props that answer should leave behind. Bodies are compared as parsed
//! JSON so key order does not matter; `sdk_version` is checked by prefix.

use std::sync::Arc;

use fh_core::{
    CloudProps, Config, HttpMethod, HttpResponse, InitRequest, KeyValueStore, MemoryStore, Request,
    RequestError, PROPS_STORAGE_KEY,
};
use serde_json::Value;

fn parse_method(s: &str) -> HttpMethod {
    match s {
        "GET" => HttpMethod::Get,
        "POST" => HttpMethod::Post,
        "PUT" => HttpMethod::Put,
        "DELETE" => HttpMethod::Delete,
        "PATCH" => HttpMethod::Patch,
        other => panic!("unknown method: {other}"),
    }
}

fn vectors() -> Value {
    serde_json::from_str(include_str!("../../test-vectors/init.json")).unwrap()
}

fn request_for(case: &Value) -> (InitRequest, Arc<MemoryStore>) {
    let config: Config = serde_json::from_value(case["config"].clone()).unwrap();
    let store = Arc::new(MemoryStore::new());
    (InitRequest::new(Arc::new(config), store.clone()), store)
}

#[test]
fn build_request_vectors() {
    for case in vectors()["cases"].as_array().unwrap() {
        let name = case["name"].as_str().unwrap();
        let expected = &case["expected_request"];
        let (req, _) = request_for(case);

        let http = req.build_http_request().unwrap();
        assert_eq!(http.method, parse_method(expected["method"].as_str().unwrap()), "{name}: method");
        assert_eq!(http.path, expected["path"].as_str().unwrap(), "{name}: path");

        let expected_headers: Vec<(String, String)> = expected["headers"]
            .as_array()
            .unwrap()
            .iter()
            .map(|h| {
                let arr = h.as_array().unwrap();
                (arr[0].as_str().unwrap().to_string(), arr[1].as_str().unwrap().to_string())
            })
            .collect();
        assert_eq!(http.headers, expected_headers, "{name}: headers");

        let mut body: Value = serde_json::from_str(http.body.as_deref().unwrap()).unwrap();
        let sdk_version = body.as_object_mut().unwrap().remove("sdk_version").unwrap();
        assert!(sdk_version.as_str().unwrap().starts_with("FH_RUST_SDK/"), "{name}: sdk_version");
        assert_eq!(body, expected["body"], "{name}: body");
    }
}

#[tokio::test]
async fn execute_payload_vectors() {
    for case in vectors()["cases"].as_array().unwrap() {
        let name = case["name"].as_str().unwrap();
        let (mut req, store) = request_for(case);

        let resp = req.execute().await;
        assert_eq!(resp.status_code(), 200, "{name}: status");
        assert!(resp.error().is_none(), "{name}: error");

        let mut payload = resp.parsed().unwrap().clone();
        let init = payload.as_object_mut().unwrap().remove("init").unwrap();
        assert_eq!(init["trackId"].as_str().unwrap().len(), 24, "{name}: trackId");
        assert_eq!(payload, case["expected_payload"], "{name}: payload");
        assert_eq!(store.get(PROPS_STORAGE_KEY).unwrap().as_ref(), resp.parsed(), "{name}: persisted");
    }
}

#[test]
fn parse_response_vectors() {
    for case in vectors()["cases"].as_array().unwrap() {
        let name = case["name"].as_str().unwrap();
        let (mut req, store) = request_for(case);

        let sim = &case["simulated_response"];
        let resp = req.parse_http_response(HttpResponse {
            status: sim["status"].as_u64().unwrap() as u16,
            headers: Vec::new(),
            body: sim["body"].as_str().unwrap().to_string(),
        });

        if let Some(expected_error) = case.get("expected_error") {
            match expected_error.as_str().unwrap() {
                "Http" => assert!(
                    matches!(resp.error(), Some(RequestError::Http { .. })),
                    "{name}: expected Http"
                ),
                other => panic!("{name}: unknown expected_error: {other}"),
            }
            assert!(req.props().is_none(), "{name}: props");
            assert_eq!(store.get(PROPS_STORAGE_KEY).unwrap(), None, "{name}: persisted");
            continue;
        }

        assert!(resp.error().is_none(), "{name}: error");
        let props = req.props().unwrap();
        let expected = &case["expected_props"];
        assert_eq!(props.cloud_host(), expected["cloud_host"].as_str(), "{name}: cloud_host");
        assert_eq!(props.environment(), expected["environment"].as_str(), "{name}: environment");
        assert_eq!(props.track_id(), expected["track_id"].as_str(), "{name}: track_id");

        let restored = CloudProps::restore(store.as_ref()).unwrap().unwrap();
        assert_eq!(&restored, props, "{name}: restored props");
    }
}
