//! Read-only view over the SDK settings supplied by the host application.
//!
//! # Design
//! The host loads its property bundle (`fhconfig.plist` on iOS) and hands the
//! flat key/value contents over; parsing the bundle is the host's job. A
//! `Config` is immutable once built and is shared by every request of the
//! session through an `Arc`, so it needs no locking.

use std::collections::HashMap;

use serde::Deserialize;
use serde_json::{Map, Value};

pub const HOST: &str = "host";
pub const ENV: &str = "env";
pub const TITLE: &str = "title";
pub const DOMAIN: &str = "domain";
pub const APP_ID: &str = "appid";
pub const APP_KEY: &str = "appkey";
pub const PROJECT_ID: &str = "projectid";
pub const CONNECTION_TAG: &str = "connectiontag";
pub const CUID: &str = "cuid";
pub const DESTINATION: &str = "destination";

/// Version string reported to the cloud in every init call.
pub const SDK_VERSION: &str = concat!("FH_RUST_SDK/", env!("CARGO_PKG_VERSION"));

/// SDK settings keyed by name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct Config {
    values: HashMap<String, String>,
}

impl Config {
    pub fn new(values: HashMap<String, String>) -> Self {
        Self { values }
    }

    /// Value for `key`, or `None` when the bundle does not define it.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn host(&self) -> Option<&str> {
        self.get(HOST)
    }

    /// Default arguments sent with the init call.
    ///
    /// Identifiers missing from the bundle are sent as `null` so the server
    /// sees the full argument shape.
    pub fn params(&self) -> Map<String, Value> {
        let mut params = Map::new();
        for key in [APP_ID, APP_KEY, PROJECT_ID, CONNECTION_TAG, CUID, DESTINATION] {
            params.insert(key.to_string(), self.string_or_null(key));
        }
        params.insert("cuidMap".to_string(), Value::Null);
        params.insert("sdk_version".to_string(), Value::String(SDK_VERSION.to_string()));
        params
    }

    fn string_or_null(&self, key: &str) -> Value {
        self.get(key)
            .map(|v| Value::String(v.to_string()))
            .unwrap_or(Value::Null)
    }
}

impl<K, V> FromIterator<(K, V)> for Config
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_returns_none_for_unknown_key() {
        let config: Config = [(HOST, "https://x.example.com")].into_iter().collect();
        assert_eq!(config.host(), Some("https://x.example.com"));
        assert_eq!(config.get("nope"), None);
    }

    #[test]
    fn deserializes_from_flat_json_object() {
        let config: Config =
            serde_json::from_str(r#"{"host":"https://h","env":"dev"}"#).unwrap();
        assert_eq!(config.get(ENV), Some("dev"));
        assert_eq!(config.get(TITLE), None);
    }

    #[test]
    fn params_carry_identifiers_and_nulls() {
        let config: Config = [(HOST, "https://h"), (APP_ID, "app-1"), (APP_KEY, "key-1")]
            .into_iter()
            .collect();
        let params = config.params();
        assert_eq!(params["appid"], "app-1");
        assert_eq!(params["appkey"], "key-1");
        assert!(params["projectid"].is_null());
        assert!(params["cuidMap"].is_null());
        assert!(params["sdk_version"].as_str().unwrap().starts_with("FH_RUST_SDK/"));
        assert!(!params.contains_key("host"));
    }
}
