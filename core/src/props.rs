//! Typed session context derived from a successful init response.
//!
//! # Design
//! The projection is lenient: a missing key, or a key holding the wrong JSON
//! type, becomes `None` instead of failing. Init responses come from cloud
//! deployments of varying age and the SDK must keep working with whatever
//! subset of fields it gets.

use serde_json::Value;

use crate::error::StorageError;
use crate::storage::KeyValueStore;

/// Key under which the init payload is persisted.
pub const PROPS_STORAGE_KEY: &str = "hosts";

/// Routing descriptor: where cloud calls for this app go.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Hosts {
    pub environment: Option<String>,
    /// Backend flavour, `"cloud_nodejs"` for every current deployment.
    pub kind: Option<String>,
    pub url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InitInfo {
    /// Opaque per-session identifier.
    pub track_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CloudProps {
    pub app_title: Option<String>,
    pub domain: Option<String>,
    pub first_time: Option<bool>,
    pub hosts: Option<Hosts>,
    pub init: Option<InitInfo>,
    pub status: Option<String>,
}

impl CloudProps {
    /// Project an init payload. Anything that is not a JSON object yields an
    /// all-`None` value.
    pub fn from_payload(payload: &Value) -> Self {
        let hosts = payload.get("hosts").filter(|v| v.is_object()).map(|h| Hosts {
            environment: string_field(h, "environment"),
            kind: string_field(h, "type"),
            url: string_field(h, "url"),
        });
        let init = payload.get("init").filter(|v| v.is_object()).map(|i| InitInfo {
            track_id: string_field(i, "trackId"),
        });
        Self {
            app_title: string_field(payload, "apptitle"),
            domain: string_field(payload, "domain"),
            first_time: payload.get("firstTime").and_then(Value::as_bool),
            hosts,
            init,
            status: string_field(payload, "status"),
        }
    }

    /// Reload the props persisted by the last successful init, if any.
    pub fn restore(store: &dyn KeyValueStore) -> Result<Option<Self>, StorageError> {
        Ok(store.get(PROPS_STORAGE_KEY)?.map(|v| Self::from_payload(&v)))
    }

    /// Base URL for cloud calls.
    pub fn cloud_host(&self) -> Option<&str> {
        self.hosts.as_ref()?.url.as_deref()
    }

    pub fn environment(&self) -> Option<&str> {
        self.hosts.as_ref()?.environment.as_deref()
    }

    pub fn track_id(&self) -> Option<&str> {
        self.init.as_ref()?.track_id.as_deref()
    }

    pub fn is_ok(&self) -> bool {
        self.status.as_deref() == Some("ok")
    }
}

fn string_field(value: &Value, key: &str) -> Option<String> {
    value.get(key).and_then(Value::as_str).map(str::to_string)
}
