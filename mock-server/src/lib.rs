use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tokio::net::TcpListener;
use tracing::info;

pub const INIT_ROUTE: &str = "/box/srv/1.1/app/init";

// The mock stands in for the cloud, so it generates ids on its own rather
// than through `fh-core`; integration tests catch shape drift between them.
const TRACK_ID_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

/// What the fake cloud reports about the app it hosts.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct CloudSettings {
    pub environment: Option<String>,
    pub title: Option<String>,
    pub domain: Option<String>,
    /// Routing URL handed back in `hosts.url`.
    pub url: String,
}

impl CloudSettings {
    /// Settings from `FH_ENV`, `FH_TITLE`, `FH_DOMAIN` and `FH_URL`.
    pub fn from_env() -> Self {
        Self {
            environment: std::env::var("FH_ENV").ok(),
            title: std::env::var("FH_TITLE").ok(),
            domain: std::env::var("FH_DOMAIN").ok(),
            url: std::env::var("FH_URL").unwrap_or_default(),
        }
    }
}

pub type Settings = Arc<CloudSettings>;

pub fn app(settings: CloudSettings) -> Router {
    Router::new()
        .route("/health", get(health))
        .route(INIT_ROUTE, post(init))
        .with_state(Arc::new(settings))
}

pub async fn run(listener: TcpListener, settings: CloudSettings) -> Result<(), std::io::Error> {
    axum::serve(listener, app(settings)).await
}

async fn health() -> Json<Value> {
    Json(json!({"status": "ok"}))
}

async fn init(
    State(settings): State<Settings>,
    Json(args): Json<Map<String, Value>>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let app_id = args.get("appid").and_then(Value::as_str).unwrap_or_default();
    if app_id.is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(json!({"status": "error", "msg": "missing appid"})),
        ));
    }

    let track_id = track_id();
    info!(%app_id, %track_id, "init");
    Ok(Json(json!({
        "apptitle": settings.title,
        "domain": settings.domain,
        "firstTime": true,
        "hosts": {
            "environment": settings.environment,
            "type": "cloud_nodejs",
            "url": settings.url,
        },
        "init": {"trackId": track_id},
        "status": "ok",
    })))
}

fn track_id() -> String {
    let mut rng = rand::thread_rng();
    (0..24)
        .map(|_| TRACK_ID_ALPHABET[rng.gen_range(0..TRACK_ID_ALPHABET.len())] as char)
        .collect()
}
