use crate::app::{get_start_time, AppState, VERSION};
use crate::config::AppConfig;
use crate::drivers::{Driver, Drivers};
use axum::{
    extract::{Query, State},
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use chrono::Utc;
use log::{debug, error, info};
use serde::Deserialize;
use serde_json::{json, Value};
use std::net::SocketAddr;
use thiserror::Error;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};

use super::sort::{sort_by_field, MissingKey};

pub struct RestDriver {
    app_state: AppState,
}

impl RestDriver {
    pub fn new(app_state: AppState) -> Self {
        Self { app_state }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/info", get(info_handler))
        .with_state(state)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods([Method::GET]),
        )
}

#[async_trait::async_trait]
impl Driver for RestDriver {
    async fn run(&self) {
        let uni_cfg = &AppConfig::get().drivers.rest_driver_config;
        let addr = SocketAddr::new(uni_cfg.host, uni_cfg.port);

        let listener = match TcpListener::bind(addr).await {
            Ok(listener) => listener,
            Err(e) => {
                error!("REST server failed to bind {}: {}", addr, e);
                return;
            }
        };
        info!("REST server listening on {}", addr);

        let stop_token = self.app_state.stop_notify.clone();
        if let Err(e) = axum::serve(listener, router(self.app_state.clone()))
            .with_graceful_shutdown(async move { stop_token.notified().await })
            .await
        {
            error!("REST server stopped with error: {}", e);
        }
    }

    fn get_driver_type(&self) -> Drivers {
        Drivers::Rest
    }
}

#[derive(Debug, Error)]
enum HandlerError {
    #[error(transparent)]
    MissingKey(#[from] MissingKey),
    #[error("failed to serialize status: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl IntoResponse for HandlerError {
    fn into_response(self) -> Response {
        let status = match self {
            HandlerError::MissingKey(_) => StatusCode::UNPROCESSABLE_ENTITY,
            HandlerError::Serialize(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

#[derive(Debug, Deserialize)]
struct IndexQuery {
    #[serde(rename = "sortedOnKey")]
    sorted_on_key: Option<String>,
}

// 每次请求都重新探测
async fn index_handler(
    State(state): State<AppState>,
    Query(query): Query<IndexQuery>,
) -> Result<Json<Vec<Value>>, HandlerError> {
    let snapshot = state.source.assemble_all().await;
    let mut records = snapshot
        .iter()
        .map(serde_json::to_value)
        .collect::<Result<Vec<_>, _>>()?;

    if let Some(key) = query.sorted_on_key.as_deref().filter(|key| !key.is_empty()) {
        debug!("sorting {} record(s) by {}", records.len(), key);
        sort_by_field(&mut records, key)?;
    }
    Ok(Json(records))
}

async fn info_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "name": "forgeserv status daemon",
        "version": VERSION,
        "uptime_secs": (Utc::now() - *get_start_time()).num_seconds(),
        "subscribers": state.ws_conn_manager.len(),
    }))
}
