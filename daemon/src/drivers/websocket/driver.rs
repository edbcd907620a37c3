use crate::app::AppState;
use crate::config::AppConfig;
use crate::drivers::{Driver, Drivers};
use axum::{
    extract::{
        ws::{WebSocket, WebSocketUpgrade},
        ConnectInfo, State,
    },
    http::Method,
    response::IntoResponse,
    routing::get,
    Router,
};
use log::{debug, error, info, warn};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};

/// How long shutdown waits for a connection to send its close frame.
const CLOSE_GRACE: Duration = Duration::from_secs(5);

pub struct WsDriver {
    app_state: AppState,
}

impl WsDriver {
    pub fn new(app_state: AppState) -> Self {
        Self { app_state }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(ws_handler))
        .with_state(state)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods([Method::GET]),
        )
}

#[async_trait::async_trait]
impl Driver for WsDriver {
    async fn run(&self) {
        let uni_cfg = &AppConfig::get().drivers.websocket_driver_config;
        let addr = SocketAddr::new(uni_cfg.host, uni_cfg.port);

        let listener = match TcpListener::bind(addr).await {
            Ok(listener) => listener,
            Err(e) => {
                error!("WebSocket server failed to bind {}: {}", addr, e);
                return;
            }
        };
        info!("WebSocket server listening on {}", addr);

        let app = router(self.app_state.clone())
            .into_make_service_with_connect_info::<SocketAddr>();
        let stop_token = self.app_state.stop_notify.clone();
        let state = self.app_state.clone();
        if let Err(e) = axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                stop_token.notified().await;
                info!("Shutdown signal received, closing connections...");

                let mut ws_handlers = state.ws_connections.lock().await;
                for mut handler in ws_handlers.drain(..) {
                    match tokio::time::timeout(CLOSE_GRACE, &mut handler).await {
                        Ok(Err(err)) => error!("Error handling websocket connection: {}", err),
                        Ok(Ok(())) => {}
                        Err(_) => {
                            warn!("websocket connection did not close in time, aborting");
                            handler.abort();
                        }
                    }
                }
            })
            .await
        {
            error!("WebSocket server stopped with error: {}", e);
        }
    }

    fn get_driver_type(&self) -> Drivers {
        Drivers::Websocket
    }
}

async fn ws_handler(
    ws: WebSocketUpgrade,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    info!("WebSocket connection received from {:?}", addr);
    ws.on_upgrade(move |socket| handle_ws_connection(socket, state, addr))
}

async fn handle_ws_connection(socket: WebSocket, state: AppState, addr: SocketAddr) {
    let state_clone = state.clone();

    let join_handle = tokio::spawn(async move {
        let state_clone = state.clone();
        match state
            .ws_conn_manager
            .serve_connection(socket, state_clone, addr)
            .await
        {
            Ok(_) => debug!("WebSocket connection closed: {}", addr),
            Err(e) => error!("WebSocket error: {}: {}", addr, e),
        }
    });

    let mut handlers = state_clone.ws_connections.lock().await;
    handlers.retain(|handler| !handler.is_finished());
    handlers.push(join_handle);
}
