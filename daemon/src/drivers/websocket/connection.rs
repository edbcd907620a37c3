use axum::extract::ws::{close_code, CloseFrame, Message, WebSocket};
use chrono::{DateTime, Utc};
use futures::{SinkExt, StreamExt};
use log::{debug, info};
use std::net::SocketAddr;
use std::sync::atomic::{self, AtomicUsize};
use std::sync::Arc;
use tokio::select;

use crate::app::AppState;

pub struct WebsocketConnection {
    pub addr: SocketAddr,
    pub connected_at: DateTime<Utc>,
}

impl WebsocketConnection {
    pub fn new(addr: SocketAddr) -> Self {
        Self {
            addr,
            connected_at: Utc::now(),
        }
    }
}

/// Live push subscribers, keyed by a per-process connection id.
pub struct WsConnManager {
    id: AtomicUsize,
    connections: scc::HashMap<usize, Arc<WebsocketConnection>, ahash::RandomState>,
}

impl Default for WsConnManager {
    fn default() -> Self {
        Self::new()
    }
}

impl WsConnManager {
    pub fn new() -> Self {
        Self {
            id: AtomicUsize::new(0),
            connections: scc::HashMap::default(),
        }
    }

    fn add(&self, conn: Arc<WebsocketConnection>) -> usize {
        let id = self.id.fetch_add(1, atomic::Ordering::Relaxed);
        let _ = self.connections.insert(id, conn);
        id
    }

    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> usize {
        self.connections.len()
    }

    /// Forwards every changed snapshot to `ws` as a JSON text frame until the
    /// peer leaves or the daemon stops.
    ///
    /// Each connection owns its own subscription, so a slow or closed peer
    /// never holds up the others.
    pub async fn serve_connection(
        &self,
        ws: WebSocket,
        app_state: AppState,
        peer_addr: SocketAddr,
    ) -> anyhow::Result<()> {
        let (mut outgoing, mut incoming) = ws.split();
        let mut subscription = app_state.notifier.subscribe();
        // 只创建一次: 发送期间触发的 notify_waiters 也不会丢失
        let cancelled = app_state.stop_notify.notified();
        let mut cancelled = std::pin::pin!(cancelled);

        let id = self.add(Arc::new(WebsocketConnection::new(peer_addr)));
        let rv = async {
            loop {
                select! {
                    // read: clients only ever close
                    msg = incoming.next() => match msg {
                        Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                        Some(Ok(_)) => {}
                    },

                    // write
                    snapshot = subscription.next() => {
                        let Some(snapshot) = snapshot else {
                            break;
                        };
                        let text = serde_json::to_string(&*snapshot)?;
                        debug!("pushing {} record(s) to {}", snapshot.len(), peer_addr);
                        outgoing.send(Message::Text(text.into())).await?;
                    }

                    // cancel
                    _ = &mut cancelled => {
                        outgoing.send(Message::Close(Some(CloseFrame {
                            code: close_code::NORMAL,
                            reason: "daemon closed".into(),
                        }))).await?;
                        info!("websocket connection from {} closed", peer_addr);
                        break;
                    }
                }
            }
            anyhow::Ok(())
        }
        .await;

        if let Some((_, conn)) = self.connections.remove(&id) {
            debug!(
                "{} unsubscribed after {}s",
                conn.addr,
                (Utc::now() - conn.connected_at).num_seconds()
            );
        }
        rv
    }
}
