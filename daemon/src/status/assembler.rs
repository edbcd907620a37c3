use base64::{engine::general_purpose::STANDARD as B64, Engine as _};
use forgeserv_protocol::minecraft::PingResult;
use forgeserv_protocol::status::{LogDerivedInfo, PlayerEntry, ServerStatusRecord, Snapshot};
use futures::future::join_all;
use futures::{stream, StreamExt};
use log::{debug, error};
use std::sync::Arc;

use crate::inventory::{InstanceDescriptor, InventoryProvider};
use crate::minecraft::status_log;
use crate::minecraft::Pinger;

use super::MapResolver;

/// Produces a complete snapshot on demand.
#[async_trait::async_trait]
pub trait StatusSource: Send + Sync {
    async fn assemble_all(&self) -> Snapshot;
}

pub struct ServerStatusAssembler {
    inventory: Arc<dyn InventoryProvider>,
    pinger: Arc<dyn Pinger>,
    map_resolver: Arc<dyn MapResolver>,
    /// Host the mapped ports are reachable on.
    probe_host: String,
}

impl ServerStatusAssembler {
    pub fn new(
        inventory: Arc<dyn InventoryProvider>,
        pinger: Arc<dyn Pinger>,
        map_resolver: Arc<dyn MapResolver>,
        probe_host: impl Into<String>,
    ) -> Self {
        Self {
            inventory,
            pinger,
            map_resolver,
            probe_host: probe_host.into(),
        }
    }

    /// First TCP host port, in inventory order, that answers a status probe.
    async fn probe(&self, instance: &InstanceDescriptor) -> Option<(u16, PingResult)> {
        let answers = stream::iter(instance.tcp_host_ports()).filter_map(|port| async move {
            self.pinger
                .ping(&self.probe_host, port)
                .await
                .map(|result| (port, result))
        });
        let mut answers = std::pin::pin!(answers);
        answers.next().await
    }

    /// Record for one instance; `None` when it is hidden, stopped, or no port answers.
    pub async fn assemble(&self, instance: &InstanceDescriptor) -> Option<ServerStatusRecord> {
        if instance.is_hidden() {
            return None;
        }
        if !instance.is_running() {
            debug!("instance {} is {}, not probed", instance.name, instance.state);
            return None;
        }

        let Some((port, ping)) = self.probe(instance).await else {
            debug!("instance {} has no answering status port", instance.name);
            return None;
        };
        let log_info = status_log::decode_or_default(instance.health_log.as_deref());
        let dynmap = self.map_resolver.resolve(instance, port).await;
        Some(compose_record(instance, ping, log_info, dynmap))
    }
}

#[async_trait::async_trait]
impl StatusSource for ServerStatusAssembler {
    /// Probes all instances concurrently; output keeps inventory order.
    async fn assemble_all(&self) -> Snapshot {
        let instances = match self.inventory.list_instances().await {
            Ok(instances) => instances,
            Err(e) => {
                error!("failed to list instances: {:#}", e);
                return vec![];
            }
        };

        join_all(instances.iter().map(|instance| self.assemble(instance)))
            .await
            .into_iter()
            .flatten()
            .collect()
    }
}

/// The log line is the primary source for version and motd; the ping fills them
/// in when the line has none or does not decode. This departs from a log-only
/// reading, where a broken line leaves both fields empty.
pub fn compose_record(
    instance: &InstanceDescriptor,
    ping: PingResult,
    log_info: LogDerivedInfo,
    dynmap: Option<String>,
) -> ServerStatusRecord {
    let players: Vec<PlayerEntry> = ping
        .players
        .into_iter()
        .map(|player| PlayerEntry {
            name: player.name,
            uuid: player.id,
        })
        .collect();
    let version = if log_info.version.is_empty() {
        ping.version_name
    } else {
        log_info.version
    };
    let motd = if log_info.motd.is_empty() {
        forgeserv_protocol::minecraft::motd::clean_motd(&ping.description)
    } else {
        log_info.motd
    };

    ServerStatusRecord {
        name: instance.name.clone(),
        server_type: instance.server_type(),
        status: instance.state.clone(),
        health: instance.health.clone(),
        online: players.len(),
        players,
        max: log_info.max,
        icon: ping.icon.map(|bytes| B64.encode(bytes)),
        motd,
        version,
        dynmap,
    }
}
