use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use std::ops::Deref;
use std::sync::{Arc, LazyLock};
use tokio::sync::Mutex;
use tokio::sync::Notify;
use tokio::task::JoinHandle;

use crate::config::AppConfig;
use crate::drivers::websocket::WsConnManager;
use crate::drivers::GracefulShutdown;
use crate::inventory::JsonFileInventory;
use crate::minecraft::SlpPinger;
use crate::status::{
    Baseline, ChainMapResolver, ChangeDetectingNotifier, HttpMapResolver, LabelMapResolver,
    ServerStatusAssembler, StatusSource,
};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
static START_TIME: LazyLock<DateTime<Utc>> = LazyLock::new(Utc::now);

pub struct ApplicationState {
    pub stop_notify: Arc<Notify>,
    /// Pull path: every request assembles its own snapshot.
    pub source: Arc<dyn StatusSource>,
    /// Push path.
    pub notifier: Arc<ChangeDetectingNotifier>,
    pub ws_connections: Mutex<Vec<JoinHandle<()>>>,
    pub ws_conn_manager: WsConnManager,
}
pub type AppState = Arc<ApplicationState>;

impl ApplicationState {
    pub fn new(source: Arc<dyn StatusSource>, notifier: Arc<ChangeDetectingNotifier>) -> Self {
        Self {
            stop_notify: Arc::new(Notify::new()),
            source,
            notifier,
            ws_connections: Mutex::new(vec![]),
            ws_conn_manager: WsConnManager::new(),
        }
    }
}

pub fn get_start_time() -> &'static DateTime<Utc> {
    START_TIME.deref()
}

fn build_map_resolver(config: &AppConfig) -> ChainMapResolver {
    let resolver = ChainMapResolver::new().with(LabelMapResolver::new(&config.dynmap.label));
    let Some(lookup_url) = &config.dynmap.lookup_url else {
        return resolver;
    };
    match HttpMapResolver::new(lookup_url, config.probe.timeout()) {
        Ok(http) => resolver.with(http),
        Err(e) => {
            warn!("map lookup disabled: {:#}", e);
            resolver
        }
    }
}

async fn init_app_state() -> AppState {
    let config = AppConfig::get();
    debug!(
        "config loaded: {}",
        serde_json::to_string_pretty(&config).unwrap_or_default()
    );

    let assembler: Arc<dyn StatusSource> = Arc::new(ServerStatusAssembler::new(
        Arc::new(JsonFileInventory::new(&config.inventory.path)),
        Arc::new(SlpPinger::new(config.probe.timeout())),
        Arc::new(build_map_resolver(config)),
        config.probe.host.clone(),
    ));
    let notifier = Arc::new(ChangeDetectingNotifier::new(
        assembler.clone(),
        Arc::new(Baseline::default()),
        config.notifier.interval(),
    ));
    notifier.prime().await;

    Arc::new(ApplicationState::new(assembler, notifier))
}

pub async fn run_app() -> anyhow::Result<()> {
    let _ = get_start_time();

    let state = init_app_state().await;
    let mut gs = GracefulShutdown::new(state.stop_notify.clone());

    AppConfig::get()
        .drivers
        .enabled
        .iter()
        .for_each(|driver_type| gs.add_driver(driver_type.new_driver(state.clone())));

    gs.run().await;
    info!("Bye.");
    Ok(())
}
