mod config;
mod graceful_shutdown;
pub mod rest;
pub mod websocket;
use crate::app::AppState;
use crate::drivers::rest::RestDriver;
use crate::drivers::websocket::WsDriver;
pub use graceful_shutdown::GracefulShutdown;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub use config::DriversConfig;

/// A front end serving the status until `stop_notify` fires.
#[async_trait::async_trait]
pub trait Driver: Send + Sync {
    async fn run(&self);

    fn get_driver_type(&self) -> Drivers;
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Drivers {
    Rest,
    Websocket,
}

impl Drivers {
    pub fn new_driver(&self, app_state: AppState) -> Arc<dyn Driver> {
        match self {
            Drivers::Rest => Arc::new(RestDriver::new(app_state)),
            Drivers::Websocket => Arc::new(WsDriver::new(app_state)),
        }
    }
}
