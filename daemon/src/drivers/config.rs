use super::Drivers;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::net::{IpAddr, Ipv4Addr};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DriversConfig {
    pub enabled: Cow<'static, [Drivers]>,

    pub rest_driver_config: UniDriverConfig,
    pub websocket_driver_config: UniDriverConfig,
}

impl Default for DriversConfig {
    fn default() -> Self {
        Self {
            enabled: Cow::Borrowed(&[Drivers::Rest, Drivers::Websocket]),

            rest_driver_config: UniDriverConfig::with_port(9090),
            websocket_driver_config: UniDriverConfig::with_port(8008),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UniDriverConfig {
    pub port: u16,
    pub host: IpAddr,
}

impl UniDriverConfig {
    pub fn with_port(port: u16) -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0)),
            port,
        }
    }
}
