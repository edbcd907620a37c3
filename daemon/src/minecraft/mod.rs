pub mod slp_client;
pub mod status_log;
pub mod varint;

pub use slp_client::{Pinger, SlpPinger};
