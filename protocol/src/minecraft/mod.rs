pub mod motd;
mod slp;

pub use slp::*;
