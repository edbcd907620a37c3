mod connection;
mod driver;

pub use connection::*;
pub use driver::WsDriver;
