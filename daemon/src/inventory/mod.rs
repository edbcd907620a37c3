mod instance;
mod provider;

pub use instance::*;
pub use provider::*;
