mod log_info;
mod record;

pub use log_info::*;
pub use record::*;
