pub mod minecraft;
pub mod status;
