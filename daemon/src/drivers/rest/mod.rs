mod driver;
mod sort;

pub use driver::RestDriver;
