pub mod availability_worker;

pub use availability_worker::*;
