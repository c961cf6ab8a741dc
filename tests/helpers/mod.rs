#![allow(unused_imports)]
pub mod routing_helpers;
pub mod test_db;

pub use routing_helpers::*;
pub use test_db::*;
