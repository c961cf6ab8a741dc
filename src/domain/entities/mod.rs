pub mod agent;
pub mod assignment;
pub mod business_hour;
pub mod department;
pub mod membership;

pub use agent::*;
pub use assignment::*;
pub use business_hour::*;
pub use department::*;
pub use membership::*;
