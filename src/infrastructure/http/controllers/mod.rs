pub mod agents;
pub mod assignments;
pub mod availability;
pub mod business_hours;
pub mod departments;
