pub mod availability;

pub use availability::{handle_event, run_availability_listener, run_settings_listener};
