pub mod application;
pub mod bootstrap;
pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod shared;

pub use application::services::*;
pub use config::{Config, RoutingSettings, SettingsHandle};
pub use domain::entities::*;
pub use domain::errors::*;
pub use shared::events::*;
