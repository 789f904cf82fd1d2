pub mod config;
pub mod crn;
pub mod types;

pub use config::{ClientSettings, SettingsError, SettingsOverlay, timeouts, ttl};
pub use crn::{cloud_instance_id, workspace_crn};
pub use types::*;
