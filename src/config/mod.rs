//! Configuration for action bars
//!
//! - **settings**: scalar settings document (`settings.json`) and its store
//! - **bridge**: two-way sync between those settings and the structural profile

pub mod bridge;
pub mod settings;

pub use bridge::{SettingsBridge, SyncState};
pub use settings::{HotbarSettings, SettingKey, SettingsStore};
