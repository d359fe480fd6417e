//! action-bars: hotbar profile management for an action game UI
//!
//! This library provides:
//! - The structural hotbar profile and its dimension rules
//! - Scalar settings and their two-way sync with the profile
//! - Per-character slot overlays
//! - Weapon-context driven dynamic presets
//! - A runtime coordinator that drives a live slot grid

#![forbid(unsafe_code)]

pub mod characters;
pub mod cli;
pub mod config;
pub mod constants;
pub mod presets;
pub mod profile;
pub mod runtime;
pub mod service;
pub mod types;
pub mod weapon_context;

// Re-export commonly used types
pub use config::{HotbarSettings, SettingsStore};
pub use profile::{Profile, ProfileChangeType, ProfileChanged};
pub use runtime::{HotbarRuntime, LiveGrid};
pub use service::ProfileService;
pub use types::{SlotAssignment, SlotKey};
pub use weapon_context::{EquipmentSource, WeaponContext};
