//! Structural hotbar profile: data model, dimension enforcement and storage

pub mod model;
pub mod store;
pub mod structure;

pub use model::{ActionBinding, Hotbar, NavBindings, Profile, Slot, SlotConfig};
pub use store::ProfileStore;

use std::fmt;

/// Kind of profile mutation carried by a change notification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProfileChangeType {
    RowAdded,
    RowRemoved,
    SlotAdded,
    SlotRemoved,
    HotbarAdded,
    HotbarRemoved,
    Scale,
    HideLeftNav,
    CombatMode,
    CooldownTimer,
    EmptySlotView,
    ProfileRefreshed,
}

impl ProfileChangeType {
    /// Changes that only affect presentation and need no slot reassignment
    pub fn is_cosmetic(self) -> bool {
        matches!(self, ProfileChangeType::Scale)
    }
}

impl fmt::Display for ProfileChangeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Notification sent to subscribers after the profile was persisted
#[derive(Debug, Clone)]
pub struct ProfileChanged {
    pub change: ProfileChangeType,
    pub profile: Profile,
}
