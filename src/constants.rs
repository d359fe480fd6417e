//! Application-wide constants
//!
//! This module contains all magic numbers and string literals used throughout
//! the crate, providing a single source of truth for constant values.

/// On-disk layout
pub mod config {
    /// Directory under the platform config dir
    pub const APP_DIR: &str = "action-bars";

    /// Scalar settings + serialized profile document
    pub const FILENAME: &str = "settings.json";

    /// Directory (under APP_DIR) holding one overlay file per character
    pub const CHARACTER_SLOTS_DIR: &str = "character_slots";

    /// Extension of character overlay files
    pub const CHARACTER_FILE_EXT: &str = "json";
}

/// Accepted ranges for scalar settings
pub mod validation {
    pub const MIN_ROWS: i32 = 1;
    pub const MAX_ROWS: i32 = 4;

    pub const MIN_SLOTS_PER_ROW: i32 = 1;
    pub const MAX_SLOTS_PER_ROW: i32 = 20;

    pub const MIN_SCALE: i32 = 50;
    pub const MAX_SCALE: i32 = 200;

    /// Upper bound on hotbar count (one activation binding per bar)
    pub const MAX_HOTBARS: usize = 10;
}

/// Defaults used when no settings document exists yet
pub mod defaults {
    pub const ROWS: i32 = 1;
    pub const SLOTS_PER_ROW: i32 = 11;
    pub const SCALE: i32 = 100;
    pub const HIDE_LEFT_NAV: bool = false;
    pub const COMBAT_MODE: bool = true;
    pub const SHOW_COOLDOWN_TIMER: bool = true;
    pub const PRECISE_COOLDOWN_TIME: bool = false;

    /// Number of hotbars seeded into a fresh profile
    pub const HOTBAR_COUNT: usize = 1;
}

/// Input binding identifiers handed to the external binding layer
pub mod bindings {
    /// First action id for slot bindings (slot N uses base + N)
    pub const SLOT_ACTION_BASE_ID: i32 = 1000;

    /// First action id for hotbar activation bindings (bar N uses base + N)
    pub const HOTBAR_ACTION_BASE_ID: i32 = 1100;

    pub const NEXT_HOTBAR_ACTION_ID: i32 = 1200;
    pub const PREV_HOTBAR_ACTION_ID: i32 = 1201;
    pub const NEXT_HOTBAR_AXIS_ACTION_ID: i32 = 1202;
    pub const PREV_HOTBAR_AXIS_ACTION_ID: i32 = 1203;

    pub const SLOT_ACTION_PREFIX: &str = "ActionSlot_";
    pub const HOTBAR_ACTION_PREFIX: &str = "Hotbar_";
    pub const NEXT_HOTBAR_ACTION_NAME: &str = "NextHotbar";
    pub const PREV_HOTBAR_ACTION_NAME: &str = "PreviousHotbar";
    pub const NEXT_HOTBAR_AXIS_ACTION_NAME: &str = "NextHotbarAxis";
    pub const PREV_HOTBAR_AXIS_ACTION_NAME: &str = "PreviousHotbarAxis";
}

/// Weapon context resolution
pub mod context {
    /// Sentinel for "nothing equipped on this side"
    pub const NO_WEAPON_TYPE: i32 = -1;

    /// Off-hand non-weapon item ids are shifted by this amount so they never
    /// collide with main-hand ids or weapon type values
    pub const OFFHAND_NON_WEAPON_OFFSET: i32 = 1_000_000;

    pub const COMBO_PREFIX: &str = "combo:";
    pub const MAIN_PREFIX: &str = "main:";
    pub const OFF_PREFIX: &str = "off:";

    /// Fallback-of-last-resort context key
    pub const BASELINE_KEY: &str = "baseline";
}

/// Characters that cannot appear in overlay file names
pub mod paths {
    pub const UNSAFE_FILENAME_CHARS: [char; 3] = ['\\', '/', ':'];
    pub const FILENAME_REPLACEMENT: char = '_';
}
