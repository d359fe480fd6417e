//! Scalar hotbar settings and the document they are persisted in
//!
//! `settings.json` holds the individually editable scalar values plus the
//! serialized structural profile as an opaque string. Every setter records a
//! change event when (and only when) the value actually changed; the bridge
//! drains those events once per tick.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

use crate::constants::{config, defaults, validation};
use crate::types::{EmptySlotDisplay, SlotKey};

/// Which scalar setting changed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SettingKey {
    Rows,
    SlotsPerRow,
    Scale,
    HideLeftNav,
    CombatMode,
    ShowCooldownTimer,
    PreciseCooldownTime,
    EmptySlotDisplay,
    DisabledSlots,
}

impl SettingKey {
    pub const ALL: [SettingKey; 9] = [
        SettingKey::Rows,
        SettingKey::SlotsPerRow,
        SettingKey::Scale,
        SettingKey::HideLeftNav,
        SettingKey::CombatMode,
        SettingKey::ShowCooldownTimer,
        SettingKey::PreciseCooldownTime,
        SettingKey::EmptySlotDisplay,
        SettingKey::DisabledSlots,
    ];
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HotbarSettings {
    #[serde(default = "default_rows")]
    pub rows: i32,

    #[serde(default = "default_slots_per_row")]
    pub slots_per_row: i32,

    /// Percent
    #[serde(default = "default_scale")]
    pub scale: i32,

    #[serde(default)]
    pub hide_left_nav: bool,

    #[serde(default = "default_combat_mode")]
    pub combat_mode: bool,

    #[serde(default = "default_show_cooldown_timer")]
    pub show_cooldown_timer: bool,

    #[serde(default)]
    pub precise_cooldown_time: bool,

    #[serde(default)]
    pub empty_slot_display: EmptySlotDisplay,

    /// Global disabled slots; the per-slot flag in the profile mirrors this
    #[serde(default)]
    pub disabled_slots: Vec<SlotKey>,
}

fn default_rows() -> i32 {
    defaults::ROWS
}

fn default_slots_per_row() -> i32 {
    defaults::SLOTS_PER_ROW
}

fn default_scale() -> i32 {
    defaults::SCALE
}

fn default_combat_mode() -> bool {
    defaults::COMBAT_MODE
}

fn default_show_cooldown_timer() -> bool {
    defaults::SHOW_COOLDOWN_TIMER
}

impl Default for HotbarSettings {
    fn default() -> Self {
        Self {
            rows: default_rows(),
            slots_per_row: default_slots_per_row(),
            scale: default_scale(),
            hide_left_nav: defaults::HIDE_LEFT_NAV,
            combat_mode: default_combat_mode(),
            show_cooldown_timer: default_show_cooldown_timer(),
            precise_cooldown_time: defaults::PRECISE_COOLDOWN_TIME,
            empty_slot_display: EmptySlotDisplay::default(),
            disabled_slots: Vec::new(),
        }
    }
}

fn clamp_setting(name: &str, value: i32, min: i32, max: i32) -> i32 {
    if value < min {
        warn!(setting = name, value = value, min = min, "Setting below minimum, clamping");
        min
    } else if value > max {
        warn!(setting = name, value = value, max = max, "Setting exceeds maximum, clamping");
        max
    } else {
        value
    }
}

fn normalize_keys(mut keys: Vec<SlotKey>) -> Vec<SlotKey> {
    keys.sort();
    keys.dedup();
    keys
}

impl HotbarSettings {
    /// Validate and clamp loaded values to their accepted ranges
    pub fn validate_and_clamp(&mut self) {
        use validation::*;

        self.rows = clamp_setting("rows", self.rows, MIN_ROWS, MAX_ROWS);
        self.slots_per_row = clamp_setting(
            "slots_per_row",
            self.slots_per_row,
            MIN_SLOTS_PER_ROW,
            MAX_SLOTS_PER_ROW,
        );
        self.scale = clamp_setting("scale", self.scale, MIN_SCALE, MAX_SCALE);
        self.disabled_slots = normalize_keys(std::mem::take(&mut self.disabled_slots));
    }
}

/// On-disk shape of `settings.json`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct SettingsDocument {
    #[serde(default)]
    settings: HotbarSettings,

    /// Serialized profile, opaque at this layer
    #[serde(default, skip_serializing_if = "String::is_empty")]
    profile: String,
}

/// Directory holding every file this crate writes
pub fn app_dir() -> PathBuf {
    let mut path = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
    path.push(config::APP_DIR);
    path
}

/// Scalar settings plus the stored profile blob
#[derive(Debug)]
pub struct SettingsStore {
    path: Option<PathBuf>,
    values: HotbarSettings,
    profile_blob: String,
    changes: Vec<SettingKey>,
    quiet: bool,
    batching: bool,
    dirty: bool,
}

impl SettingsStore {
    pub fn path() -> PathBuf {
        app_dir().join(config::FILENAME)
    }

    /// Load from the default location
    pub fn load() -> Self {
        Self::load_from(Self::path())
    }

    /// Load from `path`; a missing or unreadable document yields defaults
    pub fn load_from(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let document = if path.exists() {
            match read_document(&path) {
                Ok(document) => {
                    info!(path = %path.display(), "Loaded hotbar settings");
                    document
                }
                Err(e) => {
                    error!(path = %path.display(), error = ?e, "Failed to load settings, using defaults");
                    SettingsDocument::default()
                }
            }
        } else {
            info!(path = %path.display(), "Settings file not found, using defaults");
            SettingsDocument::default()
        };

        let mut values = document.settings;
        values.validate_and_clamp();
        Self {
            path: Some(path),
            values,
            profile_blob: document.profile,
            changes: Vec::new(),
            quiet: false,
            batching: false,
            dirty: false,
        }
    }

    /// Store that never touches the filesystem
    pub fn in_memory(values: HotbarSettings) -> Self {
        let mut values = values;
        values.validate_and_clamp();
        Self {
            path: None,
            values,
            profile_blob: String::new(),
            changes: Vec::new(),
            quiet: false,
            batching: false,
            dirty: false,
        }
    }

    pub fn file_path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn values(&self) -> &HotbarSettings {
        &self.values
    }

    pub fn profile_blob(&self) -> &str {
        &self.profile_blob
    }

    /// Replace the stored profile blob; true if it differed
    pub fn set_profile_blob(&mut self, blob: String) -> bool {
        if self.profile_blob == blob {
            return false;
        }
        self.profile_blob = blob;
        self.persist();
        true
    }

    /// Drain pending change events, oldest first
    pub fn take_changes(&mut self) -> Vec<SettingKey> {
        std::mem::take(&mut self.changes)
    }

    pub fn has_changes(&self) -> bool {
        !self.changes.is_empty()
    }

    /// Run `f` with persistence deferred; the document is written at most
    /// once, when the outermost batch ends
    pub fn batched<R>(&mut self, f: impl FnOnce(&mut Self) -> R) -> R {
        let was_batching = std::mem::replace(&mut self.batching, true);
        let result = f(self);
        self.batching = was_batching;
        if !was_batching && std::mem::take(&mut self.dirty) {
            self.persist();
        }
        result
    }

    /// Run `f` as one batch without recording change events
    pub fn quietly<R>(&mut self, f: impl FnOnce(&mut Self) -> R) -> R {
        let was_quiet = std::mem::replace(&mut self.quiet, true);
        let result = self.batched(f);
        self.quiet = was_quiet;
        result
    }

    pub fn set_rows(&mut self, rows: i32) -> bool {
        let rows = clamp_setting("rows", rows, validation::MIN_ROWS, validation::MAX_ROWS);
        let changed = replace_if_different(&mut self.values.rows, rows);
        self.commit(SettingKey::Rows, changed)
    }

    pub fn set_slots_per_row(&mut self, slots_per_row: i32) -> bool {
        let slots_per_row = clamp_setting(
            "slots_per_row",
            slots_per_row,
            validation::MIN_SLOTS_PER_ROW,
            validation::MAX_SLOTS_PER_ROW,
        );
        let changed = replace_if_different(&mut self.values.slots_per_row, slots_per_row);
        self.commit(SettingKey::SlotsPerRow, changed)
    }

    pub fn set_scale(&mut self, scale: i32) -> bool {
        let scale = clamp_setting("scale", scale, validation::MIN_SCALE, validation::MAX_SCALE);
        let changed = replace_if_different(&mut self.values.scale, scale);
        self.commit(SettingKey::Scale, changed)
    }

    pub fn set_hide_left_nav(&mut self, hide: bool) -> bool {
        let changed = replace_if_different(&mut self.values.hide_left_nav, hide);
        self.commit(SettingKey::HideLeftNav, changed)
    }

    pub fn set_combat_mode(&mut self, enabled: bool) -> bool {
        let changed = replace_if_different(&mut self.values.combat_mode, enabled);
        self.commit(SettingKey::CombatMode, changed)
    }

    pub fn set_show_cooldown_timer(&mut self, show: bool) -> bool {
        let changed = replace_if_different(&mut self.values.show_cooldown_timer, show);
        self.commit(SettingKey::ShowCooldownTimer, changed)
    }

    pub fn set_precise_cooldown_time(&mut self, precise: bool) -> bool {
        let changed = replace_if_different(&mut self.values.precise_cooldown_time, precise);
        self.commit(SettingKey::PreciseCooldownTime, changed)
    }

    pub fn set_empty_slot_display(&mut self, display: EmptySlotDisplay) -> bool {
        let changed = replace_if_different(&mut self.values.empty_slot_display, display);
        self.commit(SettingKey::EmptySlotDisplay, changed)
    }

    pub fn set_disabled_slots(&mut self, keys: Vec<SlotKey>) -> bool {
        let changed = replace_if_different(&mut self.values.disabled_slots, normalize_keys(keys));
        self.commit(SettingKey::DisabledSlots, changed)
    }

    fn commit(&mut self, key: SettingKey, changed: bool) -> bool {
        if !changed {
            return false;
        }
        debug!(setting = ?key, quiet = self.quiet, "Setting changed");
        if !self.quiet && !self.changes.contains(&key) {
            self.changes.push(key);
        }
        self.persist();
        true
    }

    fn persist(&mut self) {
        if self.path.is_none() {
            return;
        }
        if self.batching {
            self.dirty = true;
            return;
        }
        if let Err(e) = self.save() {
            error!(error = ?e, "Failed to persist hotbar settings");
        }
    }

    /// Write the settings document; no-op for in-memory stores
    pub fn save(&self) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory {:?}", parent))?;
        }

        let document = SettingsDocument {
            settings: self.values.clone(),
            profile: self.profile_blob.clone(),
        };
        let json = serde_json::to_string_pretty(&document)
            .context("Failed to serialize hotbar settings")?;
        fs::write(path, json).with_context(|| format!("Failed to write settings to {:?}", path))?;

        debug!(path = %path.display(), "Saved hotbar settings");
        Ok(())
    }
}

fn read_document(path: &Path) -> Result<SettingsDocument> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read settings from {:?}", path))?;
    serde_json::from_str(&contents)
        .with_context(|| format!("Failed to parse settings JSON from {:?}", path))
}

fn replace_if_different<T: PartialEq>(field: &mut T, value: T) -> bool {
    if *field == value {
        return false;
    }
    *field = value;
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_fields_use_defaults() {
        let settings: HotbarSettings = serde_json::from_str(r#"{"rows": 3}"#).unwrap();
        assert_eq!(settings.rows, 3);
        assert_eq!(settings.slots_per_row, defaults::SLOTS_PER_ROW);
        assert!(settings.show_cooldown_timer);
        assert!(settings.disabled_slots.is_empty());
    }

    #[test]
    fn test_validate_and_clamp() {
        let mut settings = HotbarSettings {
            rows: 9,
            slots_per_row: 0,
            scale: 400,
            disabled_slots: vec![SlotKey::new(1, 2), SlotKey::new(0, 1), SlotKey::new(1, 2)],
            ..HotbarSettings::default()
        };
        settings.validate_and_clamp();
        assert_eq!(settings.rows, validation::MAX_ROWS);
        assert_eq!(settings.slots_per_row, validation::MIN_SLOTS_PER_ROW);
        assert_eq!(settings.scale, validation::MAX_SCALE);
        assert_eq!(settings.disabled_slots, vec![SlotKey::new(0, 1), SlotKey::new(1, 2)]);
    }

    #[test]
    fn test_setters_record_only_real_changes() {
        let mut store = SettingsStore::in_memory(HotbarSettings::default());
        assert!(!store.set_rows(defaults::ROWS));
        assert!(!store.has_changes());

        assert!(store.set_rows(2));
        assert!(store.set_scale(120));
        assert!(store.set_rows(3));
        assert_eq!(store.take_changes(), vec![SettingKey::Rows, SettingKey::Scale]);
        assert!(store.take_changes().is_empty());
    }

    #[test]
    fn test_setter_clamps_out_of_range() {
        let mut store = SettingsStore::in_memory(HotbarSettings::default());
        assert!(store.set_slots_per_row(99));
        assert_eq!(store.values().slots_per_row, validation::MAX_SLOTS_PER_ROW);
    }

    #[test]
    fn test_quietly_suppresses_events() {
        let mut store = SettingsStore::in_memory(HotbarSettings::default());
        store.quietly(|s| {
            s.set_combat_mode(false);
            s.set_hide_left_nav(true);
        });
        assert!(!store.has_changes());
        assert!(!store.values().combat_mode);
        assert!(store.values().hide_left_nav);
    }

    #[test]
    fn test_persist_and_reload() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join(config::FILENAME);

        let mut store = SettingsStore::load_from(&path);
        assert!(!path.exists());
        store.set_scale(150);
        store.set_empty_slot_display(EmptySlotDisplay::Hidden);
        store.set_profile_blob("{\"rows\":1}".to_string());
        assert!(path.exists());

        let reloaded = SettingsStore::load_from(&path);
        assert_eq!(reloaded.values().scale, 150);
        assert_eq!(reloaded.values().empty_slot_display, EmptySlotDisplay::Hidden);
        assert_eq!(reloaded.profile_blob(), "{\"rows\":1}");
    }

    #[test]
    fn test_batch_defers_write_until_end() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(config::FILENAME);
        let mut store = SettingsStore::load_from(&path);

        store.quietly(|s| {
            s.set_rows(2);
            s.batched(|s| s.set_scale(130));
            s.set_profile_blob("{}".to_string());
            assert!(!path.exists());
        });
        assert!(path.exists());

        let reloaded = SettingsStore::load_from(&path);
        assert_eq!(reloaded.values().rows, 2);
        assert_eq!(reloaded.values().scale, 130);
        assert_eq!(reloaded.profile_blob(), "{}");
    }

    #[test]
    fn test_corrupt_document_falls_back_to_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(config::FILENAME);
        fs::write(&path, "{ not json").unwrap();

        let store = SettingsStore::load_from(&path);
        assert_eq!(store.values(), &HotbarSettings::default());
        assert!(store.profile_blob().is_empty());
    }
}
