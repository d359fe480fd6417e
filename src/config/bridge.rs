//! Two-way sync between scalar settings and the structural profile
//!
//! Settings -> profile runs for each drained change event; profile -> settings
//! runs after every structural operation. A sync state token guards both
//! directions so a write-back can never feed itself back in.

use tracing::debug;

use crate::config::settings::{HotbarSettings, SettingKey, SettingsStore};
use crate::profile::structure::ensure_dimensions;
use crate::profile::{Profile, ProfileChangeType};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SyncState {
    #[default]
    Idle,
    Syncing,
}

#[derive(Debug, Default)]
pub struct SettingsBridge {
    state: SyncState,
}

impl SettingsBridge {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> SyncState {
        self.state
    }

    /// Copy one changed setting into `profile`
    ///
    /// Returns the change type to announce, or `None` when the profile was
    /// already in step (or a sync pass is in progress).
    pub fn apply_setting_change(
        &mut self,
        key: SettingKey,
        settings: &HotbarSettings,
        profile: &mut Profile,
    ) -> Option<ProfileChangeType> {
        if self.state == SyncState::Syncing {
            debug!(setting = ?key, "Sync in progress, ignoring setting change");
            return None;
        }
        self.state = SyncState::Syncing;
        let change = apply_setting(key, settings, profile);
        self.state = SyncState::Idle;

        if let Some(change) = change {
            debug!(setting = ?key, change = %change, "Applied setting to profile");
        }
        change
    }

    /// Copy profile scalars back into `settings` where they differ
    ///
    /// Writes happen quietly so they do not come back as change events.
    pub fn write_back(&mut self, profile: &Profile, settings: &mut SettingsStore) {
        if self.state == SyncState::Syncing {
            debug!("Sync in progress, skipping write-back");
            return;
        }
        self.state = SyncState::Syncing;

        settings.quietly(|s| {
            s.set_rows(profile.rows as i32);
            s.set_slots_per_row(profile.slots_per_row as i32);
            s.set_scale(profile.scale);
            s.set_hide_left_nav(profile.hide_left_nav);
            s.set_combat_mode(profile.combat_mode);
            if let Some(lead) = profile.lead_slot_config() {
                s.set_show_cooldown_timer(lead.show_cooldown_time);
                s.set_precise_cooldown_time(lead.precise_cooldown_time);
                s.set_empty_slot_display(lead.empty_slot_display);
            }
            s.set_disabled_slots(profile.disabled_keys());
        });

        self.state = SyncState::Idle;
    }
}

/// Bring every setting-backed field of `profile` in line with `settings`
///
/// Returns true if anything changed.
pub fn sync_profile_from_settings(settings: &HotbarSettings, profile: &mut Profile) -> bool {
    let mut changed = false;
    for key in SettingKey::ALL {
        changed |= apply_setting(key, settings, profile).is_some();
    }
    // repairs an inconsistent profile even when dimensions already match
    changed |= ensure_dimensions(
        profile,
        settings.rows.max(0) as usize,
        settings.slots_per_row.max(0) as usize,
    );
    changed
}

fn apply_setting(
    key: SettingKey,
    settings: &HotbarSettings,
    profile: &mut Profile,
) -> Option<ProfileChangeType> {
    match key {
        SettingKey::Rows => {
            let before = profile.rows;
            let changed = ensure_dimensions(
                profile,
                settings.rows.max(0) as usize,
                profile.slots_per_row,
            );
            if !changed {
                return None;
            }
            Some(if profile.rows < before {
                ProfileChangeType::RowRemoved
            } else {
                ProfileChangeType::RowAdded
            })
        }
        SettingKey::SlotsPerRow => {
            let before = profile.slots_per_row;
            let changed = ensure_dimensions(
                profile,
                profile.rows,
                settings.slots_per_row.max(0) as usize,
            );
            if !changed {
                return None;
            }
            Some(if profile.slots_per_row < before {
                ProfileChangeType::SlotRemoved
            } else {
                ProfileChangeType::SlotAdded
            })
        }
        SettingKey::Scale => assign(&mut profile.scale, settings.scale)
            .then_some(ProfileChangeType::Scale),
        SettingKey::HideLeftNav => assign(&mut profile.hide_left_nav, settings.hide_left_nav)
            .then_some(ProfileChangeType::HideLeftNav),
        SettingKey::CombatMode => assign(&mut profile.combat_mode, settings.combat_mode)
            .then_some(ProfileChangeType::CombatMode),
        SettingKey::ShowCooldownTimer => {
            let mut changed = false;
            for (_, slot) in profile.slots_mut() {
                changed |= assign(&mut slot.config.show_cooldown_time, settings.show_cooldown_timer);
            }
            changed.then_some(ProfileChangeType::CooldownTimer)
        }
        SettingKey::PreciseCooldownTime => {
            let mut changed = false;
            for (_, slot) in profile.slots_mut() {
                changed |= assign(
                    &mut slot.config.precise_cooldown_time,
                    settings.precise_cooldown_time,
                );
            }
            changed.then_some(ProfileChangeType::CooldownTimer)
        }
        SettingKey::EmptySlotDisplay => {
            let mut changed = false;
            for (_, slot) in profile.slots_mut() {
                changed |= assign(&mut slot.config.empty_slot_display, settings.empty_slot_display);
            }
            changed.then_some(ProfileChangeType::EmptySlotView)
        }
        SettingKey::DisabledSlots => {
            let mut changed = false;
            for (key, slot) in profile.slots_mut() {
                let disabled = settings.disabled_slots.contains(&key);
                changed |= assign(&mut slot.config.is_disabled, disabled);
            }
            changed.then_some(ProfileChangeType::ProfileRefreshed)
        }
    }
}

fn assign<T: PartialEq>(field: &mut T, value: T) -> bool {
    if *field == value {
        return false;
    }
    *field = value;
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{EmptySlotDisplay, SlotKey};

    fn synced(settings: &HotbarSettings) -> Profile {
        let mut profile = Profile::default();
        sync_profile_from_settings(settings, &mut profile);
        profile
    }

    #[test]
    fn test_rows_change_maps_to_row_events() {
        let mut settings = HotbarSettings::default();
        let mut profile = synced(&settings);
        let mut bridge = SettingsBridge::new();

        settings.rows = 3;
        let change = bridge.apply_setting_change(SettingKey::Rows, &settings, &mut profile);
        assert_eq!(change, Some(ProfileChangeType::RowAdded));
        assert_eq!(profile.rows, 3);
        assert_eq!(profile.hotbars[0].slots.len(), 3 * profile.slots_per_row);

        settings.rows = 2;
        let change = bridge.apply_setting_change(SettingKey::Rows, &settings, &mut profile);
        assert_eq!(change, Some(ProfileChangeType::RowRemoved));

        let change = bridge.apply_setting_change(SettingKey::Rows, &settings, &mut profile);
        assert_eq!(change, None);
    }

    #[test]
    fn test_slot_options_fan_out_to_every_slot() {
        let mut settings = HotbarSettings::default();
        let mut profile = synced(&settings);
        let mut bridge = SettingsBridge::new();

        settings.empty_slot_display = EmptySlotDisplay::Image;
        assert_eq!(
            bridge.apply_setting_change(SettingKey::EmptySlotDisplay, &settings, &mut profile),
            Some(ProfileChangeType::EmptySlotView)
        );
        assert!(profile
            .slots()
            .all(|(_, slot)| slot.config.empty_slot_display == EmptySlotDisplay::Image));

        settings.precise_cooldown_time = true;
        assert_eq!(
            bridge.apply_setting_change(SettingKey::PreciseCooldownTime, &settings, &mut profile),
            Some(ProfileChangeType::CooldownTimer)
        );
    }

    #[test]
    fn test_disabled_slots_mirror_into_profile() {
        let mut settings = HotbarSettings::default();
        let mut profile = synced(&settings);
        let mut bridge = SettingsBridge::new();

        settings.disabled_slots = vec![SlotKey::new(0, 2)];
        assert_eq!(
            bridge.apply_setting_change(SettingKey::DisabledSlots, &settings, &mut profile),
            Some(ProfileChangeType::ProfileRefreshed)
        );
        assert_eq!(profile.disabled_keys(), vec![SlotKey::new(0, 2)]);
    }

    #[test]
    fn test_ignored_while_syncing() {
        let mut settings = HotbarSettings::default();
        let mut profile = synced(&settings);
        let mut bridge = SettingsBridge {
            state: SyncState::Syncing,
        };

        settings.scale = 150;
        assert_eq!(bridge.apply_setting_change(SettingKey::Scale, &settings, &mut profile), None);
        assert_eq!(profile.scale, 100);
    }

    #[test]
    fn test_write_back_is_quiet_and_only_if_different() {
        let mut store = SettingsStore::in_memory(HotbarSettings::default());
        let mut profile = synced(store.values());
        let mut bridge = SettingsBridge::new();

        profile.scale = 140;
        profile.hotbars[0].slots[1].config.is_disabled = true;
        bridge.write_back(&profile, &mut store);

        assert_eq!(store.values().scale, 140);
        assert_eq!(store.values().disabled_slots, vec![SlotKey::new(0, 1)]);
        assert!(!store.has_changes());
        assert_eq!(bridge.state(), SyncState::Idle);
    }

    #[test]
    fn test_sync_from_settings_builds_valid_shape() {
        let settings = HotbarSettings {
            rows: 2,
            slots_per_row: 4,
            ..HotbarSettings::default()
        };
        let profile = synced(&settings);
        assert_eq!(profile.rows, 2);
        assert_eq!(profile.slots_per_row, 4);
        assert_eq!(profile.hotbars[0].slots.len(), 8);

        let mut again = profile.clone();
        assert!(!sync_profile_from_settings(&settings, &mut again));
        assert_eq!(again, profile);
    }
}
