//! Per-session profile service
//!
//! One `ProfileService` is built per player session. It owns the settings
//! store, the profile, the sync bridge, the overlay store and the dynamic
//! presets, and is the only place that mutates the profile. Every persisted
//! mutation is announced to subscribers over an mpsc channel.

use std::sync::mpsc::{self, Receiver, Sender};
use tracing::{debug, info, warn};

use crate::characters::CharacterSlotStore;
use crate::config::{SettingsBridge, SettingsStore};
use crate::constants::validation::{MAX_SCALE, MIN_SCALE};
use crate::presets::DynamicPresetStore;
use crate::profile::structure::{self, Layout};
use crate::profile::{Profile, ProfileChangeType, ProfileChanged, ProfileStore};
use crate::types::{EmptySlotDisplay, SlotAssignment, SlotKey};

/// One live slot as reported by the grid
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LiveSlot {
    pub assignment: SlotAssignment,
    pub is_disabled: bool,
}

/// Per-bar, per-slot view of the live grid
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GridSnapshot {
    pub bars: Vec<Vec<LiveSlot>>,
}

impl GridSnapshot {
    /// Snapshot that mirrors `profile` exactly
    pub fn from_profile(profile: &Profile) -> Self {
        Self {
            bars: profile
                .hotbars
                .iter()
                .map(|bar| {
                    bar.slots
                        .iter()
                        .map(|slot| LiveSlot {
                            assignment: slot.assignment(),
                            is_disabled: slot.config.is_disabled,
                        })
                        .collect()
                })
                .collect(),
        }
    }

    pub fn get(&self, key: SlotKey) -> Option<&LiveSlot> {
        self.bars.get(key.bar)?.get(key.slot)
    }

    /// Assignment at `key`, empty when the grid has no such slot
    pub fn assignment(&self, key: SlotKey) -> SlotAssignment {
        self.get(key)
            .map(|live| live.assignment.clone())
            .unwrap_or_default()
    }

    pub fn is_all_empty(&self) -> bool {
        self.bars
            .iter()
            .flatten()
            .all(|live| live.assignment.is_empty())
    }
}

/// Result of feeding a grid snapshot back into the profile
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    Applied,
    Unchanged,
    /// All-empty snapshot over a populated profile
    Rejected,
}

/// Which bindable action a piece of key text belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingTarget {
    /// Slot position within every bar
    Slot(usize),
    Hotbar(usize),
    NextHotbar,
    PreviousHotbar,
}

pub struct ProfileService {
    settings: SettingsStore,
    store: ProfileStore,
    bridge: SettingsBridge,
    characters: CharacterSlotStore,
    presets: DynamicPresetStore,
    active_character: Option<String>,
    subscribers: Vec<Sender<ProfileChanged>>,
}

impl ProfileService {
    pub fn new(mut settings: SettingsStore, characters: CharacterSlotStore) -> Self {
        let store = ProfileStore::load(&mut settings);
        Self {
            settings,
            store,
            bridge: SettingsBridge::new(),
            characters,
            presets: DynamicPresetStore::new(),
            active_character: None,
            subscribers: Vec::new(),
        }
    }

    /// Service over the on-disk stores in the default config directory
    pub fn open() -> Self {
        Self::new(SettingsStore::load(), CharacterSlotStore::open())
    }

    pub fn profile(&self) -> &Profile {
        self.store.profile()
    }

    pub fn settings(&self) -> &SettingsStore {
        &self.settings
    }

    /// External edits go through here; they are picked up by
    /// [`ProfileService::process_setting_changes`]
    pub fn settings_mut(&mut self) -> &mut SettingsStore {
        &mut self.settings
    }

    pub fn presets(&self) -> &DynamicPresetStore {
        &self.presets
    }

    pub fn presets_mut(&mut self) -> &mut DynamicPresetStore {
        &mut self.presets
    }

    pub fn characters(&self) -> &CharacterSlotStore {
        &self.characters
    }

    pub fn active_character(&self) -> Option<&str> {
        self.active_character.as_deref()
    }

    pub fn subscribe(&mut self) -> Receiver<ProfileChanged> {
        let (tx, rx) = mpsc::channel();
        self.subscribers.push(tx);
        rx
    }

    fn emit(&mut self, change: ProfileChangeType) {
        let event = ProfileChanged {
            change,
            profile: self.store.profile().clone(),
        };
        // drop subscribers whose receiver is gone
        self.subscribers.retain(|tx| tx.send(event.clone()).is_ok());
        debug!(change = %change, subscribers = self.subscribers.len(), "Profile changed");
    }

    /// Persist the profile and copy its scalars back into the settings, as
    /// one settings write
    pub fn save(&mut self) -> bool {
        let (bridge, store) = (&mut self.bridge, &self.store);
        self.settings.batched(|settings| {
            bridge.write_back(store.profile(), settings);
            store.save(settings)
        })
    }

    /// Overlays are keyed by slot position, so after a resize every stored
    /// overlay and the live presets are moved to the new positions and the
    /// active character's overlay is rewritten from the profile
    fn carry_overlays(&mut self, before: Layout) {
        let after = Layout::of(self.profile());
        if before == after {
            return;
        }
        self.presets.remap(before, after);
        self.characters.rekey_overlays(before, after);
        if self.active_character.is_some() {
            self.save_character_slots();
        }
    }

    fn commit(&mut self, change: ProfileChangeType) {
        self.save();
        self.emit(change);
    }

    fn structural(&mut self, op: fn(&mut Profile) -> bool, change: ProfileChangeType) -> bool {
        let before = Layout::of(self.profile());
        if !op(self.store.profile_mut()) {
            return false;
        }
        info!(change = %change, rows = self.profile().rows, slots_per_row = self.profile().slots_per_row, hotbars = self.profile().hotbars.len(), "Profile structure changed");
        self.save();
        self.carry_overlays(before);
        self.emit(change);
        true
    }

    pub fn add_row(&mut self) -> bool {
        self.structural(structure::add_row, ProfileChangeType::RowAdded)
    }

    pub fn remove_row(&mut self) -> bool {
        self.structural(structure::remove_row, ProfileChangeType::RowRemoved)
    }

    pub fn add_slot(&mut self) -> bool {
        self.structural(structure::add_slot, ProfileChangeType::SlotAdded)
    }

    pub fn remove_slot(&mut self) -> bool {
        self.structural(structure::remove_slot, ProfileChangeType::SlotRemoved)
    }

    pub fn add_hotbar(&mut self) -> bool {
        self.structural(structure::add_hotbar, ProfileChangeType::HotbarAdded)
    }

    pub fn remove_hotbar(&mut self) -> bool {
        self.structural(structure::remove_hotbar, ProfileChangeType::HotbarRemoved)
    }

    /// Resize to `rows` x `slots_per_row` in one step
    pub fn update_dimensions(&mut self, rows: usize, slots_per_row: usize) -> bool {
        let before = Layout::of(self.profile());
        let (old_rows, old_slots) = (before.rows, before.slots_per_row);
        if !structure::ensure_dimensions(self.store.profile_mut(), rows, slots_per_row) {
            return false;
        }
        self.save();
        self.carry_overlays(before);

        let profile = self.profile();
        let mut changes = Vec::with_capacity(2);
        if profile.rows != old_rows {
            changes.push(if profile.rows > old_rows {
                ProfileChangeType::RowAdded
            } else {
                ProfileChangeType::RowRemoved
            });
        }
        if profile.slots_per_row != old_slots {
            changes.push(if profile.slots_per_row > old_slots {
                ProfileChangeType::SlotAdded
            } else {
                ProfileChangeType::SlotRemoved
            });
        }
        if changes.is_empty() {
            // repaired in place without a shape change
            changes.push(ProfileChangeType::ProfileRefreshed);
        }
        for change in changes {
            self.emit(change);
        }
        true
    }

    pub fn set_cooldown_timer(&mut self, show: bool, precise: bool) -> bool {
        let mut changed = false;
        for (_, slot) in self.store.profile_mut().slots_mut() {
            changed |= assign(&mut slot.config.show_cooldown_time, show);
            changed |= assign(&mut slot.config.precise_cooldown_time, precise);
        }
        self.finish(changed, ProfileChangeType::CooldownTimer)
    }

    pub fn set_empty_slot_view(&mut self, display: EmptySlotDisplay) -> bool {
        let mut changed = false;
        for (_, slot) in self.store.profile_mut().slots_mut() {
            changed |= assign(&mut slot.config.empty_slot_display, display);
        }
        self.finish(changed, ProfileChangeType::EmptySlotView)
    }

    pub fn set_hide_left_nav(&mut self, hide: bool) -> bool {
        let changed = assign(&mut self.store.profile_mut().hide_left_nav, hide);
        self.finish(changed, ProfileChangeType::HideLeftNav)
    }

    pub fn set_combat_mode(&mut self, enabled: bool) -> bool {
        let changed = assign(&mut self.store.profile_mut().combat_mode, enabled);
        self.finish(changed, ProfileChangeType::CombatMode)
    }

    pub fn set_scale(&mut self, scale: i32) -> bool {
        let clamped = scale.clamp(MIN_SCALE, MAX_SCALE);
        if clamped != scale {
            warn!(scale = scale, clamped = clamped, "Scale out of range, clamping");
        }
        let changed = assign(&mut self.store.profile_mut().scale, clamped);
        self.finish(changed, ProfileChangeType::Scale)
    }

    pub fn set_slot_dynamic(&mut self, key: SlotKey, dynamic: bool) -> bool {
        let Some(slot) = self.store.profile_mut().slot_mut(key) else {
            warn!(bar = key.bar, slot = key.slot, "No such slot");
            return false;
        };
        let changed = assign(&mut slot.config.is_dynamic, dynamic);
        self.finish(changed, ProfileChangeType::ProfileRefreshed)
    }

    /// Disabled state is global: it lives in the profile and the settings,
    /// never in a character overlay
    pub fn set_slot_disabled(&mut self, key: SlotKey, disabled: bool) -> bool {
        let Some(slot) = self.store.profile_mut().slot_mut(key) else {
            warn!(bar = key.bar, slot = key.slot, "No such slot");
            return false;
        };
        let changed = assign(&mut slot.config.is_disabled, disabled);
        self.finish(changed, ProfileChangeType::ProfileRefreshed)
    }

    /// Store the display text of the key bound to `target`
    pub fn set_binding_text(&mut self, target: BindingTarget, text: &str) -> bool {
        let profile = self.store.profile_mut();
        let mut changed = false;
        match target {
            BindingTarget::Slot(index) => {
                for bar in &mut profile.hotbars {
                    if let Some(slot) = bar.slots.get_mut(index) {
                        changed |= assign(&mut slot.config.hotkey_text, text.to_string());
                    }
                }
            }
            BindingTarget::Hotbar(index) => {
                if let Some(bar) = profile.hotbars.get_mut(index) {
                    changed |= assign(&mut bar.hotkey_text, text.to_string());
                }
            }
            BindingTarget::NextHotbar => {
                changed |= assign(&mut profile.nav.next_hotkey_text, text.to_string());
            }
            BindingTarget::PreviousHotbar => {
                changed |= assign(&mut profile.nav.prev_hotkey_text, text.to_string());
            }
        }
        self.finish(changed, ProfileChangeType::ProfileRefreshed)
    }

    fn finish(&mut self, changed: bool, change: ProfileChangeType) -> bool {
        if !changed {
            return false;
        }
        self.commit(change);
        true
    }

    /// Drain pending setting change events into the profile
    ///
    /// Returns the change types that were announced.
    pub fn process_setting_changes(&mut self) -> Vec<ProfileChangeType> {
        let mut applied = Vec::new();
        for key in self.settings.take_changes() {
            let before = Layout::of(self.profile());
            let change = self.bridge.apply_setting_change(
                key,
                self.settings.values(),
                self.store.profile_mut(),
            );
            if let Some(change) = change {
                self.store.save(&mut self.settings);
                self.carry_overlays(before);
                self.emit(change);
                applied.push(change);
            }
        }
        applied
    }

    /// Write the live grid back into the profile
    ///
    /// An all-empty snapshot is refused while the profile still holds items;
    /// that pattern comes from a grid that was rebuilt but not yet refilled.
    pub fn update(&mut self, snapshot: &GridSnapshot) -> UpdateOutcome {
        if snapshot.is_all_empty() && self.profile().has_any_item() {
            warn!(
                character = ?self.active_character,
                "Ignoring all-empty grid update over a populated profile"
            );
            return UpdateOutcome::Rejected;
        }

        let mut changed = false;
        for (key, slot) in self.store.profile_mut().slots_mut() {
            let Some(live) = snapshot.get(key) else {
                continue;
            };
            if !slot.assignment().same_as(&live.assignment) {
                slot.set_assignment(&live.assignment);
                changed = true;
            }
            changed |= assign(&mut slot.config.is_disabled, live.is_disabled);
        }

        if !changed {
            return UpdateOutcome::Unchanged;
        }
        self.save();
        UpdateOutcome::Applied
    }

    /// Store assignments the runtime placed itself (preset swaps); these are
    /// not grid snapshots, so the empty-state check does not apply
    pub fn set_slot_assignments(&mut self, assignments: &[(SlotKey, SlotAssignment)]) -> bool {
        let mut changed = false;
        let profile = self.store.profile_mut();
        for (key, assignment) in assignments {
            if let Some(slot) = profile.slot_mut(*key)
                && !slot.assignment().same_as(assignment)
            {
                slot.set_assignment(assignment);
                changed = true;
            }
        }
        if changed {
            self.save();
        }
        changed
    }

    /// Make `character_id` the active character, layering its overlay onto
    /// the profile and loading its presets
    pub fn activate_character(&mut self, character_id: &str) {
        if let Some(previous) = self.active_character.as_deref()
            && previous != character_id
        {
            debug!(previous = %previous, character = %character_id, "Switching active character");
        }
        let presets = self
            .characters
            .load_character_slots(character_id, self.store.profile_mut());
        self.presets.replace(presets);
        self.active_character = Some(character_id.to_string());
        self.store.save(&mut self.settings);
    }

    /// Persist the active character's overlay; false when none is active
    pub fn save_character_slots(&mut self) -> bool {
        let Some(character_id) = self.active_character.as_deref() else {
            debug!("No active character, overlay not saved");
            return false;
        };
        self.characters
            .save_character_slots(character_id, self.store.profile(), self.presets.as_map())
    }

    /// Save and forget the active character
    pub fn release_character(&mut self) {
        if self.active_character.is_some() {
            self.save_character_slots();
        }
        self.active_character = None;
        self.presets.replace(Default::default());
    }

    /// Re-read the profile from the current settings source
    pub fn reload(&mut self) {
        let store = ProfileStore::load(&mut self.settings);
        self.store = store;
        if let Some(character_id) = self.active_character.clone() {
            let presets = self
                .characters
                .load_character_slots(&character_id, self.store.profile_mut());
            self.presets.replace(presets);
        }
        info!("Profile reloaded");
        self.emit(ProfileChangeType::ProfileRefreshed);
    }

    /// Swap the settings source and reload the profile from it
    pub fn replace_settings(&mut self, settings: SettingsStore) {
        self.settings = settings;
        self.reload();
    }
}

fn assign<T: PartialEq>(field: &mut T, value: T) -> bool {
    if *field == value {
        return false;
    }
    *field = value;
    true
}
