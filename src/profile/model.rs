//! Structural profile data
//!
//! A `Profile` holds every hotbar, its slots and their display configuration.
//! Item fields inside slots are the shared/default assignments; the active
//! character's overlay is layered on top at runtime.

use serde::{Deserialize, Serialize};

use crate::constants::{bindings, defaults};
use crate::types::{EmptySlotDisplay, SlotAssignment, SlotKey};

/// Identifier handed to the input-binding layer for one bindable action
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionBinding {
    pub id: i32,
    pub name: String,
}

impl ActionBinding {
    pub fn new(id: i32, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }

    /// Binding for the slot at `index` (position within its hotbar)
    pub fn for_slot(index: usize) -> Self {
        Self::new(
            bindings::SLOT_ACTION_BASE_ID + index as i32,
            format!("{}{:02}", bindings::SLOT_ACTION_PREFIX, index + 1),
        )
    }

    /// Activation binding for the hotbar at `index`
    pub fn for_hotbar(index: usize) -> Self {
        Self::new(
            bindings::HOTBAR_ACTION_BASE_ID + index as i32,
            format!("{}{}", bindings::HOTBAR_ACTION_PREFIX, index + 1),
        )
    }
}

impl Default for ActionBinding {
    fn default() -> Self {
        Self::for_slot(0)
    }
}

/// Per-slot display and behavior options
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotConfig {
    /// Content follows the equipped weapon context
    #[serde(default)]
    pub is_dynamic: bool,

    /// Global (not per-character) disabled flag
    #[serde(default)]
    pub is_disabled: bool,

    #[serde(default)]
    pub empty_slot_display: EmptySlotDisplay,

    #[serde(default = "default_show_cooldown_time")]
    pub show_cooldown_time: bool,

    #[serde(default)]
    pub precise_cooldown_time: bool,

    #[serde(default)]
    pub binding: ActionBinding,

    /// Display text of the bound key, filled in by the binding layer
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub hotkey_text: String,
}

fn default_show_cooldown_time() -> bool {
    defaults::SHOW_COOLDOWN_TIMER
}

impl Default for SlotConfig {
    fn default() -> Self {
        Self {
            is_dynamic: false,
            is_disabled: false,
            empty_slot_display: EmptySlotDisplay::default(),
            show_cooldown_time: default_show_cooldown_time(),
            precise_cooldown_time: defaults::PRECISE_COOLDOWN_TIME,
            binding: ActionBinding::default(),
            hotkey_text: String::new(),
        }
    }
}

impl SlotConfig {
    /// Copy of this config for a freshly created slot at `slot_index`
    ///
    /// Display options carry over; identity-bound fields (binding, key text)
    /// are regenerated and the disabled/dynamic flags start cleared.
    pub fn template_for(&self, slot_index: usize) -> Self {
        Self {
            is_dynamic: false,
            is_disabled: false,
            empty_slot_display: self.empty_slot_display,
            show_cooldown_time: self.show_cooldown_time,
            precise_cooldown_time: self.precise_cooldown_time,
            binding: ActionBinding::for_slot(slot_index),
            hotkey_text: String::new(),
        }
    }
}

/// One assignable cell
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slot {
    pub slot_index: usize,
    #[serde(default = "default_item_id")]
    pub item_id: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item_uid: Option<String>,
    #[serde(default)]
    pub config: SlotConfig,
}

fn default_item_id() -> i32 {
    -1
}

impl Slot {
    /// Empty slot whose config is cloned from `template`
    pub fn from_template(template: &SlotConfig, slot_index: usize) -> Self {
        Self {
            slot_index,
            item_id: default_item_id(),
            item_uid: None,
            config: template.template_for(slot_index),
        }
    }

    pub fn assignment(&self) -> SlotAssignment {
        SlotAssignment::new(self.item_id, self.item_uid.clone())
    }

    pub fn set_assignment(&mut self, assignment: &SlotAssignment) {
        self.item_id = assignment.item_id;
        self.item_uid = assignment.item_uid.clone();
    }

    pub fn clear_item(&mut self) {
        self.item_id = default_item_id();
        self.item_uid = None;
    }

    pub fn has_item(&self) -> bool {
        !self.assignment().is_empty()
    }
}

/// One row-major bank of slots
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hotbar {
    pub index: usize,
    #[serde(default)]
    pub binding: ActionBinding,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub hotkey_text: String,
    #[serde(default)]
    pub slots: Vec<Slot>,
}

impl Hotbar {
    /// Bar at `index` holding `slot_count` empty slots with default config
    pub fn with_slots(index: usize, slot_count: usize) -> Self {
        let template = SlotConfig::default();
        Self {
            index,
            binding: ActionBinding::for_hotbar(index),
            hotkey_text: String::new(),
            slots: (0..slot_count)
                .map(|i| Slot::from_template(&template, i))
                .collect(),
        }
    }
}

/// Bindings for switching between hotbars
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavBindings {
    pub next: ActionBinding,
    pub prev: ActionBinding,
    pub next_axis: ActionBinding,
    pub prev_axis: ActionBinding,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub next_hotkey_text: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub prev_hotkey_text: String,
}

impl Default for NavBindings {
    fn default() -> Self {
        Self {
            next: ActionBinding::new(
                bindings::NEXT_HOTBAR_ACTION_ID,
                bindings::NEXT_HOTBAR_ACTION_NAME,
            ),
            prev: ActionBinding::new(
                bindings::PREV_HOTBAR_ACTION_ID,
                bindings::PREV_HOTBAR_ACTION_NAME,
            ),
            next_axis: ActionBinding::new(
                bindings::NEXT_HOTBAR_AXIS_ACTION_ID,
                bindings::NEXT_HOTBAR_AXIS_ACTION_NAME,
            ),
            prev_axis: ActionBinding::new(
                bindings::PREV_HOTBAR_AXIS_ACTION_ID,
                bindings::PREV_HOTBAR_AXIS_ACTION_NAME,
            ),
            next_hotkey_text: String::new(),
            prev_hotkey_text: String::new(),
        }
    }
}

/// Structural state of one player's action bars
///
/// Invariant (kept by `structure::ensure_dimensions`): every hotbar holds
/// exactly `rows * slots_per_row` slots and `slots[i].slot_index == i`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    #[serde(default = "default_rows")]
    pub rows: usize,
    #[serde(default = "default_slots_per_row")]
    pub slots_per_row: usize,
    #[serde(default = "default_scale")]
    pub scale: i32,
    #[serde(default)]
    pub hide_left_nav: bool,
    #[serde(default = "default_combat_mode")]
    pub combat_mode: bool,
    #[serde(default)]
    pub nav: NavBindings,
    #[serde(default)]
    pub hotbars: Vec<Hotbar>,
}

fn default_rows() -> usize {
    defaults::ROWS as usize
}

fn default_slots_per_row() -> usize {
    defaults::SLOTS_PER_ROW as usize
}

fn default_scale() -> i32 {
    defaults::SCALE
}

fn default_combat_mode() -> bool {
    defaults::COMBAT_MODE
}

impl Default for Profile {
    fn default() -> Self {
        let rows = default_rows();
        let slots_per_row = default_slots_per_row();
        Self {
            rows,
            slots_per_row,
            scale: default_scale(),
            hide_left_nav: defaults::HIDE_LEFT_NAV,
            combat_mode: default_combat_mode(),
            nav: NavBindings::default(),
            hotbars: (0..defaults::HOTBAR_COUNT)
                .map(|i| Hotbar::with_slots(i, rows * slots_per_row))
                .collect(),
        }
    }
}

impl Profile {
    pub fn slots_per_bar(&self) -> usize {
        self.rows * self.slots_per_row
    }

    pub fn slot(&self, key: SlotKey) -> Option<&Slot> {
        self.hotbars.get(key.bar)?.slots.get(key.slot)
    }

    pub fn slot_mut(&mut self, key: SlotKey) -> Option<&mut Slot> {
        self.hotbars.get_mut(key.bar)?.slots.get_mut(key.slot)
    }

    /// Every slot with its address, bar-major
    pub fn slots(&self) -> impl Iterator<Item = (SlotKey, &Slot)> {
        self.hotbars.iter().enumerate().flat_map(|(b, bar)| {
            bar.slots
                .iter()
                .enumerate()
                .map(move |(s, slot)| (SlotKey::new(b, s), slot))
        })
    }

    pub fn slots_mut(&mut self) -> impl Iterator<Item = (SlotKey, &mut Slot)> {
        self.hotbars.iter_mut().enumerate().flat_map(|(b, bar)| {
            bar.slots
                .iter_mut()
                .enumerate()
                .map(move |(s, slot)| (SlotKey::new(b, s), slot))
        })
    }

    pub fn has_any_item(&self) -> bool {
        self.slots().any(|(_, slot)| slot.has_item())
    }

    /// Addresses of slots flagged disabled, sorted
    pub fn disabled_keys(&self) -> Vec<SlotKey> {
        self.slots()
            .filter(|(_, slot)| slot.config.is_disabled)
            .map(|(key, _)| key)
            .collect()
    }

    /// Config of the first slot, used as the stand-in for per-slot options
    /// that are a single value in the scalar settings
    pub fn lead_slot_config(&self) -> Option<&SlotConfig> {
        self.hotbars.first()?.slots.first().map(|slot| &slot.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_profile_shape() {
        let profile = Profile::default();
        assert_eq!(profile.hotbars.len(), defaults::HOTBAR_COUNT);
        assert_eq!(profile.hotbars[0].slots.len(), profile.slots_per_bar());
        assert_eq!(profile.hotbars[0].binding, ActionBinding::for_hotbar(0));
        for (i, slot) in profile.hotbars[0].slots.iter().enumerate() {
            assert_eq!(slot.slot_index, i);
            assert_eq!(slot.config.binding, ActionBinding::for_slot(i));
            assert!(!slot.has_item());
        }
    }

    #[test]
    fn test_slot_binding_names() {
        assert_eq!(ActionBinding::for_slot(0).name, "ActionSlot_01");
        assert_eq!(ActionBinding::for_slot(10).name, "ActionSlot_11");
        assert_eq!(ActionBinding::for_slot(10).id, bindings::SLOT_ACTION_BASE_ID + 10);
        assert_eq!(ActionBinding::for_hotbar(2).name, "Hotbar_3");
    }

    #[test]
    fn test_template_drops_identity_fields() {
        let source = SlotConfig {
            is_dynamic: true,
            is_disabled: true,
            empty_slot_display: EmptySlotDisplay::Hidden,
            show_cooldown_time: false,
            precise_cooldown_time: true,
            binding: ActionBinding::for_slot(1),
            hotkey_text: "Q".to_string(),
        };
        let copy = source.template_for(7);
        assert_eq!(copy.empty_slot_display, EmptySlotDisplay::Hidden);
        assert!(!copy.show_cooldown_time);
        assert!(copy.precise_cooldown_time);
        assert!(!copy.is_dynamic);
        assert!(!copy.is_disabled);
        assert_eq!(copy.binding, ActionBinding::for_slot(7));
        assert!(copy.hotkey_text.is_empty());
    }

    #[test]
    fn test_missing_fields_default_on_parse() {
        let profile: Profile = serde_json::from_str(r#"{"rows": 2}"#).unwrap();
        assert_eq!(profile.rows, 2);
        assert_eq!(profile.slots_per_row, defaults::SLOTS_PER_ROW as usize);
        assert_eq!(profile.scale, defaults::SCALE);
        assert!(profile.combat_mode);
        assert!(profile.hotbars.is_empty());

        let slot: Slot = serde_json::from_str(r#"{"slot_index": 4}"#).unwrap();
        assert_eq!(slot.item_id, -1);
        assert!(slot.config.show_cooldown_time);
    }

    #[test]
    fn test_slot_lookup_and_items() {
        let mut profile = Profile::default();
        let key = SlotKey::new(0, 3);
        profile
            .slot_mut(key)
            .unwrap()
            .set_assignment(&SlotAssignment::new(42, Some("uid-42".to_string())));

        assert!(profile.has_any_item());
        assert_eq!(profile.slot(key).unwrap().assignment().uid(), "uid-42");
        assert!(profile.slot(SlotKey::new(5, 0)).is_none());

        profile.slot_mut(key).unwrap().clear_item();
        assert!(!profile.has_any_item());
    }
}
