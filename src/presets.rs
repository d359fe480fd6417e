//! Dynamic presets: per weapon context slot assignments
//!
//! Only slots flagged dynamic consult this store. A stored empty assignment
//! ("explicit empty") is an override that clears the slot; a missing entry
//! means "no override, keep falling back".

use std::collections::BTreeMap;
use tracing::debug;

use crate::constants::context::BASELINE_KEY;
use crate::profile::structure::Layout;
use crate::types::{SlotAssignment, SlotKey};

/// `context key -> slot -> assignment`
pub type PresetMap = BTreeMap<String, BTreeMap<SlotKey, SlotAssignment>>;

/// Move every entry of `presets` from `from` positions to `to` positions,
/// dropping entries whose slot no longer exists; true if anything moved
pub fn remap_presets(presets: &mut PresetMap, from: Layout, to: Layout) -> bool {
    let mut changed = false;
    for bucket in presets.values_mut() {
        let remapped: BTreeMap<SlotKey, SlotAssignment> = std::mem::take(bucket)
            .into_iter()
            .filter_map(|(key, assignment)| {
                let moved = from.remap(key, to);
                changed |= moved != Some(key);
                moved.map(|key| (key, assignment))
            })
            .collect();
        *bucket = remapped;
    }
    presets.retain(|_, bucket| !bucket.is_empty());
    changed
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DynamicPresetStore {
    presets: PresetMap,
}

impl DynamicPresetStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_map(presets: PresetMap) -> Self {
        Self { presets }
    }

    pub fn as_map(&self) -> &PresetMap {
        &self.presets
    }

    /// Follow a grid resize; see [`remap_presets`]
    pub fn remap(&mut self, from: Layout, to: Layout) -> bool {
        remap_presets(&mut self.presets, from, to)
    }

    /// Swap in another character's presets
    pub fn replace(&mut self, presets: PresetMap) {
        self.presets = presets;
    }

    pub fn is_empty(&self) -> bool {
        self.presets.values().all(BTreeMap::is_empty)
    }

    pub fn try_get(&self, context_key: &str, key: SlotKey) -> Option<&SlotAssignment> {
        self.presets.get(context_key)?.get(&key)
    }

    /// Store an assignment; true if the stored value changed
    pub fn set(&mut self, context_key: &str, key: SlotKey, assignment: SlotAssignment) -> bool {
        let bucket = self.presets.entry(context_key.to_string()).or_default();
        if bucket.get(&key) == Some(&assignment) {
            return false;
        }
        debug!(context = %context_key, bar = key.bar, slot = key.slot, item_id = assignment.item_id, "Stored dynamic preset");
        bucket.insert(key, assignment);
        true
    }

    /// Drop an entry so lookups fall through to the next key; true if one existed
    pub fn remove(&mut self, context_key: &str, key: SlotKey) -> bool {
        let Some(bucket) = self.presets.get_mut(context_key) else {
            return false;
        };
        let removed = bucket.remove(&key).is_some();
        if bucket.is_empty() {
            self.presets.remove(context_key);
        }
        if removed {
            debug!(context = %context_key, bar = key.bar, slot = key.slot, "Removed dynamic preset");
        }
        removed
    }

    /// Capture `live` as the baseline for `key` unless one already exists
    pub fn ensure_baseline(&mut self, key: SlotKey, live: &SlotAssignment) -> bool {
        if self.try_get(BASELINE_KEY, key).is_some() {
            return false;
        }
        let entry = if live.is_empty() {
            SlotAssignment::empty()
        } else {
            live.clone()
        };
        self.set(BASELINE_KEY, key, entry)
    }

    /// First stored entry along `resolve_keys` (explicit empties count)
    pub fn resolve(&self, resolve_keys: &[String], key: SlotKey) -> Option<&SlotAssignment> {
        resolve_keys
            .iter()
            .find_map(|context_key| self.try_get(context_key, key))
    }

    /// Record a manual edit of a dynamic slot under `edit_key`
    ///
    /// Empty under baseline is stored as explicit empty; empty under any
    /// other key removes the entry so the slot falls back again.
    pub fn record_edit(&mut self, edit_key: &str, key: SlotKey, live: &SlotAssignment) -> bool {
        if !live.is_empty() {
            return self.set(edit_key, key, live.clone());
        }
        if edit_key == BASELINE_KEY {
            self.set(edit_key, key, SlotAssignment::empty())
        } else {
            self.remove(edit_key, key)
        }
    }
}
