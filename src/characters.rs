//! Per-character slot overlays
//!
//! Each character gets one JSON file holding only its item assignments (and
//! its dynamic presets). Overlays are layered on top of the shared profile when
//! the character becomes active. Disabled state is global and never comes
//! from an overlay.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

use crate::config::settings::app_dir;
use crate::constants::{config, paths};
use crate::presets::{PresetMap, remap_presets};
use crate::profile::Profile;
use crate::profile::structure::Layout;
use crate::types::{SlotAssignment, SlotKey};

/// Document stored per character
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CharacterSlotData {
    pub character_id: String,

    /// Non-empty assignments keyed by `"bar_slot"`
    #[serde(default, deserialize_with = "deserialize_slots")]
    pub slots: BTreeMap<SlotKey, SlotAssignment>,

    /// Superseded per-character disabled list; read so old files still
    /// parse, never applied and never written back
    #[serde(default, skip_serializing)]
    pub disabled_slots: BTreeSet<String>,

    #[serde(
        default,
        deserialize_with = "deserialize_presets",
        skip_serializing_if = "BTreeMap::is_empty"
    )]
    pub dynamic_presets: PresetMap,
}

/// Slot map that skips entries with a malformed key or value instead of
/// rejecting the whole overlay
fn deserialize_slots<'de, D>(deserializer: D) -> Result<BTreeMap<SlotKey, SlotAssignment>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = BTreeMap::<String, serde_json::Value>::deserialize(deserializer)?;
    Ok(parse_slot_entries(raw))
}

fn deserialize_presets<'de, D>(deserializer: D) -> Result<PresetMap, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = BTreeMap::<String, BTreeMap<String, serde_json::Value>>::deserialize(deserializer)?;
    Ok(raw
        .into_iter()
        .map(|(context_key, entries)| (context_key, parse_slot_entries(entries)))
        .filter(|(_, bucket)| !bucket.is_empty())
        .collect())
}

fn parse_slot_entries(
    raw: BTreeMap<String, serde_json::Value>,
) -> BTreeMap<SlotKey, SlotAssignment> {
    raw.into_iter()
        .filter_map(|(key, value)| {
            let Ok(slot_key) = key.parse::<SlotKey>() else {
                warn!(key = %key, "Skipping overlay entry with malformed slot key");
                return None;
            };
            match serde_json::from_value::<SlotAssignment>(value) {
                Ok(assignment) => Some((slot_key, assignment)),
                Err(e) => {
                    warn!(key = %key, error = %e, "Skipping malformed overlay entry");
                    None
                }
            }
        })
        .collect()
}

/// Move `data` to the `to` slot positions; true if anything moved
fn remap_document(data: &mut CharacterSlotData, from: Layout, to: Layout) -> bool {
    let mut changed = false;
    let slots = std::mem::take(&mut data.slots);
    data.slots = slots
        .into_iter()
        .filter_map(|(key, assignment)| {
            let moved = from.remap(key, to);
            changed |= moved != Some(key);
            moved.map(|key| (key, assignment))
        })
        .collect();
    changed |= remap_presets(&mut data.dynamic_presets, from, to);
    changed
}

#[derive(Debug)]
enum Backing {
    Dir(PathBuf),
    Memory(BTreeMap<String, CharacterSlotData>),
}

#[derive(Debug)]
pub struct CharacterSlotStore {
    backing: Backing,
}

/// File stem for `character_id` with path-unsafe characters replaced
pub fn sanitize_character_id(character_id: &str) -> String {
    character_id
        .chars()
        .map(|c| {
            if paths::UNSAFE_FILENAME_CHARS.contains(&c) {
                paths::FILENAME_REPLACEMENT
            } else {
                c
            }
        })
        .collect()
}

impl CharacterSlotStore {
    pub fn default_dir() -> PathBuf {
        app_dir().join(config::CHARACTER_SLOTS_DIR)
    }

    /// Store under the default config directory
    pub fn open() -> Self {
        Self::at(Self::default_dir())
    }

    pub fn at(dir: impl Into<PathBuf>) -> Self {
        Self {
            backing: Backing::Dir(dir.into()),
        }
    }

    pub fn in_memory() -> Self {
        Self {
            backing: Backing::Memory(BTreeMap::new()),
        }
    }

    pub fn file_path(&self, character_id: &str) -> Option<PathBuf> {
        match &self.backing {
            Backing::Dir(dir) => Some(dir.join(format!(
                "{}.{}",
                sanitize_character_id(character_id),
                config::CHARACTER_FILE_EXT
            ))),
            Backing::Memory(_) => None,
        }
    }

    /// Stored overlay for `character_id`, `None` when there is none
    pub fn read(&self, character_id: &str) -> Result<Option<CharacterSlotData>> {
        match &self.backing {
            Backing::Memory(documents) => {
                Ok(documents.get(&sanitize_character_id(character_id)).cloned())
            }
            Backing::Dir(_) => {
                let Some(path) = self.file_path(character_id) else {
                    return Ok(None);
                };
                if !path.exists() {
                    return Ok(None);
                }
                read_document(&path).map(Some)
            }
        }
    }

    fn write(&mut self, data: &CharacterSlotData) -> Result<()> {
        let stem = sanitize_character_id(&data.character_id);
        match &mut self.backing {
            Backing::Memory(documents) => {
                documents.insert(stem, data.clone());
                Ok(())
            }
            Backing::Dir(dir) => {
                fs::create_dir_all(&*dir)
                    .with_context(|| format!("Failed to create overlay directory {:?}", dir))?;
                let path = dir.join(format!("{}.{}", stem, config::CHARACTER_FILE_EXT));
                write_document(&path, data)
            }
        }
    }

    /// Carry every stored overlay across a grid resize from `from` to `to`
    ///
    /// Slots keep their row and column; entries whose row, column or bar was
    /// removed are dropped. Returns the number of overlays rewritten.
    pub fn rekey_overlays(&mut self, from: Layout, to: Layout) -> usize {
        if from == to {
            return 0;
        }
        let rewritten = match &mut self.backing {
            Backing::Memory(documents) => documents
                .values_mut()
                .map(|data| remap_document(data, from, to))
                .filter(|moved| *moved)
                .count(),
            Backing::Dir(dir) => rekey_dir(dir, from, to),
        };
        if rewritten > 0 {
            info!(overlays = rewritten, rows = to.rows, slots_per_row = to.slots_per_row, hotbars = to.hotbars, "Re-keyed character overlays");
        }
        rewritten
    }

    /// Layer the overlay for `character_id` onto `profile`
    ///
    /// Every slot ends up either holding the stored assignment or cleared, so
    /// nothing from a previously active character survives. Disabled flags
    /// are left untouched. Returns the character's stored dynamic presets.
    pub fn load_character_slots(&self, character_id: &str, profile: &mut Profile) -> PresetMap {
        let data = match self.read(character_id) {
            Ok(data) => data,
            Err(e) => {
                error!(character = %character_id, error = ?e, "Failed to read character overlay, clearing slots");
                None
            }
        };

        let Some(data) = data else {
            info!(character = %character_id, "No overlay for character, clearing slots");
            for (_, slot) in profile.slots_mut() {
                slot.clear_item();
            }
            return PresetMap::new();
        };

        if !data.disabled_slots.is_empty() {
            debug!(
                character = %character_id,
                count = data.disabled_slots.len(),
                "Ignoring per-character disabled slots"
            );
        }

        let mut applied = 0usize;
        for (key, slot) in profile.slots_mut() {
            match data.slots.get(&key) {
                Some(assignment) => {
                    slot.set_assignment(assignment);
                    applied += 1;
                }
                None => slot.clear_item(),
            }
        }

        info!(character = %character_id, applied = applied, "Loaded character overlay");
        data.dynamic_presets
    }

    /// Write every non-empty slot of `profile` (plus `presets`) as the overlay
    /// for `character_id`; true on success
    pub fn save_character_slots(
        &mut self,
        character_id: &str,
        profile: &Profile,
        presets: &PresetMap,
    ) -> bool {
        if character_id.trim().is_empty() {
            warn!("Refusing to save overlay for empty character id");
            return false;
        }

        let slots: BTreeMap<SlotKey, SlotAssignment> = profile
            .slots()
            .filter(|(_, slot)| slot.has_item())
            .map(|(key, slot)| (key, slot.assignment()))
            .collect();

        let data = CharacterSlotData {
            character_id: character_id.to_string(),
            slots,
            disabled_slots: BTreeSet::new(),
            dynamic_presets: presets.clone(),
        };

        match self.write(&data) {
            Ok(()) => {
                debug!(character = %character_id, slots = data.slots.len(), "Saved character overlay");
                true
            }
            Err(e) => {
                error!(character = %character_id, error = ?e, "Failed to save character overlay");
                false
            }
        }
    }
}

fn rekey_dir(dir: &Path, from: Layout, to: Layout) -> usize {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return 0,
        Err(e) => {
            error!(dir = ?dir, error = ?e, "Failed to list character overlays");
            return 0;
        }
    };

    let mut rewritten = 0;
    for entry in entries.flatten() {
        let path = entry.path();
        if path.extension().and_then(|ext| ext.to_str()) != Some(config::CHARACTER_FILE_EXT) {
            continue;
        }
        let mut data = match read_document(&path) {
            Ok(data) => data,
            Err(e) => {
                warn!(path = ?path, error = ?e, "Skipping unreadable overlay");
                continue;
            }
        };
        if !remap_document(&mut data, from, to) {
            continue;
        }
        match write_document(&path, &data) {
            Ok(()) => rewritten += 1,
            Err(e) => error!(path = ?path, error = ?e, "Failed to rewrite overlay"),
        }
    }
    rewritten
}

fn write_document(path: &Path, data: &CharacterSlotData) -> Result<()> {
    let json =
        serde_json::to_string_pretty(data).context("Failed to serialize character overlay")?;
    fs::write(path, json)
        .with_context(|| format!("Failed to write character overlay to {:?}", path))
}

fn read_document(path: &Path) -> Result<CharacterSlotData> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read character overlay from {:?}", path))?;
    serde_json::from_str(&contents)
        .with_context(|| format!("Failed to parse character overlay JSON from {:?}", path))
}
