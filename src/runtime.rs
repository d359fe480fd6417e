//! Runtime coordinator between the profile service, the live slot grid and
//! the character's equipment
//!
//! Everything runs on the host loop. The host calls [`HotbarRuntime::tick`]
//! once per frame; start-up is deferred until the grid reports ready, and
//! profile change notifications are drained from an mpsc channel on each tick.

use std::sync::mpsc::Receiver;
use tracing::{debug, info, warn};

use crate::profile::{Profile, ProfileChangeType, ProfileChanged};
use crate::service::{GridSnapshot, ProfileService, UpdateOutcome};
use crate::types::{SlotAssignment, SlotKey};
use crate::weapon_context::{self, EquipmentSource};

/// The rendered slot grid owned by the host UI
pub trait LiveGrid {
    /// Grid exists and can be configured
    fn is_ready(&self) -> bool;

    /// Rebuild bars and slots to match `profile` (shape, display options,
    /// bindings); leaves every slot empty
    fn configure(&mut self, profile: &Profile);

    /// Put `assignment` into a slot; false when the item cannot be resolved
    fn apply_assignment(&mut self, key: SlotKey, assignment: &SlotAssignment) -> bool;

    fn clear_slot(&mut self, key: SlotKey);

    fn snapshot(&self) -> GridSnapshot;

    fn set_scale(&mut self, scale: i32);

    /// The user edited a slot since the last `clear_changes`
    fn has_changes(&self) -> bool;

    fn clear_changes(&mut self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RuntimeState {
    #[default]
    Uninitialized,
    Started,
    /// Grid is being rebuilt; user-change saves are ignored
    Configuring,
}

pub struct HotbarRuntime<G, E> {
    service: ProfileService,
    grid: G,
    equipment: E,
    character_id: String,
    state: RuntimeState,
    start_requested: bool,
    equipment_dirty: bool,
    profile_events: Option<Receiver<ProfileChanged>>,
    active_signature: Option<String>,
}

impl<G: LiveGrid, E: EquipmentSource> HotbarRuntime<G, E> {
    pub fn new(
        service: ProfileService,
        grid: G,
        equipment: E,
        character_id: impl Into<String>,
    ) -> Self {
        Self {
            service,
            grid,
            equipment,
            character_id: character_id.into(),
            state: RuntimeState::Uninitialized,
            start_requested: false,
            equipment_dirty: false,
            profile_events: None,
            active_signature: None,
        }
    }

    pub fn state(&self) -> RuntimeState {
        self.state
    }

    pub fn service(&self) -> &ProfileService {
        &self.service
    }

    pub fn service_mut(&mut self) -> &mut ProfileService {
        &mut self.service
    }

    pub fn grid(&self) -> &G {
        &self.grid
    }

    pub fn grid_mut(&mut self) -> &mut G {
        &mut self.grid
    }

    pub fn equipment_mut(&mut self) -> &mut E {
        &mut self.equipment
    }

    /// Ask for start-up on the next tick where the grid is ready
    pub fn request_start(&mut self) {
        if self.state == RuntimeState::Uninitialized {
            self.start_requested = true;
        }
    }

    /// Equipment changed; handled on the next tick
    pub fn notify_equipment_changed(&mut self) {
        self.equipment_dirty = true;
    }

    /// One pass of the host loop
    pub fn tick(&mut self) {
        if self.state == RuntimeState::Uninitialized {
            if !self.start_requested {
                return;
            }
            if !self.grid.is_ready() {
                debug!(character = %self.character_id, "Grid not ready, deferring start");
                return;
            }
            self.start();
        }
        if self.state != RuntimeState::Started {
            return;
        }

        self.service.process_setting_changes();

        let changes: Vec<ProfileChangeType> = match &self.profile_events {
            Some(rx) => rx.try_iter().map(|event| event.change).collect(),
            None => Vec::new(),
        };
        if !changes.is_empty() {
            self.on_profile_changed(&changes);
        }

        if self.equipment_dirty {
            self.equipment_dirty = false;
            self.apply_dynamic_presets(false);
        }

        if self.grid.has_changes() {
            self.handle_grid_changes();
        }
    }

    fn start(&mut self) {
        self.start_requested = false;
        self.state = RuntimeState::Configuring;

        self.service.activate_character(&self.character_id);
        self.configure_grid();
        self.ensure_baseline_presets();

        self.state = RuntimeState::Started;
        self.profile_events = Some(self.service.subscribe());
        self.apply_dynamic_presets(true);

        info!(character = %self.character_id, "Hotbar runtime started");
    }

    /// Save the overlay, unsubscribe and return to `Uninitialized`
    pub fn stop(&mut self) {
        if self.state == RuntimeState::Uninitialized {
            self.start_requested = false;
            return;
        }
        self.service.release_character();
        self.profile_events = None;
        self.active_signature = None;
        self.equipment_dirty = false;
        self.start_requested = false;
        self.state = RuntimeState::Uninitialized;
        info!(character = %self.character_id, "Hotbar runtime stopped");
    }

    /// Rebuild the grid from the profile and push every assignment into it
    fn configure_grid(&mut self) {
        let previous = std::mem::replace(&mut self.state, RuntimeState::Configuring);

        let profile = self.service.profile();
        self.grid.configure(profile);
        let mut unresolved = 0usize;
        for (key, slot) in profile.slots() {
            if slot.has_item() {
                if !self.grid.apply_assignment(key, &slot.assignment()) {
                    unresolved += 1;
                }
            } else {
                self.grid.clear_slot(key);
            }
        }
        if unresolved > 0 {
            warn!(count = unresolved, "Some slot assignments could not be resolved");
        }
        self.grid.clear_changes();

        self.state = previous;
    }

    fn on_profile_changed(&mut self, changes: &[ProfileChangeType]) {
        if changes.iter().all(|change| change.is_cosmetic()) {
            let scale = self.service.profile().scale;
            debug!(scale = scale, "Applying cosmetic profile change");
            self.grid.set_scale(scale);
            return;
        }
        debug!(changes = ?changes, "Reassigning slots after profile change");
        self.configure_grid();
        self.ensure_baseline_presets();
        self.apply_dynamic_presets(true);
    }

    /// Capture the current live content as baseline for every dynamic slot
    /// that has none yet
    fn ensure_baseline_presets(&mut self) {
        let snapshot = self.grid.snapshot();
        let dynamic: Vec<SlotKey> = dynamic_slots(self.service.profile());
        let mut added = false;
        for key in dynamic {
            added |= self
                .service
                .presets_mut()
                .ensure_baseline(key, &snapshot.assignment(key));
        }
        if added {
            self.service.save_character_slots();
        }
    }

    /// Push the presets of the current weapon context into dynamic slots
    ///
    /// Skipped when the context signature is unchanged unless `force`.
    /// Persists once after the whole grid was walked. Returns true if any
    /// slot changed.
    pub fn apply_dynamic_presets(&mut self, force: bool) -> bool {
        let context = weapon_context::resolve(&self.equipment);
        let signature = context.signature();
        if !force && self.active_signature.as_deref() == Some(signature.as_str()) {
            debug!(signature = %signature, "Weapon context unchanged");
            return false;
        }
        self.active_signature = Some(signature);

        let snapshot = self.grid.snapshot();
        let mut applied: Vec<(SlotKey, SlotAssignment)> = Vec::new();
        for key in dynamic_slots(self.service.profile()) {
            let Some(entry) = self.service.presets().resolve(&context.resolve_keys, key) else {
                continue;
            };
            let live = snapshot.assignment(key);
            if entry.is_empty() {
                if !live.is_empty() {
                    self.grid.clear_slot(key);
                    applied.push((key, SlotAssignment::empty()));
                }
            } else if !entry.same_as(&live) {
                let entry = entry.clone();
                if self.grid.apply_assignment(key, &entry) {
                    applied.push((key, entry));
                } else {
                    warn!(bar = key.bar, slot = key.slot, item_id = entry.item_id, "Preset item could not be resolved");
                }
            }
        }

        if applied.is_empty() {
            return false;
        }

        info!(context = %context, slots = applied.len(), "Applied dynamic presets");
        self.service.set_slot_assignments(&applied);
        self.service.save_character_slots();
        self.grid.clear_changes();
        true
    }

    /// The user edited the grid: record presets and persist
    ///
    /// Ignored while configuring, since a half-rebuilt grid is not user data.
    pub fn handle_grid_changes(&mut self) {
        if self.state == RuntimeState::Configuring {
            debug!("Grid changed during configuration, ignoring");
            return;
        }
        if self.state != RuntimeState::Started {
            return;
        }

        let snapshot = self.grid.snapshot();
        match self.service.update(&snapshot) {
            UpdateOutcome::Rejected => {
                self.grid.clear_changes();
                return;
            }
            UpdateOutcome::Applied | UpdateOutcome::Unchanged => {}
        }

        let context = weapon_context::resolve(&self.equipment);
        for key in dynamic_slots(self.service.profile()) {
            self.service
                .presets_mut()
                .record_edit(&context.edit_key, key, &snapshot.assignment(key));
        }

        self.service.save_character_slots();
        self.grid.clear_changes();
        debug!(context = %context.edit_key, "Saved grid edits");
    }
}

fn dynamic_slots(profile: &Profile) -> Vec<SlotKey> {
    profile
        .slots()
        .filter(|(_, slot)| slot.config.is_dynamic)
        .map(|(key, _)| key)
        .collect()
}
