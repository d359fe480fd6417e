//! Dimension enforcement for profiles
//!
//! Every mutation that can change the grid shape funnels through
//! [`ensure_dimensions`], which grows/shrinks rows and columns one step at a
//! time and finishes by reindexing slots and rebinding them to the binding
//! identifier matching their position.

use tracing::{debug, warn};

use crate::constants::validation::{
    MAX_HOTBARS, MAX_ROWS, MAX_SLOTS_PER_ROW, MIN_ROWS, MIN_SLOTS_PER_ROW,
};
use crate::profile::model::{ActionBinding, Hotbar, Profile, Slot, SlotConfig};
use crate::types::SlotKey;

/// Grid shape shared by every hotbar
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Layout {
    pub hotbars: usize,
    pub rows: usize,
    pub slots_per_row: usize,
}

impl Layout {
    pub fn of(profile: &Profile) -> Self {
        Self {
            hotbars: profile.hotbars.len(),
            rows: profile.rows,
            slots_per_row: profile.slots_per_row,
        }
    }

    /// Where `key` lands after resizing to `to`
    ///
    /// Rows and columns keep their position; `None` when the bar, row or
    /// column holding `key` no longer exists (or never did).
    pub fn remap(self, key: SlotKey, to: Layout) -> Option<SlotKey> {
        if self.slots_per_row == 0 || key.bar >= self.hotbars || key.bar >= to.hotbars {
            return None;
        }
        let (row, column) = (key.slot / self.slots_per_row, key.slot % self.slots_per_row);
        if row >= self.rows || row >= to.rows || column >= to.slots_per_row {
            return None;
        }
        Some(SlotKey::new(key.bar, row * to.slots_per_row + column))
    }
}

pub fn clamp_rows(rows: usize) -> usize {
    rows.clamp(MIN_ROWS as usize, MAX_ROWS as usize)
}

pub fn clamp_slots_per_row(slots_per_row: usize) -> usize {
    slots_per_row.clamp(MIN_SLOTS_PER_ROW as usize, MAX_SLOTS_PER_ROW as usize)
}

/// Resize `profile` to `rows` x `slots_per_row` (clamped to the valid range)
///
/// Returns true if anything in the profile changed. A second call with the
/// same target is always a no-op.
pub fn ensure_dimensions(profile: &mut Profile, rows: usize, slots_per_row: usize) -> bool {
    let target_rows = clamp_rows(rows);
    let target_slots = clamp_slots_per_row(slots_per_row);
    if target_rows != rows || target_slots != slots_per_row {
        warn!(
            rows = rows,
            slots_per_row = slots_per_row,
            clamped_rows = target_rows,
            clamped_slots_per_row = target_slots,
            "Requested dimensions out of range, clamping"
        );
    }

    let mut changed = repair(profile);

    if profile.rows != target_rows || profile.slots_per_row != target_slots {
        debug!(
            from_rows = profile.rows,
            from_slots_per_row = profile.slots_per_row,
            to_rows = target_rows,
            to_slots_per_row = target_slots,
            "Resizing hotbars"
        );
        changed = true;
    }

    while profile.rows < target_rows {
        push_row(profile);
    }
    while profile.rows > target_rows {
        pop_row(profile);
    }
    while profile.slots_per_row < target_slots {
        push_column(profile);
    }
    while profile.slots_per_row > target_slots {
        pop_column(profile);
    }

    changed |= reindex(profile);
    changed
}

/// Bring a possibly inconsistent profile (hand-edited or truncated blob) back
/// to a shape the row/column steps can operate on
fn repair(profile: &mut Profile) -> bool {
    let mut changed = false;

    let rows = clamp_rows(profile.rows);
    let slots_per_row = clamp_slots_per_row(profile.slots_per_row);
    if rows != profile.rows || slots_per_row != profile.slots_per_row {
        warn!(
            rows = profile.rows,
            slots_per_row = profile.slots_per_row,
            "Stored dimensions out of range, clamping"
        );
        profile.rows = rows;
        profile.slots_per_row = slots_per_row;
        changed = true;
    }

    if profile.hotbars.is_empty() {
        warn!("Profile has no hotbars, seeding one");
        profile.hotbars.push(Hotbar::with_slots(0, 0));
        changed = true;
    }
    if profile.hotbars.len() > MAX_HOTBARS {
        warn!(count = profile.hotbars.len(), max = MAX_HOTBARS, "Too many hotbars, truncating");
        profile.hotbars.truncate(MAX_HOTBARS);
        changed = true;
    }

    let required = profile.slots_per_bar();
    for bar in &mut profile.hotbars {
        let count = bar.slots.len();
        if count == required {
            continue;
        }
        warn!(bar = bar.index, count = count, required = required, "Hotbar slot count mismatch, repairing");
        if count > required {
            bar.slots.truncate(required);
        } else {
            let template = bar
                .slots
                .last()
                .map(|slot| slot.config.clone())
                .unwrap_or_default();
            for index in count..required {
                bar.slots.push(Slot::from_template(&template, index));
            }
        }
        changed = true;
    }

    changed
}

/// Append one row to every hotbar, cloning configs from the row above
fn push_row(profile: &mut Profile) {
    let slots_per_row = profile.slots_per_row;
    let first_new = profile.rows * slots_per_row;
    for bar in &mut profile.hotbars {
        for index in first_new..first_new + slots_per_row {
            let template = bar.slots[index - slots_per_row].config.clone();
            bar.slots.push(Slot::from_template(&template, index));
        }
    }
    profile.rows += 1;
}

/// Drop the trailing row of every hotbar
fn pop_row(profile: &mut Profile) {
    profile.rows -= 1;
    let keep = profile.slots_per_bar();
    for bar in &mut profile.hotbars {
        bar.slots.truncate(keep);
    }
}

/// Add one slot to the end of every row, rebuilding row by row so existing
/// slots keep their row and column
fn push_column(profile: &mut Profile) {
    let slots_per_row = profile.slots_per_row;
    for bar in &mut profile.hotbars {
        let old = std::mem::take(&mut bar.slots);
        let mut rebuilt = Vec::with_capacity(profile.rows * (slots_per_row + 1));
        for row in old.chunks(slots_per_row) {
            rebuilt.extend(row.iter().cloned());
            let template = row
                .last()
                .map(|slot| slot.config.clone())
                .unwrap_or_else(SlotConfig::default);
            rebuilt.push(Slot::from_template(&template, rebuilt.len()));
        }
        bar.slots = rebuilt;
    }
    profile.slots_per_row += 1;
}

/// Remove the last slot of every row
fn pop_column(profile: &mut Profile) {
    let slots_per_row = profile.slots_per_row;
    for bar in &mut profile.hotbars {
        for row in (1..=profile.rows).rev() {
            bar.slots.remove(row * slots_per_row - 1);
        }
    }
    profile.slots_per_row -= 1;
}

/// `slot_index = position` and binding for that position, for bars and slots
fn reindex(profile: &mut Profile) -> bool {
    let mut changed = false;
    for (bar_position, bar) in profile.hotbars.iter_mut().enumerate() {
        if bar.index != bar_position {
            bar.index = bar_position;
            changed = true;
        }
        let bar_binding = ActionBinding::for_hotbar(bar_position);
        if bar.binding != bar_binding {
            bar.binding = bar_binding;
            changed = true;
        }
        for (position, slot) in bar.slots.iter_mut().enumerate() {
            if slot.slot_index != position {
                slot.slot_index = position;
                changed = true;
            }
            let binding = ActionBinding::for_slot(position);
            if slot.config.binding != binding {
                slot.config.binding = binding;
                slot.config.hotkey_text.clear();
                changed = true;
            }
        }
    }
    changed
}

pub fn add_row(profile: &mut Profile) -> bool {
    if profile.rows >= MAX_ROWS as usize {
        debug!(rows = profile.rows, "Already at maximum rows");
        return false;
    }
    let (rows, slots_per_row) = (profile.rows + 1, profile.slots_per_row);
    ensure_dimensions(profile, rows, slots_per_row)
}

pub fn remove_row(profile: &mut Profile) -> bool {
    if profile.rows <= MIN_ROWS as usize {
        debug!(rows = profile.rows, "Already at minimum rows");
        return false;
    }
    let (rows, slots_per_row) = (profile.rows - 1, profile.slots_per_row);
    ensure_dimensions(profile, rows, slots_per_row)
}

pub fn add_slot(profile: &mut Profile) -> bool {
    if profile.slots_per_row >= MAX_SLOTS_PER_ROW as usize {
        debug!(slots_per_row = profile.slots_per_row, "Already at maximum slots per row");
        return false;
    }
    let (rows, slots_per_row) = (profile.rows, profile.slots_per_row + 1);
    ensure_dimensions(profile, rows, slots_per_row)
}

pub fn remove_slot(profile: &mut Profile) -> bool {
    if profile.slots_per_row <= MIN_SLOTS_PER_ROW as usize {
        debug!(slots_per_row = profile.slots_per_row, "Already at minimum slots per row");
        return false;
    }
    let (rows, slots_per_row) = (profile.rows, profile.slots_per_row - 1);
    ensure_dimensions(profile, rows, slots_per_row)
}

/// Append a hotbar whose slots copy the first bar's display options, empty
pub fn add_hotbar(profile: &mut Profile) -> bool {
    if profile.hotbars.len() >= MAX_HOTBARS {
        debug!(count = profile.hotbars.len(), "Already at maximum hotbars");
        return false;
    }
    let index = profile.hotbars.last().map(|bar| bar.index + 1).unwrap_or(0);
    let slots = match profile.hotbars.first() {
        Some(first) => first
            .slots
            .iter()
            .map(|slot| Slot::from_template(&slot.config, slot.slot_index))
            .collect(),
        None => Hotbar::with_slots(index, profile.slots_per_bar()).slots,
    };
    debug!(bar = index, "Adding hotbar");
    profile.hotbars.push(Hotbar {
        index,
        binding: ActionBinding::for_hotbar(index),
        hotkey_text: String::new(),
        slots,
    });
    let (rows, slots_per_row) = (profile.rows, profile.slots_per_row);
    ensure_dimensions(profile, rows, slots_per_row);
    true
}

/// Drop the last hotbar; at least one always remains
pub fn remove_hotbar(profile: &mut Profile) -> bool {
    if profile.hotbars.len() <= 1 {
        debug!("Cannot remove the only hotbar");
        return false;
    }
    profile.hotbars.pop();
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{EmptySlotDisplay, SlotAssignment};

    fn profile(rows: usize, slots_per_row: usize, bars: usize) -> Profile {
        let mut profile = Profile {
            rows,
            slots_per_row,
            hotbars: (0..bars).map(|i| Hotbar::with_slots(i, rows * slots_per_row)).collect(),
            ..Profile::default()
        };
        ensure_dimensions(&mut profile, rows, slots_per_row);
        profile
    }

    fn assert_shape(profile: &Profile) {
        for bar in &profile.hotbars {
            assert_eq!(bar.slots.len(), profile.rows * profile.slots_per_row);
            for (i, slot) in bar.slots.iter().enumerate() {
                assert_eq!(slot.slot_index, i);
                assert_eq!(slot.config.binding, ActionBinding::for_slot(i));
            }
        }
    }

    #[test]
    fn test_add_row_then_remove_slot_scenario() {
        let mut p = profile(1, 3, 2);
        for bar in &mut p.hotbars {
            bar.slots[1].config.empty_slot_display = EmptySlotDisplay::Image;
            bar.slots[2].config.show_cooldown_time = false;
            bar.slots[0].set_assignment(&SlotAssignment::new(11, None));
        }

        assert!(add_row(&mut p));
        assert_eq!(p.rows, 2);
        assert_shape(&p);
        for bar in &p.hotbars {
            assert_eq!(bar.slots.len(), 6);
            assert_eq!(bar.slots[4].config.empty_slot_display, EmptySlotDisplay::Image);
            assert!(!bar.slots[5].config.show_cooldown_time);
            for slot in &bar.slots[3..] {
                assert!(!slot.has_item());
            }
            assert_eq!(bar.slots[0].item_id, 11);
        }

        assert!(remove_slot(&mut p));
        assert_eq!(p.slots_per_row, 2);
        assert_shape(&p);
        for bar in &p.hotbars {
            assert_eq!(bar.slots.len(), 4);
            // row 0 keeps slots 0,1; row 1 keeps old 3,4
            assert_eq!(bar.slots[0].item_id, 11);
            assert_eq!(bar.slots[1].config.empty_slot_display, EmptySlotDisplay::Image);
            assert_eq!(bar.slots[3].config.empty_slot_display, EmptySlotDisplay::Image);
        }
    }

    #[test]
    fn test_dimension_invariant_over_operation_sequence() {
        let mut p = profile(1, 4, 3);
        let ops: [fn(&mut Profile) -> bool; 6] =
            [add_row, add_slot, remove_row, remove_slot, add_hotbar, remove_hotbar];
        for step in 0..60 {
            ops[(step * 7 + step / 3) % ops.len()](&mut p);
            assert_shape(&p);
            assert!(p.rows >= 1 && p.rows <= MAX_ROWS as usize);
            assert!(p.slots_per_row >= 1 && p.slots_per_row <= MAX_SLOTS_PER_ROW as usize);
            assert!(!p.hotbars.is_empty());
        }
    }

    #[test]
    fn test_ensure_dimensions_is_idempotent() {
        let mut p = profile(2, 5, 2);
        ensure_dimensions(&mut p, 3, 7);
        let first = serde_json::to_string(&p).unwrap();
        assert!(!ensure_dimensions(&mut p, 3, 7));
        let second = serde_json::to_string(&p).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_add_column_keeps_row_identity() {
        let mut p = profile(2, 3, 1);
        // mark the first slot of row 1
        p.slot_mut(SlotKey::new(0, 3))
            .unwrap()
            .set_assignment(&SlotAssignment::new(99, None));

        assert!(add_slot(&mut p));
        // row 1 now starts at index 4
        assert_eq!(p.slot(SlotKey::new(0, 4)).unwrap().item_id, 99);
        assert!(!p.slot(SlotKey::new(0, 3)).unwrap().has_item());
        assert_shape(&p);
    }

    #[test]
    fn test_out_of_range_targets_clamp() {
        let mut p = profile(1, 3, 1);
        ensure_dimensions(&mut p, 0, 50);
        assert_eq!(p.rows, 1);
        assert_eq!(p.slots_per_row, MAX_SLOTS_PER_ROW as usize);
        assert_shape(&p);

        assert!(!remove_row(&mut p));
        assert!(!add_slot(&mut p));
    }

    #[test]
    fn test_repair_of_inconsistent_profile() {
        let mut p = profile(2, 3, 2);
        p.hotbars[0].slots.truncate(4);
        p.hotbars[1].slots.push(Slot::from_template(&SlotConfig::default(), 99));
        p.hotbars[1].index = 7;

        assert!(ensure_dimensions(&mut p, 2, 3));
        assert_shape(&p);
        assert_eq!(p.hotbars[1].index, 1);
    }

    #[test]
    fn test_add_and_remove_hotbar() {
        let mut p = profile(1, 3, 1);
        p.hotbars[0].slots[0].set_assignment(&SlotAssignment::new(5, None));
        p.hotbars[0].slots[2].config.empty_slot_display = EmptySlotDisplay::Hidden;

        assert!(add_hotbar(&mut p));
        assert_eq!(p.hotbars.len(), 2);
        assert_eq!(p.hotbars[1].index, 1);
        assert_eq!(p.hotbars[1].binding, ActionBinding::for_hotbar(1));
        assert!(!p.hotbars[1].slots[0].has_item());
        assert_eq!(p.hotbars[1].slots[2].config.empty_slot_display, EmptySlotDisplay::Hidden);

        assert!(remove_hotbar(&mut p));
        assert!(!remove_hotbar(&mut p));
        assert_eq!(p.hotbars.len(), 1);
    }

    #[test]
    fn test_hotbar_count_is_bounded() {
        let mut p = profile(1, 2, 1);
        while add_hotbar(&mut p) {}
        assert_eq!(p.hotbars.len(), MAX_HOTBARS);
    }

    #[test]
    fn test_layout_remap_follows_row_and_column() {
        let from = Layout { hotbars: 2, rows: 2, slots_per_row: 3 };
        let wider = Layout { slots_per_row: 4, ..from };
        assert_eq!(from.remap(SlotKey::new(0, 3), wider), Some(SlotKey::new(0, 4)));
        assert_eq!(from.remap(SlotKey::new(1, 5), wider), Some(SlotKey::new(1, 6)));

        let narrower = Layout { slots_per_row: 2, ..from };
        assert_eq!(from.remap(SlotKey::new(0, 2), narrower), None);
        assert_eq!(from.remap(SlotKey::new(0, 4), narrower), Some(SlotKey::new(0, 3)));

        let fewer = Layout { hotbars: 1, rows: 1, ..from };
        assert_eq!(from.remap(SlotKey::new(1, 0), fewer), None);
        assert_eq!(from.remap(SlotKey::new(0, 3), fewer), None);
        assert_eq!(from.remap(SlotKey::new(0, 9), wider), None);
    }

    #[test]
    fn test_layout_remap_agrees_with_add_slot() {
        let mut p = profile(2, 3, 1);
        p.hotbars[0].slots[3].set_assignment(&SlotAssignment::new(77, None));
        let before = Layout::of(&p);
        assert!(add_slot(&mut p));

        let moved = before.remap(SlotKey::new(0, 3), Layout::of(&p)).unwrap();
        assert_eq!(moved, SlotKey::new(0, 4));
        assert_eq!(p.slot(moved).unwrap().item_id, 77);
    }
}
