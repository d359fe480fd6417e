//! Weapon context resolution
//!
//! Turns what a character currently holds in each hand into a context key
//! plus the ordered fallback chain used when looking up dynamic presets.

use anyhow::Result;
use std::fmt;
use tracing::{debug, warn};

use crate::constants::context::{
    BASELINE_KEY, COMBO_PREFIX, MAIN_PREFIX, NO_WEAPON_TYPE, OFF_PREFIX,
    OFFHAND_NON_WEAPON_OFFSET,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EquipmentKind {
    Weapon { weapon_type: i32 },
    /// Shields, lanterns and other non-weapon hand items
    Other { item_id: i32 },
}

/// One equipped item as reported by the host
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EquippedItem {
    /// Identity of this particular instance; two references to the same
    /// item share it
    pub instance_id: String,
    pub kind: EquipmentKind,
}

impl EquippedItem {
    pub fn weapon(instance_id: impl Into<String>, weapon_type: i32) -> Self {
        Self {
            instance_id: instance_id.into(),
            kind: EquipmentKind::Weapon { weapon_type },
        }
    }

    pub fn other(instance_id: impl Into<String>, item_id: i32) -> Self {
        Self {
            instance_id: instance_id.into(),
            kind: EquipmentKind::Other { item_id },
        }
    }

    fn same_instance(&self, other: &EquippedItem) -> bool {
        self.instance_id == other.instance_id
    }
}

/// Read access to a character's hands
///
/// Any accessor may fail; failures are treated as "nothing equipped".
pub trait EquipmentSource {
    fn main_hand(&self) -> Result<Option<EquippedItem>>;
    fn off_hand(&self) -> Result<Option<EquippedItem>>;
    /// Unified "wielded weapon" reference, used when no distinct main hand exists
    fn current_weapon(&self) -> Result<Option<EquippedItem>>;
}

pub fn combo_key(main_type: i32, off_type: i32) -> String {
    format!("{COMBO_PREFIX}{main_type}|{off_type}")
}

pub fn main_key(main_type: i32) -> String {
    format!("{MAIN_PREFIX}{main_type}")
}

pub fn off_key(off_type: i32) -> String {
    format!("{OFF_PREFIX}{off_type}")
}

pub fn baseline_key() -> String {
    BASELINE_KEY.to_string()
}

/// Resolved context for one moment in time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeaponContext {
    pub main_type: i32,
    pub off_type: i32,
    /// Lookup order for reads; always ends with the baseline key
    pub resolve_keys: Vec<String>,
    /// Most specific applicable key, used for writes
    pub edit_key: String,
}

impl WeaponContext {
    pub fn from_types(main_type: i32, off_type: i32) -> Self {
        let has_main = main_type != NO_WEAPON_TYPE;
        let has_off = off_type != NO_WEAPON_TYPE;

        let mut resolve_keys = Vec::with_capacity(4);
        if has_main && has_off {
            resolve_keys.push(combo_key(main_type, off_type));
        }
        if has_main {
            resolve_keys.push(main_key(main_type));
        }
        if has_off {
            resolve_keys.push(off_key(off_type));
        }
        resolve_keys.push(baseline_key());
        resolve_keys.dedup();

        // first key is always the most specific one present
        let edit_key = resolve_keys[0].clone();

        Self {
            main_type,
            off_type,
            resolve_keys,
            edit_key,
        }
    }

    pub fn baseline() -> Self {
        Self::from_types(NO_WEAPON_TYPE, NO_WEAPON_TYPE)
    }

    /// Cheap "did anything change" token
    pub fn signature(&self) -> String {
        format!("{}|{}", self.main_type, self.off_type)
    }

    pub fn is_baseline_edit(&self) -> bool {
        self.edit_key == BASELINE_KEY
    }
}

impl fmt::Display for WeaponContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> [{}]", self.edit_key, self.resolve_keys.join(", "))
    }
}

fn main_context_type(item: &EquippedItem) -> i32 {
    match item.kind {
        EquipmentKind::Weapon { weapon_type } => weapon_type,
        EquipmentKind::Other { item_id } if item_id > 0 => item_id,
        EquipmentKind::Other { .. } => NO_WEAPON_TYPE,
    }
}

/// Off-hand non-weapons live in their own numeric range so they cannot
/// collide with main-hand ids or weapon types
fn off_context_type(item: &EquippedItem) -> i32 {
    match item.kind {
        EquipmentKind::Weapon { weapon_type } => weapon_type,
        EquipmentKind::Other { item_id } if item_id > 0 => OFFHAND_NON_WEAPON_OFFSET + item_id,
        EquipmentKind::Other { .. } => NO_WEAPON_TYPE,
    }
}

fn read_hands<E: EquipmentSource + ?Sized>(source: &E) -> Result<(i32, i32)> {
    let mut main = source.main_hand()?;
    let off = source.off_hand()?;

    if main.is_none()
        && let Some(current) = source.current_weapon()?
        && off.as_ref().is_none_or(|off| !current.same_instance(off))
    {
        main = Some(current);
    }

    let main_type = main.as_ref().map(main_context_type).unwrap_or(NO_WEAPON_TYPE);
    let off_type = match (&off, &main) {
        (Some(off), Some(main)) if off.same_instance(main) => NO_WEAPON_TYPE,
        (Some(off), _) => off_context_type(off),
        (None, _) => NO_WEAPON_TYPE,
    };
    Ok((main_type, off_type))
}

/// Resolve the current context; lookup failures degrade to baseline
pub fn resolve<E: EquipmentSource + ?Sized>(source: &E) -> WeaponContext {
    let context = match read_hands(source) {
        Ok((main_type, off_type)) => WeaponContext::from_types(main_type, off_type),
        Err(e) => {
            warn!(error = ?e, "Equipment lookup failed, using baseline context");
            WeaponContext::baseline()
        }
    };
    debug!(signature = %context.signature(), context = %context, "Resolved weapon context");
    context
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    #[derive(Default)]
    struct Hands {
        main: Option<EquippedItem>,
        off: Option<EquippedItem>,
        current: Option<EquippedItem>,
        fail: bool,
    }

    impl EquipmentSource for Hands {
        fn main_hand(&self) -> Result<Option<EquippedItem>> {
            if self.fail {
                return Err(anyhow!("equipment not ready"));
            }
            Ok(self.main.clone())
        }

        fn off_hand(&self) -> Result<Option<EquippedItem>> {
            Ok(self.off.clone())
        }

        fn current_weapon(&self) -> Result<Option<EquippedItem>> {
            Ok(self.current.clone())
        }
    }

    #[test]
    fn test_empty_hands_resolve_to_baseline() {
        let context = resolve(&Hands::default());
        assert_eq!(context, WeaponContext::baseline());
        assert_eq!(context.resolve_keys, vec!["baseline".to_string()]);
        assert_eq!(context.edit_key, "baseline");
        assert_eq!(context.signature(), "-1|-1");
    }

    #[test]
    fn test_both_hands_give_full_chain() {
        let hands = Hands {
            main: Some(EquippedItem::weapon("sword", 2)),
            off: Some(EquippedItem::weapon("dagger", 7)),
            ..Hands::default()
        };
        let context = resolve(&hands);
        assert_eq!(
            context.resolve_keys,
            vec!["combo:2|7", "main:2", "off:7", "baseline"]
        );
        assert_eq!(context.edit_key, "combo:2|7");
    }

    #[test]
    fn test_off_hand_only() {
        let hands = Hands {
            off: Some(EquippedItem::other("lantern", 5100)),
            ..Hands::default()
        };
        let context = resolve(&hands);
        let off = OFFHAND_NON_WEAPON_OFFSET + 5100;
        assert_eq!(context.off_type, off);
        assert_eq!(context.resolve_keys, vec![off_key(off), baseline_key()]);
        assert_eq!(context.edit_key, off_key(off));
    }

    #[test]
    fn test_current_weapon_stands_in_for_main_hand() {
        let hands = Hands {
            current: Some(EquippedItem::weapon("bow", 9)),
            ..Hands::default()
        };
        assert_eq!(resolve(&hands).main_type, 9);
    }

    #[test]
    fn test_current_weapon_ignored_when_it_is_the_off_hand() {
        let hands = Hands {
            off: Some(EquippedItem::weapon("pistol", 4)),
            current: Some(EquippedItem::weapon("pistol", 4)),
            ..Hands::default()
        };
        let context = resolve(&hands);
        assert_eq!(context.main_type, NO_WEAPON_TYPE);
        assert_eq!(context.off_type, 4);
    }

    #[test]
    fn test_two_handed_item_counts_once() {
        let staff = EquippedItem::weapon("staff", 12);
        let hands = Hands {
            main: Some(staff.clone()),
            off: Some(staff),
            ..Hands::default()
        };
        let context = resolve(&hands);
        assert_eq!(context.resolve_keys, vec!["main:12", "baseline"]);
    }

    #[test]
    fn test_lookup_failure_degrades_to_baseline() {
        let hands = Hands {
            main: Some(EquippedItem::weapon("axe", 1)),
            fail: true,
            ..Hands::default()
        };
        assert_eq!(resolve(&hands), WeaponContext::baseline());
    }

    #[test]
    fn test_non_weapon_main_hand_uses_item_id() {
        let hands = Hands {
            main: Some(EquippedItem::other("torch", 300)),
            off: Some(EquippedItem::other("shield", 300)),
            ..Hands::default()
        };
        let context = resolve(&hands);
        assert_eq!(context.main_type, 300);
        assert_eq!(context.off_type, OFFHAND_NON_WEAPON_OFFSET + 300);
        assert_ne!(context.main_type, context.off_type);
    }
}
