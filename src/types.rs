//! Small value types shared by the profile, overlay and preset stores

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Address of one slot: `(bar index, slot index)`
///
/// Persisted as the string `"barIndex_slotIndex"` so overlay and preset files
/// stay readable and stable across resizes of unrelated bars.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SlotKey {
    pub bar: usize,
    pub slot: usize,
}

impl SlotKey {
    pub fn new(bar: usize, slot: usize) -> Self {
        Self { bar, slot }
    }
}

impl fmt::Display for SlotKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.bar, self.slot)
    }
}

impl FromStr for SlotKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (bar, slot) = s
            .split_once('_')
            .ok_or_else(|| format!("slot key '{s}' is missing '_' separator"))?;
        let bar = bar
            .trim()
            .parse()
            .map_err(|e| format!("invalid bar index in slot key '{s}': {e}"))?;
        let slot = slot
            .trim()
            .parse()
            .map_err(|e| format!("invalid slot index in slot key '{s}': {e}"))?;
        Ok(Self { bar, slot })
    }
}

impl Serialize for SlotKey {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for SlotKey {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// What occupies a slot: an item id plus an optional instance uid
///
/// `item_id <= 0` with no uid is "empty". Stored entries may be explicitly
/// empty, which is different from having no entry at all.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotAssignment {
    pub item_id: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item_uid: Option<String>,
}

impl SlotAssignment {
    pub fn new(item_id: i32, item_uid: Option<String>) -> Self {
        Self {
            item_id,
            item_uid: item_uid.filter(|uid| !uid.trim().is_empty()),
        }
    }

    pub fn empty() -> Self {
        Self {
            item_id: -1,
            item_uid: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.item_id <= 0 && self.uid().is_empty()
    }

    /// Uid with `None` and blank strings treated alike
    pub fn uid(&self) -> &str {
        self.item_uid.as_deref().map(str::trim).unwrap_or("")
    }

    /// True when both sides point at the same thing (all empties are equal)
    pub fn same_as(&self, other: &SlotAssignment) -> bool {
        if self.is_empty() && other.is_empty() {
            return true;
        }
        self.item_id == other.item_id && self.uid() == other.uid()
    }
}

impl Default for SlotAssignment {
    fn default() -> Self {
        Self::empty()
    }
}

/// How an empty slot is drawn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum EmptySlotDisplay {
    #[default]
    Transparent,
    Image,
    Hidden,
}

impl FromStr for EmptySlotDisplay {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "transparent" => Ok(Self::Transparent),
            "image" => Ok(Self::Image),
            "hidden" => Ok(Self::Hidden),
            other => Err(format!("unknown empty slot display '{other}'")),
        }
    }
}

impl fmt::Display for EmptySlotDisplay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Transparent => "Transparent",
            Self::Image => "Image",
            Self::Hidden => "Hidden",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn test_slot_key_display_and_parse() {
        let key = SlotKey::new(2, 13);
        assert_eq!(key.to_string(), "2_13");
        assert_eq!("2_13".parse::<SlotKey>(), Ok(key));
    }

    #[test]
    fn test_slot_key_rejects_garbage() {
        assert!("13".parse::<SlotKey>().is_err());
        assert!("a_1".parse::<SlotKey>().is_err());
        assert!("1_".parse::<SlotKey>().is_err());
    }

    #[test]
    fn test_slot_key_as_json_map_key() {
        let mut map = BTreeMap::new();
        map.insert(SlotKey::new(0, 3), SlotAssignment::new(42, None));
        let json = serde_json::to_string(&map).unwrap();
        assert_eq!(json, r#"{"0_3":{"item_id":42}}"#);

        let back: BTreeMap<SlotKey, SlotAssignment> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, map);
    }

    #[test]
    fn test_assignment_emptiness() {
        assert!(SlotAssignment::empty().is_empty());
        assert!(SlotAssignment::new(0, Some("  ".to_string())).is_empty());
        assert!(!SlotAssignment::new(-1, Some("uid-1".to_string())).is_empty());
        assert!(!SlotAssignment::new(5, None).is_empty());
    }

    #[test]
    fn test_assignment_same_as_normalizes_uid() {
        let a = SlotAssignment {
            item_id: 7,
            item_uid: Some(String::new()),
        };
        let b = SlotAssignment::new(7, None);
        assert!(a.same_as(&b));
        assert!(SlotAssignment::empty().same_as(&SlotAssignment::new(0, None)));
        assert!(!a.same_as(&SlotAssignment::new(8, None)));
    }

    #[test]
    fn test_empty_slot_display_parse() {
        assert_eq!("image".parse::<EmptySlotDisplay>(), Ok(EmptySlotDisplay::Image));
        assert_eq!("Hidden".parse::<EmptySlotDisplay>(), Ok(EmptySlotDisplay::Hidden));
        assert!("sparkly".parse::<EmptySlotDisplay>().is_err());
        assert_eq!(EmptySlotDisplay::Transparent.to_string(), "Transparent");
    }
}
