//! Identity newtypes: stable player identity and transient connection slot.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A player's stable external identity (e.g. a SteamID64 rendered as a
/// string).
///
/// This is a "newtype wrapper" over `String`:
///
/// 1. **Type safety**: you can't accidentally pass a display name where a
///    `PlayerId` is expected, even though both are strings underneath.
/// 2. **Readability**: `fn lookup_ban(id: &PlayerId)` is clearer than
///    `fn lookup_ban(id: &str)`.
///
/// `#[serde(transparent)]` serializes this as the bare string, not as a
/// one-field struct.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(pub String);

impl PlayerId {
    /// Builds a `PlayerId` from anything string-like.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The raw identity string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for PlayerId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// A host-assigned connection slot.
///
/// Slots are a scarce, REUSED resource: when a player disconnects, the host
/// may hand the same slot number to the next player. Any code that holds a
/// `SlotId` across an await point must re-validate that the slot still
/// carries the identity it expects before acting on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SlotId(pub u32);

impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "S-{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_player_id_display_is_raw_string() {
        let id = PlayerId::new("76561198000000001");
        assert_eq!(id.to_string(), "76561198000000001");
        assert_eq!(id.as_str(), "76561198000000001");
    }

    #[test]
    fn test_slot_id_display_has_prefix() {
        assert_eq!(SlotId(5).to_string(), "S-5");
    }

    #[test]
    fn test_player_id_equality_by_value() {
        assert_eq!(PlayerId::from("42"), PlayerId::new("42"));
        assert_ne!(PlayerId::from("42"), PlayerId::from("43"));
    }
}
