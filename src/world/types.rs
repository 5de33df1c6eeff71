use serde::{Deserialize, Serialize};
use std::fmt;

use super::direction::Direction;

/// Identifier of a room in the navigation graph.
pub type RoomId = u32;

/// Stable per-session identifier, assigned once by the world registry.
/// Two-party operations lock players in ascending `PlayerId` order.
pub type PlayerId = u64;

/// Destination id meaning "no exit this way". Never a valid room id.
pub const NO_EXIT: RoomId = 0;

/// A carried or dropped object. Identity is its name, matched case-insensitively.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Item {
    pub name: String,
}

impl Item {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
        }
    }

    /// Exact name match, ignoring case in any script.
    pub fn matches(&self, name: &str) -> bool {
        self.name == name || self.name.to_lowercase() == name.to_lowercase()
    }
}

impl fmt::Display for Item {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// A directed edge out of a room. `room == NO_EXIT` marks a blocked direction,
/// which may still carry flavor text.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Exit {
    pub direction: Direction,
    pub room: RoomId,
    #[serde(default)]
    pub message: Option<String>,
}

impl Exit {
    pub fn new(direction: Direction, room: RoomId, message: &str) -> Self {
        Self {
            direction,
            room,
            message: if message.is_empty() {
                None
            } else {
                Some(message.to_string())
            },
        }
    }

    /// A sentinel exit with no flavor text.
    pub fn blocked(direction: Direction) -> Self {
        Self {
            direction,
            room: NO_EXIT,
            message: None,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.room != NO_EXIT
    }
}

/// Remove the first item whose name matches, preserving the order of the rest.
pub(crate) fn take_first_match(items: &mut Vec<Item>, name: &str) -> Option<Item> {
    let index = items.iter().position(|item| item.matches(name))?;
    Some(items.remove(index))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn item_match_ignores_case() {
        let sword = Item::new("Sword");
        assert!(sword.matches("sword"));
        assert!(sword.matches("SWORD"));
        assert!(!sword.matches("SWORD "));
        assert!(!sword.matches("swords"));
    }

    #[test]
    fn item_match_folds_non_ascii_case() {
        let epee = Item::new("Épée");
        assert!(epee.matches("épée"));
        assert!(epee.matches("ÉPÉE"));
        assert!(!epee.matches("epee"));

        let mut items = vec![Item::new("Straße"), Item::new("Ёлка")];
        assert_eq!(take_first_match(&mut items, "ёлка").unwrap().name, "Ёлка");
    }

    #[test]
    fn take_first_match_keeps_duplicates() {
        let mut items = vec![Item::new("Rock"), Item::new("Key"), Item::new("rock")];
        let taken = take_first_match(&mut items, "ROCK").unwrap();
        assert_eq!(taken.name, "Rock");
        assert_eq!(items, vec![Item::new("Key"), Item::new("rock")]);
        assert!(take_first_match(&mut items, "lamp").is_none());
    }

    #[test]
    fn empty_message_is_none() {
        let exit = Exit::new(Direction::North, 3, "");
        assert!(exit.message.is_none());
        assert!(exit.is_valid());
        assert!(!Exit::blocked(Direction::East).is_valid());
    }
}
