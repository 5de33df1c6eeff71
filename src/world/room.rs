//! Rooms: fixed exit tables, an item stash, and occupancy views computed from
//! the world registry.
//!
//! A room never stores who is inside it. Occupants are whichever players and
//! NPCs currently report this room's id, so the view cannot drift from player
//! state. Only the item stash is mutable, and it has its own lock.

use log::debug;
use rand::seq::SliceRandom;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::direction::Direction;
use super::errors::WorldError;
use super::npc::Npc;
use super::player::Player;
use super::registry::World;
use super::types::{take_first_match, Exit, Item, PlayerId, RoomId, NO_EXIT};
use crate::metrics;

/// Most items the stocking path will place in a single room.
pub const ROOM_STOCK_LIMIT: usize = 5;

#[derive(Debug)]
pub struct Room {
    id: RoomId,
    title: String,
    description: String,
    location: String,
    exits: [Exit; 4],
    items: Mutex<Vec<Item>>,
}

impl Room {
    /// A room with every direction blocked. Add exits with [`Room::with_exit`].
    pub fn new(id: RoomId, title: &str, description: &str, location: &str) -> Self {
        Self {
            id,
            title: title.to_string(),
            description: description.to_string(),
            location: location.to_string(),
            exits: Direction::ALL.map(Exit::blocked),
            items: Mutex::new(Vec::new()),
        }
    }

    /// Set the exit for `direction`. A `room` of [`NO_EXIT`] keeps it blocked
    /// but still records the flavor text.
    pub fn with_exit(mut self, direction: Direction, room: RoomId, message: &str) -> Self {
        self.exits[direction.index()] = Exit::new(direction, room, message);
        self
    }

    fn items_guard(&self) -> MutexGuard<'_, Vec<Item>> {
        self.items.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn id(&self) -> RoomId {
        self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    // ========================================================================
    // Broadcast
    // ========================================================================

    /// Send `message` to every player currently in this room. Returns the
    /// number of successful deliveries.
    pub fn broadcast(&self, world: &World, message: &str) -> usize {
        self.deliver(world, message, None)
    }

    /// As [`Room::broadcast`], skipping exactly the `excluding` player.
    pub fn broadcast_to_others(&self, world: &World, message: &str, excluding: &Player) -> usize {
        self.deliver(world, message, Some(excluding.id()))
    }

    fn deliver(&self, world: &World, message: &str, skip: Option<PlayerId>) -> usize {
        let mut delivered = 0;
        for player in world.players() {
            if player.room() != self.id || Some(player.id()) == skip {
                continue;
            }
            if player.send(message).is_delivered() {
                delivered += 1;
            }
        }
        metrics::inc_broadcasts();
        debug!(
            target: "tinyworld::world",
            "room {} broadcast reached {} player(s)",
            self.id,
            delivered
        );
        delivered
    }

    // ========================================================================
    // Exits
    // ========================================================================

    pub fn exit(&self, direction: Direction) -> &Exit {
        &self.exits[direction.index()]
    }

    pub fn all_exits(&self) -> &[Exit] {
        &self.exits
    }

    pub fn valid_exits(&self) -> Vec<&Exit> {
        self.exits.iter().filter(|exit| exit.is_valid()).collect()
    }

    /// Space-separated names of every direction with a real exit.
    pub fn exits(&self) -> String {
        self.valid_exits()
            .iter()
            .map(|exit| exit.direction.name())
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub fn can_exit(&self, direction: Direction) -> bool {
        self.exit(direction).is_valid()
    }

    /// Flavor text for `direction`, present even on blocked exits.
    pub fn exit_message(&self, direction: Direction) -> Option<&str> {
        self.exit(direction).message.as_deref()
    }

    /// Destination for `direction`, or [`NO_EXIT`].
    pub fn link(&self, direction: Direction) -> RoomId {
        let exit = self.exit(direction);
        if exit.is_valid() {
            exit.room
        } else {
            NO_EXIT
        }
    }

    /// Uniformly pick one non-sentinel exit.
    pub fn random_valid_exit(&self) -> Result<&Exit, WorldError> {
        self.valid_exits()
            .choose(&mut rand::thread_rng())
            .copied()
            .ok_or(WorldError::NoValidExit(self.id))
    }

    // ========================================================================
    // Items
    // ========================================================================

    /// Stock the room. Silently ignored once the room holds
    /// [`ROOM_STOCK_LIMIT`] items; returns whether the item was placed.
    pub fn add_item(&self, item: Item) -> bool {
        let mut items = self.items_guard();
        if items.len() >= ROOM_STOCK_LIMIT {
            return false;
        }
        items.push(item);
        true
    }

    /// A player dropping an item. Uncapped.
    pub fn deposit_item(&self, item: Item) {
        self.items_guard().push(item);
    }

    pub fn remove_item(&self, name: &str) -> Option<Item> {
        take_first_match(&mut self.items_guard(), name)
    }

    /// Remove the most recently added item.
    pub fn take_last(&self) -> Option<Item> {
        self.items_guard().pop()
    }

    pub fn items(&self) -> Vec<Item> {
        self.items_guard().clone()
    }

    pub fn items_listing(&self) -> String {
        let items = self.items_guard();
        if items.is_empty() {
            return "None.".to_string();
        }
        items
            .iter()
            .map(|item| item.name.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }

    // ========================================================================
    // Occupancy (derived on every call)
    // ========================================================================

    pub fn occupants(&self, world: &World) -> Vec<Arc<Player>> {
        world
            .players()
            .into_iter()
            .filter(|player| player.room() == self.id)
            .collect()
    }

    /// Names of players here, in registry (join) order.
    pub fn occupant_names(&self, world: &World) -> Vec<String> {
        self.occupants(world)
            .iter()
            .map(|player| player.name())
            .collect()
    }

    /// Names of every NPC here, or `None` when there are none.
    pub fn npc_names(&self, world: &World) -> Option<Vec<String>> {
        let names: Vec<String> = world
            .npcs()
            .iter()
            .filter(|npc| npc.current_room() == self.id)
            .map(|npc| npc.name())
            .collect();
        if names.is_empty() {
            None
        } else {
            Some(names)
        }
    }

    /// Every ghoul currently in this room.
    pub fn ghouls(&self, world: &World) -> Vec<Arc<dyn Npc>> {
        world
            .npcs()
            .into_iter()
            .filter(|npc| npc.is_ghoul() && npc.current_room() == self.id)
            .collect()
    }

    pub fn ghoul_listing(&self, world: &World) -> String {
        let ghouls = self.ghouls(world);
        if ghouls.is_empty() {
            return "None".to_string();
        }
        ghouls
            .iter()
            .map(|ghoul| ghoul.name())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Full LOOK output for `viewer`.
    pub fn describe(&self, world: &World, viewer: &Player) -> String {
        let players = self.occupant_names(world);
        let players = if players.is_empty() {
            "None.".to_string()
        } else {
            players.join(" ")
        };
        let exits = self.exits();
        let exits = if exits.is_empty() {
            "None".to_string()
        } else {
            exits
        };
        format!(
            ".-------------------------\n\
             | {}\n\
             -------------------------\n\
             {}\n\
             ...................\n\
             This room is {}\n\
             Objects in the area: {}\n\
             Players in the area: {}\n\
             Ghouls in the area: {}\n\
             You see paths in these directions: {}\n\
             ...................\n\
             You are facing: {}",
            self.title,
            self.description,
            self.location,
            self.items_listing(),
            players,
            self.ghoul_listing(world),
            exits,
            viewer.direction(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hall() -> Room {
        Room::new(1, "Hall", "A long hall.", "indoors")
            .with_exit(Direction::East, 2, "You walk east.")
            .with_exit(Direction::South, 3, "")
            .with_exit(Direction::North, NO_EXIT, "A wall of rubble blocks this path.")
    }

    #[test]
    fn sentinel_exit_is_invisible() {
        let room = hall();
        assert!(!room.can_exit(Direction::North));
        assert_eq!(room.link(Direction::North), NO_EXIT);
        assert_eq!(
            room.exit_message(Direction::North),
            Some("A wall of rubble blocks this path.")
        );
        assert_eq!(room.exits(), "East South");
    }

    #[test]
    fn unconfigured_direction_has_no_message() {
        let room = hall();
        assert!(!room.can_exit(Direction::West));
        assert_eq!(room.link(Direction::West), NO_EXIT);
        assert_eq!(room.exit_message(Direction::West), None);
    }

    #[test]
    fn random_valid_exit_skips_sentinels() {
        let room = hall();
        for _ in 0..200 {
            let exit = room.random_valid_exit().unwrap();
            assert_ne!(exit.room, NO_EXIT);
            assert!(matches!(exit.direction, Direction::East | Direction::South));
        }
    }

    #[test]
    fn random_valid_exit_errors_on_dead_end() {
        let room = Room::new(7, "Cell", "No way out.", "underground");
        assert!(matches!(
            room.random_valid_exit(),
            Err(WorldError::NoValidExit(7))
        ));
    }

    #[test]
    fn stocking_is_capped_but_deposits_are_not() {
        let room = hall();
        for i in 0..ROOM_STOCK_LIMIT {
            assert!(room.add_item(Item::new(&format!("Rock{}", i))));
        }
        assert!(!room.add_item(Item::new("Extra")));
        assert_eq!(room.items().len(), ROOM_STOCK_LIMIT);

        room.deposit_item(Item::new("Dropped"));
        assert_eq!(room.items().len(), ROOM_STOCK_LIMIT + 1);
    }

    #[test]
    fn item_removal_semantics() {
        let room = hall();
        assert_eq!(room.items_listing(), "None.");
        assert!(room.take_last().is_none());
        room.add_item(Item::new("Lantern"));
        room.add_item(Item::new("Coil"));
        assert_eq!(room.items_listing(), "Lantern, Coil");
        assert_eq!(room.remove_item("LANTERN").unwrap().name, "Lantern");
        assert_eq!(room.take_last().unwrap().name, "Coil");
        assert!(room.remove_item("coil").is_none());
    }
}
