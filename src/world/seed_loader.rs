//! World definitions loaded from JSON seeds.
//!
//! Rooms, their exits and starting items, and the ghouls that roam them are
//! read once at startup and turned into a validated [`World`]. The built-in
//! world at `data/seeds/world.json` is compiled in as a fallback.

use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use super::errors::WorldError;
use super::npc::{Ghoul, DEFAULT_SNATCH_CHANCE};
use super::registry::World;
use super::room::Room;
use super::types::{Exit, Item, RoomId};

const CANONICAL_WORLD_JSON: &str = include_str!("../../data/seeds/world.json");

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorldSeed {
    pub start_room: RoomId,
    pub rooms: Vec<RoomSeed>,
    #[serde(default)]
    pub ghouls: Vec<GhoulSeed>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomSeed {
    pub id: RoomId,
    pub title: String,
    pub description: String,
    pub location: String,
    #[serde(default)]
    pub exits: Vec<Exit>,
    #[serde(default)]
    pub items: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GhoulSeed {
    pub name: String,
    pub room: RoomId,
    #[serde(default = "default_snatch_chance")]
    pub snatch_chance: f64,
}

fn default_snatch_chance() -> f64 {
    DEFAULT_SNATCH_CHANCE
}

impl WorldSeed {
    /// Build and validate the world described by this seed.
    pub fn build(self, starting_dollars: u32) -> Result<World, WorldError> {
        let mut rooms = Vec::with_capacity(self.rooms.len());
        for seed in self.rooms {
            rooms.push(seed.into_room()?);
        }
        let world = World::new(rooms, self.start_room)?.with_starting_dollars(starting_dollars);
        for ghoul in self.ghouls {
            let npc = Ghoul::new(&ghoul.name, ghoul.room).with_snatch_chance(ghoul.snatch_chance);
            world.add_npc(Arc::new(npc))?;
        }
        info!(
            target: "tinyworld::world",
            "world loaded: {} rooms, {} npcs, start room {}",
            world.rooms().len(),
            world.npcs().len(),
            world.start_room()
        );
        Ok(world)
    }
}

impl RoomSeed {
    fn into_room(self) -> Result<Room, WorldError> {
        let mut seen = HashSet::new();
        let mut room = Room::new(self.id, &self.title, &self.description, &self.location);
        for exit in self.exits {
            if !seen.insert(exit.direction) {
                return Err(WorldError::InvalidWorld(format!(
                    "room {} defines {} twice",
                    self.id, exit.direction
                )));
            }
            room = room.with_exit(
                exit.direction,
                exit.room,
                exit.message.as_deref().unwrap_or_default(),
            );
        }
        for name in self.items {
            if !room.add_item(Item::new(&name)) {
                warn!(
                    target: "tinyworld::world",
                    "room {} is fully stocked; skipping seed item {}",
                    self.id,
                    name
                );
            }
        }
        Ok(room)
    }
}

/// Parse a world seed file.
pub fn load_world_seed<P: AsRef<Path>>(path: P) -> Result<WorldSeed, WorldError> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;
    serde_json::from_str(&contents).map_err(|e| {
        WorldError::InvalidWorld(format!("Failed to parse {}: {}", path.display(), e))
    })
}

/// Load, build and validate a world from a seed file.
pub fn load_world_from_json<P: AsRef<Path>>(
    path: P,
    starting_dollars: u32,
) -> Result<World, WorldError> {
    load_world_seed(path)?.build(starting_dollars)
}

/// The world shipped with the crate.
pub fn canonical_world_seed() -> Result<WorldSeed, WorldError> {
    Ok(serde_json::from_str(CANONICAL_WORLD_JSON)?)
}
