//! Non-player actors as seen by rooms.
//!
//! Rooms only need to know where an NPC is and whether it is a ghoul; the
//! behaviour lives on the concrete type and runs from [`Npc::act`] on every
//! server tick. [`Ghoul`] is the one NPC shipped here: it wanders the room
//! graph and occasionally snatches an item.

use log::{debug, warn};
use rand::Rng;
use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};

use super::errors::WorldError;
use super::registry::World;
use super::types::RoomId;
use crate::logutil::escape_log;

/// The interface a room needs from an NPC.
pub trait Npc: fmt::Debug + Send + Sync {
    fn name(&self) -> String;

    fn current_room(&self) -> RoomId;

    fn is_ghoul(&self) -> bool {
        false
    }

    /// One unit of autonomous behaviour. Default: stand still.
    fn act(&self, _world: &World) {}
}

/// Chance per tick that a ghoul snatches from each player it shares a room with.
pub const DEFAULT_SNATCH_CHANCE: f64 = 0.1;

#[derive(Debug)]
pub struct Ghoul {
    name: String,
    room: AtomicU32,
    snatch_chance: f64,
}

impl Ghoul {
    pub fn new(name: &str, room: RoomId) -> Self {
        Self {
            name: name.to_string(),
            room: AtomicU32::new(room),
            snatch_chance: DEFAULT_SNATCH_CHANCE,
        }
    }

    pub fn with_snatch_chance(mut self, chance: f64) -> Self {
        self.snatch_chance = chance.clamp(0.0, 1.0);
        self
    }

    /// Step through a random valid exit, announcing the move to both rooms.
    pub fn wander(&self, world: &World) -> Result<RoomId, WorldError> {
        let here = self.current_room();
        let from = world.room(here).ok_or(WorldError::UnknownRoom(here))?;
        let exit = from.random_valid_exit()?;
        let (direction, target) = (exit.direction, exit.room);
        let to = world.room(target).ok_or(WorldError::UnknownRoom(target))?;

        self.room.store(target, Ordering::Release);
        debug!(
            target: "tinyworld::world",
            "{} wanders {} from room {} to room {}",
            escape_log(&self.name),
            direction,
            here,
            target
        );
        from.broadcast(
            world,
            &format!("{} shambles off to the {}.", self.name, direction),
        );
        to.broadcast(
            world,
            &format!(
                "{} shambles in from the {}.",
                self.name,
                direction.opposite()
            ),
        );
        Ok(target)
    }

    /// Give each player sharing the ghoul's room a `chance` of losing a random
    /// item. Returns how many players were attacked.
    pub fn prowl(&self, world: &World, chance: f64) -> usize {
        let Some(room) = world.room(self.current_room()) else {
            return 0;
        };
        let chance = chance.clamp(0.0, 1.0);
        let mut attacked = 0;
        for player in room.occupants(world) {
            if !rand::thread_rng().gen_bool(chance) {
                continue;
            }
            attacked += 1;
            let result = player.remove_random_item();
            player.send(&format!("{} lunges at you! {}", self.name, result));
            room.broadcast_to_others(
                world,
                &format!("{} lunges at {}!", self.name, player.name()),
                &player,
            );
        }
        attacked
    }
}

impl Npc for Ghoul {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn current_room(&self) -> RoomId {
        self.room.load(Ordering::Acquire)
    }

    fn is_ghoul(&self) -> bool {
        true
    }

    /// Wander one room, then prowl the new room.
    fn act(&self, world: &World) {
        match self.wander(world) {
            Ok(_) => {
                self.prowl(world, self.snatch_chance);
            }
            Err(err) => {
                warn!(
                    target: "tinyworld::world",
                    "{} cannot wander: {}",
                    escape_log(&self.name),
                    err
                );
            }
        }
    }
}

impl fmt::Display for Ghoul {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}
