//! The world registry: every room, connected player and NPC.
//!
//! One [`World`] is created at startup and shared by reference (`Arc<World>`)
//! with every session. Rooms are fixed after load. The player and NPC lists
//! are behind `RwLock`s and are only ever iterated through cloned snapshots,
//! so a disconnect in one session cannot disturb a broadcast in another.

use log::{info, warn};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use super::errors::WorldError;
use super::money::Money;
use super::npc::Npc;
use super::output::OutputSink;
use super::player::Player;
use super::room::Room;
use super::types::{PlayerId, RoomId, NO_EXIT};
use crate::logutil::escape_log;
use crate::metrics;

/// Whole units every new player starts with unless configured otherwise.
pub const DEFAULT_STARTING_DOLLARS: u32 = 20;

#[derive(Debug)]
pub struct World {
    rooms: HashMap<RoomId, Arc<Room>>,
    start_room: RoomId,
    starting_dollars: u32,
    players: RwLock<Vec<Arc<Player>>>,
    npcs: RwLock<Vec<Arc<dyn Npc>>>,
    next_player_id: AtomicU64,
}

impl World {
    /// Build and validate a world. Fails on any configuration error, so a
    /// running world never has dangling exits or dead-end rooms.
    pub fn new(rooms: Vec<Room>, start_room: RoomId) -> Result<Self, WorldError> {
        let mut table = HashMap::with_capacity(rooms.len());
        for room in rooms {
            let id = room.id();
            if table.insert(id, Arc::new(room)).is_some() {
                return Err(WorldError::InvalidWorld(format!("duplicate room id {}", id)));
            }
        }
        let world = Self {
            rooms: table,
            start_room,
            starting_dollars: DEFAULT_STARTING_DOLLARS,
            players: RwLock::new(Vec::new()),
            npcs: RwLock::new(Vec::new()),
            next_player_id: AtomicU64::new(1),
        };
        world.validate()?;
        Ok(world)
    }

    pub fn with_starting_dollars(mut self, dollars: u32) -> Self {
        self.starting_dollars = dollars;
        self
    }

    /// Load-time checks for the static room graph.
    pub fn validate(&self) -> Result<(), WorldError> {
        if self.rooms.is_empty() {
            return Err(WorldError::InvalidWorld("world has no rooms".to_string()));
        }
        if self.rooms.contains_key(&NO_EXIT) {
            return Err(WorldError::InvalidWorld(format!(
                "room id {} is reserved for blocked exits",
                NO_EXIT
            )));
        }
        if !self.rooms.contains_key(&self.start_room) {
            return Err(WorldError::UnknownRoom(self.start_room));
        }
        for room in self.rooms.values() {
            let valid = room.valid_exits();
            if valid.is_empty() {
                return Err(WorldError::NoValidExit(room.id()));
            }
            for exit in valid {
                if !self.rooms.contains_key(&exit.room) {
                    return Err(WorldError::InvalidWorld(format!(
                        "room {} exit {} leads to unknown room {}",
                        room.id(),
                        exit.direction,
                        exit.room
                    )));
                }
            }
        }
        Ok(())
    }

    // ========================================================================
    // Rooms
    // ========================================================================

    pub fn room(&self, id: RoomId) -> Option<Arc<Room>> {
        self.rooms.get(&id).cloned()
    }

    /// All rooms ordered by id.
    pub fn rooms(&self) -> Vec<Arc<Room>> {
        self.rooms
            .iter()
            .collect::<BTreeMap<_, _>>()
            .into_values()
            .cloned()
            .collect()
    }

    pub fn start_room(&self) -> RoomId {
        self.start_room
    }

    pub fn starting_dollars(&self) -> u32 {
        self.starting_dollars
    }

    // ========================================================================
    // Players
    // ========================================================================

    /// Snapshot of connected players in join order.
    pub fn players(&self) -> Vec<Arc<Player>> {
        self.players
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn player_count(&self) -> usize {
        self.players
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Register a new session's player in the start room, facing North, with
    /// the starting purse. Names are not checked; see [`World::try_join`].
    pub fn join(&self, name: &str, output: OutputSink) -> Arc<Player> {
        let mut players = self.players.write().unwrap_or_else(PoisonError::into_inner);
        self.admit(&mut players, name, output)
    }

    /// As [`World::join`], but refuse a name already in use (ignoring case) or
    /// a world already holding `max_sessions` players. The checks and the
    /// insert happen under one write lock.
    pub fn try_join(
        &self,
        name: &str,
        output: OutputSink,
        max_sessions: usize,
    ) -> Result<Arc<Player>, WorldError> {
        let mut players = self.players.write().unwrap_or_else(PoisonError::into_inner);
        if players.len() >= max_sessions {
            return Err(WorldError::WorldFull(max_sessions));
        }
        let wanted = name.trim().to_lowercase();
        if players.iter().any(|p| p.name().to_lowercase() == wanted) {
            return Err(WorldError::NameTaken(name.to_string()));
        }
        Ok(self.admit(&mut players, name, output))
    }

    fn admit(&self, players: &mut Vec<Arc<Player>>, name: &str, output: OutputSink) -> Arc<Player> {
        let id: PlayerId = self.next_player_id.fetch_add(1, Ordering::Relaxed);
        let player = Arc::new(Player::new(
            id,
            name,
            self.start_room,
            Money::with_dollars(self.starting_dollars),
            output,
        ));
        players.push(player.clone());
        metrics::inc_sessions_joined();
        info!(
            target: "tinyworld::session",
            "player joined id={} name={} room={}",
            id,
            escape_log(name),
            self.start_room
        );
        player
    }

    /// Remove a player from the registry. Returns false if they were already gone.
    pub fn leave(&self, player: &Player) -> bool {
        let removed = {
            let mut players = self.players.write().unwrap_or_else(PoisonError::into_inner);
            let before = players.len();
            players.retain(|p| p.id() != player.id());
            players.len() != before
        };
        if removed {
            metrics::inc_sessions_left();
            info!(
                target: "tinyworld::session",
                "player left id={} name={}",
                player.id(),
                escape_log(&player.name())
            );
        }
        removed
    }

    /// First connected player whose name matches case-insensitively.
    pub fn find_player(&self, name: &str) -> Option<Arc<Player>> {
        let name = name.trim().to_lowercase();
        self.players()
            .into_iter()
            .find(|player| player.name().to_lowercase() == name)
    }

    pub fn is_name_taken(&self, name: &str) -> bool {
        self.find_player(name).is_some()
    }

    /// Drop every player whose output sink has closed. Returns the removed players.
    pub fn reap_disconnected(&self) -> Vec<Arc<Player>> {
        let reaped: Vec<Arc<Player>> = {
            let mut players = self.players.write().unwrap_or_else(PoisonError::into_inner);
            let (gone, live): (Vec<_>, Vec<_>) =
                players.drain(..).partition(|player| !player.is_connected());
            *players = live;
            gone
        };
        for player in &reaped {
            metrics::inc_sessions_left();
            warn!(
                target: "tinyworld::session",
                "reaped disconnected player id={} name={}",
                player.id(),
                escape_log(&player.name())
            );
        }
        reaped
    }

    // ========================================================================
    // NPCs
    // ========================================================================

    pub fn npcs(&self) -> Vec<Arc<dyn Npc>> {
        self.npcs
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Register an NPC. Its starting room must exist.
    pub fn add_npc(&self, npc: Arc<dyn Npc>) -> Result<(), WorldError> {
        let room = npc.current_room();
        if !self.rooms.contains_key(&room) {
            return Err(WorldError::UnknownRoom(room));
        }
        self.npcs
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(npc);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::direction::Direction;

    fn two_rooms() -> Vec<Room> {
        vec![
            Room::new(1, "Gate", "An iron gate.", "outdoors").with_exit(Direction::North, 2, ""),
            Room::new(2, "Yard", "A muddy yard.", "outdoors").with_exit(Direction::South, 1, ""),
        ]
    }

    #[test]
    fn join_places_player_at_start() {
        let world = World::new(two_rooms(), 1).unwrap();
        let (sink, _rx) = OutputSink::channel(4);
        let alice = world.join("Alice", sink);
        assert_eq!(alice.room(), 1);
        assert_eq!(alice.direction(), Direction::North);
        assert_eq!(alice.money().dollar_count(), DEFAULT_STARTING_DOLLARS);
        assert_eq!(world.player_count(), 1);
    }

    #[test]
    fn ids_are_unique_and_increasing() {
        let world = World::new(two_rooms(), 1).unwrap();
        let (a, _ra) = OutputSink::channel(1);
        let (b, _rb) = OutputSink::channel(1);
        let first = world.join("A", a);
        let second = world.join("B", b);
        assert!(second.id() > first.id());
    }

    #[test]
    fn leave_and_find() {
        let world = World::new(two_rooms(), 1).unwrap();
        let (sink, _rx) = OutputSink::channel(4);
        let alice = world.join("Alice", sink);
        assert!(world.find_player("alice").is_some());
        assert!(world.leave(&alice));
        assert!(!world.leave(&alice));
        assert!(world.find_player("alice").is_none());
    }

    #[test]
    fn reap_removes_closed_sessions_only() {
        let world = World::new(two_rooms(), 1).unwrap();
        let (a, _ra) = OutputSink::channel(4);
        let (b, rb) = OutputSink::channel(4);
        let alice = world.join("Alice", a);
        let bob = world.join("Bob", b);
        drop(rb);
        bob.send("anyone there?");

        let reaped = world.reap_disconnected();
        assert_eq!(reaped.len(), 1);
        assert_eq!(reaped[0].id(), bob.id());
        assert_eq!(world.players()[0].id(), alice.id());
    }

    #[test]
    fn rejects_dangling_exit() {
        let rooms = vec![Room::new(1, "Gate", "", "").with_exit(Direction::East, 9, "")];
        assert!(matches!(
            World::new(rooms, 1),
            Err(WorldError::InvalidWorld(_))
        ));
    }

    #[test]
    fn rejects_dead_end_room() {
        let mut rooms = two_rooms();
        rooms.push(Room::new(3, "Pit", "", "").with_exit(Direction::West, NO_EXIT, "Smooth walls."));
        assert!(matches!(World::new(rooms, 1), Err(WorldError::NoValidExit(3))));
    }

    #[test]
    fn rejects_unknown_start_and_duplicates() {
        assert!(matches!(
            World::new(two_rooms(), 5),
            Err(WorldError::UnknownRoom(5))
        ));
        let mut rooms = two_rooms();
        rooms.push(Room::new(2, "Copy", "", "").with_exit(Direction::South, 1, ""));
        assert!(matches!(World::new(rooms, 1), Err(WorldError::InvalidWorld(_))));
    }

    #[test]
    fn rooms_are_sorted() {
        let world = World::new(two_rooms(), 1).unwrap();
        let ids: Vec<_> = world.rooms().iter().map(|r| r.id()).collect();
        assert_eq!(ids, vec![1, 2]);
    }

    #[test]
    fn try_join_refuses_taken_names_and_full_worlds() {
        let world = World::new(two_rooms(), 1).unwrap();
        let (sink, _rx) = OutputSink::channel(4);
        world.try_join("Ada", sink, 2).unwrap();

        let (sink, _rx) = OutputSink::channel(4);
        assert!(matches!(
            world.try_join("ADA", sink, 2),
            Err(WorldError::NameTaken(_))
        ));
        let (sink, _rx) = OutputSink::channel(4);
        world.try_join("Bea", sink, 2).unwrap();
        let (sink, _rx) = OutputSink::channel(4);
        assert!(matches!(
            world.try_join("Cy", sink, 2),
            Err(WorldError::WorldFull(2))
        ));
        assert_eq!(world.player_count(), 2);
    }
}
