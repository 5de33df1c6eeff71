//! Test utilities & fixtures.
//! Builds a small three-room world and connects players to it with their
//! output receivers exposed.
#![allow(dead_code)]

use std::sync::Arc;
use tokio::sync::mpsc::Receiver;

use tinyworld::world::{Direction, Item, Player, Room, World, NO_EXIT};

/// Plaza (1) with a fountain to the north (2) and a shop to the east (3).
/// The plaza's west exit is blocked by a locked gate.
pub fn plaza_world() -> World {
    let plaza = Room::new(1, "Plaza", "A cobbled square.", "outdoors")
        .with_exit(Direction::North, 2, "")
        .with_exit(Direction::East, 3, "The shop bell jingles.")
        .with_exit(Direction::West, NO_EXIT, "The gate is locked.");
    plaza.add_item(Item::new("Pebble"));
    let fountain = Room::new(2, "Fountain", "Water splashes.", "outdoors")
        .with_exit(Direction::South, 1, "");
    fountain.add_item(Item::new("Coin Purse"));
    let shop = Room::new(3, "Shop", "Shelves line the walls.", "indoors")
        .with_exit(Direction::West, 1, "");
    World::new(vec![plaza, fountain, shop], 1).expect("plaza world is valid")
}

/// Join `name` to `world` with a generous output buffer.
pub fn connect(world: &World, name: &str) -> (Arc<Player>, Receiver<String>) {
    let (sink, rx) = tinyworld::world::OutputSink::channel(256);
    (world.join(name, sink), rx)
}

/// Everything queued for a player so far.
pub fn drain(rx: &mut Receiver<String>) -> Vec<String> {
    let mut out = Vec::new();
    while let Ok(line) = rx.try_recv() {
        out.push(line);
    }
    out
}
