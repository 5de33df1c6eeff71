//! Shared-world state: players, rooms, money and the registry tying them together.
//!
//! Everything here is safe to use from many session tasks at once. Players
//! carry their own lock, rooms lock only their item stash, and the registry
//! hands out snapshots for iteration.

pub mod commands;
pub mod direction;
pub mod errors;
pub mod money;
pub mod npc;
pub mod output;
pub mod player;
pub mod registry;
pub mod room;
pub mod seed_loader;
pub mod types;

pub use commands::{execute, parse_command, CommandFlow, WorldCommand};
pub use direction::Direction;
pub use errors::WorldError;
pub use money::{format_cents, Coin, Dollar, Money, COINS_PER_DOLLAR};
pub use npc::{Ghoul, Npc, DEFAULT_SNATCH_CHANCE};
pub use output::{Delivery, OutputSink};
pub use player::{Player, TransferReceipt};
pub use registry::{World, DEFAULT_STARTING_DOLLARS};
pub use room::{Room, ROOM_STOCK_LIMIT};
pub use seed_loader::{
    canonical_world_seed, load_world_from_json, load_world_seed, GhoulSeed, RoomSeed, WorldSeed,
};
pub use types::{Exit, Item, PlayerId, RoomId, NO_EXIT};
