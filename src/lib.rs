//! # tinyworld - a small shared text world over TCP
//!
//! Players connect with any line-based client (telnet, netcat), pick a name
//! and wander a graph of rooms together. They can pick up and drop items,
//! hand each other money, talk to the room or whisper to one player, and
//! dodge the ghouls that roam the map.
//!
//! ## Features
//!
//! - **Shared world**: every session acts on one [`world::World`] concurrently.
//! - **Rooms and exits**: four compass exits per room; blocked exits can carry flavor text.
//! - **Money**: players hold serial-numbered bills and coins; transfers between players are atomic.
//! - **Non-blocking output**: each session has a bounded outbound queue, so a slow client never stalls others.
//! - **Ghouls**: NPCs that wander on a timer and occasionally snatch an item.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use tinyworld::config::Config;
//! use tinyworld::server::WorldServer;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("config.toml").await?;
//!     let server = WorldServer::load(config)?;
//!     server.run().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! - [`world`] - rooms, players, money, NPCs and the command set
//! - [`server`] - TCP sessions and background maintenance
//! - [`config`] - configuration loading and validation
//! - [`metrics`] - process-wide counters
//! - [`logutil`] - escaping player text for logs

pub mod config;
pub mod logutil;
pub mod metrics;
pub mod server;
pub mod world;
