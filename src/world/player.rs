//! Connected player state.
//!
//! A [`Player`] is shared as `Arc<Player>` between its session task, the world
//! registry and any room broadcast iterating the registry. All mutable state
//! sits behind one per-player mutex; the output sink lives outside it so that
//! sending never happens while world state is locked.

use log::{debug, info, warn};
use rand::Rng;
use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};

use super::direction::Direction;
use super::errors::WorldError;
use super::money::Money;
use super::output::{Delivery, OutputSink};
use super::types::{take_first_match, Item, PlayerId, RoomId};
use crate::logutil::escape_log;
use crate::metrics;

#[derive(Debug)]
struct PlayerState {
    name: String,
    room: RoomId,
    direction: Direction,
    inventory: Vec<Item>,
    money: Money,
    last_whisper: Option<String>,
}

#[derive(Debug)]
pub struct Player {
    id: PlayerId,
    state: Mutex<PlayerState>,
    output: OutputSink,
}

/// Result of a completed whole-unit transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferReceipt {
    pub amount: u32,
    pub giver_remaining: Money,
    pub receiver_total: Money,
}

impl Player {
    pub fn new(
        id: PlayerId,
        name: &str,
        room: RoomId,
        money: Money,
        output: OutputSink,
    ) -> Self {
        Self {
            id,
            state: Mutex::new(PlayerState {
                name: name.to_string(),
                room,
                direction: Direction::North,
                inventory: Vec::new(),
                money,
                last_whisper: None,
            }),
            output,
        }
    }

    fn state(&self) -> MutexGuard<'_, PlayerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn id(&self) -> PlayerId {
        self.id
    }

    // ========================================================================
    // Identity
    // ========================================================================

    pub fn name(&self) -> String {
        self.state().name.clone()
    }

    pub fn set_name(&self, name: &str) {
        self.state().name = name.to_string();
    }

    pub fn last_whisper_name(&self) -> Option<String> {
        self.state().last_whisper.clone()
    }

    pub fn set_last_whisper_name(&self, name: &str) {
        self.state().last_whisper = Some(name.to_string());
    }

    // ========================================================================
    // Facing and location
    // ========================================================================

    pub fn direction(&self) -> Direction {
        self.state().direction
    }

    pub fn set_direction(&self, direction: Direction) {
        self.state().direction = direction;
    }

    /// Turn one step counter-clockwise; returns the new facing.
    pub fn rotate_left(&self) -> Direction {
        let mut state = self.state();
        state.direction = state.direction.left();
        state.direction
    }

    /// Turn one step clockwise; returns the new facing.
    pub fn rotate_right(&self) -> Direction {
        let mut state = self.state();
        state.direction = state.direction.right();
        state.direction
    }

    pub fn room(&self) -> RoomId {
        self.state().room
    }

    /// The only way a player changes rooms. Room occupancy is derived from this field.
    pub fn set_room(&self, room: RoomId) {
        let mut state = self.state();
        debug!(
            target: "tinyworld::world",
            "{} moves from room {} to room {}",
            escape_log(&state.name),
            state.room,
            room
        );
        state.room = room;
    }

    // ========================================================================
    // Inventory
    // ========================================================================

    pub fn add_item(&self, item: Item) {
        self.state().inventory.push(item);
    }

    /// Remove the first item whose name matches case-insensitively.
    pub fn remove_item(&self, name: &str) -> Option<Item> {
        take_first_match(&mut self.state().inventory, name)
    }

    /// Remove a uniformly random item. An empty inventory is reported, not an error.
    pub fn remove_random_item(&self) -> String {
        let mut state = self.state();
        if state.inventory.is_empty() {
            return "You have no items in your inventory.".to_string();
        }
        let index = rand::thread_rng().gen_range(0..state.inventory.len());
        let item = state.inventory.remove(index);
        format!("{} was removed from your inventory.", item.name)
    }

    pub fn inventory(&self) -> Vec<Item> {
        self.state().inventory.clone()
    }

    pub fn view_inventory(&self) -> String {
        let state = self.state();
        if state.inventory.is_empty() {
            return " nothing.".to_string();
        }
        let mut result = String::new();
        for item in &state.inventory {
            result.push(' ');
            result.push_str(&item.name);
        }
        result.push('.');
        result
    }

    // ========================================================================
    // Money
    // ========================================================================

    /// Snapshot of the player's money bag.
    pub fn money(&self) -> Money {
        self.state().money.clone()
    }

    pub fn view_money(&self) -> String {
        self.state().money.describe()
    }

    /// Merge an incoming bag into this player's money.
    pub fn deposit(&self, money: Money) {
        self.state().money.merge(money);
    }

    /// Mint and deposit `cents` worth of tokens.
    pub fn add_money(&self, cents: u64) {
        self.deposit(Money::from_cents(cents));
    }

    /// Move `whole_units` dollar tokens from this player to `receiver`.
    ///
    /// Both players are locked in ascending id order for the duration of the
    /// move, so concurrent transfers touching either party are serialized.
    /// Notifications go out after both locks are released.
    pub fn transfer_to(
        &self,
        receiver: &Player,
        whole_units: u32,
    ) -> Result<TransferReceipt, WorldError> {
        if self.id == receiver.id {
            self.send("You can't give money to yourself.");
            return Err(WorldError::SelfTransfer);
        }
        if whole_units == 0 {
            self.send("You must give at least one dollar.");
            return Err(WorldError::InvalidAmount(
                "transfer amount must be positive".to_string(),
            ));
        }

        let outcome = {
            let (mut giver, mut taker) = lock_pair(self, receiver);
            let available = giver.money.dollar_count();
            match giver.money.take_dollars(whole_units) {
                Some(tokens) => {
                    taker.money.merge(tokens);
                    Ok((
                        giver.name.clone(),
                        taker.name.clone(),
                        TransferReceipt {
                            amount: whole_units,
                            giver_remaining: giver.money.clone(),
                            receiver_total: taker.money.clone(),
                        },
                    ))
                }
                None => Err(available),
            }
        };

        match outcome {
            Ok((giver_name, receiver_name, receipt)) => {
                metrics::inc_transfers_completed();
                info!(
                    target: "tinyworld::money",
                    "transfer {} -> {} amount={} giver_left={}",
                    escape_log(&giver_name),
                    escape_log(&receiver_name),
                    whole_units,
                    receipt.giver_remaining
                );
                self.send(&format!(
                    "You gave {} {} to {}.",
                    whole_units,
                    dollars_word(whole_units),
                    receiver_name
                ));
                receiver.send(&format!(
                    "You received {} {} from {}!",
                    whole_units,
                    dollars_word(whole_units),
                    giver_name
                ));
                Ok(receipt)
            }
            Err(available) => {
                metrics::inc_transfers_rejected();
                warn!(
                    target: "security",
                    "transfer rejected: {} requested {} with {} available",
                    escape_log(&self.name()),
                    whole_units,
                    available
                );
                self.send(&format!(
                    "Not enough money! You have {} {} in bills.",
                    available,
                    dollars_word(available)
                ));
                Err(WorldError::InsufficientFunds {
                    requested: whole_units,
                    available,
                })
            }
        }
    }

    // ========================================================================
    // Output
    // ========================================================================

    /// Write one line to this player's session. Failures are logged and reported.
    pub fn send(&self, message: &str) -> Delivery {
        let name = self.name();
        self.output.send(&name, message)
    }

    pub fn is_connected(&self) -> bool {
        !self.output.is_closed()
    }

    /// Close the session side of the sink; the registry will reap this player.
    pub fn disconnect(&self) {
        self.output.close();
    }
}

impl fmt::Display for Player {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state();
        write!(f, "Player {}: {}", state.name, state.direction)
    }
}

/// Lock two distinct players in ascending id order, returning guards as `(a, b)`.
fn lock_pair<'a>(
    a: &'a Player,
    b: &'a Player,
) -> (MutexGuard<'a, PlayerState>, MutexGuard<'a, PlayerState>) {
    if a.id < b.id {
        let first = a.state();
        let second = b.state();
        (first, second)
    } else {
        let first = b.state();
        let second = a.state();
        (second, first)
    }
}

fn dollars_word(count: u32) -> &'static str {
    if count == 1 {
        "dollar"
    } else {
        "dollars"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc::Receiver;

    fn player(id: PlayerId, name: &str, dollars: u32) -> (Player, Receiver<String>) {
        let (sink, rx) = OutputSink::channel(16);
        (Player::new(id, name, 1, Money::with_dollars(dollars), sink), rx)
    }

    fn drain(rx: &mut Receiver<String>) -> Vec<String> {
        let mut lines = Vec::new();
        while let Ok(line) = rx.try_recv() {
            lines.push(line);
        }
        lines
    }

    #[test]
    fn starts_facing_north() {
        let (alice, _rx) = player(1, "Alice", 20);
        assert_eq!(alice.direction(), Direction::North);
        assert_eq!(alice.rotate_left(), Direction::West);
        assert_eq!(alice.rotate_right(), Direction::North);
        assert_eq!(alice.to_string(), "Player Alice: North");
    }

    #[test]
    fn remove_item_is_case_insensitive() {
        let (alice, _rx) = player(1, "Alice", 0);
        alice.add_item(Item::new("Sword"));
        let removed = alice.remove_item("sword").unwrap();
        assert_eq!(removed.name, "Sword");
        assert!(alice.remove_item("sword").is_none());
    }

    #[test]
    fn remove_random_item_on_empty_inventory() {
        let (alice, _rx) = player(1, "Alice", 0);
        assert_eq!(
            alice.remove_random_item(),
            "You have no items in your inventory."
        );
        assert!(alice.inventory().is_empty());
    }

    #[test]
    fn remove_random_item_takes_one() {
        let (alice, _rx) = player(1, "Alice", 0);
        alice.add_item(Item::new("Lamp"));
        alice.add_item(Item::new("Rope"));
        let message = alice.remove_random_item();
        assert!(message.ends_with("was removed from your inventory."));
        assert_eq!(alice.inventory().len(), 1);
    }

    #[test]
    fn view_inventory_lists_in_acquisition_order() {
        let (alice, _rx) = player(1, "Alice", 0);
        assert_eq!(alice.view_inventory(), " nothing.");
        alice.add_item(Item::new("Lamp"));
        alice.add_item(Item::new("Rope"));
        alice.add_item(Item::new("Lamp"));
        assert_eq!(alice.view_inventory(), " Lamp Rope Lamp.");
    }

    #[test]
    fn transfer_moves_exact_tokens() {
        let (giver, mut giver_rx) = player(1, "Giver", 20);
        let (receiver, mut receiver_rx) = player(2, "Receiver", 0);
        let moved: Vec<_> = giver.money().dollars()[..5]
            .iter()
            .map(|d| d.serial)
            .collect();

        let receipt = giver.transfer_to(&receiver, 5).unwrap();
        assert_eq!(receipt.amount, 5);
        assert_eq!(giver.money().dollar_count(), 15);
        assert_eq!(receiver.money().dollar_count(), 5);
        let arrived: Vec<_> = receiver.money().dollars().iter().map(|d| d.serial).collect();
        assert_eq!(arrived, moved);

        assert_eq!(drain(&mut giver_rx), vec!["You gave 5 dollars to Receiver."]);
        assert_eq!(
            drain(&mut receiver_rx),
            vec!["You received 5 dollars from Giver!"]
        );
    }

    #[test]
    fn transfer_from_higher_id_works() {
        let (giver, _g) = player(9, "Giver", 3);
        let (receiver, _r) = player(2, "Receiver", 0);
        giver.transfer_to(&receiver, 1).unwrap();
        assert_eq!(giver.money().dollar_count(), 2);
        assert_eq!(receiver.money().dollar_count(), 1);
    }

    #[test]
    fn insufficient_funds_changes_nothing() {
        let (giver, mut giver_rx) = player(1, "Giver", 20);
        let (receiver, mut receiver_rx) = player(2, "Receiver", 0);
        let before = giver.money();

        let err = giver.transfer_to(&receiver, 25).unwrap_err();
        assert!(matches!(
            err,
            WorldError::InsufficientFunds {
                requested: 25,
                available: 20
            }
        ));
        assert_eq!(giver.money(), before);
        assert!(receiver.money().is_empty());
        assert_eq!(
            drain(&mut giver_rx),
            vec!["Not enough money! You have 20 dollars in bills."]
        );
        assert!(drain(&mut receiver_rx).is_empty());
    }

    #[test]
    fn self_transfer_is_rejected() {
        let (alice, _rx) = player(1, "Alice", 20);
        assert!(matches!(
            alice.transfer_to(&alice, 1),
            Err(WorldError::SelfTransfer)
        ));
        assert_eq!(alice.money().dollar_count(), 20);
    }

    #[test]
    fn send_after_disconnect_is_closed() {
        let (alice, _rx) = player(1, "Alice", 0);
        alice.disconnect();
        assert!(!alice.is_connected());
        assert_eq!(alice.send("hello"), Delivery::Closed);
    }
}
