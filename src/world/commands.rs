//! Command parsing and dispatch for a single player.
//!
//! The session layer hands every input line to [`parse_command`] and then
//! [`execute`]. All results are written to the acting player's sink or
//! broadcast to the room; nothing here touches the transport.

use log::debug;

use super::direction::Direction;
use super::errors::WorldError;
use super::player::Player;
use super::registry::World;
use crate::logutil::escape_log;

/// Parsed player input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorldCommand {
    // Navigation
    Look,
    Left,
    Right,
    Move(Option<Direction>), // MOVE, MOVE N, or bare N/S/E/W

    // Items and money
    Take(String),
    Drop(String),
    Inventory,
    Money,
    Give(String, u32),

    // Social
    Say(String),
    Whisper(String, String),
    Reply(String),
    Who,

    // System
    Help,
    Quit,
    Invalid(String), // recognised verb, bad arguments; carries usage text
    Unknown(String),
}

/// Whether the session should keep reading input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandFlow {
    Continue,
    Quit,
}

const HELP_TEXT: &str = "Commands: LOOK, LEFT, RIGHT, MOVE [N|S|E|W], TAKE <item>, DROP <item>, \
INVENTORY, MONEY, GIVE <player> <dollars>, SAY <text>, WHISPER <player> <text>, REPLY <text>, \
WHO, HELP, QUIT";

/// Parse one input line. Verbs are case-insensitive; arguments keep their case.
pub fn parse_command(input: &str) -> WorldCommand {
    let input = input.trim();
    let (verb, rest) = match input.split_once(char::is_whitespace) {
        Some((verb, rest)) => (verb, rest.trim()),
        None => (input, ""),
    };

    match verb.to_ascii_uppercase().as_str() {
        "L" | "LOOK" => WorldCommand::Look,
        "LEFT" => WorldCommand::Left,
        "RIGHT" => WorldCommand::Right,
        "N" | "NORTH" | "S" | "SOUTH" | "E" | "EAST" | "W" | "WEST" => {
            WorldCommand::Move(verb.parse().ok())
        }
        "M" | "MOVE" | "GO" => {
            if rest.is_empty() {
                WorldCommand::Move(None)
            } else {
                match rest.parse() {
                    Ok(direction) => WorldCommand::Move(Some(direction)),
                    Err(_) => WorldCommand::Invalid("Usage: MOVE [N|S|E|W]".to_string()),
                }
            }
        }
        "T" | "TAKE" | "GET" | "PICKUP" => {
            if rest.is_empty() {
                WorldCommand::Invalid("Take what?".to_string())
            } else {
                WorldCommand::Take(rest.to_string())
            }
        }
        "D" | "DROP" => {
            if rest.is_empty() {
                WorldCommand::Invalid("Drop what?".to_string())
            } else {
                WorldCommand::Drop(rest.to_string())
            }
        }
        "I" | "INV" | "INVENTORY" => WorldCommand::Inventory,
        "$" | "MONEY" | "WALLET" => WorldCommand::Money,
        "GIVE" => parse_give(rest),
        "'" | "SAY" => {
            if rest.is_empty() {
                WorldCommand::Invalid("Say what?".to_string())
            } else {
                WorldCommand::Say(rest.to_string())
            }
        }
        "WHISPER" => match rest.split_once(char::is_whitespace) {
            Some((target, text)) if !text.trim().is_empty() => {
                WorldCommand::Whisper(target.to_string(), text.trim().to_string())
            }
            _ => WorldCommand::Invalid("Usage: WHISPER <player> <text>".to_string()),
        },
        "R" | "REPLY" => {
            if rest.is_empty() {
                WorldCommand::Invalid("Usage: REPLY <text>".to_string())
            } else {
                WorldCommand::Reply(rest.to_string())
            }
        }
        "WHO" => WorldCommand::Who,
        "H" | "?" | "HELP" => WorldCommand::Help,
        "Q" | "QUIT" | "EXIT" => WorldCommand::Quit,
        _ => WorldCommand::Unknown(input.to_string()),
    }
}

fn parse_give(rest: &str) -> WorldCommand {
    let usage = || WorldCommand::Invalid("Usage: GIVE <player> <dollars>".to_string());
    let mut parts = rest.split_whitespace();
    let (Some(target), Some(amount), None) = (parts.next(), parts.next(), parts.next()) else {
        return usage();
    };
    match amount.trim_start_matches('$').parse::<u32>() {
        Ok(amount) => WorldCommand::Give(target.to_string(), amount),
        Err(_) => usage(),
    }
}

/// Apply a parsed command on behalf of `player`.
pub fn execute(world: &World, player: &Player, command: WorldCommand) -> CommandFlow {
    debug!(
        target: "tinyworld::session",
        "{} -> {:?}",
        escape_log(&player.name()),
        command
    );
    match command {
        WorldCommand::Look => look(world, player),
        WorldCommand::Left => {
            let facing = player.rotate_left();
            player.send(&format!("You are now facing {}.", facing));
        }
        WorldCommand::Right => {
            let facing = player.rotate_right();
            player.send(&format!("You are now facing {}.", facing));
        }
        WorldCommand::Move(direction) => move_player(world, player, direction),
        WorldCommand::Take(name) => take(world, player, &name),
        WorldCommand::Drop(name) => drop_item(world, player, &name),
        WorldCommand::Inventory => {
            player.send(&format!("You are carrying:{}", player.view_inventory()));
        }
        WorldCommand::Money => {
            player.send(&format!("You have {}.", player.view_money()));
        }
        WorldCommand::Give(target, amount) => give(world, player, &target, amount),
        WorldCommand::Say(text) => say(world, player, &text),
        WorldCommand::Whisper(target, text) => whisper(world, player, &target, &text),
        WorldCommand::Reply(text) => match player.last_whisper_name() {
            Some(target) => whisper(world, player, &target, &text),
            None => {
                player.send("You have no one to reply to.");
            }
        },
        WorldCommand::Who => who(world, player),
        WorldCommand::Help => {
            player.send(HELP_TEXT);
        }
        WorldCommand::Quit => {
            player.send("Goodbye.");
            return CommandFlow::Quit;
        }
        WorldCommand::Invalid(usage) => {
            player.send(&usage);
        }
        WorldCommand::Unknown(input) => {
            player.send(&format!("Unknown command: {}. Type HELP.", input));
        }
    }
    CommandFlow::Continue
}

fn look(world: &World, player: &Player) {
    match world.room(player.room()) {
        Some(room) => {
            player.send(&room.describe(world, player));
        }
        None => {
            player.send("You are nowhere at all.");
        }
    }
}

fn move_player(world: &World, player: &Player, direction: Option<Direction>) {
    if let Some(direction) = direction {
        player.set_direction(direction);
    }
    let direction = player.direction();
    let Some(here) = world.room(player.room()) else {
        player.send("You are nowhere at all.");
        return;
    };

    if !here.can_exit(direction) {
        let message = here
            .exit_message(direction)
            .unwrap_or("You can't go that way.");
        player.send(message);
        return;
    }

    let target = here.link(direction);
    let Some(there) = world.room(target) else {
        player.send("That way leads nowhere.");
        return;
    };

    let name = player.name();
    here.broadcast_to_others(world, &format!("{} leaves to the {}.", name, direction), player);
    if let Some(message) = here.exit_message(direction) {
        player.send(message);
    }
    player.set_room(target);
    there.broadcast_to_others(
        world,
        &format!("{} arrives from the {}.", name, direction.opposite()),
        player,
    );
    player.send(&there.describe(world, player));
}

fn take(world: &World, player: &Player, name: &str) {
    let Some(room) = world.room(player.room()) else {
        return;
    };
    match room.remove_item(name) {
        Some(item) => {
            player.send(&format!("You pick up the {}.", item));
            room.broadcast_to_others(
                world,
                &format!("{} picks up the {}.", player.name(), item),
                player,
            );
            player.add_item(item);
        }
        None => {
            player.send(&format!("There is no {} here.", name));
        }
    }
}

fn drop_item(world: &World, player: &Player, name: &str) {
    let Some(room) = world.room(player.room()) else {
        return;
    };
    match player.remove_item(name) {
        Some(item) => {
            player.send(&format!("You drop the {}.", item));
            room.broadcast_to_others(
                world,
                &format!("{} drops the {}.", player.name(), item),
                player,
            );
            room.deposit_item(item);
        }
        None => {
            player.send(&format!("You don't have a {}.", name));
        }
    }
}

fn give(world: &World, player: &Player, target: &str, amount: u32) {
    let Some(receiver) = world.find_player(target) else {
        player.send(&format!("No one named {} is here.", target));
        return;
    };
    if receiver.room() != player.room() {
        player.send(&format!("{} is not here.", receiver.name()));
        return;
    }
    if let Err(err) = player.transfer_to(&receiver, amount) {
        debug!(
            target: "tinyworld::money",
            "give from {} failed: {}",
            escape_log(&player.name()),
            err
        );
    }
}

fn say(world: &World, player: &Player, text: &str) {
    player.send(&format!("You say: {}", text));
    if let Some(room) = world.room(player.room()) {
        room.broadcast_to_others(world, &format!("{} says: {}", player.name(), text), player);
    }
}

fn whisper(world: &World, player: &Player, target: &str, text: &str) {
    let result = world
        .find_player(target)
        .ok_or_else(|| WorldError::PlayerNotFound(target.to_string()));
    match result {
        Ok(receiver) if receiver.id() == player.id() => {
            player.send("You mutter to yourself.");
        }
        Ok(receiver) => {
            let name = player.name();
            receiver.set_last_whisper_name(&name);
            receiver.send(&format!("{} whispers to you: {}", name, text));
            player.send(&format!("You whisper to {}: {}", receiver.name(), text));
        }
        Err(err) => {
            debug!(target: "tinyworld::session", "whisper failed: {}", err);
            player.send(&format!("No one named {} is online.", target));
        }
    }
}

fn who(world: &World, player: &Player) {
    let players = world.players();
    let mut lines = vec![format!("{} player(s) online:", players.len())];
    for other in players {
        let place = world
            .room(other.room())
            .map(|room| room.title().to_string())
            .unwrap_or_else(|| "somewhere".to_string());
        lines.push(format!("  {} - {}", other.name(), place));
    }
    player.send(&lines.join("\n"));
}
