//! TCP front end for the shared world.
//!
//! One task per connection reads command lines and runs them against the
//! [`World`]; a second task per connection drains that player's output sink
//! onto the socket. A maintenance task reaps dead sessions and drives NPCs.
//!
//! ```rust,no_run
//! use tinyworld::config::Config;
//! use tinyworld::server::WorldServer;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let server = WorldServer::load(Config::default())?;
//!     server.run().await
//! }
//! ```

use anyhow::{anyhow, Result};
use log::{debug, info, warn};
use std::future::Future;
use std::io;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::OwnedWriteHalf;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time;

use crate::config::Config;
use crate::logutil::escape_log;
use crate::metrics;
use crate::world::{
    canonical_world_seed, execute, load_world_seed, parse_command, CommandFlow, OutputSink, World,
    WorldCommand, WorldError,
};

/// Longest accepted player name.
pub const MAX_NAME_LEN: usize = 20;

const WELCOME: &str = "Welcome to tinyworld! What is your name?";
const WORLD_FULL: &str = "The world is full. Try again later.";
const NAME_TAKEN: &str = "Someone by that name is already here.";
const LOGIN_TIMED_OUT: &str = "Timed out waiting for a name. Goodbye.";
const REAP_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy)]
struct SessionLimits {
    max_sessions: usize,
    output_buffer: usize,
    write_timeout: Duration,
    login_timeout: Duration,
}

impl SessionLimits {
    fn from_config(config: &Config) -> Self {
        Self {
            max_sessions: config.server.max_sessions,
            output_buffer: config.server.output_buffer,
            write_timeout: Duration::from_millis(config.server.write_timeout_ms),
            login_timeout: Duration::from_millis(config.server.login_timeout_ms),
        }
    }
}

pub struct WorldServer {
    config: Config,
    world: Arc<World>,
}

impl WorldServer {
    pub fn new(config: Config, world: World) -> Self {
        Self {
            config,
            world: Arc::new(world),
        }
    }

    /// Build the world named by `config.world`: the seed file when present,
    /// otherwise the built-in world. A configured start room overrides the seed's.
    pub fn load(config: Config) -> Result<Self> {
        config.validate()?;
        let seed_path = Path::new(&config.world.seed_path);
        let mut seed = if seed_path.exists() {
            info!("Loading world seed from {}", seed_path.display());
            load_world_seed(seed_path)?
        } else {
            warn!(
                "World seed {} not found; using the built-in world",
                seed_path.display()
            );
            canonical_world_seed()?
        };
        if let Some(start) = config.world.start_room {
            seed.start_room = start;
        }
        let world = seed.build(config.world.starting_dollars)?;
        Ok(Self::new(config, world))
    }

    /// Read the configuration at `path` (defaults when absent) and load its world.
    pub async fn from_config_path(path: &str) -> Result<Self> {
        let config = Config::load_or_default(path).await?;
        Self::load(config)
    }

    pub fn world(&self) -> Arc<World> {
        self.world.clone()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Bind the configured address and serve until Ctrl-C.
    pub async fn run(&self) -> Result<()> {
        let listener = TcpListener::bind(&self.config.server.bind)
            .await
            .map_err(|e| anyhow!("Failed to bind {}: {}", self.config.server.bind, e))?;
        self.serve(listener).await
    }

    /// Serve on an already-bound listener until Ctrl-C.
    pub async fn serve(&self, listener: TcpListener) -> Result<()> {
        self.serve_until(listener, async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await
    }

    /// Serve on `listener` until `shutdown` resolves.
    pub async fn serve_until<F>(&self, listener: TcpListener, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        info!("tinyworld listening on {}", listener.local_addr()?);
        let limits = SessionLimits::from_config(&self.config);
        let pending = Arc::new(AtomicUsize::new(0));
        let maintenance = spawn_maintenance(
            self.world.clone(),
            Duration::from_millis(self.config.server.npc_tick_ms),
        );

        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                accepted = listener.accept() => {
                    match accepted {
                        Ok((stream, peer)) => {
                            debug!(target: "tinyworld::session", "connection from {}", peer);
                            let world = self.world.clone();
                            let login = PendingLogin::new(&pending);
                            tokio::spawn(async move {
                                if let Err(e) = handle_connection(world, stream, limits, login).await {
                                    debug!(target: "tinyworld::session", "session {} ended: {}", peer, e);
                                }
                            });
                        }
                        Err(e) => warn!("accept failed: {}", e),
                    }
                }
                _ = &mut shutdown => {
                    info!("Received shutdown signal");
                    break;
                }
            }
        }

        maintenance.abort();
        for player in self.world.players() {
            player.send("The world is shutting down. Goodbye.");
            player.disconnect();
        }
        let m = metrics::snapshot();
        info!(
            "metrics: joined={} left={} peak={} broadcasts={} delivered={} dropped={} transfers={} rejected={}",
            m.sessions_joined,
            m.sessions_left,
            m.sessions_peak,
            m.broadcasts,
            m.lines_delivered,
            m.lines_dropped,
            m.transfers_completed,
            m.transfers_rejected
        );
        Ok(())
    }
}

/// Reap closed sessions every second and let NPCs act every `npc_tick`.
fn spawn_maintenance(world: Arc<World>, npc_tick: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut reap = time::interval(REAP_INTERVAL);
        reap.set_missed_tick_behavior(time::MissedTickBehavior::Delay);
        // A zero tick disables NPCs; the interval still needs a non-zero period.
        let npcs_enabled = !npc_tick.is_zero();
        let mut npc = time::interval(if npcs_enabled { npc_tick } else { REAP_INTERVAL });
        npc.set_missed_tick_behavior(time::MissedTickBehavior::Delay);
        npc.tick().await;

        loop {
            tokio::select! {
                _ = reap.tick() => {
                    for player in world.reap_disconnected() {
                        if let Some(room) = world.room(player.room()) {
                            room.broadcast(&world, &format!("{} has vanished.", player.name()));
                        }
                    }
                }
                _ = npc.tick(), if npcs_enabled => {
                    for actor in world.npcs() {
                        actor.act(&world);
                    }
                }
            }
        }
    })
}

/// Reason a proposed name is unacceptable, if any.
pub fn name_rejection(world: &World, name: &str) -> Option<&'static str> {
    if name.is_empty() {
        Some("Your name cannot be empty.")
    } else if name.chars().count() > MAX_NAME_LEN {
        Some("That name is too long (20 characters at most).")
    } else if !name.chars().all(|c| c.is_ascii_alphanumeric()) {
        Some("Names may only contain letters and digits.")
    } else if world.is_name_taken(name) {
        Some(NAME_TAKEN)
    } else {
        None
    }
}

/// Marks a connection that has not yet picked a name. Such connections count
/// toward `max_sessions` until the guard is dropped.
struct PendingLogin {
    counter: Arc<AtomicUsize>,
}

impl PendingLogin {
    fn new(counter: &Arc<AtomicUsize>) -> Self {
        counter.fetch_add(1, Ordering::AcqRel);
        Self {
            counter: counter.clone(),
        }
    }

    /// Connections at the name prompt, this one included.
    fn waiting(&self) -> usize {
        self.counter.load(Ordering::Acquire)
    }
}

impl Drop for PendingLogin {
    fn drop(&mut self) {
        self.counter.fetch_sub(1, Ordering::AcqRel);
    }
}

async fn write_line(wr: &mut OwnedWriteHalf, line: &str, limit: Duration) -> io::Result<()> {
    let mut buf = Vec::with_capacity(line.len() + 1);
    buf.extend_from_slice(line.as_bytes());
    buf.push(b'\n');
    match time::timeout(limit, wr.write_all(&buf)).await {
        Ok(result) => result,
        Err(_) => Err(io::Error::new(io::ErrorKind::TimedOut, "write timed out")),
    }
}

/// Drain a session's output onto its socket until the sink's senders are gone
/// or a write fails. Dropping `rx` on return closes the sink for the registry.
async fn write_lines(
    mut wr: OwnedWriteHalf,
    mut rx: mpsc::Receiver<String>,
    limit: Duration,
) -> io::Result<()> {
    while let Some(line) = rx.recv().await {
        write_line(&mut wr, &line, limit).await?;
    }
    let _ = wr.shutdown().await;
    Ok(())
}

async fn handle_connection(
    world: Arc<World>,
    stream: TcpStream,
    limits: SessionLimits,
    login: PendingLogin,
) -> Result<()> {
    let (rd, mut wr) = stream.into_split();
    let mut lines = BufReader::new(rd).lines();

    if world.player_count() + login.waiting() > limits.max_sessions {
        warn!(
            target: "tinyworld::session",
            "rejecting connection: {} sessions already active or logging in",
            limits.max_sessions
        );
        write_line(&mut wr, WORLD_FULL, limits.write_timeout).await?;
        return Ok(());
    }

    write_line(&mut wr, WELCOME, limits.write_timeout).await?;
    let deadline = time::Instant::now() + limits.login_timeout;
    let (player, rx) = loop {
        let line = match time::timeout_at(deadline, lines.next_line()).await {
            Ok(line) => line?,
            Err(_) => {
                debug!(target: "tinyworld::session", "login timed out");
                write_line(&mut wr, LOGIN_TIMED_OUT, limits.write_timeout).await?;
                return Ok(());
            }
        };
        let Some(line) = line else {
            return Ok(());
        };
        let candidate = line.trim();
        let reason = match name_rejection(&world, candidate) {
            Some(reason) => reason,
            None => {
                let (sink, rx) = OutputSink::channel(limits.output_buffer);
                match world.try_join(candidate, sink, limits.max_sessions) {
                    Ok(player) => break (player, rx),
                    Err(WorldError::NameTaken(_)) => NAME_TAKEN,
                    Err(WorldError::WorldFull(_)) => {
                        write_line(&mut wr, WORLD_FULL, limits.write_timeout).await?;
                        return Ok(());
                    }
                    Err(e) => return Err(e.into()),
                }
            }
        };
        write_line(&mut wr, reason, limits.write_timeout).await?;
        write_line(&mut wr, "What is your name?", limits.write_timeout).await?;
    };
    drop(login);
    let name = player.name();

    let mut writer = tokio::spawn(write_lines(wr, rx, limits.write_timeout));

    if let Some(room) = world.room(player.room()) {
        room.broadcast_to_others(&world, &format!("{} has arrived.", name), &player);
    }
    execute(&world, &player, WorldCommand::Look);

    let mut writer_done = false;
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let line = match line {
                    Ok(Some(line)) => line,
                    Ok(None) => break,
                    Err(e) => {
                        debug!(target: "tinyworld::session", "read error for {}: {}", escape_log(&name), e);
                        break;
                    }
                };
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                if execute(&world, &player, parse_command(line)) == CommandFlow::Quit {
                    break;
                }
            }
            result = &mut writer => {
                writer_done = true;
                if let Ok(Err(e)) = result {
                    warn!(target: "tinyworld::session", "output to {} failed: {}", escape_log(&name), e);
                }
                break;
            }
        }
    }

    let room = player.room();
    if world.leave(&player) {
        if let Some(room) = world.room(room) {
            room.broadcast(&world, &format!("{} has left.", name));
        }
    }
    // Dropping the last handle to the player drops its sender, letting the
    // writer flush what is queued and finish.
    drop(player);

    if !writer_done && time::timeout(limits.write_timeout, &mut writer).await.is_err() {
        writer.abort();
    }
    Ok(())
}
