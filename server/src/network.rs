//! TCP transport and the core event loop.
//!
//! Transport tasks (accept loop, per-connection reader/writer) never touch
//! game state; they translate bytes into [`Command`]s and forward them over
//! a channel. One task owns [`GameState`] and the [`ConnectionRegistry`] and
//! alternates between draining that channel and firing the simulation tick,
//! so every handler and every tick runs to completion before the next event
//! is processed — the cooperative model the simulation relies on.

use crate::connection::{ConnectionRegistry, PeerMessage};
use crate::game::{GameState, JoinOutcome, TickOutcome};
use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde_json::Value;
use shared::{Broadcast, ClientEvent};
use std::net::SocketAddr;
use std::time::{Duration, Instant};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::time::{Interval, MissedTickBehavior};

/// Commands delivered from transport tasks to the core loop.
#[derive(Debug)]
pub enum Command {
    /// A new peer connected; `id` is its connection ordinal.
    Connected {
        id: u64,
        writer: UnboundedSender<PeerMessage>,
    },
    /// The peer's read side ended (EOF or socket error).
    Disconnected { id: u64 },
    /// One decoded inbound event from the peer.
    Inbound { id: u64, event: ClientEvent },
}

/// The pong server: a listener plus the single task that owns all state.
pub struct Server {
    local_addr: SocketAddr,
    state: GameState,
    peers: ConnectionRegistry,
    tick_period: Duration,
    ticker: Option<Interval>,
    cmd_rx: UnboundedReceiver<Command>,
}

impl Server {
    /// Binds the listener and starts accepting connections. `tick_rate` is
    /// the nominal simulation frequency in ticks per second.
    pub async fn bind(
        addr: &str,
        tick_rate: u32,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let listener = TcpListener::bind(addr).await?;
        let local_addr = listener.local_addr()?;
        info!("pong server listening on {local_addr}");

        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        tokio::spawn(accept_loop(listener, cmd_tx));

        let tick_period =
            Duration::from_millis((1_000 / u64::from(tick_rate.max(1))).max(1));
        Ok(Server {
            local_addr,
            state: GameState::new(tick_period),
            peers: ConnectionRegistry::new(),
            tick_period,
            ticker: None,
            cmd_rx,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Runs the core loop until the command channel closes. Never returns
    /// under normal operation; runtime faults are logged and absorbed.
    pub async fn run(mut self) -> Result<(), Box<dyn std::error::Error>> {
        let mut rng = StdRng::from_entropy();

        loop {
            tokio::select! {
                command = self.cmd_rx.recv() => {
                    match command {
                        Some(command) => self.handle_command(command, &mut rng),
                        None => break,
                    }
                }
                _ = next_tick(&mut self.ticker) => {
                    self.run_tick(&mut rng);
                }
            }
        }

        Ok(())
    }

    fn handle_command(&mut self, command: Command, rng: &mut impl Rng) {
        match command {
            Command::Connected { id, writer } => {
                self.peers.insert(id, writer);
                debug!("registered connection {id} ({} total)", self.peers.len());
            }
            Command::Disconnected { id } => {
                // Transport-level cleanup only: the player roster keeps a
                // name that leaves mid-match until the match ends.
                if self.peers.remove(id) {
                    info!("client {id} disconnected");
                }
            }
            Command::Inbound { id, event } => self.dispatch(id, event, rng),
        }
    }

    /// Routes one decoded client event to its handler.
    fn dispatch(&mut self, id: u64, event: ClientEvent, rng: &mut impl Rng) {
        match event {
            ClientEvent::Join { name } => {
                let name = name.unwrap_or_else(|| format!("Player {id}"));
                match self.state.join(&name, rng) {
                    JoinOutcome::MatchStarted => {
                        self.peers.broadcast(&Broadcast::ready());
                        self.start_ticker();
                    }
                    JoinOutcome::Registered => {
                        debug!("player {name} registered, waiting for an opponent");
                    }
                    JoinOutcome::Duplicate => debug!("player {name} already registered"),
                }
            }
            ClientEvent::Paddle { y, player_name } => {
                self.state.move_paddle(&player_name, y);
            }
            ClientEvent::Spectate => debug!("client {id} spectating"),
            ClientEvent::Ignored => {}
        }
    }

    fn start_ticker(&mut self) {
        let start = tokio::time::Instant::now() + self.tick_period;
        let mut interval = tokio::time::interval_at(start, self.tick_period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        self.ticker = Some(interval);
    }

    fn run_tick(&mut self, rng: &mut impl Rng) {
        match self.state.tick(Instant::now(), rng) {
            TickOutcome::Idle => {}
            TickOutcome::Skipped => debug!("skipped tick: non-finite delta"),
            TickOutcome::Snapshot(frame) => {
                self.peers.broadcast(&Broadcast::Frame(frame));
            }
            TickOutcome::Ended {
                final_frame,
                winner,
                winner_name,
            } => {
                // Clients must see the last frame and the winner before the
                // connections go away; the order here is load-bearing.
                self.peers.broadcast(&Broadcast::Frame(final_frame));
                self.ticker = None;
                self.peers.broadcast(&Broadcast::Winner { winner, winner_name });
                self.peers.close_all();
            }
        }
    }
}

/// Resolves on the next simulation tick, or never while no match is active.
async fn next_tick(ticker: &mut Option<Interval>) {
    match ticker {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending().await,
    }
}

async fn accept_loop(listener: TcpListener, cmd_tx: UnboundedSender<Command>) {
    let mut next_id: u64 = 0;
    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                next_id += 1;
                spawn_connection(next_id, stream, addr, cmd_tx.clone());
            }
            Err(err) => warn!("accept failed: {err}"),
        }
    }
}

fn spawn_connection(
    id: u64,
    stream: TcpStream,
    addr: SocketAddr,
    cmd_tx: UnboundedSender<Command>,
) {
    info!("client {id} connected from {addr}");
    let (read_half, write_half) = stream.into_split();

    let (writer_tx, writer_rx) = mpsc::unbounded_channel();
    if cmd_tx.send(Command::Connected { id, writer: writer_tx }).is_err() {
        return;
    }

    tokio::spawn(write_messages(id, write_half, writer_rx));
    tokio::spawn(async move {
        read_messages(id, read_half, &cmd_tx).await;
        let _ = cmd_tx.send(Command::Disconnected { id });
    });
}

/// Reads the peer's byte stream, splits it into JSON messages, and forwards
/// each decoded event to the core loop. Returns on EOF or socket error.
async fn read_messages(id: u64, mut reader: OwnedReadHalf, cmd_tx: &UnboundedSender<Command>) {
    let mut pending = Vec::new();
    let mut chunk = [0u8; 1024];

    loop {
        match reader.read(&mut chunk).await {
            Ok(0) => {
                debug!("client {id} closed the connection");
                return;
            }
            Ok(n) => {
                pending.extend_from_slice(&chunk[..n]);
                for value in drain_messages(&mut pending) {
                    let event = ClientEvent::decode(value);
                    if cmd_tx.send(Command::Inbound { id, event }).is_err() {
                        return;
                    }
                }
            }
            Err(err) => {
                warn!("client {id} read error: {err}");
                return;
            }
        }
    }
}

/// Splits buffered bytes into complete JSON values (concatenated-JSON
/// framing). A syntactically incomplete tail is kept for the next read; a
/// malformed prefix drops the buffered bytes with a warning and no reply.
fn drain_messages(pending: &mut Vec<u8>) -> Vec<Value> {
    let mut values = Vec::new();
    let mut consumed = 0;

    loop {
        let mut stream =
            serde_json::Deserializer::from_slice(&pending[consumed..]).into_iter::<Value>();
        match stream.next() {
            Some(Ok(value)) => {
                consumed += stream.byte_offset();
                values.push(value);
            }
            Some(Err(err)) if err.is_eof() => break,
            Some(Err(err)) => {
                warn!("bad message, dropping buffer: {err}");
                consumed = pending.len();
                break;
            }
            // Input exhausted; anything left is whitespace
            None => {
                consumed = pending.len();
                break;
            }
        }
    }

    pending.drain(..consumed);
    values
}

/// Drains the peer's writer channel onto the socket. A failed write ends the
/// task; the registry prunes this peer on its next broadcast.
async fn write_messages(
    id: u64,
    mut writer: OwnedWriteHalf,
    mut rx: UnboundedReceiver<PeerMessage>,
) {
    while let Some(message) = rx.recv().await {
        match message {
            PeerMessage::Data(line) => {
                if let Err(err) = writer.write_all(line.as_bytes()).await {
                    warn!("client {id} write failed: {err}");
                    return;
                }
            }
            PeerMessage::Shutdown => {
                let _ = writer.shutdown().await;
                return;
            }
        }
    }
}
