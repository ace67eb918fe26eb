//! # Pong Server Library
//!
//! Authoritative server for two-player pong over raw TCP. The server owns
//! the only copy of the game: clients send join and paddle-move events, the
//! simulation advances on a fixed tick, and every connected peer — players
//! and passive spectators alike — receives the same broadcast stream of
//! state snapshots and lifecycle events.
//!
//! ## Match Lifecycle
//!
//! The process idles until two distinct display names have joined, at which
//! point exactly one match is created and the periodic tick starts. The
//! match runs until one side reaches the winning score; the final frame and
//! the winner event are broadcast, every connection is closed, and the
//! process returns to idle, ready for the next pair. At most one match
//! exists at any time, by design.
//!
//! ## Architecture
//!
//! All game state lives in a single task. Transport tasks (accept loop and
//! per-connection readers/writers) only translate bytes to and from typed
//! messages; they forward inbound events over a channel to the core loop,
//! which `select!`s between that channel and the simulation tick. Each
//! event or tick runs to completion before the next one is processed, so
//! state mutation needs no locks and can never interleave mid-update.
//!
//! ## Module Organization
//!
//! - [`game`] — player registry, match lifecycle state machine, and the
//!   per-tick simulation step.
//! - [`physics`] — ball and paddle geometry: motion, wall bounces, paddle
//!   deflection, scoring bounds.
//! - [`connection`] — registry of connected peers and the broadcast
//!   fan-out primitive.
//! - [`network`] — TCP transport, inbound message framing, and the core
//!   event loop tying everything together.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use server::network::Server;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let server = Server::bind("0.0.0.0:3000", 2).await?;
//!     server.run().await
//! }
//! ```

pub mod connection;
pub mod game;
pub mod network;
pub mod physics;
