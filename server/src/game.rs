//! Match lifecycle state machine and the per-tick simulation step.
//!
//! All registries and the single optional match live behind [`GameState`];
//! every mutation goes through its methods, so as long as one task owns the
//! value, handler and tick logic can never interleave mid-update.

use crate::physics::{clamp_paddle_y, Ball, Paddle};
use log::info;
use rand::Rng;
use shared::{BallPoint, Frame, FIELD_WIDTH, PADDLE_PADDING, WINNING_SCORE};
use std::time::{Duration, Instant};

/// One of the two ordered player slots in an active match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Seat {
    Left,
    Right,
}

/// A joined player. Records are only ever removed by the full registry reset
/// at match teardown, never on disconnect.
#[derive(Debug, Clone)]
pub struct PlayerRecord {
    pub name: String,
    pub in_game: bool,
}

/// Display-name keyed roster of joined players, in registration order.
#[derive(Debug, Default)]
pub struct PlayerRegistry {
    players: Vec<PlayerRecord>,
}

impl PlayerRegistry {
    /// Adds a player under `name`. Returns false if the name is already
    /// taken (idempotent join — the duplicate is a silent no-op).
    pub fn register(&mut self, name: &str) -> bool {
        if self.players.iter().any(|player| player.name == name) {
            return false;
        }
        self.players.push(PlayerRecord {
            name: name.to_string(),
            in_game: false,
        });
        true
    }

    pub fn get(&self, name: &str) -> Option<&PlayerRecord> {
        self.players.iter().find(|player| player.name == name)
    }

    fn mark_in_game(&mut self, name: &str) {
        if let Some(player) = self.players.iter_mut().find(|player| player.name == name) {
            player.in_game = true;
        }
    }

    /// Registered display names, oldest first.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.players.iter().map(|player| player.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    pub fn clear(&mut self) {
        self.players.clear();
    }
}

/// The single active match: seats, paddles, ball, and scores.
#[derive(Debug)]
pub struct MatchState {
    /// Seat order: index 0 is the left seat, index 1 the right.
    pub players: [String; 2],
    pub left_paddle: Paddle,
    pub right_paddle: Paddle,
    pub ball: Ball,
    pub left_score: u32,
    pub right_score: u32,
    pub last_tick: Instant,
}

/// Result of advancing the simulation by one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    Running,
    Ended { winner: Seat },
}

impl MatchState {
    pub fn new(players: [String; 2], rng: &mut impl Rng) -> Self {
        MatchState {
            players,
            left_paddle: Paddle::new(PADDLE_PADDING),
            right_paddle: Paddle::new(FIELD_WIDTH - PADDLE_PADDING),
            ball: Ball::serve(rng),
            left_score: 0,
            right_score: 0,
            last_tick: Instant::now(),
        }
    }

    pub fn seat_of(&self, name: &str) -> Option<Seat> {
        if self.players[0] == name {
            Some(Seat::Left)
        } else if self.players[1] == name {
            Some(Seat::Right)
        } else {
            None
        }
    }

    /// Applies a move command for `name`. Unknown names and non-finite
    /// targets are silent no-ops; the position is clamped into the field.
    /// Last write before a tick wins.
    pub fn move_paddle(&mut self, name: &str, y: f32) {
        if !y.is_finite() {
            return;
        }
        let clamped = clamp_paddle_y(y);
        match self.seat_of(name) {
            Some(Seat::Left) => self.left_paddle.y = clamped,
            Some(Seat::Right) => self.right_paddle.y = clamped,
            None => {}
        }
    }

    /// Advances ball motion, collisions, and scoring by one tick worth
    /// `delta` of the nominal period.
    pub fn step(&mut self, delta: f32, rng: &mut impl Rng) -> StepOutcome {
        self.ball.advance(delta);
        self.ball.bounce_walls();

        if self.ball.dx < 0.0 && self.ball.overlaps(&self.left_paddle) {
            self.ball.deflect(&self.left_paddle, 1.0);
        }
        if self.ball.dx > 0.0 && self.ball.overlaps(&self.right_paddle) {
            self.ball.deflect(&self.right_paddle, -1.0);
        }

        if self.ball.out_left() {
            self.right_score += 1;
            if self.right_score >= WINNING_SCORE {
                return StepOutcome::Ended { winner: Seat::Right };
            }
            self.ball = Ball::respawn_toward(-1.0, rng);
        } else if self.ball.out_right() {
            self.left_score += 1;
            if self.left_score >= WINNING_SCORE {
                return StepOutcome::Ended { winner: Seat::Left };
            }
            self.ball = Ball::respawn_toward(1.0, rng);
        }

        StepOutcome::Running
    }

    /// Rounded state snapshot for broadcasting.
    pub fn snapshot(&self) -> Frame {
        Frame {
            left_paddle: self.left_paddle.y.round() as i32,
            right_paddle: self.right_paddle.y.round() as i32,
            ball: BallPoint {
                x: self.ball.x.round() as i32,
                y: self.ball.y.round() as i32,
            },
            left_score: self.left_score,
            right_score: self.right_score,
        }
    }
}

/// What a join did to the lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinOutcome {
    /// This join completed the pair; a match was created and the caller
    /// must announce it and start the tick.
    MatchStarted,
    /// Registered, still waiting for an opponent (or spectating a match
    /// that is already running).
    Registered,
    /// The name was already taken; nothing changed.
    Duplicate,
}

/// Outcome of one tick at the lifecycle level.
#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    /// No match is active; nothing to do.
    Idle,
    /// The computed delta was not finite; state was left untouched.
    Skipped,
    /// The match goes on; broadcast this snapshot.
    Snapshot(Frame),
    /// The match ended this tick. Broadcast `final_frame`, then the winner
    /// event, then close every connection. Registry and match are already
    /// reset when this is returned.
    Ended {
        final_frame: Frame,
        winner: String,
        winner_name: String,
    },
}

/// Owner of the player roster and the single optional match.
///
/// At most one match exists process-wide; the `Option` here is that
/// invariant made explicit.
#[derive(Debug)]
pub struct GameState {
    registry: PlayerRegistry,
    game: Option<MatchState>,
    tick_period: Duration,
}

impl GameState {
    pub fn new(tick_period: Duration) -> Self {
        GameState {
            registry: PlayerRegistry::default(),
            game: None,
            tick_period,
        }
    }

    /// Registers a join under `name`. Creates the match as a side effect
    /// when the roster reaches exactly two players with no match active.
    pub fn join(&mut self, name: &str, rng: &mut impl Rng) -> JoinOutcome {
        if !self.registry.register(name) {
            return JoinOutcome::Duplicate;
        }

        if self.registry.len() == 2 && self.game.is_none() {
            let seats: Vec<String> = self.registry.names().map(str::to_string).collect();
            let players = [seats[0].clone(), seats[1].clone()];
            self.registry.mark_in_game(&players[0]);
            self.registry.mark_in_game(&players[1]);
            info!("match started: {} vs {}", players[0], players[1]);
            self.game = Some(MatchState::new(players, rng));
            return JoinOutcome::MatchStarted;
        }

        JoinOutcome::Registered
    }

    /// Routes a paddle move into the active match, if any.
    pub fn move_paddle(&mut self, name: &str, y: f32) {
        if let Some(game) = self.game.as_mut() {
            game.move_paddle(name, y);
        }
    }

    /// Runs one simulation tick at `now`. The delta is the elapsed time
    /// since the previous tick normalized by the nominal period; a
    /// non-finite delta skips the tick outright rather than corrupt state.
    pub fn tick(&mut self, now: Instant, rng: &mut impl Rng) -> TickOutcome {
        let Some(game) = self.game.as_mut() else {
            return TickOutcome::Idle;
        };

        let delta = now.duration_since(game.last_tick).as_secs_f32()
            / self.tick_period.as_secs_f32();
        game.last_tick = now;
        if !delta.is_finite() {
            return TickOutcome::Skipped;
        }

        match game.step(delta, rng) {
            StepOutcome::Running => TickOutcome::Snapshot(game.snapshot()),
            StepOutcome::Ended { winner } => {
                let final_frame = game.snapshot();
                let winner = match winner {
                    Seat::Left => game.players[0].clone(),
                    Seat::Right => game.players[1].clone(),
                };
                let winner_name = self
                    .registry
                    .get(&winner)
                    .map(|player| player.name.clone())
                    .unwrap_or_else(|| "Unknown".to_string());
                info!("match ended: {winner_name} wins");
                self.registry.clear();
                self.game = None;
                TickOutcome::Ended {
                    final_frame,
                    winner,
                    winner_name,
                }
            }
        }
    }

    pub fn is_active(&self) -> bool {
        self.game.is_some()
    }

    pub fn player_count(&self) -> usize {
        self.registry.len()
    }

    pub fn registry(&self) -> &PlayerRegistry {
        &self.registry
    }

    pub fn active_match(&self) -> Option<&MatchState> {
        self.game.as_ref()
    }

    pub fn active_match_mut(&mut self) -> Option<&mut MatchState> {
        self.game.as_mut()
    }
}
