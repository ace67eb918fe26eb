use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const FIELD_WIDTH: f32 = 128.0;
pub const FIELD_HEIGHT: f32 = 64.0;
pub const PADDLE_HEIGHT: f32 = 16.0;
pub const PADDLE_WIDTH: f32 = 2.0;
pub const PADDLE_PADDING: f32 = 5.0;
pub const BALL_SIZE: f32 = 2.0;
pub const BALL_SPEED: f32 = 5.0;
pub const BALL_ACCELERATION: f32 = 1.05;
pub const WINNING_SCORE: u32 = 10;

/// Inbound message envelope: `{ "event": "...", "data": { ... } }`.
///
/// Every client message arrives in this shape; the event name selects the
/// handler and `data` is decoded per event.
#[derive(Debug, Deserialize)]
pub struct Envelope {
    pub event: String,
    #[serde(default)]
    pub data: Value,
}

/// A validated client event, one variant per recognized event name.
///
/// Anything that fails to decode — bad envelope, unknown event name, payload
/// of the wrong shape — collapses into [`ClientEvent::Ignored`] instead of a
/// partially-populated value.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientEvent {
    /// `player:join` — register under a display name (absent or empty means
    /// the server assigns a positional placeholder).
    Join { name: Option<String> },
    /// `game:paddle` — move the named player's paddle to `y`.
    Paddle { y: f32, player_name: String },
    /// `game:spectate` — (re)assert interest in the broadcast stream.
    Spectate,
    /// Anything unrecognized or malformed; dropped without a reply.
    Ignored,
}

#[derive(Debug, Default, Deserialize)]
struct JoinPayload {
    #[serde(default)]
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PaddlePayload {
    y: f32,
    player_name: String,
}

impl ClientEvent {
    /// Decodes one parsed JSON value into a client event.
    pub fn decode(raw: Value) -> ClientEvent {
        let envelope: Envelope = match serde_json::from_value(raw) {
            Ok(envelope) => envelope,
            Err(_) => return ClientEvent::Ignored,
        };

        match envelope.event.as_str() {
            "player:join" => {
                let payload: JoinPayload =
                    serde_json::from_value(envelope.data).unwrap_or_default();
                let name = payload.name.filter(|name| !name.is_empty());
                ClientEvent::Join { name }
            }
            "game:paddle" => match serde_json::from_value::<PaddlePayload>(envelope.data) {
                Ok(payload) if payload.y.is_finite() && !payload.player_name.is_empty() => {
                    ClientEvent::Paddle {
                        y: payload.y,
                        player_name: payload.player_name,
                    }
                }
                _ => ClientEvent::Ignored,
            },
            "game:spectate" => ClientEvent::Spectate,
            _ => ClientEvent::Ignored,
        }
    }
}

/// Rounded ball position inside a [`Frame`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BallPoint {
    pub x: i32,
    pub y: i32,
}

/// One state snapshot as broadcast to every connected peer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Frame {
    pub left_paddle: i32,
    pub right_paddle: i32,
    pub ball: BallPoint,
    pub left_score: u32,
    pub right_score: u32,
}

/// Outbound broadcast payloads. Serialized untagged so the wire shapes stay
/// exactly `{"status": ...}`, the bare frame object, and `{"winner": ...}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Broadcast {
    Ready {
        status: String,
    },
    Frame(Frame),
    Winner {
        winner: String,
        #[serde(rename = "winnerName")]
        winner_name: String,
    },
}

impl Broadcast {
    /// The lifecycle event announcing that a match has been created.
    pub fn ready() -> Broadcast {
        Broadcast::Ready {
            status: "game is ready".to_string(),
        }
    }
}
