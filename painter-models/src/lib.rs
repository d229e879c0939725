pub mod protocol;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;

pub use protocol::{ClientMessage, ServerMessage};

pub type GameId = Uuid;
pub type PlayerId = Uuid;
pub type RoomId = Uuid;

pub const MIN_PLAYERS: usize = 3;
pub const MAX_PLAYERS: usize = 10;
pub const DEFAULT_MAX_PLAYERS: usize = 6;

/// Phase durations, in seconds.
pub const INPUT_DURATION: u64 = 60;
pub const DRAW_BASE_DURATION: u64 = 60;
pub const DRAW_DURATION_STEP: u64 = 10;
pub const DRAW_MIN_DURATION: u64 = 20;
pub const GUESS_DURATION: u64 = 20;

pub const MIN_TEXT_LENGTH: usize = 3;
pub const MAX_TEXT_LENGTH: usize = 100;
pub const MIN_NAME_LENGTH: usize = 1;
pub const MAX_NAME_LENGTH: usize = 20;

pub const DEFAULT_CANVAS_WIDTH: u32 = 800;
pub const DEFAULT_CANVAS_HEIGHT: u32 = 600;

pub const MAX_MESSAGE_SIZE: usize = 1024 * 1024;
pub const GAME_CLEANUP_TIMEOUT: Duration = Duration::from_secs(300);

/// Every connection is pinged this often.
pub const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);
/// A connection without a pong for longer than this is dropped.
pub const HEARTBEAT_TIMEOUT: Duration = Duration::from_secs(60);

pub const EXPIRED_PROMPT: &str = "[Time expired - no prompt submitted]";
pub const EXPIRED_GUESS: &str = "[Time expired - no guess submitted]";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum GameState {
    Lobby,
    Started,
    Ended,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Input,
    Draw,
    Guess,
}

impl Phase {
    /// The kind of entry that closes a pass through this phase.
    pub fn entry_type(self) -> EntryType {
        match self {
            Phase::Input => EntryType::Prompt,
            Phase::Draw => EntryType::Drawing,
            Phase::Guess => EntryType::Guess,
        }
    }

    pub fn next(self) -> Phase {
        match self {
            Phase::Input | Phase::Guess => Phase::Draw,
            Phase::Draw => Phase::Guess,
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Phase::Input => "input",
            Phase::Draw => "draw",
            Phase::Guess => "guess",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionStatus {
    Connected,
    Disconnected,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EntryType {
    Prompt,
    Drawing,
    Guess,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ToolType {
    Brush,
    Eraser,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Stroke {
    pub points: Vec<Point>,
    pub color: String,
    pub width: f64,
    pub tool: ToolType,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DrawingData {
    pub strokes: Vec<Stroke>,
    pub width: u32,
    pub height: u32,
}

impl DrawingData {
    /// A blank default-sized canvas.
    pub fn empty() -> Self {
        Self {
            strokes: Vec::new(),
            width: DEFAULT_CANVAS_WIDTH,
            height: DEFAULT_CANVAS_HEIGHT,
        }
    }
}

/// Content of a chain entry. The tag doubles as the entry's `type` on the wire,
/// so a prompt can never carry drawing data and vice versa.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum EntryBody {
    Prompt {
        content: String,
    },
    Drawing {
        #[serde(rename = "drawingData")]
        drawing_data: DrawingData,
    },
    Guess {
        content: String,
    },
}

impl EntryBody {
    pub fn entry_type(&self) -> EntryType {
        match self {
            EntryBody::Prompt { .. } => EntryType::Prompt,
            EntryBody::Drawing { .. } => EntryType::Drawing,
            EntryBody::Guess { .. } => EntryType::Guess,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ChainEntry {
    #[serde(flatten)]
    pub body: EntryBody,
    /// `None` when the system wrote the entry for a room nobody occupied.
    pub player_id: Option<PlayerId>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
}

impl ChainEntry {
    pub fn entry_type(&self) -> EntryType {
        self.body.entry_type()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Player {
    pub id: PlayerId,
    pub display_name: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub icon: Option<String>,
    pub connection_status: ConnectionStatus,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub joined_at: DateTime<Utc>,
    pub current_room_id: Option<RoomId>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Room {
    pub id: RoomId,
    pub index: usize,
    pub phase: Phase,
    pub current_player_id: Option<PlayerId>,
    pub chain: Vec<ChainEntry>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub phase_started_at: DateTime<Utc>,
    /// Seconds.
    pub phase_duration: u64,
}

impl Room {
    pub fn last_entry(&self) -> Option<&ChainEntry> {
        self.chain.last()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Game {
    pub id: GameId,
    pub state: GameState,
    pub host_id: PlayerId,
    /// Seating order; rotation follows it.
    pub players: Vec<Player>,
    pub rooms: Vec<Room>,
    pub max_players: usize,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub name: Option<String>,
}

impl Game {
    pub fn player(&self, id: PlayerId) -> Option<&Player> {
        self.players.iter().find(|p| p.id == id)
    }

    pub fn player_mut(&mut self, id: PlayerId) -> Option<&mut Player> {
        self.players.iter_mut().find(|p| p.id == id)
    }

    pub fn room(&self, id: RoomId) -> Option<&Room> {
        self.rooms.iter().find(|r| r.id == id)
    }

    pub fn room_index(&self, id: RoomId) -> Option<usize> {
        self.rooms.iter().position(|r| r.id == id)
    }
}
