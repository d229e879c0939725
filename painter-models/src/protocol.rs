//! Wire vocabulary exchanged over the websocket as `{ "type": ..., "payload": { ... } }`.

use crate::{DrawingData, Game, GameId, Player, PlayerId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(
    tag = "type",
    content = "payload",
    rename_all = "camelCase",
    rename_all_fields = "camelCase"
)]
pub enum ClientMessage {
    CreateGame {
        display_name: String,
        max_players: Option<usize>,
        game_name: Option<String>,
    },
    JoinGame {
        game_id: GameId,
        display_name: String,
    },
    LeaveGame {},
    StartGame {},
    SubmitPrompt {
        prompt: String,
    },
    SubmitDrawing {
        drawing_data: DrawingData,
    },
    SubmitGuess {
        guess: String,
    },
    UpdatePlayerIcon {
        icon: String,
    },
    GetGameList {},
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(
    tag = "type",
    content = "payload",
    rename_all = "camelCase",
    rename_all_fields = "camelCase"
)]
pub enum ServerMessage {
    GameCreated { game: Game, player_id: PlayerId },
    GameJoined { game: Game, player_id: PlayerId },
    PlayerJoined { player: Player, game: Game },
    PlayerLeft { game: Game },
    GameStarted { game: Game },
    PhaseAdvanced { game: Game },
    GameEnded { game: Game },
    GameDeleted { message: String },
    GameList { games: Vec<Game> },
    GameListUpdate { games: Vec<Game> },
    GameStateUpdate { game: Game, player_id: PlayerId },
    PromptSubmitted { success: bool },
    DrawingSubmitted { success: bool },
    GuessSubmitted { success: bool },
    LeftGame {},
    Error { message: String },
}

impl ServerMessage {
    pub fn error(message: impl Into<String>) -> Self {
        ServerMessage::Error {
            message: message.into(),
        }
    }

    /// Wire `type` tag, handy for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            ServerMessage::GameCreated { .. } => "gameCreated",
            ServerMessage::GameJoined { .. } => "gameJoined",
            ServerMessage::PlayerJoined { .. } => "playerJoined",
            ServerMessage::PlayerLeft { .. } => "playerLeft",
            ServerMessage::GameStarted { .. } => "gameStarted",
            ServerMessage::PhaseAdvanced { .. } => "phaseAdvanced",
            ServerMessage::GameEnded { .. } => "gameEnded",
            ServerMessage::GameDeleted { .. } => "gameDeleted",
            ServerMessage::GameList { .. } => "gameList",
            ServerMessage::GameListUpdate { .. } => "gameListUpdate",
            ServerMessage::GameStateUpdate { .. } => "gameStateUpdate",
            ServerMessage::PromptSubmitted { .. } => "promptSubmitted",
            ServerMessage::DrawingSubmitted { .. } => "drawingSubmitted",
            ServerMessage::GuessSubmitted { .. } => "guessSubmitted",
            ServerMessage::LeftGame {} => "leftGame",
            ServerMessage::Error { .. } => "error",
        }
    }
}
