use painter_models::{
    Phase, MAX_NAME_LENGTH, MAX_PLAYERS, MAX_TEXT_LENGTH, MIN_NAME_LENGTH, MIN_PLAYERS,
    MIN_TEXT_LENGTH,
};
use thiserror::Error;

/// Everything a player can get wrong. The display text is what the player sees
/// in the `error` payload.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GameError {
    #[error("Game not found")]
    GameNotFound,
    #[error("Room not found")]
    RoomNotFound,
    #[error("Player not in game")]
    PlayerNotFound,
    #[error("Not in a game")]
    NotInGame,
    #[error("Already in this game")]
    AlreadyInGame,
    #[error("Not in {0} phase")]
    WrongPhase(Phase),
    #[error("Already submitted for this phase")]
    AlreadySubmitted,
    #[error("Text must be between {min} and {max} characters", min = MIN_TEXT_LENGTH, max = MAX_TEXT_LENGTH)]
    InvalidTextLength,
    #[error("Display name must be between {min} and {max} characters", min = MIN_NAME_LENGTH, max = MAX_NAME_LENGTH)]
    InvalidDisplayName,
    #[error("Max players must be between {min} and {max}", min = MIN_PLAYERS, max = MAX_PLAYERS)]
    InvalidMaxPlayers,
    #[error("Game is full")]
    GameFull,
    #[error("Game already started")]
    AlreadyStarted,
    #[error("Game has not started")]
    NotStarted,
    #[error("Need at least {min} players to start", min = MIN_PLAYERS)]
    NotEnoughPlayers,
    #[error("Only host can start the game")]
    NotHost,
}

/// Failure to hand a message to a player's connection.
#[derive(Error, Debug)]
pub enum DeliveryError {
    #[error("no connection for player")]
    UnknownPlayer,
    #[error("connection closed")]
    Closed,
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}
