use crate::error::GameError;
use crate::state::lock;
use chrono::{DateTime, Utc};
use painter_models::{
    ConnectionStatus, Game, GameId, GameState, Phase, Player, PlayerId, Room, INPUT_DURATION,
    MAX_NAME_LENGTH, MAX_PLAYERS, MIN_NAME_LENGTH, MIN_PLAYERS,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

/// One game behind its own lock. Every mutation of a game (submission, timer
/// expiry, disconnect) runs while holding it.
pub type SharedGame = Arc<Mutex<Game>>;

#[derive(Default, Debug)]
pub struct GameManager {
    games: HashMap<GameId, SharedGame>,
}

impl GameManager {
    pub fn new() -> Self {
        Default::default()
    }

    /// Creates a game in lobby state with `host` seated first.
    pub fn create_game(
        &mut self,
        host: Player,
        max_players: usize,
        name: Option<String>,
    ) -> Result<SharedGame, GameError> {
        validate_max_players(max_players)?;
        let game = Game {
            id: Uuid::new_v4(),
            state: GameState::Lobby,
            host_id: host.id,
            players: vec![host],
            rooms: Vec::new(),
            max_players,
            created_at: Utc::now(),
            name: name.filter(|n| !n.trim().is_empty()),
        };
        let id = game.id;
        let shared = Arc::new(Mutex::new(game));
        self.games.insert(id, Arc::clone(&shared));
        Ok(shared)
    }

    pub fn get_game(&self, id: &GameId) -> Option<SharedGame> {
        self.games.get(id).cloned()
    }

    pub fn delete_game(&mut self, id: &GameId) -> Option<SharedGame> {
        self.games.remove(id)
    }

    pub fn len(&self) -> usize {
        self.games.len()
    }

    pub fn is_empty(&self) -> bool {
        self.games.is_empty()
    }

    /// Snapshots of every game, oldest first.
    pub fn all_games(&self) -> Vec<Game> {
        let mut games: Vec<Game> = self.games.values().map(|g| lock(g).clone()).collect();
        games.sort_by_key(|g| g.created_at);
        games
    }

    /// Snapshots of games still accepting players.
    pub fn lobby_games(&self) -> Vec<Game> {
        self.all_games()
            .into_iter()
            .filter(|g| g.state == GameState::Lobby)
            .collect()
    }
}

pub fn validate_max_players(max_players: usize) -> Result<(), GameError> {
    if !(MIN_PLAYERS..=MAX_PLAYERS).contains(&max_players) {
        return Err(GameError::InvalidMaxPlayers);
    }
    Ok(())
}

/// Returns the trimmed name.
pub fn validate_display_name(display_name: &str) -> Result<&str, GameError> {
    let display_name = display_name.trim();
    let len = display_name.chars().count();
    if !(MIN_NAME_LENGTH..=MAX_NAME_LENGTH).contains(&len) {
        return Err(GameError::InvalidDisplayName);
    }
    Ok(display_name)
}

pub fn new_player(id: PlayerId, display_name: &str) -> Result<Player, GameError> {
    let display_name = validate_display_name(display_name)?;
    Ok(Player {
        id,
        display_name: display_name.to_string(),
        icon: None,
        connection_status: ConnectionStatus::Connected,
        joined_at: Utc::now(),
        current_room_id: None,
    })
}

/// Whether the game still takes new players.
pub fn check_admission(game: &Game) -> Result<(), GameError> {
    if game.state != GameState::Lobby {
        return Err(GameError::AlreadyStarted);
    }
    if game.players.len() >= game.max_players {
        return Err(GameError::GameFull);
    }
    Ok(())
}

pub fn add_player(game: &mut Game, player: Player) -> Result<(), GameError> {
    check_admission(game)?;
    game.players.push(player);
    Ok(())
}

/// Drops a player from a lobby. Returns the removed player, if seated.
pub fn remove_player(game: &mut Game, player_id: PlayerId) -> Option<Player> {
    let idx = game.players.iter().position(|p| p.id == player_id)?;
    Some(game.players.remove(idx))
}

pub fn mark_disconnected(game: &mut Game, player_id: PlayerId) {
    if let Some(player) = game.player_mut(player_id) {
        player.connection_status = ConnectionStatus::Disconnected;
    }
}

/// Moves a lobby to started: one room per player, everyone seated in the room
/// matching their seat, every room in the input phase.
pub fn start_game(
    game: &mut Game,
    requester: PlayerId,
    now: DateTime<Utc>,
) -> Result<(), GameError> {
    if game.host_id != requester {
        return Err(GameError::NotHost);
    }
    if game.state != GameState::Lobby {
        return Err(GameError::AlreadyStarted);
    }
    if game.players.len() < MIN_PLAYERS {
        return Err(GameError::NotEnoughPlayers);
    }

    game.rooms = game
        .players
        .iter()
        .enumerate()
        .map(|(index, player)| Room {
            id: Uuid::new_v4(),
            index,
            phase: Phase::Input,
            current_player_id: Some(player.id),
            chain: Vec::new(),
            phase_started_at: now,
            phase_duration: INPUT_DURATION,
        })
        .collect();
    for (player, room) in game.players.iter_mut().zip(&game.rooms) {
        player.current_room_id = Some(room.id);
    }
    game.state = GameState::Started;
    Ok(())
}

pub fn end_game(game: &mut Game) {
    game.state = GameState::Ended;
}
