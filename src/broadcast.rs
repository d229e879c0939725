use crate::state::lock;
use painter_models::{Game, PlayerId, ServerMessage};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Outbound fan-out to connected players. Implementations only read the game
/// to find its players; they never mutate it.
pub trait Broadcaster: Send + Sync {
    fn to_player(&self, player_id: PlayerId, message: &ServerMessage);

    /// Every connection, whether or not it sits in a game.
    fn to_all(&self, message: &ServerMessage);

    fn to_game(&self, game: &Game, message: &ServerMessage) {
        for player in &game.players {
            self.to_player(player.id, message);
        }
    }

    fn to_game_except(&self, game: &Game, excluded: PlayerId, message: &ServerMessage) {
        for player in game.players.iter().filter(|p| p.id != excluded) {
            self.to_player(player.id, message);
        }
    }
}

/// Keeps every message in memory, per recipient. Used by embedders without a
/// transport and by the test-suite.
#[derive(Debug, Default, Clone)]
pub struct MemoryBroadcaster {
    sent: Arc<Mutex<HashMap<PlayerId, Vec<ServerMessage>>>>,
    announced: Arc<Mutex<Vec<ServerMessage>>>,
}

impl MemoryBroadcaster {
    pub fn new() -> Self {
        Default::default()
    }

    /// Drains what has been sent to `player_id` so far.
    pub fn take(&self, player_id: PlayerId) -> Vec<ServerMessage> {
        lock(&self.sent).remove(&player_id).unwrap_or_default()
    }

    pub fn sent_to(&self, player_id: PlayerId) -> Vec<ServerMessage> {
        lock(&self.sent)
            .get(&player_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Messages addressed to every connection.
    pub fn announced(&self) -> Vec<ServerMessage> {
        lock(&self.announced).clone()
    }

    pub fn clear(&self) {
        lock(&self.sent).clear();
        lock(&self.announced).clear();
    }
}

impl Broadcaster for MemoryBroadcaster {
    fn to_player(&self, player_id: PlayerId, message: &ServerMessage) {
        lock(&self.sent)
            .entry(player_id)
            .or_default()
            .push(message.clone());
    }

    fn to_all(&self, message: &ServerMessage) {
        lock(&self.announced).push(message.clone());
    }
}
