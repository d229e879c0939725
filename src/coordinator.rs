//! The phase state machine.
//!
//! Every room walks `input -> draw -> guess -> draw -> ...` in lockstep with the
//! others. A phase group closes once each of its rooms holds the entry for the
//! current pass, whether a player wrote it, the room's timer ran out, or the
//! occupant disconnected. All three triggers funnel into
//! [`GameService::complete_phase_if_ready`], so they are idempotent with
//! respect to each other.

use crate::broadcast::Broadcaster;
use crate::error::GameError;
use crate::lobby::{self, GameManager, SharedGame};
use crate::room;
use crate::rotation::{self, FollowCurrentRoom, RoomAdvance, RotationPolicy};
use crate::state::{lock, read, write, StateObj};
use crate::timer::TimerRegistry;
use chrono::Utc;
use painter_models::{
    ChainEntry, DrawingData, EntryBody, EntryType, Game, GameId, GameState, Phase, PlayerId,
    RoomId, ServerMessage, DEFAULT_MAX_PLAYERS, GAME_CLEANUP_TIMEOUT, MAX_TEXT_LENGTH,
    MIN_TEXT_LENGTH,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
pub struct Settings {
    /// Capacity of a game created without an explicit limit.
    pub default_max_players: usize,
    /// How long an ended game stays around for its results screen.
    pub cleanup_after: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            default_max_players: DEFAULT_MAX_PLAYERS,
            cleanup_after: GAME_CLEANUP_TIMEOUT,
        }
    }
}

/// Identifies the phase pass a room timer was started for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhaseTicket {
    pub game_id: GameId,
    pub room_id: RoomId,
    pub phase: Phase,
    /// Chain length when the phase began.
    pub pass: usize,
}

/// Owns every game, the room timers, and the outbound boundary.
#[derive(Clone)]
pub struct GameService {
    games: StateObj<GameManager>,
    room_timers: TimerRegistry<RoomId>,
    cleanup_timers: TimerRegistry<GameId>,
    broadcaster: Arc<dyn Broadcaster>,
    rotation: Arc<dyn RotationPolicy>,
    settings: Settings,
}

impl GameService {
    pub fn new(broadcaster: Arc<dyn Broadcaster>, settings: Settings) -> Self {
        Self::with_rotation(broadcaster, settings, Arc::new(FollowCurrentRoom))
    }

    pub fn with_rotation(
        broadcaster: Arc<dyn Broadcaster>,
        settings: Settings,
        rotation: Arc<dyn RotationPolicy>,
    ) -> Self {
        Self {
            games: Default::default(),
            room_timers: TimerRegistry::new(),
            cleanup_timers: TimerRegistry::new(),
            broadcaster,
            rotation,
            settings,
        }
    }

    fn game(&self, game_id: GameId) -> Result<SharedGame, GameError> {
        read(&self.games)
            .get_game(&game_id)
            .ok_or(GameError::GameNotFound)
    }

    /// Snapshot of a game.
    pub fn snapshot(&self, game_id: GameId) -> Option<Game> {
        let shared = self.game(game_id).ok()?;
        let game = lock(&shared).clone();
        Some(game)
    }

    pub fn game_count(&self) -> usize {
        read(&self.games).len()
    }

    pub fn lobby_games(&self) -> Vec<Game> {
        read(&self.games).lobby_games()
    }

    pub fn all_games(&self) -> Vec<Game> {
        read(&self.games).all_games()
    }

    pub fn has_pending_timer(&self, room_id: RoomId) -> bool {
        self.room_timers.is_pending(&room_id)
    }

    /// Time left on a room's phase clock, `None` when no timer is pending.
    pub fn remaining_time(&self, room_id: RoomId) -> Option<Duration> {
        self.room_timers.remaining(&room_id)
    }

    /// Time the room's phase clock has been running.
    pub fn elapsed_time(&self, room_id: RoomId) -> Option<Duration> {
        self.room_timers.elapsed(&room_id)
    }

    fn announce_game_list(&self) {
        let games = self.lobby_games();
        self.broadcaster
            .to_all(&ServerMessage::GameListUpdate { games });
    }

    // --- lifecycle ---

    /// Validates a create request without changing anything.
    pub fn check_create(
        &self,
        display_name: &str,
        max_players: Option<usize>,
    ) -> Result<(), GameError> {
        lobby::validate_display_name(display_name)?;
        lobby::validate_max_players(max_players.unwrap_or(self.settings.default_max_players))
    }

    /// Validates a join request without changing anything.
    pub fn check_join(&self, game_id: GameId, display_name: &str) -> Result<(), GameError> {
        lobby::validate_display_name(display_name)?;
        let shared = self.game(game_id)?;
        let game = lock(&shared);
        lobby::check_admission(&game)
    }

    pub fn create_game(
        &self,
        player_id: PlayerId,
        display_name: &str,
        max_players: Option<usize>,
        name: Option<String>,
    ) -> Result<GameId, GameError> {
        let host = lobby::new_player(player_id, display_name)?;
        let max_players = max_players.unwrap_or(self.settings.default_max_players);
        let shared = write(&self.games).create_game(host, max_players, name)?;
        let game = lock(&shared).clone();
        info!(game_id = %game.id, player_id = %player_id, "game created");

        self.broadcaster.to_player(
            player_id,
            &ServerMessage::GameCreated {
                game: game.clone(),
                player_id,
            },
        );
        self.announce_game_list();
        Ok(game.id)
    }

    pub fn join_game(
        &self,
        player_id: PlayerId,
        game_id: GameId,
        display_name: &str,
    ) -> Result<(), GameError> {
        let player = lobby::new_player(player_id, display_name)?;
        let shared = self.game(game_id)?;
        let mut game = lock(&shared);
        lobby::add_player(&mut game, player.clone())?;
        info!(game_id = %game_id, player_id = %player_id, players = game.players.len(), "player joined");

        self.broadcaster.to_game_except(
            &game,
            player_id,
            &ServerMessage::PlayerJoined {
                player,
                game: game.clone(),
            },
        );
        self.broadcaster.to_player(
            player_id,
            &ServerMessage::GameJoined {
                game: game.clone(),
                player_id,
            },
        );
        drop(game);
        self.announce_game_list();
        Ok(())
    }

    pub fn start_game(&self, player_id: PlayerId, game_id: GameId) -> Result<(), GameError> {
        let shared = self.game(game_id)?;
        let mut game = lock(&shared);
        lobby::start_game(&mut game, player_id, Utc::now())?;

        let advances: Vec<RoomAdvance> = game
            .rooms
            .iter()
            .map(|room| RoomAdvance {
                room_id: room.id,
                phase: room.phase,
                duration: room.phase_duration,
                pass: room.chain.len(),
            })
            .collect();
        for advance in advances {
            self.schedule_phase_timer(game_id, advance);
        }
        info!(game_id = %game_id, players = game.players.len(), "game started");

        self.broadcaster.to_game(
            &game,
            &ServerMessage::GameStarted { game: game.clone() },
        );
        drop(game);
        self.announce_game_list();
        Ok(())
    }

    pub fn update_player_icon(
        &self,
        player_id: PlayerId,
        game_id: GameId,
        icon: String,
    ) -> Result<(), GameError> {
        let shared = self.game(game_id)?;
        let mut game = lock(&shared);
        let player = game.player_mut(player_id).ok_or(GameError::PlayerNotFound)?;
        player.icon = Some(icon);
        self.broadcaster.to_game(
            &game,
            &ServerMessage::GameStateUpdate {
                game: game.clone(),
                player_id,
            },
        );
        Ok(())
    }

    /// Removes a game and everything scheduled for it.
    pub fn delete_game(&self, game_id: GameId) -> Option<Game> {
        let shared = write(&self.games).delete_game(&game_id)?;
        let game = lock(&shared).clone();
        self.room_timers.cancel_all(game.rooms.iter().map(|r| &r.id));
        self.cleanup_timers.cancel(&game_id);
        info!(game_id = %game_id, "game deleted");
        Some(game)
    }

    /// A player leaving on purpose or losing their connection.
    ///
    /// In the lobby the seat is given up. Once started the seat is kept: any
    /// entry the player still owes is written for them so nobody else waits.
    pub fn disconnect(&self, player_id: PlayerId, game_id: GameId) -> Result<(), GameError> {
        let shared = self.game(game_id)?;
        let mut game = lock(&shared);
        if game.player(player_id).is_none() {
            return Err(GameError::PlayerNotFound);
        }

        let state = game.state;
        match state {
            GameState::Lobby => {
                let was_host = game.host_id == player_id;
                lobby::remove_player(&mut game, player_id);
                info!(game_id = %game_id, player_id = %player_id, remaining = game.players.len(), "player left lobby");

                if was_host || game.players.is_empty() {
                    let message = if was_host {
                        "Host left the game"
                    } else {
                        "No players left"
                    };
                    self.broadcaster.to_game(
                        &game,
                        &ServerMessage::GameDeleted {
                            message: message.to_string(),
                        },
                    );
                    drop(game);
                    self.delete_game(game_id);
                } else {
                    self.broadcaster
                        .to_game(&game, &ServerMessage::PlayerLeft { game: game.clone() });
                    drop(game);
                }
                self.announce_game_list();
            }
            GameState::Started => {
                let owed = self.fill_for_departed(&mut game, player_id);
                lobby::mark_disconnected(&mut game, player_id);
                info!(game_id = %game_id, player_id = %player_id, auto_filled = owed.is_some(), "player disconnected mid-game");

                self.broadcaster
                    .to_game(&game, &ServerMessage::PlayerLeft { game: game.clone() });
                if let Some(phase) = owed {
                    self.complete_phase_if_ready(&mut game, phase);
                }
            }
            GameState::Ended => {
                lobby::mark_disconnected(&mut game, player_id);
            }
        }
        Ok(())
    }

    /// Writes the placeholder a departing player still owes. Returns the phase
    /// it was written for.
    fn fill_for_departed(&self, game: &mut Game, player_id: PlayerId) -> Option<Phase> {
        let idx = room::room_index_by_player(game, player_id)?;
        let room = &mut game.rooms[idx];
        if room.current_player_id != Some(player_id) || room::has_terminal_entry(room) {
            return None;
        }
        let phase = room.phase;
        let entry = room::placeholder_entry(phase, Some(player_id), Utc::now());
        room::add_chain_entry(room, entry);
        self.room_timers.cancel(&room.id);
        Some(phase)
    }

    // --- submissions ---

    pub fn submit_prompt(
        &self,
        player_id: PlayerId,
        game_id: GameId,
        prompt: &str,
    ) -> Result<(), GameError> {
        let content = validate_text(prompt)?;
        self.submit(player_id, game_id, EntryBody::Prompt { content })
    }

    pub fn submit_drawing(
        &self,
        player_id: PlayerId,
        game_id: GameId,
        drawing_data: DrawingData,
    ) -> Result<(), GameError> {
        self.submit(player_id, game_id, EntryBody::Drawing { drawing_data })
    }

    pub fn submit_guess(
        &self,
        player_id: PlayerId,
        game_id: GameId,
        guess: &str,
    ) -> Result<(), GameError> {
        let content = validate_text(guess)?;
        self.submit(player_id, game_id, EntryBody::Guess { content })
    }

    fn submit(
        &self,
        player_id: PlayerId,
        game_id: GameId,
        body: EntryBody,
    ) -> Result<(), GameError> {
        let phase = match body.entry_type() {
            EntryType::Prompt => Phase::Input,
            EntryType::Drawing => Phase::Draw,
            EntryType::Guess => Phase::Guess,
        };
        let shared = self.game(game_id)?;
        let mut game = lock(&shared);
        if game.state != GameState::Started {
            return Err(GameError::NotStarted);
        }
        let idx = room::room_index_by_player(&game, player_id).ok_or(GameError::RoomNotFound)?;

        let room = &mut game.rooms[idx];
        if room.phase != phase {
            return Err(GameError::WrongPhase(phase));
        }
        if room::has_terminal_entry(room) {
            return Err(GameError::AlreadySubmitted);
        }
        room::add_chain_entry(
            room,
            ChainEntry {
                body,
                player_id: Some(player_id),
                timestamp: Utc::now(),
            },
        );
        self.room_timers.cancel(&room.id);
        debug!(game_id = %game_id, room_id = %room.id, player_id = %player_id, phase = %phase, "entry submitted");

        let confirmation = match phase {
            Phase::Input => ServerMessage::PromptSubmitted { success: true },
            Phase::Draw => ServerMessage::DrawingSubmitted { success: true },
            Phase::Guess => ServerMessage::GuessSubmitted { success: true },
        };
        self.broadcaster.to_player(player_id, &confirmation);
        self.complete_phase_if_ready(&mut game, phase);
        Ok(())
    }

    // --- timers ---

    fn schedule_phase_timer(&self, game_id: GameId, advance: RoomAdvance) {
        let ticket = PhaseTicket {
            game_id,
            room_id: advance.room_id,
            phase: advance.phase,
            pass: advance.pass,
        };
        let service = self.clone();
        self.room_timers.start(
            advance.room_id,
            Duration::from_secs(advance.duration),
            move || service.handle_timer_expiry(ticket),
        );
    }

    /// A room's clock ran out. Writes the placeholder if the occupant has not
    /// submitted; a timer that lost the race to a submission does nothing.
    pub fn handle_timer_expiry(&self, ticket: PhaseTicket) {
        let Ok(shared) = self.game(ticket.game_id) else {
            debug!(game_id = %ticket.game_id, "timer fired for a deleted game");
            return;
        };
        let mut game = lock(&shared);
        if game.state != GameState::Started {
            debug!(game_id = %ticket.game_id, state = ?game.state, "timer fired outside of play");
            return;
        }
        let Some(idx) = game.room_index(ticket.room_id) else {
            warn!(game_id = %ticket.game_id, room_id = %ticket.room_id, "timer fired for an unknown room");
            return;
        };

        let room = &mut game.rooms[idx];
        if room::has_terminal_entry(room) {
            debug!(room_id = %room.id, phase = %room.phase, "entry already submitted, ignoring expiry");
            return;
        }
        if room.phase != ticket.phase || room.chain.len() != ticket.pass {
            debug!(room_id = %room.id, phase = %room.phase, ticket = ?ticket, "stale timer");
            return;
        }
        let entry = room::placeholder_entry(room.phase, room.current_player_id, Utc::now());
        room::add_chain_entry(room, entry);
        info!(game_id = %ticket.game_id, room_id = %ticket.room_id, phase = %ticket.phase, "time expired, auto-submitted");

        self.complete_phase_if_ready(&mut game, ticket.phase);
    }

    // --- phase groups ---

    fn phase_group_complete(game: &Game, phase: Phase) -> bool {
        match phase {
            // every room starts in input together, so this one is game-wide
            Phase::Input => game.rooms.iter().all(|r| {
                r.chain
                    .iter()
                    .any(|e| e.entry_type() == EntryType::Prompt)
            }),
            Phase::Draw | Phase::Guess => {
                let mut group = game.rooms.iter().filter(|r| r.phase == phase).peekable();
                group.peek().is_some() && group.all(room::has_terminal_entry)
            }
        }
    }

    /// Closes the `phase` group if every room in it is done: either ends the
    /// game or rotates everyone into the next phase and restarts the clocks.
    fn complete_phase_if_ready(&self, game: &mut Game, phase: Phase) {
        if !Self::phase_group_complete(game, phase) {
            return;
        }

        if room::check_game_complete(game) {
            self.finish_game(game);
            return;
        }

        let next = phase.next();
        let advances = rotation::rotate(game, self.rotation.as_ref(), next, Utc::now());
        for advance in &advances {
            self.schedule_phase_timer(game.id, *advance);
        }
        info!(game_id = %game.id, from = %phase, to = %next, rooms = advances.len(), "phase advanced");

        self.broadcaster.to_game(
            game,
            &ServerMessage::PhaseAdvanced { game: game.clone() },
        );
    }

    fn finish_game(&self, game: &mut Game) {
        lobby::end_game(game);
        self.room_timers
            .cancel_all(game.rooms.iter().map(|r| &r.id));
        info!(game_id = %game.id, "game ended");

        self.broadcaster
            .to_game(game, &ServerMessage::GameEnded { game: game.clone() });

        let service = self.clone();
        let game_id = game.id;
        self.cleanup_timers
            .start(game_id, self.settings.cleanup_after, move || {
                service.delete_game(game_id);
            });
    }
}

/// Trims and length-checks a prompt or guess.
fn validate_text(text: &str) -> Result<String, GameError> {
    let text = text.trim();
    let len = text.chars().count();
    if !(MIN_TEXT_LENGTH..=MAX_TEXT_LENGTH).contains(&len) {
        return Err(GameError::InvalidTextLength);
    }
    Ok(text.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_is_trimmed_and_bounded() {
        assert_eq!(validate_text("  a cat  ").unwrap(), "a cat");
        assert_eq!(validate_text("ab"), Err(GameError::InvalidTextLength));
        assert_eq!(validate_text("  ab   "), Err(GameError::InvalidTextLength));
        assert!(validate_text(&"é".repeat(100)).is_ok());
        assert_eq!(
            validate_text(&"x".repeat(101)),
            Err(GameError::InvalidTextLength)
        );
    }
}
