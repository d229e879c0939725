use chrono::{DateTime, Utc};
use painter_models::{
    Game, Phase, PlayerId, RoomId, DRAW_BASE_DURATION, DRAW_DURATION_STEP, DRAW_MIN_DURATION,
    GUESS_DURATION, INPUT_DURATION,
};
use std::fmt::Debug;
use tracing::{error, warn};

/// Decides where a player goes next, given the index of the room they are in.
///
/// Implementations must be a permutation of `0..room_count` with no fixed
/// point, and cycling it `room_count` times must visit every room once.
pub trait RotationPolicy: Send + Sync + Debug {
    fn next_room_index(&self, current: usize, room_count: usize) -> usize;
}

/// Every player steps from their current room to the next one by index.
///
/// Right after start every player sits in the room matching their seat, so this
/// also covers the seat-based rotation used when leaving the input phase.
#[derive(Debug, Default, Clone, Copy)]
pub struct FollowCurrentRoom;

impl RotationPolicy for FollowCurrentRoom {
    fn next_room_index(&self, current: usize, room_count: usize) -> usize {
        (current + 1) % room_count
    }
}

/// Seconds allotted to `phase` in a room whose chain holds `chain_len` entries.
///
/// Drawing time shrinks by one step per prompt/drawing pair already in the
/// chain, down to a floor.
pub fn phase_duration(phase: Phase, chain_len: usize) -> u64 {
    match phase {
        Phase::Input => INPUT_DURATION,
        Phase::Draw => {
            let round = (chain_len / 2) as u64;
            DRAW_BASE_DURATION
                .saturating_sub(round.saturating_mul(DRAW_DURATION_STEP))
                .max(DRAW_MIN_DURATION)
        }
        Phase::Guess => GUESS_DURATION,
    }
}

/// A room that has just entered a new phase and needs a fresh timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoomAdvance {
    pub room_id: RoomId,
    pub phase: Phase,
    pub duration: u64,
    /// Chain length when the phase began.
    pub pass: usize,
}

/// Moves the whole roster one room along and puts every room into `next_phase`.
///
/// A room left without an occupant is a logic defect: it is logged and left
/// untouched instead of being advanced half-way.
pub fn rotate(
    game: &mut Game,
    policy: &dyn RotationPolicy,
    next_phase: Phase,
    now: DateTime<Utc>,
) -> Vec<RoomAdvance> {
    let room_count = game.rooms.len();
    if room_count == 0 {
        return Vec::new();
    }

    let mut incoming: Vec<Option<PlayerId>> = vec![None; room_count];
    for player in &game.players {
        let Some(current) = player.current_room_id.and_then(|id| game.room_index(id)) else {
            warn!(game_id = %game.id, player_id = %player.id, "player has no room, not rotating");
            continue;
        };
        let next = policy.next_room_index(current, room_count);
        if next >= room_count {
            error!(game_id = %game.id, player_id = %player.id, next, "rotation produced an out of range room");
            continue;
        }
        match incoming[next] {
            None => incoming[next] = Some(player.id),
            Some(other) => {
                error!(game_id = %game.id, player_id = %player.id, other = %other, next, "two players rotated into the same room");
            }
        }
    }

    let Game { players, rooms, .. } = game;
    let mut advances = Vec::with_capacity(room_count);
    for (room, occupant) in rooms.iter_mut().zip(incoming) {
        let Some(player_id) = occupant else {
            error!(room_id = %room.id, phase = %room.phase, "room has no occupant after rotation, skipping it");
            continue;
        };
        room.current_player_id = Some(player_id);
        room.phase = next_phase;
        room.phase_started_at = now;
        room.phase_duration = phase_duration(next_phase, room.chain.len());
        if let Some(player) = players.iter_mut().find(|p| p.id == player_id) {
            player.current_room_id = Some(room.id);
        }
        advances.push(RoomAdvance {
            room_id: room.id,
            phase: next_phase,
            duration: room.phase_duration,
            pass: room.chain.len(),
        });
    }
    advances
}
