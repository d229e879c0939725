//! Room and chain primitives. Callers decide which entry fits which phase.

use chrono::{DateTime, Utc};
use painter_models::{
    ChainEntry, DrawingData, EntryBody, Game, Phase, PlayerId, Room, EXPIRED_GUESS,
    EXPIRED_PROMPT,
};

pub fn add_chain_entry(room: &mut Room, entry: ChainEntry) {
    room.chain.push(entry);
}

/// Index of the room the player currently occupies.
pub fn room_index_by_player(game: &Game, player_id: PlayerId) -> Option<usize> {
    let room_id = game.player(player_id)?.current_room_id?;
    game.room_index(room_id)
}

/// The game is over once every room's chain holds one entry per player.
pub fn check_game_complete(game: &Game) -> bool {
    let expected = game.players.len();
    game.rooms.iter().all(|room| room.chain.len() >= expected)
}

/// Whether the current pass through the room's phase already has its entry.
pub fn has_terminal_entry(room: &Room) -> bool {
    room.last_entry()
        .is_some_and(|entry| entry.entry_type() == room.phase.entry_type())
}

/// What the system writes when nobody submitted before the clock ran out.
pub fn placeholder_entry(
    phase: Phase,
    author: Option<PlayerId>,
    now: DateTime<Utc>,
) -> ChainEntry {
    let body = match phase {
        Phase::Input => EntryBody::Prompt {
            content: EXPIRED_PROMPT.to_string(),
        },
        Phase::Draw => EntryBody::Drawing {
            drawing_data: DrawingData::empty(),
        },
        Phase::Guess => EntryBody::Guess {
            content: EXPIRED_GUESS.to_string(),
        },
    };
    ChainEntry {
        body,
        player_id: author,
        timestamp: now,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lobby::{add_player, new_player, start_game, GameManager};
    use crate::state::lock;
    use uuid::Uuid;

    fn started_game(n: usize) -> Game {
        let mut manager = GameManager::new();
        let host = new_player(Uuid::new_v4(), "host").unwrap();
        let shared = manager.create_game(host, 6, None).unwrap();
        let mut game = lock(&shared).clone();
        for i in 1..n {
            add_player(&mut game, new_player(Uuid::new_v4(), &format!("p{i}")).unwrap())
                .unwrap();
        }
        let host = game.host_id;
        start_game(&mut game, host, Utc::now()).unwrap();
        game
    }

    #[test]
    fn resolves_rooms_through_the_player_seat() {
        let game = started_game(3);
        let player = game.players[2].id;
        assert_eq!(room_index_by_player(&game, player), Some(2));
        assert!(room_index_by_player(&game, Uuid::new_v4()).is_none());
    }

    #[test]
    fn completion_needs_a_full_chain_in_every_room() {
        let mut game = started_game(3);
        assert!(!check_game_complete(&game));
        for room in game.rooms.iter_mut() {
            for phase in [Phase::Input, Phase::Draw, Phase::Guess] {
                add_chain_entry(room, placeholder_entry(phase, None, Utc::now()));
            }
        }
        game.rooms[1].chain.pop();
        assert!(!check_game_complete(&game));
        let last = placeholder_entry(Phase::Guess, None, Utc::now());
        add_chain_entry(&mut game.rooms[1], last);
        assert!(check_game_complete(&game));
    }

    #[test]
    fn terminal_entry_must_match_the_current_phase() {
        let mut game = started_game(3);
        let room = &mut game.rooms[0];
        assert!(!has_terminal_entry(room));
        add_chain_entry(room, placeholder_entry(Phase::Input, None, Utc::now()));
        assert!(has_terminal_entry(room));
        room.phase = Phase::Draw;
        assert!(!has_terminal_entry(room));
    }

    #[test]
    fn placeholders_use_the_canonical_content() {
        let author = Some(Uuid::new_v4());
        let prompt = placeholder_entry(Phase::Input, author, Utc::now());
        assert_eq!(
            prompt.body,
            EntryBody::Prompt {
                content: "[Time expired - no prompt submitted]".into()
            }
        );
        assert_eq!(prompt.player_id, author);
        let drawing = placeholder_entry(Phase::Draw, author, Utc::now());
        assert_eq!(
            drawing.body,
            EntryBody::Drawing {
                drawing_data: DrawingData {
                    strokes: vec![],
                    width: 800,
                    height: 600
                }
            }
        );
        let guess = placeholder_entry(Phase::Guess, None, Utc::now());
        assert_eq!(
            guess.body,
            EntryBody::Guess {
                content: "[Time expired - no guess submitted]".into()
            }
        );
    }
}
