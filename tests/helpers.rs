#![allow(dead_code)]

use painter_models::{
    DrawingData, Game, GameId, Phase, PlayerId, Point, Room, ServerMessage, Stroke, ToolType,
};
use painter_server::broadcast::MemoryBroadcaster;
use painter_server::coordinator::{GameService, Settings};
use std::sync::Arc;
use uuid::Uuid;

pub struct Table {
    pub games: GameService,
    pub outbox: MemoryBroadcaster,
    pub game_id: GameId,
    pub players: Vec<PlayerId>,
}

impl Table {
    /// A lobby of `n` players; the first one hosts.
    pub fn lobby(n: usize) -> Self {
        let outbox = MemoryBroadcaster::new();
        let games = GameService::new(Arc::new(outbox.clone()), Settings::default());
        let players: Vec<PlayerId> = (0..n).map(|_| Uuid::new_v4()).collect();
        let game_id = games
            .create_game(players[0], "P1", Some(10), Some("test table".into()))
            .unwrap();
        for (i, player) in players.iter().enumerate().skip(1) {
            games
                .join_game(*player, game_id, &format!("P{}", i + 1))
                .unwrap();
        }
        Self {
            games,
            outbox,
            game_id,
            players,
        }
    }

    /// A started game of `n` players. Needs a tokio runtime for the timers.
    pub fn started(n: usize) -> Self {
        let table = Self::lobby(n);
        table
            .games
            .start_game(table.players[0], table.game_id)
            .unwrap();
        table.outbox.clear();
        table
    }

    pub fn game(&self) -> Game {
        self.games.snapshot(self.game_id).unwrap()
    }

    pub fn room_of(&self, player: PlayerId) -> Room {
        let game = self.game();
        let room_id = game.player(player).unwrap().current_room_id.unwrap();
        game.room(room_id).unwrap().clone()
    }

    /// Room index for every player, in seat order.
    pub fn seats(&self) -> Vec<usize> {
        let game = self.game();
        game.players
            .iter()
            .map(|p| game.room_index(p.current_room_id.unwrap()).unwrap())
            .collect()
    }

    pub fn phases(&self) -> Vec<Phase> {
        self.game().rooms.iter().map(|r| r.phase).collect()
    }

    pub fn kinds_sent_to(&self, player: PlayerId) -> Vec<&'static str> {
        self.outbox
            .sent_to(player)
            .iter()
            .map(ServerMessage::kind)
            .collect()
    }

    pub fn all_submit_prompts(&self) {
        for (i, player) in self.players.iter().enumerate() {
            self.games
                .submit_prompt(*player, self.game_id, &format!("prompt number {i}"))
                .unwrap();
        }
    }

    pub fn all_submit_drawings(&self) {
        for player in &self.players {
            self.games
                .submit_drawing(*player, self.game_id, sketch())
                .unwrap();
        }
    }

    pub fn all_submit_guesses(&self) {
        for (i, player) in self.players.iter().enumerate() {
            self.games
                .submit_guess(*player, self.game_id, &format!("guess number {i}"))
                .unwrap();
        }
    }
}

pub fn sketch() -> DrawingData {
    DrawingData {
        strokes: vec![Stroke {
            points: vec![Point { x: 10.0, y: 10.0 }, Point { x: 120.0, y: 80.0 }],
            color: "#000000".into(),
            width: 4.0,
            tool: ToolType::Brush,
        }],
        width: 800,
        height: 600,
    }
}
