use crate::broadcast::Broadcaster;
use crate::coordinator::GameService;
use crate::error::GameError;
use crate::state::{Peer, ServerState};
use axum::extract::ws::{Message, WebSocket};
use futures::{Stream, StreamExt};
use painter_models::{
    ClientMessage, GameId, PlayerId, ServerMessage, HEARTBEAT_INTERVAL, HEARTBEAT_TIMEOUT,
};
use tokio::sync::mpsc::{self, UnboundedSender};
use tokio::time::{interval_at, Instant};
use tokio_stream::wrappers::UnboundedReceiverStream;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// One websocket connection. It is handed a player id on connect and is
/// attached to at most one game at a time.
#[derive(Debug)]
pub struct Session {
    pub player_id: PlayerId,
    pub game_id: Option<GameId>,
}

impl Session {
    pub fn new(player_id: PlayerId) -> Self {
        Self {
            player_id,
            game_id: None,
        }
    }

    fn current_game(&self) -> Result<GameId, GameError> {
        self.game_id.ok_or(GameError::NotInGame)
    }

    /// Applies one client request. Errors are for the caller to report back; a
    /// rejected request leaves the session and its game untouched.
    pub fn handle(
        &mut self,
        games: &GameService,
        broadcaster: &dyn Broadcaster,
        message: ClientMessage,
    ) -> Result<(), GameError> {
        let player_id = self.player_id;
        match message {
            ClientMessage::CreateGame {
                display_name,
                max_players,
                game_name,
            } => {
                games.check_create(&display_name, max_players)?;
                self.leave_current(games);
                let game_id = games.create_game(player_id, &display_name, max_players, game_name)?;
                self.game_id = Some(game_id);
            }
            ClientMessage::JoinGame {
                game_id,
                display_name,
            } => {
                if self.game_id == Some(game_id) {
                    return Err(GameError::AlreadyInGame);
                }
                games.check_join(game_id, &display_name)?;
                self.leave_current(games);
                games.join_game(player_id, game_id, &display_name)?;
                self.game_id = Some(game_id);
            }
            ClientMessage::LeaveGame {} => {
                let game_id = self.current_game()?;
                self.game_id = None;
                games.disconnect(player_id, game_id)?;
                broadcaster.to_player(player_id, &ServerMessage::LeftGame {});
            }
            ClientMessage::StartGame {} => games.start_game(player_id, self.current_game()?)?,
            ClientMessage::SubmitPrompt { prompt } => {
                games.submit_prompt(player_id, self.current_game()?, &prompt)?
            }
            ClientMessage::SubmitDrawing { drawing_data } => {
                games.submit_drawing(player_id, self.current_game()?, drawing_data)?
            }
            ClientMessage::SubmitGuess { guess } => {
                games.submit_guess(player_id, self.current_game()?, &guess)?
            }
            ClientMessage::UpdatePlayerIcon { icon } => {
                games.update_player_icon(player_id, self.current_game()?, icon)?
            }
            ClientMessage::GetGameList {} => {
                let games = games.all_games();
                broadcaster.to_player(player_id, &ServerMessage::GameList { games });
            }
        }
        Ok(())
    }

    /// Detaches from the current game, running the disconnect path.
    pub fn leave_current(&mut self, games: &GameService) {
        if let Some(game_id) = self.game_id.take() {
            if let Err(e) = games.disconnect(self.player_id, game_id) {
                debug!(player_id = %self.player_id, game_id = %game_id, "leave: {e}");
            }
        }
    }
}

pub async fn handle_socket(socket: WebSocket, state: ServerState, games: GameService) {
    let (sink, stream) = socket.split();
    let (sender, receiver) = mpsc::unbounded_channel();
    let forward = tokio::spawn(UnboundedReceiverStream::new(receiver).map(Ok).forward(sink));

    serve_connection(Uuid::new_v4(), stream, sender, state, games).await;
    forward.abort();
}

/// Drives one connection until the client closes it, the transport fails or it
/// stops answering pings. Outbound frames are queued on `sender`.
pub async fn serve_connection<S>(
    player_id: PlayerId,
    mut stream: S,
    sender: UnboundedSender<Message>,
    state: ServerState,
    games: GameService,
) where
    S: Stream<Item = Result<Message, axum::Error>> + Unpin,
{
    state.add_peer(Peer {
        id: player_id,
        sender,
    });
    info!(player_id = %player_id, "connection established");

    let mut session = Session::new(player_id);
    let mut last_pong = Instant::now();
    let mut heartbeat = interval_at(Instant::now() + HEARTBEAT_INTERVAL, HEARTBEAT_INTERVAL);
    loop {
        let frame = tokio::select! {
            frame = stream.next() => frame,
            _ = heartbeat.tick() => {
                if last_pong.elapsed() > HEARTBEAT_TIMEOUT {
                    warn!(player_id = %player_id, "no pong for {:?}, closing stale connection", last_pong.elapsed());
                    break;
                }
                if let Err(e) = state.try_send(player_id, Message::Ping(Vec::new())) {
                    debug!(player_id = %player_id, "ping not sent: {e}");
                }
                continue;
            }
        };

        let text = match frame {
            Some(Ok(Message::Text(text))) => text,
            Some(Ok(Message::Pong(_))) => {
                last_pong = Instant::now();
                continue;
            }
            Some(Ok(Message::Close(_))) | None => {
                info!(player_id = %player_id, "connection closed by client");
                break;
            }
            Some(Ok(_)) => continue,
            Some(Err(e)) => {
                warn!(player_id = %player_id, "unrecoverable websocket error: {e}");
                break;
            }
        };

        let message = match serde_json::from_str::<ClientMessage>(&text) {
            Ok(message) => message,
            Err(e) => {
                state.to_player(player_id, &ServerMessage::error(format!("Invalid message: {e}")));
                continue;
            }
        };
        if let Err(e) = session.handle(&games, &state, message) {
            debug!(player_id = %player_id, "request rejected: {e}");
            state.to_player(player_id, &ServerMessage::error(e.to_string()));
        }
    }

    session.leave_current(&games);
    state.remove_peer(&player_id);
    info!(player_id = %player_id, "connection removed");
}
