use axum::extract::ws::Message;
use painter_models::{ConnectionStatus, EntryType, GameId, Phase, PlayerId};
use painter_server::coordinator::{GameService, Settings};
use painter_server::session::serve_connection;
use painter_server::state::ServerState;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tokio_stream::wrappers::UnboundedReceiverStream;
use uuid::Uuid;

struct Client {
    player_id: PlayerId,
    inbound: UnboundedSender<Result<Message, axum::Error>>,
    outbound: UnboundedReceiver<Message>,
    task: JoinHandle<()>,
}

impl Client {
    fn connect(state: &ServerState, games: &GameService) -> Self {
        let player_id = Uuid::new_v4();
        let (inbound, frames) = mpsc::unbounded_channel();
        let (sender, outbound) = mpsc::unbounded_channel();
        let task = tokio::spawn(serve_connection(
            player_id,
            UnboundedReceiverStream::new(frames),
            sender,
            state.clone(),
            games.clone(),
        ));
        Self {
            player_id,
            inbound,
            outbound,
            task,
        }
    }

    fn send(&self, kind: &str, payload: Value) {
        let text = json!({ "type": kind, "payload": payload }).to_string();
        self.inbound.send(Ok(Message::Text(text))).unwrap();
    }

    async fn expect(&mut self, kind: &str) -> Value {
        while let Some(frame) = self.outbound.recv().await {
            if let Message::Text(text) = frame {
                let parsed: Value = serde_json::from_str(&text).unwrap();
                if parsed["type"] == kind {
                    return parsed["payload"].clone();
                }
            }
        }
        panic!("connection closed while waiting for {kind}");
    }

    fn pings_received(&mut self) -> usize {
        let mut pings = 0;
        while let Ok(frame) = self.outbound.try_recv() {
            if matches!(frame, Message::Ping(_)) {
                pings += 1;
            }
        }
        pings
    }
}

fn server() -> (ServerState, GameService) {
    let state = ServerState::new();
    let games = GameService::new(Arc::new(state.clone()), Settings::default());
    (state, games)
}

async fn host_started_game(client: &mut Client, games: &GameService) -> GameId {
    client.send("createGame", json!({ "displayName": "Ann" }));
    let created = client.expect("gameCreated").await;
    let game_id: GameId = serde_json::from_value(created["game"]["id"].clone()).unwrap();
    games.join_game(Uuid::new_v4(), game_id, "Bob").unwrap();
    games.join_game(Uuid::new_v4(), game_id, "Cid").unwrap();
    client.send("startGame", json!({}));
    client.expect("gameStarted").await;
    game_id
}

#[tokio::test(start_paused = true)]
async fn silent_connection_is_dropped_and_its_player_auto_filled() {
    let (state, games) = server();
    let mut ann = Client::connect(&state, &games);
    let game_id = host_started_game(&mut ann, &games).await;

    // input clocks run out at 60s, then ann never draws and never pongs
    sleep(Duration::from_secs(95)).await;

    assert!(ann.task.is_finished());
    assert_eq!(state.peer_count(), 0);
    assert!(ann.pings_received() >= 2);

    let game = games.snapshot(game_id).unwrap();
    let player = game.player(ann.player_id).unwrap();
    assert_eq!(player.connection_status, ConnectionStatus::Disconnected);
    let room = game.room(player.current_room_id.unwrap()).unwrap();
    assert_eq!(room.phase, Phase::Draw);
    assert_eq!(room.chain.len(), 2);
    assert_eq!(room.chain[1].entry_type(), EntryType::Drawing);
    assert_eq!(room.chain[1].player_id, Some(ann.player_id));

    // the others still owe their drawings
    let waiting = game
        .rooms
        .iter()
        .filter(|r| r.chain.len() == 1 && r.phase == Phase::Draw)
        .count();
    assert_eq!(waiting, 2);
}

#[tokio::test(start_paused = true)]
async fn answering_pings_keeps_the_connection_open() {
    let (state, games) = server();
    let client = Client::connect(&state, &games);

    for _ in 0..5 {
        sleep(Duration::from_secs(30)).await;
        client.inbound.send(Ok(Message::Pong(Vec::new()))).unwrap();
    }
    sleep(Duration::from_secs(1)).await;
    assert!(!client.task.is_finished());
    assert_eq!(state.peer_count(), 1);

    drop(client.inbound);
    client.task.await.unwrap();
    assert_eq!(state.peer_count(), 0);
}
