use crate::broadcast::Broadcaster;
use crate::error::DeliveryError;
use axum::extract::ws::Message;
use painter_models::{PlayerId, ServerMessage};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, error};

pub type StateObj<T> = Arc<RwLock<T>>;

/// Locks without propagating poison: a panic in one game must not wedge the rest.
pub fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

pub fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

pub fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Debug, Clone)]
pub(crate) struct Peer {
    pub id: PlayerId,
    pub sender: UnboundedSender<Message>,
}

/// Live websocket connections, keyed by the player id handed out on connect.
#[derive(Default, Debug, Clone)]
pub struct ServerState {
    peers: StateObj<HashMap<PlayerId, Peer>>,
}

impl ServerState {
    pub fn new() -> Self {
        Default::default()
    }

    pub(crate) fn add_peer(&self, peer: Peer) {
        write(&self.peers).insert(peer.id, peer);
    }

    pub(crate) fn remove_peer(&self, id: &PlayerId) -> Option<Peer> {
        write(&self.peers).remove(id)
    }

    pub fn peer_count(&self) -> usize {
        read(&self.peers).len()
    }

    /// Send a message to a peer without blocking.
    pub fn try_send(&self, id: PlayerId, message: Message) -> Result<(), DeliveryError> {
        let peers = read(&self.peers);
        let peer = peers.get(&id).ok_or(DeliveryError::UnknownPlayer)?;
        peer.sender.send(message).map_err(|_| DeliveryError::Closed)
    }
}

fn encode(message: &ServerMessage) -> Result<Message, DeliveryError> {
    Ok(Message::Text(serde_json::to_string(message)?))
}

impl Broadcaster for ServerState {
    fn to_player(&self, player_id: PlayerId, message: &ServerMessage) {
        let result = encode(message).and_then(|text| self.try_send(player_id, text));
        match result {
            Ok(()) => {}
            // disconnected players keep their seat, nothing to deliver to
            Err(DeliveryError::UnknownPlayer) => {
                debug!(player_id = %player_id, kind = message.kind(), "no connection, dropping message")
            }
            Err(e) => error!(player_id = %player_id, kind = message.kind(), "error sending: {e}"),
        }
    }

    fn to_all(&self, message: &ServerMessage) {
        let text = match encode(message) {
            Ok(text) => text,
            Err(e) => {
                error!(kind = message.kind(), "error encoding broadcast: {e}");
                return;
            }
        };
        for peer in read(&self.peers).values() {
            if peer.sender.send(text.clone()).is_err() {
                debug!(player_id = %peer.id, "peer channel closed");
            }
        }
    }
}
