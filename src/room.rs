use std::collections::HashMap;

use log::debug;
use tokio::sync::mpsc;
use tokio::sync::Mutex;
use warp::ws::Message;

use crate::board::{self, Board};
use crate::messages::{PlayerInfo, ServerMessage};

pub type ConnectionTx = mpsc::UnboundedSender<Message>;

/// One game room: the canonical board, the roster, and the outbound
/// channel of every attached connection. All of it sits behind a single
/// lock so each intent is applied and broadcast as one atomic step, in
/// arrival order.
pub struct Room {
    id: String,
    state: Mutex<RoomState>,
}

struct RoomState {
    board: Board,
    players: HashMap<String, PlayerInfo>, // connection id -> player
    connections: HashMap<String, ConnectionTx>,
    winning_line: Option<[usize; board::SIDE]>,
}

impl Room {
    pub fn new(id: String) -> Self {
        Room {
            id,
            state: Mutex::new(RoomState {
                board: board::empty_board(),
                players: HashMap::new(),
                connections: HashMap::new(),
                winning_line: None,
            }),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Registers a connection. The snapshot is queued on its channel before
    /// the connection enters the broadcast set, so a late joiner never sees
    /// a delta ahead of the full state.
    pub async fn attach(&self, connection_id: String, tx: ConnectionTx) {
        let mut state = self.state.lock().await;
        let snapshot = ServerMessage::GameState {
            board: state.board.clone(),
            players: state.players.values().cloned().collect(),
        };
        send_to(&tx, &snapshot);
        state.connections.insert(connection_id, tx);
    }

    /// Inserts or overwrites the roster entry for this connection and tells
    /// everyone, the joiner included. Nothing about the claimed id or emoji
    /// is validated.
    pub async fn join(&self, connection_id: &str, player_id: String, emoji: String) {
        let mut state = self.state.lock().await;
        state.players.insert(
            connection_id.to_string(),
            PlayerInfo {
                id: player_id.clone(),
                emoji: emoji.clone(),
            },
        );
        state.broadcast(&ServerMessage::PlayerJoined { player_id, emoji }, None);
    }

    /// Explicit leave intent: drops the sender's roster entry if present
    /// and notifies the other connections with the claimed player id.
    pub async fn leave(&self, connection_id: &str, player_id: String) {
        let mut state = self.state.lock().await;
        state.players.remove(connection_id);
        state.broadcast(&ServerMessage::PlayerLeft { player_id }, Some(connection_id));
    }

    pub async fn apply_move(&self, player_id: String, emoji: String, index: usize) {
        let mut state = self.state.lock().await;
        if state.winning_line.is_some() {
            debug!("room {}: move at {} dropped, game already won", self.id, index);
            return;
        }
        if !board::in_bounds(index) || state.board[index].is_some() {
            debug!("room {}: move at {} dropped", self.id, index);
            return;
        }

        state.board[index] = Some(emoji.clone());
        state.winning_line = board::winning_line(&state.board, &emoji);
        let winning_cells = state.winning_line.map(|cells| cells.to_vec());
        state.broadcast(
            &ServerMessage::PlayerMoved {
                player_id,
                emoji,
                index,
                winning_cells,
            },
            None,
        );
    }

    /// Transport-level close: removes the connection and, only if it had a
    /// roster entry, notifies the others. Idempotent. Returns how many
    /// connections remain attached.
    pub async fn detach(&self, connection_id: &str) -> usize {
        let mut state = self.state.lock().await;
        state.connections.remove(connection_id);
        if let Some(player) = state.players.remove(connection_id) {
            state.broadcast(
                &ServerMessage::PlayerLeft {
                    player_id: player.id,
                },
                Some(connection_id),
            );
        }
        state.connections.len()
    }
}

impl RoomState {
    fn broadcast(&self, message: &ServerMessage, except: Option<&str>) {
        if let Ok(text) = serde_json::to_string(message) {
            for (connection_id, tx) in &self.connections {
                if Some(connection_id.as_str()) != except {
                    // Fire-and-forget: a dead receiver is cleaned up on detach.
                    let _ = tx.send(Message::text(text.clone()));
                }
            }
        }
    }
}

fn send_to(tx: &ConnectionTx, message: &ServerMessage) {
    if let Ok(text) = serde_json::to_string(message) {
        let _ = tx.send(Message::text(text));
    }
}
