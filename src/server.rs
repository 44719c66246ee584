use std::collections::HashMap;
use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use log::{info, warn};
use tokio::sync::{mpsc, RwLock};
use uuid::Uuid;
use warp::ws::WebSocket;
use warp::Filter;

use crate::messages::ClientMessage;
use crate::room::Room;

type Rooms = Arc<RwLock<HashMap<String, Arc<Room>>>>;

/// Process-wide room registry. A room is created on the first connection
/// to its id and disposed when the last connection closes; distinct rooms
/// share nothing and run fully concurrently.
#[derive(Clone, Default)]
pub struct Server {
    rooms: Rooms,
}

impl Server {
    pub fn new() -> Self {
        Server {
            rooms: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub async fn room_count(&self) -> usize {
        self.rooms.read().await.len()
    }

    pub async fn handle_connection(&self, room_id: String, ws: WebSocket) {
        let connection_id = Uuid::new_v4().to_string();
        let (mut ws_tx, mut ws_rx) = ws.split();
        let (tx, mut rx) = mpsc::unbounded_channel();

        // Get-or-create and attach under the registry lock, so a concurrent
        // disposal of the same room cannot strand this connection.
        let room = {
            let mut rooms = self.rooms.write().await;
            let room = rooms
                .entry(room_id.clone())
                .or_insert_with(|| Arc::new(Room::new(room_id.clone())))
                .clone();
            room.attach(connection_id.clone(), tx).await;
            room
        };
        info!("connection {connection_id} attached to room {room_id}");

        tokio::spawn(async move {
            while let Some(message) = rx.recv().await {
                if ws_tx.send(message).await.is_err() {
                    break;
                }
            }
        });

        while let Some(result) = ws_rx.next().await {
            match result {
                Ok(msg) => {
                    if let Ok(text) = msg.to_str() {
                        match serde_json::from_str::<ClientMessage>(text) {
                            Ok(client_msg) => dispatch(&room, &connection_id, client_msg).await,
                            Err(e) => {
                                warn!("room {}: dropping malformed message: {e}", room.id());
                            }
                        }
                    }
                }
                Err(e) => {
                    warn!("websocket error on connection {connection_id}: {e}");
                    break;
                }
            }
        }

        let mut rooms = self.rooms.write().await;
        if room.detach(&connection_id).await == 0 {
            rooms.remove(&room_id);
            info!("connection {connection_id} closed, room {room_id} disposed");
        } else {
            info!("connection {connection_id} closed");
        }
    }
}

async fn dispatch(room: &Room, connection_id: &str, message: ClientMessage) {
    match message {
        ClientMessage::PlayerJoined { player_id, emoji } => {
            room.join(connection_id, player_id, emoji).await;
        }
        ClientMessage::PlayerLeft { player_id } => {
            room.leave(connection_id, player_id).await;
        }
        ClientMessage::PlayerMoved {
            player_id,
            emoji,
            index,
        } => {
            room.apply_move(player_id, emoji, index).await;
        }
    }
}

/// The warp routes: WebSocket upgrades on `/room/<room-id>` plus whatever
/// UI is deployed under `public/`.
pub fn routes(
    server: Arc<Server>,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    let ws_route = warp::path!("room" / String)
        .and(warp::ws())
        .map(move |room_id: String, ws: warp::ws::Ws| {
            let server = server.clone();
            ws.on_upgrade(move |socket| async move {
                server.handle_connection(room_id, socket).await;
            })
        });

    let static_files = warp::fs::dir("public");

    ws_route
        .or(static_files)
        .with(warp::cors().allow_any_origin())
}
