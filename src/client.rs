use std::time::{Duration, Instant};

use futures_util::{SinkExt, StreamExt};
use log::warn;
use rand::Rng;
use thiserror::Error;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use uuid::Uuid;

use crate::board::{self, Board};
use crate::messages::{ClientMessage, PlayerInfo, ServerMessage};

pub const PRIMARY_PALETTE: [&str; 5] = ["🎈", "🌟", "🎨", "🎮", "🎪"];
pub const FALLBACK_PALETTE: [&str; 5] = ["🎭", "🎲", "🎯", "🎸", "🎹"];
pub const MOVE_COOLDOWN: Duration = Duration::from_secs(1);

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("websocket transport error: {0}")]
    Transport(#[from] tungstenite::Error),
    #[error("message encoding failed: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Picks an emoji for a new player: the first primary-palette entry not in
/// use in `players`, or a random fallback once the primary set is taken.
pub fn choose_emoji(players: &[PlayerInfo]) -> String {
    for candidate in PRIMARY_PALETTE {
        if !players.iter().any(|p| p.emoji == candidate) {
            return candidate.to_string();
        }
    }
    let pick = rand::thread_rng().gen_range(0..FALLBACK_PALETTE.len());
    FALLBACK_PALETTE[pick].to_string()
}

/// Non-authoritative mirror of one room, rebuilt purely from authority
/// broadcasts. The UI reads from it and feeds clicks through [`RoomClient::try_move`];
/// it never mutates the board on its own.
pub struct RoomClient {
    player_id: String,
    emoji: Option<String>,
    board: Board,
    players: Vec<PlayerInfo>,
    winning_cells: Option<Vec<usize>>,
    has_won: bool,
    cooldown_until: Option<Instant>,
}

impl RoomClient {
    pub fn new() -> Self {
        Self::with_player_id(Uuid::new_v4().to_string())
    }

    pub fn with_player_id(player_id: String) -> Self {
        RoomClient {
            player_id,
            emoji: None,
            board: board::empty_board(),
            players: Vec::new(),
            winning_cells: None,
            has_won: false,
            cooldown_until: None,
        }
    }

    pub fn player_id(&self) -> &str {
        &self.player_id
    }

    pub fn emoji(&self) -> Option<&str> {
        self.emoji.as_deref()
    }

    pub fn board(&self) -> &[Option<String>] {
        &self.board
    }

    pub fn players(&self) -> &[PlayerInfo] {
        &self.players
    }

    pub fn has_won(&self) -> bool {
        self.has_won
    }

    pub fn winning_cells(&self) -> Option<&[usize]> {
        self.winning_cells.as_deref()
    }

    /// Applies an authoritative broadcast to the mirror.
    pub fn apply(&mut self, message: &ServerMessage) {
        match message {
            ServerMessage::GameState { board, players } => {
                self.board = board.clone();
                self.players = players.clone();
            }
            ServerMessage::PlayerJoined { player_id, emoji } => {
                self.players.push(PlayerInfo {
                    id: player_id.clone(),
                    emoji: emoji.clone(),
                });
            }
            ServerMessage::PlayerLeft { player_id } => {
                self.players.retain(|p| p.id != *player_id);
            }
            ServerMessage::PlayerMoved {
                emoji,
                index,
                winning_cells,
                ..
            } => {
                if let Some(cell) = self.board.get_mut(*index) {
                    *cell = Some(emoji.clone());
                }
                if let Some(cells) = winning_cells {
                    self.winning_cells = Some(cells.clone());
                    self.has_won = true;
                }
            }
        }
    }

    /// Picks this client's emoji against the roster seen so far (once; later
    /// calls reuse the choice) and returns the join intent to send.
    pub fn join(&mut self) -> ClientMessage {
        let emoji = match &self.emoji {
            Some(emoji) => emoji.clone(),
            None => {
                let picked = choose_emoji(&self.players);
                self.emoji = Some(picked.clone());
                picked
            }
        };
        ClientMessage::PlayerJoined {
            player_id: self.player_id.clone(),
            emoji,
        }
    }

    pub fn leave(&self) -> ClientMessage {
        ClientMessage::PlayerLeft {
            player_id: self.player_id.clone(),
        }
    }

    /// Returns a move intent if the cell is empty in the mirror, the game is
    /// not won, the client has joined, and the cooldown has elapsed. Emitting
    /// starts a fresh cooldown no matter what the server ends up doing with
    /// the intent.
    pub fn try_move(&mut self, index: usize, now: Instant) -> Option<ClientMessage> {
        if self.has_won || !board::in_bounds(index) || self.board[index].is_some() {
            return None;
        }
        if let Some(until) = self.cooldown_until {
            if now < until {
                return None;
            }
        }
        let emoji = self.emoji.clone()?;
        self.cooldown_until = Some(now + MOVE_COOLDOWN);
        Some(ClientMessage::PlayerMoved {
            player_id: self.player_id.clone(),
            emoji,
            index,
        })
    }
}

impl Default for RoomClient {
    fn default() -> Self {
        Self::new()
    }
}

/// WebSocket half of the client: serializes intents out, deserializes
/// authority broadcasts in.
pub struct RoomSocket {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl RoomSocket {
    /// Connects to a room endpoint, e.g. `ws://host:1999/room/<room-id>`.
    pub async fn connect(url: &str) -> Result<Self, ClientError> {
        let (stream, _) = connect_async(url).await?;
        Ok(RoomSocket { stream })
    }

    pub async fn send(&mut self, message: &ClientMessage) -> Result<(), ClientError> {
        let text = serde_json::to_string(message)?;
        self.stream.send(tungstenite::Message::text(text)).await?;
        Ok(())
    }

    /// Next authoritative message. Frames that fail to parse are logged and
    /// skipped; `None` means the connection is gone.
    pub async fn recv(&mut self) -> Option<ServerMessage> {
        while let Some(result) = self.stream.next().await {
            match result {
                Ok(tungstenite::Message::Text(text)) => match serde_json::from_str(&text) {
                    Ok(message) => return Some(message),
                    Err(e) => warn!("dropping malformed server message: {e}"),
                },
                Ok(tungstenite::Message::Close(_)) => return None,
                Ok(_) => {}
                Err(tungstenite::Error::ConnectionClosed) => return None,
                Err(e) => {
                    warn!("websocket receive error: {e}");
                    return None;
                }
            }
        }
        None
    }

    pub async fn close(mut self) -> Result<(), ClientError> {
        self.stream.close(None).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roster(emojis: &[&str]) -> Vec<PlayerInfo> {
        emojis
            .iter()
            .enumerate()
            .map(|(i, emoji)| PlayerInfo {
                id: format!("p{i}"),
                emoji: (*emoji).to_string(),
            })
            .collect()
    }

    #[test]
    fn emoji_choice_takes_first_unused_primary() {
        assert_eq!(choose_emoji(&roster(&[])), "🎈");
        assert_eq!(choose_emoji(&roster(&["🎈"])), "🌟");
        assert_eq!(choose_emoji(&roster(&["🎈", "🌟", "🎨"])), "🎮");
        // Duplicates in the roster do not free up an emoji.
        assert_eq!(choose_emoji(&roster(&["🎈", "🎈"])), "🌟");
    }

    #[test]
    fn emoji_choice_falls_back_once_primary_is_exhausted() {
        let taken = roster(&PRIMARY_PALETTE);
        for _ in 0..20 {
            let picked = choose_emoji(&taken);
            assert!(FALLBACK_PALETTE.contains(&picked.as_str()), "{picked}");
        }
    }

    #[test]
    fn join_picks_once_and_reuses_the_choice() {
        let mut client = RoomClient::with_player_id("me".to_string());
        client.apply(&ServerMessage::PlayerJoined {
            player_id: "p0".to_string(),
            emoji: "🎈".to_string(),
        });
        let first = client.join();
        let second = client.join();
        match (first, second) {
            (
                ClientMessage::PlayerJoined { emoji: a, .. },
                ClientMessage::PlayerJoined { emoji: b, .. },
            ) => {
                assert_eq!(a, "🌟");
                assert_eq!(a, b);
            }
            other => panic!("unexpected intents: {other:?}"),
        }
    }

    #[test]
    fn snapshot_replaces_mirror_wholesale() {
        let mut client = RoomClient::with_player_id("me".to_string());
        client.apply(&ServerMessage::PlayerJoined {
            player_id: "stale".to_string(),
            emoji: "🎪".to_string(),
        });

        let mut board = board::empty_board();
        board[12] = Some("🎈".to_string());
        client.apply(&ServerMessage::GameState {
            board,
            players: roster(&["🎮"]),
        });

        assert_eq!(client.board()[12].as_deref(), Some("🎈"));
        assert_eq!(client.players().len(), 1);
        assert_eq!(client.players()[0].emoji, "🎮");
    }

    #[test]
    fn roster_mirror_tracks_joins_and_leaves() {
        let mut client = RoomClient::with_player_id("me".to_string());
        client.apply(&ServerMessage::PlayerJoined {
            player_id: "p0".to_string(),
            emoji: "🎈".to_string(),
        });
        client.apply(&ServerMessage::PlayerJoined {
            player_id: "p1".to_string(),
            emoji: "🌟".to_string(),
        });
        client.apply(&ServerMessage::PlayerLeft {
            player_id: "p0".to_string(),
        });
        assert_eq!(client.players().len(), 1);
        assert_eq!(client.players()[0].id, "p1");
        assert_eq!(client.players()[0].emoji, "🌟");
    }

    #[test]
    fn move_requires_a_join_first() {
        let mut client = RoomClient::with_player_id("me".to_string());
        assert!(client.try_move(0, Instant::now()).is_none());
        let _ = client.join();
        assert!(client.try_move(0, Instant::now()).is_some());
    }

    #[test]
    fn cooldown_blocks_until_elapsed() {
        let mut client = RoomClient::with_player_id("me".to_string());
        let _ = client.join();
        let t0 = Instant::now();

        assert!(client.try_move(0, t0).is_some());
        assert!(client.try_move(1, t0 + Duration::from_millis(500)).is_none());
        assert!(client.try_move(1, t0 + MOVE_COOLDOWN).is_some());
    }

    #[test]
    fn occupied_and_out_of_range_cells_are_not_playable() {
        let mut client = RoomClient::with_player_id("me".to_string());
        let _ = client.join();
        client.apply(&ServerMessage::PlayerMoved {
            player_id: "p0".to_string(),
            emoji: "🎈".to_string(),
            index: 3,
            winning_cells: None,
        });
        let now = Instant::now();
        assert!(client.try_move(3, now).is_none());
        assert!(client.try_move(25, now).is_none());
        assert!(client.try_move(2, now).is_some());
    }

    #[test]
    fn won_flag_comes_only_from_the_authority_and_freezes_moves() {
        let mut client = RoomClient::with_player_id("me".to_string());
        let _ = client.join();

        // A full local line without winningCells does not end the game.
        for index in 0..5 {
            client.apply(&ServerMessage::PlayerMoved {
                player_id: "p0".to_string(),
                emoji: "🎈".to_string(),
                index,
                winning_cells: None,
            });
        }
        assert!(!client.has_won());
        assert!(client.try_move(10, Instant::now()).is_some());

        client.apply(&ServerMessage::PlayerMoved {
            player_id: "p0".to_string(),
            emoji: "🎈".to_string(),
            index: 9,
            winning_cells: Some(vec![5, 6, 7, 8, 9]),
        });
        assert!(client.has_won());
        assert_eq!(client.winning_cells(), Some(&[5, 6, 7, 8, 9][..]));
        assert!(client.try_move(11, Instant::now() + MOVE_COOLDOWN).is_none());
    }
}
