use serde::{Deserialize, Serialize};

/// One roster entry as it appears on the wire: the player's self-asserted
/// id plus the emoji they play as.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerInfo {
    pub id: String,
    pub emoji: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ClientMessage {
    #[serde(rename = "playerJoined")]
    PlayerJoined {
        #[serde(rename = "playerId")]
        player_id: String,
        emoji: String,
    },
    #[serde(rename = "playerLeft")]
    PlayerLeft {
        #[serde(rename = "playerId")]
        player_id: String,
    },
    #[serde(rename = "playerMoved")]
    PlayerMoved {
        #[serde(rename = "playerId")]
        player_id: String,
        emoji: String,
        index: usize,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ServerMessage {
    /// Full snapshot, sent to a connection before anything else.
    #[serde(rename = "gameState")]
    GameState {
        board: Vec<Option<String>>,
        players: Vec<PlayerInfo>,
    },
    #[serde(rename = "playerJoined")]
    PlayerJoined {
        #[serde(rename = "playerId")]
        player_id: String,
        emoji: String,
    },
    #[serde(rename = "playerLeft")]
    PlayerLeft {
        #[serde(rename = "playerId")]
        player_id: String,
    },
    #[serde(rename = "playerMoved")]
    PlayerMoved {
        #[serde(rename = "playerId")]
        player_id: String,
        emoji: String,
        index: usize,
        // Omitted entirely when the move did not complete a line.
        #[serde(rename = "winningCells", skip_serializing_if = "Option::is_none")]
        winning_cells: Option<Vec<usize>>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn move_intent_uses_wire_field_names() {
        let msg: ClientMessage =
            serde_json::from_str(r#"{"type":"playerMoved","playerId":"p1","emoji":"🎈","index":7}"#)
                .expect("valid move intent");
        match msg {
            ClientMessage::PlayerMoved {
                player_id,
                emoji,
                index,
            } => {
                assert_eq!(player_id, "p1");
                assert_eq!(emoji, "🎈");
                assert_eq!(index, 7);
            }
            other => panic!("unexpected variant: {other:?}"),
        }
    }

    #[test]
    fn winning_cells_are_absent_without_a_win() {
        let json = serde_json::to_string(&ServerMessage::PlayerMoved {
            player_id: "p1".to_string(),
            emoji: "🎈".to_string(),
            index: 3,
            winning_cells: None,
        })
        .expect("serializable");
        assert!(!json.contains("winningCells"));

        let json = serde_json::to_string(&ServerMessage::PlayerMoved {
            player_id: "p1".to_string(),
            emoji: "🎈".to_string(),
            index: 4,
            winning_cells: Some(vec![0, 1, 2, 3, 4]),
        })
        .expect("serializable");
        assert!(json.contains(r#""winningCells":[0,1,2,3,4]"#));
    }

    #[test]
    fn snapshot_parses_nulls_as_empty_cells() {
        let msg: ServerMessage = serde_json::from_str(
            r#"{"type":"gameState","board":[null,"🎈",null],"players":[{"id":"p1","emoji":"🎈"}]}"#,
        )
        .expect("valid snapshot");
        match msg {
            ServerMessage::GameState { board, players } => {
                assert_eq!(board[0], None);
                assert_eq!(board[1].as_deref(), Some("🎈"));
                assert_eq!(players.len(), 1);
            }
            other => panic!("unexpected variant: {other:?}"),
        }
    }

    #[test]
    fn unknown_type_is_rejected() {
        assert!(serde_json::from_str::<ClientMessage>(r#"{"type":"resetGame"}"#).is_err());
    }
}
