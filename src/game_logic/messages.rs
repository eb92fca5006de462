use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;

use crate::game_logic::models::GameResult;
use crate::game_logic::versus::PlayerSlot;

/// In-game actions. Keyboard, pointer and gamepad input all end up here as a
/// plain choice index.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "command")]
pub enum PlayerCommand {
    SelectChoice { index: usize },
    SelectVersusChoice { player: PlayerSlot, index: usize },
    UseFiftyFifty,
    UseSmartHint,
    Skip,
    Quit,
}

/// Messages sent from a game client (WebSocket) to the server.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(tag = "messageType", content = "payload")]
pub enum ClientToServerMessage {
    /// Must be the first message after the WebSocket connects.
    JoinSession { session_id: Uuid },
    /// Leave without quitting the game for the other connected clients.
    LeaveSession,
    GameCommand(PlayerCommand),
}

/// Messages sent from the server to game clients.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(tag = "messageType", content = "payload")]
pub enum ServerToClientMessage {
    /// Full view of the running session.
    StateUpdate { state: JsonValue },
    /// Short transient message (lifeline used, storage full, hint failed...).
    Notice { message: String },
    GameFinished {
        result: GameResult,
        is_new_high_score: bool,
        unlocked_achievements: Vec<String>,
    },
    GameAborted,
    SystemError { message: String },
}

impl ServerToClientMessage {
    pub fn to_ws_text(&self) -> Result<axum::extract::ws::Message, serde_json::Error> {
        serde_json::to_string(self)
            .map(|json_string| axum::extract::ws::Message::Text(json_string.into()))
    }
}

pub fn client_message_from_ws_text(text: &str) -> Result<ClientToServerMessage, serde_json::Error> {
    serde_json::from_str(text)
}
