use serde::{Deserialize, Serialize};

use crate::game::GameMode;
use crate::game::session::FillBlankSession;

/// Messages sent from a game client (WebSocket) to the server.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(tag = "messageType", content = "payload")]
pub enum ClientToServerMessage {
    /// Sent immediately after connecting to pick an identity. An empty or
    /// missing nickname silently falls back to the guest identity.
    Hello { nickname: Option<String> },
    /// Starts (or switches to) a game mode over the unlocked pool.
    StartGame { mode: GameMode },
    /// Multiple choice: pick an option. First selection per question wins.
    SelectOption { option: String },
    /// Fill-in-the-blank: place a word into the next empty slot.
    FillWord { word: String },
    /// Fill-in-the-blank: evaluate the filled slots and move on.
    CheckAnswer,
    /// Flashcards: flip between question and answer.
    ToggleAnswer,
    Advance,
    Restart,
    /// Explicitly leave; the connection is closed.
    LeaveSession,
}

/// Client-facing view of one answer token. Hidden tokens carry no text until
/// the player fills them.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct TokenView {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    pub hidden: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filled: Option<String>,
}

/// Messages sent from the server to a game client.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(tag = "messageType", content = "payload")]
pub enum ServerToClientMessage {
    Welcome {
        identity: String,
        unlocked_count: usize,
    },
    /// The unlocked pool changed; any active session was restarted over the
    /// new pool.
    PoolUpdated {
        unlocked_count: usize,
    },
    McqQuestion {
        index: usize,
        total: usize,
        question: String,
        options: Vec<String>,
    },
    SelectionResult {
        correct: bool,
        correct_answer: String,
        score: u32,
    },
    FillQuestion {
        index: usize,
        total: usize,
        question: String,
        tokens: Vec<TokenView>,
        options: Vec<String>,
    },
    SlotFilled {
        slot: usize,
        word: String,
    },
    CheckResult {
        correct: bool,
        answer: String,
        score: u32,
    },
    Flashcard {
        index: usize,
        total: usize,
        question: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        answer: Option<String>,
    },
    SessionCompleted {
        score: u32,
        total: usize,
    },
    PointsAwarded {
        identity: String,
        total: i64,
    },
    SystemError {
        message: String,
    },
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

/// Builds the masked token views for a fill-in-the-blank round: visible
/// tokens show their text, hidden tokens only what the player has placed.
pub fn token_views(session: &FillBlankSession) -> Vec<TokenView> {
    session
        .round()
        .tokens
        .iter()
        .zip(session.filled())
        .map(|(token, filled)| {
            if token.hidden {
                TokenView {
                    text: None,
                    hidden: true,
                    filled: filled.clone(),
                }
            } else {
                TokenView {
                    text: Some(token.original.clone()),
                    hidden: false,
                    filled: None,
                }
            }
        })
        .collect()
}
