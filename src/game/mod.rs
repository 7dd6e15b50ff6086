use serde::{Deserialize, Serialize};

pub mod blanks;
pub mod messages;
pub mod sampler;
pub mod session;
pub mod shuffle;

pub use messages::{ClientToServerMessage, ServerToClientMessage};
pub use session::{FillBlankSession, FlashcardSession, GameSession, McqSession};

/// The three quiz modes. Multiple choice and fill-in-the-blank are scored;
/// flashcards have no correctness evaluation.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum GameMode {
    MultipleChoice,
    FillBlank,
    Flashcards,
}

impl GameMode {
    pub fn primary_id(&self) -> &'static str {
        match self {
            GameMode::MultipleChoice => "multiple_choice",
            GameMode::FillBlank => "fill_blank",
            GameMode::Flashcards => "flashcards",
        }
    }
}
