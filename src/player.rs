use axum::extract::ws;
use rand::thread_rng;
use std::sync::Arc;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::config::GameConfig;
use crate::content::{Question, QuestionBankCache, unlocked_questions};
use crate::game::GameMode;
use crate::game::messages::{
    ClientToServerMessage, ServerToClientMessage, client_message_from_ws_text, token_views,
};
use crate::game::session::{
    FillBlankSession, FlashcardSession, GameSession, McqSession, SelectionOutcome,
};
use crate::scoring::ScoreLedger;
use crate::store::{StoreChange, StoreHandle, UNLOCKED_PATH, unlocked_ids_from_value};

#[derive(Debug)]
pub enum PlayerMessage {
    ClientEvent { raw_payload: String },
}

/// One actor per connected WebSocket client. Multiplexes client commands and
/// store-change pushes over a single inbox; holds the identity, the unlocked
/// pool snapshot and at most one active game session.
pub struct PlayerActor {
    receiver: mpsc::Receiver<PlayerMessage>,
    client_id: Uuid,
    client_tx: mpsc::Sender<ws::Message>,
    identity: String,
    store: StoreHandle,
    bank: Arc<QuestionBankCache>,
    ledger: Arc<ScoreLedger>,
    game_config: GameConfig,
    pool: Arc<Vec<Question>>,
    session: Option<GameSession>,
}

impl PlayerActor {
    async fn send_event(&self, event: ServerToClientMessage) {
        match event.to_ws_text() {
            Ok(ws_msg) => {
                if self.client_tx.send(ws_msg).await.is_err() {
                    tracing::warn!(
                        client.id = %self.client_id,
                        "Failed to send to client"
                    );
                }
            }
            Err(e) => {
                tracing::error!(
                    client.id = %self.client_id,
                    error = %e,
                    "Failed to serialize event for client"
                );
            }
        }
    }

    fn session_mode(&self) -> Option<GameMode> {
        self.session.as_ref().map(|session| match session {
            GameSession::MultipleChoice(_) => GameMode::MultipleChoice,
            GameSession::FillBlank(_) => GameMode::FillBlank,
            GameSession::Flashcards(_) => GameMode::Flashcards,
        })
    }

    fn build_session(&self, mode: GameMode) -> Option<GameSession> {
        let mut rng = thread_rng();
        match mode {
            GameMode::MultipleChoice => {
                McqSession::new(self.pool.clone(), self.game_config.option_count, &mut rng)
                    .map(GameSession::MultipleChoice)
            }
            GameMode::FillBlank => {
                FillBlankSession::new(self.pool.clone(), self.game_config.blank_count, &mut rng)
                    .map(GameSession::FillBlank)
            }
            GameMode::Flashcards => {
                FlashcardSession::new(self.pool.clone()).map(GameSession::Flashcards)
            }
        }
    }

    /// The event describing what the client should render right now for the
    /// active session: the current round, or the completion summary.
    fn current_round_event(&self) -> Option<ServerToClientMessage> {
        let session = self.session.as_ref()?;
        let event = match session {
            GameSession::MultipleChoice(mcq) => {
                if mcq.is_completed() {
                    ServerToClientMessage::SessionCompleted {
                        score: mcq.score(),
                        total: mcq.total(),
                    }
                } else {
                    ServerToClientMessage::McqQuestion {
                        index: mcq.index(),
                        total: mcq.total(),
                        question: mcq.question().question.clone(),
                        options: mcq.options().to_vec(),
                    }
                }
            }
            GameSession::FillBlank(fill) => {
                if fill.is_completed() {
                    ServerToClientMessage::SessionCompleted {
                        score: fill.score(),
                        total: fill.total(),
                    }
                } else {
                    ServerToClientMessage::FillQuestion {
                        index: fill.index(),
                        total: fill.total(),
                        question: fill.question().question.clone(),
                        tokens: token_views(fill),
                        options: fill.round().options.clone(),
                    }
                }
            }
            GameSession::Flashcards(flash) => {
                if flash.is_completed() {
                    ServerToClientMessage::SessionCompleted {
                        score: 0,
                        total: flash.total(),
                    }
                } else {
                    ServerToClientMessage::Flashcard {
                        index: flash.index(),
                        total: flash.total(),
                        question: flash.question().question.clone(),
                        answer: flash
                            .show_answer()
                            .then(|| flash.question().answer.clone()),
                    }
                }
            }
        };
        Some(event)
    }

    async fn award_correct_answer(&self) {
        match self
            .ledger
            .award(&self.identity, self.game_config.award_points)
            .await
        {
            Ok(Some(total)) => {
                self.send_event(ServerToClientMessage::PointsAwarded {
                    identity: self.identity.clone(),
                    total,
                })
                .await;
            }
            Ok(None) => {
                // Sentinel identity; the client keeps any tally locally.
            }
            Err(e) => {
                tracing::error!(
                    client.id = %self.client_id,
                    user.identity = %self.identity,
                    error = %e,
                    "Failed to award points"
                );
            }
        }
    }

    async fn handle_start_game(&mut self, mode: GameMode) {
        if self.pool.is_empty() {
            self.send_event(ServerToClientMessage::SystemError {
                message: "No questions unlocked yet. Please unlock in admin.".to_string(),
            })
            .await;
            return;
        }
        tracing::info!(
            client.id = %self.client_id,
            game.mode = mode.primary_id(),
            pool.size = self.pool.len(),
            "Starting game session"
        );
        self.session = self.build_session(mode);
        if let Some(event) = self.current_round_event() {
            self.send_event(event).await;
        }
    }

    async fn handle_select_option(&mut self, option: String) {
        let Some(GameSession::MultipleChoice(mcq)) = self.session.as_mut() else {
            self.send_event(ServerToClientMessage::SystemError {
                message: "No multiple-choice session in progress.".to_string(),
            })
            .await;
            return;
        };

        let correct_answer = mcq.question().answer.clone();
        match mcq.select(&option) {
            SelectionOutcome::Ignored => {}
            outcome => {
                let score = mcq.score();
                let correct = outcome == SelectionOutcome::Correct;
                self.send_event(ServerToClientMessage::SelectionResult {
                    correct,
                    correct_answer,
                    score,
                })
                .await;
                if correct {
                    self.award_correct_answer().await;
                }
            }
        }
    }

    async fn handle_fill_word(&mut self, word: String) {
        let Some(GameSession::FillBlank(fill)) = self.session.as_mut() else {
            self.send_event(ServerToClientMessage::SystemError {
                message: "No fill-in-the-blank session in progress.".to_string(),
            })
            .await;
            return;
        };

        if let Some(slot) = fill.fill_word(&word) {
            self.send_event(ServerToClientMessage::SlotFilled { slot, word })
                .await;
        }
    }

    async fn handle_check_answer(&mut self) {
        let Some(GameSession::FillBlank(fill)) = self.session.as_mut() else {
            self.send_event(ServerToClientMessage::SystemError {
                message: "No fill-in-the-blank session in progress.".to_string(),
            })
            .await;
            return;
        };

        let answer = fill.question().answer.clone();
        let outcome = fill.check();
        let score = fill.score();
        fill.advance(&mut thread_rng());

        self.send_event(ServerToClientMessage::CheckResult {
            correct: outcome.correct,
            answer,
            score,
        })
        .await;
        if outcome.correct {
            self.award_correct_answer().await;
        }
        if let Some(event) = self.current_round_event() {
            self.send_event(event).await;
        }
    }

    async fn handle_toggle_answer(&mut self) {
        let Some(GameSession::Flashcards(flash)) = self.session.as_mut() else {
            self.send_event(ServerToClientMessage::SystemError {
                message: "No flashcard session in progress.".to_string(),
            })
            .await;
            return;
        };

        flash.toggle_answer();
        if let Some(event) = self.current_round_event() {
            self.send_event(event).await;
        }
    }

    async fn handle_advance(&mut self) {
        // ThreadRng is not Send; keep it out of scope before any await.
        {
            let mut rng = thread_rng();
            match self.session.as_mut() {
                Some(GameSession::MultipleChoice(mcq)) => {
                    mcq.advance(&mut rng);
                }
                Some(GameSession::FillBlank(fill)) => {
                    fill.advance(&mut rng);
                }
                Some(GameSession::Flashcards(flash)) => {
                    flash.advance();
                }
                None => return,
            }
        }
        if let Some(event) = self.current_round_event() {
            self.send_event(event).await;
        }
    }

    async fn handle_restart(&mut self) {
        {
            let mut rng = thread_rng();
            match self.session.as_mut() {
                Some(GameSession::MultipleChoice(mcq)) => {
                    mcq.restart(&mut rng);
                }
                Some(GameSession::FillBlank(fill)) => {
                    fill.restart(&mut rng);
                }
                Some(GameSession::Flashcards(flash)) => {
                    flash.restart();
                }
                None => return,
            }
        }
        if let Some(event) = self.current_round_event() {
            self.send_event(event).await;
        }
    }

    /// Returns true when the client asked to leave and the actor should stop.
    async fn handle_client_event(&mut self, raw_payload: String) -> bool {
        tracing::trace!(
            client.id = %self.client_id,
            event.raw = %raw_payload,
            "Raw event from client"
        );

        let parsed = match client_message_from_ws_text(&raw_payload) {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::warn!(
                    client.id = %self.client_id,
                    error = %e,
                    "Failed to deserialize event from client"
                );
                self.send_event(ServerToClientMessage::SystemError {
                    message: format!("Invalid message format: {}", e),
                })
                .await;
                return false;
            }
        };

        match parsed {
            ClientToServerMessage::Hello { .. } => {
                tracing::debug!(
                    client.id = %self.client_id,
                    "Repeated Hello ignored"
                );
            }
            ClientToServerMessage::StartGame { mode } => self.handle_start_game(mode).await,
            ClientToServerMessage::SelectOption { option } => {
                self.handle_select_option(option).await
            }
            ClientToServerMessage::FillWord { word } => self.handle_fill_word(word).await,
            ClientToServerMessage::CheckAnswer => self.handle_check_answer().await,
            ClientToServerMessage::ToggleAnswer => self.handle_toggle_answer().await,
            ClientToServerMessage::Advance => self.handle_advance().await,
            ClientToServerMessage::Restart => self.handle_restart().await,
            ClientToServerMessage::LeaveSession => {
                tracing::info!(
                    client.id = %self.client_id,
                    "Client explicitly leaving session"
                );
                return true;
            }
        }
        false
    }

    /// Rebuilds the pool after an unlock change and restarts any active
    /// session against the new pool: a pool identity change is a new quiz.
    async fn handle_store_change(&mut self, change: StoreChange) {
        if change.path != UNLOCKED_PATH {
            return;
        }

        let unlocked_ids = unlocked_ids_from_value(&change.value);
        let questions = self.bank.questions().await;
        self.pool = Arc::new(unlocked_questions(&questions, &unlocked_ids));

        tracing::debug!(
            client.id = %self.client_id,
            pool.size = self.pool.len(),
            "Unlocked pool changed"
        );

        if let Some(mode) = self.session_mode() {
            self.session = self.build_session(mode);
        }

        self.send_event(ServerToClientMessage::PoolUpdated {
            unlocked_count: self.pool.len(),
        })
        .await;
        if let Some(event) = self.current_round_event() {
            self.send_event(event).await;
        }
    }
}

#[tracing::instrument(skip(actor), fields(
    client.id = %actor.client_id,
    user.identity = %actor.identity
))]
async fn run_player_actor(mut actor: PlayerActor) {
    tracing::info!("Player actor started");

    let (snapshot, mut store_changes) = match actor.store.subscribe().await {
        Ok(subscription) => subscription,
        Err(e) => {
            tracing::error!(error = %e, "Failed to subscribe to store");
            actor
                .send_event(ServerToClientMessage::SystemError {
                    message: "Server data is unavailable right now.".to_string(),
                })
                .await;
            return;
        }
    };

    let unlocked_ids = unlocked_ids_from_value(
        snapshot.get(UNLOCKED_PATH).unwrap_or(&serde_json::Value::Null),
    );
    let questions = actor.bank.questions().await;
    actor.pool = Arc::new(unlocked_questions(&questions, &unlocked_ids));

    actor
        .send_event(ServerToClientMessage::Welcome {
            identity: actor.identity.clone(),
            unlocked_count: actor.pool.len(),
        })
        .await;

    loop {
        tokio::select! {
            maybe_msg = actor.receiver.recv() => {
                match maybe_msg {
                    Some(PlayerMessage::ClientEvent { raw_payload }) => {
                        if actor.handle_client_event(raw_payload).await {
                            break;
                        }
                    }
                    None => {
                        tracing::debug!("Player actor channel closed");
                        break;
                    }
                }
            }
            change = store_changes.recv() => {
                match change {
                    Ok(change) => actor.handle_store_change(change).await,
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                        // Missed pushes; resync the pool from a fresh snapshot.
                        tracing::warn!(changes.skipped = skipped, "Store subscription lagged");
                        let unlocked_ids = actor.store.unlocked_ids().await;
                        let questions = actor.bank.questions().await;
                        actor.pool = Arc::new(unlocked_questions(&questions, &unlocked_ids));
                        if let Some(mode) = actor.session_mode() {
                            actor.session = actor.build_session(mode);
                        }
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => {
                        tracing::warn!("Store subscription closed");
                        break;
                    }
                }
            }
        }
    }

    tracing::info!("Player actor stopping");
}

#[derive(Clone, Debug)]
pub struct PlayerActorHandle {
    sender: mpsc::Sender<PlayerMessage>,
    pub client_id: Uuid,
}

impl PlayerActorHandle {
    #[allow(clippy::too_many_arguments)]
    pub fn spawn(
        client_id: Uuid,
        buffer_size: usize,
        client_tx: mpsc::Sender<ws::Message>,
        identity: String,
        store: StoreHandle,
        bank: Arc<QuestionBankCache>,
        ledger: Arc<ScoreLedger>,
        game_config: GameConfig,
    ) -> Self {
        let (sender, receiver) = mpsc::channel(buffer_size);
        let actor = PlayerActor {
            receiver,
            client_id,
            client_tx,
            identity,
            store,
            bank,
            ledger,
            game_config,
            pool: Arc::new(Vec::new()),
            session: None,
        };
        tokio::spawn(run_player_actor(actor));
        Self { sender, client_id }
    }

    pub async fn forward_client_event(&self, raw_payload: String) -> Result<(), String> {
        self.sender
            .send(PlayerMessage::ClientEvent { raw_payload })
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }
}
