use rand::Rng;
use std::sync::Arc;

use crate::content::Question;
use crate::game::blanks::{FillBlankRound, generate_blanks};
use crate::game::sampler::sample_options;

/// Result of a multiple-choice selection. The first selection per question is
/// terminal; anything after it (or after completion) is `Ignored`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionOutcome {
    Correct,
    Incorrect,
    Ignored,
}

/// A multiple-choice run over a fixed pool snapshot. The option set is
/// regenerated every time the active question changes.
#[derive(Debug, Clone)]
pub struct McqSession {
    pool: Arc<Vec<Question>>,
    option_count: usize,
    index: usize,
    score: u32,
    completed: bool,
    options: Vec<String>,
    selected: Option<String>,
}

impl McqSession {
    pub fn new(pool: Arc<Vec<Question>>, option_count: usize, rng: &mut impl Rng) -> Option<Self> {
        if pool.is_empty() {
            return None;
        }
        let options = sample_options(&pool, 0, option_count, rng);
        Some(Self {
            pool,
            option_count,
            index: 0,
            score: 0,
            completed: false,
            options,
            selected: None,
        })
    }

    /// Records the user's selection and scores it immediately by exact string
    /// equality against the correct answer.
    pub fn select(&mut self, option: &str) -> SelectionOutcome {
        if self.completed || self.selected.is_some() {
            return SelectionOutcome::Ignored;
        }
        self.selected = Some(option.to_string());
        if option == self.pool[self.index].answer {
            self.score += 1;
            SelectionOutcome::Correct
        } else {
            SelectionOutcome::Incorrect
        }
    }

    /// Moves to the next question, or into `completed` when the index would
    /// reach the pool length. Returns false once completed.
    pub fn advance(&mut self, rng: &mut impl Rng) -> bool {
        if self.completed {
            return false;
        }
        if self.index + 1 == self.pool.len() {
            self.completed = true;
            return false;
        }
        self.index += 1;
        self.options = sample_options(&self.pool, self.index, self.option_count, rng);
        self.selected = None;
        true
    }

    pub fn restart(&mut self, rng: &mut impl Rng) {
        self.index = 0;
        self.score = 0;
        self.completed = false;
        self.selected = None;
        self.options = sample_options(&self.pool, 0, self.option_count, rng);
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn total(&self) -> usize {
        self.pool.len()
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn is_completed(&self) -> bool {
        self.completed
    }

    pub fn options(&self) -> &[String] {
        &self.options
    }

    pub fn question(&self) -> &Question {
        &self.pool[self.index]
    }
}

/// Outcome of a fill-in-the-blank check action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckOutcome {
    pub correct: bool,
}

/// A fill-in-the-blank run. Word selections fill the next empty hidden slot
/// in left-to-right order; the explicit check action compares every hidden
/// slot against its original word, all-or-nothing.
#[derive(Debug, Clone)]
pub struct FillBlankSession {
    pool: Arc<Vec<Question>>,
    blank_count: usize,
    index: usize,
    score: u32,
    completed: bool,
    round: FillBlankRound,
    /// Parallel to `round.tokens`; only hidden slots are ever filled.
    filled: Vec<Option<String>>,
    checked: bool,
}

impl FillBlankSession {
    pub fn new(pool: Arc<Vec<Question>>, blank_count: usize, rng: &mut impl Rng) -> Option<Self> {
        if pool.is_empty() {
            return None;
        }
        let round = generate_blanks(&pool, 0, blank_count, rng);
        let filled = vec![None; round.tokens.len()];
        Some(Self {
            pool,
            blank_count,
            index: 0,
            score: 0,
            completed: false,
            round,
            filled,
            checked: false,
        })
    }

    /// Fills the first empty hidden slot with `word`. Returns the token index
    /// of the slot it landed in, or None when every slot is already full.
    pub fn fill_word(&mut self, word: &str) -> Option<usize> {
        if self.completed {
            return None;
        }
        let slot = self
            .round
            .tokens
            .iter()
            .enumerate()
            .position(|(idx, token)| token.hidden && self.filled[idx].is_none())?;
        self.filled[slot] = Some(word.to_string());
        Some(slot)
    }

    /// Evaluates the filled slots. Credit requires every hidden slot to match
    /// its original word exactly. Repeat checks before the next advance are
    /// idempotent and never score twice.
    pub fn check(&mut self) -> CheckOutcome {
        let correct = self
            .round
            .tokens
            .iter()
            .enumerate()
            .all(|(idx, token)| {
                !token.hidden || self.filled[idx].as_deref() == Some(token.original.as_str())
            });
        if correct && !self.checked {
            self.score += 1;
        }
        self.checked = true;
        CheckOutcome { correct }
    }

    pub fn advance(&mut self, rng: &mut impl Rng) -> bool {
        if self.completed {
            return false;
        }
        if self.index + 1 == self.pool.len() {
            self.completed = true;
            return false;
        }
        self.index += 1;
        self.regenerate_round(rng);
        true
    }

    pub fn restart(&mut self, rng: &mut impl Rng) {
        self.index = 0;
        self.score = 0;
        self.completed = false;
        self.regenerate_round(rng);
    }

    fn regenerate_round(&mut self, rng: &mut impl Rng) {
        self.round = generate_blanks(&self.pool, self.index, self.blank_count, rng);
        self.filled = vec![None; self.round.tokens.len()];
        self.checked = false;
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn total(&self) -> usize {
        self.pool.len()
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn is_completed(&self) -> bool {
        self.completed
    }

    pub fn round(&self) -> &FillBlankRound {
        &self.round
    }

    pub fn filled(&self) -> &[Option<String>] {
        &self.filled
    }

    pub fn question(&self) -> &Question {
        &self.pool[self.index]
    }
}

/// Flashcards: no scoring, just a show/hide toggle and the shared
/// advance/complete/restart shape.
#[derive(Debug, Clone)]
pub struct FlashcardSession {
    pool: Arc<Vec<Question>>,
    index: usize,
    show_answer: bool,
    completed: bool,
}

impl FlashcardSession {
    pub fn new(pool: Arc<Vec<Question>>) -> Option<Self> {
        if pool.is_empty() {
            return None;
        }
        Some(Self {
            pool,
            index: 0,
            show_answer: false,
            completed: false,
        })
    }

    pub fn toggle_answer(&mut self) -> bool {
        self.show_answer = !self.show_answer;
        self.show_answer
    }

    pub fn advance(&mut self) -> bool {
        if self.completed {
            return false;
        }
        if self.index + 1 == self.pool.len() {
            self.completed = true;
            return false;
        }
        self.index += 1;
        self.show_answer = false;
        true
    }

    pub fn restart(&mut self) {
        self.index = 0;
        self.show_answer = false;
        self.completed = false;
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn total(&self) -> usize {
        self.pool.len()
    }

    pub fn show_answer(&self) -> bool {
        self.show_answer
    }

    pub fn is_completed(&self) -> bool {
        self.completed
    }

    pub fn question(&self) -> &Question {
        &self.pool[self.index]
    }
}

/// The active session of a connected player, one mode at a time. Discarded
/// and rebuilt whenever the unlocked pool changes identity.
#[derive(Debug, Clone)]
pub enum GameSession {
    MultipleChoice(McqSession),
    FillBlank(FillBlankSession),
    Flashcards(FlashcardSession),
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn pool(answers: &[&str]) -> Arc<Vec<Question>> {
        Arc::new(
            answers
                .iter()
                .enumerate()
                .map(|(idx, answer)| Question {
                    id: idx as u32 + 1,
                    question: format!("Question {}", idx + 1),
                    answer: answer.to_string(),
                    youtube: None,
                })
                .collect(),
        )
    }

    #[test]
    fn test_mcq_empty_pool_yields_no_session() {
        let mut rng = StdRng::seed_from_u64(1);
        assert!(McqSession::new(Arc::new(Vec::new()), 4, &mut rng).is_none());
    }

    #[test]
    fn test_mcq_first_selection_is_terminal() {
        let questions = pool(&["alpha", "beta", "gamma"]);
        let mut rng = StdRng::seed_from_u64(2);
        let mut session = McqSession::new(questions, 4, &mut rng).unwrap();

        let correct = session.question().answer.clone();
        assert_eq!(session.select(&correct), SelectionOutcome::Correct);
        assert_eq!(session.score(), 1);

        // Further selections before advancing are ignored, right or wrong.
        assert_eq!(session.select("wrong"), SelectionOutcome::Ignored);
        assert_eq!(session.select(&correct), SelectionOutcome::Ignored);
        assert_eq!(session.score(), 1);
    }

    #[test]
    fn test_mcq_incorrect_selection_scores_nothing() {
        let questions = pool(&["alpha", "beta", "gamma"]);
        let mut rng = StdRng::seed_from_u64(2);
        let mut session = McqSession::new(questions, 4, &mut rng).unwrap();

        assert_eq!(
            session.select("definitely not it"),
            SelectionOutcome::Incorrect
        );
        assert_eq!(session.score(), 0);
    }

    #[test]
    fn test_mcq_advance_is_monotonic_and_completes_exactly_at_pool_length() {
        let questions = pool(&["alpha", "beta", "gamma"]);
        let mut rng = StdRng::seed_from_u64(3);
        let mut session = McqSession::new(questions, 4, &mut rng).unwrap();

        assert_eq!(session.index(), 0);
        assert!(!session.is_completed());

        assert!(session.advance(&mut rng));
        assert_eq!(session.index(), 1);
        assert!(!session.is_completed());

        assert!(session.advance(&mut rng));
        assert_eq!(session.index(), 2);
        assert!(!session.is_completed());

        // Third advance would take the index to pool length: Completed.
        assert!(!session.advance(&mut rng));
        assert!(session.is_completed());
        assert_eq!(session.index(), 2);

        // Advancing past completion is a no-op.
        assert!(!session.advance(&mut rng));
        assert_eq!(session.index(), 2);
    }

    #[test]
    fn test_mcq_advance_resets_selection_and_regenerates_options() {
        let questions = pool(&["alpha", "beta", "gamma", "delta", "epsilon"]);
        let mut rng = StdRng::seed_from_u64(4);
        let mut session = McqSession::new(questions, 4, &mut rng).unwrap();

        session.select("alpha");
        session.advance(&mut rng);

        assert_eq!(session.select(&session.question().answer.clone()), SelectionOutcome::Correct);
        assert!(session.options().contains(&session.question().answer));
        assert_eq!(session.options().len(), 4);
    }

    #[test]
    fn test_mcq_restart_from_completed() {
        let questions = pool(&["alpha", "beta"]);
        let mut rng = StdRng::seed_from_u64(5);
        let mut session = McqSession::new(questions, 4, &mut rng).unwrap();

        session.select(&session.question().answer.clone());
        session.advance(&mut rng);
        session.select("wrong");
        session.advance(&mut rng);
        assert!(session.is_completed());
        assert_eq!(session.score(), 1);

        session.restart(&mut rng);
        assert_eq!(session.index(), 0);
        assert_eq!(session.score(), 0);
        assert!(!session.is_completed());
    }

    #[test]
    fn test_fill_slots_fill_left_to_right() {
        let questions = pool(&["Jesus Christ is Lord", "God made me from dust"]);
        let mut rng = StdRng::seed_from_u64(6);
        let mut session = FillBlankSession::new(questions, 2, &mut rng).unwrap();

        let first = session.fill_word("one").unwrap();
        let second = session.fill_word("two").unwrap();
        assert!(first < second, "slots must fill in token order");

        // Both hidden slots are full now.
        assert!(session.fill_word("three").is_none());
        assert_eq!(session.filled()[first].as_deref(), Some("one"));
        assert_eq!(session.filled()[second].as_deref(), Some("two"));
    }

    #[test]
    fn test_fill_check_requires_every_slot_correct() {
        let questions = pool(&["Jesus Christ is Lord", "God made me from dust"]);
        let mut rng = StdRng::seed_from_u64(7);
        let mut session = FillBlankSession::new(questions, 2, &mut rng).unwrap();

        let hidden_words: Vec<String> = session
            .round()
            .tokens
            .iter()
            .filter(|t| t.hidden)
            .map(|t| t.original.clone())
            .collect();
        assert_eq!(hidden_words.len(), 2);

        // Fill every slot with its own original word: credit.
        for word in &hidden_words {
            session.fill_word(word);
        }
        assert!(session.check().correct);
        assert_eq!(session.score(), 1);

        // Repeat check before advancing never scores twice.
        assert!(session.check().correct);
        assert_eq!(session.score(), 1);
    }

    #[test]
    fn test_fill_one_wrong_slot_gets_no_credit() {
        let questions = pool(&["Jesus Christ is Lord", "God made me from dust"]);
        let mut rng = StdRng::seed_from_u64(8);
        let mut session = FillBlankSession::new(questions, 2, &mut rng).unwrap();

        let hidden_words: Vec<String> = session
            .round()
            .tokens
            .iter()
            .filter(|t| t.hidden)
            .map(|t| t.original.clone())
            .collect();

        session.fill_word(&hidden_words[0]);
        session.fill_word("definitely-wrong");
        assert!(!session.check().correct);
        assert_eq!(session.score(), 0);
    }

    #[test]
    fn test_fill_unfilled_slots_fail_check() {
        let questions = pool(&["Jesus Christ is Lord", "God made me from dust"]);
        let mut rng = StdRng::seed_from_u64(9);
        let mut session = FillBlankSession::new(questions, 2, &mut rng).unwrap();

        assert!(!session.check().correct);
    }

    #[test]
    fn test_fill_advance_regenerates_round_and_resets_slots() {
        let questions = pool(&["Jesus Christ is Lord", "God made me from dust"]);
        let mut rng = StdRng::seed_from_u64(10);
        let mut session = FillBlankSession::new(questions, 2, &mut rng).unwrap();

        session.fill_word("something");
        session.check();
        assert!(session.advance(&mut rng));

        assert_eq!(session.index(), 1);
        assert!(session.filled().iter().all(Option::is_none));
        let reconstructed: String = session
            .round()
            .tokens
            .iter()
            .map(|t| t.original.as_str())
            .collect();
        assert_eq!(reconstructed, session.question().answer);
    }

    #[test]
    fn test_fill_completion_boundary() {
        let questions = pool(&["one answer", "two answers"]);
        let mut rng = StdRng::seed_from_u64(11);
        let mut session = FillBlankSession::new(questions, 3, &mut rng).unwrap();

        assert!(session.advance(&mut rng));
        assert!(!session.advance(&mut rng));
        assert!(session.is_completed());

        session.restart(&mut rng);
        assert_eq!(session.index(), 0);
        assert!(!session.is_completed());
        assert_eq!(session.score(), 0);
    }

    #[test]
    fn test_flashcards_toggle_and_advance() {
        let questions = pool(&["alpha", "beta"]);
        let mut session = FlashcardSession::new(questions).unwrap();

        assert!(!session.show_answer());
        assert!(session.toggle_answer());
        assert!(!session.toggle_answer());

        session.toggle_answer();
        assert!(session.advance());
        assert!(!session.show_answer(), "advance hides the answer again");

        assert!(!session.advance());
        assert!(session.is_completed());

        session.restart();
        assert_eq!(session.index(), 0);
        assert!(!session.is_completed());
    }
}
