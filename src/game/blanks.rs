use rand::Rng;
use std::collections::HashSet;

use crate::content::Question;
use crate::game::shuffle::shuffled;

/// Words this short are never sourced as decoys. Hidden-word selection has no
/// length filter: a two-letter word in the target answer can still be hidden.
const DECOY_MIN_CHARS: usize = 3;

/// One token of a tokenized answer. Concatenating every token's `original`
/// reproduces the answer string exactly; whitespace tokens are never hidden.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlankToken {
    pub original: String,
    pub hidden: bool,
}

impl BlankToken {
    pub fn is_whitespace(&self) -> bool {
        self.original.chars().all(char::is_whitespace)
    }
}

/// A fill-in-the-blank puzzle: the tokenized answer with hidden flags and the
/// word bank to refill it from (hidden words plus decoys, shuffled together).
#[derive(Debug, Clone)]
pub struct FillBlankRound {
    pub tokens: Vec<BlankToken>,
    pub options: Vec<String>,
}

/// Splits into alternating runs of whitespace and non-whitespace so the
/// original string survives a plain concatenation.
fn tokenize_preserving_whitespace(answer: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut current_is_ws: Option<bool> = None;

    for ch in answer.chars() {
        let is_ws = ch.is_whitespace();
        if current_is_ws != Some(is_ws) && !current.is_empty() {
            tokens.push(std::mem::take(&mut current));
        }
        current_is_ws = Some(is_ws);
        current.push(ch);
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    tokens
}

/// Builds a fill-in-the-blank round for `questions[target_index]`.
///
/// Hides `min(blank_count, word_token_count)` word tokens, chosen without
/// replacement by shuffling the word-token indices. Decoys are every word
/// longer than `DECOY_MIN_CHARS` characters from the *other* questions'
/// answers; `blank_count` of them (fewer if the pool is small) join the
/// hidden words in the option bank. No de-duplication is applied — a decoy
/// coinciding with a hidden word simply appears twice.
///
/// Callers guarantee `questions` is non-empty and `target_index` is in range.
pub fn generate_blanks(
    questions: &[Question],
    target_index: usize,
    blank_count: usize,
    rng: &mut impl Rng,
) -> FillBlankRound {
    let words = tokenize_preserving_whitespace(&questions[target_index].answer);

    let word_indices: Vec<usize> = words
        .iter()
        .enumerate()
        .filter(|(_, w)| !w.chars().all(char::is_whitespace))
        .map(|(idx, _)| idx)
        .collect();

    let hidden_target = blank_count.min(word_indices.len());
    let hidden_indices: HashSet<usize> = shuffled(word_indices, rng)
        .into_iter()
        .take(hidden_target)
        .collect();

    let tokens: Vec<BlankToken> = words
        .into_iter()
        .enumerate()
        .map(|(idx, original)| BlankToken {
            hidden: hidden_indices.contains(&idx),
            original,
        })
        .collect();

    let hidden_words: Vec<String> = tokens
        .iter()
        .filter(|t| t.hidden)
        .map(|t| t.original.clone())
        .collect();

    let decoy_pool: Vec<String> = questions
        .iter()
        .enumerate()
        .filter(|(idx, _)| *idx != target_index)
        .flat_map(|(_, q)| q.answer.split_whitespace().map(str::to_string))
        .filter(|w| w.chars().count() > DECOY_MIN_CHARS)
        .collect();

    let mut options = hidden_words;
    options.extend(shuffled(decoy_pool, rng).into_iter().take(blank_count));

    FillBlankRound {
        tokens,
        options: shuffled(options, rng),
    }
}
