use rand::Rng;

use crate::content::Question;
use crate::game::shuffle::shuffled;

/// Builds the multiple-choice option set for `questions[target_index]`:
/// every other answer is shuffled, the first `count - 1` become distractors,
/// the correct answer is added, and the combined list is shuffled again so
/// the correct answer's slot is uniformly random.
///
/// The result contains the correct answer exactly once. If fewer than
/// `count - 1` other answers exist, the result is shorter than `count` —
/// never padded with repeats or placeholders. Duplicate answer strings in the
/// pool are passed through as-is; duplicates are harmless distractors.
///
/// Callers guarantee `questions` is non-empty and `target_index` is in range.
pub fn sample_options(
    questions: &[Question],
    target_index: usize,
    count: usize,
    rng: &mut impl Rng,
) -> Vec<String> {
    let correct_answer = questions[target_index].answer.clone();

    let other_answers: Vec<String> = questions
        .iter()
        .enumerate()
        .filter(|(idx, _)| *idx != target_index)
        .map(|(_, q)| q.answer.clone())
        .collect();

    let mut options: Vec<String> = shuffled(other_answers, rng)
        .into_iter()
        .take(count.saturating_sub(1))
        .collect();
    options.push(correct_answer);

    shuffled(options, rng)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn pool(answers: &[&str]) -> Vec<Question> {
        answers
            .iter()
            .enumerate()
            .map(|(idx, answer)| Question {
                id: idx as u32 + 1,
                question: format!("Question {}", idx + 1),
                answer: answer.to_string(),
                youtube: None,
            })
            .collect()
    }

    #[test]
    fn test_contains_correct_answer_exactly_once() {
        let questions = pool(&["alpha", "beta", "gamma", "delta", "epsilon"]);
        let mut rng = StdRng::seed_from_u64(11);

        for target in 0..questions.len() {
            let options = sample_options(&questions, target, 4, &mut rng);
            assert_eq!(options.len(), 4);
            let correct_count = options
                .iter()
                .filter(|o| **o == questions[target].answer)
                .count();
            assert_eq!(correct_count, 1);
        }
    }

    #[test]
    fn test_small_pool_never_pads() {
        let questions = pool(&["alpha", "beta"]);
        let mut rng = StdRng::seed_from_u64(5);

        let options = sample_options(&questions, 0, 4, &mut rng);
        assert_eq!(options.len(), 2);
        assert!(options.contains(&"alpha".to_string()));
        assert!(options.contains(&"beta".to_string()));
    }

    #[test]
    fn test_single_question_pool() {
        let questions = pool(&["alpha"]);
        let mut rng = StdRng::seed_from_u64(5);

        let options = sample_options(&questions, 0, 4, &mut rng);
        assert_eq!(options, vec!["alpha".to_string()]);
    }

    #[test]
    fn test_four_distinct_answers_across_many_trials() {
        let questions = pool(&["alpha", "beta", "gamma", "delta"]);
        let mut rng = StdRng::seed_from_u64(99);

        for target in [0usize, 3] {
            for _ in 0..1000 {
                let options = sample_options(&questions, target, 4, &mut rng);
                assert_eq!(options.len(), 4);
                let mut sorted = options.clone();
                sorted.sort();
                sorted.dedup();
                assert_eq!(sorted.len(), 4, "options must be distinct: {:?}", options);
                assert!(options.contains(&questions[target].answer));
            }
        }
    }

    #[test]
    fn test_correct_answer_position_varies() {
        let questions = pool(&["alpha", "beta", "gamma", "delta"]);
        let mut rng = StdRng::seed_from_u64(17);
        let mut positions = std::collections::HashSet::new();

        for _ in 0..200 {
            let options = sample_options(&questions, 0, 4, &mut rng);
            let pos = options.iter().position(|o| o == "alpha").unwrap();
            positions.insert(pos);
        }
        assert_eq!(positions.len(), 4, "correct answer should land in every slot");
    }
}
