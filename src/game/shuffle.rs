use rand::Rng;
use rand::seq::SliceRandom;

/// The single shuffle primitive shared by the distractor sampler and the
/// blank generator. Delegates to `rand`'s in-place `shuffle`, a uniform
/// Fisher–Yates permutation, so every ordering is equally likely. Generic
/// over the random source so tests can pass a seeded `StdRng`.
pub fn shuffled<T>(mut items: Vec<T>, rng: &mut impl Rng) -> Vec<T> {
    items.shuffle(rng);
    items
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use std::collections::HashSet;

    #[test]
    fn test_shuffle_preserves_elements() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut result = shuffled(vec![3, 1, 4, 1, 5, 9, 2, 6], &mut rng);
        result.sort_unstable();
        assert_eq!(result, vec![1, 1, 2, 3, 4, 5, 6, 9]);
    }

    #[test]
    fn test_shuffle_reaches_every_permutation() {
        let mut rng = StdRng::seed_from_u64(42);
        let mut seen = HashSet::new();
        for _ in 0..10_000 {
            seen.insert(shuffled(vec![0, 1, 2], &mut rng));
            if seen.len() == 6 {
                break;
            }
        }
        assert_eq!(seen.len(), 6, "all 3! permutations should occur");
    }

    #[test]
    fn test_shuffle_empty_and_single() {
        let mut rng = StdRng::seed_from_u64(0);
        assert!(shuffled(Vec::<u32>::new(), &mut rng).is_empty());
        assert_eq!(shuffled(vec!["only"], &mut rng), vec!["only"]);
    }
}
