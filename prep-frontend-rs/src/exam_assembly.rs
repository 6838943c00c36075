use std::collections::BTreeSet;

use exam_utils::{ExamDomain, Question};
use rand::Rng;
use rand::seq::{IndexedRandom, SliceRandom};

/// Draw a mock exam of up to `count` questions from `pool`.
///
/// One question is drawn uniformly from each covered domain that has any
/// questions, the rest of the slots are filled uniformly from what is left,
/// and the combined set is shuffled. A pool smaller than `count` just yields
/// a shorter exam.
pub fn assemble_exam<R: Rng + ?Sized>(
    pool: &[Question],
    count: usize,
    rng: &mut R,
) -> Vec<Question> {
    let mut chosen: Vec<usize> = Vec::with_capacity(count.min(pool.len()));

    for domain in ExamDomain::COVERED {
        if chosen.len() >= count {
            break;
        }
        let candidates: Vec<usize> = pool
            .iter()
            .enumerate()
            .filter(|(_, question)| question.category == domain)
            .map(|(index, _)| index)
            .collect();
        if let Some(&index) = candidates.choose(rng) {
            chosen.push(index);
        }
    }

    let taken: BTreeSet<usize> = chosen.iter().copied().collect();
    let mut remaining: Vec<usize> = (0..pool.len())
        .filter(|index| !taken.contains(index))
        .collect();
    remaining.shuffle(rng);
    remaining.truncate(count.saturating_sub(chosen.len()));

    chosen.extend(remaining);
    chosen.shuffle(rng);

    chosen.into_iter().map(|index| pool[index].clone()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use crate::test_support::pool;

    #[test]
    fn every_domain_is_covered() {
        // a pool dominated by one domain still yields the three rare ones
        let pool = pool(&[
            (ExamDomain::Technology, 200),
            (ExamDomain::CloudConcepts, 1),
            (ExamDomain::SecurityAndCompliance, 1),
            (ExamDomain::BillingAndPricing, 1),
        ]);
        for seed in 0..50 {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let exam = assemble_exam(&pool, 65, &mut rng);
            assert_eq!(exam.len(), 65);
            for domain in ExamDomain::COVERED {
                assert!(
                    exam.iter().any(|q| q.category == domain),
                    "seed {seed} missed {domain:?}"
                );
            }
        }
    }

    #[test]
    fn no_question_is_drawn_twice() {
        let pool = pool(&[
            (ExamDomain::Technology, 30),
            (ExamDomain::CloudConcepts, 30),
            (ExamDomain::SecurityAndCompliance, 30),
            (ExamDomain::BillingAndPricing, 30),
        ]);
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let exam = assemble_exam(&pool, 65, &mut rng);
        let ids: BTreeSet<&str> = exam.iter().map(|q| q.id.as_str()).collect();
        assert_eq!(ids.len(), 65);
    }

    #[test]
    fn small_pool_gives_short_exam() {
        let pool = pool(&[(ExamDomain::Technology, 3), (ExamDomain::Other("Networking".to_string()), 2)]);
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let exam = assemble_exam(&pool, 65, &mut rng);
        assert_eq!(exam.len(), 5);
    }

    #[test]
    fn empty_pool_gives_empty_exam() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        assert!(assemble_exam(&[], 65, &mut rng).is_empty());
    }

    #[test]
    fn count_below_domain_count_is_respected() {
        let pool = pool(&[
            (ExamDomain::Technology, 5),
            (ExamDomain::CloudConcepts, 5),
            (ExamDomain::SecurityAndCompliance, 5),
            (ExamDomain::BillingAndPricing, 5),
        ]);
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        assert_eq!(assemble_exam(&pool, 2, &mut rng).len(), 2);
    }
}
