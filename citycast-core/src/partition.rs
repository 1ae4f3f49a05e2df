//! Static round-robin assignment of city indices to workers.
//!
//! Worker `rank` out of `workers` owns every index with
//! `index % workers == rank`. Each index has exactly one owner.

/// Rank of the worker that owns `index`.
pub fn owner_of(index: usize, workers: usize) -> usize {
    debug_assert!(workers > 0, "worker count must be positive");
    index % workers
}

pub fn owns(index: usize, rank: usize, workers: usize) -> bool {
    owner_of(index, workers) == rank
}

/// All indices in `0..count` owned by `rank`, ascending.
pub fn assigned(count: usize, rank: usize, workers: usize) -> Vec<usize> {
    if workers == 0 || rank >= workers {
        return Vec::new();
    }
    (rank..count).step_by(workers).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn every_index_claimed_exactly_once() {
        for count in 0..40 {
            for workers in 1..9 {
                let mut seen = HashSet::new();
                let mut total = 0;
                for rank in 0..workers {
                    for index in assigned(count, rank, workers) {
                        assert!(owns(index, rank, workers));
                        assert!(seen.insert(index), "index {index} claimed twice");
                        total += 1;
                    }
                }
                assert_eq!(total, count);
                assert_eq!(seen, (0..count).collect::<HashSet<_>>());
            }
        }
    }

    #[test]
    fn round_robin_order() {
        assert_eq!(assigned(10, 1, 3), vec![1, 4, 7]);
        assert_eq!(assigned(10, 0, 3), vec![0, 3, 6, 9]);
    }

    #[test]
    fn more_workers_than_cities_leaves_some_idle() {
        assert_eq!(assigned(2, 0, 4), vec![0]);
        assert_eq!(assigned(2, 1, 4), vec![1]);
        assert!(assigned(2, 2, 4).is_empty());
        assert!(assigned(2, 3, 4).is_empty());
    }

    #[test]
    fn single_worker_owns_everything() {
        assert_eq!(assigned(5, 0, 1), vec![0, 1, 2, 3, 4]);
        assert_eq!(owner_of(17, 1), 0);
    }
}
