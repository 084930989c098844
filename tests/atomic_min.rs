use fragment_engine::data::AtomicArray;
use fragment_engine::topology::LocalId;
use proptest::prelude::*;
use rayon::prelude::*;

proptest! {
    #[test]
    fn concurrent_fetch_min_keeps_the_smallest(
        writes in prop::collection::vec((0u32..8, -1.0e6f64..1.0e6), 1..400),
    ) {
        let cells = AtomicArray::new(8, f64::INFINITY);
        let lowered: usize = writes
            .par_iter()
            .map(|&(slot, x)| usize::from(cells.fetch_min(LocalId::new(slot), x)))
            .sum();
        let mut touched = 0;
        for slot in 0..8u32 {
            let want = writes
                .iter()
                .filter(|(s, _)| *s == slot)
                .map(|&(_, x)| x)
                .fold(f64::INFINITY, f64::min);
            if want.is_finite() {
                touched += 1;
            }
            prop_assert_eq!(cells.get(LocalId::new(slot)), want);
        }
        // each touched slot is lowered at least once and never more often than written
        prop_assert!(lowered >= touched);
        prop_assert!(lowered <= writes.len());
    }

    #[test]
    fn repeated_minimum_is_idempotent(x in -1.0e9f64..1.0e9, repeats in 1usize..64) {
        let cells = AtomicArray::new(1, x);
        let v = LocalId::new(0);
        let lowered = (0..repeats)
            .into_par_iter()
            .filter(|_| cells.fetch_min(v, x))
            .count();
        prop_assert_eq!(lowered, 0);
        prop_assert_eq!(cells.get(v), x);
    }

    #[test]
    fn integer_fetch_min_matches_sequential_min(
        writes in prop::collection::vec(0u64..1_000_000, 1..300),
    ) {
        let cells = AtomicArray::new(1, u64::MAX);
        let v = LocalId::new(0);
        writes.par_iter().for_each(|&x| {
            cells.fetch_min(v, x);
        });
        prop_assert_eq!(cells.get(v), *writes.iter().min().unwrap());
    }
}

#[test]
fn nan_never_wins() {
    let cells = AtomicArray::new(1, 3.0f64);
    assert!(!cells.fetch_min(LocalId::new(0), f64::NAN));
    assert_eq!(cells.get(LocalId::new(0)), 3.0);
}
