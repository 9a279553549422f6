use super::*;

fn new_arena(strict_finite: bool) -> VectorArena {
    let config = ArenaConfig::new(3, strict_finite).expect("config must be valid");
    VectorArena::new(config)
}

fn marker(value: f32) -> Vec<f32> {
    vec![value, 0.0, 0.0]
}

#[test]
fn rejects_zero_dimension_config() {
    let error = ArenaConfig::new(0, true).expect_err("must fail");
    assert!(matches!(error, StoreError::InvalidConfig(_)));
}

#[test]
fn append_assigns_contiguous_increasing_slots() {
    let mut arena = new_arena(true);

    let slots = arena
        .append(&[marker(1.0), marker(2.0)])
        .expect("append must succeed");
    assert_eq!(slots, 0..2);

    let slots = arena.append(&[marker(3.0)]).expect("append must succeed");
    assert_eq!(slots, 2..3);
    assert_eq!(arena.len(), 3);
}

#[test]
fn append_rejects_whole_batch_on_dimension_mismatch() {
    let mut arena = new_arena(true);

    let error = arena
        .append(&[marker(1.0), vec![1.0, 2.0]])
        .expect_err("must fail");
    assert_eq!(
        error,
        StoreError::DimensionMismatch {
            expected: 3,
            got: 2
        }
    );
    assert!(arena.is_empty());
}

#[test]
fn strict_mode_rejects_whole_batch_on_non_finite() {
    let mut arena = new_arena(true);

    let error = arena
        .append(&[marker(1.0), vec![1.0, f32::NAN, 3.0]])
        .expect_err("must fail");
    assert_eq!(
        error,
        StoreError::NonFinite {
            vector: 1,
            component: 1
        }
    );
    assert!(arena.is_empty());
}

#[test]
fn permissive_mode_accepts_non_finite() {
    let mut arena = new_arena(false);
    arena
        .append(&[vec![1.0, f32::NAN, 3.0]])
        .expect("append must succeed");

    let stored = arena.reconstruct(0).expect("slot must exist");
    assert!(stored[1].is_nan());
}

#[test]
fn reconstruct_returns_stored_vector() {
    let mut arena = new_arena(true);
    arena
        .append(&[marker(1.0), marker(2.0)])
        .expect("append must succeed");

    assert_eq!(arena.reconstruct(1).expect("slot must exist"), &[2.0, 0.0, 0.0]);

    let error = arena.reconstruct(2).expect_err("must fail");
    assert_eq!(error, StoreError::SlotOutOfRange { slot: 2, len: 2 });
}

#[test]
fn remove_compacts_and_preserves_survivor_order() {
    let mut arena = new_arena(true);
    arena
        .append(&[
            marker(0.0),
            marker(1.0),
            marker(2.0),
            marker(3.0),
            marker(4.0),
        ])
        .expect("append must succeed");

    let removed = arena
        .remove(&BTreeSet::from([1, 3]))
        .expect("remove must succeed");
    assert_eq!(removed, 2);
    assert_eq!(arena.len(), 3);

    let survivors: Vec<f32> = arena.iter_slots().map(|(_, vector)| vector[0]).collect();
    assert_eq!(survivors, vec![0.0, 2.0, 4.0]);
}

#[test]
fn remove_rejects_unknown_slot_before_mutation() {
    let mut arena = new_arena(true);
    arena
        .append(&[marker(1.0), marker(2.0)])
        .expect("append must succeed");

    let error = arena
        .remove(&BTreeSet::from([0, 9]))
        .expect_err("must fail");
    assert_eq!(error, StoreError::SlotOutOfRange { slot: 9, len: 2 });
    assert_eq!(arena.len(), 2);
}

#[test]
fn search_returns_ascending_distances() {
    let mut arena = new_arena(true);
    arena
        .append(&[marker(3.0), marker(1.0), marker(2.0)])
        .expect("append must succeed");

    let hits = arena
        .search(&[0.0, 0.0, 0.0], 2)
        .expect("search must succeed");
    assert_eq!(
        hits,
        vec![
            SlotHit {
                slot: 1,
                distance: 1.0
            },
            SlotHit {
                slot: 2,
                distance: 4.0
            },
        ]
    );
}

#[test]
fn search_breaks_distance_ties_by_ascending_slot() {
    let mut arena = new_arena(true);
    arena
        .append(&[marker(1.0), marker(2.0), marker(1.0)])
        .expect("append must succeed");

    let hits = arena
        .search(&[0.0, 0.0, 0.0], 3)
        .expect("search must succeed");
    let order: Vec<usize> = hits.iter().map(|hit| hit.slot).collect();
    assert_eq!(order, vec![0, 2, 1]);
}

#[test]
fn search_returns_everything_when_k_exceeds_len() {
    let mut arena = new_arena(true);
    arena
        .append(&[marker(1.0), marker(2.0)])
        .expect("append must succeed");

    let hits = arena
        .search(&[0.0, 0.0, 0.0], 10)
        .expect("search must succeed");
    assert_eq!(hits.len(), 2);
}

#[test]
fn search_with_zero_k_or_empty_arena_is_empty() {
    let mut arena = new_arena(true);
    assert!(arena
        .search(&[0.0, 0.0, 0.0], 5)
        .expect("search must succeed")
        .is_empty());

    arena.append(&[marker(1.0)]).expect("append must succeed");
    assert!(arena
        .search(&[0.0, 0.0, 0.0], 0)
        .expect("search must succeed")
        .is_empty());
}

#[test]
fn search_validates_query() {
    let mut arena = new_arena(true);
    arena.append(&[marker(1.0)]).expect("append must succeed");

    let error = arena.search(&[0.0, 0.0], 1).expect_err("must fail");
    assert_eq!(
        error,
        StoreError::DimensionMismatch {
            expected: 3,
            got: 2
        }
    );

    let error = arena
        .search(&[0.0, f32::INFINITY, 0.0], 1)
        .expect_err("must fail");
    assert_eq!(error, StoreError::NonFiniteQuery { component: 1 });
}

#[test]
fn clear_drops_every_vector() {
    let mut arena = new_arena(true);
    arena
        .append(&[marker(1.0), marker(2.0)])
        .expect("append must succeed");

    arena.clear();
    assert!(arena.is_empty());
    assert_eq!(arena.len(), 0);
}
