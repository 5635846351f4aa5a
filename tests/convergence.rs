//! End-to-end convergence scenarios: several replicas mutate independently,
//! exchange deltas, and must land on identical, replica-independent state.
use delta_crdt_core::{or_array, or_map, CrdtKind, CrdtError, Delta, DotStore, Payload, Position, State};
use std::sync::Once;

static INIT_TRACING: Once = Once::new();

/// Routes the crate's `tracing::trace!`/`debug!`/`error!` join logging to
/// stderr so `cargo test -- --nocapture` shows it; harmless to call from
/// every test since `Once` makes repeat calls no-ops.
fn init_tracing() {
    INIT_TRACING.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init()
            .ok();
    });
}

fn orarray_state(replica: u8) -> State<u8> {
    State::new(replica, DotStore::empty_map(CrdtKind::ORArray))
}

fn ormap_state(replica: u8) -> State<u8> {
    State::new(replica, DotStore::empty_map(CrdtKind::ORMap))
}

fn join_everywhere(states: &mut [State<u8>], deltas: &[Delta<u8>]) {
    for state in states.iter_mut() {
        for delta in deltas {
            state.join(delta).unwrap();
        }
    }
}

fn array_values(state: &State<u8>) -> Vec<(String, Vec<Payload>)> {
    or_array::value(state.as_ref()).unwrap()
}

#[test]
fn s1_insert_convergence_orders_by_uid_on_tied_position() {
    init_tracing();
    let mut r1 = orarray_state(1);
    let mut r2 = orarray_state(2);
    let mut r3 = orarray_state(3);

    let pos = || Position::new([100]).unwrap();
    let d1 = or_array::insert_value(r1.as_ref(), 1, "a", pos(), Payload::Str("A".into())).unwrap();
    let d2 = or_array::insert_value(r2.as_ref(), 2, "b", pos(), Payload::Str("B".into())).unwrap();
    let d3 = or_array::insert_value(r3.as_ref(), 3, "c", pos(), Payload::Str("C".into())).unwrap();

    let mut states = [r1, r2, r3];
    join_everywhere(&mut states, &[d1, d2, d3]);

    let expected = vec![
        ("a".to_string(), vec![Payload::Str("A".into())]),
        ("b".to_string(), vec![Payload::Str("B".into())]),
        ("c".to_string(), vec![Payload::Str("C".into())]),
    ];
    for state in &states {
        assert_eq!(array_values(state), expected);
    }
}

#[test]
fn s2_distinct_positions_order_by_position() {
    init_tracing();
    let mut r1 = orarray_state(1);
    let mut r2 = orarray_state(2);
    let mut r3 = orarray_state(3);

    let d1 = or_array::insert_value(r1.as_ref(), 1, "first", Position::new([50]).unwrap(), Payload::Str("First".into())).unwrap();
    let d2 = or_array::insert_value(r2.as_ref(), 2, "second", Position::new([150]).unwrap(), Payload::Str("Second".into())).unwrap();
    let d3 = or_array::insert_value(r3.as_ref(), 3, "third", Position::new([100]).unwrap(), Payload::Str("Third".into())).unwrap();

    let mut states = [r1, r2, r3];
    join_everywhere(&mut states, &[d1, d2, d3]);

    let expected = vec![
        ("first".to_string(), vec![Payload::Str("First".into())]),
        ("third".to_string(), vec![Payload::Str("Third".into())]),
        ("second".to_string(), vec![Payload::Str("Second".into())]),
    ];
    for state in &states {
        assert_eq!(array_values(state), expected);
    }
}

#[test]
fn s3_move_wins_over_concurrent_delete() {
    init_tracing();
    let mut seed = orarray_state(0);
    let d_a = or_array::insert_value(seed.as_ref(), 0, "a", Position::new([100]).unwrap(), Payload::Str("A".into())).unwrap();
    seed.join(&d_a).unwrap();
    let d_b = or_array::insert_value(seed.as_ref(), 0, "b", Position::new([200]).unwrap(), Payload::Str("B".into())).unwrap();
    seed.join(&d_b).unwrap();

    let mut r1 = seed.clone();
    let mut r2 = seed.clone();

    let d_move = or_array::move_to(r1.as_ref(), 1, "a", Position::new([300]).unwrap()).unwrap();
    let d_delete = or_array::delete(r2.as_ref(), "a").unwrap();

    r1.join(&d_move).unwrap();
    r2.join(&d_delete).unwrap();

    // Exchange.
    r1.join(&d_delete).unwrap();
    r2.join(&d_move).unwrap();

    let expected = vec![
        ("b".to_string(), vec![Payload::Str("B".into())]),
        ("a".to_string(), vec![Payload::Str("A".into())]),
    ];
    assert_eq!(array_values(&r1), expected);
    assert_eq!(array_values(&r2), expected);
}

#[test]
fn s4_move_and_update_commute() {
    init_tracing();
    let mut seed = orarray_state(0);
    let d0 = or_array::insert_value(seed.as_ref(), 0, "x", Position::new([100]).unwrap(), Payload::Str("initial".into())).unwrap();
    seed.join(&d0).unwrap();

    let mut r1 = seed.clone();
    let mut r2 = seed.clone();

    let d_move = or_array::move_to(r1.as_ref(), 1, "x", Position::new([200]).unwrap()).unwrap();
    let d_update = or_array::apply_to_value(r2.as_ref(), "x", |s| {
        delta_crdt_core::mv_reg::write(s, 2, Payload::Str("updated".into()))
    })
    .unwrap();

    r1.join(&d_move).unwrap();
    r1.join(&d_update).unwrap();
    r2.join(&d_update).unwrap();
    r2.join(&d_move).unwrap();

    let expected = vec![("x".to_string(), vec![Payload::Str("updated".into())])];
    assert_eq!(array_values(&r1), expected);
    assert_eq!(array_values(&r2), expected);
}

#[test]
fn s5_ormap_add_wins_over_remove() {
    init_tracing();
    let mut seed = ormap_state(0);
    let d0 = or_map::apply_to_key(seed.as_ref(), "k", DotStore::empty_fun(), |s| {
        delta_crdt_core::mv_reg::write(s, 0, Payload::Str("v0".into()))
    })
    .unwrap();
    seed.join(&d0).unwrap();

    let mut r1 = seed.clone();
    let mut r2 = seed.clone();

    let d_write = or_map::apply_to_key(r1.as_ref(), "k", DotStore::empty_fun(), |s| {
        delta_crdt_core::mv_reg::write(s, 1, Payload::Str("v1".into()))
    })
    .unwrap();
    let d_remove = or_map::remove(r2.as_ref(), "k").unwrap();

    r1.join(&d_write).unwrap();
    r2.join(&d_remove).unwrap();
    r1.join(&d_remove).unwrap();
    r2.join(&d_write).unwrap();

    assert_eq!(
        delta_crdt_core::value(&r1).unwrap(),
        serde_json::json!({"k": "v1"})
    );
    assert_eq!(
        delta_crdt_core::value(&r2).unwrap(),
        serde_json::json!({"k": "v1"})
    );
}

#[test]
fn s6_circular_moves_converge_without_panicking() {
    init_tracing();
    let mut seed = orarray_state(0);
    for (uid, p, v) in [("a", 100u64, "A"), ("b", 200, "B"), ("c", 300, "C")] {
        let d = or_array::insert_value(seed.as_ref(), 0, uid, Position::new([p]).unwrap(), Payload::Str(v.into())).unwrap();
        seed.join(&d).unwrap();
    }

    let mut r1 = seed.clone();
    let mut r2 = seed.clone();
    let mut r3 = seed.clone();

    let d1 = or_array::move_to(r1.as_ref(), 1, "a", Position::new([200]).unwrap()).unwrap();
    let d2 = or_array::move_to(r2.as_ref(), 2, "b", Position::new([300]).unwrap()).unwrap();
    let d3 = or_array::move_to(r3.as_ref(), 3, "c", Position::new([100]).unwrap()).unwrap();

    let mut states = [r1, r2, r3];
    join_everywhere(&mut states, &[d1, d2, d3]);

    let uids_only: Vec<Vec<String>> = states
        .iter()
        .map(|s| array_values(s).into_iter().map(|(uid, _)| uid).collect())
        .collect();
    assert_eq!(uids_only[0], uids_only[1]);
    assert_eq!(uids_only[1], uids_only[2]);
    let mut sorted = uids_only[0].clone();
    sorted.sort();
    assert_eq!(sorted, vec!["a", "b", "c"]);
}

#[test]
fn missing_element_reports_error_not_panic() {
    init_tracing();
    let state = orarray_state(0);
    match or_array::move_to(state.as_ref(), 0, "ghost", Position::new([1]).unwrap()) {
        Err(CrdtError::MissingElement(_)) => {}
        other => panic!("expected MissingElement, got {:?}", other),
    }
}

#[test]
fn join_is_commutative_associative_idempotent() {
    init_tracing();
    let mut base = ormap_state(0);
    let d0 = or_map::apply_to_key(base.as_ref(), "k", DotStore::empty_fun(), |s| {
        delta_crdt_core::mv_reg::write(s, 0, Payload::Num(1.0))
    })
    .unwrap();
    base.join(&d0).unwrap();
    let d1 = or_map::apply_to_key(base.as_ref(), "k2", DotStore::empty_fun(), |s| {
        delta_crdt_core::mv_reg::write(s, 0, Payload::Num(2.0))
    })
    .unwrap();
    let d2 = or_map::apply_to_key(base.as_ref(), "k3", DotStore::empty_fun(), |s| {
        delta_crdt_core::mv_reg::write(s, 0, Payload::Num(3.0))
    })
    .unwrap();

    let mut ab = base.clone();
    ab.join(&d1).unwrap();
    ab.join(&d2).unwrap();

    let mut ba = base.clone();
    ba.join(&d2).unwrap();
    ba.join(&d1).unwrap();

    assert_eq!(delta_crdt_core::value(&ab).unwrap(), delta_crdt_core::value(&ba).unwrap());

    let mut idempotent = ab.clone();
    idempotent.join(&d1).unwrap();
    idempotent.join(&d2).unwrap();
    assert_eq!(idempotent, ab);
}
