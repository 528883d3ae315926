//! Registry behavior through the public API: joins, bonds, move submission
//! and a full battle between two players.

use std::collections::HashSet;
use std::sync::Arc;
use std::thread;

use mokepon_arena::game::{
    resolve_battle, Attack, BattleState, NumericIds, PlayerId, PlayerRegistry, RegistryError,
    Verdict,
};

fn arena_with_pair() -> (PlayerRegistry, PlayerId, PlayerId) {
    let registry = PlayerRegistry::new();
    let a = registry.join().unwrap();
    let b = registry.join().unwrap();
    registry.set_loadout(&a, "Hipodoge").unwrap();
    registry.set_loadout(&b, "Capipepo").unwrap();
    (registry, a, b)
}

#[test]
fn joins_hand_out_unique_ids() {
    let registry = PlayerRegistry::new();

    let ids: HashSet<PlayerId> = (0..200).map(|_| registry.join().unwrap()).collect();

    assert_eq!(ids.len(), 200);
    assert_eq!(registry.len(), 200);
}

#[test]
fn concurrent_joins_never_collide() {
    let registry = Arc::new(PlayerRegistry::with_id_source(NumericIds));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let registry = Arc::clone(&registry);
            thread::spawn(move || (0..25).map(|_| registry.join().unwrap()).collect::<Vec<_>>())
        })
        .collect();

    let mut ids = HashSet::new();
    for handle in handles {
        for id in handle.join().unwrap() {
            assert!(ids.insert(id));
        }
    }
    assert_eq!(registry.len(), 200);
}

#[test]
fn bond_is_symmetric() {
    let (registry, a, b) = arena_with_pair();

    registry.bond(&a, &b).unwrap();

    assert_eq!(registry.get(&a).unwrap().bond_partner, Some(b.clone()));
    assert_eq!(registry.get(&b).unwrap().bond_partner, Some(a.clone()));
    assert_eq!(registry.bonded_count(), 2);
}

#[test]
fn rebonding_the_same_pair_is_a_no_op() {
    let (registry, a, b) = arena_with_pair();
    registry.bond(&a, &b).unwrap();
    registry.submit_moves(&a, vec![Attack::Fire]).unwrap();

    // Either side may repeat the request.
    registry.bond(&a, &b).unwrap();
    registry.bond(&b, &a).unwrap();

    assert_eq!(registry.peek_moves(&a).unwrap(), vec![Attack::Fire]);
    assert_eq!(registry.bonded_count(), 2);
}

#[test]
fn third_player_cannot_steal_a_partner() {
    let (registry, a, b) = arena_with_pair();
    let c = registry.join().unwrap();
    registry.bond(&a, &b).unwrap();

    let err = registry.bond(&c, &a).unwrap_err();

    assert!(matches!(err, RegistryError::Conflict { .. }));
    assert_eq!(registry.get(&a).unwrap().bond_partner, Some(b));
    assert_eq!(registry.get(&c).unwrap().bond_partner, None);
}

#[test]
fn sixth_submission_is_rejected_and_moves_stay() {
    let (registry, a, b) = arena_with_pair();
    registry.bond(&a, &b).unwrap();

    let five = vec![Attack::Water, Attack::Water, Attack::Water, Attack::Fire, Attack::Earth];
    registry.submit_moves(&a, five.clone()).unwrap();
    assert_eq!(registry.get(&a).unwrap().battle_state(), BattleState::Locked);

    let err = registry.submit_moves(&a, vec![Attack::Fire]).unwrap_err();

    assert!(matches!(err, RegistryError::InvalidState(_)));
    assert_eq!(registry.peek_moves(&a).unwrap(), five);
}

#[test]
fn unbonded_player_cannot_submit() {
    let (registry, a, _) = arena_with_pair();

    let err = registry.submit_moves(&a, vec![Attack::Fire]).unwrap_err();

    assert!(matches!(err, RegistryError::InvalidState(_)));
}

#[test]
fn unknown_player_is_not_found_everywhere() {
    let registry = PlayerRegistry::new();
    let ghost = PlayerId::new("ghost");

    assert!(matches!(registry.get(&ghost), Err(RegistryError::NotFound(_))));
    assert!(matches!(
        registry.set_loadout(&ghost, "Hipodoge"),
        Err(RegistryError::NotFound(_))
    ));
    assert!(matches!(
        registry.update_position(&ghost, 1, 1),
        Err(RegistryError::NotFound(_))
    ));
    assert!(matches!(registry.unbond(&ghost), Err(RegistryError::NotFound(_))));
    assert!(matches!(registry.disconnect(&ghost), Err(RegistryError::NotFound(_))));
}

#[test]
fn position_update_shows_everyone_else() {
    let (registry, a, b) = arena_with_pair();
    let c = registry.join().unwrap();

    let update = registry.update_position(&a, 40, 60).unwrap();

    let seen: Vec<&PlayerId> = update.others.iter().map(|s| &s.id).collect();
    assert_eq!(seen, vec![&b, &c]);
    assert_eq!(update.bond_partner, None);

    let from_b = registry.update_position(&b, 0, 0).unwrap();
    let a_seen = from_b.others.iter().find(|s| s.id == a).unwrap();
    assert_eq!((a_seen.x, a_seen.y), (40, 60));
}

#[test]
fn full_battle_between_hipodoge_and_capipepo() {
    let (registry, a, b) = arena_with_pair();
    registry.bond(&a, &b).unwrap();

    let moves_a = registry.get(&a).unwrap().loadout.unwrap().attacks;
    let moves_b = registry.get(&b).unwrap().loadout.unwrap().attacks;
    registry.submit_moves(&a, moves_a).unwrap();
    registry.submit_moves(&b, moves_b).unwrap();

    // Each side reads the other's moves and resolves from its own seat.
    let seen_by_a = registry.peek_moves(&b).unwrap();
    let seen_by_b = registry.peek_moves(&a).unwrap();
    let from_a = resolve_battle(&registry.peek_moves(&a).unwrap(), &seen_by_a).unwrap();
    let from_b = resolve_battle(&registry.peek_moves(&b).unwrap(), &seen_by_b).unwrap();

    assert_eq!((from_a.wins_a, from_a.wins_b), (1, 3));
    assert_eq!(from_a.verdict, Verdict::B);
    assert_eq!(from_b, from_a.flipped());

    registry.unbond(&a).unwrap();
    registry.unbond(&b).unwrap();
    assert_eq!(registry.bonded_count(), 0);
    assert!(registry.peek_moves(&a).unwrap().is_empty());
}

#[test]
fn disconnect_leaves_the_partner_bonded() {
    let (registry, a, b) = arena_with_pair();
    registry.bond(&a, &b).unwrap();

    registry.disconnect(&a).unwrap();

    assert_eq!(registry.len(), 1);
    assert_eq!(registry.get(&b).unwrap().bond_partner, Some(a));
}
