use std::collections::BTreeSet;

use graphplan::{
    action::GroundAction,
    error::PlanningError,
    predicate::{GroundAtom, GroundLiteral},
    state::State,
    Symbol,
};
use proptest::prelude::*;

const ATOMS: [&str; 6] = ["A", "B", "C", "D", "E", "F"];

fn atom(i: usize) -> GroundAtom {
    GroundAtom::new(ATOMS[i], [])
}

fn state() -> impl Strategy<Value = State> {
    proptest::collection::btree_set(0..ATOMS.len(), 0..=ATOMS.len())
        .prop_map(|ids| ids.into_iter().map(atom).collect())
}

fn literals() -> impl Strategy<Value = BTreeSet<GroundLiteral>> {
    proptest::collection::btree_set((0..ATOMS.len(), any::<bool>()), 0..4).prop_map(|ls| {
        ls.into_iter()
            .map(|(i, positive)| GroundLiteral::new(atom(i), positive))
            .collect()
    })
}

fn action() -> impl Strategy<Value = GroundAction> {
    (literals(), literals()).prop_filter_map("contradictory effects", |(pre, eff)| {
        GroundAction::new(Symbol::new("Act"), vec![], pre, eff).ok()
    })
}

proptest! {
    #[test]
    fn applicability_is_sound(state in state(), action in action()) {
        let expected = action.precond_pos().all(|a| state.contains(a))
            && action.precond_neg().all(|a| !state.contains(a));
        prop_assert_eq!(state.is_applicable(&action), expected);
        prop_assert_eq!(graphplan::act(&state, &action).is_ok(), expected);
    }

    #[test]
    fn effects_are_applied_to_a_copy(state in state(), action in action()) {
        let before = state.clone();
        match graphplan::act(&state, &action) {
            Ok(next) => {
                for a in action.effect_add() {
                    prop_assert!(next.contains(a));
                }
                for a in action.effect_rem() {
                    prop_assert!(!next.contains(a));
                }
                for a in state.atoms() {
                    let removed = action.effect_rem().any(|r| r == a);
                    prop_assert_eq!(next.contains(a), !removed);
                }
                for a in next.atoms() {
                    prop_assert!(state.contains(a) || action.effect_add().any(|x| x == a));
                }
            }
            Err(e) => prop_assert_eq!(
                e,
                PlanningError::InapplicableAction { action: action.render() }
            ),
        }
        prop_assert_eq!(state, before);
    }
}
