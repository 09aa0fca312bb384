use alloc::collections::BTreeSet;
use core::fmt::Display;
use itertools::Itertools;

use crate::{
    action::GroundAction,
    error::PlanningError,
    predicate::{GroundAtom, GroundLiteral},
};

/// A closed-world state: the ground atoms that hold. Everything else is false.
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Clone, Default)]
pub struct State {
    atoms: BTreeSet<GroundAtom>,
}

impl State {
    pub fn with_atoms(mut self, atoms: impl IntoIterator<Item = GroundAtom>) -> Self {
        self.atoms.extend(atoms);
        self
    }

    pub fn atoms(&self) -> &BTreeSet<GroundAtom> {
        &self.atoms
    }

    pub fn contains(&self, atom: &GroundAtom) -> bool {
        self.atoms.contains(atom)
    }

    /// A positive literal holds if its atom is present,
    /// a negative one if it is absent.
    pub fn holds(&self, literal: &GroundLiteral) -> bool {
        self.contains(literal.atom()) == literal.is_positive()
    }

    pub fn satisfies<'a>(&self, literals: impl IntoIterator<Item = &'a GroundLiteral>) -> bool {
        literals.into_iter().all(|l| self.holds(l))
    }

    pub fn len(&self) -> usize {
        self.atoms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.atoms.is_empty()
    }

    pub fn is_applicable(&self, action: &GroundAction) -> bool {
        self.satisfies(action.preconditions())
    }

    /// Returns `(self - effect_rem) + effect_add`, leaving `self` untouched.
    pub fn apply(&self, action: &GroundAction) -> Result<State, PlanningError> {
        if !self.is_applicable(action) {
            return Err(PlanningError::InapplicableAction {
                action: action.render(),
            });
        }

        let mut atoms = self.atoms.clone();
        for atom in action.effect_rem() {
            atoms.remove(atom);
        }
        atoms.extend(action.effect_add().cloned());
        Ok(State { atoms })
    }
}

impl FromIterator<GroundAtom> for State {
    fn from_iter<T: IntoIterator<Item = GroundAtom>>(iter: T) -> Self {
        Self {
            atoms: iter.into_iter().collect(),
        }
    }
}

impl Display for State {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{{{}}}", self.atoms.iter().join(", "))
    }
}
