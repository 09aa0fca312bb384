use alloc::collections::BTreeMap;
use core::fmt::Display;
use itertools::Itertools;

use crate::{
    predicate::{Atom, GroundAtom, Term},
    Symbol,
};

/// Mapping from variables to the constants they stand for.
///
/// Substitutions are values: binding a variable returns a new substitution
/// and leaves the original untouched, so search branches can share them.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Substitution(BTreeMap<Symbol, Symbol>);

impl Substitution {
    pub fn bind(&self, variable: &str, value: &str) -> Self {
        self.bind_symbol(Symbol::new(variable), Symbol::new(value))
    }

    pub fn bind_symbol(&self, variable: Symbol, value: Symbol) -> Self {
        let mut bound = self.clone();
        bound.0.insert(variable, value);
        bound
    }

    pub fn get(&self, variable: &Symbol) -> Option<Symbol> {
        self.0.get(variable).copied()
    }

    pub fn contains(&self, variable: &Symbol) -> bool {
        self.0.contains_key(variable)
    }

    /// The constant a term stands for, if it is known.
    pub fn resolve(&self, term: &Term) -> Option<Symbol> {
        match term {
            Term::Const(c) => Some(*c),
            Term::Var(v) => self.get(v),
        }
    }

    /// Extends the substitution so that `pattern` becomes equal to `fact`.
    ///
    /// Returns `None` when the predicates or arities differ, when a constant
    /// in the pattern disagrees with the fact, or when a variable is already
    /// bound to a different constant.
    pub fn unify(&self, pattern: &Atom, fact: &GroundAtom) -> Option<Self> {
        if pattern.predicate() != fact.predicate() || pattern.arity() != fact.arity() {
            return None;
        }

        let mut unified = self.clone();
        for (term, value) in pattern.args().iter().zip(fact.args()) {
            match term {
                Term::Const(c) if c == value => {}
                Term::Const(_) => return None,
                Term::Var(v) => match unified.0.get(v) {
                    Some(bound) if bound == value => {}
                    Some(_) => return None,
                    None => {
                        unified.0.insert(*v, *value);
                    }
                },
            }
        }
        Some(unified)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Symbol, &Symbol)> {
        self.0.iter()
    }
}

impl FromIterator<(Symbol, Symbol)> for Substitution {
    fn from_iter<T: IntoIterator<Item = (Symbol, Symbol)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> FromIterator<(&'a str, &'a str)> for Substitution {
    fn from_iter<T: IntoIterator<Item = (&'a str, &'a str)>>(iter: T) -> Self {
        iter.into_iter()
            .map(|(v, c)| (Symbol::new(v), Symbol::new(c)))
            .collect()
    }
}

impl Display for Substitution {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "{{{}}}",
            self.0
                .iter()
                .map(|(v, c)| alloc::format!("{v}/{c}"))
                .join(", ")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bind_is_functional() {
        let empty = Substitution::default();
        let bound = empty.bind("x", "Sibiu");

        assert!(empty.is_empty());
        assert_eq!(bound.get(&Symbol::new("x")), Some(Symbol::new("Sibiu")));
        assert_eq!(bound.to_string(), "{x/Sibiu}");
    }

    #[test]
    fn test_unify() {
        let pattern = Atom::new("Connected", [Term::variable("x"), Term::variable("y")]);
        let fact = GroundAtom::new("Connected", ["Sibiu", "Fagaras"]);

        let unified = Substitution::default().unify(&pattern, &fact).unwrap();
        assert_eq!(
            unified,
            [("x", "Sibiu"), ("y", "Fagaras")].into_iter().collect()
        );

        // Conflicting earlier binding
        let conflicting = Substitution::default().bind("x", "Arad");
        assert_eq!(conflicting.unify(&pattern, &fact), None);

        // Same variable twice must see the same constant
        let twice = Atom::new("Connected", [Term::variable("x"), Term::variable("x")]);
        assert_eq!(Substitution::default().unify(&twice, &fact), None);
        let loop_fact = GroundAtom::new("Connected", ["Arad", "Arad"]);
        assert!(Substitution::default().unify(&twice, &loop_fact).is_some());

        // Constants must match exactly
        let anchored = Atom::new("Connected", [Term::constant("Arad"), Term::variable("y")]);
        assert_eq!(Substitution::default().unify(&anchored, &fact), None);

        // Predicate and arity must match
        let other = Atom::new("Road", [Term::variable("x"), Term::variable("y")]);
        assert_eq!(Substitution::default().unify(&other, &fact), None);
        let short = Atom::new("Connected", [Term::variable("x")]);
        assert_eq!(Substitution::default().unify(&short, &fact), None);
    }
}
