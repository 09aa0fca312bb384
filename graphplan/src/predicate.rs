use alloc::{string::String, vec::Vec};
use core::fmt::Display;
use getset::Getters;
use itertools::Itertools;

use crate::{substitution::Substitution, Symbol};

/// An argument of an atom, either a constant or a variable
/// waiting for a [Substitution].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Term {
    Const(Symbol),
    Var(Symbol),
}

impl Term {
    pub fn constant(name: &str) -> Self {
        Self::Const(Symbol::new(name))
    }

    pub fn variable(name: &str) -> Self {
        Self::Var(Symbol::new(name))
    }

    pub fn symbol(&self) -> Symbol {
        match self {
            Self::Const(s) | Self::Var(s) => *s,
        }
    }

    pub fn is_variable(&self) -> bool {
        matches!(self, Self::Var(_))
    }
}

impl Display for Term {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

pub(crate) fn write_application<T: Display>(
    f: &mut core::fmt::Formatter<'_>,
    name: Symbol,
    args: &[T],
) -> core::fmt::Result {
    if args.is_empty() {
        write!(f, "{}", name)
    } else {
        write!(f, "{}({})", name, args.iter().join(", "))
    }
}

/// A predicate applied to terms, as written in action schemas.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Getters)]
pub struct Atom {
    #[getset(get = "pub")]
    predicate: Symbol,
    #[getset(get = "pub")]
    args: Vec<Term>,
}

impl Atom {
    pub fn new(predicate: &str, args: impl IntoIterator<Item = Term>) -> Self {
        Self::from_symbol(Symbol::new(predicate), args)
    }

    pub fn from_symbol(predicate: Symbol, args: impl IntoIterator<Item = Term>) -> Self {
        Self {
            predicate,
            args: args.into_iter().collect(),
        }
    }

    pub fn arity(&self) -> usize {
        self.args.len()
    }

    pub fn variables(&self) -> impl Iterator<Item = Symbol> + '_ {
        self.args.iter().filter_map(|t| match t {
            Term::Var(v) => Some(*v),
            Term::Const(_) => None,
        })
    }

    pub fn is_ground(&self) -> bool {
        self.variables().next().is_none()
    }

    /// Replaces every variable with its binding.
    ///
    /// Returns the first unbound variable on failure.
    pub fn ground(&self, binding: &Substitution) -> Result<GroundAtom, Symbol> {
        let args = self
            .args
            .iter()
            .map(|t| binding.resolve(t).ok_or(t.symbol()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(GroundAtom {
            predicate: self.predicate,
            args,
        })
    }
}

impl Display for Atom {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write_application(f, self.predicate, &self.args)
    }
}

/// An atom with a polarity tag.
///
/// Negative literals stand for "this atom must not hold" in preconditions
/// and "this atom stops holding" in effects.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Getters)]
pub struct Literal {
    #[getset(get = "pub")]
    atom: Atom,
    positive: bool,
}

impl Literal {
    pub fn new(atom: Atom, positive: bool) -> Self {
        Self { atom, positive }
    }

    pub fn pos(atom: Atom) -> Self {
        Self::new(atom, true)
    }

    pub fn neg(atom: Atom) -> Self {
        Self::new(atom, false)
    }

    pub fn is_positive(&self) -> bool {
        self.positive
    }

    pub fn negate(&self) -> Self {
        Self::new(self.atom.clone(), !self.positive)
    }

    pub fn ground(&self, binding: &Substitution) -> Result<GroundLiteral, Symbol> {
        self.atom
            .ground(binding)
            .map(|atom| GroundLiteral::new(atom, self.positive))
    }
}

impl Display for Literal {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        if !self.positive {
            write!(f, "~")?;
        }
        write!(f, "{}", self.atom)
    }
}

/// A predicate applied to constants only. This is what states are made of.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Getters)]
pub struct GroundAtom {
    #[getset(get = "pub")]
    predicate: Symbol,
    #[getset(get = "pub")]
    args: Vec<Symbol>,
}

impl GroundAtom {
    pub fn new<'a>(predicate: &str, args: impl IntoIterator<Item = &'a str>) -> Self {
        Self::from_symbols(Symbol::new(predicate), args.into_iter().map(Symbol::new))
    }

    pub fn from_symbols(predicate: Symbol, args: impl IntoIterator<Item = Symbol>) -> Self {
        Self {
            predicate,
            args: args.into_iter().collect(),
        }
    }

    pub fn arity(&self) -> usize {
        self.args.len()
    }

    pub fn as_atom(&self) -> Atom {
        Atom::from_symbol(self.predicate, self.args.iter().copied().map(Term::Const))
    }
}

impl Display for GroundAtom {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write_application(f, self.predicate, &self.args)
    }
}

/// A ground atom with a polarity tag.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Getters)]
pub struct GroundLiteral {
    #[getset(get = "pub")]
    atom: GroundAtom,
    positive: bool,
}

impl GroundLiteral {
    pub fn new(atom: GroundAtom, positive: bool) -> Self {
        Self { atom, positive }
    }

    pub fn pos(atom: GroundAtom) -> Self {
        Self::new(atom, true)
    }

    pub fn neg(atom: GroundAtom) -> Self {
        Self::new(atom, false)
    }

    pub fn is_positive(&self) -> bool {
        self.positive
    }

    /// The literal with the same atom and the opposite polarity.
    pub fn complement(&self) -> Self {
        Self::new(self.atom.clone(), !self.positive)
    }

    pub fn is_complement_of(&self, other: &GroundLiteral) -> bool {
        self.positive != other.positive && self.atom == other.atom
    }

    pub fn render(&self) -> String {
        alloc::format!("{}", self)
    }
}

impl Display for GroundLiteral {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        if !self.positive {
            write!(f, "~")?;
        }
        write!(f, "{}", self.atom)
    }
}

impl From<GroundAtom> for GroundLiteral {
    fn from(atom: GroundAtom) -> Self {
        Self::pos(atom)
    }
}
