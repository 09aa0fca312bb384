use alloc::string::String;
use thiserror::Error;

use crate::Symbol;

/// Errors raised while planning or while applying actions.
///
/// Not finding a plan is not an error: solvers report it as `Ok(None)`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlanningError {
    /// An action still had a free variable when it was checked against a state.
    #[error("variable `{variable}` of action `{action}` is not bound")]
    UnboundVariable { variable: Symbol, action: Symbol },
    #[error("action `{action}` is not applicable in the given state")]
    InapplicableAction { action: String },
    /// The binding makes the action add and delete the same atom.
    #[error("action `{action}` both adds and deletes the same atom")]
    ContradictoryEffects { action: String },
    /// A step of a plan does not correspond to any action of the problem.
    #[error("action `{action}` is not an instance of any known action schema")]
    UnknownAction { action: String },
    #[error("goal predicate `{predicate}` is never made true by any action")]
    MalformedProblem { predicate: Symbol },
    #[error("goal is an opaque test and cannot be regressed through a planning graph")]
    UnsupportedGoal,
    #[error("planning graph exceeded the limit of {levels} levels")]
    LevelLimitExceeded { levels: usize },
    #[error("forward search exceeded the limit of {expansions} expansions")]
    ExpansionLimitExceeded { expansions: usize },
    #[error("planning was cancelled")]
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TypeError {
    #[error("type `{sub_type}` already inherits from `{super_type}`")]
    AlreadyHasSuperType { sub_type: Symbol, super_type: Symbol },
    #[error("making `{sub_type}` a subtype of `{super_type}` creates circular inheritance")]
    CreatesCircularInheritance { sub_type: Symbol, super_type: Symbol },
    #[error("unknown type `{0}`")]
    UnknownType(Symbol),
}

/// Errors raised while assembling action schemas and object catalogues.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuildError {
    #[error("variable `{variable}` is used by action `{action}` but is not one of its parameters")]
    UnknownVariable { variable: Symbol, action: Symbol },
    #[error("parameter `{parameter}` appears more than once in action `{action}`")]
    DuplicateParameter { parameter: Symbol, action: Symbol },
    #[error("action `{action}` both adds and deletes `{atom}`")]
    ContradictoryEffects { action: Symbol, atom: String },
    #[error("predicate `{predicate}` expects {expected} arguments, got {found}")]
    ArityMismatch {
        predicate: Symbol,
        expected: usize,
        found: usize,
    },
    #[error(transparent)]
    Type(#[from] TypeError),
}

/// Errors raised by the text notation and PDDL front ends.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("syntax error: {0}")]
    Syntax(String),
    #[error("unsupported feature: {0}")]
    Unsupported(String),
    #[error("unknown predicate `{0}`")]
    UnknownPredicate(String),
    #[error("unknown object `{0}`")]
    UnknownObject(String),
    #[error("unknown parameter `{0}`")]
    UnknownParameter(String),
    #[error("unknown type `{0}`")]
    UnknownType(String),
    #[error("problem is defined for domain `{found}`, expected `{expected}`")]
    WrongDomain { expected: String, found: String },
    #[error("`{0}` is not ground")]
    NotGround(String),
    #[error("unknown action `{0}`")]
    UnknownAction(String),
    /// A plan step names a known action but cannot be instantiated.
    #[error("step `{0}` is not a valid instance of its action")]
    InvalidStep(String),
    #[error(transparent)]
    Build(#[from] BuildError),
}

impl From<TypeError> for ParseError {
    fn from(error: TypeError) -> Self {
        Self::Build(BuildError::Type(error))
    }
}
