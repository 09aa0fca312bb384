//! A classical STRIPS planner built around a GraphPlan-style planning graph.
//!
//! # Usage:
//!```
//! use graphplan::{
//!     action::ActionSchema,
//!     expression::{parse_ground_atoms, parse_ground_literals},
//!     problem::{Goal, ProblemBuilder},
//!     state::State,
//! };
//!
//! let fly = ActionSchema::from_expr(
//!     "Fly(from, to)",
//!     "At(from) & Connected(from, to)",
//!     "~At(from) & At(to)",
//! )
//! .unwrap();
//!
//! let problem = ProblemBuilder::new("Sample Problem")
//!     .actions([fly])
//!     .init(State::from_iter(
//!         parse_ground_atoms("At(Sibiu) & Connected(Sibiu, Bucharest)").unwrap(),
//!     ))
//!     .goal(Goal::literals(parse_ground_literals("At(Bucharest)").unwrap()))
//!     .build();
//!
//! let plan = graphplan::plan(&problem).unwrap().expect("plan exists");
//! assert_eq!(plan.to_string(), "(\n  Fly(Sibiu, Bucharest)\n)");
//!```

#![cfg_attr(not(test), no_std)]

extern crate alloc;

pub mod action;
pub mod entity;
pub mod error;
pub mod expression;
pub mod grounding;
pub mod parser;
pub mod predicate;
pub mod problem;
pub mod solver;
pub mod state;
pub mod substitution;
pub mod util;
pub mod validator;

use alloc::string::{String, ToString};
use core::fmt::{Debug, Display};
use gazebo::dupe::Dupe;
use spin::Mutex;
use string_interner::{backend::BufferBackend, symbol::SymbolU32, StringInterner};

use crate::{
    action::GroundAction,
    error::PlanningError,
    problem::Problem,
    solver::{ForwardSearch, GraphPlan, Plan, Solver},
    state::State,
};

type InternerSymbol = SymbolU32;
type Interner = StringInterner<BufferBackend<InternerSymbol>>;
lazy_static::lazy_static! {
    static ref INTERNER: Mutex<Interner> = Mutex::new(Interner::new());
}

pub(crate) mod sealed {
    pub trait Sealed {}
}

/// Interned name of a predicate, constant, variable, type or action.
///
/// Ordering follows interning order, which is stable for the lifetime of
/// the process but not across processes. Anything that has to be
/// reproducible sorts by the rendered name instead.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Symbol(InternerSymbol);

impl Dupe for Symbol {}

impl Symbol {
    pub fn new(name: &str) -> Self {
        Self(INTERNER.lock().get_or_intern(name))
    }

    /// The symbol of a name that is already interned. Unlike [Symbol::new]
    /// this never grows the interner.
    pub fn lookup(name: &str) -> Option<Self> {
        INTERNER.lock().get(name).map(Self)
    }

    pub fn name(&self) -> String {
        INTERNER
            .lock()
            .resolve(self.0)
            .map(String::from)
            .unwrap_or_default()
    }
}

impl From<&str> for Symbol {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl Display for Symbol {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        // Resolve first so the interner lock is released before writing.
        let name = self.name();
        f.write_str(&name)
    }
}

impl Debug for Symbol {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "Symbol({})", self.to_string())
    }
}

/// Finds a plan for `problem`.
///
/// Goals given as literal sets are solved with [GraphPlan]; goals given as
/// an arbitrary test fall back to [ForwardSearch]. `Ok(None)` means that no
/// plan exists.
pub fn plan(problem: &Problem) -> Result<Option<Plan>, PlanningError> {
    let graphplan = GraphPlan::default();
    if graphplan.can_solve(problem) {
        graphplan.solve(problem)
    } else {
        ForwardSearch::default().solve(problem)
    }
}

/// Applies a single ground action, for replaying or simulating plans.
pub fn act(state: &State, action: &GroundAction) -> Result<State, PlanningError> {
    state.apply(action)
}
