use alloc::{sync::Arc, vec::Vec};
use core::{
    error::Error,
    fmt::Display,
    sync::atomic::{AtomicBool, Ordering},
};
use gazebo::dupe::Dupe;
use getset::{CopyGetters, Getters};

use crate::{action::GroundAction, error::PlanningError, problem::Problem};

mod extract;
pub mod forward;
pub mod graph;
pub mod graphplan;

pub use forward::ForwardSearch;
pub use graphplan::GraphPlan;

pub trait Solver {
    type Error: Error;
    /// Whether this solver can handle the goal and actions of `problem`.
    fn can_solve(&self, problem: &Problem) -> bool;
    /// Solve the given [Problem] and return a [Plan].
    ///
    /// `Ok(None)` means the problem has no solution.
    fn solve(&self, problem: &Problem) -> Result<Option<Plan>, Self::Error>;
}

/// A sequence of actions that
/// lead from the initial to the goal [State](crate::state::State).
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Getters, CopyGetters)]
pub struct Plan {
    #[getset(get = "pub")]
    steps: Vec<GroundAction>,
    /// Number of parallel levels the steps were extracted from.
    #[getset(get_copy = "pub")]
    levels: usize,
}

impl Plan {
    pub fn new(steps: Vec<GroundAction>, levels: usize) -> Self {
        Self { steps, levels }
    }

    /// A plan where every step is its own level.
    pub fn sequential(steps: Vec<GroundAction>) -> Self {
        let levels = steps.len();
        Self { steps, levels }
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

impl Display for Plan {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        writeln!(f, "(")?;
        for step in &self.steps {
            writeln!(f, "  {}", step)?;
        }
        write!(f, ")")
    }
}

/// Shared flag for stopping a search from another thread.
#[derive(Debug, Clone, Dupe, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    pub(crate) fn check(flag: Option<&CancelFlag>) -> Result<(), PlanningError> {
        match flag {
            Some(f) if f.is_cancelled() => Err(PlanningError::Cancelled),
            _ => Ok(()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GraphPlanConfig {
    /// Give up with [PlanningError::LevelLimitExceeded] after this many levels.
    pub max_levels: Option<usize>,
    /// Report goals that no action can achieve as
    /// [PlanningError::MalformedProblem] instead of returning no plan.
    pub strict_goal_check: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ForwardSearchConfig {
    /// Give up with [PlanningError::ExpansionLimitExceeded] after expanding
    /// this many states.
    pub max_expansions: Option<usize>,
}
