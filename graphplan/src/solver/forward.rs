use alloc::{
    collections::{BTreeMap, BinaryHeap},
    rc::Rc,
    vec::Vec,
};
use core::cmp::Ordering;
use log::{debug, info, trace};

use super::{CancelFlag, ForwardSearchConfig, Plan, Solver};
use crate::{
    action::GroundAction, error::PlanningError, grounding::Grounder, problem::Problem,
    state::State,
};

/// Uniform-cost search over states, for goals given as arbitrary tests.
#[derive(Debug, Clone, Default)]
pub struct ForwardSearch {
    config: ForwardSearchConfig,
    cancel: Option<CancelFlag>,
}

impl ForwardSearch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(mut self, config: ForwardSearchConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_cancellation(mut self, cancel: CancelFlag) -> Self {
        self.cancel = Some(cancel);
        self
    }
}

impl Solver for ForwardSearch {
    type Error = PlanningError;

    fn can_solve(&self, _: &Problem) -> bool {
        true
    }

    fn solve(&self, problem: &Problem) -> Result<Option<Plan>, Self::Error> {
        let grounder = Grounder::new(problem);
        let mut open = BinaryHeap::new();
        let mut closed: BTreeMap<Rc<State>, usize> = BTreeMap::new();
        let mut pushed = 0;
        let mut expansions = 0;

        open.push(Node {
            state: Rc::new(problem.init().clone()),
            cost: 0,
            order: pushed,
            path: Vec::new(),
        });

        while let Some(Node {
            state, cost, path, ..
        }) = open.pop()
        {
            CancelFlag::check(self.cancel.as_ref())?;

            if closed.get(&state).is_some_and(|&seen| seen <= cost) {
                continue;
            }
            closed.insert(Rc::clone(&state), cost);

            if problem.goal_test(&state) {
                info!(
                    "{}: found a plan with {} steps after {} expansions",
                    problem.name(),
                    path.len(),
                    expansions
                );
                return Ok(Some(Plan::sequential(path)));
            }

            if let Some(max) = self.config.max_expansions {
                if expansions >= max {
                    return Err(PlanningError::ExpansionLimitExceeded { expansions: max });
                }
            }
            expansions += 1;

            for action in grounder.applicable(&state) {
                let next = Rc::new(state.apply(&action)?);
                if *next == *state {
                    // Nothing changed
                    continue;
                }

                let next_cost = cost + 1;
                if closed.get(&next).is_some_and(|&seen| seen <= next_cost) {
                    continue;
                }

                trace!("{} -> {}", action, next);
                pushed += 1;
                open.push(Node {
                    state: next,
                    cost: next_cost,
                    order: pushed,
                    path: {
                        let mut path = path.clone();
                        path.push(action);
                        path
                    },
                });
            }
        }

        debug!(
            "{}: state space exhausted after {} expansions",
            problem.name(),
            expansions
        );
        Ok(None)
    }
}

#[derive(Debug, Clone)]
struct Node {
    state: Rc<State>,
    cost: usize,
    /// Push counter, so equal costs are expanded first in first out.
    order: usize,
    path: Vec<GroundAction>,
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Node {}

impl PartialOrd for Node {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Node {
    fn cmp(&self, other: &Self) -> Ordering {
        // min-heap
        other
            .cost
            .cmp(&self.cost)
            .then_with(|| other.order.cmp(&self.order))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        action::ActionSchema,
        expression::parse_ground_atoms,
        predicate::GroundAtom,
        problem::{Goal, ProblemBuilder},
    };
    use alloc::{string::ToString, vec};

    fn node(cost: usize, order: usize) -> Node {
        Node {
            state: Rc::new(State::default()),
            cost,
            order,
            path: vec![],
        }
    }

    #[test]
    fn test_use_min_heap() {
        // a is greater because its cost is lower
        assert_eq!(node(1, 5).cmp(&node(2, 0)), Ordering::Greater);
        // ties go to whatever was pushed first
        assert_eq!(node(1, 0).cmp(&node(1, 1)), Ordering::Greater);
    }

    fn counter() -> Problem {
        let inc = ActionSchema::from_expr(
            "Inc(a, b)",
            "Count(a) & Next(a, b)",
            "~Count(a) & Count(b)",
        )
        .unwrap();
        ProblemBuilder::new("counter")
            .actions([inc])
            .init(State::from_iter(
                parse_ground_atoms("Count(N0) & Next(N0, N1) & Next(N1, N2) & Next(N2, N3)")
                    .unwrap(),
            ))
            .goal(Goal::test(|s: &State| {
                s.atoms()
                    .iter()
                    .any(|a| a.predicate().name() == "Count" && a.args()[0].name() == "N2")
            }))
            .build()
    }

    #[test]
    fn test_test_goal() {
        let plan = ForwardSearch::new().solve(&counter()).unwrap().unwrap();
        assert_eq!(
            plan.steps().iter().map(ToString::to_string).collect::<Vec<_>>(),
            vec!["Inc(N0, N1)", "Inc(N1, N2)"]
        );
        assert_eq!(plan.levels(), 2);
    }

    #[test]
    fn test_exhausted_state_space() {
        let p = ProblemBuilder::new("stuck")
            .actions([])
            .init(State::default())
            .goal(Goal::atom(GroundAtom::new("Done", [])))
            .build();
        assert_eq!(ForwardSearch::new().solve(&p), Ok(None));
    }

    #[test]
    fn test_expansion_limit() {
        let limited = ForwardSearch::new().with_config(ForwardSearchConfig {
            max_expansions: Some(1),
        });
        assert_eq!(
            limited.solve(&counter()),
            Err(PlanningError::ExpansionLimitExceeded { expansions: 1 })
        );
    }

    #[test]
    fn test_cancellation() {
        let flag = CancelFlag::new();
        flag.cancel();
        let solver = ForwardSearch::new().with_cancellation(flag);
        assert_eq!(solver.solve(&counter()), Err(PlanningError::Cancelled));
    }
}
