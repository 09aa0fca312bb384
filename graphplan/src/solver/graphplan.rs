use alloc::{collections::BTreeSet, vec::Vec};
use itertools::Itertools;
use log::{debug, info};

use super::{
    extract::{Extractor, NoGoods},
    graph::PlanningGraph,
    CancelFlag, GraphPlanConfig, Plan, Solver,
};
use crate::{error::PlanningError, predicate::GroundLiteral, problem::Problem};

/// Expands a planning graph level by level and searches it backwards
/// whenever the goals appear together.
#[derive(Debug, Clone, Default)]
pub struct GraphPlan {
    config: GraphPlanConfig,
    cancel: Option<CancelFlag>,
}

impl GraphPlan {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(mut self, config: GraphPlanConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_cancellation(mut self, cancel: CancelFlag) -> Self {
        self.cancel = Some(cancel);
        self
    }

    /// Fails when a positive goal uses a predicate that neither the initial
    /// state nor any action effect mentions.
    fn check_goals(
        &self,
        problem: &Problem,
        goals: &BTreeSet<GroundLiteral>,
    ) -> Result<(), PlanningError> {
        let mut known: BTreeSet<_> = problem
            .init()
            .atoms()
            .iter()
            .map(|a| *a.predicate())
            .collect();
        for schema in problem.actions().values() {
            known.extend(schema.effect_add().map(|a| *a.predicate()));
        }

        match goals
            .iter()
            .filter(|g| g.is_positive())
            .map(|g| *g.atom().predicate())
            .find(|p| !known.contains(p))
        {
            Some(predicate) => Err(PlanningError::MalformedProblem { predicate }),
            None => Ok(()),
        }
    }
}

impl Solver for GraphPlan {
    type Error = PlanningError;

    fn can_solve(&self, problem: &Problem) -> bool {
        problem.goal().as_literals().is_some()
    }

    fn solve(&self, problem: &Problem) -> Result<Option<Plan>, Self::Error> {
        let goals = problem
            .goal()
            .as_literals()
            .ok_or(PlanningError::UnsupportedGoal)?;
        let cancel = self.cancel.as_ref();

        if self.config.strict_goal_check {
            self.check_goals(problem, goals)?;
        }
        if problem.init().satisfies(goals) {
            info!("{}: goal holds in the initial state", problem.name());
            return Ok(Some(Plan::default()));
        }

        let mut graph = PlanningGraph::new(problem, goals);
        let goal_ids: Vec<_> = goals
            .iter()
            .filter_map(|g| graph.literal_id(g))
            .sorted()
            .collect();

        let mut no_goods = NoGoods::default();
        // First level of the fixpoint, once the graph stops changing
        let mut leveled_at: Option<usize> = None;
        let mut previous_no_goods: Option<usize> = None;

        loop {
            CancelFlag::check(cancel)?;
            let depth = graph.depth();

            if graph.goals_reachable(depth, &goal_ids) {
                debug!("attempting extraction at level {}", depth);
                let plan = Extractor::new(&graph, &mut no_goods, cancel)
                    .extract(depth, goal_ids.clone())?;
                if let Some(plan) = plan {
                    info!(
                        "{}: found a plan with {} steps over {} levels",
                        problem.name(),
                        plan.len(),
                        plan.levels()
                    );
                    return Ok(Some(plan));
                }

                if let Some(level) = leveled_at {
                    let count = no_goods.count_at(level);
                    if previous_no_goods == Some(count) {
                        info!("{}: no plan, no-goods stopped changing", problem.name());
                        return Ok(None);
                    }
                    previous_no_goods = Some(count);
                }
            } else if leveled_at.is_some() {
                info!(
                    "{}: no plan, goals never appear together",
                    problem.name()
                );
                return Ok(None);
            }

            if let Some(max) = self.config.max_levels {
                if depth >= max {
                    return Err(PlanningError::LevelLimitExceeded { levels: max });
                }
            }

            graph.expand();
            if leveled_at.is_none() && graph.is_leveled_off() {
                let level = graph.depth() - 1;
                debug!("planning graph leveled off at level {}", level);
                leveled_at = Some(level);
            }
        }
    }
}
