use alloc::{
    collections::{BTreeMap, BTreeSet},
    vec,
    vec::Vec,
};
use itertools::Itertools;
use log::trace;

use super::{
    graph::{LiteralId, NodeId, PlanningGraph},
    CancelFlag, Plan,
};
use crate::error::PlanningError;

/// Goal sets already known to be unachievable, per state layer.
///
/// Layers below the top never change when the graph grows, so entries stay
/// valid across expansions.
#[derive(Debug, Clone, Default)]
pub(crate) struct NoGoods(BTreeMap<usize, BTreeSet<Vec<LiteralId>>>);

impl NoGoods {
    pub(crate) fn contains(&self, level: usize, goals: &[LiteralId]) -> bool {
        self.0.get(&level).is_some_and(|g| g.contains(goals))
    }

    pub(crate) fn insert(&mut self, level: usize, goals: Vec<LiteralId>) {
        self.0.entry(level).or_default().insert(goals);
    }

    pub(crate) fn count_at(&self, level: usize) -> usize {
        self.0.get(&level).map_or(0, BTreeSet::len)
    }
}

#[derive(Debug)]
enum Choice {
    /// The goal is produced by an action selected for an earlier goal.
    Covered,
    /// `candidates[cursor]` is selected for the goal.
    Picked {
        candidates: Vec<NodeId>,
        cursor: usize,
    },
}

/// One goal set being regressed through the action layer below it.
#[derive(Debug)]
struct Frame {
    level: usize,
    goals: Vec<LiteralId>,
    choices: Vec<Choice>,
    selected: Vec<NodeId>,
}

impl Frame {
    fn new(level: usize, goals: Vec<LiteralId>) -> Self {
        Self {
            level,
            goals,
            choices: Vec::new(),
            selected: Vec::new(),
        }
    }

    fn is_complete(&self) -> bool {
        self.choices.len() == self.goals.len()
    }

    /// Moves the most recent open choice to its next candidate.
    ///
    /// Returns `false` when every choice is exhausted.
    fn backtrack(&mut self, cancel: Option<&CancelFlag>) -> Result<bool, PlanningError> {
        while let Some(choice) = self.choices.last_mut() {
            match choice {
                Choice::Covered => {
                    self.choices.pop();
                }
                Choice::Picked { candidates, cursor } => {
                    self.selected.pop();
                    *cursor += 1;
                    if let Some(&next) = candidates.get(*cursor) {
                        CancelFlag::check(cancel)?;
                        self.selected.push(next);
                        return Ok(true);
                    }
                    self.choices.pop();
                }
            }
        }
        Ok(false)
    }

    /// Chooses an achiever for the next goal. Returns `false` on a dead end.
    fn advance(
        &mut self,
        graph: &PlanningGraph,
        cancel: Option<&CancelFlag>,
    ) -> Result<bool, PlanningError> {
        let goal = self.goals[self.choices.len()];
        let layer = self.level - 1;

        if self
            .selected
            .iter()
            .any(|&s| graph.node_effects(s).binary_search(&goal).is_ok())
        {
            self.choices.push(Choice::Covered);
            return Ok(true);
        }

        let candidates = graph
            .achievers(layer, goal)
            .iter()
            .copied()
            .filter(|&c| self.selected.iter().all(|&s| !graph.actions_mutex(layer, c, s)))
            .collect::<Vec<_>>();

        match candidates.first() {
            Some(&first) => {
                CancelFlag::check(cancel)?;
                self.selected.push(first);
                self.choices.push(Choice::Picked {
                    candidates,
                    cursor: 0,
                });
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Finds the next complete assignment of achievers to goals.
    ///
    /// With `retry` the current assignment is discarded first.
    fn next_assignment(
        &mut self,
        graph: &PlanningGraph,
        retry: bool,
        cancel: Option<&CancelFlag>,
    ) -> Result<bool, PlanningError> {
        if retry && !self.backtrack(cancel)? {
            return Ok(false);
        }
        while !self.is_complete() {
            if !self.advance(graph, cancel)? && !self.backtrack(cancel)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Preconditions of the selected actions, the goals one level down.
    fn subgoals(&self, graph: &PlanningGraph) -> Vec<LiteralId> {
        self.selected
            .iter()
            .flat_map(|&n| graph.node_preconditions(n).iter().copied())
            .sorted()
            .dedup()
            .collect()
    }
}

/// Backward search over a built planning graph with an explicit frame stack.
pub(crate) struct Extractor<'a> {
    graph: &'a PlanningGraph,
    no_goods: &'a mut NoGoods,
    cancel: Option<&'a CancelFlag>,
}

impl<'a> Extractor<'a> {
    pub(crate) fn new(
        graph: &'a PlanningGraph,
        no_goods: &'a mut NoGoods,
        cancel: Option<&'a CancelFlag>,
    ) -> Self {
        Self {
            graph,
            no_goods,
            cancel,
        }
    }

    /// Searches for a plan reaching `goals` at state layer `level`.
    ///
    /// `goals` must be sorted. Exhausted goal sets are recorded as no-goods.
    pub(crate) fn extract(
        &mut self,
        level: usize,
        goals: Vec<LiteralId>,
    ) -> Result<Option<Plan>, PlanningError> {
        if level == 0 || goals.is_empty() {
            return Ok(Some(Plan::new(Vec::new(), 0)));
        }
        if self.no_goods.contains(level, &goals) {
            return Ok(None);
        }

        let mut stack = vec![Frame::new(level, goals)];
        let mut retry = false;

        while let Some(frame) = stack.last_mut() {
            if !frame.next_assignment(self.graph, retry, self.cancel)? {
                trace!("no-good at level {}: {:?}", frame.level, frame.goals);
                let exhausted = stack.pop();
                if let Some(f) = exhausted {
                    self.no_goods.insert(f.level, f.goals);
                }
                retry = true;
                continue;
            }
            retry = false;

            if frame.level == 1 {
                return Ok(Some(self.collect(&stack, level)));
            }

            let subgoals = frame.subgoals(self.graph);
            let below = frame.level - 1;
            if self.no_goods.contains(below, &subgoals)
                || !self.graph.goals_reachable(below, &subgoals)
            {
                trace!("backtracking at level {}", frame.level);
                retry = true;
                continue;
            }
            stack.push(Frame::new(below, subgoals));
        }

        Ok(None)
    }

    /// The selected ground actions, earliest level first and by name within
    /// a level.
    fn collect(&self, stack: &[Frame], levels: usize) -> Plan {
        let steps = stack
            .iter()
            .rev()
            .flat_map(|frame| {
                frame
                    .selected
                    .iter()
                    .copied()
                    .sorted()
                    .filter_map(|n| self.graph.node_action(n).cloned())
            })
            .collect();
        Plan::new(steps, levels)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        action::ActionSchema,
        expression::{parse_ground_atoms, parse_ground_literals},
        problem::{Goal, ProblemBuilder},
        state::State,
    };
    use alloc::string::ToString;

    fn graph(
        actions: &[(&str, &str, &str)],
        init: &str,
        goal: &str,
    ) -> (PlanningGraph, Vec<LiteralId>) {
        let problem = ProblemBuilder::new("test")
            .actions(
                actions
                    .iter()
                    .map(|(h, p, e)| ActionSchema::from_expr(h, p, e).unwrap()),
            )
            .init(State::from_iter(parse_ground_atoms(init).unwrap()))
            .goal(Goal::literals(parse_ground_literals(goal).unwrap()))
            .build();
        let goals = problem.goal().as_literals().cloned().unwrap_or_default();
        let graph = PlanningGraph::new(&problem, &goals);
        let ids = goals
            .iter()
            .filter_map(|g| graph.literal_id(g))
            .sorted()
            .collect();
        (graph, ids)
    }

    #[test]
    fn test_no_goods() {
        let mut no_goods = NoGoods::default();
        assert!(!no_goods.contains(2, &[1, 3]));
        no_goods.insert(2, vec![1, 3]);
        no_goods.insert(2, vec![1, 3]);
        assert!(no_goods.contains(2, &[1, 3]));
        assert!(!no_goods.contains(1, &[1, 3]));
        assert_eq!(no_goods.count_at(2), 1);
        assert_eq!(no_goods.count_at(5), 0);
    }

    #[test]
    fn test_extract_prefers_persistence() {
        let (mut g, goals) = graph(
            &[("Fly(from, to)", "At(from) & Route(from, to)", "~At(from) & At(to)")],
            "At(A) & Route(A, B) & Route(B, C)",
            "At(C)",
        );
        g.expand();
        g.expand();
        assert!(g.goals_reachable(2, &goals));

        let mut no_goods = NoGoods::default();
        let plan = Extractor::new(&g, &mut no_goods, None)
            .extract(2, goals)
            .unwrap()
            .unwrap();
        assert_eq!(
            plan.steps().iter().map(ToString::to_string).collect::<Vec<_>>(),
            vec!["Fly(A, B)", "Fly(B, C)"]
        );
        assert_eq!(plan.levels(), 2);
    }

    #[test]
    fn test_skips_mutex_achievers() {
        // Paint comes first by name but undoes what Wait achieves
        let (mut g, goals) = graph(
            &[
                ("Paint", "", "Red & ~Dry"),
                ("Stain", "", "Red"),
                ("Wait", "", "Dry"),
            ],
            "",
            "Red & Dry",
        );
        g.expand();
        assert!(g.goals_reachable(1, &goals));

        let node = |name: &str| {
            (0..g.node_count())
                .find(|&n| g.node_action(n).is_some_and(|a| a.to_string() == name))
                .unwrap()
        };
        let red = g.literal_id(&parse_ground_literals("Red").unwrap()[0]).unwrap();
        assert_eq!(g.achievers(0, red), &[node("Paint"), node("Stain")]);
        assert!(g.actions_mutex(0, node("Paint"), node("Wait")));

        let mut no_goods = NoGoods::default();
        let plan = Extractor::new(&g, &mut no_goods, None)
            .extract(1, goals)
            .unwrap()
            .unwrap();
        assert_eq!(
            plan.steps().iter().map(ToString::to_string).collect::<Vec<_>>(),
            vec!["Stain", "Wait"]
        );
        assert_eq!(no_goods.count_at(1), 0);
    }

    #[test]
    fn test_records_no_goods() {
        // Goals are pairwise reachable, but every action that gives two of
        // them takes the third away
        let (mut g, goals) = graph(
            &[
                ("X", "", "A & B & ~C"),
                ("Y", "", "B & C & ~A"),
                ("Z", "", "A & C & ~B"),
            ],
            "",
            "A & B & C",
        );
        g.expand();
        assert!(g.goals_reachable(1, &goals));

        let mut no_goods = NoGoods::default();
        let result = Extractor::new(&g, &mut no_goods, None).extract(1, goals.clone());
        assert_eq!(result, Ok(None));
        assert_eq!(no_goods.count_at(1), 1);
        assert!(no_goods.contains(1, &goals));

        // Known no-goods are rejected straight away
        let again = Extractor::new(&g, &mut no_goods, None).extract(1, goals);
        assert_eq!(again, Ok(None));
        assert_eq!(no_goods.count_at(1), 1);
    }

    #[test]
    fn test_cancelled() {
        let (mut g, goals) = graph(
            &[("Fly(from, to)", "At(from) & Route(from, to)", "~At(from) & At(to)")],
            "At(A) & Route(A, B)",
            "At(B)",
        );
        g.expand();
        let flag = CancelFlag::new();
        flag.cancel();
        let mut no_goods = NoGoods::default();
        assert_eq!(
            Extractor::new(&g, &mut no_goods, Some(&flag)).extract(1, goals),
            Err(PlanningError::Cancelled)
        );
    }
}
