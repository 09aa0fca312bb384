//! Layered planning graph with mutex annotations.
//!
//! Literals and ground actions are interned into tables sorted by their
//! rendered form, so every decision made over the graph depends only on
//! names and never on interning order.
//!
//! Action nodes share one id space. Ids `0..L`, where `L` is the number of
//! literals, are persistence nodes: node `i` carries literal `i` forward.
//! Id `L + k` is the `k`-th ground action in name order.

use alloc::{
    collections::{BTreeMap, BTreeSet},
    vec,
    vec::Vec,
};
use getset::Getters;
use itertools::Itertools;
use log::debug;

use crate::{
    action::GroundAction,
    grounding::Grounder,
    predicate::{GroundAtom, GroundLiteral},
    problem::Problem,
};

pub type LiteralId = usize;
pub type NodeId = usize;

fn ordered(a: usize, b: usize) -> (usize, usize) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

/// Literals reachable at a level and the pairs of them that are mutex.
#[derive(Debug, Clone, Default, PartialEq, Eq, Getters)]
pub struct StateLayer {
    #[getset(get = "pub")]
    literals: BTreeSet<LiteralId>,
    #[getset(get = "pub")]
    mutexes: BTreeSet<(LiteralId, LiteralId)>,
}

impl StateLayer {
    pub fn contains(&self, literal: LiteralId) -> bool {
        self.literals.contains(&literal)
    }

    pub fn is_mutex(&self, a: LiteralId, b: LiteralId) -> bool {
        self.mutexes.contains(&ordered(a, b))
    }
}

/// Action nodes between two state layers, their mutexes, and for every
/// literal of the next layer the nodes producing it in id order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Getters)]
pub struct ActionLayer {
    #[getset(get = "pub")]
    nodes: BTreeSet<NodeId>,
    #[getset(get = "pub")]
    mutexes: BTreeSet<(NodeId, NodeId)>,
    #[getset(get = "pub")]
    achievers: BTreeMap<LiteralId, Vec<NodeId>>,
}

impl ActionLayer {
    pub fn is_mutex(&self, a: NodeId, b: NodeId) -> bool {
        self.mutexes.contains(&ordered(a, b))
    }
}

#[derive(Debug, Clone)]
pub struct PlanningGraph {
    literals: Vec<GroundLiteral>,
    index: BTreeMap<GroundLiteral, LiteralId>,
    complements: Vec<LiteralId>,
    actions: Vec<GroundAction>,
    preconditions: Vec<Vec<LiteralId>>,
    effects: Vec<Vec<LiteralId>>,
    states: Vec<StateLayer>,
    layers: Vec<ActionLayer>,
}

impl PlanningGraph {
    /// Builds level 0 for `problem`. `goals` are added to the literal
    /// universe even if nothing mentions them.
    pub fn new(problem: &Problem, goals: &BTreeSet<GroundLiteral>) -> Self {
        let actions = Grounder::new(problem).reachable_actions();

        let mut atoms: BTreeSet<GroundAtom> = problem.init().atoms().clone();
        atoms.extend(goals.iter().map(|l| l.atom().clone()));
        for action in &actions {
            atoms.extend(
                action
                    .preconditions()
                    .iter()
                    .chain(action.effects())
                    .map(|l| l.atom().clone()),
            );
        }

        let literals = atoms
            .iter()
            .flat_map(|a| [GroundLiteral::pos(a.clone()), GroundLiteral::neg(a.clone())])
            .sorted_by_cached_key(GroundLiteral::render)
            .collect::<Vec<_>>();
        let index: BTreeMap<_, _> = literals
            .iter()
            .enumerate()
            .map(|(i, l)| (l.clone(), i))
            .collect();
        let complements = literals.iter().map(|l| index[&l.complement()]).collect();

        let ids = |ls: &BTreeSet<GroundLiteral>| -> Vec<LiteralId> {
            ls.iter().map(|l| index[l]).sorted().collect()
        };
        let persistence = (0..literals.len()).map(|i| vec![i]);
        let preconditions = persistence
            .clone()
            .chain(actions.iter().map(|a| ids(a.preconditions())))
            .collect();
        let effects = persistence
            .chain(actions.iter().map(|a| ids(a.effects())))
            .collect();

        let initial = StateLayer {
            literals: atoms
                .iter()
                .map(|a| {
                    let literal = GroundLiteral::new(a.clone(), problem.init().contains(a));
                    index[&literal]
                })
                .collect(),
            mutexes: BTreeSet::new(),
        };

        debug!(
            "planning graph over {} literals and {} ground actions",
            literals.len(),
            actions.len()
        );

        Self {
            literals,
            index,
            complements,
            actions,
            preconditions,
            effects,
            states: vec![initial],
            layers: Vec::new(),
        }
    }

    /// Number of action layers built so far. The top state layer has this index.
    pub fn depth(&self) -> usize {
        self.layers.len()
    }

    pub fn state_layer(&self, level: usize) -> &StateLayer {
        &self.states[level]
    }

    pub fn action_layer(&self, level: usize) -> &ActionLayer {
        &self.layers[level]
    }

    pub fn literal_count(&self) -> usize {
        self.literals.len()
    }

    pub fn literal(&self, id: LiteralId) -> &GroundLiteral {
        &self.literals[id]
    }

    pub fn literal_id(&self, literal: &GroundLiteral) -> Option<LiteralId> {
        self.index.get(literal).copied()
    }

    /// Persistence nodes plus ground actions.
    pub fn node_count(&self) -> usize {
        self.preconditions.len()
    }

    pub fn is_persistence(&self, node: NodeId) -> bool {
        node < self.literals.len()
    }

    /// The ground action behind `node`, `None` for persistence nodes.
    pub fn node_action(&self, node: NodeId) -> Option<&GroundAction> {
        node.checked_sub(self.literals.len())
            .and_then(|i| self.actions.get(i))
    }

    pub fn node_preconditions(&self, node: NodeId) -> &[LiteralId] {
        &self.preconditions[node]
    }

    pub fn node_effects(&self, node: NodeId) -> &[LiteralId] {
        &self.effects[node]
    }

    pub fn literals_mutex(&self, level: usize, a: LiteralId, b: LiteralId) -> bool {
        self.states[level].is_mutex(a, b)
    }

    pub fn actions_mutex(&self, level: usize, a: NodeId, b: NodeId) -> bool {
        self.layers[level].is_mutex(a, b)
    }

    /// Nodes of action layer `level` that produce `literal`, persistence first.
    pub fn achievers(&self, level: usize, literal: LiteralId) -> &[NodeId] {
        self.layers[level]
            .achievers
            .get(&literal)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Whether all `goals` are present at `level` and pairwise non-mutex.
    pub fn goals_reachable(&self, level: usize, goals: &[LiteralId]) -> bool {
        let layer = &self.states[level];
        goals.iter().all(|&g| layer.contains(g))
            && goals
                .iter()
                .tuple_combinations()
                .all(|(&a, &b)| !layer.is_mutex(a, b))
    }

    /// Two consecutive state layers with the same literals and mutexes.
    pub fn is_leveled_off(&self) -> bool {
        match self.states.as_slice() {
            [.., previous, last] => previous == last,
            _ => false,
        }
    }

    fn has_complement_in(&self, effects: &[LiteralId], others: &[LiteralId]) -> bool {
        effects
            .iter()
            .any(|&e| others.binary_search(&self.complements[e]).is_ok())
    }

    /// Inconsistent effects or interference, which do not depend on the level.
    fn interferes(&self, a: NodeId, b: NodeId) -> bool {
        let (ea, eb) = (&self.effects[a], &self.effects[b]);
        self.has_complement_in(ea, eb)
            || self.has_complement_in(ea, &self.preconditions[b])
            || self.has_complement_in(eb, &self.preconditions[a])
    }

    fn competing_needs(&self, state: &StateLayer, a: NodeId, b: NodeId) -> bool {
        self.preconditions[a]
            .iter()
            .cartesian_product(&self.preconditions[b])
            .any(|(&p, &q)| state.is_mutex(p, q))
    }

    /// Adds one action layer and the state layer after it.
    pub fn expand(&mut self) {
        let level = self.depth();
        let state = &self.states[level];
        let persistence = self.literals.len();

        let mut nodes: BTreeSet<NodeId> = state.literals.iter().copied().collect();
        nodes.extend((0..self.actions.len()).map(|i| persistence + i).filter(|&node| {
            let pre = &self.preconditions[node];
            pre.iter().all(|&p| state.contains(p))
                && pre
                    .iter()
                    .tuple_combinations()
                    .all(|(&p, &q)| !state.is_mutex(p, q))
        }));

        let mut mutexes = BTreeSet::new();
        for (a, b) in nodes.iter().copied().tuple_combinations() {
            if self.interferes(a, b) || self.competing_needs(state, a, b) {
                mutexes.insert((a, b));
            }
        }

        let mut achievers: BTreeMap<LiteralId, Vec<NodeId>> = BTreeMap::new();
        for &node in &nodes {
            for &e in &self.effects[node] {
                achievers.entry(e).or_default().push(node);
            }
        }

        let literals: BTreeSet<LiteralId> = achievers.keys().copied().collect();
        let mut literal_mutexes = BTreeSet::new();
        for (p, q) in literals.iter().copied().tuple_combinations() {
            let exclusive = self.complements[p] == q
                || achievers[&p].iter().all(|&a| {
                    achievers[&q]
                        .iter()
                        .all(|&b| a != b && mutexes.contains(&ordered(a, b)))
                });
            if exclusive {
                literal_mutexes.insert((p, q));
            }
        }

        debug!(
            "level {}: {} actions with {} mutexes, {} literals with {} mutexes",
            level + 1,
            nodes.len(),
            mutexes.len(),
            literals.len(),
            literal_mutexes.len()
        );

        self.layers.push(ActionLayer {
            nodes,
            mutexes,
            achievers,
        });
        self.states.push(StateLayer {
            literals,
            mutexes: literal_mutexes,
        });
    }
}
