use alloc::{
    collections::{BTreeMap, BTreeSet},
    vec,
    vec::Vec,
};
use itertools::Itertools;
use log::{debug, trace};

use crate::{
    action::{ActionSchema, GroundAction, Parameter},
    predicate::{GroundAtom, Term},
    problem::{Goal, Problem},
    state::State,
    substitution::Substitution,
    Symbol,
};

/// Turns the action schemas of a [Problem] into ground actions.
pub struct Grounder<'a> {
    problem: &'a Problem,
    constants: Vec<Symbol>,
}

impl<'a> Grounder<'a> {
    pub fn new(problem: &'a Problem) -> Self {
        let mut constants: BTreeSet<Symbol> =
            problem.entities().objects().map(|(&o, _)| o).collect();
        constants.extend(problem.init().atoms().iter().flat_map(|a| a.args().iter().copied()));
        if let Goal::Literals(literals) = problem.goal() {
            constants.extend(literals.iter().flat_map(|l| l.atom().args().iter().copied()));
        }
        for schema in problem.actions().values() {
            let terms = schema.parameters().iter().map(Parameter::term).chain(
                schema
                    .preconditions()
                    .iter()
                    .chain(schema.effects())
                    .flat_map(|l| l.atom().args().iter().copied()),
            );
            constants.extend(terms.filter_map(|t| match t {
                Term::Const(c) => Some(c),
                Term::Var(_) => None,
            }));
        }

        Self {
            problem,
            constants: constants
                .into_iter()
                .sorted_by_cached_key(Symbol::name)
                .collect(),
        }
    }

    /// Every constant the problem mentions, in name order.
    pub fn constants(&self) -> &[Symbol] {
        &self.constants
    }

    /// Constants a parameter may be bound to.
    pub fn candidates(&self, parameter: &Parameter) -> Vec<Symbol> {
        match parameter.r#type() {
            Some(t) => self
                .constants
                .iter()
                .copied()
                .filter(|c| self.problem.entities().is_instance(c, t))
                .collect(),
            None => self.constants.clone(),
        }
    }

    fn respects_types(&self, schema: &ActionSchema, binding: &Substitution) -> bool {
        schema.parameters().iter().all(|p| {
            match (p.r#type(), p.variable().and_then(|v| binding.get(&v))) {
                (Some(t), Some(value)) => self.problem.entities().is_instance(&value, t),
                _ => true,
            }
        })
    }

    /// Instantiates `schema` so that each positive precondition matches one
    /// of `atoms`. Parameters that no positive precondition mentions range
    /// over their candidates.
    ///
    /// Bindings that make the effects contradict each other are skipped.
    pub fn instantiate(
        &self,
        schema: &ActionSchema,
        atoms: &BTreeSet<GroundAtom>,
    ) -> BTreeSet<GroundAction> {
        let mut by_predicate: BTreeMap<Symbol, Vec<&GroundAtom>> = BTreeMap::new();
        for atom in atoms {
            by_predicate.entry(*atom.predicate()).or_default().push(atom);
        }

        let mut bindings = vec![Substitution::default()];
        for pattern in schema.precond_pos() {
            let facts = by_predicate
                .get(pattern.predicate())
                .map(Vec::as_slice)
                .unwrap_or_default();
            bindings = bindings
                .iter()
                .flat_map(|b| facts.iter().filter_map(move |f| b.unify(pattern, f)))
                .filter(|b| self.respects_types(schema, b))
                .collect();
            if bindings.is_empty() {
                return BTreeSet::new();
            }
        }

        let mut actions = BTreeSet::new();
        for binding in bindings {
            let free = schema
                .parameters()
                .iter()
                .filter(|p| p.variable().is_some_and(|v| !binding.contains(&v)))
                .collect::<Vec<_>>();

            let completions: Vec<Substitution> = if free.is_empty() {
                vec![binding]
            } else {
                free.iter()
                    .map(|p| self.candidates(p))
                    .multi_cartesian_product()
                    .map(|values| {
                        free.iter()
                            .zip(values)
                            .filter_map(|(p, value)| p.variable().map(|v| (v, value)))
                            .fold(binding.clone(), |b, (v, value)| b.bind_symbol(v, value))
                    })
                    .collect()
            };

            for completion in completions {
                match schema.ground(&completion) {
                    Ok(action) => {
                        actions.insert(action);
                    }
                    Err(e) => trace!("skipping {} under {}: {}", schema, completion, e),
                }
            }
        }
        actions
    }

    /// Ground actions reachable from the initial state when delete effects
    /// and negative preconditions are ignored, sorted by rendered name.
    pub fn reachable_actions(&self) -> Vec<GroundAction> {
        let mut atoms = self.problem.init().atoms().clone();
        let mut actions = BTreeSet::new();
        loop {
            let before = atoms.len();
            for schema in self.problem.actions().values() {
                for action in self.instantiate(schema, &atoms) {
                    if !actions.contains(&action) {
                        atoms.extend(action.effect_add().cloned());
                        actions.insert(action);
                    }
                }
            }
            if atoms.len() == before {
                break;
            }
        }

        debug!(
            "grounded {} reachable actions over {} atoms",
            actions.len(),
            atoms.len()
        );
        actions
            .into_iter()
            .sorted_by_cached_key(GroundAction::render)
            .collect()
    }

    /// Ground actions applicable in `state`, sorted by rendered name.
    pub fn applicable(&self, state: &State) -> Vec<GroundAction> {
        self.problem
            .actions()
            .values()
            .flat_map(|schema| self.instantiate(schema, state.atoms()))
            .filter(|a| state.is_applicable(a))
            .sorted_by_cached_key(GroundAction::render)
            .collect()
    }
}
