use alloc::{collections::BTreeSet, string::String, vec::Vec};
use core::{fmt::Display, marker::PhantomData};
use getset::Getters;

use crate::{
    error::{BuildError, ParseError, PlanningError},
    expression::{is_variable_name, parse_atom, parse_literals},
    predicate::{write_application, Atom, GroundAtom, GroundLiteral, Literal, Term},
    sealed::Sealed,
    state::State,
    substitution::Substitution,
    util::named::Named,
    Symbol,
};

/// A positional parameter of an [ActionSchema].
///
/// Usually a variable, optionally restricted to objects of a type.
/// Constants are allowed too, for schemas written against fixed objects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Parameter {
    term: Term,
    r#type: Option<Symbol>,
}

impl Parameter {
    pub fn new(term: Term, r#type: Option<Symbol>) -> Self {
        Self { term, r#type }
    }

    pub fn term(&self) -> Term {
        self.term
    }

    pub fn r#type(&self) -> Option<Symbol> {
        self.r#type
    }

    pub fn variable(&self) -> Option<Symbol> {
        match self.term {
            Term::Var(v) => Some(v),
            Term::Const(_) => None,
        }
    }
}

impl From<Term> for Parameter {
    fn from(term: Term) -> Self {
        Self::new(term, None)
    }
}

impl From<&str> for Parameter {
    fn from(name: &str) -> Self {
        if is_variable_name(name) {
            Term::variable(name).into()
        } else {
            Term::constant(name).into()
        }
    }
}

/// `(name, type)` declares a typed variable.
impl From<(&str, &str)> for Parameter {
    fn from((name, r#type): (&str, &str)) -> Self {
        Self::new(Term::variable(name), Some(Symbol::new(r#type)))
    }
}

impl Display for Parameter {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.term)
    }
}

/// A parameterised action: named, with positional parameters and one set
/// each of polarity-tagged preconditions and effects.
#[derive(Debug, Clone, PartialEq, Eq, Getters)]
pub struct ActionSchema {
    #[getset(get = "pub")]
    name: Symbol,
    #[getset(get = "pub")]
    parameters: Vec<Parameter>,
    #[getset(get = "pub")]
    preconditions: BTreeSet<Literal>,
    #[getset(get = "pub")]
    effects: BTreeSet<Literal>,
}

impl Named for ActionSchema {
    fn name(&self) -> Symbol {
        self.name
    }
}

fn polarity(
    literals: &BTreeSet<Literal>,
    positive: bool,
) -> impl Iterator<Item = &Atom> + '_ {
    literals
        .iter()
        .filter(move |l| l.is_positive() == positive)
        .map(Literal::atom)
}

impl ActionSchema {
    pub(crate) fn try_new(
        name: Symbol,
        parameters: Vec<Parameter>,
        preconditions: BTreeSet<Literal>,
        effects: BTreeSet<Literal>,
    ) -> Result<Self, BuildError> {
        let mut declared = BTreeSet::new();
        for v in parameters.iter().filter_map(Parameter::variable) {
            if !declared.insert(v) {
                return Err(BuildError::DuplicateParameter {
                    parameter: v,
                    action: name,
                });
            }
        }

        if let Some(variable) = preconditions
            .iter()
            .chain(effects.iter())
            .flat_map(|l| l.atom().variables())
            .find(|v| !declared.contains(v))
        {
            return Err(BuildError::UnknownVariable {
                variable,
                action: name,
            });
        }

        if let Some(atom) =
            polarity(&effects, true).find(|a| polarity(&effects, false).any(|r| r == *a))
        {
            return Err(BuildError::ContradictoryEffects {
                action: name,
                atom: alloc::format!("{atom}"),
            });
        }

        Ok(Self {
            name,
            parameters,
            preconditions,
            effects,
        })
    }

    /// Builds a schema from the text notation, e.g.
    /// `from_expr("Fly(from, to)", "At(from) & Connected(from, to)", "~At(from) & At(to)")`.
    pub fn from_expr(head: &str, precondition: &str, effect: &str) -> Result<Self, ParseError> {
        let head = parse_atom(head)?;
        let parameters = head.args().iter().copied().map(Parameter::from).collect();
        let preconditions = parse_literals(precondition)?.into_iter().collect();
        let effects = parse_literals(effect)?.into_iter().collect();
        Ok(Self::try_new(*head.predicate(), parameters, preconditions, effects)?)
    }

    pub fn precond_pos(&self) -> impl Iterator<Item = &Atom> + '_ {
        polarity(&self.preconditions, true)
    }

    pub fn precond_neg(&self) -> impl Iterator<Item = &Atom> + '_ {
        polarity(&self.preconditions, false)
    }

    pub fn effect_add(&self) -> impl Iterator<Item = &Atom> + '_ {
        polarity(&self.effects, true)
    }

    pub fn effect_rem(&self) -> impl Iterator<Item = &Atom> + '_ {
        polarity(&self.effects, false)
    }

    pub fn variables(&self) -> impl Iterator<Item = Symbol> + '_ {
        self.parameters.iter().filter_map(Parameter::variable)
    }

    fn unbound(&self, variable: Symbol) -> PlanningError {
        PlanningError::UnboundVariable {
            variable,
            action: self.name,
        }
    }

    fn ground_args(&self, binding: &Substitution) -> Result<Vec<Symbol>, PlanningError> {
        self.parameters
            .iter()
            .map(|p| {
                binding
                    .resolve(&p.term)
                    .ok_or_else(|| self.unbound(p.term.symbol()))
            })
            .collect()
    }

    fn ground_literals(
        &self,
        literals: &BTreeSet<Literal>,
        binding: &Substitution,
    ) -> Result<BTreeSet<GroundLiteral>, PlanningError> {
        literals
            .iter()
            .map(|l| l.ground(binding).map_err(|v| self.unbound(v)))
            .collect()
    }

    /// Applies `binding` to every parameter, precondition and effect.
    ///
    /// Fails with [PlanningError::UnboundVariable] if a parameter is left
    /// free, and with [PlanningError::ContradictoryEffects] if the binding
    /// makes the action add and delete the same atom.
    pub fn ground(&self, binding: &Substitution) -> Result<GroundAction, PlanningError> {
        GroundAction::new(
            self.name,
            self.ground_args(binding)?,
            self.ground_literals(&self.preconditions, binding)?,
            self.ground_literals(&self.effects, binding)?,
        )
    }

    /// Whether the action, under `binding`, may be executed in `state`.
    pub fn is_applicable(
        &self,
        state: &State,
        binding: &Substitution,
    ) -> Result<bool, PlanningError> {
        self.ground_args(binding)?;
        Ok(self
            .ground_literals(&self.preconditions, binding)?
            .iter()
            .all(|l| state.holds(l)))
    }

    pub fn apply(&self, state: &State, binding: &Substitution) -> Result<State, PlanningError> {
        state.apply(&self.ground(binding)?)
    }

    /// The substitution that turns this schema into an action with the given
    /// arguments, if there is one.
    pub fn binding_for(&self, args: &[Symbol]) -> Option<Substitution> {
        if args.len() != self.parameters.len() {
            return None;
        }
        let mut binding = Substitution::default();
        for (p, &value) in self.parameters.iter().zip(args) {
            match p.term {
                Term::Const(c) if c == value => {}
                Term::Const(_) => return None,
                Term::Var(v) => match binding.get(&v) {
                    Some(bound) if bound != value => return None,
                    Some(_) => {}
                    None => binding = binding.bind_symbol(v, value),
                },
            }
        }
        Some(binding)
    }
}

impl Display for ActionSchema {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write_application(f, self.name, &self.parameters)
    }
}

#[allow(private_bounds)]
pub trait ActionBuilderState: Sealed {}

pub struct New;
pub struct HasName;
pub struct HasParameters;
pub struct HasPrecondition;
pub struct HasEffect;

impl ActionBuilderState for New {}
impl ActionBuilderState for HasName {}
impl ActionBuilderState for HasParameters {}
impl ActionBuilderState for HasPrecondition {}
impl ActionBuilderState for HasEffect {}

impl Sealed for New {}
impl Sealed for HasName {}
impl Sealed for HasParameters {}
impl Sealed for HasPrecondition {}
impl Sealed for HasEffect {}

pub struct ActionBuilder<S: ActionBuilderState> {
    name: Symbol,
    parameters: Vec<Parameter>,
    preconditions: BTreeSet<Literal>,
    effects: BTreeSet<Literal>,
    state: PhantomData<S>,
}

impl<S: ActionBuilderState> ActionBuilder<S> {
    fn into_state<T: ActionBuilderState>(self) -> ActionBuilder<T> {
        ActionBuilder {
            name: self.name,
            parameters: self.parameters,
            preconditions: self.preconditions,
            effects: self.effects,
            state: PhantomData,
        }
    }
}

impl ActionBuilder<New> {
    #[allow(clippy::new_ret_no_self)]
    pub fn new(name: &str) -> ActionBuilder<HasName> {
        ActionBuilder {
            name: Symbol::new(name),
            parameters: Vec::new(),
            preconditions: BTreeSet::new(),
            effects: BTreeSet::new(),
            state: PhantomData,
        }
    }
}

impl ActionBuilder<HasName> {
    pub fn parameters<P: Into<Parameter>>(
        mut self,
        parameters: impl IntoIterator<Item = P>,
    ) -> ActionBuilder<HasParameters> {
        self.parameters = parameters.into_iter().map(Into::into).collect();
        self.into_state()
    }
}

impl ActionBuilder<HasParameters> {
    pub fn precondition<F, I>(mut self, precondition: F) -> ActionBuilder<HasPrecondition>
    where
        F: FnOnce(&[Parameter]) -> I,
        I: IntoIterator<Item = Literal>,
    {
        self.preconditions = precondition(&self.parameters).into_iter().collect();
        self.into_state()
    }
}

impl ActionBuilder<HasPrecondition> {
    pub fn effect<F, I>(mut self, effect: F) -> ActionBuilder<HasEffect>
    where
        F: FnOnce(&[Parameter]) -> I,
        I: IntoIterator<Item = Literal>,
    {
        self.effects = effect(&self.parameters).into_iter().collect();
        self.into_state()
    }
}

impl ActionBuilder<HasEffect> {
    pub fn build(self) -> Result<ActionSchema, BuildError> {
        ActionSchema::try_new(self.name, self.parameters, self.preconditions, self.effects)
    }
}

/// A fully instantiated action, as it appears in plans.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Getters)]
pub struct GroundAction {
    #[getset(get = "pub")]
    name: Symbol,
    #[getset(get = "pub")]
    args: Vec<Symbol>,
    #[getset(get = "pub")]
    preconditions: BTreeSet<GroundLiteral>,
    #[getset(get = "pub")]
    effects: BTreeSet<GroundLiteral>,
}

impl GroundAction {
    pub fn new(
        name: Symbol,
        args: Vec<Symbol>,
        preconditions: BTreeSet<GroundLiteral>,
        effects: BTreeSet<GroundLiteral>,
    ) -> Result<Self, PlanningError> {
        let action = Self {
            name,
            args,
            preconditions,
            effects,
        };
        if action
            .effect_add()
            .any(|a| action.effects.contains(&GroundLiteral::neg(a.clone())))
        {
            return Err(PlanningError::ContradictoryEffects {
                action: action.render(),
            });
        }
        Ok(action)
    }

    pub fn precond_pos(&self) -> impl Iterator<Item = &GroundAtom> + '_ {
        self.preconditions
            .iter()
            .filter(|l| l.is_positive())
            .map(GroundLiteral::atom)
    }

    pub fn precond_neg(&self) -> impl Iterator<Item = &GroundAtom> + '_ {
        self.preconditions
            .iter()
            .filter(|l| !l.is_positive())
            .map(GroundLiteral::atom)
    }

    pub fn effect_add(&self) -> impl Iterator<Item = &GroundAtom> + '_ {
        self.effects
            .iter()
            .filter(|l| l.is_positive())
            .map(GroundLiteral::atom)
    }

    pub fn effect_rem(&self) -> impl Iterator<Item = &GroundAtom> + '_ {
        self.effects
            .iter()
            .filter(|l| !l.is_positive())
            .map(GroundLiteral::atom)
    }

    /// Rendered name, e.g. `Fly(Sibiu, Bucharest)`. Used as the stable sort key.
    pub fn render(&self) -> String {
        alloc::format!("{self}")
    }
}

impl Display for GroundAction {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write_application(f, self.name, &self.args)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(term: Term) -> Atom {
        Atom::new("At", [term])
    }

    fn drive() -> ActionSchema {
        ActionBuilder::new("Drive")
            .parameters(["from", "to"])
            .precondition(|p| [Literal::pos(at(p[0].term()))])
            .effect(|p| [Literal::neg(at(p[0].term())), Literal::pos(at(p[1].term()))])
            .build()
            .unwrap()
    }

    #[test]
    fn test_build_action() {
        let action = drive();
        assert_eq!(action.to_string(), "Drive(from, to)");
        assert_eq!(action.precond_pos().count(), 1);
        assert_eq!(action.precond_neg().count(), 0);
        assert_eq!(action.effect_add().collect::<Vec<_>>(), vec![&at(Term::variable("to"))]);
        assert_eq!(action.effect_rem().collect::<Vec<_>>(), vec![&at(Term::variable("from"))]);
        assert_eq!(
            action.variables().collect::<Vec<_>>(),
            vec![Symbol::new("from"), Symbol::new("to")]
        );
    }

    #[test]
    fn test_build_errors() {
        let unknown = ActionBuilder::new("Teleport")
            .parameters(["to"])
            .precondition(|_| [])
            .effect(|_| [Literal::pos(at(Term::variable("somewhere")))])
            .build();
        assert_eq!(
            unknown,
            Err(BuildError::UnknownVariable {
                variable: Symbol::new("somewhere"),
                action: Symbol::new("Teleport")
            })
        );

        let duplicate = ActionBuilder::new("Stay")
            .parameters(["x", "x"])
            .precondition(|_| [])
            .effect(|_| [])
            .build();
        assert!(matches!(
            duplicate,
            Err(BuildError::DuplicateParameter { .. })
        ));

        let contradictory = ActionBuilder::new("Flicker")
            .parameters(["x"])
            .precondition(|_| [])
            .effect(|p| [Literal::pos(at(p[0].term())), Literal::neg(at(p[0].term()))])
            .build();
        assert_eq!(
            contradictory,
            Err(BuildError::ContradictoryEffects {
                action: Symbol::new("Flicker"),
                atom: "At(x)".into()
            })
        );
    }

    #[test]
    fn test_from_expr() {
        let fly = ActionSchema::from_expr(
            "Fly(p, from, to)",
            "At(p, from) & Plane(p) & Airport(to)",
            "~At(p, from) & At(p, to)",
        )
        .unwrap();
        assert_eq!(fly.parameters().len(), 3);
        assert_eq!(fly.precond_pos().count(), 3);
        assert_eq!(fly.effects().len(), 2);

        let err = ActionSchema::from_expr("Fly(p)", "At(p, from)", "");
        assert!(matches!(
            err,
            Err(ParseError::Build(BuildError::UnknownVariable { .. }))
        ));
    }

    #[test]
    fn test_ground_and_apply() {
        let action = drive();
        let state = State::from_iter([GroundAtom::new("At", ["Home"])]);

        let partial = Substitution::default().bind("from", "Home");
        assert_eq!(
            action.is_applicable(&state, &partial),
            Err(PlanningError::UnboundVariable {
                variable: Symbol::new("to"),
                action: Symbol::new("Drive")
            })
        );

        let binding = partial.bind("to", "Work");
        assert_eq!(action.is_applicable(&state, &binding), Ok(true));
        let next = action.apply(&state, &binding).unwrap();
        assert!(next.contains(&GroundAtom::new("At", ["Work"])));
        assert!(!next.contains(&GroundAtom::new("At", ["Home"])));
        // The original state is untouched
        assert!(state.contains(&GroundAtom::new("At", ["Home"])));

        let away = Substitution::default().bind("from", "Work").bind("to", "Home");
        assert_eq!(action.is_applicable(&state, &away), Ok(false));
        assert!(matches!(
            action.apply(&state, &away),
            Err(PlanningError::InapplicableAction { .. })
        ));

        let ground = action.ground(&binding).unwrap();
        assert_eq!(ground.to_string(), "Drive(Home, Work)");
        assert_eq!(action.binding_for(ground.args()), Some(binding));
    }

    #[test]
    fn test_contradictory_binding() {
        let action = drive();
        let same = Substitution::default().bind("from", "Home").bind("to", "Home");
        assert_eq!(
            action.ground(&same),
            Err(PlanningError::ContradictoryEffects {
                action: "Drive(Home, Home)".into()
            })
        );
    }

    #[test]
    fn test_negative_precondition() {
        let enter = ActionSchema::from_expr("Enter(r)", "~Locked(r)", "In(r)").unwrap();
        let binding = Substitution::default().bind("r", "Kitchen");

        let open = State::default();
        let locked = State::from_iter([GroundAtom::new("Locked", ["Kitchen"])]);
        assert_eq!(enter.is_applicable(&open, &binding), Ok(true));
        assert_eq!(enter.is_applicable(&locked, &binding), Ok(false));
    }
}
