use alloc::{
    collections::{BTreeMap, BTreeSet},
    rc::Rc,
    vec::Vec,
};
use core::{fmt::Debug, marker::PhantomData};
use gazebo::dupe::Dupe;
use getset::Getters;
use itertools::Itertools;

use crate::{
    action::ActionSchema,
    entity::EntityStorage,
    predicate::{GroundAtom, GroundLiteral},
    sealed::Sealed,
    state::State,
    util::named::NamedStorage,
    Symbol,
};

/// What a plan has to achieve.
#[derive(Clone)]
pub enum Goal {
    /// Every literal has to hold in the final state.
    Literals(BTreeSet<GroundLiteral>),
    /// An arbitrary test over the final state. Only forward search can
    /// work with these.
    Test(Rc<dyn Fn(&State) -> bool>),
}

impl Goal {
    pub fn literals(literals: impl IntoIterator<Item = GroundLiteral>) -> Self {
        Self::Literals(literals.into_iter().collect())
    }

    pub fn atom(atom: GroundAtom) -> Self {
        Self::literals([GroundLiteral::pos(atom)])
    }

    pub fn test<F: Fn(&State) -> bool + 'static>(test: F) -> Self {
        Self::Test(Rc::new(test))
    }

    pub fn as_literals(&self) -> Option<&BTreeSet<GroundLiteral>> {
        match self {
            Self::Literals(literals) => Some(literals),
            Self::Test(_) => None,
        }
    }

    pub fn is_satisfied(&self, state: &State) -> bool {
        match self {
            Self::Literals(literals) => state.satisfies(literals),
            Self::Test(test) => test(state),
        }
    }
}

impl Debug for Goal {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Literals(literals) => {
                write!(f, "Goal({})", literals.iter().join(" & "))
            }
            Self::Test(_) => write!(f, "Goal(<test>)"),
        }
    }
}

/// A planning problem. Immutable once built; the action library is shared
/// between problems created from the same [Domain].
#[derive(Debug, Clone, Getters)]
pub struct Problem {
    #[getset(get = "pub")]
    name: Symbol,
    #[getset(get = "pub")]
    domain_name: Option<Symbol>,
    #[getset(get = "pub")]
    entities: EntityStorage,
    #[getset(get = "pub")]
    actions: Rc<NamedStorage<ActionSchema>>,
    #[getset(get = "pub")]
    init: State,
    #[getset(get = "pub")]
    goal: Goal,
}

impl Problem {
    pub fn goal_test(&self, state: &State) -> bool {
        self.goal.is_satisfied(state)
    }
}

/// The problem independent part of a PDDL description.
#[derive(Debug, Clone, Getters)]
pub struct Domain {
    #[getset(get = "pub")]
    name: Symbol,
    #[getset(get = "pub")]
    entities: EntityStorage,
    #[getset(get = "pub")]
    actions: Rc<NamedStorage<ActionSchema>>,
    /// Declared predicates with their argument types.
    #[getset(get = "pub")]
    predicates: BTreeMap<Symbol, Vec<Symbol>>,
}

impl Domain {
    pub fn new(
        name: Symbol,
        entities: EntityStorage,
        actions: NamedStorage<ActionSchema>,
        predicates: BTreeMap<Symbol, Vec<Symbol>>,
    ) -> Self {
        Self {
            name,
            entities,
            actions: Rc::new(actions),
            predicates,
        }
    }

    /// Starts a problem over this domain. Objects declared by the problem
    /// are added on top of the domain constants.
    pub fn new_problem(&self, name: &str) -> ProblemBuilder<Given, Missing, Missing> {
        ProblemBuilder {
            name: Symbol::new(name),
            domain_name: Some(self.name),
            entities: self.entities.clone(),
            actions: Some(self.actions.dupe()),
            init: None,
            goal: None,
            state: PhantomData,
        }
    }
}

#[allow(private_bounds)]
pub trait Part: Sealed {}

/// A part of the problem that still has to be supplied.
pub struct Missing;
/// A part of the problem that has been supplied.
pub struct Given;

impl Part for Missing {}
impl Part for Given {}
impl Sealed for Missing {}
impl Sealed for Given {}

/// Typestate builder for [Problem]. `build` is only available once actions,
/// initial state and goal are all given, in any order.
pub struct ProblemBuilder<A: Part, I: Part, G: Part> {
    name: Symbol,
    domain_name: Option<Symbol>,
    entities: EntityStorage,
    actions: Option<Rc<NamedStorage<ActionSchema>>>,
    init: Option<State>,
    goal: Option<Goal>,
    state: PhantomData<(A, I, G)>,
}

impl ProblemBuilder<Missing, Missing, Missing> {
    pub fn new(name: &str) -> Self {
        ProblemBuilder {
            name: Symbol::new(name),
            domain_name: None,
            entities: EntityStorage::default(),
            actions: None,
            init: None,
            goal: None,
            state: PhantomData,
        }
    }
}

impl<A: Part, I: Part, G: Part> ProblemBuilder<A, I, G> {
    fn into_state<A1: Part, I1: Part, G1: Part>(self) -> ProblemBuilder<A1, I1, G1> {
        ProblemBuilder {
            name: self.name,
            domain_name: self.domain_name,
            entities: self.entities,
            actions: self.actions,
            init: self.init,
            goal: self.goal,
            state: PhantomData,
        }
    }

    /// Declares typed objects. Parameters with a type are only bound to
    /// objects of that type or its subtypes.
    pub fn objects<F: FnOnce(&mut EntityStorage)>(mut self, add_objects: F) -> Self {
        add_objects(&mut self.entities);
        self
    }
}

impl<I: Part, G: Part> ProblemBuilder<Missing, I, G> {
    pub fn actions(
        mut self,
        actions: impl IntoIterator<Item = ActionSchema>,
    ) -> ProblemBuilder<Given, I, G> {
        self.actions = Some(Rc::new(actions.into_iter().collect()));
        self.into_state()
    }
}

impl<A: Part, G: Part> ProblemBuilder<A, Missing, G> {
    pub fn init(mut self, init: State) -> ProblemBuilder<A, Given, G> {
        self.init = Some(init);
        self.into_state()
    }
}

impl<A: Part, I: Part> ProblemBuilder<A, I, Missing> {
    pub fn goal(mut self, goal: Goal) -> ProblemBuilder<A, I, Given> {
        self.goal = Some(goal);
        self.into_state()
    }
}

impl ProblemBuilder<Given, Given, Given> {
    pub fn build(self) -> Problem {
        Problem {
            name: self.name,
            domain_name: self.domain_name,
            entities: self.entities,
            // The typestate guarantees all three are present.
            actions: self.actions.unwrap_or_default(),
            init: self.init.unwrap_or_default(),
            goal: self.goal.unwrap_or_else(|| Goal::literals([])),
        }
    }
}
