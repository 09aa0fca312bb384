//! PDDL front end built on the `pddl` crate.
//!
//! Only the STRIPS fragment is accepted: `:strips`, `:typing` and
//! `:negative-preconditions`, with preconditions and goals that are
//! conjunctions of literals. Everything else is reported as
//! [ParseError::Unsupported].
//!
//! Negated action preconditions need `:negative-preconditions`. Negated
//! goals in problems are accepted either way, as the goal is tested against
//! a closed-world state.

use alloc::{
    collections::{BTreeMap, BTreeSet},
    format,
    string::{String, ToString},
    vec::Vec,
};
use core::ops::Deref;
use log::debug;
use pddl::{
    AtomicFormula, CEffect, GoalDefinition, Name, PEffect, Parser, PreconditionGoalDefinition,
    PreferenceGD, PrimitiveType, Requirement, StructureDef, Term as PddlTerm, Type, TypedList,
    TypedNames, Variable,
};

use crate::{
    action::{ActionSchema, Parameter},
    entity::EntityStorage,
    error::{BuildError, ParseError},
    predicate::{Atom, GroundAtom, GroundLiteral, Literal, Term},
    problem::{Domain, Goal, Problem},
    state::State,
    util::named::NamedStorage,
    Symbol,
};

mod plan;

pub use plan::parse_plan;

type Predicates = BTreeMap<Symbol, Vec<Symbol>>;

fn unsupported(feature: &str) -> ParseError {
    ParseError::Unsupported(feature.to_string())
}

fn check_requirements<'a>(
    requirements: impl IntoIterator<Item = &'a Requirement>,
) -> Result<(), ParseError> {
    for requirement in requirements {
        use Requirement::*;
        match requirement {
            Strips | Typing | NegativePreconditions => {}
            r => return Err(ParseError::Unsupported(format!("requirement {:?}", r))),
        }
    }
    Ok(())
}

fn primitive(r#type: &Type) -> Result<&PrimitiveType, ParseError> {
    match r#type {
        Type::Exactly(r#type) => Ok(r#type),
        Type::EitherOf(_) => Err(unsupported("`either` types")),
    }
}

fn known_type(entities: &EntityStorage, r#type: &Type) -> Result<Symbol, ParseError> {
    let primitive = primitive(r#type)?;
    Symbol::lookup(primitive)
        .filter(|symbol| entities.has_type(symbol))
        .ok_or_else(|| ParseError::UnknownType(primitive.to_string()))
}

fn add_objects(names: &TypedNames, entities: &mut EntityStorage) -> Result<(), ParseError> {
    for typed in names.iter() {
        let r#type = known_type(entities, typed.type_())?;
        entities.get_or_create_object(typed.value(), r#type)?;
    }
    Ok(())
}

fn object(entities: &EntityStorage, name: &str) -> Result<Symbol, ParseError> {
    Symbol::lookup(name)
        .filter(|object| entities.type_of(object).is_some())
        .ok_or_else(|| ParseError::UnknownObject(name.to_string()))
}

/// Looks up a declared predicate and checks how many arguments it is given.
fn declared(predicates: &Predicates, name: &str, found: usize) -> Result<Symbol, ParseError> {
    let (predicate, expected) = Symbol::lookup(name)
        .and_then(|p| predicates.get(&p).map(|types| (p, types.len())))
        .ok_or_else(|| ParseError::UnknownPredicate(name.to_string()))?;
    if expected != found {
        return Err(BuildError::ArityMismatch {
            predicate,
            expected,
            found,
        }
        .into());
    }
    Ok(predicate)
}

fn variable_name(variable: &Variable) -> &str {
    variable.deref().deref()
}

fn parameters(
    variables: &TypedList<Variable>,
    entities: &EntityStorage,
) -> Result<Vec<Parameter>, ParseError> {
    variables
        .iter()
        .map(|v| {
            let r#type = known_type(entities, v.type_())?;
            Ok(Parameter::new(
                Term::variable(variable_name(v.value())),
                (r#type != EntityStorage::root()).then_some(r#type),
            ))
        })
        .collect()
}

type Literals<'a> = Vec<(bool, &'a AtomicFormula<PddlTerm>)>;

/// Flattens a conjunction of literals into `(positive, atom)` pairs.
fn conjunction<'a>(
    goal: &'a GoalDefinition,
    positive: bool,
    literals: &mut Literals<'a>,
) -> Result<(), ParseError> {
    match goal {
        GoalDefinition::AtomicFormula(formula) => literals.push((positive, formula)),
        GoalDefinition::And(goals) if positive => {
            for g in goals.iter() {
                conjunction(g, true, literals)?;
            }
        }
        GoalDefinition::Not(goal) if positive => conjunction(goal, false, literals)?,
        GoalDefinition::Not(_) | GoalDefinition::And(_) => {
            return Err(unsupported("negation of anything but an atom"))
        }
        GoalDefinition::Or(_) => return Err(unsupported("disjunction")),
        GoalDefinition::Imply(_, _) => return Err(unsupported("implication")),
        GoalDefinition::Exists(_, _) | GoalDefinition::ForAll(_, _) => {
            return Err(unsupported("quantifiers"))
        }
        GoalDefinition::FComp(_) => return Err(unsupported("numeric comparisons")),
        _ => return Err(unsupported("goal expression")),
    }
    Ok(())
}

fn goal_literals<'a>(
    definitions: impl IntoIterator<Item = &'a PreconditionGoalDefinition>,
) -> Result<Literals<'a>, ParseError> {
    let mut literals = Vec::new();
    for definition in definitions {
        match definition {
            PreconditionGoalDefinition::Preference(PreferenceGD::Goal(goal)) => {
                conjunction(goal, true, &mut literals)?
            }
            PreconditionGoalDefinition::Preference(PreferenceGD::Preference(_)) => {
                return Err(unsupported("preferences"))
            }
            PreconditionGoalDefinition::Forall(_, _) => return Err(unsupported("quantifiers")),
        }
    }
    Ok(literals)
}

/// An atom inside an action, where `?x` refers to a parameter.
fn schema_atom(
    formula: &AtomicFormula<PddlTerm>,
    parameters: &[Parameter],
    entities: &EntityStorage,
    predicates: &Predicates,
) -> Result<Atom, ParseError> {
    let AtomicFormula::Predicate(p) = formula else {
        return Err(unsupported("equality"));
    };
    let predicate = declared(predicates, p.predicate(), p.values().len())?;
    let args = p
        .values()
        .iter()
        .map(|v| match v {
            PddlTerm::Name(name) => object(entities, name).map(Term::Const),
            PddlTerm::Variable(var) => {
                let term = Term::variable(variable_name(var));
                if parameters.iter().any(|p| p.term() == term) {
                    Ok(term)
                } else {
                    Err(ParseError::UnknownParameter(format!(
                        "?{}",
                        variable_name(var)
                    )))
                }
            }
            PddlTerm::Function(_) => Err(unsupported("functions")),
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Atom::from_symbol(predicate, args))
}

/// An atom of a problem goal. Some PDDL dialects write objects in goals with
/// variable syntax, so `?x` is read as the object `x`.
fn goal_atom(
    formula: &AtomicFormula<PddlTerm>,
    entities: &EntityStorage,
    predicates: &Predicates,
) -> Result<GroundAtom, ParseError> {
    let AtomicFormula::Predicate(p) = formula else {
        return Err(unsupported("equality"));
    };
    let predicate = declared(predicates, p.predicate(), p.values().len())?;
    let args = p
        .values()
        .iter()
        .map(|v| match v {
            PddlTerm::Name(name) => object(entities, name),
            PddlTerm::Variable(var) => object(entities, variable_name(var)),
            PddlTerm::Function(_) => Err(unsupported("functions")),
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(GroundAtom::from_symbols(predicate, args))
}

fn init_atom(
    formula: &AtomicFormula<Name>,
    entities: &EntityStorage,
    predicates: &Predicates,
) -> Result<GroundAtom, ParseError> {
    let AtomicFormula::Predicate(p) = formula else {
        return Err(unsupported("equality"));
    };
    let predicate = declared(predicates, p.predicate(), p.values().len())?;
    let args = p
        .values()
        .iter()
        .map(|o| object(entities, o))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(GroundAtom::from_symbols(predicate, args))
}

pub fn parse_domain(definition: &str) -> Result<Domain, ParseError> {
    let domain =
        pddl::Domain::from_str(definition).map_err(|e| ParseError::Syntax(e.to_string()))?;

    if !domain.extends().is_empty() {
        return Err(unsupported("extending domains"));
    }
    check_requirements(domain.requirements().iter())?;
    let negative_preconditions = domain
        .requirements()
        .iter()
        .any(|r| matches!(r, Requirement::NegativePreconditions));

    let mut entities = EntityStorage::default();
    for typed in domain.types().iter() {
        let sub_type = entities.get_or_create_type(typed.value());
        let super_type = entities.get_or_create_type(primitive(typed.type_())?);
        if super_type != EntityStorage::root() && entities.super_type(sub_type) != Some(super_type)
        {
            entities.create_inheritance(sub_type, super_type)?;
        }
    }
    add_objects(domain.constants(), &mut entities)?;

    let mut predicates = Predicates::new();
    for p in domain.predicates().iter() {
        let types = p
            .variables()
            .iter()
            .map(|v| known_type(&entities, v.type_()))
            .collect::<Result<Vec<_>, _>>()?;
        predicates.insert(Symbol::new(p.predicate()), types);
    }

    let mut actions = NamedStorage::default();
    for structure in domain.structure().iter() {
        let action = match structure {
            StructureDef::Action(action) => action,
            StructureDef::DurativeAction(_) => return Err(unsupported("durative actions")),
            StructureDef::Derived(_) => return Err(unsupported("derived predicates")),
        };

        let parameters = parameters(action.parameters(), &entities)?;
        let preconditions = goal_literals(action.precondition().iter())?
            .into_iter()
            .map(|(positive, formula)| {
                if !positive && !negative_preconditions {
                    return Err(unsupported(
                        "negative preconditions without :negative-preconditions",
                    ));
                }
                schema_atom(formula, &parameters, &entities, &predicates)
                    .map(|atom| Literal::new(atom, positive))
            })
            .collect::<Result<BTreeSet<_>, _>>()?;

        let mut effects = BTreeSet::new();
        if let Some(list) = action.effect().as_ref() {
            for effect in list.iter() {
                let (positive, formula) = match effect {
                    CEffect::Effect(PEffect::AtomicFormula(formula)) => (true, formula),
                    CEffect::Effect(PEffect::NotAtomicFormula(formula)) => (false, formula),
                    CEffect::Effect(_) => return Err(unsupported("fluent assignments")),
                    CEffect::Forall(_) | CEffect::When(_) => {
                        return Err(unsupported("conditional effects"))
                    }
                };
                let atom = schema_atom(formula, &parameters, &entities, &predicates)?;
                effects.insert(Literal::new(atom, positive));
            }
        }

        actions.insert(ActionSchema::try_new(
            Symbol::new(action.symbol()),
            parameters,
            preconditions,
            effects,
        )?);
    }

    debug!(
        "parsed domain {} with {} actions and {} predicates",
        domain.name().to_string(),
        actions.len(),
        predicates.len()
    );
    Ok(Domain::new(
        Symbol::new(domain.name()),
        entities,
        actions,
        predicates,
    ))
}

pub fn parse_problem(definition: &str, domain: &Domain) -> Result<Problem, ParseError> {
    let problem =
        pddl::Problem::from_str(definition).map_err(|e| ParseError::Syntax(e.to_string()))?;

    if Symbol::new(problem.domain()) != *domain.name() {
        return Err(ParseError::WrongDomain {
            expected: domain.name().to_string(),
            found: problem.domain().to_string(),
        });
    }
    if !problem.constraints().is_empty() {
        return Err(unsupported("constraints"));
    }
    if problem.metric_spec().is_some() {
        return Err(unsupported("metrics"));
    }
    if problem.length_spec().is_some() {
        return Err(unsupported("length specifications"));
    }
    check_requirements(problem.requirements().iter())?;

    let mut entities = domain.entities().clone();
    add_objects(problem.objects(), &mut entities)?;

    let init = problem
        .init()
        .iter()
        .map(|element| match element {
            pddl::InitElement::Literal(pddl::Literal::AtomicFormula(formula)) => {
                init_atom(formula, &entities, domain.predicates())
            }
            pddl::InitElement::Literal(pddl::Literal::NotAtomicFormula(_)) => {
                Err(unsupported("negative initial facts"))
            }
            pddl::InitElement::At(_, _) => Err(unsupported("timed initial literals")),
            _ => Err(unsupported("fluents in the initial state")),
        })
        .collect::<Result<State, _>>()?;

    let goal = goal_literals(problem.goals().iter())?
        .into_iter()
        .map(|(positive, formula)| {
            goal_atom(formula, &entities, domain.predicates())
                .map(|atom| GroundLiteral::new(atom, positive))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let name: String = problem.name().to_string();
    debug!(
        "parsed problem {} with {} objects, {} initial facts and {} goals",
        name,
        entities.objects().count(),
        init.len(),
        goal.len()
    );
    Ok(domain
        .new_problem(&name)
        .objects(move |e| *e = entities)
        .init(init)
        .goal(Goal::literals(goal))
        .build())
}
