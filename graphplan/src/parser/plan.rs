use alloc::{
    collections::BTreeSet,
    format,
    string::ToString,
    vec::Vec,
};
use core::ops::Deref;
use itertools::Itertools;
use nom::{
    branch::alt,
    bytes::complete::tag,
    character::complete::{alpha1, alphanumeric1, char, multispace0, multispace1},
    combinator::{map, opt, recognize},
    multi::{many0, separated_list0, separated_list1},
    sequence::{delimited, pair, preceded},
    IResult,
};

use crate::{
    error::ParseError, expression::run, grounding::Grounder, problem::Problem, solver::Plan,
    Symbol,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Name<'a>(&'a str);

impl Deref for Name<'_> {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        self.0
    }
}

#[derive(Debug, PartialEq, Eq)]
struct Step<'a>(Name<'a>, Vec<Name<'a>>);

fn brackets<'a, O, F>(inner: F) -> impl FnMut(&'a str) -> IResult<&'a str, O>
where
    F: FnMut(&'a str) -> IResult<&'a str, O>,
{
    delimited(pair(char('('), multispace0), inner, pair(multispace0, char(')')))
}

fn name(input: &str) -> IResult<&str, Name<'_>> {
    map(
        recognize(pair(
            alpha1,
            many0(alt((alphanumeric1, tag("-"), tag("_")))),
        )),
        Name,
    )(input)
}

/// `(move r1 roomA roomB)`
fn pddl_step(input: &str) -> IResult<&str, Step<'_>> {
    map(
        brackets(separated_list1(multispace1, name)),
        |mut parts: Vec<Name<'_>>| {
            // separated_list1 yields at least one name
            let name = parts.remove(0);
            Step(name, parts)
        },
    )(input)
}

/// `Move(r1, roomA, roomB)`, as plans are displayed.
fn applied_step(input: &str) -> IResult<&str, Step<'_>> {
    map(
        pair(
            name,
            opt(delimited(
                char('('),
                separated_list0(char(','), delimited(multispace0, name, multispace0)),
                char(')'),
            )),
        ),
        |(name, args)| Step(name, args.unwrap_or_default()),
    )(input)
}

fn plan(input: &str) -> IResult<&str, Vec<Step<'_>>> {
    delimited(
        multispace0,
        brackets(many0(preceded(multispace0, alt((pddl_step, applied_step))))),
        multispace0,
    )(input)
}

/// Reads a plan written either as `((move r1 roomA roomB) ...)` or in the
/// form [Plan] is displayed in, and instantiates its steps against the
/// action schemas of `problem`.
pub fn parse_plan(definition: &str, problem: &Problem) -> Result<Plan, ParseError> {
    let steps = run(plan, definition)?;
    let known: BTreeSet<Symbol> = Grounder::new(problem).constants().iter().copied().collect();

    steps
        .into_iter()
        .map(|Step(name, args)| {
            let schema = problem
                .actions()
                .get(&name)
                .ok_or_else(|| ParseError::UnknownAction(name.to_string()))?;
            let args = args
                .iter()
                .map(|arg| {
                    Symbol::lookup(arg)
                        .filter(|object| known.contains(object))
                        .ok_or_else(|| ParseError::UnknownObject(arg.to_string()))
                })
                .collect::<Result<Vec<_>, _>>()?;

            let invalid =
                || ParseError::InvalidStep(format!("{}({})", name.0, args.iter().join(", ")));
            let binding = schema.binding_for(&args).ok_or_else(invalid)?;
            schema.ground(&binding).map_err(|_| invalid())
        })
        .collect::<Result<Vec<_>, _>>()
        .map(Plan::sequential)
}
