//! Compact text notation for atoms and literals.
//!
//! `Pred(a, b)` is an atom, `~` negates it and `&` joins literals into a
//! conjunction. In schema context a token starting with a lowercase letter
//! is a variable and anything else is a constant. In ground context every
//! token is a constant.

use alloc::{string::String, vec::Vec};
use nom::{
    branch::alt,
    bytes::complete::tag,
    character::complete::{alphanumeric1, char, multispace0},
    combinator::{all_consuming, map, opt, recognize},
    multi::{many0, separated_list0},
    sequence::{delimited, pair, terminated},
    IResult,
};

use crate::{
    error::ParseError,
    predicate::{Atom, GroundAtom, GroundLiteral, Literal, Term},
    Symbol,
};

#[derive(Debug, PartialEq, Eq)]
struct RawAtom<'a> {
    name: &'a str,
    args: Vec<&'a str>,
}

#[derive(Debug, PartialEq, Eq)]
struct RawLiteral<'a> {
    atom: RawAtom<'a>,
    positive: bool,
}

fn ws<'a, O, F>(inner: F) -> impl FnMut(&'a str) -> IResult<&'a str, O>
where
    F: FnMut(&'a str) -> IResult<&'a str, O>,
{
    delimited(multispace0, inner, multispace0)
}

fn name(input: &str) -> IResult<&str, &str> {
    recognize(pair(
        alphanumeric1,
        many0(alt((alphanumeric1, tag("-"), tag("_")))),
    ))(input)
}

fn atom(input: &str) -> IResult<&str, RawAtom<'_>> {
    map(
        pair(
            ws(name),
            opt(delimited(
                char('('),
                separated_list0(char(','), ws(name)),
                ws(char(')')),
            )),
        ),
        |(name, args)| RawAtom {
            name,
            args: args.unwrap_or_default(),
        },
    )(input)
}

fn literal(input: &str) -> IResult<&str, RawLiteral<'_>> {
    map(pair(opt(ws(char('~'))), atom), |(negated, atom)| {
        RawLiteral {
            atom,
            positive: negated.is_none(),
        }
    })(input)
}

fn conjunction(input: &str) -> IResult<&str, Vec<RawLiteral<'_>>> {
    terminated(separated_list0(char('&'), literal), multispace0)(input)
}

pub(crate) fn run<'a, O>(
    parser: impl FnMut(&'a str) -> IResult<&'a str, O>,
    input: &'a str,
) -> Result<O, ParseError> {
    all_consuming(parser)(input)
        .map(|(_, o)| o)
        .map_err(|e| match e {
            nom::Err::Error(e) | nom::Err::Failure(e) => {
                ParseError::Syntax(alloc::format!("unexpected input at `{}`", e.input))
            }
            nom::Err::Incomplete(_) => ParseError::Syntax(String::from("incomplete input")),
        })
}

/// Variables start with a lowercase letter.
pub fn is_variable_name(name: &str) -> bool {
    name.chars().next().is_some_and(char::is_lowercase)
}

impl RawAtom<'_> {
    fn schema(&self) -> Atom {
        Atom::new(
            self.name,
            self.args.iter().map(|&a| {
                if is_variable_name(a) {
                    Term::variable(a)
                } else {
                    Term::constant(a)
                }
            }),
        )
    }

    fn ground(&self) -> GroundAtom {
        GroundAtom::from_symbols(
            Symbol::new(self.name),
            self.args.iter().map(|&a| Symbol::new(a)),
        )
    }
}

pub fn parse_atom(input: &str) -> Result<Atom, ParseError> {
    run(atom, input).map(|a| a.schema())
}

pub fn parse_literal(input: &str) -> Result<Literal, ParseError> {
    run(literal, input).map(|l| Literal::new(l.atom.schema(), l.positive))
}

/// Parses a possibly empty `&`-separated conjunction of literals.
pub fn parse_literals(input: &str) -> Result<Vec<Literal>, ParseError> {
    Ok(run(conjunction, input)?
        .into_iter()
        .map(|l| Literal::new(l.atom.schema(), l.positive))
        .collect())
}

pub fn parse_ground_literals(input: &str) -> Result<Vec<GroundLiteral>, ParseError> {
    Ok(run(conjunction, input)?
        .into_iter()
        .map(|l| GroundLiteral::new(l.atom.ground(), l.positive))
        .collect())
}

/// Parses facts for an initial state. Negation is meaningless there.
pub fn parse_ground_atoms(input: &str) -> Result<Vec<GroundAtom>, ParseError> {
    run(conjunction, input)?
        .into_iter()
        .map(|l| {
            if l.positive {
                Ok(l.atom.ground())
            } else {
                Err(ParseError::Unsupported(alloc::format!(
                    "negated fact `~{}`",
                    l.atom.ground()
                )))
            }
        })
        .collect()
}
