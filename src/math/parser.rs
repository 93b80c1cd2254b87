//! Linear-notation expression parser.
//!
//! Recursive descent over `nom` combinators, lowest precedence first:
//! equation, sum, term (with implicit multiplication), unary, power, primary.

use crate::math::expr::Expr;
use nom::{
    branch::alt,
    bytes::complete::tag,
    character::complete::{alpha1, alphanumeric0, char, digit0, digit1, multispace0, satisfy},
    combinator::{all_consuming, map, map_res, not, opt, peek, recognize, verify},
    multi::{many0, separated_list1},
    sequence::{delimited, pair, preceded, terminated},
    IResult,
};

/// Functions that take a parenthesized argument list.
const FUNCTIONS: &[&str] = &[
    "sin", "cos", "tan", "asin", "acos", "atan", "sinh", "cosh", "tanh", "sqrt", "exp", "log",
    "ln", "abs",
];

const INTEGRAL_NAMES: &[&str] = &["integral", "Integral"];
const SUM_NAMES: &[&str] = &["sum", "Sum"];
const LIMIT_NAMES: &[&str] = &["limit", "Limit"];

/// Error returned when the input is not a well-formed expression.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("could not parse expression '{input}'")]
pub struct ParseError {
    pub input: String,
}

/// Deepest nesting accepted. Every level costs several stack frames in the
/// recursive descent, so deeper input is refused before parsing starts.
pub const MAX_NESTING: usize = 64;

/// Parse a complete expression. Surrounding whitespace is ignored; anything
/// left unconsumed is an error.
pub fn parse(input: &str) -> Result<Expr, ParseError> {
    if nesting_depth(input) > MAX_NESTING {
        return Err(ParseError {
            input: input.to_string(),
        });
    }

    all_consuming(delimited(multispace0, equation, multispace0))(input)
        .map(|(_, expr)| expr)
        .map_err(|_| ParseError {
            input: input.to_string(),
        })
}

/// Upper bound on the recursion depth needed to parse `input`: open
/// parentheses, plus the prefix signs and `**` operators chained at each
/// parenthesis level. Binary operators end a chain.
fn nesting_depth(input: &str) -> usize {
    let mut outer: Vec<usize> = Vec::new();
    let mut current = 0usize;
    let mut chained = 0usize;
    let mut max = 0usize;
    let mut operand_expected = true;

    let mut chars = input.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '(' => {
                outer.push(current);
                current = 0;
                operand_expected = true;
            }
            ')' => {
                if let Some(saved) = outer.pop() {
                    chained -= current;
                    current = saved;
                }
                operand_expected = false;
            }
            '*' if chars.peek() == Some(&'*') => {
                chars.next();
                current += 1;
                chained += 1;
                operand_expected = true;
            }
            '+' | '-' if operand_expected => {
                current += 1;
                chained += 1;
            }
            '+' | '-' | '*' | '/' | ',' | '=' => {
                chained -= current;
                current = 0;
                operand_expected = true;
            }
            c if c.is_whitespace() => {}
            _ => operand_expected = false,
        }
        max = max.max(outer.len() + chained);
    }
    max
}

/// Wraps a parser so it skips leading whitespace.
fn ws<'a, O, F>(inner: F) -> impl FnMut(&'a str) -> IResult<&'a str, O>
where
    F: FnMut(&'a str) -> IResult<&'a str, O>,
{
    preceded(multispace0, inner)
}

fn equation(input: &str) -> IResult<&str, Expr> {
    let (input, lhs) = sum(input)?;
    let (input, rhs) = opt(preceded(ws(char('=')), sum))(input)?;
    Ok((
        input,
        match rhs {
            Some(rhs) => Expr::Equation(Box::new(lhs), Box::new(rhs)),
            None => lhs,
        },
    ))
}

fn sum(input: &str) -> IResult<&str, Expr> {
    let (input, first) = term(input)?;
    let (input, rest) = many0(pair(ws(alt((char('+'), char('-')))), term))(input)?;
    Ok((
        input,
        rest.into_iter().fold(first, |acc, (op, rhs)| match op {
            '+' => Expr::add(acc, rhs),
            _ => Expr::sub(acc, rhs),
        }),
    ))
}

#[derive(Clone, Copy)]
enum MulOp {
    Times,
    Divide,
}

fn term(input: &str) -> IResult<&str, Expr> {
    let (input, first) = unary(input)?;
    let (input, rest) = many0(alt((
        pair(
            map(ws(terminated(char('*'), not(char('*')))), |_| MulOp::Times),
            unary,
        ),
        pair(map(ws(char('/')), |_| MulOp::Divide), unary),
        // implicit multiplication: an unsigned operand directly follows
        pair(map(peek(ws(primary_start)), |_| MulOp::Times), power),
    )))(input)?;
    Ok((
        input,
        rest.into_iter().fold(first, |acc, (op, rhs)| match op {
            MulOp::Times => Expr::mul(acc, rhs),
            MulOp::Divide => Expr::div(acc, rhs),
        }),
    ))
}

fn primary_start(input: &str) -> IResult<&str, char> {
    alt((
        satisfy(|c| c.is_ascii_alphanumeric()),
        char('('),
        char('.'),
    ))(input)
}

fn unary(input: &str) -> IResult<&str, Expr> {
    alt((
        map(preceded(ws(char('-')), unary), |e| Expr::Neg(Box::new(e))),
        preceded(ws(char('+')), unary),
        power,
    ))(input)
}

fn power(input: &str) -> IResult<&str, Expr> {
    let (input, base) = primary(input)?;
    let (input, exp) = opt(preceded(ws(tag("**")), unary))(input)?;
    Ok((
        input,
        match exp {
            Some(exp) => Expr::pow(base, exp),
            None => base,
        },
    ))
}

fn primary(input: &str) -> IResult<&str, Expr> {
    ws(alt((
        number,
        call,
        symbol,
        delimited(char('('), sum, ws(char(')'))),
    )))(input)
}

fn number(input: &str) -> IResult<&str, Expr> {
    map_res(
        alt((
            recognize(pair(digit1, opt(pair(char('.'), digit0)))),
            recognize(pair(char('.'), digit1)),
        )),
        |text: &str| text.parse::<f64>().map(Expr::Number),
    )(input)
}

fn identifier(input: &str) -> IResult<&str, &str> {
    recognize(pair(alpha1, alphanumeric0))(input)
}

/// A plain symbol. Reserved function names are rejected here so that
/// `sin x` fails instead of becoming the product of two symbols.
fn symbol(input: &str) -> IResult<&str, Expr> {
    map(
        verify(identifier, |name: &str| !is_callable(name)),
        |name: &str| Expr::Symbol(name.to_string()),
    )(input)
}

fn is_callable(name: &str) -> bool {
    FUNCTIONS.contains(&name)
        || INTEGRAL_NAMES.contains(&name)
        || SUM_NAMES.contains(&name)
        || LIMIT_NAMES.contains(&name)
}

fn call(input: &str) -> IResult<&str, Expr> {
    map_res(
        pair(
            verify(identifier, |name: &str| is_callable(name)),
            delimited(
                ws(char('(')),
                separated_list1(ws(char(',')), sum),
                ws(char(')')),
            ),
        ),
        |(name, args)| build_call(name, args),
    )(input)
}

fn build_call(name: &str, args: Vec<Expr>) -> Result<Expr, ParseError> {
    let invalid = || ParseError {
        input: name.to_string(),
    };

    if INTEGRAL_NAMES.contains(&name) {
        let mut args = args.into_iter();
        return match (args.next(), args.next(), args.next(), args.next(), args.next()) {
            (Some(f), Some(Expr::Symbol(var)), None, None, None) => Ok(Expr::Integral {
                integrand: Box::new(f),
                var,
                bounds: None,
            }),
            (Some(f), Some(Expr::Symbol(var)), Some(lo), Some(hi), None) => Ok(Expr::Integral {
                integrand: Box::new(f),
                var,
                bounds: Some((Box::new(lo), Box::new(hi))),
            }),
            _ => Err(invalid()),
        };
    }

    if SUM_NAMES.contains(&name) {
        let mut args = args.into_iter();
        return match (args.next(), args.next(), args.next(), args.next(), args.next()) {
            (Some(term), Some(Expr::Symbol(index)), Some(lower), Some(upper), None) => {
                Ok(Expr::Summation {
                    term: Box::new(term),
                    index,
                    lower: Box::new(lower),
                    upper: Box::new(upper),
                })
            }
            _ => Err(invalid()),
        };
    }

    if LIMIT_NAMES.contains(&name) {
        let mut args = args.into_iter();
        return match (args.next(), args.next(), args.next(), args.next()) {
            (Some(expr), Some(Expr::Symbol(var)), Some(point), None) => Ok(Expr::Limit {
                expr: Box::new(expr),
                var,
                point: Box::new(point),
            }),
            _ => Err(invalid()),
        };
    }

    Ok(Expr::Function {
        name: name.to_string(),
        args,
    })
}
