//! Typed expression tree produced by the parser.

use std::fmt;

/// A parsed expression.
///
/// Sums and products are flattened. Subtraction is a sum term wrapped in
/// [`Expr::Neg`]; division is a product factor raised to `-1`.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Number(f64),
    Symbol(String),
    Neg(Box<Expr>),
    Add(Vec<Expr>),
    Mul(Vec<Expr>),
    Pow(Box<Expr>, Box<Expr>),
    Function {
        name: String,
        args: Vec<Expr>,
    },
    Equation(Box<Expr>, Box<Expr>),
    Integral {
        integrand: Box<Expr>,
        var: String,
        bounds: Option<(Box<Expr>, Box<Expr>)>,
    },
    Summation {
        term: Box<Expr>,
        index: String,
        lower: Box<Expr>,
        upper: Box<Expr>,
    },
    Limit {
        expr: Box<Expr>,
        var: String,
        point: Box<Expr>,
    },
}

/// Why a tree has no numeric value.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EvalError {
    #[error("free symbol '{0}'")]
    FreeSymbol(String),
    #[error("unknown function '{0}'")]
    UnknownFunction(String),
    #[error("'{name}' expects {expected} argument(s)")]
    Arity { name: String, expected: usize },
    #[error("{0} cannot be evaluated numerically")]
    Unsupported(&'static str),
}

impl Expr {
    /// Sum of two terms, flattening nested sums.
    pub fn add(lhs: Expr, rhs: Expr) -> Expr {
        let mut terms = match lhs {
            Expr::Add(terms) => terms,
            other => vec![other],
        };
        match rhs {
            Expr::Add(more) => terms.extend(more),
            other => terms.push(other),
        }
        Expr::Add(terms)
    }

    /// Product of two factors, flattening nested products.
    pub fn mul(lhs: Expr, rhs: Expr) -> Expr {
        let mut factors = match lhs {
            Expr::Mul(factors) => factors,
            other => vec![other],
        };
        match rhs {
            Expr::Mul(more) => factors.extend(more),
            other => factors.push(other),
        }
        Expr::Mul(factors)
    }

    pub fn sub(lhs: Expr, rhs: Expr) -> Expr {
        Expr::add(lhs, Expr::Neg(Box::new(rhs)))
    }

    pub fn div(lhs: Expr, rhs: Expr) -> Expr {
        Expr::mul(lhs, Expr::reciprocal(rhs))
    }

    pub fn reciprocal(expr: Expr) -> Expr {
        Expr::Pow(
            Box::new(expr),
            Box::new(Expr::Neg(Box::new(Expr::Number(1.0)))),
        )
    }

    pub fn pow(base: Expr, exp: Expr) -> Expr {
        Expr::Pow(Box::new(base), Box::new(exp))
    }

    /// True if the tree is numeric literals combined with arithmetic only.
    pub fn is_literal(&self) -> bool {
        match self {
            Expr::Number(_) => true,
            Expr::Neg(inner) => inner.is_literal(),
            Expr::Add(items) | Expr::Mul(items) => items.iter().all(Expr::is_literal),
            Expr::Pow(base, exp) => base.is_literal() && exp.is_literal(),
            _ => false,
        }
    }

    /// Base of a `x**-1` factor.
    fn reciprocal_base(&self) -> Option<&Expr> {
        match self {
            Expr::Pow(base, exp) => match exp.as_ref() {
                Expr::Neg(one) if **one == Expr::Number(1.0) => Some(base.as_ref()),
                _ => None,
            },
            _ => None,
        }
    }

    /// Evaluate to a float. Fails on free symbols and calculus forms.
    pub fn evaluate(&self) -> Result<f64, EvalError> {
        match self {
            Expr::Number(n) => Ok(*n),
            Expr::Symbol(name) => {
                constant_value(name).ok_or_else(|| EvalError::FreeSymbol(name.clone()))
            }
            Expr::Neg(inner) => Ok(-inner.evaluate()?),
            Expr::Add(terms) => terms.iter().map(Expr::evaluate).sum(),
            Expr::Mul(factors) => factors.iter().map(Expr::evaluate).product(),
            Expr::Pow(base, exp) => Ok(base.evaluate()?.powf(exp.evaluate()?)),
            Expr::Function { name, args } => {
                let values = args
                    .iter()
                    .map(Expr::evaluate)
                    .collect::<Result<Vec<_>, _>>()?;
                apply_function(name, &values)
            }
            Expr::Equation(..) => Err(EvalError::Unsupported("an equation")),
            Expr::Integral { .. } => Err(EvalError::Unsupported("an integral")),
            Expr::Summation { .. } => Err(EvalError::Unsupported("a summation")),
            Expr::Limit { .. } => Err(EvalError::Unsupported("a limit")),
        }
    }

    fn precedence(&self) -> u8 {
        match self {
            Expr::Equation(..) => 0,
            Expr::Add(_) => 1,
            Expr::Mul(_) | Expr::Neg(_) => 2,
            Expr::Pow(..) => {
                if self.reciprocal_base().is_some() {
                    2
                } else {
                    3
                }
            }
            Expr::Number(n) if *n < 0.0 => 2,
            _ => 4,
        }
    }
}

/// Named constants with a numeric value.
fn constant_value(name: &str) -> Option<f64> {
    match name {
        "pi" => Some(std::f64::consts::PI),
        "E" => Some(std::f64::consts::E),
        "oo" => Some(f64::INFINITY),
        _ => None,
    }
}

fn apply_function(name: &str, args: &[f64]) -> Result<f64, EvalError> {
    let unary = |f: fn(f64) -> f64| match args {
        [x] => Ok(f(*x)),
        _ => Err(EvalError::Arity {
            name: name.to_string(),
            expected: 1,
        }),
    };

    match name {
        "sin" => unary(f64::sin),
        "cos" => unary(f64::cos),
        "tan" => unary(f64::tan),
        "asin" => unary(f64::asin),
        "acos" => unary(f64::acos),
        "atan" => unary(f64::atan),
        "sinh" => unary(f64::sinh),
        "cosh" => unary(f64::cosh),
        "tanh" => unary(f64::tanh),
        "sqrt" => unary(f64::sqrt),
        "exp" => unary(f64::exp),
        "ln" => unary(f64::ln),
        "abs" => unary(f64::abs),
        "log" => match args {
            [x] => Ok(x.ln()),
            [x, base] => Ok(x.ln() / base.ln()),
            _ => Err(EvalError::Arity {
                name: name.to_string(),
                expected: 1,
            }),
        },
        other => Err(EvalError::UnknownFunction(other.to_string())),
    }
}

fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

/// Writes `expr`, parenthesized when it binds looser than `min`.
fn write_operand(f: &mut fmt::Formatter<'_>, expr: &Expr, min: u8) -> fmt::Result {
    if expr.precedence() < min {
        write!(f, "({})", expr)
    } else {
        write!(f, "{}", expr)
    }
}

fn write_list(f: &mut fmt::Formatter<'_>, items: &[Expr]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{}", item)?;
    }
    Ok(())
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Number(n) => f.write_str(&format_number(*n)),
            Expr::Symbol(name) => f.write_str(name),
            Expr::Neg(inner) => {
                f.write_str("-")?;
                write_operand(f, inner, 2)
            }
            Expr::Add(terms) => {
                for (i, term) in terms.iter().enumerate() {
                    match (i, term) {
                        (0, _) => write!(f, "{}", term)?,
                        (_, Expr::Neg(inner)) => {
                            f.write_str(" - ")?;
                            write_operand(f, inner, 2)?;
                        }
                        _ => {
                            f.write_str(" + ")?;
                            write_operand(f, term, 2)?;
                        }
                    }
                }
                Ok(())
            }
            Expr::Mul(factors) => {
                for (i, factor) in factors.iter().enumerate() {
                    match (i, factor.reciprocal_base()) {
                        (0, _) => write_operand(f, factor, 2)?,
                        (_, Some(base)) => {
                            f.write_str("/")?;
                            write_operand(f, base, 3)?;
                        }
                        (_, None) => {
                            f.write_str("*")?;
                            write_operand(f, factor, 3)?;
                        }
                    }
                }
                Ok(())
            }
            Expr::Pow(base, exp) => {
                if let Some(base) = self.reciprocal_base() {
                    f.write_str("1/")?;
                    return write_operand(f, base, 3);
                }
                write_operand(f, base, 4)?;
                f.write_str("**")?;
                write_operand(f, exp, 3)
            }
            Expr::Function { name, args } => {
                write!(f, "{}(", name)?;
                write_list(f, args)?;
                f.write_str(")")
            }
            Expr::Equation(lhs, rhs) => write!(f, "{} = {}", lhs, rhs),
            Expr::Integral {
                integrand,
                var,
                bounds,
            } => match bounds {
                Some((lo, hi)) => write!(f, "Integral({}, ({}, {}, {}))", integrand, var, lo, hi),
                None => write!(f, "Integral({}, {})", integrand, var),
            },
            Expr::Summation {
                term,
                index,
                lower,
                upper,
            } => write!(f, "Sum({}, ({}, {}, {}))", term, index, lower, upper),
            Expr::Limit { expr, var, point } => {
                write!(f, "Limit({}, {}, {})", expr, var, point)
            }
        }
    }
}
