//! Sentence templates for parsed expressions, plus the keyword fallback used
//! when parsing fails.

use crate::math::expr::Expr;

/// Syntactic category of a parsed expression's top node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    Sum,
    Product,
    Power,
    Function,
    Equality,
    Integral,
    Summation,
    Limit,
    Other,
}

impl Category {
    pub fn of(expr: &Expr) -> Self {
        // literal arithmetic is just a number
        if expr.is_literal() {
            return Category::Other;
        }
        match expr {
            Expr::Add(_) => Category::Sum,
            Expr::Mul(_) | Expr::Neg(_) => Category::Product,
            Expr::Pow(..) => Category::Power,
            Expr::Function { .. } => Category::Function,
            Expr::Equation(..) => Category::Equality,
            Expr::Integral { .. } => Category::Integral,
            Expr::Summation { .. } => Category::Summation,
            Expr::Limit { .. } => Category::Limit,
            Expr::Number(_) | Expr::Symbol(_) => Category::Other,
        }
    }
}

/// Render the fixed sentence for the expression's category.
pub fn describe(expr: &Expr) -> String {
    match (Category::of(expr), expr) {
        (Category::Sum, Expr::Add(terms)) => {
            format!("This is an addition of the terms: {}", join(terms))
        }
        (Category::Product, Expr::Mul(factors)) => {
            format!("This is a multiplication of the factors: {}", join(factors))
        }
        (Category::Product, Expr::Neg(inner)) => {
            let mut factors = vec!["-1".to_string()];
            match inner.as_ref() {
                Expr::Mul(rest) => factors.extend(rest.iter().map(ToString::to_string)),
                other => factors.push(other.to_string()),
            }
            format!(
                "This is a multiplication of the factors: {}",
                factors.join(", ")
            )
        }
        (Category::Power, Expr::Pow(base, exp)) => {
            format!("This represents {} raised to the power of {}", base, exp)
        }
        (Category::Function, Expr::Function { name, args }) => {
            format!("This is the {} function applied to {}", name, join(args))
        }
        (Category::Equality, Expr::Equation(lhs, rhs)) => {
            format!("This is an equation stating that {} equals {}", lhs, rhs)
        }
        (
            Category::Integral,
            Expr::Integral {
                integrand,
                var,
                bounds,
            },
        ) => {
            let mut sentence = format!(
                "This is the integral of {} with respect to {}",
                integrand, var
            );
            if let Some((lo, hi)) = bounds {
                sentence.push_str(&format!(" from {} to {}", lo, hi));
            }
            sentence
        }
        (
            Category::Summation,
            Expr::Summation {
                term,
                index,
                lower,
                upper,
            },
        ) => format!(
            "This is the sum of {} for {} running from {} to {}",
            term, index, lower, upper
        ),
        (Category::Limit, Expr::Limit { expr, var, point }) => {
            format!("This is the limit of {} as {} approaches {}", expr, var, point)
        }
        _ => {
            let mut sentence = format!("This is a mathematical expression: {}", expr);
            // evaluation errors just mean there is no value to report
            if let Ok(value) = expr.evaluate() {
                if value.is_finite() {
                    sentence.push_str(&format!(". It evaluates to approximately {:.4}", value));
                }
            }
            sentence
        }
    }
}

fn join(items: &[Expr]) -> String {
    items
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Substring tests for the keyword fallback, in reporting order.
const KEYWORDS: &[(&[&str], &str)] = &[
    (&["+"], "addition"),
    (&["-"], "subtraction"),
    (&["*", "/"], "multiplication or division"),
    (&["**", "^"], "exponentiation"),
    (&["sqrt"], "square roots"),
    (&["sin", "cos", "tan"], "trigonometric functions"),
    (&["log", "ln", "exp"], "logarithmic or exponential functions"),
    (&["sum"], "summations"),
    (&["int"], "integrals"),
    (&["lim"], "limits"),
];

/// Describe an unparsable expression by which operator and function names
/// occur in it. Lossy: it never looks at structure.
pub fn keyword_fallback(text: &str) -> String {
    let found: Vec<&str> = KEYWORDS
        .iter()
        .filter(|(needles, _)| needles.iter().any(|n| text.contains(n)))
        .map(|(_, name)| *name)
        .collect();

    match found.as_slice() {
        [] => format!(
            "This expression is '{}', which could not be automatically parsed for a detailed explanation.",
            text
        ),
        [only] => format!("This expression involves {}.", only),
        [init @ .., last] => format!("This expression involves {} and {}.", init.join(", "), last),
    }
}
