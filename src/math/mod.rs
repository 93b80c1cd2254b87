//! Plain-English explanations of math expressions.
//!
//! LaTeX input is first rewritten to linear notation ([`latex`]), then parsed
//! ([`parser`]) and described by the category of its top node ([`explain`]).
//! Anything that does not parse gets the keyword-based description instead, so
//! explaining never fails.

pub mod explain;
pub mod expr;
pub mod latex;
pub mod parser;

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Notation of an incoming expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExpressionFormat {
    #[default]
    Latex,
    Plain,
}

/// An expression and its explanation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Explanation {
    pub original: String,
    pub explanation: String,
}

/// Explain an expression. Deterministic: the same input always yields the
/// same sentence.
pub fn explain_expression(expression: &str, format: ExpressionFormat) -> Explanation {
    let linear = match format {
        ExpressionFormat::Latex => latex::to_linear(expression),
        ExpressionFormat::Plain => expression.to_string(),
    };

    let explanation = match parser::parse(&linear) {
        Ok(expr) => explain::describe(&expr),
        Err(e) => {
            debug!("Falling back to keyword explanation: {}", e);
            explain::keyword_fallback(&linear)
        }
    };

    Explanation {
        original: expression.to_string(),
        explanation,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_latex_fraction() {
        let result = explain_expression(r"\frac{1}{2}", ExpressionFormat::Latex);
        assert_eq!(result.original, r"\frac{1}{2}");
        assert_eq!(
            result.explanation,
            "This is a mathematical expression: 1/2. It evaluates to approximately 0.5000"
        );
    }

    #[test]
    fn test_latex_power() {
        let result = explain_expression("x^{2}", ExpressionFormat::Latex);
        assert_eq!(result.explanation, "This represents x raised to the power of 2");
    }

    #[test]
    fn test_latex_sqrt_function() {
        let result = explain_expression(r"\sqrt{x+1}", ExpressionFormat::Latex);
        assert_eq!(result.explanation, "This is the sqrt function applied to x + 1");
    }

    #[test]
    fn test_quadratic_formula_falls_back() {
        let result = explain_expression(
            r"\frac{-b \pm \sqrt{b^2 - 4ac}}{2a}",
            ExpressionFormat::Latex,
        );
        assert!(result.explanation.starts_with("This expression involves"));
        assert!(result.explanation.contains("square roots"));
    }

    #[test]
    fn test_plain_format_skips_rewriting() {
        let result = explain_expression("x^2 + 2*x + 1", ExpressionFormat::Plain);
        // '^' is not an operator in linear notation
        assert!(result.explanation.starts_with("This expression involves"));

        let result = explain_expression("x**2 + 2*x + 1", ExpressionFormat::Plain);
        assert_eq!(
            result.explanation,
            "This is an addition of the terms: x**2, 2*x, 1"
        );
    }

    #[test]
    fn test_garbage_never_fails() {
        for format in [ExpressionFormat::Latex, ExpressionFormat::Plain] {
            let result = explain_expression("???", format);
            assert_eq!(result.original, "???");
            assert!(result.explanation.contains("could not be automatically parsed"));
        }
    }

    #[test]
    fn test_deep_nesting_falls_back() {
        let n = 10_000;
        let inputs = [
            (format!("{}x{}", "(".repeat(n), ")".repeat(n)), ExpressionFormat::Plain),
            (format!("{}x", "-".repeat(n)), ExpressionFormat::Plain),
            (format!("{}x{}", "{".repeat(n), "}".repeat(n)), ExpressionFormat::Latex),
            (format!("{}1{}", r"\frac{".repeat(n), "}{2}".repeat(n)), ExpressionFormat::Latex),
        ];
        for (input, format) in inputs {
            let result = explain_expression(&input, format);
            assert_eq!(result.original, input);
            assert!(result.explanation.starts_with("This expression"));
        }
    }

    #[test]
    fn test_idempotent() {
        let first = explain_expression(r"\sin(x) + \cos(x)", ExpressionFormat::Latex);
        let second = explain_expression(r"\sin(x) + \cos(x)", ExpressionFormat::Latex);
        assert_eq!(first, second);
        assert_eq!(
            first.explanation,
            "This is an addition of the terms: sin(x), cos(x)"
        );
    }

    #[test]
    fn test_format_deserializes_lowercase() {
        let format: ExpressionFormat = serde_json::from_str("\"plain\"").unwrap();
        assert_eq!(format, ExpressionFormat::Plain);
        assert!(serde_json::from_str::<ExpressionFormat>("\"mathml\"").is_err());
    }
}
