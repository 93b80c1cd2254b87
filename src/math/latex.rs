//! LaTeX to linear notation rewriting.
//!
//! Only a constrained subset of LaTeX is understood: `\frac{a}{b}` is rewritten
//! structurally, everything else goes through a fixed table of literal
//! substitutions applied in order.

/// Ordered substitution table. Each rule is one replace-all pass over the
/// output of the previous rule.
const REPLACEMENTS: &[(&str, &str)] = &[
    (r"\left", ""),
    (r"\right", ""),
    (r"\cdot", "*"),
    (r"\times", "*"),
    (r"\div", "/"),
    (r"\frac", "/"),
    (r"\sqrt", "sqrt"),
    (r"\pi", "pi"),
    (r"\alpha", "alpha"),
    (r"\beta", "beta"),
    (r"\theta", "theta"),
    // before \int, which is a prefix of it
    (r"\infty", "oo"),
    (r"\int", "integral"),
    (r"\sum", "sum"),
    (r"\lim", "limit"),
    (r"\sin", "sin"),
    (r"\cos", "cos"),
    (r"\tan", "tan"),
    (r"\log", "log"),
    (r"\ln", "ln"),
    (r"\exp", "exp"),
    ("^", "**"),
    // subscripts are dropped
    ("_", ""),
    ("{", "("),
    ("}", ")"),
];

/// Rewrite LaTeX into the linear notation accepted by the expression parser.
pub fn to_linear(latex: &str) -> String {
    let mut out = rewrite_fractions(latex, 0);
    for (from, to) in REPLACEMENTS {
        out = out.replace(from, to);
    }
    out
}

/// Fractions nested deeper than this are left for the substitution table.
const MAX_FRACTION_DEPTH: usize = 32;

/// Rewrite every `\frac{A}{B}` with two balanced brace groups into `(A)/(B)`.
/// A `\frac` without two groups is left for the substitution table.
fn rewrite_fractions(input: &str, depth: usize) -> String {
    const FRAC: &str = r"\frac";

    if depth >= MAX_FRACTION_DEPTH {
        return input.to_string();
    }

    let mut out = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(pos) = rest.find(FRAC) {
        out.push_str(&rest[..pos]);
        let after = &rest[pos + FRAC.len()..];

        match split_group(after).and_then(|(num, tail)| {
            split_group(tail).map(|(den, tail)| (num, den, tail))
        }) {
            Some((num, den, tail)) => {
                out.push('(');
                out.push_str(&rewrite_fractions(num, depth + 1));
                out.push_str(")/(");
                out.push_str(&rewrite_fractions(den, depth + 1));
                out.push(')');
                rest = tail;
            }
            None => {
                out.push_str(FRAC);
                rest = after;
            }
        }
    }

    out.push_str(rest);
    out
}

/// Split a leading `{...}` group (after optional whitespace) into its inner text
/// and the remainder. Returns `None` if there is no balanced group.
fn split_group(input: &str) -> Option<(&str, &str)> {
    let trimmed = input.trim_start();
    if !trimmed.starts_with('{') {
        return None;
    }

    let mut depth = 0usize;
    for (i, c) in trimmed.char_indices() {
        match c {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some((&trimmed[1..i], &trimmed[i + 1..]));
                }
            }
            _ => {}
        }
    }
    None
}
