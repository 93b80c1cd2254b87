//! Hosted vision-language models.
//!
//! A [`VisionModel`] takes image bytes plus a prompt and returns free text.

pub mod gemini;

use anyhow::Result;
use regex::Regex;
use std::sync::OnceLock;

pub use gemini::GeminiClient;

#[async_trait::async_trait]
pub trait VisionModel: Send + Sync {
    fn name(&self) -> &str;
    async fn describe(&self, image: &[u8], mime_type: &str, prompt: &str) -> Result<String>;
}

/// What an uploaded image is expected to contain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageTask {
    MathExpression,
    Plot,
}

impl ImageTask {
    pub fn label(&self) -> &'static str {
        match self {
            ImageTask::MathExpression => "math expression",
            ImageTask::Plot => "plot",
        }
    }

    pub fn prompt(&self) -> &'static str {
        match self {
            ImageTask::MathExpression => concat!(
                "The image shows a mathematical equation or expression. ",
                "Explain step by step what it represents, naming its variables, constants and operators, ",
                "and what it means or is used for. ",
                "Then give the equation in standard LaTeX on its own line starting with 'LaTeX:'. ",
                "Write for a reader who cannot see the image."
            ),
            ImageTask::Plot => concat!(
                "The image shows a mathematical plot or graph. Describe: ",
                "1. the kind of plot (line graph, bar chart, scatter plot, function plot, ...); ",
                "2. what each axis represents, with labels and units where visible; ",
                "3. the overall trend or pattern; ",
                "4. key features such as intercepts, peaks, troughs, asymptotes, outliers or notable points; ",
                "5. the main conclusion the plot supports. ",
                "Write for a reader who cannot see the image."
            ),
        }
    }
}

/// Pull the LaTeX snippet out of a model answer: the rest of the first line
/// following a `LaTeX:` marker, without math delimiters or code fences.
pub fn extract_latex(text: &str) -> Option<String> {
    static MARKER: OnceLock<Regex> = OnceLock::new();
    let marker = MARKER.get_or_init(|| {
        Regex::new(r"(?im)^[\s*_]*latex[\s*_]*:[\s*_]*(.+)$").expect("valid LaTeX marker regex")
    });

    let snippet = marker.captures(text)?.get(1)?.as_str();
    let snippet = snippet
        .trim()
        .trim_matches(|c: char| c == '$' || c == '`')
        .trim();

    if snippet.is_empty() {
        None
    } else {
        Some(snippet.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_latex_plain_marker() {
        let answer = "This is the Pythagorean theorem.\nLaTeX: a^2 + b^2 = c^2\nIt relates the sides.";
        assert_eq!(extract_latex(answer).as_deref(), Some("a^2 + b^2 = c^2"));
    }

    #[test]
    fn test_extract_latex_strips_delimiters() {
        assert_eq!(
            extract_latex("LaTeX: $$\\frac{1}{2}$$").as_deref(),
            Some("\\frac{1}{2}")
        );
        assert_eq!(
            extract_latex("**LaTeX:** `E = mc^2`").as_deref(),
            Some("E = mc^2")
        );
    }

    #[test]
    fn test_extract_latex_absent() {
        assert_eq!(extract_latex("Just a description."), None);
        assert_eq!(extract_latex("LaTeX: $$"), None);
    }

    #[test]
    fn test_prompts_ask_for_expected_output() {
        assert!(ImageTask::MathExpression.prompt().contains("LaTeX:"));
        assert!(ImageTask::Plot.prompt().contains("axis"));
    }
}
