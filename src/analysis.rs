//! Image explanation pipeline: hosted vision model first, OCR plus the local
//! expression explainer when the model is unavailable or fails.

use crate::math::{explain_expression, ExpressionFormat};
use crate::ocr::OcrEngine;
use crate::schema::MathImageResponse;
use crate::vision::{extract_latex, ImageTask, VisionModel};
use tracing::{debug, info, warn};

/// Reported confidence when the vision model answered. A fixed heuristic, not
/// a measurement.
pub const VISION_CONFIDENCE: f64 = 0.9;
/// Reported confidence when the OCR fallback answered.
pub const OCR_FALLBACK_CONFIDENCE: f64 = 0.5;

const NO_TEXT_EXPLANATION: &str = "No text could be recognized in the image.";

/// Why the vision model did not produce the answer.
#[derive(Debug, Clone, PartialEq)]
pub enum FallbackReason {
    /// No credential configured; the model was never called.
    Unconfigured,
    PrimaryFailed(String),
}

/// Which path produced the answer.
#[derive(Debug, Clone, PartialEq)]
pub enum AnalysisOutcome {
    PrimarySucceeded {
        text: String,
    },
    FallbackUsed {
        recognized: String,
        explanation: String,
        reason: FallbackReason,
    },
    BothFailed {
        /// `None` if the model was never called.
        primary: Option<String>,
        fallback: String,
    },
}

/// Run the vision model, falling back to OCR.
pub async fn analyze_image(
    vision: Option<&dyn VisionModel>,
    ocr: &dyn OcrEngine,
    task: ImageTask,
    image: &[u8],
    mime_type: &str,
) -> AnalysisOutcome {
    let reason = match vision {
        Some(model) => match model.describe(image, mime_type, task.prompt()).await {
            Ok(text) => {
                info!("{} analyzed by {}", task.label(), model.name());
                return AnalysisOutcome::PrimarySucceeded { text };
            }
            Err(e) => {
                warn!("{} failed for {}, falling back to OCR: {:#}", model.name(), task.label(), e);
                FallbackReason::PrimaryFailed(format!("{:#}", e))
            }
        },
        None => FallbackReason::Unconfigured,
    };

    match ocr.recognize(image).await {
        Ok(output) => {
            info!("{} analyzed by {} fallback", task.label(), ocr.name());
            AnalysisOutcome::FallbackUsed {
                explanation: explain_recognized(task, &output.text),
                recognized: output.text,
                reason,
            }
        }
        Err(e) => {
            warn!("{} fallback failed for {}: {:#}", ocr.name(), task.label(), e);
            AnalysisOutcome::BothFailed {
                primary: match reason {
                    FallbackReason::Unconfigured => None,
                    FallbackReason::PrimaryFailed(message) => Some(message),
                },
                fallback: format!("{:#}", e),
            }
        }
    }
}

fn explain_recognized(task: ImageTask, recognized: &str) -> String {
    if recognized.is_empty() {
        return NO_TEXT_EXPLANATION.to_string();
    }
    let explained = explain_expression(recognized, ExpressionFormat::Latex).explanation;
    match task {
        ImageTask::MathExpression => explained,
        ImageTask::Plot => format!("Text found in the plot: '{}'. {}", recognized, explained),
    }
}

impl AnalysisOutcome {
    /// Shape the outcome into the endpoint's response body.
    pub fn into_response(self, task: ImageTask) -> MathImageResponse {
        match self {
            AnalysisOutcome::PrimarySucceeded { text } => MathImageResponse {
                latex: match task {
                    ImageTask::MathExpression => extract_latex(&text),
                    ImageTask::Plot => None,
                },
                explanation: text,
                confidence: Some(VISION_CONFIDENCE),
                success: true,
                error: None,
            },
            AnalysisOutcome::FallbackUsed {
                recognized,
                explanation,
                reason,
            } => {
                debug!("{} answered by OCR fallback ({:?})", task.label(), reason);
                MathImageResponse {
                    explanation,
                    latex: match task {
                        ImageTask::MathExpression if !recognized.is_empty() => Some(recognized),
                        _ => None,
                    },
                    confidence: Some(OCR_FALLBACK_CONFIDENCE),
                    success: true,
                    error: None,
                }
            }
            AnalysisOutcome::BothFailed { primary, fallback } => MathImageResponse {
                explanation: String::new(),
                latex: None,
                confidence: None,
                success: false,
                error: Some(match primary {
                    Some(primary) => format!(
                        "Vision model failed ({}); OCR fallback failed ({})",
                        primary, fallback
                    ),
                    None => format!("OCR processing failed: {}", fallback),
                }),
            },
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::ocr::OcrOutput;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// OCR engine returning fixed text, or failing when `text` is `None`.
    pub struct FakeOcr {
        pub text: Option<String>,
        pub confidence: Option<f64>,
        pub calls: AtomicUsize,
    }

    impl FakeOcr {
        pub fn returning(text: &str) -> Self {
            Self {
                text: Some(text.to_string()),
                confidence: Some(0.87),
                calls: AtomicUsize::new(0),
            }
        }

        pub fn failing() -> Self {
            Self {
                text: None,
                confidence: None,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait::async_trait]
    impl OcrEngine for FakeOcr {
        fn name(&self) -> &str {
            "fake-ocr"
        }

        async fn recognize(&self, _image: &[u8]) -> anyhow::Result<OcrOutput> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.text {
                Some(text) => Ok(OcrOutput {
                    text: text.clone(),
                    confidence: self.confidence,
                }),
                None => anyhow::bail!("engine crashed"),
            }
        }
    }

    /// Vision model returning a fixed answer, or failing when `answer` is `None`.
    pub struct FakeVision {
        pub answer: Option<String>,
        pub calls: AtomicUsize,
    }

    impl FakeVision {
        pub fn returning(answer: &str) -> Self {
            Self {
                answer: Some(answer.to_string()),
                calls: AtomicUsize::new(0),
            }
        }

        pub fn failing() -> Self {
            Self {
                answer: None,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait::async_trait]
    impl VisionModel for FakeVision {
        fn name(&self) -> &str {
            "fake-vision"
        }

        async fn describe(&self, _image: &[u8], _mime: &str, _prompt: &str) -> anyhow::Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.answer {
                Some(answer) => Ok(answer.clone()),
                None => anyhow::bail!("quota exceeded"),
            }
        }
    }

    #[tokio::test]
    async fn test_primary_success_skips_ocr() {
        let vision = FakeVision::returning("Area of a circle.\nLaTeX: A = \\pi r^2");
        let ocr = FakeOcr::returning("unused");

        let outcome =
            analyze_image(Some(&vision), &ocr, ImageTask::MathExpression, b"img", "image/png").await;

        assert!(matches!(outcome, AnalysisOutcome::PrimarySucceeded { .. }));
        assert_eq!(ocr.calls.load(Ordering::SeqCst), 0);

        let response = outcome.into_response(ImageTask::MathExpression);
        assert!(response.success);
        assert_eq!(response.latex.as_deref(), Some("A = \\pi r^2"));
        assert_eq!(response.confidence, Some(VISION_CONFIDENCE));
        assert!(response.explanation.starts_with("Area of a circle."));
    }

    #[tokio::test]
    async fn test_plot_success_has_no_latex() {
        let vision = FakeVision::returning("A line graph. LaTeX: y = 2x");
        let ocr = FakeOcr::returning("unused");

        let response = analyze_image(Some(&vision), &ocr, ImageTask::Plot, b"img", "image/png")
            .await
            .into_response(ImageTask::Plot);

        assert!(response.success);
        assert_eq!(response.latex, None);
    }

    #[tokio::test]
    async fn test_unconfigured_uses_ocr() {
        let ocr = FakeOcr::returning("x^{2}");

        let outcome = analyze_image(None, &ocr, ImageTask::MathExpression, b"img", "image/png").await;

        assert_eq!(
            outcome,
            AnalysisOutcome::FallbackUsed {
                recognized: "x^{2}".to_string(),
                explanation: "This represents x raised to the power of 2".to_string(),
                reason: FallbackReason::Unconfigured,
            }
        );

        let response = outcome.into_response(ImageTask::MathExpression);
        assert!(response.success);
        assert_eq!(response.latex.as_deref(), Some("x^{2}"));
        assert_eq!(response.confidence, Some(OCR_FALLBACK_CONFIDENCE));
        assert_eq!(response.error, None);
    }

    #[tokio::test]
    async fn test_primary_failure_uses_ocr() {
        let vision = FakeVision::failing();
        let ocr = FakeOcr::returning("a + b");

        let outcome =
            analyze_image(Some(&vision), &ocr, ImageTask::MathExpression, b"img", "image/png").await;

        match outcome {
            AnalysisOutcome::FallbackUsed { reason, explanation, .. } => {
                assert_eq!(
                    reason,
                    FallbackReason::PrimaryFailed("quota exceeded".to_string())
                );
                assert_eq!(explanation, "This is an addition of the terms: a, b");
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
        assert_eq!(vision.calls.load(Ordering::SeqCst), 1);
        assert_eq!(ocr.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_plot_fallback_mentions_recognized_text() {
        let ocr = FakeOcr::returning("sin(t)");
        let response = analyze_image(None, &ocr, ImageTask::Plot, b"img", "image/png")
            .await
            .into_response(ImageTask::Plot);

        assert_eq!(
            response.explanation,
            "Text found in the plot: 'sin(t)'. This is the sin function applied to t"
        );
        assert_eq!(response.latex, None);
    }

    #[tokio::test]
    async fn test_empty_ocr_text() {
        let ocr = FakeOcr::returning("");
        let response = analyze_image(None, &ocr, ImageTask::MathExpression, b"img", "image/png")
            .await
            .into_response(ImageTask::MathExpression);

        assert!(response.success);
        assert_eq!(response.explanation, NO_TEXT_EXPLANATION);
        assert_eq!(response.latex, None);
    }

    #[tokio::test]
    async fn test_both_failed() {
        let vision = FakeVision::failing();
        let ocr = FakeOcr::failing();

        let outcome =
            analyze_image(Some(&vision), &ocr, ImageTask::MathExpression, b"img", "image/png").await;
        assert_eq!(
            outcome,
            AnalysisOutcome::BothFailed {
                primary: Some("quota exceeded".to_string()),
                fallback: "engine crashed".to_string(),
            }
        );

        let response = outcome.into_response(ImageTask::MathExpression);
        assert!(!response.success);
        assert!(response.explanation.is_empty());
        assert_eq!(
            response.error.as_deref(),
            Some("Vision model failed (quota exceeded); OCR fallback failed (engine crashed)")
        );
    }

    #[tokio::test]
    async fn test_ocr_failure_without_vision() {
        let ocr = FakeOcr::failing();
        let response = analyze_image(None, &ocr, ImageTask::Plot, b"img", "image/png")
            .await
            .into_response(ImageTask::Plot);

        assert!(!response.success);
        assert_eq!(
            response.error.as_deref(),
            Some("OCR processing failed: engine crashed")
        );
    }
}
