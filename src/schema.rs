//! Request and response bodies of the HTTP API.

use crate::math::ExpressionFormat;
use serde::{Deserialize, Serialize};

/// Base64-encoded image sent as JSON to `/upload`.
#[derive(Debug, Clone, Deserialize)]
pub struct ImagePayload {
    pub image: String,
    #[serde(default = "default_image_format")]
    pub format: String,
}

fn default_image_format() -> String {
    "base64".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExplainRequest {
    pub expression: String,
    #[serde(default)]
    pub format: ExpressionFormat,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RootResponse {
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OcrResponse {
    pub result: String,
    /// In `[0, 1]`; `null` when the engine reported no confidence.
    pub confidence: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PdfResponse {
    pub content: String,
    pub pages: usize,
}

/// Result of the image explanation endpoints. Failures are reported in the
/// body (`success: false`) rather than through the status code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MathImageResponse {
    pub explanation: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latex: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_payload_format_defaults_to_base64() {
        let payload: ImagePayload = serde_json::from_str(r#"{"image": "AAAA"}"#).unwrap();
        assert_eq!(payload.format, "base64");
    }

    #[test]
    fn test_explain_request_defaults_to_latex() {
        let request: ExplainRequest = serde_json::from_str(r#"{"expression": "x"}"#).unwrap();
        assert_eq!(request.format, ExpressionFormat::Latex);
    }

    #[test]
    fn test_math_image_response_omits_absent_fields() {
        let response = MathImageResponse {
            explanation: String::new(),
            latex: None,
            confidence: None,
            success: false,
            error: Some("both paths failed".to_string()),
        };
        let json = serde_json::to_value(&response).unwrap();
        assert!(json.get("latex").is_none());
        assert!(json.get("confidence").is_none());
        assert_eq!(json["success"], false);
        assert_eq!(json["error"], "both paths failed");
    }

    #[test]
    fn test_ocr_response_keeps_null_confidence() {
        let json = serde_json::to_value(OcrResponse {
            result: String::new(),
            confidence: None,
        })
        .unwrap();
        assert!(json["confidence"].is_null());
        assert_eq!(json["result"], "");
    }
}
