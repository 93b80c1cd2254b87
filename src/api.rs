//! HTTP routes and handlers.

use crate::analysis::analyze_image;
use crate::config::AppConfig;
use crate::error::ApiError;
use crate::math::{explain_expression, Explanation};
use crate::ocr::{OcrEngine, TesseractEngine};
use crate::pdf::extract_pdf_text;
use crate::schema::{
    ExplainRequest, ImagePayload, MathImageResponse, OcrResponse, PdfResponse, RootResponse,
};
use crate::vision::{GeminiClient, ImageTask, VisionModel};
use axum::{
    extract::{
        multipart::Field, rejection::JsonRejection, DefaultBodyLimit, FromRequest, Multipart,
        Request, State,
    },
    http::header::CONTENT_TYPE,
    response::Json,
    routing::{get, post},
    Router,
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub ocr: Arc<dyn OcrEngine>,
    /// `None` when no vision credential is configured.
    pub vision: Option<Arc<dyn VisionModel>>,
}

impl AppState {
    /// Wire the real collaborators described by `config`.
    pub fn from_config(config: AppConfig) -> Self {
        let ocr: Arc<dyn OcrEngine> = Arc::new(TesseractEngine::new(config.tesseract_cmd.clone()));
        let vision = config.google_api_key.as_ref().map(|key| {
            Arc::new(GeminiClient::new(key.clone(), config.gemini_model.clone()))
                as Arc<dyn VisionModel>
        });

        Self {
            config: Arc::new(config),
            ocr,
            vision,
        }
    }
}

pub fn router(state: AppState) -> Router {
    let body_limit = state.config.max_upload_bytes;

    Router::new()
        .route("/", get(root))
        .route("/upload", post(upload_image))
        .route("/explain", post(explain))
        .route("/pdf-upload", post(upload_pdf))
        .route("/process-math-image", post(process_math_image))
        .route("/process-plot-image", post(process_plot_image))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

// ============================================================================
// Handlers
// ============================================================================

/// Liveness check.
async fn root() -> Json<RootResponse> {
    Json(RootResponse {
        message: "STEM Assistant API is running.".to_string(),
    })
}

/// Run OCR on an image sent either as a multipart `file` part or as a
/// base64 payload (JSON body, or `image` text part of a multipart form).
async fn upload_image(
    State(state): State<AppState>,
    request: Request,
) -> Result<Json<OcrResponse>, ApiError> {
    let is_multipart = request
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.starts_with("multipart/form-data"))
        .unwrap_or(false);

    let (file, payload) = if is_multipart {
        let multipart = Multipart::from_request(request, &state).await?;
        read_upload_form(multipart).await?
    } else if request.headers().contains_key(CONTENT_TYPE) {
        let Json(payload) = Json::<ImagePayload>::from_request(request, &state).await?;
        (None, Some(payload))
    } else {
        (None, None)
    };

    let image = match (file, payload) {
        (Some(_), Some(_)) => {
            return Err(ApiError::bad_request(
                "Provide either a file upload or a base64-encoded image, not both",
            ))
        }
        (Some(file), None) => file.data,
        (None, Some(payload)) => decode_payload(&payload)?,
        (None, None) => {
            return Err(ApiError::bad_request(
                "Provide either a file upload or a base64-encoded image",
            ))
        }
    };

    info!("Received image for OCR ({} bytes)", image.len());

    let output = state
        .ocr
        .recognize(&image)
        .await
        .map_err(|e| ApiError::processing("OCR processing error", e, state.config.debug))?;

    Ok(Json(OcrResponse {
        result: output.text,
        confidence: output.confidence,
    }))
}

/// Explain a math expression in plain English.
async fn explain(
    payload: Result<Json<ExplainRequest>, JsonRejection>,
) -> Result<Json<Explanation>, ApiError> {
    let Json(request) = payload?;
    Ok(Json(explain_expression(&request.expression, request.format)))
}

/// Extract the text of an uploaded PDF.
async fn upload_pdf(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<PdfResponse>, ApiError> {
    let file = read_file_part(multipart).await?;

    let is_pdf = file
        .filename
        .as_deref()
        .map(|name| name.to_lowercase().ends_with(".pdf"))
        .unwrap_or(false);
    if !is_pdf {
        return Err(ApiError::bad_request("Uploaded file must be a PDF"));
    }

    info!(
        "Received PDF: {} ({} bytes)",
        file.filename.as_deref().unwrap_or_default(),
        file.data.len()
    );

    let text = tokio::task::spawn_blocking(move || extract_pdf_text(&file.data))
        .await
        .map_err(anyhow::Error::from)
        .and_then(|result| result)
        .map_err(|e| ApiError::processing("PDF processing error", e, state.config.debug))?;

    Ok(Json(PdfResponse {
        content: text.content,
        pages: text.pages,
    }))
}

async fn process_math_image(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<MathImageResponse>, ApiError> {
    process_image(state, multipart, ImageTask::MathExpression).await
}

async fn process_plot_image(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<MathImageResponse>, ApiError> {
    process_image(state, multipart, ImageTask::Plot).await
}

/// Shared body of the image explanation endpoints. Only input validation
/// fails the request; collaborator failures are reported in the body.
async fn process_image(
    state: AppState,
    multipart: Multipart,
    task: ImageTask,
) -> Result<Json<MathImageResponse>, ApiError> {
    let file = read_file_part(multipart).await?;

    let mime_type = match file.content_type.as_deref() {
        Some(ct) if ct.starts_with("image/") => ct.to_string(),
        _ => return Err(ApiError::bad_request("Uploaded file must be an image")),
    };

    info!(
        "Received {} image: {} ({} bytes, {})",
        task.label(),
        file.filename.as_deref().unwrap_or("unnamed"),
        file.data.len(),
        mime_type
    );

    let outcome = analyze_image(
        state.vision.as_deref(),
        state.ocr.as_ref(),
        task,
        &file.data,
        &mime_type,
    )
    .await;

    Ok(Json(outcome.into_response(task)))
}

// ============================================================================
// Helper functions
// ============================================================================

/// A file part read from a multipart form.
struct UploadedFile {
    filename: Option<String>,
    content_type: Option<String>,
    data: Vec<u8>,
}

async fn read_field_file(field: Field<'_>) -> Result<UploadedFile, ApiError> {
    let filename = field.file_name().map(str::to_string);
    let content_type = field.content_type().map(str::to_string);
    let data = field.bytes().await?.to_vec();
    Ok(UploadedFile {
        filename,
        content_type,
        data,
    })
}

/// Read the `file` part of a form; other parts are ignored.
async fn read_file_part(mut multipart: Multipart) -> Result<UploadedFile, ApiError> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() == Some("file") {
            return read_field_file(field).await;
        }
    }
    Err(ApiError::bad_request("No file uploaded"))
}

/// Read the `/upload` form: an optional `file` part and an optional base64
/// payload given as `image` (and `format`) text parts.
async fn read_upload_form(
    mut multipart: Multipart,
) -> Result<(Option<UploadedFile>, Option<ImagePayload>), ApiError> {
    let mut file = None;
    let mut image = None;
    let mut format = None;

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("file") => file = Some(read_field_file(field).await?),
            Some("image") => image = Some(field.text().await?),
            Some("format") => format = Some(field.text().await?),
            _ => {}
        }
    }

    let payload = image.map(|image| ImagePayload {
        image,
        format: format.unwrap_or_else(|| "base64".to_string()),
    });
    Ok((file, payload))
}

/// Decode a base64 image payload. A `data:<mime>;base64,` prefix is accepted.
fn decode_payload(payload: &ImagePayload) -> Result<Vec<u8>, ApiError> {
    if !payload.format.eq_ignore_ascii_case("base64") {
        return Err(ApiError::bad_request(format!(
            "Unsupported image format '{}', expected 'base64'",
            payload.format
        )));
    }

    let encoded = payload.image.trim();
    let encoded = match encoded.split_once(";base64,") {
        Some((prefix, data)) if prefix.starts_with("data:") => data,
        _ => encoded,
    };

    BASE64
        .decode(encoded)
        .map_err(|e| ApiError::bad_request(format!("Invalid base64 encoding: {}", e)))
}
