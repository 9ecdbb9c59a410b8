use crate::domain::summary::{
    DEFAULT_LANGUAGE, LengthTier, OutputFormat, SummarizeRequest, SummarizeResult, UploadedFile,
};
use crate::presentation::handlers::{ApiError, AppState};
use actix_multipart::{Field, Multipart};
use actix_web::{HttpResponse, web};
use futures_util::StreamExt;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, instrument};

#[derive(Debug, Serialize, Deserialize)]
pub struct SummarizeResponse {
    pub success: bool,
    pub summary: String,
    pub keywords: Vec<String>,
}

impl From<SummarizeResult> for SummarizeResponse {
    fn from(result: SummarizeResult) -> Self {
        Self {
            success: true,
            summary: result.summary,
            keywords: result.keywords,
        }
    }
}

#[instrument(skip(state, payload))]
pub async fn summarize(
    state: web::Data<AppState>,
    payload: Multipart,
) -> Result<HttpResponse, ApiError> {
    info!("Summarize request received");
    let request = read_form(payload, state.max_upload_bytes).await?;

    let result = state
        .summarization_service
        .summarize(request)
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to summarize");
            ApiError::from(e)
        })?;

    info!(chars = result.summary.chars().count(), "Summary produced");
    Ok(HttpResponse::Ok().json(SummarizeResponse::from(result)))
}

async fn read_form(mut payload: Multipart, limit: usize) -> Result<SummarizeRequest, ApiError> {
    let mut request = SummarizeRequest::default();

    while let Some(field) = payload.next().await {
        let field = field.map_err(invalid_form)?;
        let name = field.name().unwrap_or_default().to_string();
        let filename = field
            .content_disposition()
            .and_then(|cd| cd.get_filename())
            .map(str::to_string);
        let bytes = read_field(field, limit).await?;
        debug!(field = %name, size = bytes.len(), "Read form field");

        match name.as_str() {
            "file" => {
                if let Some(filename) = filename.filter(|f| !f.is_empty()) {
                    request.upload = Some(UploadedFile { filename, bytes });
                }
            }
            "text" => request.text = Some(field_text(&name, bytes)?),
            "format" => {
                if let Some(value) = non_blank(field_text(&name, bytes)?) {
                    request.format = OutputFormat::parse(&value);
                }
            }
            "language" => {
                request.language = non_blank(field_text(&name, bytes)?)
                    .unwrap_or_else(|| DEFAULT_LANGUAGE.to_string());
            }
            "length" => {
                if let Some(value) = non_blank(field_text(&name, bytes)?) {
                    request.length = LengthTier::parse(&value);
                }
            }
            _ => debug!(field = %name, "Ignoring unknown form field"),
        }
    }

    Ok(request)
}

async fn read_field(mut field: Field, limit: usize) -> Result<Vec<u8>, ApiError> {
    let mut bytes = Vec::new();
    while let Some(chunk) = field.next().await {
        let chunk = chunk.map_err(invalid_form)?;
        if bytes.len() + chunk.len() > limit {
            return Err(ApiError::Validation(format!(
                "Upload exceeds the {limit} byte limit."
            )));
        }
        bytes.extend_from_slice(&chunk);
    }
    Ok(bytes)
}

fn field_text(name: &str, bytes: Vec<u8>) -> Result<String, ApiError> {
    String::from_utf8(bytes)
        .map_err(|_| ApiError::Validation(format!("Form field '{name}' is not valid UTF-8.")))
}

fn non_blank(value: String) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn invalid_form(err: actix_multipart::MultipartError) -> ApiError {
    ApiError::Validation(format!("Invalid form data: {err}"))
}
