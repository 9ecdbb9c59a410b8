//! Client for the hosted inference API.
//!
//! Every call is a single POST to `{base_url}/{model}` with bearer auth. The
//! decoded JSON body is returned as-is; interpreting its shape is the
//! caller's job.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

pub const INFERENCE_TIMEOUT: Duration = Duration::from_secs(60);

const MODEL_LOADING_MARKER: &str = "is currently loading";

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("HUGGINGFACE_API_KEY is not configured")]
    MissingApiKey,
    #[error("Failed to build HTTP client: {0}")]
    Client(String),
    #[error("Request to {model} failed: {message}")]
    Transport { model: String, message: String },
    #[error("{model} returned {status}: {message}")]
    Status {
        model: String,
        status: StatusCode,
        message: String,
    },
    #[error("Could not decode reply from {model}: {message}")]
    Decode { model: String, message: String },
}

impl GatewayError {
    /// True when the remote reported that the model is still warming up.
    pub fn is_model_loading(&self) -> bool {
        matches!(self, GatewayError::Status { message, .. } if is_loading_message(message))
    }
}

pub fn is_loading_message(message: &str) -> bool {
    message.contains(MODEL_LOADING_MARKER)
}

#[async_trait]
pub trait InferenceGateway: Send + Sync {
    async fn query(&self, model: &str, payload: &Value) -> Result<Value, GatewayError>;
}

pub struct HuggingFaceClient {
    http: Client,
    base_url: String,
    api_key: Option<String>,
}

impl HuggingFaceClient {
    pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> Result<Self, GatewayError> {
        let http = Client::builder()
            .timeout(INFERENCE_TIMEOUT)
            .user_agent(concat!("summarize-api/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| GatewayError::Client(e.to_string()))?;

        Ok(Self {
            http,
            base_url: base_url.into(),
            api_key,
        })
    }

    fn endpoint(&self, model: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), model)
    }
}

#[async_trait]
impl InferenceGateway for HuggingFaceClient {
    #[instrument(skip(self, payload), fields(model = model))]
    async fn query(&self, model: &str, payload: &Value) -> Result<Value, GatewayError> {
        let api_key = self.api_key.as_deref().ok_or(GatewayError::MissingApiKey)?;

        info!("Querying inference model");
        let response = self
            .http
            .post(self.endpoint(model))
            .bearer_auth(api_key)
            .json(payload)
            .send()
            .await
            .map_err(|e| {
                warn!(error = %e, timeout = e.is_timeout(), "Inference request failed");
                GatewayError::Transport {
                    model: model.to_string(),
                    message: e.to_string(),
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = error_field(&body).unwrap_or(body);
            warn!(status = %status, message = %message, "Inference API returned an error status");
            return Err(GatewayError::Status {
                model: model.to_string(),
                status,
                message,
            });
        }

        let body: Value = response.json().await.map_err(|e| GatewayError::Decode {
            model: model.to_string(),
            message: e.to_string(),
        })?;
        debug!(reply = %body, "Inference reply received");
        Ok(body)
    }
}

/// Pulls `error` out of a JSON error body such as
/// `{"error": "Model x is currently loading", "estimated_time": 20.0}`.
fn error_field(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    value.get("error")?.as_str().map(str::to_string)
}
