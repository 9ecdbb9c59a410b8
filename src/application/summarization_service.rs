use crate::domain::error::DomainError;
use crate::domain::summary::{
    DEFAULT_LANGUAGE, LengthBounds, SummarizeRequest, SummarizeResult, UploadedFile,
};
use crate::infrastructure::extractor::extract_text;
use crate::infrastructure::inference::{GatewayError, InferenceGateway, is_loading_message};
use anyhow::Result;
use serde_json::{Value, json};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

pub const SUMMARIZATION_MODEL: &str = "facebook/bart-large-cnn";
const TRANSLATION_MODEL_PREFIX: &str = "Helsinki-NLP/opus-mt-en-";

pub const NO_INPUT: &str = "Could not find or read any text from the provided source.";
pub const MODEL_STARTING: &str = "The AI model is starting up. Please try again in a moment.";
const UNEXPECTED_REPLY: &str = "Received an unexpected response from the AI model.";
const NETWORK_FAILURE: &str = "A network error occurred while contacting the AI model.";

// Content-derived keywords are not implemented; the response carries this pair.
const PLACEHOLDER_KEYWORDS: [&str; 2] = ["AI", "Summary"];

/// How a model reply was interpreted.
#[derive(Debug, PartialEq)]
enum ModelReply {
    Text(String),
    Error(String),
    Malformed,
}

impl ModelReply {
    /// Accepts `[{"<field>": "..."}, ...]`; recognises a non-empty `{"error": "..."}`.
    fn classify(value: &Value, field: &str) -> Self {
        if let Some(text) = value
            .as_array()
            .and_then(|items| items.first())
            .and_then(|first| first.get(field))
            .and_then(Value::as_str)
        {
            return ModelReply::Text(text.to_string());
        }
        match value
            .get("error")
            .and_then(Value::as_str)
            .filter(|message| !message.trim().is_empty())
        {
            Some(message) => ModelReply::Error(message.to_string()),
            None => ModelReply::Malformed,
        }
    }
}

pub struct SummarizationService {
    gateway: Arc<dyn InferenceGateway>,
}

impl SummarizationService {
    pub fn new(gateway: Arc<dyn InferenceGateway>) -> Self {
        Self { gateway }
    }

    #[instrument(skip(self, req), fields(format = ?req.format, language = %req.language, length = ?req.length))]
    pub async fn summarize(&self, req: SummarizeRequest) -> Result<SummarizeResult> {
        let input = resolve_input(req.text.as_deref(), req.upload.as_ref())?;
        let bounds = req.length.bounds();
        info!(
            chars = input.chars().count(),
            min_length = bounds.min_length,
            max_length = bounds.max_length,
            "Summarizing input"
        );

        let summary = self.summarize_stage(&input, bounds).await?;
        let summary = self.translate_stage(summary, &req.language).await;
        let summary = req.format.apply(&summary);

        Ok(SummarizeResult {
            summary,
            keywords: PLACEHOLDER_KEYWORDS.iter().map(|k| k.to_string()).collect(),
        })
    }

    /// Any failure here fails the request.
    async fn summarize_stage(&self, input: &str, bounds: LengthBounds) -> Result<String> {
        let payload = json!({
            "inputs": input,
            "parameters": {
                "min_length": bounds.min_length,
                "max_length": bounds.max_length,
            }
        });

        let reply = match self.gateway.query(SUMMARIZATION_MODEL, &payload).await {
            Ok(reply) => reply,
            Err(e) => return Err(gateway_failure(e).into()),
        };

        match ModelReply::classify(&reply, "summary_text") {
            ModelReply::Text(summary) => {
                debug!(chars = summary.chars().count(), "Summary received");
                Ok(summary)
            }
            ModelReply::Error(message) if is_loading_message(&message) => {
                warn!(message = %message, "Summarization model is loading");
                Err(DomainError::ModelLoading(MODEL_STARTING.to_string()).into())
            }
            ModelReply::Error(message) => Err(DomainError::Upstream(message).into()),
            ModelReply::Malformed => {
                warn!(reply = %reply, "Unexpected summarization reply shape");
                Err(DomainError::Upstream(UNEXPECTED_REPLY.to_string()).into())
            }
        }
    }

    /// Never fails: on any problem the untranslated summary is kept.
    async fn translate_stage(&self, summary: String, language: &str) -> String {
        if language == DEFAULT_LANGUAGE {
            return summary;
        }
        let Some(model) = translation_model(language) else {
            warn!(language = language, "Ignoring invalid language code");
            return summary;
        };

        let payload = json!({ "inputs": summary });
        match self.gateway.query(&model, &payload).await {
            Ok(reply) => match ModelReply::classify(&reply, "translation_text") {
                ModelReply::Text(translated) => {
                    debug!(model = %model, "Translation received");
                    translated
                }
                other => {
                    warn!(model = %model, reply = ?other, "Translation reply unusable; keeping original");
                    summary
                }
            },
            Err(e) => {
                warn!(model = %model, error = %e, "Translation failed; keeping original");
                summary
            }
        }
    }
}

/// Upload wins over the text field when it yields non-blank text.
fn resolve_input(text: Option<&str>, upload: Option<&UploadedFile>) -> Result<String, DomainError> {
    let from_upload = upload
        .filter(|file| !file.filename.is_empty())
        .and_then(|file| {
            debug!(filename = %file.filename, "Processing uploaded file");
            extract_text(&file.filename, &file.bytes)
        });

    from_upload
        .into_iter()
        .chain(text.map(str::to_string))
        .find(|candidate| !candidate.trim().is_empty())
        .ok_or_else(|| DomainError::Validation(NO_INPUT.to_string()))
}

/// `Helsinki-NLP/opus-mt-en-<code>`; `None` if the code could escape the URL path.
fn translation_model(language: &str) -> Option<String> {
    let valid = !language.is_empty()
        && language
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    valid.then(|| format!("{TRANSLATION_MODEL_PREFIX}{language}"))
}

fn gateway_failure(error: GatewayError) -> DomainError {
    if error.is_model_loading() {
        warn!(error = %error, "Summarization model is loading");
        return DomainError::ModelLoading(MODEL_STARTING.to_string());
    }
    warn!(error = %error, "Summarization request failed");
    match error {
        GatewayError::MissingApiKey | GatewayError::Client(_) => {
            DomainError::Internal(format!("A server error occurred: {error}"))
        }
        _ => DomainError::Upstream(NETWORK_FAILURE.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::summary::{LengthTier, OutputFormat};
    use async_trait::async_trait;
    use reqwest::StatusCode;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Replays canned replies in order and records every call.
    #[derive(Default)]
    struct ScriptedGateway {
        replies: Mutex<VecDeque<Result<Value, GatewayError>>>,
        calls: Mutex<Vec<(String, Value)>>,
    }

    impl ScriptedGateway {
        fn with(replies: Vec<Result<Value, GatewayError>>) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(replies.into()),
                calls: Mutex::default(),
            })
        }

        fn calls(&self) -> Vec<(String, Value)> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl InferenceGateway for ScriptedGateway {
        async fn query(&self, model: &str, payload: &Value) -> Result<Value, GatewayError> {
            self.calls
                .lock()
                .unwrap()
                .push((model.to_string(), payload.clone()));
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .expect("unexpected gateway call")
        }
    }

    fn text_request(text: &str) -> SummarizeRequest {
        SummarizeRequest {
            text: Some(text.to_string()),
            ..Default::default()
        }
    }

    fn summary_reply(text: &str) -> Result<Value, GatewayError> {
        Ok(json!([{ "summary_text": text }]))
    }

    fn domain_error(err: &anyhow::Error) -> &DomainError {
        err.downcast_ref::<DomainError>().expect("domain error")
    }

    #[tokio::test]
    async fn test_summarize_returns_summary_and_placeholder_keywords() {
        let gateway = ScriptedGateway::with(vec![summary_reply("Short version.")]);
        let service = SummarizationService::new(gateway.clone());

        let result = service.summarize(text_request("Long text.")).await.unwrap();

        assert_eq!(result.summary, "Short version.");
        assert_eq!(result.keywords, vec!["AI", "Summary"]);
        let calls = gateway.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, SUMMARIZATION_MODEL);
        assert_eq!(calls[0].1["inputs"], "Long text.");
    }

    #[tokio::test]
    async fn test_length_tiers_reach_the_model() {
        for (tier, min, max) in [("1", 30, 80), ("2", 80, 150), ("3", 150, 300), ("9", 80, 150)] {
            let gateway = ScriptedGateway::with(vec![summary_reply("ok")]);
            let service = SummarizationService::new(gateway.clone());

            service
                .summarize(SummarizeRequest {
                    length: LengthTier::parse(tier),
                    ..text_request("input")
                })
                .await
                .unwrap();

            let payload = &gateway.calls()[0].1;
            assert_eq!(payload["parameters"]["min_length"], min, "tier {tier}");
            assert_eq!(payload["parameters"]["max_length"], max, "tier {tier}");
        }
    }

    #[tokio::test]
    async fn test_missing_input_is_validation_error_without_calls() {
        let gateway = ScriptedGateway::with(vec![]);
        let service = SummarizationService::new(gateway.clone());

        for req in [
            SummarizeRequest::default(),
            text_request("   \n\t"),
            SummarizeRequest {
                upload: Some(UploadedFile {
                    filename: "slides.pptx".to_string(),
                    bytes: b"binary".to_vec(),
                }),
                ..Default::default()
            },
        ] {
            let err = service.summarize(req).await.unwrap_err();
            assert!(matches!(domain_error(&err), DomainError::Validation(m) if m == NO_INPUT));
        }
        assert!(gateway.calls().is_empty());
    }

    #[tokio::test]
    async fn test_upload_preferred_over_text() {
        let gateway = ScriptedGateway::with(vec![summary_reply("ok")]);
        let service = SummarizationService::new(gateway.clone());

        service
            .summarize(SummarizeRequest {
                text: Some("from the text field".to_string()),
                upload: Some(UploadedFile {
                    filename: "notes.txt".to_string(),
                    bytes: b"from the file".to_vec(),
                }),
                ..Default::default()
            })
            .await
            .unwrap();

        assert_eq!(gateway.calls()[0].1["inputs"], "from the file");
    }

    #[tokio::test]
    async fn test_unreadable_upload_falls_back_to_text() {
        let gateway = ScriptedGateway::with(vec![summary_reply("ok")]);
        let service = SummarizationService::new(gateway.clone());

        service
            .summarize(SummarizeRequest {
                text: Some("fallback text".to_string()),
                upload: Some(UploadedFile {
                    filename: "broken.pdf".to_string(),
                    bytes: b"garbage".to_vec(),
                }),
                ..Default::default()
            })
            .await
            .unwrap();

        assert_eq!(gateway.calls()[0].1["inputs"], "fallback text");
    }

    #[tokio::test]
    async fn test_loading_error_body_maps_to_model_loading() {
        let gateway = ScriptedGateway::with(vec![Ok(json!({
            "error": "Model facebook/bart-large-cnn is currently loading",
            "estimated_time": 20.0
        }))]);
        let service = SummarizationService::new(gateway);

        let err = service.summarize(text_request("text")).await.unwrap_err();

        assert!(matches!(domain_error(&err), DomainError::ModelLoading(m) if m == MODEL_STARTING));
    }

    #[tokio::test]
    async fn test_loading_status_maps_to_model_loading() {
        let gateway = ScriptedGateway::with(vec![Err(GatewayError::Status {
            model: SUMMARIZATION_MODEL.to_string(),
            status: StatusCode::SERVICE_UNAVAILABLE,
            message: "Model facebook/bart-large-cnn is currently loading".to_string(),
        })]);
        let service = SummarizationService::new(gateway);

        let err = service.summarize(text_request("text")).await.unwrap_err();

        assert!(matches!(domain_error(&err), DomainError::ModelLoading(_)));
    }

    #[tokio::test]
    async fn test_other_upstream_errors_are_upstream_failures() {
        let gateway = ScriptedGateway::with(vec![Ok(json!({ "error": "Input too long" }))]);
        let err = SummarizationService::new(gateway)
            .summarize(text_request("text"))
            .await
            .unwrap_err();
        assert!(matches!(domain_error(&err), DomainError::Upstream(m) if m == "Input too long"));

        let gateway = ScriptedGateway::with(vec![Err(GatewayError::Transport {
            model: SUMMARIZATION_MODEL.to_string(),
            message: "operation timed out".to_string(),
        })]);
        let err = SummarizationService::new(gateway)
            .summarize(text_request("text"))
            .await
            .unwrap_err();
        assert!(matches!(domain_error(&err), DomainError::Upstream(m) if m == NETWORK_FAILURE));
    }

    #[tokio::test]
    async fn test_malformed_summary_reply_is_upstream_failure() {
        for reply in [
            json!([]),
            json!([{ "generated_text": "x" }]),
            json!({ "ok": true }),
            json!({ "error": "" }),
        ] {
            let gateway = ScriptedGateway::with(vec![Ok(reply)]);
            let err = SummarizationService::new(gateway)
                .summarize(text_request("text"))
                .await
                .unwrap_err();
            assert!(matches!(domain_error(&err), DomainError::Upstream(m) if m == UNEXPECTED_REPLY));
        }
    }

    #[tokio::test]
    async fn test_missing_api_key_is_internal_error() {
        let gateway = ScriptedGateway::with(vec![Err(GatewayError::MissingApiKey)]);
        let err = SummarizationService::new(gateway)
            .summarize(text_request("text"))
            .await
            .unwrap_err();
        assert!(matches!(domain_error(&err), DomainError::Internal(_)));
    }

    #[tokio::test]
    async fn test_translation_replaces_summary() {
        let gateway = ScriptedGateway::with(vec![
            summary_reply("The cat sleeps."),
            Ok(json!([{ "translation_text": "Le chat dort." }])),
        ]);
        let service = SummarizationService::new(gateway.clone());

        let result = service
            .summarize(SummarizeRequest {
                language: "fr".to_string(),
                ..text_request("text")
            })
            .await
            .unwrap();

        assert_eq!(result.summary, "Le chat dort.");
        let calls = gateway.calls();
        assert_eq!(calls[1].0, "Helsinki-NLP/opus-mt-en-fr");
        assert_eq!(calls[1].1, json!({ "inputs": "The cat sleeps." }));
    }

    #[tokio::test]
    async fn test_translation_failures_keep_original_summary() {
        let failures = vec![
            Ok(json!({ "error": "Model Helsinki-NLP/opus-mt-en-xx does not exist" })),
            Ok(json!([])),
            Err(GatewayError::Transport {
                model: "Helsinki-NLP/opus-mt-en-de".to_string(),
                message: "connection reset".to_string(),
            }),
        ];
        for failure in failures {
            let gateway = ScriptedGateway::with(vec![summary_reply("Original."), failure]);
            let result = SummarizationService::new(gateway)
                .summarize(SummarizeRequest {
                    language: "de".to_string(),
                    ..text_request("text")
                })
                .await
                .unwrap();
            assert_eq!(result.summary, "Original.");
        }
    }

    #[tokio::test]
    async fn test_invalid_language_code_skips_translation() {
        let gateway = ScriptedGateway::with(vec![summary_reply("Original.")]);
        let service = SummarizationService::new(gateway.clone());

        let result = service
            .summarize(SummarizeRequest {
                language: "../../admin".to_string(),
                ..text_request("text")
            })
            .await
            .unwrap();

        assert_eq!(result.summary, "Original.");
        assert_eq!(gateway.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_format_applied_after_translation() {
        let gateway = ScriptedGateway::with(vec![
            summary_reply("One. Two."),
            Ok(json!([{ "translation_text": "Uno. Dos." }])),
        ]);
        let result = SummarizationService::new(gateway)
            .summarize(SummarizeRequest {
                language: "es".to_string(),
                format: OutputFormat::BulletPoints,
                ..text_request("text")
            })
            .await
            .unwrap();

        assert_eq!(result.summary, "• Uno\n• Dos");
    }

    #[test]
    fn test_classify_reply_shapes() {
        assert_eq!(
            ModelReply::classify(&json!([{ "summary_text": "s" }]), "summary_text"),
            ModelReply::Text("s".to_string())
        );
        assert_eq!(
            ModelReply::classify(&json!({ "error": "boom" }), "summary_text"),
            ModelReply::Error("boom".to_string())
        );
        assert_eq!(
            ModelReply::classify(&json!([{ "summary_text": 3 }]), "summary_text"),
            ModelReply::Malformed
        );
        assert_eq!(ModelReply::classify(&Value::Null, "summary_text"), ModelReply::Malformed);
        assert_eq!(
            ModelReply::classify(&json!({ "error": "" }), "summary_text"),
            ModelReply::Malformed
        );
    }
}
