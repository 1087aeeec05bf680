//! OpenAI-backed [`ModelProvider`] implementation.
//!
//! Three call styles are used, matching what each capability needs:
//! vision chat completions for images, the files + responses pair for
//! generic documents, and a schema-constrained responses call for
//! structured parsing.

use super::{ModelProvider, ProviderError};
use crate::config::Settings;
use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use reqwest::StatusCode;
use reqwest::multipart::{Form, Part};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::path::Path;
use tracing::{debug, info, warn};

/// Instruction sent with every text-extraction call.
const EXTRACTION_PROMPT: &str = "Extract ALL readable text from the attached document. \
     Return plain text only. Do not summarize.";

/// Instruction prefix for the translation completion.
const TRANSLATION_PROMPT: &str = "Translate the following text to English. \
     Return plain text only. Do not summarize or add commentary.";

/// Instructions for the structured-parsing call.
const PARSER_INSTRUCTIONS: &str = "You are an invoice extraction engine. \
     Return ONLY valid JSON. \
     Missing fields must be null. \
     Do not guess values. \
     For the 'type' field, only use 'CLIENT' or 'COMPANY' (or null if not present).";

/// Output-token cap applied to chat completions.
const MAX_OUTPUT_TOKENS: u32 = 2048;

/// Purpose tag for uploads to the provider file store.
const FILE_PURPOSE: &str = "assistants";

pub struct OpenAiProvider {
    http: reqwest::Client,
    api_key: Option<String>,
    model: String,
    base_url: String,
}

impl OpenAiProvider {
    pub fn new(settings: &Settings) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key: settings.api_key.clone(),
            model: settings.model.clone(),
            base_url: settings.base_url.clone(),
        }
    }

    /// The key is checked before any request is constructed.
    fn require_key(&self) -> Result<&str, ProviderError> {
        self.api_key.as_deref().ok_or(ProviderError::MissingApiKey)
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    /// Send a chat completion, retrying once with the legacy `max_tokens`
    /// parameter when a deployment rejects `max_completion_tokens`.
    async fn send_chat(
        &self,
        key: &str,
        mut request: ChatRequest<'_>,
    ) -> Result<String, ProviderError> {
        let response = self
            .http
            .post(self.endpoint("chat/completions"))
            .bearer_auth(key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return read_chat_output(response).await;
        }

        let body = response.text().await.unwrap_or_default();
        if status == StatusCode::BAD_REQUEST
            && request.max_completion_tokens.is_some()
            && rejects_completion_token_param(&body)
        {
            warn!("provider rejected max_completion_tokens, retrying once with legacy max_tokens");
            request.max_tokens = request.max_completion_tokens.take();

            let retry = self
                .http
                .post(self.endpoint("chat/completions"))
                .bearer_auth(key)
                .json(&request)
                .send()
                .await?;

            let retry_status = retry.status();
            if retry_status.is_success() {
                return read_chat_output(retry).await;
            }
            let retry_body = retry.text().await.unwrap_or_default();
            return Err(api_error(retry_status, retry_body));
        }

        Err(api_error(status, body))
    }

    /// Send a responses-API call and pull out its output text.
    async fn send_responses(&self, key: &str, body: Value) -> Result<String, ProviderError> {
        let response = self
            .http
            .post(self.endpoint("responses"))
            .bearer_auth(key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(api_error(status, body));
        }

        let payload: Value = response.json().await?;
        extract_output_text(&payload).ok_or(ProviderError::EmptyOutput { call: "responses" })
    }

    /// Upload raw bytes to the provider file store, returning the file id.
    async fn upload_file(
        &self,
        key: &str,
        filename: &str,
        bytes: &[u8],
    ) -> Result<String, ProviderError> {
        let part = Part::bytes(bytes.to_vec()).file_name(filename.to_string());
        let form = Form::new().part("file", part).text("purpose", FILE_PURPOSE);

        let response = self
            .http
            .post(self.endpoint("files"))
            .bearer_auth(key)
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(api_error(status, body));
        }

        let upload: FileUploadResponse = response.json().await?;
        debug!(file_id = %upload.id, "uploaded document to provider file store");
        Ok(upload.id)
    }
}

#[async_trait]
impl ModelProvider for OpenAiProvider {
    fn name(&self) -> &str {
        "openai"
    }

    async fn image_text(&self, filename: &str, bytes: &[u8]) -> Result<String, ProviderError> {
        let key = self.require_key()?;
        info!(filename, size = bytes.len(), "extracting text from image");

        let data_url = image_data_url(filename, bytes);
        let request = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: ChatContent::Parts(vec![
                    ChatPart::Text {
                        text: EXTRACTION_PROMPT,
                    },
                    ChatPart::ImageUrl {
                        image_url: ImageUrl { url: data_url },
                    },
                ]),
            }],
            temperature: 0.0,
            max_completion_tokens: Some(MAX_OUTPUT_TOKENS),
            max_tokens: None,
        };

        self.send_chat(key, request).await
    }

    async fn document_text(&self, filename: &str, bytes: &[u8]) -> Result<String, ProviderError> {
        let key = self.require_key()?;
        let file_id = self.upload_file(key, filename, bytes).await?;
        info!(filename, %file_id, "extracting text from document");

        let body = json!({
            "model": self.model,
            "input": [{
                "role": "user",
                "content": [
                    { "type": "input_text", "text": EXTRACTION_PROMPT },
                    { "type": "input_file", "file_id": file_id },
                ],
            }],
            "temperature": 0.0,
        });

        self.send_responses(key, body).await
    }

    async fn translate_to_english(&self, text: &str) -> Result<String, ProviderError> {
        let key = self.require_key()?;
        info!(chars = text.len(), "translating extracted text to English");

        let prompt = format!("{}\n\n{}", TRANSLATION_PROMPT, text);
        let request = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: ChatContent::Text(&prompt),
            }],
            temperature: 0.0,
            max_completion_tokens: Some(MAX_OUTPUT_TOKENS),
            max_tokens: None,
        };

        self.send_chat(key, request).await
    }

    async fn structured_invoice(
        &self,
        text: &str,
        schema: &Value,
    ) -> Result<Value, ProviderError> {
        let key = self.require_key()?;
        info!(chars = text.len(), "requesting structured invoice");

        let body = json!({
            "model": self.model,
            "input": text,
            "instructions": PARSER_INSTRUCTIONS,
            "text": {
                "format": {
                    "type": "json_schema",
                    "name": "invoice",
                    "schema": schema,
                }
            },
            "temperature": 0.0,
        });

        let output = self.send_responses(key, body).await?;
        Ok(serde_json::from_str(&output)?)
    }
}

// ── Chat completion wire types ──────────────────────────────────────────────

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_completion_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: ChatContent<'a>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum ChatContent<'a> {
    Text(&'a str),
    Parts(Vec<ChatPart<'a>>),
}

#[derive(Serialize)]
#[serde(tag = "type")]
enum ChatPart<'a> {
    #[serde(rename = "text")]
    Text { text: &'a str },
    #[serde(rename = "image_url")]
    ImageUrl { image_url: ImageUrl },
}

#[derive(Serialize)]
struct ImageUrl {
    url: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct FileUploadResponse {
    id: String,
}

#[derive(Deserialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct ErrorDetail {
    message: String,
    param: Option<String>,
}

// ── Helpers ─────────────────────────────────────────────────────────────────

async fn read_chat_output(response: reqwest::Response) -> Result<String, ProviderError> {
    let chat: ChatResponse = response.json().await?;
    chat.choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .filter(|text| !text.is_empty())
        .ok_or(ProviderError::EmptyOutput {
            call: "chat/completions",
        })
}

fn api_error(status: StatusCode, body: String) -> ProviderError {
    let message = serde_json::from_str::<ErrorBody>(&body)
        .map(|parsed| parsed.error.message)
        .unwrap_or(body);
    ProviderError::Api {
        status: status.as_u16(),
        message,
    }
}

/// Pull the output text out of a responses-API payload.
///
/// The text lives in `output[].content[]` entries typed `output_text`; some
/// gateways also expose a top-level `output_text` convenience field, used as
/// a fallback.
fn extract_output_text(payload: &Value) -> Option<String> {
    let mut collected = String::new();
    if let Some(output) = payload.get("output").and_then(Value::as_array) {
        for entry in output {
            if let Some(content) = entry.get("content").and_then(Value::as_array) {
                for part in content {
                    if part.get("type").and_then(Value::as_str) == Some("output_text") {
                        if let Some(text) = part.get("text").and_then(Value::as_str) {
                            collected.push_str(text);
                        }
                    }
                }
            }
        }
    }
    if collected.is_empty() {
        if let Some(text) = payload.get("output_text").and_then(Value::as_str) {
            collected.push_str(text);
        }
    }
    (!collected.is_empty()).then_some(collected)
}

/// Detect the one known incompatibility: a deployment rejecting the
/// `max_completion_tokens` parameter name.
fn rejects_completion_token_param(body: &str) -> bool {
    match serde_json::from_str::<ErrorBody>(body) {
        Ok(parsed) => {
            parsed.error.param.as_deref() == Some("max_completion_tokens")
                || parsed.error.message.contains("max_completion_tokens")
        }
        Err(_) => body.contains("max_completion_tokens"),
    }
}

fn image_mime(filename: &str) -> &'static str {
    let extension = Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase());
    match extension.as_deref() {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        _ => "image/png",
    }
}

fn image_data_url(filename: &str, bytes: &[u8]) -> String {
    format!("data:{};base64,{}", image_mime(filename), BASE64.encode(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;

    fn provider_without_key() -> OpenAiProvider {
        let settings = Settings::from_lookup(|_| None).expect("defaults should parse");
        OpenAiProvider::new(&settings)
    }

    // ── Provider identity ────────────────────────────────────────────────

    #[test]
    fn test_provider_reports_openai_name() {
        assert_eq!(provider_without_key().name(), "openai");
    }

    // ── Missing key fails before any request ────────────────────────────

    #[tokio::test]
    async fn test_image_text_without_key_fails_immediately() {
        let provider = provider_without_key();
        let err = provider
            .image_text("invoice.png", b"fake image bytes")
            .await
            .expect_err("missing key must fail");
        assert!(matches!(err, ProviderError::MissingApiKey));
    }

    #[tokio::test]
    async fn test_structured_invoice_without_key_fails_immediately() {
        let provider = provider_without_key();
        let err = provider
            .structured_invoice("some invoice text", &json!({"type": "object"}))
            .await
            .expect_err("missing key must fail");
        assert!(matches!(err, ProviderError::MissingApiKey));
    }

    // ── Chat request serialization ───────────────────────────────────────

    #[test]
    fn test_chat_request_serializes_modern_token_param_only() {
        let request = ChatRequest {
            model: "gpt-4o",
            messages: vec![ChatMessage {
                role: "user",
                content: ChatContent::Text("hello"),
            }],
            temperature: 0.0,
            max_completion_tokens: Some(2048),
            max_tokens: None,
        };

        let value = serde_json::to_value(&request).expect("should serialize");
        assert_eq!(value["max_completion_tokens"], 2048);
        assert!(value.get("max_tokens").is_none());
        assert_eq!(value["messages"][0]["content"], "hello");
        assert_eq!(value["temperature"], 0.0);
    }

    #[test]
    fn test_chat_request_legacy_param_after_swap() {
        let mut request = ChatRequest {
            model: "gpt-4o",
            messages: vec![],
            temperature: 0.0,
            max_completion_tokens: Some(2048),
            max_tokens: None,
        };
        request.max_tokens = request.max_completion_tokens.take();

        let value = serde_json::to_value(&request).expect("should serialize");
        assert_eq!(value["max_tokens"], 2048);
        assert!(value.get("max_completion_tokens").is_none());
    }

    #[test]
    fn test_image_message_serializes_typed_parts() {
        let message = ChatMessage {
            role: "user",
            content: ChatContent::Parts(vec![
                ChatPart::Text { text: "read this" },
                ChatPart::ImageUrl {
                    image_url: ImageUrl {
                        url: "data:image/png;base64,QUJD".to_string(),
                    },
                },
            ]),
        };

        let value = serde_json::to_value(&message).expect("should serialize");
        assert_eq!(value["content"][0]["type"], "text");
        assert_eq!(value["content"][1]["type"], "image_url");
        assert_eq!(
            value["content"][1]["image_url"]["url"],
            "data:image/png;base64,QUJD"
        );
    }

    // ── Token-param rejection detection ──────────────────────────────────

    #[test]
    fn test_rejection_detected_from_param_field() {
        let body = r#"{"error":{"message":"Unsupported parameter","param":"max_completion_tokens","type":"invalid_request_error"}}"#;
        assert!(rejects_completion_token_param(body));
    }

    #[test]
    fn test_rejection_detected_from_message_text() {
        let body = r#"{"error":{"message":"Unknown argument: 'max_completion_tokens'"}}"#;
        assert!(rejects_completion_token_param(body));
    }

    #[test]
    fn test_other_bad_request_is_not_a_rejection() {
        let body = r#"{"error":{"message":"model not found","param":"model"}}"#;
        assert!(!rejects_completion_token_param(body));
    }

    #[test]
    fn test_non_json_body_falls_back_to_substring() {
        assert!(rejects_completion_token_param(
            "max_completion_tokens is not supported"
        ));
        assert!(!rejects_completion_token_param("internal server error"));
    }

    // ── Responses output extraction ──────────────────────────────────────

    #[test]
    fn test_extract_output_text_from_output_array() {
        let payload = json!({
            "output": [{
                "type": "message",
                "content": [
                    { "type": "output_text", "text": "Invoice No 17\n" },
                    { "type": "output_text", "text": "Total 120.00" }
                ]
            }]
        });
        assert_eq!(
            extract_output_text(&payload).as_deref(),
            Some("Invoice No 17\nTotal 120.00")
        );
    }

    #[test]
    fn test_extract_output_text_top_level_fallback() {
        let payload = json!({ "output_text": "plain text output" });
        assert_eq!(
            extract_output_text(&payload).as_deref(),
            Some("plain text output")
        );
    }

    #[test]
    fn test_extract_output_text_empty_payload() {
        assert_eq!(extract_output_text(&json!({})), None);
        assert_eq!(extract_output_text(&json!({ "output": [] })), None);
    }

    // ── Image data URLs ──────────────────────────────────────────────────

    #[test]
    fn test_image_data_url_mime_by_extension() {
        assert!(image_data_url("scan.jpg", b"abc").starts_with("data:image/jpeg;base64,"));
        assert!(image_data_url("scan.JPEG", b"abc").starts_with("data:image/jpeg;base64,"));
        assert!(image_data_url("scan.png", b"abc").starts_with("data:image/png;base64,"));
    }

    #[test]
    fn test_image_data_url_encodes_bytes() {
        assert_eq!(
            image_data_url("x.png", b"ABC"),
            "data:image/png;base64,QUJD"
        );
    }

    // ── Upstream error body parsing ──────────────────────────────────────

    #[test]
    fn test_api_error_prefers_parsed_message() {
        let err = api_error(
            StatusCode::TOO_MANY_REQUESTS,
            r#"{"error":{"message":"rate limited"}}"#.to_string(),
        );
        match err {
            ProviderError::Api { status, message } => {
                assert_eq!(status, 429);
                assert_eq!(message, "rate limited");
            }
            other => panic!("expected Api error, got {:?}", other),
        }
    }

    #[test]
    fn test_api_error_keeps_raw_body_when_unparseable() {
        let err = api_error(StatusCode::BAD_GATEWAY, "<html>bad gateway</html>".to_string());
        match err {
            ProviderError::Api { status, message } => {
                assert_eq!(status, 502);
                assert!(message.contains("bad gateway"));
            }
            other => panic!("expected Api error, got {:?}", other),
        }
    }
}
