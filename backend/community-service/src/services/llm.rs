// ============================================
// Generative model providers
// ============================================
//
// One trait in front of Gemini and the OpenAI-compatible chat APIs (OpenAI,
// DeepSeek). Used for recipe generation and content moderation. Calls are
// single-shot: the shared reqwest client carries the request timeout and
// nothing is retried.

use async_trait::async_trait;
use reqwest::Client as HttpClient;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("{provider} API key is not configured")]
    MissingApiKey { provider: &'static str },

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("response had no text content")]
    EmptyResponse,
}

pub type LlmResult<T> = std::result::Result<T, LlmError>;

/// Base64 image payload for vision prompts
#[derive(Debug, Clone, PartialEq)]
pub struct InlineImage {
    pub mime_type: String,
    /// Base64 (standard alphabet) encoded bytes
    pub data: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub system: Option<String>,
    pub prompt: String,
    pub image: Option<InlineImage>,
    pub temperature: f32,
    pub max_tokens: u32,
    /// Ask the provider for a JSON-only answer where supported
    pub json_output: bool,
}

impl CompletionRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            system: None,
            prompt: prompt.into(),
            image: None,
            temperature: 0.2,
            max_tokens: 2048,
            json_output: false,
        }
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    pub fn with_image(mut self, image: InlineImage) -> Self {
        self.image = Some(image);
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn json(mut self) -> Self {
        self.json_output = true;
        self
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Run a single completion and return the raw text reply
    async fn complete(&self, request: CompletionRequest) -> LlmResult<String>;

    /// Provider name for logs and metrics
    fn name(&self) -> &'static str;
}

/// Shared HTTP client for every provider
pub fn build_http_client(timeout_secs: u64) -> LlmResult<HttpClient> {
    Ok(HttpClient::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()?)
}

async fn read_error(response: reqwest::Response) -> LlmError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    LlmError::Http { status, body }
}

// ============================================
// Gemini Provider
// ============================================

const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

pub struct GeminiProvider {
    client: HttpClient,
    api_key: Option<String>,
    model: String,
    base_url: String,
}

impl GeminiProvider {
    pub fn new(client: HttpClient, api_key: Option<String>, model: &str) -> Self {
        Self {
            client,
            api_key,
            model: model.to_string(),
            base_url: GEMINI_BASE_URL.to_string(),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<GeminiContent>,
    contents: Vec<GeminiContent>,
    generation_config: GeminiGenerationConfig,
}

#[derive(Serialize, Deserialize)]
struct GeminiContent {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiPart {
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    inline_data: Option<GeminiInlineData>,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiInlineData {
    mime_type: String,
    data: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiGenerationConfig {
    temperature: f32,
    max_output_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<&'static str>,
}

#[derive(Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiContent>,
}

impl GeminiRequest {
    fn from_completion(request: CompletionRequest) -> Self {
        let mut parts = vec![GeminiPart {
            text: Some(request.prompt),
            inline_data: None,
        }];
        if let Some(image) = request.image {
            parts.push(GeminiPart {
                text: None,
                inline_data: Some(GeminiInlineData {
                    mime_type: image.mime_type,
                    data: image.data,
                }),
            });
        }

        Self {
            system_instruction: request.system.map(|text| GeminiContent {
                role: None,
                parts: vec![GeminiPart {
                    text: Some(text),
                    inline_data: None,
                }],
            }),
            contents: vec![GeminiContent {
                role: Some("user".to_string()),
                parts,
            }],
            generation_config: GeminiGenerationConfig {
                temperature: request.temperature,
                max_output_tokens: request.max_tokens,
                response_mime_type: request.json_output.then_some("application/json"),
            },
        }
    }
}

#[async_trait]
impl LlmProvider for GeminiProvider {
    async fn complete(&self, request: CompletionRequest) -> LlmResult<String> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(LlmError::MissingApiKey { provider: "gemini" })?;

        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);
        debug!(model = %self.model, has_image = request.image.is_some(), "Calling Gemini");

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", api_key)
            .json(&GeminiRequest::from_completion(request))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(read_error(response).await);
        }

        let result: GeminiResponse = response.json().await?;
        let text: String = result
            .candidates
            .into_iter()
            .filter_map(|c| c.content)
            .flat_map(|c| c.parts)
            .filter_map(|p| p.text)
            .collect();

        if text.trim().is_empty() {
            return Err(LlmError::EmptyResponse);
        }
        Ok(text)
    }

    fn name(&self) -> &'static str {
        "gemini"
    }
}

// ============================================
// OpenAI-compatible Provider (OpenAI, DeepSeek)
// ============================================

pub struct OpenAiCompatibleProvider {
    client: HttpClient,
    name: &'static str,
    api_key: Option<String>,
    model: String,
    endpoint: String,
}

impl OpenAiCompatibleProvider {
    pub fn openai(client: HttpClient, api_key: Option<String>, model: &str) -> Self {
        Self {
            client,
            name: "openai",
            api_key,
            model: model.to_string(),
            endpoint: "https://api.openai.com/v1/chat/completions".to_string(),
        }
    }

    pub fn deepseek(client: HttpClient, api_key: Option<String>, model: &str) -> Self {
        Self {
            client,
            name: "deepseek",
            api_key,
            model: model.to_string(),
            endpoint: "https://api.deepseek.com/v1/chat/completions".to_string(),
        }
    }
}

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Serialize)]
struct ChatMessage {
    role: &'static str,
    content: ChatContent,
}

#[derive(Serialize)]
#[serde(untagged)]
enum ChatContent {
    Text(String),
    Parts(Vec<ChatPart>),
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ChatPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Serialize)]
struct ImageUrl {
    url: String,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
}

impl ChatRequest {
    fn from_completion(model: &str, request: CompletionRequest) -> Self {
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = request.system {
            messages.push(ChatMessage {
                role: "system",
                content: ChatContent::Text(system),
            });
        }

        let content = match request.image {
            Some(image) => ChatContent::Parts(vec![
                ChatPart::Text {
                    text: request.prompt,
                },
                ChatPart::ImageUrl {
                    image_url: ImageUrl {
                        url: format!("data:{};base64,{}", image.mime_type, image.data),
                    },
                },
            ]),
            None => ChatContent::Text(request.prompt),
        };
        messages.push(ChatMessage {
            role: "user",
            content,
        });

        Self {
            model: model.to_string(),
            messages,
            temperature: request.temperature,
            max_tokens: request.max_tokens,
            response_format: request
                .json_output
                .then_some(ResponseFormat { kind: "json_object" }),
        }
    }
}

#[async_trait]
impl LlmProvider for OpenAiCompatibleProvider {
    async fn complete(&self, request: CompletionRequest) -> LlmResult<String> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(LlmError::MissingApiKey { provider: self.name })?;

        debug!(provider = self.name, model = %self.model, "Calling chat completions");

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(api_key)
            .json(&ChatRequest::from_completion(&self.model, request))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(read_error(response).await);
        }

        let result: ChatResponse = response.json().await?;
        result
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|text| !text.trim().is_empty())
            .ok_or(LlmError::EmptyResponse)
    }

    fn name(&self) -> &'static str {
        self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    #[test]
    fn test_gemini_request_shape() {
        let request = CompletionRequest::new("Is this ok?")
            .with_system("You are a moderator")
            .with_image(InlineImage {
                mime_type: "image/png".into(),
                data: "aGVsbG8=".into(),
            })
            .json();

        let body = serde_json::to_value(GeminiRequest::from_completion(request)).unwrap();

        assert_eq!(body["systemInstruction"]["parts"][0]["text"], "You are a moderator");
        assert_eq!(body["contents"][0]["role"], "user");
        assert_eq!(body["contents"][0]["parts"][0]["text"], "Is this ok?");
        assert_eq!(
            body["contents"][0]["parts"][1]["inlineData"]["mimeType"],
            "image/png"
        );
        assert_eq!(
            body["generationConfig"]["responseMimeType"],
            "application/json"
        );
    }

    #[test]
    fn test_chat_request_plain_text() {
        let body = serde_json::to_value(ChatRequest::from_completion(
            "gpt-4o",
            CompletionRequest::new("hello").with_max_tokens(64),
        ))
        .unwrap();

        assert_eq!(body["messages"][0]["role"], "user");
        assert_eq!(body["messages"][0]["content"], "hello");
        assert_eq!(body["max_tokens"], 64);
        assert_eq!(body.get("response_format"), None);
    }

    #[test]
    fn test_chat_request_with_image_uses_data_uri() {
        let body = serde_json::to_value(ChatRequest::from_completion(
            "gpt-4o",
            CompletionRequest::new("describe")
                .with_image(InlineImage {
                    mime_type: "image/jpeg".into(),
                    data: "Zm9v".into(),
                })
                .json(),
        ))
        .unwrap();

        let parts = &body["messages"][0]["content"];
        assert_eq!(parts[0]["type"], "text");
        assert_eq!(parts[1]["type"], "image_url");
        assert_eq!(
            parts[1]["image_url"]["url"],
            Value::String("data:image/jpeg;base64,Zm9v".into())
        );
        assert_eq!(body["response_format"]["type"], "json_object");
    }

    #[tokio::test]
    async fn test_missing_key_fails_before_network() {
        let client = build_http_client(1).unwrap();
        let provider = GeminiProvider::new(client, None, "gemini-1.5-flash");

        let err = provider
            .complete(CompletionRequest::new("hi"))
            .await
            .unwrap_err();
        assert!(matches!(err, LlmError::MissingApiKey { provider: "gemini" }));
    }
}
