//! OpenRouter chat-completions client.
//!
//! One request per call, bounded by [`REQUEST_TIMEOUT`]. Chat replies can be
//! streamed as server-sent `data:` chunks. Any failure surfaces as an
//! [`AiError`]; the coach service falls back to its rules output in that case.

use async_trait::async_trait;
use log::debug;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use goalcoach_core::coach::{
    reply_tokens, ChatContext, CoachAiTrait, CoachSummary, OnToken, SummaryRewrite,
};
use goalcoach_core::Result;

use crate::error::AiError;
use crate::prompts::{
    build_chat_prompt, build_rewrite_prompt, parse_rewrite, CHAT_SYSTEM_PROMPT,
    REWRITE_SYSTEM_PROMPT,
};

pub const DEFAULT_BASE_URL: &str = "https://openrouter.ai/api/v1";
pub const DEFAULT_MODEL: &str = "openrouter/auto";
const PROVIDER_ID: &str = "openrouter";
const APP_TITLE: &str = "Goal Coach";

/// Default HTTP request timeout
const REQUEST_TIMEOUT: Duration = Duration::from_secs(12);

const REWRITE_TEMPERATURE: f32 = 0.1;
const CHAT_TEMPERATURE: f32 = 0.3;

#[derive(Debug, Clone)]
pub struct OpenRouterConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    /// Sent as `HTTP-Referer` for attribution.
    pub client_origin: String,
    pub timeout: Duration,
}

impl OpenRouterConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            client_origin: "http://localhost:5173".to_string(),
            timeout: REQUEST_TIMEOUT,
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    stream: bool,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Option<ChoiceMessage>,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

/// Extracts the trimmed text of the first choice.
fn first_choice_content(body: &str) -> std::result::Result<String, AiError> {
    let response: CompletionResponse =
        serde_json::from_str(body).map_err(|e| AiError::InvalidResponse(e.to_string()))?;
    response
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message)
        .and_then(|m| m.content)
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
        .ok_or(AiError::EmptyCompletion)
}

#[derive(Debug, Deserialize)]
struct StreamChunk {
    #[serde(default)]
    choices: Vec<StreamChoice>,
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
    delta: Option<ChoiceMessage>,
    message: Option<ChoiceMessage>,
}

/// Token carried by one `data:` line, if any.
fn stream_token(line: &str) -> Option<String> {
    let data = line.trim().strip_prefix("data:")?.trim();
    if data.is_empty() || data == "[DONE]" {
        return None;
    }
    let chunk: StreamChunk = serde_json::from_str(data).ok()?;
    let choice = chunk.choices.into_iter().next()?;
    choice
        .delta
        .and_then(|d| d.content)
        .or_else(|| choice.message.and_then(|m| m.content))
        .filter(|t| !t.is_empty())
}

/// Splits a streamed body into lines across chunk boundaries.
#[derive(Debug, Default)]
struct StreamDecoder {
    pending: Vec<u8>,
    raw: Vec<u8>,
}

impl StreamDecoder {
    fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.raw.extend_from_slice(chunk);
        self.pending.extend_from_slice(chunk);
        let mut tokens = Vec::new();
        while let Some(pos) = self.pending.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=pos).collect();
            tokens.extend(stream_token(&String::from_utf8_lossy(&line)));
        }
        tokens
    }

    fn finish(&mut self) -> Option<String> {
        let rest = std::mem::take(&mut self.pending);
        stream_token(&String::from_utf8_lossy(&rest))
    }

    fn raw_body(&self) -> String {
        String::from_utf8_lossy(&self.raw).into_owned()
    }
}

pub struct OpenRouterClient {
    client: Client,
    config: OpenRouterConfig,
}

impl OpenRouterClient {
    pub fn new(config: OpenRouterConfig) -> std::result::Result<Self, AiError> {
        if config.api_key.trim().is_empty() {
            return Err(AiError::MissingApiKey(PROVIDER_ID.to_string()));
        }
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(AiError::from)?;
        Ok(Self { client, config })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/chat/completions",
            self.config.base_url.trim_end_matches('/')
        )
    }

    fn request<'a>(
        &'a self,
        system: &'a str,
        user: &'a str,
        temperature: f32,
        json_mode: bool,
        stream: bool,
    ) -> CompletionRequest<'a> {
        CompletionRequest {
            model: &self.config.model,
            temperature,
            response_format: json_mode.then_some(ResponseFormat {
                kind: "json_object",
            }),
            stream,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: user,
                },
            ],
        }
    }

    async fn send(
        &self,
        request: &CompletionRequest<'_>,
    ) -> std::result::Result<reqwest::Response, AiError> {
        debug!(
            "Requesting completion from {} with model {} (stream: {})",
            PROVIDER_ID, self.config.model, request.stream
        );
        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.config.api_key)
            .header("HTTP-Referer", &self.config.client_origin)
            .header("X-Title", APP_TITLE)
            .json(request)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(AiError::Status(response.status().as_u16()));
        }
        Ok(response)
    }

    async fn complete(
        &self,
        system: &str,
        user: &str,
        temperature: f32,
        json_mode: bool,
    ) -> std::result::Result<String, AiError> {
        let request = self.request(system, user, temperature, json_mode, false);
        let body = self.send(&request).await?.text().await?;
        first_choice_content(&body)
    }

    async fn complete_stream(
        &self,
        system: &str,
        user: &str,
        temperature: f32,
        on_token: &OnToken<'_>,
    ) -> std::result::Result<String, AiError> {
        let request = self.request(system, user, temperature, false, true);
        let mut response = self.send(&request).await?;

        let mut decoder = StreamDecoder::default();
        let mut reply = String::new();
        while let Some(chunk) = response.chunk().await? {
            for token in decoder.push(&chunk) {
                on_token(&token);
                reply.push_str(&token);
            }
        }
        if let Some(token) = decoder.finish() {
            on_token(&token);
            reply.push_str(&token);
        }

        if reply.is_empty() {
            // Provider ignored `stream` and answered with a plain completion.
            let content = first_choice_content(&decoder.raw_body())?;
            for token in reply_tokens(&content) {
                on_token(token);
            }
            return Ok(content);
        }
        if reply.trim().is_empty() {
            return Err(AiError::EmptyCompletion);
        }
        Ok(reply)
    }
}

#[async_trait]
impl CoachAiTrait for OpenRouterClient {
    async fn rewrite_summary(&self, summary: &CoachSummary) -> Result<SummaryRewrite> {
        let prompt = build_rewrite_prompt(summary)?;
        let content = self
            .complete(REWRITE_SYSTEM_PROMPT, &prompt, REWRITE_TEMPERATURE, true)
            .await?;
        Ok(parse_rewrite(&content)?)
    }

    async fn chat_reply(&self, context: &ChatContext) -> Result<String> {
        let prompt = build_chat_prompt(context)?;
        Ok(self
            .complete(CHAT_SYSTEM_PROMPT, &prompt, CHAT_TEMPERATURE, false)
            .await?)
    }

    async fn chat_reply_stream(
        &self,
        context: &ChatContext,
        on_token: &OnToken<'_>,
    ) -> Result<String> {
        let prompt = build_chat_prompt(context)?;
        Ok(self
            .complete_stream(CHAT_SYSTEM_PROMPT, &prompt, CHAT_TEMPERATURE, on_token)
            .await?)
    }
}
