use crate::config::{ApiConfig, ApiCredentials};
use crate::error::TranslateError;
use crate::i18n::Language;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use tracing::debug;

/// One plain-text segment to translate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SegmentRequest<'a> {
    pub source: Language,
    pub target: Language,
    pub text: &'a str,
}

/// The remote translation capability: text in, translated text out.
///
/// Implementations do a single attempt; retry and backoff are applied by the
/// caller.
pub trait Translator {
    fn translate(
        &self,
        request: SegmentRequest<'_>,
    ) -> impl Future<Output = Result<String, TranslateError>>;
}

/// OpenAI-compatible chat completion request
#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<Message>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize, Deserialize)]
struct Message {
    role: String,
    content: String,
}

/// Some proxies return the OpenAI shape, others a bare `content` field.
#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Message,
}

/// Build the system prompt for translation
fn build_system_prompt(source: Language, target: Language) -> String {
    format!(
        r#"You are a professional translator for a technical blog. Translate the user's content from {} to {}.

## Rules
- Preserve all Markdown formatting exactly: heading markers (#), emphasis (*, _), list markers, tables, blockquotes
- Keep link syntax intact and never change link targets or URLs
- Keep HTML tags and Hugo shortcodes ({{{{< ... >}}}}) exactly as they are
- Tokens of the form ⟦0⟧, ⟦1⟧ stand for inline code: copy each one unchanged, exactly once
- Keep proper names, product names and code identifiers untranslated
- Write natural, idiomatic {} ({}) rather than a word-for-word rendering
- Reply with the translation only, without commentary or surrounding quotes"#,
        source.name(),
        target.name(),
        target.name(),
        target.native_name()
    )
}

fn build_user_prompt(text: &str, source: Language, target: Language) -> String {
    format!(
        "Translate the following content from {} to {}.\n\nContent to translate:\n{}",
        source.name(),
        target.name(),
        text
    )
}

/// Map a non-success HTTP status to an error kind
fn classify_status(status: reqwest::StatusCode, body: String) -> TranslateError {
    let code = status.as_u16();
    match code {
        429 => TranslateError::RateLimited,
        401 | 403 => TranslateError::AuthFailure { status: code },
        400..=499 => TranslateError::MalformedInput {
            status: code,
            message: body,
        },
        _ => TranslateError::ServerError {
            status: code,
            message: body,
        },
    }
}

/// Translator backed by an OpenAI-compatible chat completions endpoint.
#[derive(Debug, Clone)]
pub struct ChatTranslator {
    client: reqwest::Client,
    credentials: ApiCredentials,
    model: String,
    temperature: f32,
    max_tokens: u32,
    timeout: Duration,
}

impl ChatTranslator {
    pub fn new(credentials: ApiCredentials, api: &ApiConfig) -> Result<Self, TranslateError> {
        let client = reqwest::Client::builder()
            .timeout(api.timeout)
            .build()
            .map_err(|e| TranslateError::Unreachable(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            credentials,
            model: api.model.clone(),
            temperature: api.temperature,
            max_tokens: api.max_tokens,
            timeout: api.timeout,
        })
    }

    fn map_transport_error(&self, error: reqwest::Error) -> TranslateError {
        if error.is_timeout() {
            TranslateError::Timeout(self.timeout)
        } else {
            TranslateError::Unreachable(error.to_string())
        }
    }
}

impl Translator for ChatTranslator {
    async fn translate(&self, request: SegmentRequest<'_>) -> Result<String, TranslateError> {
        let body = ChatRequest {
            model: self.model.clone(),
            messages: vec![
                Message {
                    role: "system".to_string(),
                    content: build_system_prompt(request.source, request.target),
                },
                Message {
                    role: "user".to_string(),
                    content: build_user_prompt(request.text, request.source, request.target),
                },
            ],
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };

        debug!(
            "Requesting {} -> {} translation of {} bytes",
            request.source,
            request.target,
            request.text.len()
        );

        let response = self
            .client
            .post(self.credentials.endpoint.clone())
            .header("Authorization", format!("Bearer {}", self.credentials.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| self.map_transport_error(e))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|e| format!("<failed to read body: {}>", e));
            return Err(classify_status(status, body));
        }

        let chat_response: ChatResponse = response.json().await.map_err(|e| {
            if e.is_timeout() {
                TranslateError::Timeout(self.timeout)
            } else {
                TranslateError::MalformedResponse(e.to_string())
            }
        })?;

        let translated = chat_response
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .or(chat_response.content)
            .ok_or_else(|| {
                TranslateError::MalformedResponse("response contained no content".to_string())
            })?;

        let translated = translated.trim();
        if translated.is_empty() {
            return Err(TranslateError::MalformedResponse(
                "response content was empty".to_string(),
            ));
        }
        Ok(translated.to_string())
    }
}
