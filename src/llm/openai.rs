//! `OpenAI` and Azure `OpenAI` chat-completions provider

use super::types::{LlmMessage, LlmRequest, LlmResponse, MessageRole, Usage};
use super::{LlmError, LlmService};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(300);

/// Where chat-completion requests are sent
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatEndpoint {
    /// Azure `OpenAI` deployment (`api-key` header auth)
    Azure {
        endpoint: String,
        deployment: String,
        api_version: String,
    },
    /// `OpenAI` or an `OpenAI`-compatible server (bearer auth)
    OpenAI { base_url: String, model: String },
}

impl ChatEndpoint {
    pub fn url(&self) -> String {
        match self {
            ChatEndpoint::Azure {
                endpoint,
                deployment,
                api_version,
            } => format!(
                "{}/openai/deployments/{deployment}/chat/completions?api-version={api_version}",
                endpoint.trim_end_matches('/')
            ),
            ChatEndpoint::OpenAI { base_url, .. } => {
                format!("{}/chat/completions", base_url.trim_end_matches('/'))
            }
        }
    }

    /// Identifier used in logs: the deployment or model name
    pub fn model_id(&self) -> &str {
        match self {
            ChatEndpoint::Azure { deployment, .. } => deployment,
            ChatEndpoint::OpenAI { model, .. } => model,
        }
    }
}

/// OpenAI-compatible service implementation
pub struct OpenAIService {
    client: Client,
    api_key: String,
    endpoint: ChatEndpoint,
    url: String,
    model_id: String,
}

impl OpenAIService {
    pub fn new(api_key: String, endpoint: ChatEndpoint) -> Result<Self, LlmError> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| LlmError::configuration(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_key,
            url: endpoint.url(),
            model_id: endpoint.model_id().to_string(),
            endpoint,
        })
    }

    fn translate_request(&self, request: &LlmRequest) -> OpenAIRequest {
        let mut messages = Vec::with_capacity(request.messages.len() + 1);

        if !request.system.is_empty() {
            let system_text = request
                .system
                .iter()
                .map(|s| s.text.as_str())
                .collect::<Vec<_>>()
                .join("\n\n");

            messages.push(OpenAIMessage {
                role: "system".to_string(),
                name: None,
                content: Some(system_text),
            });
        }

        messages.extend(request.messages.iter().map(translate_message));

        // Azure routes by deployment; the body carries no model name
        let model = match &self.endpoint {
            ChatEndpoint::Azure { .. } => None,
            ChatEndpoint::OpenAI { model, .. } => Some(model.clone()),
        };

        OpenAIRequest {
            model,
            messages,
            max_tokens: request.max_tokens,
            stream: false,
        }
    }
}

fn translate_message(msg: &LlmMessage) -> OpenAIMessage {
    let role = match msg.role {
        MessageRole::User => "user",
        MessageRole::Assistant => "assistant",
    };

    OpenAIMessage {
        role: role.to_string(),
        name: msg.name.clone(),
        content: Some(msg.content.clone()),
    }
}

fn normalize_response(resp: OpenAIResponse) -> Result<LlmResponse, LlmError> {
    let choice = resp
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| LlmError::unknown("No choices in response"))?;

    let end_turn = choice.finish_reason.as_deref() == Some("stop");
    let usage = resp.usage.map_or_else(Usage::default, |u| Usage {
        input_tokens: u64::from(u.prompt_tokens),
        output_tokens: u64::from(u.completion_tokens),
    });

    Ok(LlmResponse {
        content: choice.message.content.unwrap_or_default(),
        end_turn,
        usage,
    })
}

/// Map a non-success HTTP status and body onto an error kind
fn classify_failure(status: u16, body: &str, retry_after: Option<Duration>) -> LlmError {
    let Ok(error_resp) = serde_json::from_str::<OpenAIErrorResponse>(body) else {
        return LlmError::unknown(format!("HTTP {status} error: {body}"));
    };
    let message = error_resp.error.message;

    match status {
        401 | 403 => LlmError::auth(format!("Authentication failed: {message}")),
        429 => {
            let err = LlmError::rate_limit(format!("Rate limit exceeded: {message}"));
            match retry_after {
                Some(delay) => err.with_retry_after(delay),
                None => err,
            }
        }
        400 => LlmError::invalid_request(format!("Invalid request: {message}")),
        500..=599 => LlmError::server_error(format!("Server error: {message}")),
        _ => LlmError::unknown(format!("HTTP {status}: {message}")),
    }
}

#[async_trait]
impl LlmService for OpenAIService {
    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError> {
        let openai_request = self.translate_request(request);

        let builder = self.client.post(&self.url);
        let builder = match self.endpoint {
            ChatEndpoint::Azure { .. } => builder.header("api-key", &self.api_key),
            ChatEndpoint::OpenAI { .. } => builder.bearer_auth(&self.api_key),
        };

        let response = builder
            .json(&openai_request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    LlmError::network(format!("Request timeout: {e}"))
                } else if e.is_connect() {
                    LlmError::network(format!("Connection failed: {e}"))
                } else {
                    LlmError::unknown(format!("Request failed: {e}"))
                }
            })?;

        let status = response.status();
        let retry_after = response
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok())
            .map(Duration::from_secs);
        let body = response
            .text()
            .await
            .map_err(|e| LlmError::network(format!("Failed to read response: {e}")))?;

        if !status.is_success() {
            return Err(classify_failure(status.as_u16(), &body, retry_after));
        }

        let openai_response: OpenAIResponse = serde_json::from_str(&body).map_err(|e| {
            LlmError::unknown(format!("Failed to parse response: {e} - body: {body}"))
        })?;

        normalize_response(openai_response)
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}

// OpenAI API types

#[derive(Debug, Serialize)]
struct OpenAIRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    model: Option<String>,
    messages: Vec<OpenAIMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    stream: bool,
}

#[derive(Debug, Serialize, Deserialize)]
struct OpenAIMessage {
    role: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAIResponse {
    choices: Vec<OpenAIChoice>,
    #[serde(default)]
    usage: Option<OpenAIUsage>,
}

#[derive(Debug, Deserialize)]
struct OpenAIChoice {
    message: OpenAIMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[allow(clippy::struct_field_names)]
struct OpenAIUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct OpenAIErrorResponse {
    error: OpenAIError,
}

#[derive(Debug, Deserialize)]
struct OpenAIError {
    message: String,
}
