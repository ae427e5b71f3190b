//! Chat-completion credentials and service construction

use super::{ChatEndpoint, LlmError, LlmService, LoggingService, OpenAIService};
use std::sync::Arc;

const DEFAULT_AZURE_API_VERSION: &str = "2024-06-01";
const DEFAULT_OPENAI_MODEL: &str = "gpt-4o";
const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

/// Configuration for the chat-completion provider
#[derive(Debug, Clone, Default)]
pub struct LlmConfig {
    pub azure_endpoint: Option<String>,
    pub azure_deployment: Option<String>,
    pub azure_api_key: Option<String>,
    pub azure_api_version: Option<String>,
    pub openai_api_key: Option<String>,
    pub openai_model: Option<String>,
    pub openai_base_url: Option<String>,
}

impl LlmConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable lookup. Empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        Self {
            azure_endpoint: get("AZURE_OPENAI_ENDPOINT"),
            azure_deployment: get("AZURE_OPENAI_CHAT_DEPLOYMENT_NAME"),
            azure_api_key: get("AZURE_OPENAI_API_KEY"),
            azure_api_version: get("AZURE_OPENAI_API_VERSION"),
            openai_api_key: get("OPENAI_API_KEY"),
            openai_model: get("OPENAI_CHAT_MODEL_ID"),
            openai_base_url: get("OPENAI_BASE_URL"),
        }
    }
}

/// Create the configured service, wrapped with request logging.
///
/// An Azure endpoint takes precedence; its deployment and key are then
/// mandatory. Without one, `OPENAI_API_KEY` selects the `OpenAI` API.
pub fn build_service(config: &LlmConfig) -> Result<Arc<dyn LlmService>, LlmError> {
    let (api_key, endpoint) = resolve_endpoint(config)?;
    let service = OpenAIService::new(api_key, endpoint)?;

    tracing::info!(model = %service.model_id(), "Chat completion service configured");
    Ok(Arc::new(LoggingService::new(Arc::new(service))))
}

fn resolve_endpoint(config: &LlmConfig) -> Result<(String, ChatEndpoint), LlmError> {
    if let Some(endpoint) = &config.azure_endpoint {
        let deployment = config.azure_deployment.clone().ok_or_else(|| {
            LlmError::configuration("AZURE_OPENAI_CHAT_DEPLOYMENT_NAME is required with AZURE_OPENAI_ENDPOINT")
        })?;
        let api_key = config.azure_api_key.clone().ok_or_else(|| {
            LlmError::configuration("AZURE_OPENAI_API_KEY is required with AZURE_OPENAI_ENDPOINT")
        })?;
        let api_version = config
            .azure_api_version
            .clone()
            .unwrap_or_else(|| DEFAULT_AZURE_API_VERSION.to_string());

        return Ok((
            api_key,
            ChatEndpoint::Azure {
                endpoint: endpoint.clone(),
                deployment,
                api_version,
            },
        ));
    }

    if let Some(api_key) = &config.openai_api_key {
        return Ok((
            api_key.clone(),
            ChatEndpoint::OpenAI {
                base_url: config
                    .openai_base_url
                    .clone()
                    .unwrap_or_else(|| DEFAULT_OPENAI_BASE_URL.to_string()),
                model: config
                    .openai_model
                    .clone()
                    .unwrap_or_else(|| DEFAULT_OPENAI_MODEL.to_string()),
            },
        ));
    }

    Err(LlmError::configuration(
        "No chat completion credentials configured. Set AZURE_OPENAI_ENDPOINT, \
         AZURE_OPENAI_CHAT_DEPLOYMENT_NAME and AZURE_OPENAI_API_KEY, or OPENAI_API_KEY.",
    ))
}
