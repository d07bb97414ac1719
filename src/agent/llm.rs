use crate::agent::types::{
    AIConfig, ApiType, LLMMessage, LLMResponse, PlannedAction, ProviderConfig, TokenUsage,
};
use crate::error::LlmError;
use async_trait::async_trait;
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;

const PARSE_TASK_SYSTEM_PROMPT: &str = "You are a web automation assistant. Break down user requests into browser actions. Return JSON format with actions: navigate_to, click_element, type_text, extract_text";

/// LLM Provider trait
#[async_trait]
pub trait LLMProvider: Send + Sync {
    /// Send a chat completion request
    async fn complete(&self, messages: &[LLMMessage]) -> Result<LLMResponse, LlmError>;

    /// Completion text only
    async fn generate(&self, messages: &[LLMMessage]) -> Result<String, LlmError> {
        Ok(self.complete(messages).await?.content)
    }

    /// Get provider name
    fn name(&self) -> &str;

    /// Get model name
    fn model(&self) -> &str;
}

fn build_http_client(timeout: Duration) -> Client {
    Client::builder()
        .timeout(timeout)
        .build()
        .unwrap_or_else(|_| Client::new())
}

/// Read the body of a failed response into an `LlmError::Api`
async fn api_error(provider: &str, response: reqwest::Response) -> LlmError {
    let status = response.status().as_u16();
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string());
    LlmError::Api {
        provider: provider.to_string(),
        status,
        body,
    }
}

fn token_count(value: &serde_json::Value) -> u32 {
    value.as_u64().unwrap_or(0) as u32
}

/// OpenAI-compatible provider (OpenAI, Azure, custom endpoints, etc.)
pub struct OpenAIProvider {
    client: Client,
    config: ProviderConfig,
    model: String,
    provider_id: String,
}

impl OpenAIProvider {
    pub fn new(provider_id: String, config: ProviderConfig, model: String) -> Self {
        Self::with_client(Client::new(), provider_id, config, model)
    }

    pub fn with_client(
        client: Client,
        provider_id: String,
        config: ProviderConfig,
        model: String,
    ) -> Self {
        Self {
            client,
            config,
            model,
            provider_id,
        }
    }

    fn build_messages(&self, messages: &[LLMMessage]) -> Vec<serde_json::Value> {
        messages
            .iter()
            .map(|msg| {
                serde_json::json!({
                    "role": msg.role,
                    "content": msg.content
                })
            })
            .collect()
    }
}

#[async_trait]
impl LLMProvider for OpenAIProvider {
    async fn complete(&self, messages: &[LLMMessage]) -> Result<LLMResponse, LlmError> {
        let url = format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'));

        let body = serde_json::json!({
            "model": self.model,
            "messages": self.build_messages(messages),
            "max_tokens": 1024,
            "temperature": 0.1
        });

        let mut request = self.client.post(&url).json(&body);

        if let Some(api_key) = &self.config.api_key {
            request = request.header("Authorization", format!("Bearer {}", api_key));
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(api_error("OpenAI", response).await);
        }

        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| LlmError::Parse(e.to_string()))?;

        let content = json["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| LlmError::Parse("missing choices[0].message.content".to_string()))?
            .to_string();

        let usage = TokenUsage {
            prompt_tokens: token_count(&json["usage"]["prompt_tokens"]),
            completion_tokens: token_count(&json["usage"]["completion_tokens"]),
            total_tokens: token_count(&json["usage"]["total_tokens"]),
        };

        Ok(LLMResponse {
            content,
            model: self.model.clone(),
            usage,
        })
    }

    fn name(&self) -> &str {
        &self.provider_id
    }

    fn model(&self) -> &str {
        &self.model
    }
}

/// Anthropic provider
pub struct AnthropicProvider {
    client: Client,
    config: ProviderConfig,
    model: String,
    provider_id: String,
}

impl AnthropicProvider {
    pub fn new(provider_id: String, config: ProviderConfig, model: String) -> Self {
        Self::with_client(Client::new(), provider_id, config, model)
    }

    pub fn with_client(
        client: Client,
        provider_id: String,
        config: ProviderConfig,
        model: String,
    ) -> Self {
        Self {
            client,
            config,
            model,
            provider_id,
        }
    }

    /// Split out the system prompt; Anthropic takes it as a top-level field
    fn build_body(&self, messages: &[LLMMessage]) -> serde_json::Value {
        let mut system_prompt = String::new();
        let mut anthropic_messages = Vec::new();

        for msg in messages {
            if msg.role == "system" {
                system_prompt = msg.content.clone();
            } else {
                anthropic_messages.push(serde_json::json!({
                    "role": msg.role,
                    "content": [{"type": "text", "text": msg.content}]
                }));
            }
        }

        let mut body = serde_json::json!({
            "model": self.model,
            "messages": anthropic_messages,
            "max_tokens": 1024,
        });

        if !system_prompt.is_empty() {
            body["system"] = serde_json::Value::String(system_prompt);
        }
        body
    }
}

#[async_trait]
impl LLMProvider for AnthropicProvider {
    async fn complete(&self, messages: &[LLMMessage]) -> Result<LLMResponse, LlmError> {
        let url = format!("{}/v1/messages", self.config.base_url.trim_end_matches('/'));

        let api_key = self
            .config
            .api_key
            .as_ref()
            .ok_or_else(|| LlmError::MissingApiKey("Anthropic".to_string()))?;

        let response = self
            .client
            .post(&url)
            .header("x-api-key", api_key)
            .header("anthropic-version", "2023-06-01")
            .header("content-type", "application/json")
            .json(&self.build_body(messages))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(api_error("Anthropic", response).await);
        }

        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| LlmError::Parse(e.to_string()))?;

        let content = json["content"][0]["text"]
            .as_str()
            .ok_or_else(|| LlmError::Parse("missing content[0].text".to_string()))?
            .to_string();

        let input = token_count(&json["usage"]["input_tokens"]);
        let output = token_count(&json["usage"]["output_tokens"]);

        Ok(LLMResponse {
            content,
            model: self.model.clone(),
            usage: TokenUsage {
                prompt_tokens: input,
                completion_tokens: output,
                total_tokens: input + output,
            },
        })
    }

    fn name(&self) -> &str {
        &self.provider_id
    }

    fn model(&self) -> &str {
        &self.model
    }
}

/// Ollama provider (local)
pub struct OllamaProvider {
    client: Client,
    config: ProviderConfig,
    model: String,
    provider_id: String,
}

impl OllamaProvider {
    pub fn new(provider_id: String, config: ProviderConfig, model: String) -> Self {
        Self::with_client(Client::new(), provider_id, config, model)
    }

    pub fn with_client(
        client: Client,
        provider_id: String,
        config: ProviderConfig,
        model: String,
    ) -> Self {
        Self {
            client,
            config,
            model,
            provider_id,
        }
    }
}

#[async_trait]
impl LLMProvider for OllamaProvider {
    async fn complete(&self, messages: &[LLMMessage]) -> Result<LLMResponse, LlmError> {
        let url = format!("{}/api/chat", self.config.base_url.trim_end_matches('/'));

        let body = serde_json::json!({
            "model": self.model,
            "messages": messages,
            "stream": false
        });

        let response = self.client.post(&url).json(&body).send().await?;
        if !response.status().is_success() {
            return Err(api_error("Ollama", response).await);
        }

        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| LlmError::Parse(e.to_string()))?;

        let content = json["message"]["content"]
            .as_str()
            .ok_or_else(|| LlmError::Parse("missing message.content".to_string()))?
            .to_string();

        let prompt = token_count(&json["prompt_eval_count"]);
        let completion = token_count(&json["eval_count"]);

        Ok(LLMResponse {
            content,
            model: self.model.clone(),
            usage: TokenUsage {
                prompt_tokens: prompt,
                completion_tokens: completion,
                total_tokens: prompt + completion,
            },
        })
    }

    fn name(&self) -> &str {
        &self.provider_id
    }

    fn model(&self) -> &str {
        &self.model
    }
}

/// LLM Client factory
pub struct LLMClient {
    config: AIConfig,
    http: Client,
}

impl LLMClient {
    pub fn new(config: AIConfig) -> Self {
        let http = build_http_client(Duration::from_secs(config.timeout_seconds.max(1)));
        Self { config, http }
    }

    /// Create a provider instance with the specified model
    pub fn create_provider(
        &self,
        provider_id: &str,
        model: &str,
    ) -> Result<Arc<dyn LLMProvider>, LlmError> {
        let provider_config = self.config.providers.get(provider_id).ok_or_else(|| {
            LlmError::NotConfigured(format!("Provider '{}' not configured", provider_id))
        })?;

        Ok(build_provider(
            self.http.clone(),
            provider_id.to_string(),
            provider_config.clone(),
            model.to_string(),
        ))
    }

    /// Get the default LLM provider (format: "provider_id:model_name")
    pub fn get_default_llm(&self) -> Result<Arc<dyn LLMProvider>, LlmError> {
        let selection = self.config.default_llm.as_deref().ok_or_else(|| {
            LlmError::NotConfigured(
                "No default LLM configured. Set ai.default_llm in the config file.".to_string(),
            )
        })?;

        let (provider_id, model) = split_selection(selection)?;
        self.create_provider(provider_id, model)
    }
}

/// Split "provider_id:model_name"; the model part may contain further colons
pub fn split_selection(selection: &str) -> Result<(&str, &str), LlmError> {
    match selection.split_once(':') {
        Some((provider, model)) if !provider.is_empty() && !model.is_empty() => {
            Ok((provider, model))
        }
        _ => Err(LlmError::NotConfigured(format!(
            "Invalid LLM selection '{}'. Expected 'provider_id:model_name'",
            selection
        ))),
    }
}

fn build_provider(
    client: Client,
    provider_id: String,
    config: ProviderConfig,
    model: String,
) -> Arc<dyn LLMProvider> {
    match config.api_type {
        ApiType::Openai => Arc::new(OpenAIProvider::with_client(client, provider_id, config, model)),
        ApiType::Anthropic => Arc::new(AnthropicProvider::with_client(
            client,
            provider_id,
            config,
            model,
        )),
        ApiType::Ollama => Arc::new(OllamaProvider::with_client(client, provider_id, config, model)),
    }
}

/// Ask the model to break a request into browser actions; returns the raw completion
pub async fn parse_task(provider: &dyn LLMProvider, user_input: &str) -> Result<String, LlmError> {
    let messages = [
        LLMMessage::system(PARSE_TASK_SYSTEM_PROMPT),
        LLMMessage::user(format!("Parse this task: {}", user_input)),
    ];
    provider.generate(&messages).await
}

/// Best-effort extraction of planned actions from a `parse_task` completion.
///
/// Accepts a bare JSON array, an object with an `actions` array, or either one
/// wrapped in prose or a code fence. Entries that are not known actions are skipped.
pub fn parse_planned_actions(content: &str) -> Vec<PlannedAction> {
    let value = [('[', ']'), ('{', '}')]
        .iter()
        .filter_map(|&(open, close)| {
            let start = content.find(open)?;
            let end = content.rfind(close)?;
            if end <= start {
                return None;
            }
            serde_json::from_str::<serde_json::Value>(&content[start..=end]).ok()
        })
        .next();

    let items = match value {
        Some(serde_json::Value::Array(items)) => items,
        Some(serde_json::Value::Object(mut map)) => match map.remove("actions") {
            Some(serde_json::Value::Array(items)) => items,
            _ => vec![serde_json::Value::Object(map)],
        },
        _ => return Vec::new(),
    };

    items
        .into_iter()
        .filter_map(|item| serde_json::from_value::<PlannedAction>(item).ok())
        .collect()
}

/// Test an AI provider connection
pub async fn test_provider(config: &ProviderConfig, model: &str) -> Result<String, LlmError> {
    let model = if model.is_empty() {
        config
            .models
            .first()
            .cloned()
            .unwrap_or_else(|| "default".to_string())
    } else {
        model.to_string()
    };

    let provider = build_provider(
        build_http_client(Duration::from_secs(30)),
        "test".to_string(),
        config.clone(),
        model,
    );

    let response = provider
        .complete(&[LLMMessage::user("Say 'ok' if you can read this.")])
        .await?;

    Ok(format!(
        "Connection successful! Model: {}, Tokens: {}",
        response.model, response.usage.total_tokens
    ))
}
