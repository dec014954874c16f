// HTTP gateway speaking OpenAI-compatible and Anthropic chat APIs

use super::{BackendGateway, GatewayError, GenerateRequest};
use crate::config::{ApiStyle, ProviderConfig, SecretsConfig};
use crate::models::{ChatTurn, ModelRef, ModelSize};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashMap;

const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Longest error body kept in a [`GatewayError::Status`]
const MAX_ERROR_BODY: usize = 500;

/// Gateway backed by the configured provider endpoints
pub struct HttpGateway {
    client: reqwest::Client,
    providers: Vec<ProviderConfig>,
    tokens: HashMap<String, String>,
}

impl HttpGateway {
    pub fn new(providers: Vec<ProviderConfig>, secrets: &SecretsConfig) -> Self {
        let tokens = providers
            .iter()
            .filter_map(|p| secrets.resolve_token(p).map(|t| (p.id.clone(), t)))
            .collect::<HashMap<_, _>>();

        log::info!(
            "Backend gateway configured with {} providers ({} with tokens)",
            providers.len(),
            tokens.len()
        );

        Self {
            client: reqwest::Client::new(),
            providers,
            tokens,
        }
    }

    fn provider(&self, id: &str) -> Result<&ProviderConfig, GatewayError> {
        self.providers
            .iter()
            .find(|p| p.id == id)
            .ok_or_else(|| GatewayError::UnknownProvider(id.to_string()))
    }

    fn is_usable(&self, provider: &ProviderConfig) -> bool {
        !provider.requires_token || self.tokens.contains_key(&provider.id)
    }
}

#[async_trait]
impl BackendGateway for HttpGateway {
    async fn list_models(&self, size: Option<ModelSize>) -> Result<Vec<ModelRef>, GatewayError> {
        let models: Vec<ModelRef> = self
            .providers
            .iter()
            .filter(|p| self.is_usable(p))
            .flat_map(|p| {
                p.models
                    .iter()
                    .filter(move |m| size.map_or(true, |s| m.size == s))
                    .map(move |m| ModelRef::new(&p.id, &m.id))
            })
            .collect();

        log::debug!("Listing {} models (size filter: {:?})", models.len(), size);
        Ok(models)
    }

    async fn generate_text(&self, request: GenerateRequest<'_>) -> Result<String, GatewayError> {
        let provider = self.provider(&request.target.provider)?;
        let token = self.tokens.get(&provider.id);
        if provider.requires_token && token.is_none() {
            return Err(GatewayError::MissingToken(provider.id.clone()));
        }

        let api_model = provider
            .find_model(&request.target.model)
            .map(|m| m.api_model())
            .unwrap_or(request.target.model.as_str());

        let body = match provider.api_style {
            ApiStyle::Openai => openai_body(api_model, &request),
            ApiStyle::Anthropic => anthropic_body(api_model, &request),
        };

        let mut builder = self.client.post(&provider.endpoint).json(&body);
        if let Some(token) = token {
            builder = match provider.api_style {
                ApiStyle::Openai => builder.bearer_auth(token),
                ApiStyle::Anthropic => builder
                    .header("x-api-key", token)
                    .header("anthropic-version", ANTHROPIC_VERSION),
            };
        }

        log::debug!(
            "Calling {} ({} messages) at {}",
            request.target.key(),
            request.history.len(),
            provider.endpoint
        );

        let response = builder.send().await.map_err(|e| GatewayError::Request {
            provider: provider.id.clone(),
            message: e.to_string(),
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GatewayError::Status {
                provider: provider.id.clone(),
                status: status.as_u16(),
                body: truncate(&body, MAX_ERROR_BODY),
            });
        }

        let payload: Value = response
            .json()
            .await
            .map_err(|e| GatewayError::MalformedResponse {
                provider: provider.id.clone(),
                message: e.to_string(),
            })?;

        let text = match provider.api_style {
            ApiStyle::Openai => parse_openai_reply(payload),
            ApiStyle::Anthropic => parse_anthropic_reply(payload),
        }
        .map_err(|message| GatewayError::MalformedResponse {
            provider: provider.id.clone(),
            message,
        })?;

        Ok(text)
    }
}

fn history_messages(history: &[ChatTurn]) -> Vec<Value> {
    history
        .iter()
        .map(|turn| json!({ "role": turn.role.as_str(), "content": turn.content }))
        .collect()
}

/// Request body for an OpenAI-compatible chat completions endpoint
fn openai_body(api_model: &str, request: &GenerateRequest<'_>) -> Value {
    let mut messages = vec![json!({ "role": "system", "content": request.system_prompt })];
    messages.extend(history_messages(request.history));

    json!({
        "model": api_model,
        "messages": messages,
        "max_tokens": request.max_tokens,
        "temperature": request.temperature,
    })
}

/// Request body for the Anthropic messages endpoint
fn anthropic_body(api_model: &str, request: &GenerateRequest<'_>) -> Value {
    json!({
        "model": api_model,
        "system": request.system_prompt,
        "messages": history_messages(request.history),
        "max_tokens": request.max_tokens,
        "temperature": request.temperature,
    })
}

#[derive(Deserialize)]
struct OpenaiReply {
    choices: Vec<OpenaiChoice>,
}

#[derive(Deserialize)]
struct OpenaiChoice {
    message: OpenaiMessage,
}

#[derive(Deserialize)]
struct OpenaiMessage {
    #[serde(default)]
    content: Option<String>,
}

fn parse_openai_reply(payload: Value) -> Result<String, String> {
    let reply: OpenaiReply =
        serde_json::from_value(payload).map_err(|e| format!("unexpected shape: {}", e))?;
    reply
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .ok_or_else(|| "no message content in reply".to_string())
}

#[derive(Deserialize)]
struct AnthropicReply {
    content: Vec<AnthropicBlock>,
}

#[derive(Deserialize)]
struct AnthropicBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

fn parse_anthropic_reply(payload: Value) -> Result<String, String> {
    let reply: AnthropicReply =
        serde_json::from_value(payload).map_err(|e| format!("unexpected shape: {}", e))?;
    let text: Vec<String> = reply
        .content
        .into_iter()
        .filter(|b| b.kind == "text")
        .filter_map(|b| b.text)
        .collect();

    if text.is_empty() {
        return Err("no text blocks in reply".to_string());
    }
    Ok(text.join(""))
}

fn truncate(value: &str, max_chars: usize) -> String {
    if value.chars().count() <= max_chars {
        value.to_string()
    } else {
        let mut out: String = value.chars().take(max_chars).collect();
        out.push_str("...");
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{merge_providers, ProviderModel};

    fn request<'a>(history: &'a [ChatTurn], target: &'a ModelRef) -> GenerateRequest<'a> {
        GenerateRequest {
            system_prompt: "be nice",
            history,
            target,
            max_tokens: 500,
            temperature: 0.7,
        }
    }

    fn local_provider() -> ProviderConfig {
        ProviderConfig {
            id: "local".to_string(),
            name: "Local".to_string(),
            api_style: ApiStyle::Openai,
            endpoint: "http://127.0.0.1:9/v1/chat/completions".to_string(),
            token_env: None,
            requires_token: false,
            models: vec![
                ProviderModel {
                    id: "tiny".to_string(),
                    api_id: None,
                    size: ModelSize::Small,
                },
                ProviderModel {
                    id: "big".to_string(),
                    api_id: Some("big-v2".to_string()),
                    size: ModelSize::Large,
                },
            ],
        }
    }

    #[test]
    fn test_openai_body_prepends_system_prompt() {
        let history = vec![ChatTurn::user("hi"), ChatTurn::assistant("hello")];
        let target = ModelRef::new("openai", "gpt-4o");
        let body = openai_body("gpt-4o", &request(&history, &target));

        assert_eq!(body["model"], "gpt-4o");
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][0]["content"], "be nice");
        assert_eq!(body["messages"][2]["role"], "assistant");
        assert_eq!(body["max_tokens"], 500);
    }

    #[test]
    fn test_anthropic_body_uses_system_field() {
        let history = vec![ChatTurn::user("hi")];
        let target = ModelRef::new("claude", "haiku-3.5");
        let body = anthropic_body("claude-3-5-haiku-latest", &request(&history, &target));

        assert_eq!(body["system"], "be nice");
        assert_eq!(body["messages"].as_array().unwrap().len(), 1);
        assert_eq!(body["model"], "claude-3-5-haiku-latest");
    }

    #[test]
    fn test_parse_openai_reply() {
        let payload = json!({"choices": [{"message": {"role": "assistant", "content": "hello"}}]});
        assert_eq!(parse_openai_reply(payload).unwrap(), "hello");

        assert!(parse_openai_reply(json!({"choices": []})).is_err());
        assert!(parse_openai_reply(json!({"error": "x"})).is_err());
    }

    #[test]
    fn test_parse_anthropic_reply() {
        let payload = json!({"content": [
            {"type": "text", "text": "hel"},
            {"type": "tool_use", "id": "t1"},
            {"type": "text", "text": "lo"}
        ]});
        assert_eq!(parse_anthropic_reply(payload).unwrap(), "hello");
        assert!(parse_anthropic_reply(json!({"content": []})).is_err());
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("abcdef", 3), "abc...");
    }

    #[tokio::test]
    async fn test_list_models_only_usable_providers() {
        let mut providers = merge_providers(&[]);
        providers.push(local_provider());
        for p in providers.iter_mut() {
            // Keep the test independent from the caller's environment
            p.token_env = None;
        }
        let gateway = HttpGateway::new(providers, &SecretsConfig::default());

        let all = gateway.list_models(None).await.unwrap();
        assert_eq!(
            all,
            vec![ModelRef::new("local", "tiny"), ModelRef::new("local", "big")]
        );

        let small = gateway.list_models(Some(ModelSize::Small)).await.unwrap();
        assert_eq!(small, vec![ModelRef::new("local", "tiny")]);
    }

    #[tokio::test]
    async fn test_list_models_with_file_token() {
        let mut providers = merge_providers(&[]);
        for p in providers.iter_mut() {
            p.token_env = None;
        }
        let mut secrets = SecretsConfig::default();
        secrets.set_token("claude", "sk-test");
        let gateway = HttpGateway::new(providers, &secrets);

        let models = gateway.list_models(None).await.unwrap();
        assert!(!models.is_empty());
        assert!(models.iter().all(|m| m.provider == "claude"));
    }

    #[tokio::test]
    async fn test_generate_unknown_provider() {
        let gateway = HttpGateway::new(vec![local_provider()], &SecretsConfig::default());
        let target = ModelRef::new("nope", "x");
        let err = gateway.generate_text(request(&[], &target)).await.unwrap_err();
        assert_eq!(err, GatewayError::UnknownProvider("nope".to_string()));
    }

    #[tokio::test]
    async fn test_generate_missing_token() {
        let mut openai = merge_providers(&[]).remove(0);
        openai.token_env = None;
        let gateway = HttpGateway::new(vec![openai], &SecretsConfig::default());
        let target = ModelRef::new("openai", "gpt-4o");
        let err = gateway.generate_text(request(&[], &target)).await.unwrap_err();
        assert_eq!(err, GatewayError::MissingToken("openai".to_string()));
    }
}
