//! HTTP-backed `CompletionClient`. Supports the three provider endpoint
//! shapes the configuration allows; everything provider-specific stays in
//! this module.

use async_trait::async_trait;
use reqwest::Client;
use secrecy::ExposeSecret;
use serde_json::{json, Map, Value};

use wattson_core::actions::{ActionDeclaration, ActionRequest, Decision, ParameterType};
use wattson_core::config::{CompletionConfig, CompletionProvider};

use crate::completion::{
    CompletionClient, CompletionError, CompletionRequest, TranscriptEntry, TranscriptRole,
};

const OPENAI_DEFAULT_BASE_URL: &str = "https://api.openai.com";
const ANTHROPIC_DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
const ANTHROPIC_VERSION: &str = "2023-06-01";

pub struct HttpCompletionClient {
    client: Client,
    config: CompletionConfig,
}

impl HttpCompletionClient {
    pub fn new(config: CompletionConfig) -> Result<Self, CompletionError> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|error| CompletionError::Transport(error.to_string()))?;
        Ok(Self { client, config })
    }

    fn base_url(&self, fallback: &str) -> String {
        self.config
            .base_url
            .as_deref()
            .unwrap_or(fallback)
            .trim_end_matches('/')
            .to_string()
    }

    fn api_key(&self) -> Result<&str, CompletionError> {
        self.config
            .api_key
            .as_ref()
            .map(|key| key.expose_secret())
            .ok_or_else(|| CompletionError::Transport("api key is not configured".to_string()))
    }

    async fn post(&self, url: String, builder: reqwest::RequestBuilder) -> Result<Value, CompletionError> {
        let response = builder
            .send()
            .await
            .map_err(|error| CompletionError::Transport(format!("{url}: {error}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CompletionError::Transport(format!("{url}: http {status}: {body}")));
        }

        response
            .json::<Value>()
            .await
            .map_err(|error| CompletionError::Protocol(format!("{url}: {error}")))
    }
}

#[async_trait]
impl CompletionClient for HttpCompletionClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<Decision, CompletionError> {
        match self.config.provider {
            CompletionProvider::OpenAi => {
                let url = format!("{}/v1/chat/completions", self.base_url(OPENAI_DEFAULT_BASE_URL));
                let body = json!({
                    "model": self.config.model,
                    "max_tokens": self.config.max_tokens,
                    "temperature": self.config.temperature,
                    "messages": chat_messages(request, true),
                    "tools": request.actions.iter().map(function_tool).collect::<Vec<_>>(),
                });
                let builder =
                    self.client.post(&url).bearer_auth(self.api_key()?).json(&body);
                decision_from_openai(&self.post(url, builder).await?)
            }
            CompletionProvider::Anthropic => {
                let url = format!("{}/v1/messages", self.base_url(ANTHROPIC_DEFAULT_BASE_URL));
                let body = json!({
                    "model": self.config.model,
                    "max_tokens": self.config.max_tokens,
                    "temperature": self.config.temperature,
                    "system": request.instruction,
                    "messages": chat_messages(request, false),
                    "tools": request.actions.iter().map(anthropic_tool).collect::<Vec<_>>(),
                });
                let builder = self
                    .client
                    .post(&url)
                    .header("x-api-key", self.api_key()?)
                    .header("anthropic-version", ANTHROPIC_VERSION)
                    .json(&body);
                decision_from_anthropic(&self.post(url, builder).await?)
            }
            CompletionProvider::Ollama => {
                let url = format!("{}/api/chat", self.base_url(""));
                let body = json!({
                    "model": self.config.model,
                    "stream": false,
                    "options": {
                        "temperature": self.config.temperature,
                        "num_predict": self.config.max_tokens,
                    },
                    "messages": chat_messages(request, true),
                    "tools": request.actions.iter().map(function_tool).collect::<Vec<_>>(),
                });
                let builder = self.client.post(&url).json(&body);
                decision_from_ollama(&self.post(url, builder).await?)
            }
        }
    }
}

/// Transcript entries become chat messages. Action results and knowledge
/// passages are folded in as plain bracketed user-role text; the contract
/// does not require provider-native tool plumbing.
fn chat_messages(request: &CompletionRequest, include_system: bool) -> Vec<Value> {
    let mut messages = Vec::with_capacity(request.transcript.len() + 1);
    if include_system {
        messages.push(json!({"role": "system", "content": request.instruction}));
    }

    for entry in &request.transcript {
        messages.push(chat_message(entry));
    }

    messages
}

fn chat_message(entry: &TranscriptEntry) -> Value {
    match entry.role {
        TranscriptRole::User => json!({"role": "user", "content": entry.content}),
        TranscriptRole::Agent => json!({"role": "assistant", "content": entry.content}),
        TranscriptRole::Action => {
            json!({"role": "user", "content": format!("[action result] {}", entry.content)})
        }
        TranscriptRole::Knowledge => {
            json!({"role": "user", "content": format!("[knowledge] {}", entry.content)})
        }
    }
}

fn parameter_schema(declaration: &ActionDeclaration) -> Value {
    let mut properties = Map::new();
    let mut required = Vec::new();

    for parameter in &declaration.parameters {
        let kind = match parameter.kind {
            ParameterType::String => "string",
            ParameterType::Integer => "integer",
        };
        properties.insert(
            parameter.name.clone(),
            json!({"type": kind, "description": parameter.description}),
        );
        if parameter.required {
            required.push(Value::String(parameter.name.clone()));
        }
    }

    json!({"type": "object", "properties": properties, "required": required})
}

fn function_tool(declaration: &ActionDeclaration) -> Value {
    json!({
        "type": "function",
        "function": {
            "name": declaration.name,
            "description": declaration.description,
            "parameters": parameter_schema(declaration),
        }
    })
}

fn anthropic_tool(declaration: &ActionDeclaration) -> Value {
    json!({
        "name": declaration.name,
        "description": declaration.description,
        "input_schema": parameter_schema(declaration),
    })
}

fn decision_from_openai(payload: &Value) -> Result<Decision, CompletionError> {
    let message = payload
        .pointer("/choices/0/message")
        .ok_or_else(|| CompletionError::Protocol("response has no message".to_string()))?;

    if let Some(tool_calls) = message.get("tool_calls").and_then(Value::as_array) {
        if !tool_calls.is_empty() {
            let requests = tool_calls
                .iter()
                .map(|call| {
                    let name = call
                        .pointer("/function/name")
                        .and_then(Value::as_str)
                        .ok_or_else(|| {
                            CompletionError::Protocol("tool call has no function name".to_string())
                        })?;
                    let raw_arguments = call
                        .pointer("/function/arguments")
                        .and_then(Value::as_str)
                        .unwrap_or("{}");
                    let arguments: Map<String, Value> = serde_json::from_str(raw_arguments)
                        .map_err(|error| {
                            CompletionError::Protocol(format!("tool arguments: {error}"))
                        })?;
                    Ok(ActionRequest { name: name.to_string(), arguments })
                })
                .collect::<Result<Vec<_>, CompletionError>>()?;
            return Ok(Decision::Act { requests });
        }
    }

    let text = message
        .get("content")
        .and_then(Value::as_str)
        .ok_or_else(|| CompletionError::Protocol("response has no text content".to_string()))?;
    Ok(Decision::Reply { text: text.to_string() })
}

fn decision_from_anthropic(payload: &Value) -> Result<Decision, CompletionError> {
    let blocks = payload
        .get("content")
        .and_then(Value::as_array)
        .ok_or_else(|| CompletionError::Protocol("response has no content blocks".to_string()))?;

    let requests = blocks
        .iter()
        .filter(|block| block.get("type").and_then(Value::as_str) == Some("tool_use"))
        .map(|block| {
            let name = block.get("name").and_then(Value::as_str).ok_or_else(|| {
                CompletionError::Protocol("tool_use block has no name".to_string())
            })?;
            let arguments = block
                .get("input")
                .and_then(Value::as_object)
                .cloned()
                .unwrap_or_default();
            Ok(ActionRequest { name: name.to_string(), arguments })
        })
        .collect::<Result<Vec<_>, CompletionError>>()?;

    if !requests.is_empty() {
        return Ok(Decision::Act { requests });
    }

    let text = blocks
        .iter()
        .find_map(|block| {
            (block.get("type").and_then(Value::as_str) == Some("text"))
                .then(|| block.get("text").and_then(Value::as_str))
                .flatten()
        })
        .ok_or_else(|| CompletionError::Protocol("response has no text block".to_string()))?;
    Ok(Decision::Reply { text: text.to_string() })
}

fn decision_from_ollama(payload: &Value) -> Result<Decision, CompletionError> {
    let message = payload
        .get("message")
        .ok_or_else(|| CompletionError::Protocol("response has no message".to_string()))?;

    if let Some(tool_calls) = message.get("tool_calls").and_then(Value::as_array) {
        if !tool_calls.is_empty() {
            let requests = tool_calls
                .iter()
                .map(|call| {
                    let name = call
                        .pointer("/function/name")
                        .and_then(Value::as_str)
                        .ok_or_else(|| {
                            CompletionError::Protocol("tool call has no function name".to_string())
                        })?;
                    let arguments = call
                        .pointer("/function/arguments")
                        .and_then(Value::as_object)
                        .cloned()
                        .unwrap_or_default();
                    Ok(ActionRequest { name: name.to_string(), arguments })
                })
                .collect::<Result<Vec<_>, CompletionError>>()?;
            return Ok(Decision::Act { requests });
        }
    }

    let text = message
        .get("content")
        .and_then(Value::as_str)
        .ok_or_else(|| CompletionError::Protocol("response has no text content".to_string()))?;
    Ok(Decision::Reply { text: text.to_string() })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use wattson_core::actions::{ActionDeclaration, Decision, ParameterSpec, ParameterType};

    use super::{
        anthropic_tool, decision_from_anthropic, decision_from_ollama, decision_from_openai,
        function_tool,
    };

    fn declaration() -> ActionDeclaration {
        ActionDeclaration::new("get_ticket_status", "get the status of an existing ticket")
            .with_parameter(ParameterSpec::required(
                "customer_id",
                ParameterType::String,
                "unique customer identifier",
            ))
            .with_parameter(ParameterSpec::optional(
                "ticket_id",
                ParameterType::String,
                "unique ticket identifier",
            ))
    }

    #[test]
    fn tool_schemas_carry_required_markers() {
        let tool = function_tool(&declaration());
        assert_eq!(tool.pointer("/function/name").and_then(|v| v.as_str()), Some("get_ticket_status"));
        assert_eq!(
            tool.pointer("/function/parameters/required"),
            Some(&json!(["customer_id"]))
        );

        let tool = anthropic_tool(&declaration());
        assert_eq!(tool.pointer("/input_schema/required"), Some(&json!(["customer_id"])));
    }

    #[test]
    fn openai_tool_calls_decode_to_action_requests() {
        let payload = json!({
            "choices": [{
                "message": {
                    "content": null,
                    "tool_calls": [{
                        "function": {
                            "name": "detect_peak",
                            "arguments": "{\"customer_id\": \"C1\"}"
                        }
                    }]
                }
            }]
        });

        let decision = decision_from_openai(&payload).expect("decode");
        match decision {
            Decision::Act { requests } => {
                assert_eq!(requests.len(), 1);
                assert_eq!(requests[0].name, "detect_peak");
                assert_eq!(requests[0].string_arg("customer_id"), Some("C1"));
            }
            Decision::Reply { .. } => panic!("expected action requests"),
        }
    }

    #[test]
    fn anthropic_text_blocks_decode_to_replies() {
        let payload = json!({
            "content": [
                {"type": "text", "text": "Your forecast is about 515 kWh."}
            ]
        });

        let decision = decision_from_anthropic(&payload).expect("decode");
        assert_eq!(decision, Decision::Reply { text: "Your forecast is about 515 kWh.".to_string() });
    }

    #[test]
    fn ollama_structured_arguments_decode_without_reparsing() {
        let payload = json!({
            "message": {
                "content": "",
                "tool_calls": [{
                    "function": {
                        "name": "update_forecasting",
                        "arguments": {"customer_id": "C1", "month": 9, "year": 2026, "usage": 520}
                    }
                }]
            }
        });

        let decision = decision_from_ollama(&payload).expect("decode");
        match decision {
            Decision::Act { requests } => {
                assert_eq!(requests[0].integer_arg("month"), Some(9));
                assert_eq!(requests[0].integer_arg("usage"), Some(520));
            }
            Decision::Reply { .. } => panic!("expected action requests"),
        }
    }

    #[test]
    fn malformed_payloads_are_protocol_errors() {
        assert!(decision_from_openai(&json!({})).is_err());
        assert!(decision_from_anthropic(&json!({"content": "not-an-array"})).is_err());
        assert!(decision_from_ollama(&json!({"message": {}})).is_err());
    }
}
