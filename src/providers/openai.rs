use std::collections::BTreeMap;

use reqwest::blocking::Client;
use serde::{
    Deserialize,
    Serialize,
};
use serde_json::Value as JsonValue;

use super::{
    checked,
    require_key,
};
use crate::{
    core::SuggestError,
    resolve::ParameterBag,
    suggestion::Suggestion,
};

pub const OPENAI_API_ENDPOINT: &str = "https://api.openai.com/v1/chat/completions";
pub const BATCH_INSTRUCTION: &str = "Respond with a JSON payload matching the query.";
const PROVIDER: &str = "OpenAI";

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Message {
    pub role: String,
    pub content: String,
}

impl Message {
    fn system(content: &str) -> Self {
        Self { role: "system".to_string(), content: content.to_string() }
    }

    fn user(content: &str) -> Self {
        Self { role: "user".to_string(), content: content.to_string() }
    }
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Serialize)]
pub struct ChatRequest {
    model: String,
    messages: Vec<Message>,
    max_tokens: u32,
    temperature: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Debug, Deserialize)]
pub struct Choice {
    pub message: Message,
}

#[derive(Debug, Deserialize)]
pub struct ChatResponse {
    #[serde(default)]
    pub choices: Vec<Choice>,
}

impl ChatRequest {
    fn from_params(params: &ParameterBag, messages: Vec<Message>, token_factor: u32) -> Self {
        let max_tokens = params.int("max_tokens").unwrap_or(100).clamp(1, u32::MAX as i64) as u32;
        Self {
            model: params.str("model").unwrap_or("gpt-4o-mini").to_string(),
            messages,
            max_tokens: max_tokens.saturating_mul(token_factor.max(1)),
            temperature: params.float("temperature").unwrap_or(0.7),
            response_format: None,
        }
    }
}

fn make_request(
    client: &Client,
    endpoint: &str,
    key: &str,
    request: &ChatRequest,
) -> Result<String, SuggestError> {
    tracing::debug!(
        "POST {} model={} max_tokens={} messages={}",
        endpoint,
        request.model,
        request.max_tokens,
        request.messages.len()
    );
    let response = checked(PROVIDER, client.post(endpoint).bearer_auth(key).json(request).send())?;
    let body: ChatResponse = response.json().map_err(|e| SuggestError::provider(PROVIDER, e))?;
    first_content(body)
}

fn first_content(body: ChatResponse) -> Result<String, SuggestError> {
    body.choices
        .into_iter()
        .next()
        .map(|choice| choice.message.content.trim().to_string())
        .ok_or_else(|| SuggestError::provider(PROVIDER, "response contained no choices"))
}

/// Single completion; the system message is the already-rendered `system_prompt` parameter.
pub fn get_completion(
    client: &Client,
    endpoint: &str,
    query: &str,
    params: &ParameterBag,
) -> Result<Suggestion, SuggestError> {
    let key = require_key(PROVIDER, params, "text_api_key")?;
    let system = params.str("system_prompt").unwrap_or_default();
    let request =
        ChatRequest::from_params(params, vec![Message::system(system), Message::user(query)], 1);
    Ok(Suggestion::text(make_request(client, endpoint, key, &request)?))
}

/// One JSON-mode completion answering every query; token budget scales with the batch.
pub fn get_completions(
    client: &Client,
    endpoint: &str,
    queries: &BTreeMap<String, String>,
    system_context: &str,
    params: &ParameterBag,
) -> Result<BTreeMap<String, Suggestion>, SuggestError> {
    let key = require_key(PROVIDER, params, "text_api_key")?;
    let system = format!("{system_context}\n{BATCH_INSTRUCTION}");
    let user = serde_json::to_string(queries)?;
    let mut request = ChatRequest::from_params(
        params,
        vec![Message::system(&system), Message::user(&user)],
        queries.len() as u32,
    );
    request.response_format = Some(ResponseFormat { kind: "json_object" });

    let content = make_request(client, endpoint, key, &request)?;
    parse_batch(&content)
}

/// Reads the model's JSON object into per-key text suggestions.
pub fn parse_batch(content: &str) -> Result<BTreeMap<String, Suggestion>, SuggestError> {
    let parsed: JsonValue = serde_json::from_str(content)
        .map_err(|e| SuggestError::provider(PROVIDER, format!("malformed batch JSON: {e}")))?;
    let JsonValue::Object(map) = parsed else {
        return Err(SuggestError::provider(PROVIDER, "batch response is not a JSON object"));
    };

    Ok(map
        .into_iter()
        .map(|(key, value)| {
            let text = match value {
                JsonValue::String(s) => s.trim().to_string(),
                JsonValue::Null => String::new(),
                other => other.to_string(),
            };
            (key, Suggestion::text(text))
        })
        .collect())
}
