use async_trait::async_trait;
use nodalcore::{Entity, Method, MethodError, Parameters, StateTable, Value};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

pub const DEFAULT_TELEGRAM_API: &str = "https://api.telegram.org";

/// Connection settings for the Telegram Bot API
#[derive(Debug, Clone)]
pub struct TelegramConfig {
    pub api_base: String,
    pub token: Option<String>,
}

impl TelegramConfig {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            api_base: DEFAULT_TELEGRAM_API.to_string(),
            token: Some(token.into()),
        }
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_TELEGRAM_API.to_string(),
            token: None,
        }
    }
}

/// `Telegram` entity: read and send chat messages
pub fn telegram_entity(config: TelegramConfig) -> Entity {
    let client = Arc::new(TelegramClient::new(config));
    Entity::new("Telegram")
        .with_method("get_messages", GetMessagesMethod(client.clone()))
        .with_method("send_message", SendMessageMethod(client))
}

/// Bot API client shared by the Telegram methods
pub struct TelegramClient {
    client: reqwest::Client,
    config: TelegramConfig,
    /// `update_id` after the newest update seen; 0 until the first fetch
    next_update: AtomicI64,
}

impl TelegramClient {
    pub fn new(config: TelegramConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
            next_update: AtomicI64::new(0),
        }
    }

    /// Fetch pending updates and confirm them, so the next fetch only sees newer ones
    async fn fetch_updates(&self) -> Result<Vec<serde_json::Value>, MethodError> {
        let offset = self.next_update.load(Ordering::SeqCst);
        let body = if offset > 0 {
            serde_json::json!({ "offset": offset })
        } else {
            serde_json::json!({})
        };

        let updates = match self.call_api("getUpdates", body).await? {
            serde_json::Value::Array(updates) => updates,
            _ => Vec::new(),
        };
        if let Some(newest) = updates
            .iter()
            .filter_map(|update| update.get("update_id").and_then(|id| id.as_i64()))
            .max()
        {
            self.next_update.fetch_max(newest + 1, Ordering::SeqCst);
        }
        Ok(updates)
    }

    fn endpoint(&self, call: &str) -> Result<String, MethodError> {
        let token = self.config.token.as_deref().ok_or_else(|| {
            MethodError::ExecutionFailed("Telegram bot token is not configured".to_string())
        })?;
        Ok(format!(
            "{}/bot{}/{}",
            self.config.api_base.trim_end_matches('/'),
            token,
            call
        ))
    }

    async fn call_api(
        &self,
        call: &str,
        body: serde_json::Value,
    ) -> Result<serde_json::Value, MethodError> {
        let url = self.endpoint(call)?;
        tracing::info!("Telegram {}", call);

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| MethodError::ExecutionFailed(format!("HTTP request failed: {}", e)))?;

        let status = response.status().as_u16();
        let payload: serde_json::Value = response
            .json()
            .await
            .map_err(|e| MethodError::ExecutionFailed(format!("Failed to read response: {}", e)))?;

        if payload.get("ok").and_then(|ok| ok.as_bool()) != Some(true) {
            let description = payload
                .get("description")
                .and_then(|d| d.as_str())
                .unwrap_or("unknown error");
            return Err(MethodError::ExecutionFailed(format!(
                "Telegram {} failed with status {}: {}",
                call, status, description
            )));
        }

        Ok(payload
            .get("result")
            .cloned()
            .unwrap_or(serde_json::Value::Null))
    }
}

/// Accept `chatId` as either a string or a number
fn chat_id(parameters: &Parameters) -> Result<String, MethodError> {
    match parameters.require("chatId")? {
        Value::String(id) => Ok(id.clone()),
        Value::Number(id) => Ok(format!("{}", *id as i64)),
        other => Err(MethodError::InvalidParameterType {
            field: "chatId".to_string(),
            expected: "string or number".to_string(),
            actual: other.kind().to_string(),
        }),
    }
}

/// Reduce a Bot API update to `{id, text, type}` if it belongs to the chat
pub fn message_from_update(update: &serde_json::Value, chat: &str) -> Option<Value> {
    let message = update.get("message")?;
    let message_chat = message.get("chat")?.get("id")?;
    let matches = match message_chat {
        serde_json::Value::Number(n) => n.to_string() == chat,
        serde_json::Value::String(s) => s == chat,
        _ => false,
    };
    if !matches {
        return None;
    }

    let id = message
        .get("message_id")
        .map(|id| id.to_string())
        .unwrap_or_default();
    let kind = if message.get("voice").is_some() {
        "voice"
    } else if message.get("text").is_some() {
        "text"
    } else {
        "other"
    };
    let mut fields = vec![("id", Value::from(id)), ("type", Value::from(kind))];
    if let Some(text) = message.get("text").and_then(|t| t.as_str()) {
        fields.push(("text", Value::from(text)));
    }
    Some(Value::object(fields))
}

pub struct GetMessagesMethod(Arc<TelegramClient>);

#[async_trait]
impl Method for GetMessagesMethod {
    async fn call(&self, parameters: &Parameters, _state: &StateTable) -> Result<Value, MethodError> {
        let chat = chat_id(parameters)?;
        tracing::debug!("Getting messages from chat ID: {}", chat);

        let messages = self
            .0
            .fetch_updates()
            .await?
            .iter()
            .filter_map(|update| message_from_update(update, &chat))
            .collect::<Vec<_>>();

        Ok(Value::object([("messages", Value::Array(messages))]))
    }
}

pub struct SendMessageMethod(Arc<TelegramClient>);

#[async_trait]
impl Method for SendMessageMethod {
    async fn call(&self, parameters: &Parameters, _state: &StateTable) -> Result<Value, MethodError> {
        let chat = chat_id(parameters)?;
        let text = parameters.require_str("text")?;
        tracing::debug!("Sending message to chat ID: {}", chat);

        let sent = self
            .0
            .call_api(
                "sendMessage",
                serde_json::json!({ "chat_id": chat, "text": text }),
            )
            .await?;
        let message_id = sent
            .get("message_id")
            .map(|id| id.to_string())
            .unwrap_or_default();

        Ok(Value::object([
            ("success", Value::Bool(true)),
            ("messageId", Value::from(message_id)),
        ]))
    }
}
