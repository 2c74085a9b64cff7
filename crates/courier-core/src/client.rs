//! The client handle passed through to handlers.
//!
//! A [`Client`] is the capability a handler uses to talk back to the
//! platform. The dispatch layer treats it as opaque: it is cloned into every
//! handler invocation and never inspected or mutated by the engine itself.
//!
//! Everything is expressed through the single [`Client::call`] operation;
//! the convenience methods are default implementations on top of it, so a
//! concrete client only has to wire up one code path.

use std::any::Any;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Value, json};

use crate::error::{ApiError, ApiResult};
use crate::types::Message;

/// An opaque handle to one bot identity on the platform.
#[async_trait]
pub trait Client: Send + Sync {
    /// The bot token. Unique per bot identity; used as the registry key.
    fn token(&self) -> &str;

    /// The bot's own username, without the leading `@`.
    fn username(&self) -> &str;

    /// Invokes a raw API method with JSON parameters.
    ///
    /// All other methods funnel through this one.
    async fn call(&self, method: &str, params: Value) -> ApiResult<Value>;

    /// Sends a text message to a chat.
    async fn send_message(&self, chat_id: i64, text: &str) -> ApiResult<Message> {
        let response = self
            .call("sendMessage", json!({ "chat_id": chat_id, "text": text }))
            .await?;
        serde_json::from_value(response).map_err(|e| ApiError::Decode(e.to_string()))
    }

    /// Acknowledges a callback query, optionally showing a notification.
    async fn answer_callback_query(&self, query_id: &str, text: Option<&str>) -> ApiResult<bool> {
        let mut params = json!({ "callback_query_id": query_id });
        if let Some(text) = text {
            params["text"] = Value::from(text);
        }
        let response = self.call("answerCallbackQuery", params).await?;
        serde_json::from_value(response).map_err(|e| ApiError::Decode(e.to_string()))
    }

    /// Returns self as an `Arc<dyn Any>` for safe downcasting.
    ///
    /// Implementors should simply return `self`.
    fn as_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
}

/// A shared, type-erased client handle.
pub type BoxedClient = Arc<dyn Client>;

/// Attempts to downcast a [`BoxedClient`] to a concrete client type.
///
/// Handlers that need APIs beyond the [`Client`] trait can recover their
/// concrete client this way without the engine knowing about it.
pub fn downcast_client<T: Client + 'static>(client: BoxedClient) -> Option<Arc<T>> {
    Arc::downcast::<T>(client.as_any()).ok()
}
