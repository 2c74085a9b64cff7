//! Shared fixtures for the crate's unit tests.

use std::any::Any;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;

use courier_core::{
    ApiResult, BoxedClient, CallbackQuery, Chat, Client, Message, Update, UpdateKind, User,
};

use crate::context::Context;
use crate::handler::Handler;
use crate::outcome::{HandlerResult, Outcome};

/// A client that answers every call with an empty object.
pub struct TestClient {
    token: String,
}

impl TestClient {
    pub fn boxed() -> BoxedClient {
        Arc::new(Self {
            token: "test-token".to_string(),
        })
    }
}

#[async_trait]
impl Client for TestClient {
    fn token(&self) -> &str {
        &self.token
    }

    fn username(&self) -> &str {
        "test_bot"
    }

    async fn call(&self, _method: &str, _params: serde_json::Value) -> ApiResult<serde_json::Value> {
        Ok(serde_json::Value::Object(serde_json::Map::new()))
    }

    fn as_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

pub fn chat(id: i64) -> Chat {
    Chat {
        id,
        kind: "private".to_string(),
        title: None,
        username: None,
    }
}

pub fn user(id: i64) -> User {
    User {
        id,
        is_bot: false,
        first_name: "Test".to_string(),
        username: None,
    }
}

pub fn message(chat_id: i64, user_id: i64, text: &str) -> Message {
    Message {
        message_id: 1,
        date: 0,
        chat: chat(chat_id),
        from: Some(user(user_id)),
        text: Some(text.to_string()),
    }
}

/// A text-message update.
pub fn text_update(update_id: i64, chat_id: i64, user_id: i64, text: &str) -> Update {
    Update {
        update_id,
        kind: UpdateKind::Message(message(chat_id, user_id, text)),
    }
}

/// A callback-query update carrying `data`.
pub fn callback_update(update_id: i64, user_id: i64, data: &str) -> Update {
    Update {
        update_id,
        kind: UpdateKind::CallbackQuery(CallbackQuery {
            id: format!("q{update_id}"),
            from: user(user_id),
            message: None,
            data: Some(data.to_string()),
        }),
    }
}

type OutcomeFactory = Box<dyn Fn() -> HandlerResult + Send + Sync>;

/// A scripted handler: a fixed match predicate, a side-effect log, and a
/// configurable outcome.
pub struct Probe {
    name: String,
    matches: Box<dyn Fn(&Update) -> bool + Send + Sync>,
    outcome: OutcomeFactory,
    pub calls: AtomicUsize,
    pub log: Arc<Mutex<Vec<String>>>,
}

impl Probe {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            matches: Box::new(|_| true),
            outcome: Box::new(|| Ok(Outcome::Done)),
            calls: AtomicUsize::new(0),
            log: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn matching<F>(mut self, f: F) -> Self
    where
        F: Fn(&Update) -> bool + Send + Sync + 'static,
    {
        self.matches = Box::new(f);
        self
    }

    pub fn returning<F>(mut self, f: F) -> Self
    where
        F: Fn() -> HandlerResult + Send + Sync + 'static,
    {
        self.outcome = Box::new(f);
        self
    }

    /// Shares a log vector so several probes can record a global run order.
    pub fn logging_to(mut self, log: Arc<Mutex<Vec<String>>>) -> Self {
        self.log = log;
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Handler for Probe {
    fn name(&self) -> &str {
        &self.name
    }

    fn matches(&self, update: &Update) -> bool {
        (self.matches)(update)
    }

    async fn handle(&self, _ctx: Arc<Context>) -> HandlerResult {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.log.lock().push(self.name.clone());
        (self.outcome)()
    }
}
