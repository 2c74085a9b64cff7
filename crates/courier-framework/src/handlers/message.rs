//! Handler for message updates.

use std::sync::Arc;

use async_trait::async_trait;

use courier_core::{Update, UpdateKind};

use crate::context::Context;
use crate::filters::MessageFilter;
use crate::handler::{Callback, Handler, into_callback};
use crate::outcome::HandlerResult;

/// Runs a callback for messages passing a filter.
///
/// By default only new messages match; edited messages and channel posts can
/// be opted in.
pub struct MessageHandler {
    name: String,
    filter: MessageFilter,
    callback: Callback,
    allow_edited: bool,
    allow_channel: bool,
}

impl MessageHandler {
    /// Creates a message handler named after its filter purpose.
    pub fn new<F, Fut>(name: impl Into<String>, filter: MessageFilter, f: F) -> Self
    where
        F: Fn(Arc<Context>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        Self {
            name: name.into(),
            filter,
            callback: into_callback(f),
            allow_edited: false,
            allow_channel: false,
        }
    }

    /// Also match edits to previously sent messages.
    pub fn allow_edited(mut self, allow: bool) -> Self {
        self.allow_edited = allow;
        self
    }

    /// Also match channel posts.
    pub fn allow_channel(mut self, allow: bool) -> Self {
        self.allow_channel = allow;
        self
    }
}

#[async_trait]
impl Handler for MessageHandler {
    fn name(&self) -> &str {
        &self.name
    }

    fn matches(&self, update: &Update) -> bool {
        let message = match &update.kind {
            UpdateKind::Message(m) => m,
            UpdateKind::EditedMessage(m) if self.allow_edited => m,
            UpdateKind::ChannelPost(m) if self.allow_channel => m,
            _ => return false,
        };
        self.filter.check(message)
    }

    async fn handle(&self, ctx: Arc<Context>) -> HandlerResult {
        (self.callback)(ctx).await
    }
}
