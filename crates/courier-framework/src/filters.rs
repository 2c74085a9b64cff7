//! Composable filter predicates.
//!
//! Filters are pure, total boolean functions over a message: they never fail
//! and never have side effects. The combinators build richer predicates out
//! of the primitives without allocating per check.
//!
//! ```rust,ignore
//! use courier_framework::filters::message;
//!
//! let in_chat_text = message::text().and(message::chat(-100123));
//! ```

use std::sync::Arc;

use courier_core::Message;

/// A shareable predicate over a [`Message`].
#[derive(Clone)]
pub struct MessageFilter {
    inner: Arc<dyn Fn(&Message) -> bool + Send + Sync>,
}

impl MessageFilter {
    /// Wraps a plain function as a filter.
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&Message) -> bool + Send + Sync + 'static,
    {
        Self { inner: Arc::new(f) }
    }

    /// Evaluates the filter.
    pub fn check(&self, message: &Message) -> bool {
        (self.inner)(message)
    }

    /// Both filters must pass.
    pub fn and(self, other: MessageFilter) -> Self {
        Self::new(move |m| self.check(m) && other.check(m))
    }

    /// Either filter may pass.
    pub fn or(self, other: MessageFilter) -> Self {
        Self::new(move |m| self.check(m) || other.check(m))
    }

    /// Inverts the filter.
    pub fn negate(self) -> Self {
        Self::new(move |m| !self.check(m))
    }
}

impl std::fmt::Debug for MessageFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("MessageFilter")
    }
}

/// Ready-made message filters.
pub mod message {
    use super::MessageFilter;

    /// Matches every message.
    pub fn all() -> MessageFilter {
        MessageFilter::new(|_| true)
    }

    /// Matches text messages that are not commands.
    pub fn text() -> MessageFilter {
        MessageFilter::new(|m| m.text.as_deref().is_some_and(|t| !t.starts_with('/')))
    }

    /// Matches messages whose text starts with a slash command.
    pub fn command() -> MessageFilter {
        MessageFilter::new(|m| m.text.as_deref().is_some_and(|t| t.starts_with('/')))
    }

    /// Matches messages sent in the given chat.
    pub fn chat(chat_id: i64) -> MessageFilter {
        MessageFilter::new(move |m| m.chat.id == chat_id)
    }

    /// Matches messages sent by the given user.
    pub fn sender(user_id: i64) -> MessageFilter {
        MessageFilter::new(move |m| m.from.as_ref().is_some_and(|u| u.id == user_id))
    }

    /// Matches text messages containing the needle.
    pub fn contains(needle: impl Into<String>) -> MessageFilter {
        let needle = needle.into();
        MessageFilter::new(move |m| m.text.as_deref().is_some_and(|t| t.contains(&needle)))
    }
}
