//! The incoming update model.
//!
//! An [`Update`] is one notification from the messaging platform. Exactly one
//! variant of [`UpdateKind`] is populated per update; on the wire this is the
//! single variant key flattened next to `update_id`, so
//! `{"update_id": 1, "message": {...}}` round-trips unchanged.
//!
//! Updates are produced once by the transport layer and treated as read-only
//! from that point on — the dispatch layer shares them by reference and never
//! mutates them.

use serde::{Deserialize, Serialize};

use crate::types::{CallbackQuery, Chat, ChatMemberUpdated, InlineQuery, Message, PollAnswer, User};

/// One incoming notification from the platform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Update {
    /// Monotonically increasing identifier assigned by the platform.
    pub update_id: i64,
    /// The populated payload variant.
    #[serde(flatten)]
    pub kind: UpdateKind,
}

/// The payload of an [`Update`]. At most one variant is present per update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateKind {
    /// A new message in a private or group chat.
    Message(Message),
    /// An edit to a previously sent message.
    EditedMessage(Message),
    /// A new post in a channel.
    ChannelPost(Message),
    /// An inline-keyboard button press.
    CallbackQuery(CallbackQuery),
    /// An inline query typed after the bot's handle.
    InlineQuery(InlineQuery),
    /// A change to a chat member's status.
    ChatMember(ChatMemberUpdated),
    /// A vote in a non-anonymous poll.
    PollAnswer(PollAnswer),
}

impl Update {
    /// Stable name of the populated variant, for logging.
    pub fn kind_name(&self) -> &'static str {
        match self.kind {
            UpdateKind::Message(_) => "message",
            UpdateKind::EditedMessage(_) => "edited_message",
            UpdateKind::ChannelPost(_) => "channel_post",
            UpdateKind::CallbackQuery(_) => "callback_query",
            UpdateKind::InlineQuery(_) => "inline_query",
            UpdateKind::ChatMember(_) => "chat_member",
            UpdateKind::PollAnswer(_) => "poll_answer",
        }
    }

    /// The message this update is about, if any.
    ///
    /// For callback queries this is the message the pressed button was
    /// attached to.
    pub fn effective_message(&self) -> Option<&Message> {
        match &self.kind {
            UpdateKind::Message(m) | UpdateKind::EditedMessage(m) | UpdateKind::ChannelPost(m) => {
                Some(m)
            }
            UpdateKind::CallbackQuery(q) => q.message.as_ref(),
            _ => None,
        }
    }

    /// The chat this update happened in, if any.
    pub fn effective_chat(&self) -> Option<&Chat> {
        match &self.kind {
            UpdateKind::Message(m) | UpdateKind::EditedMessage(m) | UpdateKind::ChannelPost(m) => {
                Some(&m.chat)
            }
            UpdateKind::CallbackQuery(q) => q.message.as_ref().map(|m| &m.chat),
            UpdateKind::ChatMember(c) => Some(&c.chat),
            _ => None,
        }
    }

    /// The user who caused this update, if any.
    pub fn effective_sender(&self) -> Option<&User> {
        match &self.kind {
            UpdateKind::Message(m) | UpdateKind::EditedMessage(m) | UpdateKind::ChannelPost(m) => {
                m.from.as_ref()
            }
            UpdateKind::CallbackQuery(q) => Some(&q.from),
            UpdateKind::InlineQuery(q) => Some(&q.from),
            UpdateKind::ChatMember(c) => Some(&c.from),
            UpdateKind::PollAnswer(a) => a.user.as_ref(),
        }
    }
}
