//! Payload structs carried by the [`Update`](crate::Update) variants.
//!
//! These mirror the platform's wire objects, trimmed to the fields the
//! routing layer and its filters actually consult. Unknown fields are
//! ignored on deserialization so the model stays forward-compatible with
//! additions to the platform schema.

use serde::{Deserialize, Serialize};

/// A user or bot account on the platform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    /// Unique identifier.
    pub id: i64,
    /// Whether this account is a bot.
    #[serde(default)]
    pub is_bot: bool,
    /// Display name.
    pub first_name: String,
    /// Optional handle, without the leading `@`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
}

/// A private, group, supergroup, or channel chat.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chat {
    /// Unique identifier.
    pub id: i64,
    /// Chat kind as reported by the platform (`private`, `group`,
    /// `supergroup`, `channel`).
    #[serde(rename = "type")]
    pub kind: String,
    /// Title, for group-like chats.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Optional public handle.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
}

/// A message posted in a chat.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Identifier unique within the chat.
    pub message_id: i64,
    /// Unix timestamp of when the message was sent.
    pub date: i64,
    /// The chat the message belongs to.
    pub chat: Chat,
    /// The sender. Absent for channel posts and some service messages.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<User>,
    /// Text content, for text messages.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl Message {
    /// Returns the message text, or an empty string for non-text messages.
    pub fn text_or_empty(&self) -> &str {
        self.text.as_deref().unwrap_or("")
    }
}

/// An inline-keyboard button press.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallbackQuery {
    /// Unique query identifier, used to answer the query.
    pub id: String,
    /// The user who pressed the button.
    pub from: User,
    /// The message the button was attached to, if still available.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<Message>,
    /// The payload attached to the button.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
}

/// An incoming inline query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InlineQuery {
    /// Unique query identifier.
    pub id: String,
    /// The user issuing the query.
    pub from: User,
    /// The query text typed so far.
    pub query: String,
    /// Pagination offset controlled by the integrator.
    #[serde(default)]
    pub offset: String,
}

/// A change to a member's status within a chat.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMemberUpdated {
    /// The chat the change happened in.
    pub chat: Chat,
    /// The user who performed the change.
    pub from: User,
    /// Unix timestamp of the change.
    pub date: i64,
    /// Status before the change (`member`, `administrator`, `left`, ...).
    pub old_status: String,
    /// Status after the change.
    pub new_status: String,
}

/// A user's answer in a non-anonymous poll.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PollAnswer {
    /// The poll being answered.
    pub poll_id: String,
    /// The answering user. Absent for anonymous voters.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<User>,
    /// Chosen option indices. Empty when the vote was retracted.
    #[serde(default)]
    pub option_ids: Vec<u32>,
}
