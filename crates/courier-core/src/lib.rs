//! # Courier Core
//!
//! Foundation types for the Courier bot dispatch engine.
//!
//! This crate provides the building blocks that the routing layer consumes:
//!
//! - **Update model**: the [`Update`] tagged union describing one incoming
//!   notification from the messaging platform, plus the payload structs its
//!   variants carry ([`Message`], [`CallbackQuery`], ...).
//! - **Client handle**: the [`Client`] trait, an opaque capability handlers
//!   use to issue outbound API calls. The dispatch layer never inspects it.
//! - **Error types**: [`ApiError`] for failed outbound calls.
//!
//! The HTTP transport that produces updates and executes API calls lives
//! outside this workspace; everything here is expressed against channels of
//! already-decoded [`Update`] values and the [`Client`] capability.

pub mod client;
pub mod error;
pub mod types;
pub mod update;

pub use client::{BoxedClient, Client, downcast_client};
pub use error::{ApiError, ApiResult};
pub use types::{
    CallbackQuery, Chat, ChatMemberUpdated, InlineQuery, Message, PollAnswer, User,
};
pub use update::{Update, UpdateKind};
