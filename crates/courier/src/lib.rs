//! # Courier
//!
//! An update dispatch and handler routing engine for chat-bot platforms.
//!
//! Courier takes the stream of updates a transport layer produces (long
//! polling, webhooks — not included here) and routes each one through an
//! ordered table of handler groups with bounded concurrency, multi-turn
//! conversation state machines, and per-update failure isolation.
//!
//! ```text
//! ┌───────────┐    ┌──────────────┐    ┌─ group 0: [audit log]
//! │ transport │───▶│  Dispatcher  │───▶├─ group 1: [/start, /help, signup]
//! │  channels │    │ (50 workers) │    └─ group 2: [fallback]
//! └───────────┘    └──────────────┘
//!       ▲ one channel + stop flag per bot (BotRegistry)
//! ```
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use courier::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let runtime = CourierRuntime::new();
//!
//!     runtime.add_handler(
//!         Arc::new(CommandHandler::new("start", |ctx| async move {
//!             let chat = ctx.effective_chat().map(|c| c.id).unwrap_or_default();
//!             ctx.client().send_message(chat, "welcome!").await?;
//!             Ok(Outcome::Done)
//!         })),
//!         0,
//!     );
//!
//!     let entry = runtime.attach_bot(my_client).await?;
//!     spawn_polling_loop(entry.sender(), entry.stopped());
//!
//!     runtime.run().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Layers
//!
//! - [`core`] — update model and the opaque client capability
//! - [`framework`] — handlers, groups, dispatcher, conversations
//! - [`runtime`] — bot registry, configuration, logging, lifecycle

pub use courier_core as core;
pub use courier_framework as framework;
pub use courier_runtime as runtime;

/// Prelude module for convenient imports.
///
/// ```rust,ignore
/// use courier::prelude::*;
/// ```
pub mod prelude {
    // Runtime - main entry point
    pub use courier_runtime::{BotEntry, BotRegistry, CourierConfig, CourierRuntime};

    // Dispatch engine
    pub use courier_framework::{
        Context, Conversation, Dispatcher, ErrorAction, GroupTable, Handler, HandlerError,
        HandlerResult, KeyStrategy, Outcome, Transition,
    };

    // Ready-made handler kinds and filters
    pub use courier_framework::filters::{self, MessageFilter};
    pub use courier_framework::handlers::{
        CallbackQueryHandler, CommandHandler, MessageHandler, UpdateHandler,
    };

    // Foundation types
    pub use courier_core::{
        ApiError, ApiResult, BoxedClient, Client, Message, Update, UpdateKind, downcast_client,
    };
}
