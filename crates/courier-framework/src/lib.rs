//! # Courier Framework
//!
//! The update dispatch and handler routing engine.
//!
//! Incoming [`Update`](courier_core::Update)s flow through a [`Dispatcher`]
//! that routes each one across an ordered table of handler groups:
//!
//! ```text
//! ┌───────────┐     ┌────────────┐     ┌─ group 0: [handler, handler, ...]
//! │ transport │────▶│ Dispatcher │────▶├─ group 1: [handler, ...]
//! │  channel  │     │ (semaphore)│     └─ group 2: [conversation, ...]
//! └───────────┘     └────────────┘
//! ```
//!
//! Groups are visited in ascending numeric order; within a group the first
//! handler whose `matches` passes runs, and its [`Outcome`] decides whether
//! routing proceeds to the next group, keeps scanning the same group, or
//! stops entirely. Handler execution is bounded by a counting semaphore and
//! every update runs on its own task, so one slow or faulty handler never
//! stalls the rest of the stream.
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use courier_framework::{Dispatcher, Outcome, handlers::CommandHandler};
//!
//! let dispatcher = Dispatcher::builder().max_concurrent_updates(32).build();
//! dispatcher.add_handler(
//!     Arc::new(CommandHandler::new("start", |ctx| async move {
//!         let chat = ctx.effective_chat().map(|c| c.id).unwrap_or_default();
//!         ctx.client().send_message(chat, "hello!").await?;
//!         Ok(Outcome::Done)
//!     })),
//!     0,
//! );
//! dispatcher.run(client, updates_rx).await;
//! ```

pub mod context;
pub mod conversation;
pub mod dispatcher;
pub mod filters;
pub mod handler;
pub mod handlers;
pub mod outcome;
pub mod table;

#[cfg(test)]
pub(crate) mod testutil;

pub use context::Context;
pub use conversation::{
    Conversation, ConversationBuilder, ConversationKey, ConversationStorage, InMemoryStorage,
    KeyStrategy,
};
pub use dispatcher::{
    DEFAULT_MAX_CONCURRENT_UPDATES, Dispatcher, DispatcherBuilder, ErrorCallback, PanicCallback,
};
pub use filters::MessageFilter;
pub use handler::{BoxedHandler, Callback, Handler, into_callback};
pub use outcome::{ErrorAction, HandlerError, HandlerResult, Outcome, Transition};
pub use table::GroupTable;
