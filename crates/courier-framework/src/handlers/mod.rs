//! Ready-made handler kinds.
//!
//! Each kind is a small struct implementing the [`Handler`](crate::Handler)
//! contract for one update shape: plain messages, slash commands, callback
//! queries, or anything at all. Conversations live in
//! [`conversation`](crate::conversation) — they implement the same contract
//! and register the same way.

mod callback_query;
mod command;
mod message;
mod update;

pub use callback_query::CallbackQueryHandler;
pub use command::{CommandHandler, command_args};
pub use message::MessageHandler;
pub use update::UpdateHandler;
