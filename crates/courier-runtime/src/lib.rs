//! # Courier Runtime
//!
//! Orchestration for running one or many bots against the dispatch engine.
//!
//! The runtime owns the pieces around the
//! [`Dispatcher`](courier_framework::Dispatcher):
//!
//! - [`BotRegistry`] — a token-keyed map of live bots, each with its own
//!   update channel and cooperative stop signal, so one process can serve
//!   many independent bot identities.
//! - [`CourierConfig`] / [`ConfigLoader`] — figment-based layered
//!   configuration (defaults → TOML file → `COURIER_*` environment).
//! - [`logging`] — tracing-subscriber setup driven by that configuration.
//! - [`CourierRuntime`] — glues the above together: attach a client, get a
//!   channel to push updates into, and the runtime feeds the dispatcher
//!   until told to stop (or an OS shutdown signal arrives).
//!
//! The transport that actually produces updates (long polling, webhooks) is
//! intentionally out of scope: it pushes into the sender a bot's registry
//! entry exposes and watches the entry's stop flag.

pub mod config;
pub mod error;
pub mod logging;
pub mod registry;
pub mod runtime;

pub use config::{
    ConfigLoader, CourierConfig, DispatcherConfig, LogFormat, LogLevel, LogOutput, LoggingConfig,
};
pub use error::{ConfigError, ConfigResult, RuntimeError, RuntimeResult};
pub use registry::{BotEntry, BotRegistry};
pub use runtime::{CourierRuntime, RuntimeBuilder};
