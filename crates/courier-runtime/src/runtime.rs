//! Runtime orchestration.
//!
//! [`CourierRuntime`] owns one shared [`Dispatcher`] and a [`BotRegistry`].
//! Attaching a client registers its token, creates the bot's update channel
//! and spawns an intake loop that feeds the dispatcher until the bot is
//! stopped. The transport layer pushes decoded updates into the sender the
//! returned entry exposes.
//!
//! ```rust,ignore
//! use courier_runtime::CourierRuntime;
//!
//! let runtime = CourierRuntime::new();
//! runtime.add_handler(my_handler, 0);
//!
//! let entry = runtime.attach_bot(client).await?;
//! spawn_polling_loop(entry.sender(), entry.stopped());
//!
//! runtime.run().await?; // waits for Ctrl-C / SIGTERM, then drains
//! ```

use std::sync::Arc;

use tokio::signal;
use tokio_util::task::TaskTracker;
use tracing::info;

use courier_core::BoxedClient;
use courier_framework::{BoxedHandler, Dispatcher};

use crate::config::{ConfigLoader, CourierConfig};
use crate::error::{ConfigResult, RuntimeResult};
use crate::logging;
use crate::registry::{BotEntry, BotRegistry};

/// Orchestrates one dispatcher across any number of bot identities.
pub struct CourierRuntime {
    config: CourierConfig,
    dispatcher: Arc<Dispatcher>,
    registry: Arc<BotRegistry>,
    intake: TaskTracker,
}

impl CourierRuntime {
    /// Creates a runtime with configuration loaded from the default sources.
    ///
    /// Falls back to built-in defaults if loading fails, so a missing config
    /// file never prevents startup.
    pub fn new() -> Self {
        let config = CourierConfig::load().unwrap_or_else(|e| {
            eprintln!("warning: failed to load config ({e}), using defaults");
            CourierConfig::default()
        });
        Self::from_config(config)
    }

    /// Starts building a runtime with explicit configuration sources.
    pub fn builder() -> RuntimeBuilder {
        RuntimeBuilder::new()
    }

    /// Creates a runtime from an already-loaded configuration.
    ///
    /// Initialises logging as a side effect (a no-op when a subscriber is
    /// already installed).
    pub fn from_config(config: CourierConfig) -> Self {
        logging::init_from_config(&config.logging);

        let dispatcher = Dispatcher::builder()
            .max_concurrent_updates(config.dispatcher.max_concurrent_updates)
            .build();

        info!(
            max_concurrent_updates = config.dispatcher.max_concurrent_updates,
            update_buffer = config.dispatcher.update_buffer,
            "runtime initialised"
        );

        Self {
            config,
            dispatcher: Arc::new(dispatcher),
            registry: Arc::new(BotRegistry::new()),
            intake: TaskTracker::new(),
        }
    }

    /// The loaded configuration.
    pub fn config(&self) -> &CourierConfig {
        &self.config
    }

    /// The shared dispatcher.
    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }

    /// The bot registry.
    pub fn registry(&self) -> &Arc<BotRegistry> {
        &self.registry
    }

    /// Appends a handler to a dispatch group.
    pub fn add_handler(&self, handler: BoxedHandler, group: i32) {
        self.dispatcher.add_handler(handler, group);
    }

    /// Removes the first handler named `name` from `group`.
    pub fn remove_handler(&self, name: &str, group: i32) -> bool {
        self.dispatcher.remove_handler(name, group)
    }

    /// Registers a client and starts feeding its updates to the dispatcher.
    ///
    /// Returns the registry entry; the transport pushes updates into
    /// [`BotEntry::sender`] and should observe [`BotEntry::should_stop`].
    /// Fails if a bot with the same token is already attached.
    pub async fn attach_bot(&self, client: BoxedClient) -> RuntimeResult<Arc<BotEntry>> {
        let (entry, updates_rx) = self
            .registry
            .add_bot(client.token(), self.config.dispatcher.update_buffer)
            .await?;

        let dispatcher = Arc::clone(&self.dispatcher);
        let mut stopped = entry.stopped();
        self.intake.spawn(async move {
            tokio::select! {
                _ = dispatcher.run(client, updates_rx) => {}
                _ = stopped.wait_for(|stop| *stop) => {}
            }
        });

        Ok(entry)
    }

    /// Stops one bot and removes it from the registry.
    ///
    /// Returns whether the token was attached. Updates the bot had already
    /// handed to the dispatcher still run to completion.
    pub async fn detach_bot(&self, token: &str) -> bool {
        match self.registry.remove_bot(token).await {
            Some(entry) => {
                entry.stop();
                true
            }
            None => false,
        }
    }

    /// Stops all bots and drains the dispatcher.
    ///
    /// Returns once every in-flight update has finished processing.
    pub async fn stop(&self) {
        info!("runtime stopping");
        self.registry.stop_all().await;
        self.intake.close();
        self.intake.wait().await;
        self.dispatcher.stop().await;
        info!("runtime stopped");
    }

    /// Runs until an OS shutdown signal arrives, then stops gracefully.
    pub async fn run(&self) -> RuntimeResult<()> {
        info!("runtime running; press Ctrl+C to stop");
        wait_for_shutdown().await;
        self.stop().await;
        Ok(())
    }

    /// Runs until the given future resolves, then stops gracefully.
    pub async fn run_until<F>(&self, shutdown: F) -> RuntimeResult<()>
    where
        F: Future<Output = ()>,
    {
        shutdown.await;
        self.stop().await;
        Ok(())
    }
}

impl Default for CourierRuntime {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for CourierRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CourierRuntime")
            .field("dispatcher", &self.dispatcher)
            .finish_non_exhaustive()
    }
}

/// Waits for Ctrl-C or, on unix, SIGTERM.
async fn wait_for_shutdown() {
    #[cfg(unix)]
    {
        let mut sigterm = match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(sigterm) => sigterm,
            Err(e) => {
                tracing::error!(error = %e, "failed to register SIGTERM handler");
                let _ = signal::ctrl_c().await;
                return;
            }
        };

        tokio::select! {
            _ = signal::ctrl_c() => info!("received Ctrl+C, shutting down"),
            _ = sigterm.recv() => info!("received SIGTERM, shutting down"),
        }
    }

    #[cfg(not(unix))]
    {
        let _ = signal::ctrl_c().await;
        info!("received Ctrl+C, shutting down");
    }
}

/// Builder for creating a [`CourierRuntime`] with custom configuration.
pub struct RuntimeBuilder {
    loader: ConfigLoader,
}

impl RuntimeBuilder {
    /// Creates a builder using the default configuration sources.
    pub fn new() -> Self {
        Self {
            loader: ConfigLoader::new(),
        }
    }

    /// Loads a specific configuration file.
    pub fn config_file(mut self, path: impl Into<std::path::PathBuf>) -> Self {
        self.loader = self.loader.file(path);
        self
    }

    /// Skips the environment-variable layer.
    pub fn without_env(mut self) -> Self {
        self.loader = self.loader.without_env();
        self
    }

    /// Builds the runtime.
    pub fn build(self) -> ConfigResult<CourierRuntime> {
        Ok(CourierRuntime::from_config(self.loader.load()?))
    }
}

impl Default for RuntimeBuilder {
    fn default() -> Self {
        Self::new()
    }
}
