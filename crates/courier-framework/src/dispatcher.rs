//! The update dispatcher.
//!
//! The dispatcher consumes a channel of incoming updates and routes each one
//! through the [`GroupTable`]: groups in ascending order, handlers within a
//! group in registration order, first match wins. A handler's
//! [`Outcome`] steers the walk — continue scanning the group, move to the
//! next group, or stop entirely.
//!
//! # Scheduling
//!
//! Every admitted update runs on its own task. Admission is gated by a
//! counting semaphore (default capacity
//! [`DEFAULT_MAX_CONCURRENT_UPDATES`]): when the semaphore is saturated,
//! [`Dispatcher::dispatch`] blocks, which stalls the intake loop and
//! propagates backpressure to whatever is writing the channel. Building the
//! dispatcher with a negative limit removes the gate entirely.
//!
//! # Failure isolation
//!
//! Handler errors are routed to the configured error callback (or logged);
//! panics are caught at the per-update boundary and reported to the panic
//! callback (or logged). Neither takes down the worker pool: one
//! misbehaving handler degrades only the updates it matches.

use std::panic::AssertUnwindSafe;
use std::sync::{Arc, OnceLock};

use futures::FutureExt;
use tokio::sync::Semaphore;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{Instrument, debug, debug_span, error};

use courier_core::{BoxedClient, Update};

use crate::context::Context;
use crate::handler::BoxedHandler;
use crate::outcome::{ErrorAction, HandlerError, Outcome};
use crate::table::GroupTable;

/// Default cap on concurrently processed updates.
pub const DEFAULT_MAX_CONCURRENT_UPDATES: usize = 50;

/// Callback invoked when a handler returns an error.
///
/// The returned [`ErrorAction`] decides how routing proceeds for the update.
pub type ErrorCallback = Arc<dyn Fn(&Context, &HandlerError) -> ErrorAction + Send + Sync>;

/// Callback invoked when a handler panics.
///
/// Receives the client, the context if one had been built for the update,
/// and the panic payload rendered as text.
pub type PanicCallback =
    Arc<dyn Fn(BoxedClient, Option<Arc<Context>>, &str) + Send + Sync>;

/// Routes incoming updates to registered handlers with bounded concurrency.
pub struct Dispatcher {
    table: Arc<GroupTable>,
    error_callback: Option<ErrorCallback>,
    panic_callback: Option<PanicCallback>,
    limiter: Option<Arc<Semaphore>>,
    tracker: TaskTracker,
    cancel: CancellationToken,
}

impl Dispatcher {
    /// Creates a dispatcher with default settings.
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// Starts building a dispatcher.
    pub fn builder() -> DispatcherBuilder {
        DispatcherBuilder::default()
    }

    /// The handler group table. Safe to mutate while dispatch is running;
    /// changes apply to updates admitted after the mutation.
    pub fn table(&self) -> &Arc<GroupTable> {
        &self.table
    }

    /// Appends a handler to a group.
    pub fn add_handler(&self, handler: BoxedHandler, group: i32) {
        self.table.add(handler, group);
    }

    /// Removes the first handler named `name` from `group`.
    pub fn remove_handler(&self, name: &str, group: i32) -> bool {
        self.table.remove(name, group)
    }

    /// Removes an entire group.
    pub fn remove_group(&self, group: i32) -> bool {
        self.table.remove_group(group)
    }

    /// Consumes updates from `updates` until the channel closes or
    /// [`stop`](Self::stop) is called.
    pub async fn run(&self, client: BoxedClient, mut updates: mpsc::Receiver<Update>) {
        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => break,
                received = updates.recv() => match received {
                    Some(update) => self.dispatch(client.clone(), update).await,
                    None => break,
                },
            }
        }
    }

    /// Admits one update for processing on its own task.
    ///
    /// Blocks while the concurrency limit is saturated; the await is the
    /// backpressure point for the intake loop.
    pub async fn dispatch(&self, client: BoxedClient, update: Update) {
        let permit = match &self.limiter {
            Some(semaphore) => match Arc::clone(semaphore).acquire_owned().await {
                Ok(permit) => Some(permit),
                // The semaphore is never closed; treat closure as shutdown.
                Err(_) => return,
            },
            None => None,
        };

        let worker = self.worker(client, update);
        self.tracker.spawn(async move {
            let _permit = permit;
            worker.execute().await;
        });
    }

    /// Routes one update inline, without admission control or task spawning.
    ///
    /// Useful for request/response style integrations and tests; the same
    /// per-update panic boundary applies.
    pub async fn process(&self, client: BoxedClient, update: Update) {
        self.worker(client, update).execute().await;
    }

    /// Stops the intake loop and waits for all in-flight updates to finish.
    ///
    /// New updates are no longer accepted from [`run`](Self::run); updates
    /// already admitted run to completion before this returns.
    pub async fn stop(&self) {
        self.cancel.cancel();
        self.tracker.close();
        self.tracker.wait().await;
        debug!("dispatcher drained");
    }

    /// Number of updates currently being processed.
    pub fn in_flight(&self) -> usize {
        self.tracker.len()
    }

    fn worker(&self, client: BoxedClient, update: Update) -> Worker {
        Worker {
            client,
            update: Arc::new(update),
            groups: self.table.snapshot(),
            error_callback: self.error_callback.clone(),
            panic_callback: self.panic_callback.clone(),
        }
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("table", &self.table)
            .field("bounded", &self.limiter.is_some())
            .field("in_flight", &self.in_flight())
            .finish()
    }
}

/// Builder for [`Dispatcher`].
#[derive(Default)]
pub struct DispatcherBuilder {
    max_concurrent_updates: i32,
    error_callback: Option<ErrorCallback>,
    panic_callback: Option<PanicCallback>,
}

impl DispatcherBuilder {
    /// Caps how many updates may be processed concurrently.
    ///
    /// `0` selects the default of [`DEFAULT_MAX_CONCURRENT_UPDATES`]; a
    /// negative value removes the cap (every update spawns immediately).
    pub fn max_concurrent_updates(mut self, limit: i32) -> Self {
        self.max_concurrent_updates = limit;
        self
    }

    /// Installs the error callback.
    pub fn on_error<F>(mut self, f: F) -> Self
    where
        F: Fn(&Context, &HandlerError) -> ErrorAction + Send + Sync + 'static,
    {
        self.error_callback = Some(Arc::new(f));
        self
    }

    /// Installs the panic callback.
    pub fn on_panic<F>(mut self, f: F) -> Self
    where
        F: Fn(BoxedClient, Option<Arc<Context>>, &str) + Send + Sync + 'static,
    {
        self.panic_callback = Some(Arc::new(f));
        self
    }

    /// Builds the dispatcher.
    pub fn build(self) -> Dispatcher {
        let limiter = match self.max_concurrent_updates {
            limit if limit < 0 => None,
            0 => Some(Arc::new(Semaphore::new(DEFAULT_MAX_CONCURRENT_UPDATES))),
            limit => Some(Arc::new(Semaphore::new(limit as usize))),
        };

        Dispatcher {
            table: Arc::new(GroupTable::new()),
            error_callback: self.error_callback,
            panic_callback: self.panic_callback,
            limiter,
            tracker: TaskTracker::new(),
            cancel: CancellationToken::new(),
        }
    }
}

/// Everything one update's routing needs, detached from the dispatcher so it
/// can run on its own task.
struct Worker {
    client: BoxedClient,
    update: Arc<Update>,
    groups: Vec<(i32, Vec<BoxedHandler>)>,
    error_callback: Option<ErrorCallback>,
    panic_callback: Option<PanicCallback>,
}

/// How the group walk proceeds after one handler ran.
enum Step {
    NextGroup,
    NextHandler,
    Halt,
}

impl Worker {
    async fn execute(self) {
        let span = debug_span!(
            "dispatch",
            update_id = self.update.update_id,
            kind = self.update.kind_name(),
        );

        // Built lazily by the first matching handler; shared with the panic
        // report so the callback sees the context when one exists.
        let ctx_slot: Arc<OnceLock<Arc<Context>>> = Arc::new(OnceLock::new());

        let routed = AssertUnwindSafe(self.route(Arc::clone(&ctx_slot)))
            .catch_unwind()
            .instrument(span)
            .await;

        if let Err(payload) = routed {
            let message = panic_text(payload.as_ref());
            match &self.panic_callback {
                Some(callback) => {
                    callback(self.client.clone(), ctx_slot.get().cloned(), &message);
                }
                None => error!(
                    update_id = self.update.update_id,
                    panic = %message,
                    "handler panicked; update abandoned"
                ),
            }
        }
    }

    async fn route(&self, ctx_slot: Arc<OnceLock<Arc<Context>>>) {
        for (group, handlers) in &self.groups {
            let mut index = 0;
            'group: while index < handlers.len() {
                let handler = &handlers[index];
                if !handler.matches(&self.update) {
                    index += 1;
                    continue;
                }

                let ctx = Arc::clone(ctx_slot.get_or_init(|| {
                    Arc::new(Context::new(self.client.clone(), Arc::clone(&self.update)))
                }));

                debug!(group, handler = handler.name(), "handler matched");

                let step = match handler.handle(Arc::clone(&ctx)).await {
                    Ok(Outcome::Done) => Step::NextGroup,
                    Ok(Outcome::ContinueGroup) => Step::NextHandler,
                    Ok(Outcome::EndGroups) => Step::Halt,
                    Ok(Outcome::Transition(_)) => {
                        self.report(handler.name(), &ctx, HandlerError::StrayTransition)
                    }
                    Err(err) => self.report(handler.name(), &ctx, err),
                };

                match step {
                    Step::NextGroup => break 'group,
                    Step::NextHandler => index += 1,
                    Step::Halt => return,
                }
            }
        }
    }

    fn report(&self, handler: &str, ctx: &Arc<Context>, err: HandlerError) -> Step {
        let action = match &self.error_callback {
            Some(callback) => callback(ctx, &err),
            None => {
                error!(handler, error = %err, "handler failed");
                ErrorAction::Noop
            }
        };
        match action {
            ErrorAction::Noop => Step::NextGroup,
            ErrorAction::ContinueGroup => Step::NextHandler,
            ErrorAction::EndGroups => Step::Halt,
        }
    }
}

fn panic_text(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(text) = payload.downcast_ref::<&'static str>() {
        (*text).to_string()
    } else if let Some(text) = payload.downcast_ref::<String>() {
        text.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
