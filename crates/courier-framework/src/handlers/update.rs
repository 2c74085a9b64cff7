//! Catch-all handler over raw updates.

use std::sync::Arc;

use async_trait::async_trait;

use courier_core::Update;

use crate::context::Context;
use crate::handler::{Callback, Handler, into_callback};
use crate::outcome::HandlerResult;

/// Runs a callback for any update passing a predicate.
///
/// The escape hatch for update kinds without a dedicated handler type, and
/// for cross-cutting concerns like audit logging registered in an early
/// group with [`Outcome::ContinueGroup`](crate::Outcome::ContinueGroup).
pub struct UpdateHandler {
    name: String,
    predicate: Arc<dyn Fn(&Update) -> bool + Send + Sync>,
    callback: Callback,
}

impl UpdateHandler {
    /// Creates a handler matching every update.
    pub fn new<F, Fut>(name: impl Into<String>, f: F) -> Self
    where
        F: Fn(Arc<Context>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        Self {
            name: name.into(),
            predicate: Arc::new(|_| true),
            callback: into_callback(f),
        }
    }

    /// Restricts the handler with a predicate over the raw update.
    pub fn filtered<P>(mut self, predicate: P) -> Self
    where
        P: Fn(&Update) -> bool + Send + Sync + 'static,
    {
        self.predicate = Arc::new(predicate);
        self
    }
}

#[async_trait]
impl Handler for UpdateHandler {
    fn name(&self) -> &str {
        &self.name
    }

    fn matches(&self, update: &Update) -> bool {
        (self.predicate)(update)
    }

    async fn handle(&self, ctx: Arc<Context>) -> HandlerResult {
        (self.callback)(ctx).await
    }
}
